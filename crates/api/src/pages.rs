//! Server-rendered HTML pages.
//!
//! Templates are compiled into the binary and rendered with autoescaping, so
//! stored text is always output as text.

use advisory_site_core::content::site_content::SiteContent;
use chrono::{Datelike, Utc};
use serde::Serialize;
use tera::{Context, Tera};

#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("template parse error: {0}")]
    TemplateParse(String),

    #[error("template rendering failed: {0}")]
    TemplateRender(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<tera::Error> for PageError {
    fn from(e: tera::Error) -> Self {
        PageError::TemplateRender(e.to_string())
    }
}

/// Served in place of insight images that are missing or fail to load.
pub const PLACEHOLDER_IMAGE_PATH: &str = "/static/insight-placeholder.svg";
pub const PLACEHOLDER_IMAGE_SVG: &str = include_str!("../assets/insight-placeholder.svg");

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("home.html", include_str!("../templates/home.html")),
    ("about.html", include_str!("../templates/about.html")),
    ("services.html", include_str!("../templates/services.html")),
    ("service_detail.html", include_str!("../templates/service_detail.html")),
    ("insights.html", include_str!("../templates/insights.html")),
    ("contact.html", include_str!("../templates/contact.html")),
    ("not_found.html", include_str!("../templates/not_found.html")),
    ("admin_login.html", include_str!("../templates/admin_login.html")),
    ("admin_dashboard.html", include_str!("../templates/admin_dashboard.html")),
];

/// A public page template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Home,
    About,
    Services,
    ServiceDetail,
    Insights,
    Contact,
    NotFound,
}

impl Page {
    fn template(self) -> &'static str {
        match self {
            Page::Home => "home.html",
            Page::About => "about.html",
            Page::Services => "services.html",
            Page::ServiceDetail => "service_detail.html",
            Page::Insights => "insights.html",
            Page::Contact => "contact.html",
            Page::NotFound => "not_found.html",
        }
    }
}

/// Renders pages from the embedded templates.
pub struct PageRenderer {
    tera: Tera,
    analytics_id: Option<String>,
    error_monitoring_dsn: Option<String>,
}

impl PageRenderer {
    pub fn new(
        analytics_id: Option<String>,
        error_monitoring_dsn: Option<String>,
    ) -> Result<Self, PageError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES.iter().copied())
            .map_err(|e| PageError::TemplateParse(e.to_string()))?;
        Ok(Self {
            tera,
            analytics_id,
            error_monitoring_dsn,
        })
    }

    /// Render a public page. `extra` is merged over the shared context
    /// (site content, analytics settings, placeholder image and the current
    /// year).
    pub fn render_page(
        &self,
        page: Page,
        content: &SiteContent,
        extra: Context,
    ) -> Result<String, PageError> {
        let mut context = Context::new();
        context.insert("content", content);
        context.insert("analytics_id", &self.analytics_id);
        context.insert("error_monitoring_dsn", &self.error_monitoring_dsn);
        context.insert("placeholder_image", PLACEHOLDER_IMAGE_PATH);
        context.insert("year", &Utc::now().year());
        context.extend(extra);
        Ok(self.tera.render(page.template(), &context)?)
    }

    pub fn render_login(&self, email: &str, error: Option<&str>) -> Result<String, PageError> {
        let mut context = Context::new();
        context.insert("email", email);
        context.insert("error", &error);
        Ok(self.tera.render("admin_login.html", &context)?)
    }

    pub fn render_dashboard<T: Serialize>(&self, view: &T) -> Result<String, PageError> {
        let context = Context::from_serialize(view)?;
        Ok(self.tera.render("admin_dashboard.html", &context)?)
    }
}
