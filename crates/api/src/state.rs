use std::sync::Arc;

use advisory_site_core::admin::AdminService;
use advisory_site_core::auth::session::SessionVerifier;
use advisory_site_core::auth::Authenticator;
use advisory_site_core::events::bus::EventBus;
use advisory_site_core::fetch::ContentFetcher;
use advisory_site_core::site::SiteData;
use advisory_site_core::store::{ContentRepository, ObjectStorage};

use crate::config::AppConfig;
use crate::pages::{PageError, PageRenderer};

/// Shared application state, passed to all handlers via Axum's `State` extractor.
/// Wrapped in `Arc` so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    config: AppConfig,
    event_bus: EventBus,
    repo: Arc<dyn ContentRepository>,
    site: SiteData,
    admin: AdminService,
    auth: Arc<dyn Authenticator>,
    sessions: SessionVerifier,
    pages: PageRenderer,
}

impl AppState {
    /// Wire the read path, the admin service and the session gate over the
    /// given store backends.
    pub fn new(
        config: AppConfig,
        repo: Arc<dyn ContentRepository>,
        storage: Arc<dyn ObjectStorage>,
        auth: Arc<dyn Authenticator>,
        event_bus: EventBus,
    ) -> Result<Self, PageError> {
        let site = SiteData::new(ContentFetcher::new(repo.clone()), config.cache);
        let admin = AdminService::new(repo.clone(), storage, site.clone(), event_bus.clone());
        let sessions = SessionVerifier::new(&config.jwt_secret);
        let pages = PageRenderer::new(
            config.analytics_id.clone(),
            config.error_monitoring_dsn.clone(),
        )?;
        Ok(Self {
            inner: Arc::new(InnerState {
                config,
                event_bus,
                repo,
                site,
                admin,
                auth,
                sessions,
                pages,
            }),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.inner.event_bus
    }

    pub fn repo(&self) -> &Arc<dyn ContentRepository> {
        &self.inner.repo
    }

    pub fn site(&self) -> &SiteData {
        &self.inner.site
    }

    pub fn admin(&self) -> &AdminService {
        &self.inner.admin
    }

    pub fn auth(&self) -> &dyn Authenticator {
        self.inner.auth.as_ref()
    }

    pub fn sessions(&self) -> &SessionVerifier {
        &self.inner.sessions
    }

    pub fn pages(&self) -> &PageRenderer {
        &self.inner.pages
    }
}
