//! Sitemap XML for the public pages.

use chrono::NaiveDate;

use crate::content::services::SERVICES;

/// Public routes that exist independently of content.
pub const STATIC_ROUTES: &[(&str, &str, &str)] = &[
    ("/", "weekly", "1.0"),
    ("/about", "monthly", "0.8"),
    ("/services", "monthly", "0.9"),
    ("/insights", "weekly", "0.9"),
    ("/contact", "yearly", "0.7"),
];

/// Render the sitemap for a site rooted at `base_url`, stamped with `lastmod`.
pub fn build_sitemap(base_url: &str, lastmod: NaiveDate) -> String {
    let base = base_url.trim_end_matches('/');
    let lastmod = lastmod.format("%Y-%m-%d").to_string();

    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    let services = SERVICES
        .iter()
        .map(|s| (format!("/services/{}", s.slug), "monthly", "0.8"));
    let routes = STATIC_ROUTES
        .iter()
        .map(|(path, freq, priority)| (path.to_string(), *freq, *priority))
        .chain(services);

    for (path, changefreq, priority) in routes {
        let loc = if path == "/" {
            format!("{base}/")
        } else {
            format!("{base}{path}")
        };
        xml.push_str("  <url>\n");
        xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&loc)));
        xml.push_str(&format!("    <lastmod>{lastmod}</lastmod>\n"));
        xml.push_str(&format!("    <changefreq>{changefreq}</changefreq>\n"));
        xml.push_str(&format!("    <priority>{priority}</priority>\n"));
        xml.push_str("  </url>\n");
    }
    xml.push_str("</urlset>\n");
    xml
}

fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}
