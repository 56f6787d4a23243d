//! Writes `sitemap.xml` for the public pages.
//!
//! Usage: `generate-sitemap [OUTPUT]` (default `public/sitemap.xml`). The site
//! origin comes from `SITE_URL`.

use std::path::PathBuf;

use advisory_site_core::sitemap::build_sitemap;
use chrono::Utc;

const DEFAULT_OUTPUT: &str = "public/sitemap.xml";

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let site_url = std::env::var("SITE_URL")
        .map_err(|_| anyhow::anyhow!("SITE_URL must be set to the site's public origin"))?;
    let output = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

    let xml = build_sitemap(&site_url, Utc::now().date_naive());
    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(&output, xml)?;

    println!("Wrote {}", output.display());
    Ok(())
}
