use std::time::Duration;

/// Where the hosted content store lives and how its resources are named.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base URL of the hosted backend (auth and storage REST APIs).
    pub endpoint: String,
    /// Public anonymous API key.
    pub anon_key: String,
    /// Privileged key for storage writes; the anon key is used when absent.
    pub service_key: Option<String>,
    /// Table holding editable content strings. The bundled migrations only
    /// create the default names; any other table must already exist with the
    /// same columns and indexes.
    pub content_table: String,
    /// Table holding insight records. Same caveat as `content_table`.
    pub insights_table: String,
    /// Object storage bucket for uploaded documents and images.
    pub bucket: String,
}

pub const DEFAULT_CONTENT_TABLE: &str = "site_content";
pub const DEFAULT_INSIGHTS_TABLE: &str = "insights";
pub const DEFAULT_BUCKET: &str = "site-documents";

impl StoreConfig {
    pub fn new(endpoint: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            service_key: None,
            content_table: DEFAULT_CONTENT_TABLE.to_string(),
            insights_table: DEFAULT_INSIGHTS_TABLE.to_string(),
            bucket: DEFAULT_BUCKET.to_string(),
        }
    }

    /// Key sent with storage requests.
    /// Whether either table name differs from what the migrations create.
    pub fn uses_custom_tables(&self) -> bool {
        self.content_table != DEFAULT_CONTENT_TABLE || self.insights_table != DEFAULT_INSIGHTS_TABLE
    }

    pub fn storage_credential(&self) -> &str {
        self.service_key.as_deref().unwrap_or(&self.anon_key)
    }
}

/// Table names are spliced into SQL, so only plain identifiers are accepted.
pub fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && name.len() <= 63
}

/// Freshness and retry behavior of one cached query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryPolicy {
    /// Age after which a read triggers a background refresh.
    pub stale_time: Duration,
    /// Idle time after which the entry is evicted.
    pub gc_time: Duration,
    /// Extra attempts after a failed fetch.
    pub retry: u32,
    /// Fixed pause before each retry.
    pub retry_delay: Duration,
}

impl QueryPolicy {
    pub const fn new(stale_time: Duration, gc_time: Duration) -> Self {
        Self {
            stale_time,
            gc_time,
            retry: 1,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Cache policies for the queries behind the public pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub site_content: QueryPolicy,
    pub active_insights: QueryPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            site_content: QueryPolicy::new(Duration::from_secs(5 * 60), Duration::from_secs(10 * 60)),
            active_insights: QueryPolicy::new(
                Duration::from_secs(10 * 60),
                Duration::from_secs(30 * 60),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_loses_trailing_slash() {
        let config = StoreConfig::new("https://store.example.com/", "anon");
        assert_eq!(config.endpoint, "https://store.example.com");
        assert_eq!(config.storage_credential(), "anon");
    }

    #[test]
    fn custom_tables_are_detected() {
        let mut config = StoreConfig::new("https://store.example.com", "anon");
        assert!(!config.uses_custom_tables());
        config.insights_table = "published_insights".to_string();
        assert!(config.uses_custom_tables());
    }

    #[test]
    fn table_names_are_identifiers() {
        assert!(is_valid_table_name("site_content"));
        assert!(is_valid_table_name("_insights2"));
        assert!(!is_valid_table_name("2insights"));
        assert!(!is_valid_table_name("site_content; drop table x"));
        assert!(!is_valid_table_name(""));
    }

    #[test]
    fn insights_stay_fresh_longer_than_content() {
        let config = CacheConfig::default();
        assert!(config.active_insights.stale_time > config.site_content.stale_time);
        assert_eq!(config.site_content.retry, 1);
    }
}
