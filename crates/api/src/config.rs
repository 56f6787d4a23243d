use std::env;
use std::str::FromStr;
use std::time::Duration;

use advisory_site_core::config::{
    is_valid_table_name, CacheConfig, QueryPolicy, StoreConfig, DEFAULT_BUCKET,
    DEFAULT_CONTENT_TABLE, DEFAULT_INSIGHTS_TABLE,
};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host to bind to.
    pub host: String,
    /// Server port to bind to.
    pub port: u16,
    /// PostgreSQL connection URL of the content store.
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    /// Hosted backend endpoint, keys, table and bucket names.
    pub store: StoreConfig,
    /// Secret the auth service signs access tokens with. Required: admin
    /// sessions are only accepted when signed with it.
    pub jwt_secret: String,
    /// Freshness policy of the public-page queries.
    pub cache: CacheConfig,
    /// Canonical origin used in the sitemap.
    pub site_url: String,
    /// Passed through to templates; nothing is loaded when absent.
    pub analytics_id: Option<String>,
    pub error_monitoring_dsn: Option<String>,
    /// Set the `Secure` attribute on the session cookie.
    pub secure_cookies: bool,
    /// Allowed CORS origins; empty means any.
    pub cors_origins: Vec<String>,
    /// Event bus channel capacity.
    pub event_bus_capacity: usize,
    /// Log level (e.g., "info", "debug", "trace").
    pub log_level: String,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's value
    /// when it is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |name: &'static str| var(name).ok_or(ConfigError::Missing(name));

        let mut store = StoreConfig::new(required("STORE_URL")?, required("STORE_ANON_KEY")?);
        store.service_key = var("STORE_SERVICE_KEY");
        store.content_table = table(var("CONTENT_TABLE"), "CONTENT_TABLE", DEFAULT_CONTENT_TABLE)?;
        store.insights_table =
            table(var("INSIGHTS_TABLE"), "INSIGHTS_TABLE", DEFAULT_INSIGHTS_TABLE)?;
        store.bucket = var("STORAGE_BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.to_string());

        let defaults = CacheConfig::default();
        let retry = parse(var("FETCH_RETRY"), "FETCH_RETRY", defaults.site_content.retry)?;
        let retry_delay = Duration::from_millis(parse(
            var("FETCH_RETRY_DELAY_MS"),
            "FETCH_RETRY_DELAY_MS",
            defaults.site_content.retry_delay.as_millis() as u64,
        )?);
        let policy = |stale: &'static str,
                      gc: &'static str,
                      base: QueryPolicy|
         -> Result<QueryPolicy, ConfigError> {
            Ok(QueryPolicy {
                stale_time: Duration::from_secs(parse(var(stale), stale, base.stale_time.as_secs())?),
                gc_time: Duration::from_secs(parse(var(gc), gc, base.gc_time.as_secs())?),
                retry,
                retry_delay,
            })
        };
        let cache = CacheConfig {
            site_content: policy("CONTENT_STALE_SECS", "CONTENT_GC_SECS", defaults.site_content)?,
            active_insights: policy(
                "INSIGHTS_STALE_SECS",
                "INSIGHTS_GC_SECS",
                defaults.active_insights,
            )?,
        };

        let port: u16 = parse(var("PORT"), "PORT", 3030)?;
        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            database_url: required("DATABASE_URL")?,
            db_max_connections: parse(var("DB_MAX_CONNECTIONS"), "DB_MAX_CONNECTIONS", 10)?,
            db_min_connections: parse(var("DB_MIN_CONNECTIONS"), "DB_MIN_CONNECTIONS", 1)?,
            jwt_secret: required("STORE_JWT_SECRET")?,
            cache,
            site_url: var("SITE_URL")
                .unwrap_or_else(|| format!("http://localhost:{port}"))
                .trim_end_matches('/')
                .to_string(),
            analytics_id: var("ANALYTICS_ID"),
            error_monitoring_dsn: var("ERROR_MONITORING_DSN"),
            secure_cookies: parse(var("SECURE_COOKIES"), "SECURE_COOKIES", false)?,
            cors_origins: var("CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            event_bus_capacity: parse(var("EVENT_BUS_CAPACITY"), "EVENT_BUS_CAPACITY", 1024)?,
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            store,
        })
    }

    /// Build the socket address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T: FromStr>(value: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}

fn table(value: Option<String>, name: &'static str, default: &str) -> Result<String, ConfigError> {
    match value {
        None => Ok(default.to_string()),
        Some(raw) if is_valid_table_name(&raw) => Ok(raw),
        Some(raw) => Err(ConfigError::Invalid { name, value: raw }),
    }
}
