//! What the public pages read: cached content with fallback substitution.

use std::sync::Arc;

use crate::cache::{Query, QueryCache};
use crate::config::CacheConfig;
use crate::content::fallback::fallback_insights;
use crate::content::model::Insight;
use crate::content::site_content::SiteContent;
use crate::fetch::{ContentFetcher, FetchError};

pub const SITE_CONTENT_KEY: &str = "site-content";
pub const ACTIVE_INSIGHTS_KEY: &str = "insights:active";

/// Cached access to site content and active insights.
///
/// Built once at startup and shared by handle; clones share the same caches.
#[derive(Clone)]
pub struct SiteData {
    content_cache: QueryCache<SiteContent>,
    insight_cache: QueryCache<Vec<Insight>>,
    content_query: Query<SiteContent>,
    insights_query: Query<Vec<Insight>>,
}

impl SiteData {
    pub fn new(fetcher: ContentFetcher, config: CacheConfig) -> Self {
        let content_fetcher = fetcher.clone();
        let content_query = Query::new(SITE_CONTENT_KEY, config.site_content, move || {
            let fetcher = content_fetcher.clone();
            async move { fetcher.fetch_site_content().await }
        });
        let insights_query = Query::new(ACTIVE_INSIGHTS_KEY, config.active_insights, move || {
            let fetcher = fetcher.clone();
            async move { fetcher.fetch_active_insights().await }
        });
        Self {
            content_cache: QueryCache::new(),
            insight_cache: QueryCache::new(),
            content_query,
            insights_query,
        }
    }

    pub async fn try_site_content(&self) -> Result<Arc<SiteContent>, FetchError> {
        self.content_cache.get(&self.content_query).await
    }

    pub async fn try_active_insights(&self) -> Result<Arc<Vec<Insight>>, FetchError> {
        self.insight_cache.get(&self.insights_query).await
    }

    /// Site content, or the built-in copy when the store cannot be read.
    pub async fn site_content(&self) -> Arc<SiteContent> {
        match self.try_site_content().await {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(error = %err, "rendering fallback site content");
                Arc::new(SiteContent::fallback())
            }
        }
    }

    /// Active insights, or the built-in list when the store cannot be read.
    pub async fn active_insights(&self) -> Arc<Vec<Insight>> {
        match self.try_active_insights().await {
            Ok(insights) => insights,
            Err(err) => {
                tracing::warn!(error = %err, "rendering fallback insights");
                Arc::new(fallback_insights())
            }
        }
    }

    /// Refetch content after a write so the next read reflects it.
    pub async fn refresh_content(&self) {
        if let Err(err) = self.content_cache.invalidate(&self.content_query).await {
            tracing::warn!(error = %err, "content refetch after write failed");
        }
    }

    /// Refetch active insights after a write.
    pub async fn refresh_insights(&self) {
        if let Err(err) = self.insight_cache.invalidate(&self.insights_query).await {
            tracing::warn!(error = %err, "insights refetch after write failed");
        }
    }

    /// Evict idle entries from both caches.
    pub fn collect_garbage(&self) -> usize {
        self.content_cache.collect_garbage() + self.insight_cache.collect_garbage()
    }

    pub fn cached_entries(&self) -> usize {
        self.content_cache.len() + self.insight_cache.len()
    }
}
