//! Content-fetch client: the two fixed read queries behind the public pages.

use std::sync::Arc;

use crate::content::fallback::fallback_insights;
use crate::content::model::Insight;
use crate::content::site_content::SiteContent;
use crate::store::{ContentRepository, StoreError};

/// A failed public-content read. Cloneable so coalesced readers can all
/// receive the same outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("content store unavailable: {0}")]
    Store(String),

    #[error("malformed content store response: {0}")]
    Decode(String),
}

impl From<StoreError> for FetchError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Decode(msg) => FetchError::Decode(msg),
            other => FetchError::Store(other.to_string()),
        }
    }
}

/// Reads `site_content` and the active `insights` and normalizes them.
#[derive(Clone)]
pub struct ContentFetcher {
    repo: Arc<dyn ContentRepository>,
}

impl ContentFetcher {
    pub fn new(repo: Arc<dyn ContentRepository>) -> Self {
        Self { repo }
    }

    /// All content rows layered over the fallback table.
    pub async fn fetch_site_content(&self) -> Result<SiteContent, FetchError> {
        let rows = self.repo.list_content_entries().await.map_err(|err| {
            tracing::warn!(error = %err, "failed to fetch site content");
            FetchError::from(err)
        })?;
        tracing::debug!(rows = rows.len(), "fetched site content");
        Ok(SiteContent::from_entries(&rows))
    }

    /// Active insights by ascending `display_order`, or the fallback list
    /// when the store has none.
    pub async fn fetch_active_insights(&self) -> Result<Vec<Insight>, FetchError> {
        let rows = self.repo.list_active_insights().await.map_err(|err| {
            tracing::warn!(error = %err, "failed to fetch insights");
            FetchError::from(err)
        })?;
        tracing::debug!(rows = rows.len(), "fetched active insights");
        Ok(normalize_insights(rows))
    }
}

/// Drop inactive rows and order by `display_order`, keeping the store's order
/// among equal positions.
pub fn normalize_insights(rows: Vec<Insight>) -> Vec<Insight> {
    let mut active: Vec<Insight> = rows.into_iter().filter(|i| i.is_active).collect();
    if active.is_empty() {
        return fallback_insights();
    }
    active.sort_by_key(|i| i.display_order);
    active
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::model::InsightRecord;
    use crate::store::memory::MemoryContentRepository;

    fn record(title: &str, order: i32, active: bool) -> InsightRecord {
        InsightRecord {
            title: title.to_string(),
            description: format!("About {title}"),
            image_url: Some(format!("/img/{title}.png")),
            document_url: None,
            document_filename: None,
            display_order: order,
            is_active: active,
        }
    }

    #[tokio::test]
    async fn zero_insight_rows_yield_fallback_list() {
        let repo = Arc::new(MemoryContentRepository::new());
        let fetcher = ContentFetcher::new(repo);
        let insights = fetcher.fetch_active_insights().await.unwrap();
        assert_eq!(insights, fallback_insights());
    }

    #[tokio::test]
    async fn remote_insights_keep_order_and_skip_inactive() {
        let repo = Arc::new(MemoryContentRepository::new());
        repo.seed_insight(record("third", 30, true));
        repo.seed_insight(record("draft", 5, false));
        repo.seed_insight(record("first", 10, true));
        repo.seed_insight(record("second", 20, true));
        let fetcher = ContentFetcher::new(repo);

        let insights = fetcher.fetch_active_insights().await.unwrap();
        let titles: Vec<_> = insights.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["first", "second", "third"]);
        assert!(insights.iter().all(|i| i.is_active));
    }

    #[test]
    fn normalize_filters_rows_the_query_should_have_excluded() {
        let repo_rows = vec![
            fallback_insights().remove(0),
            Insight {
                is_active: false,
                ..fallback_insights().remove(1)
            },
        ];
        let normalized = normalize_insights(repo_rows);
        assert_eq!(normalized.len(), 1);
    }

    #[tokio::test]
    async fn store_failure_is_reported_not_hidden() {
        let repo = Arc::new(MemoryContentRepository::new());
        repo.set_unavailable(true);
        let fetcher = ContentFetcher::new(repo);
        assert!(matches!(
            fetcher.fetch_site_content().await,
            Err(FetchError::Store(_))
        ));
        assert!(fetcher.fetch_active_insights().await.is_err());
    }

    #[tokio::test]
    async fn content_overrides_fallback_per_row() {
        let repo = Arc::new(MemoryContentRepository::new());
        repo.upsert_content_entry("hero_title", "From the store")
            .await
            .unwrap();
        let fetcher = ContentFetcher::new(repo);
        let content = fetcher.fetch_site_content().await.unwrap();
        assert_eq!(content.get("hero_title"), "From the store");
        assert_eq!(
            content.get("about_title"),
            crate::content::fallback::fallback_text("about_title").unwrap()
        );
    }
}
