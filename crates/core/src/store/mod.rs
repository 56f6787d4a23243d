//! Access to the hosted content store: the two tables and the documents bucket.

pub mod http;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::content::model::{ContentEntry, Insight, InsightRecord, UploadedDocument};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("content store unavailable")]
    Unavailable,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Reads and writes against the `site_content` and `insights` tables.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Every content row.
    async fn list_content_entries(&self) -> StoreResult<Vec<ContentEntry>>;

    /// Insert the section or replace its text.
    async fn upsert_content_entry(&self, section: &str, text: &str) -> StoreResult<ContentEntry>;

    /// Active insights ordered by `display_order` ascending.
    async fn list_active_insights(&self) -> StoreResult<Vec<Insight>>;

    /// All insights, active or not, ordered by `display_order`.
    async fn list_insights(&self) -> StoreResult<Vec<Insight>>;

    async fn get_insight(&self, id: Uuid) -> StoreResult<Insight>;

    async fn create_insight(&self, record: &InsightRecord) -> StoreResult<Insight>;

    async fn update_insight(&self, id: Uuid, record: &InsightRecord) -> StoreResult<Insight>;

    async fn delete_insight(&self, id: Uuid) -> StoreResult<()>;

    /// Remove insights backed by `filename`, returning how many went away.
    async fn delete_insights_for_document(&self, filename: &str) -> StoreResult<u64>;

    /// Cheap connectivity check.
    async fn ping(&self) -> StoreResult<()>;
}

/// The flat object namespace holding uploaded documents and images.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Files at the bucket root. Folders are skipped.
    async fn list_objects(&self) -> StoreResult<Vec<UploadedDocument>>;

    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> StoreResult<()>;

    async fn remove(&self, key: &str) -> StoreResult<()>;

    /// Public URL of `key`, derived from the name alone.
    fn public_url(&self, key: &str) -> String;
}
