use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One editable text fragment of the site, keyed by `section`.
/// Maps to the `site_content` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ContentEntry {
    pub id: Uuid,
    pub section: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A published article or resource. Maps to the `insights` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Insight {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub document_url: Option<String>,
    pub document_filename: Option<String>,
    pub display_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Column values for inserting or replacing an insight.
/// Produced by the admin service after validation and sanitization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsightRecord {
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub document_url: Option<String>,
    pub document_filename: Option<String>,
    pub display_order: i32,
    pub is_active: bool,
}

/// A file in the documents bucket, as reported by object storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedDocument {
    pub name: String,
    pub size: u64,
    pub mimetype: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Whether a document backs an insight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentStatus {
    Available,
    Published,
}
