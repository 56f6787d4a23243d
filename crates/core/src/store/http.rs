use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Deserialize;
use serde_json::json;

use super::{ObjectStorage, StoreError, StoreResult};
use crate::config::StoreConfig;
use crate::content::model::UploadedDocument;
use crate::content::object_name::ObjectName;

const LIST_LIMIT: u32 = 1000;

/// `ObjectStorage` over the hosted backend's storage REST API.
#[derive(Debug, Clone)]
pub struct HttpObjectStorage {
    client: Client,
    endpoint: String,
    bucket: String,
    anon_key: String,
    credential: String,
}

#[derive(Debug, Deserialize)]
struct StorageObjectRow {
    name: String,
    /// Folders come back without an id.
    id: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    metadata: Option<StorageObjectMetadata>,
}

impl StorageObjectRow {
    /// A real file at the bucket root: not a folder, placeholder or image.
    fn is_document(&self) -> bool {
        self.id.is_some()
            && !self.name.starts_with('.')
            && ObjectName::parse(&self.name).is_document()
    }
}

#[derive(Debug, Deserialize)]
struct StorageObjectMetadata {
    size: Option<u64>,
    mimetype: Option<String>,
}

impl HttpObjectStorage {
    pub fn new(client: Client, config: &StoreConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            bucket: config.bucket.clone(),
            anon_key: config.anon_key.clone(),
            credential: config.storage_credential().to_string(),
        }
    }

    /// `{endpoint}/storage/v1/object/{segments...}` with every segment
    /// percent-encoded.
    fn object_url(&self, segments: &[&str]) -> StoreResult<Url> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|e| StoreError::Decode(format!("invalid store endpoint: {e}")))?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| StoreError::Decode("store endpoint cannot be a base".into()))?;
            path.pop_if_empty().extend(["storage", "v1", "object"]);
            for segment in segments {
                path.extend(segment.split('/'));
            }
        }
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.credential)
    }
}

async fn check_status(response: Response) -> StoreResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(match status.as_u16() {
        404 => StoreError::NotFound(body),
        409 => StoreError::Conflict(body),
        code => StoreError::Status { status: code, body },
    })
}

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    async fn list_objects(&self) -> StoreResult<Vec<UploadedDocument>> {
        let url = self.object_url(&["list", &self.bucket])?;
        let body = json!({
            "prefix": "",
            "limit": LIST_LIMIT,
            "offset": 0,
            "sortBy": { "column": "created_at", "order": "desc" },
        });
        let response = self
            .authorized(self.client.post(url))
            .json(&body)
            .send()
            .await?;
        let rows: Vec<StorageObjectRow> = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        Ok(rows
            .into_iter()
            .filter(StorageObjectRow::is_document)
            .map(|row| {
                let (size, mimetype) = row
                    .metadata
                    .map(|m| (m.size.unwrap_or(0), m.mimetype))
                    .unwrap_or((0, None));
                UploadedDocument {
                    name: row.name,
                    size,
                    mimetype,
                    created_at: row.created_at,
                    updated_at: row.updated_at,
                }
            })
            .collect())
    }

    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> StoreResult<()> {
        let url = self.object_url(&[&self.bucket, key])?;
        let response = self
            .authorized(self.client.post(url))
            .header("content-type", content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;
        check_status(response).await?;
        tracing::debug!(key, "uploaded object");
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        let url = self.object_url(&[&self.bucket])?;
        let response = self
            .authorized(self.client.delete(url))
            .json(&json!({ "prefixes": [key] }))
            .send()
            .await?;
        check_status(response).await?;
        tracing::debug!(key, "removed object");
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        match self.object_url(&["public", &self.bucket, key]) {
            Ok(url) => url.to_string(),
            Err(_) => format!(
                "{}/storage/v1/object/public/{}/{}",
                self.endpoint, self.bucket, key
            ),
        }
    }
}
