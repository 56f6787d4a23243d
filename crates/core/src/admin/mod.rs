//! Operator-facing content editor and document manager.
//!
//! Every mutation validates its input before any store call, performs a
//! single store write, then refreshes the affected public query and
//! publishes a [`SiteEvent`]. Mutations are never retried.

pub mod types;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::content::fallback::CONTENT_SECTIONS;
use crate::content::model::{
    ContentEntry, DocumentStatus, Insight, InsightRecord, UploadedDocument,
};
use crate::content::object_name::ObjectName;
use crate::content::sanitize::sanitize_text;
use crate::content::validate::{
    filename_problem, validate_content_update, validate_upload, UploadKind, ValidationErrors,
};
use crate::events::bus::EventBus;
use crate::events::types::{
    ContentSavedEvent, DocumentDeletedEvent, DocumentEvent, InsightEvent, SiteEvent,
};
use crate::site::SiteData;
use crate::store::{ContentRepository, ObjectStorage, StoreError};

use self::types::{ContentRow, DocumentDeletion, DocumentListing, InsightInput, Upload};

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for AdminError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => AdminError::NotFound(what),
            StoreError::Conflict(what) => AdminError::Conflict(what),
            other => AdminError::Store(other),
        }
    }
}

pub type AdminResult<T> = Result<T, AdminError>;

/// An insight ready to persist, plus the image uploaded for it (if any) so
/// it can be removed again when the write fails.
struct PreparedInsight {
    record: InsightRecord,
    uploaded_image: Option<String>,
}

#[derive(Clone)]
pub struct AdminService {
    repo: Arc<dyn ContentRepository>,
    storage: Arc<dyn ObjectStorage>,
    site: SiteData,
    events: EventBus,
}

impl AdminService {
    pub fn new(
        repo: Arc<dyn ContentRepository>,
        storage: Arc<dyn ObjectStorage>,
        site: SiteData,
        events: EventBus,
    ) -> Self {
        Self {
            repo,
            storage,
            site,
            events,
        }
    }

    /// Stored content merged over the expected section list, so every
    /// expected section has a row even before its first save.
    pub async fn list_content(&self) -> AdminResult<Vec<ContentRow>> {
        let mut stored: BTreeMap<String, ContentEntry> = self
            .repo
            .list_content_entries()
            .await?
            .into_iter()
            .map(|entry| (entry.section.clone(), entry))
            .collect();

        let mut rows: Vec<ContentRow> = CONTENT_SECTIONS
            .iter()
            .map(|def| {
                let entry = stored.remove(def.key);
                ContentRow {
                    section: def.key.to_string(),
                    label: Some(def.label.to_string()),
                    saved: entry.is_some(),
                    updated_at: entry.as_ref().map(|e| e.updated_at),
                    text: entry.map(|e| e.text).unwrap_or_default(),
                    fallback: Some(def.fallback.to_string()),
                }
            })
            .collect();

        rows.extend(stored.into_values().map(|entry| ContentRow {
            section: entry.section,
            label: None,
            text: entry.text,
            fallback: None,
            saved: true,
            updated_at: Some(entry.updated_at),
        }));
        Ok(rows)
    }

    /// Create or update one content section.
    pub async fn save_content(
        &self,
        actor: &str,
        section: &str,
        text: &str,
    ) -> AdminResult<ContentEntry> {
        validate_content_update(section, text)?;
        let clean = sanitize_text(text);

        let entry = self.repo.upsert_content_entry(section, &clean).await?;
        tracing::info!(section, actor, "content saved");

        self.site.refresh_content().await;
        self.events.publish(SiteEvent::ContentSaved(ContentSavedEvent {
            section: entry.section.clone(),
            actor: actor.to_string(),
            timestamp: Utc::now(),
        }));
        Ok(entry)
    }

    pub async fn list_insights(&self) -> AdminResult<Vec<Insight>> {
        Ok(self.repo.list_insights().await?)
    }

    /// Bucket documents joined against insights by filename.
    pub async fn list_documents(&self) -> AdminResult<Vec<DocumentListing>> {
        let documents = self.storage.list_objects().await?;
        let mut by_document: HashMap<String, Insight> = self
            .repo
            .list_insights()
            .await?
            .into_iter()
            .filter_map(|insight| {
                insight
                    .document_filename
                    .clone()
                    .map(|name| (name, insight))
            })
            .collect();

        Ok(documents
            .into_iter()
            .map(|document| {
                let insight = by_document.remove(&document.name);
                let status = if insight.is_some() {
                    DocumentStatus::Published
                } else {
                    DocumentStatus::Available
                };
                DocumentListing {
                    document,
                    status,
                    insight,
                }
            })
            .collect())
    }

    /// Store a new document at the bucket root. Names must be unused.
    pub async fn upload_document(&self, actor: &str, upload: Upload) -> AdminResult<UploadedDocument> {
        let mime = validate_upload(
            UploadKind::Document,
            &upload.filename,
            upload.content_type.as_deref(),
            upload.bytes.len(),
        )?;
        let name = upload.filename.trim().to_string();

        if self.find_document(&name).await?.is_some() {
            return Err(AdminError::Conflict(format!("document {name} already exists")));
        }

        let size = upload.bytes.len() as u64;
        self.storage.upload(&name, upload.bytes, &mime).await?;
        tracing::info!(name = %name, size, actor, "document uploaded");

        let now = Utc::now();
        self.events.publish(SiteEvent::DocumentUploaded(DocumentEvent {
            name: name.clone(),
            actor: actor.to_string(),
            timestamp: now,
        }));
        Ok(UploadedDocument {
            name,
            size,
            mimetype: Some(mime),
            created_at: Some(now),
            updated_at: Some(now),
        })
    }

    pub async fn create_insight(
        &self,
        actor: &str,
        input: InsightInput,
        image: Option<Upload>,
    ) -> AdminResult<Insight> {
        let prepared = self.prepare_insight(input, image, None).await?;
        let insight = match self.repo.create_insight(&prepared.record).await {
            Ok(insight) => insight,
            Err(err) => {
                self.discard_image(prepared.uploaded_image).await;
                return Err(err.into());
            }
        };
        tracing::info!(insight_id = %insight.id, actor, "insight created");

        self.site.refresh_insights().await;
        self.events.publish(SiteEvent::InsightCreated(InsightEvent {
            insight_id: insight.id,
            actor: actor.to_string(),
            timestamp: Utc::now(),
        }));
        Ok(insight)
    }

    pub async fn update_insight(
        &self,
        actor: &str,
        id: Uuid,
        input: InsightInput,
        image: Option<Upload>,
    ) -> AdminResult<Insight> {
        let current = self.repo.get_insight(id).await?;
        let prepared = self.prepare_insight(input, image, Some(&current)).await?;
        let insight = match self.repo.update_insight(id, &prepared.record).await {
            Ok(insight) => insight,
            Err(err) => {
                self.discard_image(prepared.uploaded_image).await;
                return Err(err.into());
            }
        };
        tracing::info!(insight_id = %insight.id, actor, "insight updated");

        self.site.refresh_insights().await;
        if insight.image_url != current.image_url {
            self.discard_image(self.stored_image_key(&current)).await;
        }
        self.events.publish(SiteEvent::InsightUpdated(InsightEvent {
            insight_id: insight.id,
            actor: actor.to_string(),
            timestamp: Utc::now(),
        }));
        Ok(insight)
    }

    /// Delete the insight record and its uploaded image. Its document stays
    /// and becomes available.
    pub async fn delete_insight(&self, actor: &str, id: Uuid) -> AdminResult<()> {
        let insight = self.repo.get_insight(id).await?;
        self.repo.delete_insight(id).await?;
        tracing::info!(insight_id = %id, actor, "insight deleted");

        self.site.refresh_insights().await;
        self.discard_image(self.stored_image_key(&insight)).await;
        self.events.publish(SiteEvent::InsightDeleted(InsightEvent {
            insight_id: id,
            actor: actor.to_string(),
            timestamp: Utc::now(),
        }));
        Ok(())
    }

    /// Delete a document and every insight that references it.
    pub async fn delete_document(&self, actor: &str, name: &str) -> AdminResult<DocumentDeletion> {
        if let Some(problem) = filename_problem(name) {
            return Err(ValidationErrors::single("name", problem).into());
        }
        if self.find_document(name).await?.is_none() {
            return Err(AdminError::NotFound(format!("document {name}")));
        }

        let images: Vec<String> = self
            .repo
            .list_insights()
            .await?
            .iter()
            .filter(|i| i.document_filename.as_deref() == Some(name))
            .filter_map(|i| self.stored_image_key(i))
            .collect();
        let removed_insights = self.repo.delete_insights_for_document(name).await?;
        // The rows are gone even if the object removal below fails.
        if removed_insights > 0 {
            self.site.refresh_insights().await;
        }
        for key in images {
            self.discard_image(Some(key)).await;
        }

        self.storage.remove(name).await?;
        tracing::info!(name, removed_insights, actor, "document deleted");

        self.events.publish(SiteEvent::DocumentDeleted(DocumentDeletedEvent {
            name: name.to_string(),
            removed_insights,
            actor: actor.to_string(),
            timestamp: Utc::now(),
        }));
        Ok(DocumentDeletion {
            name: name.to_string(),
            removed_insights,
        })
    }

    async fn find_document(&self, name: &str) -> AdminResult<Option<UploadedDocument>> {
        Ok(self
            .storage
            .list_objects()
            .await?
            .into_iter()
            .find(|d| d.name == name))
    }

    /// Validate and sanitize an insight submission, check its document
    /// reference, and upload its image. Nothing is written when validation
    /// fails.
    async fn prepare_insight(
        &self,
        input: InsightInput,
        image: Option<Upload>,
        current: Option<&Insight>,
    ) -> AdminResult<PreparedInsight> {
        let mut input = input.normalized();
        if input.image_url.is_none() && image.is_none() {
            input.image_url = current.and_then(|c| c.image_url.clone());
        }

        let mut errors = ValidationErrors::new();
        input.check(&mut errors, image.is_some());
        let image_mime = match &image {
            Some(upload) => match validate_upload(
                UploadKind::Image,
                &upload.filename,
                upload.content_type.as_deref(),
                upload.bytes.len(),
            ) {
                Ok(mime) => Some(mime),
                Err(upload_errors) => {
                    errors.errors.extend(upload_errors.errors);
                    None
                }
            },
            None => None,
        };

        let title = sanitize_text(&input.title);
        let description = sanitize_text(&input.description);
        if errors.field("title").is_none() && title.is_empty() {
            errors.push("title", "Title is empty after removing markup");
        }
        if errors.field("description").is_none() && description.is_empty() {
            errors.push("description", "Description is empty after removing markup");
        }
        errors.into_result()?;

        if let Some(filename) = &input.document_filename {
            self.check_document_reference(filename, current.map(|c| c.id))
                .await?;
        }

        let mut uploaded_image = None;
        let mut image_url = input.image_url;
        if let (Some(upload), Some(mime)) = (image, image_mime) {
            let key = ObjectName::image_for_upload(&upload.filename, Utc::now()).key();
            self.storage.upload(&key, upload.bytes, &mime).await?;
            image_url = Some(self.storage.public_url(&key));
            uploaded_image = Some(key);
        }

        let document_url = match (&input.document_url, &input.document_filename) {
            (Some(url), _) => Some(url.clone()),
            (None, Some(filename)) => Some(self.storage.public_url(filename)),
            (None, None) => None,
        };

        Ok(PreparedInsight {
            record: InsightRecord {
                title,
                description,
                image_url,
                document_url,
                document_filename: input.document_filename,
                display_order: input.display_order,
                is_active: input.is_active,
            },
            uploaded_image,
        })
    }

    /// The document must exist and must not already back another insight.
    async fn check_document_reference(&self, filename: &str, editing: Option<Uuid>) -> AdminResult<()> {
        if self.find_document(filename).await?.is_none() {
            return Err(AdminError::NotFound(format!("document {filename}")));
        }
        let taken = self
            .repo
            .list_insights()
            .await?
            .into_iter()
            .any(|i| i.document_filename.as_deref() == Some(filename) && Some(i.id) != editing);
        if taken {
            return Err(AdminError::Conflict(format!(
                "document {filename} is already published by another insight"
            )));
        }
        Ok(())
    }

    /// Bucket key of the insight's image when it was uploaded through this
    /// service. External and built-in image URLs give `None`.
    fn stored_image_key(&self, insight: &Insight) -> Option<String> {
        let url = insight.image_url.as_deref()?;
        let start = url.rfind("/images/")? + 1;
        let name = ObjectName::parse(&url[start..]);
        let key = name.key();
        (name.is_image() && self.storage.public_url(&key) == url).then_some(key)
    }

    async fn discard_image(&self, key: Option<String>) {
        if let Some(key) = key {
            if let Err(err) = self.storage.remove(&key).await {
                tracing::warn!(key = %key, error = %err, "could not remove orphaned image");
            }
        }
    }
}
