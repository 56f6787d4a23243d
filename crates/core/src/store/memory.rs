//! In-process store used by tests and local runs without a hosted backend.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{ContentRepository, ObjectStorage, StoreError, StoreResult};
use crate::content::model::{ContentEntry, Insight, InsightRecord, UploadedDocument};
use crate::content::object_name::ObjectName;

#[derive(Debug, Default)]
struct Tables {
    content: BTreeMap<String, ContentEntry>,
    insights: Vec<Insight>,
}

/// `ContentRepository` backed by in-memory tables.
///
/// Counts public-page reads and can be switched into an unavailable state to
/// exercise fallback paths.
#[derive(Debug, Default)]
pub struct MemoryContentRepository {
    tables: Mutex<Tables>,
    reads: AtomicUsize,
    unavailable: AtomicBool,
}

impl MemoryContentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `list_content_entries` / `list_active_insights` calls.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Insert an insight row directly, bypassing validation.
    pub fn seed_insight(&self, record: InsightRecord) -> Insight {
        let insight = new_insight(record);
        self.lock().insights.push(insight.clone());
        insight
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable);
        }
        Ok(())
    }

    fn count_read(&self) -> StoreResult<()> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check_available()
    }
}

fn new_insight(record: InsightRecord) -> Insight {
    let now = Utc::now();
    Insight {
        id: Uuid::now_v7(),
        title: record.title,
        description: record.description,
        image_url: record.image_url,
        document_url: record.document_url,
        document_filename: record.document_filename,
        display_order: record.display_order,
        is_active: record.is_active,
        created_at: now,
        updated_at: now,
    }
}

fn sorted(mut insights: Vec<Insight>) -> Vec<Insight> {
    insights.sort_by_key(|i| i.display_order);
    insights
}

#[async_trait]
impl ContentRepository for MemoryContentRepository {
    async fn list_content_entries(&self) -> StoreResult<Vec<ContentEntry>> {
        self.count_read()?;
        Ok(self.lock().content.values().cloned().collect())
    }

    async fn upsert_content_entry(&self, section: &str, text: &str) -> StoreResult<ContentEntry> {
        self.check_available()?;
        let now = Utc::now();
        let mut tables = self.lock();
        let entry = tables
            .content
            .entry(section.to_string())
            .and_modify(|e| {
                e.text = text.to_string();
                e.updated_at = now;
            })
            .or_insert_with(|| ContentEntry {
                id: Uuid::now_v7(),
                section: section.to_string(),
                text: text.to_string(),
                created_at: now,
                updated_at: now,
            });
        Ok(entry.clone())
    }

    async fn list_active_insights(&self) -> StoreResult<Vec<Insight>> {
        self.count_read()?;
        let active = self
            .lock()
            .insights
            .iter()
            .filter(|i| i.is_active)
            .cloned()
            .collect();
        Ok(sorted(active))
    }

    async fn list_insights(&self) -> StoreResult<Vec<Insight>> {
        self.check_available()?;
        Ok(sorted(self.lock().insights.clone()))
    }

    async fn get_insight(&self, id: Uuid) -> StoreResult<Insight> {
        self.check_available()?;
        self.lock()
            .insights
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("insight {id}")))
    }

    async fn create_insight(&self, record: &InsightRecord) -> StoreResult<Insight> {
        self.check_available()?;
        let insight = new_insight(record.clone());
        self.lock().insights.push(insight.clone());
        Ok(insight)
    }

    async fn update_insight(&self, id: Uuid, record: &InsightRecord) -> StoreResult<Insight> {
        self.check_available()?;
        let mut tables = self.lock();
        let insight = tables
            .insights
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("insight {id}")))?;
        insight.title = record.title.clone();
        insight.description = record.description.clone();
        insight.image_url = record.image_url.clone();
        insight.document_url = record.document_url.clone();
        insight.document_filename = record.document_filename.clone();
        insight.display_order = record.display_order;
        insight.is_active = record.is_active;
        insight.updated_at = Utc::now();
        Ok(insight.clone())
    }

    async fn delete_insight(&self, id: Uuid) -> StoreResult<()> {
        self.check_available()?;
        let mut tables = self.lock();
        let before = tables.insights.len();
        tables.insights.retain(|i| i.id != id);
        if tables.insights.len() == before {
            return Err(StoreError::NotFound(format!("insight {id}")));
        }
        Ok(())
    }

    async fn delete_insights_for_document(&self, filename: &str) -> StoreResult<u64> {
        self.check_available()?;
        let mut tables = self.lock();
        let before = tables.insights.len();
        tables
            .insights
            .retain(|i| i.document_filename.as_deref() != Some(filename));
        Ok((before - tables.insights.len()) as u64)
    }

    async fn ping(&self) -> StoreResult<()> {
        self.check_available()
    }
}

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
    created_at: chrono::DateTime<Utc>,
}

/// `ObjectStorage` keeping uploads in memory.
#[derive(Debug)]
pub struct MemoryObjectStorage {
    base_url: String,
    objects: Mutex<BTreeMap<String, StoredObject>>,
    failing_removals: AtomicBool,
}

impl MemoryObjectStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: Mutex::new(BTreeMap::new()),
            failing_removals: AtomicBool::new(false),
        }
    }

    /// Make `remove` fail with [`StoreError::Unavailable`].
    pub fn set_removals_failing(&self, failing: bool) {
        self.failing_removals.store(failing, Ordering::SeqCst);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, StoredObject>> {
        self.objects.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn list_objects(&self) -> StoreResult<Vec<UploadedDocument>> {
        Ok(self
            .lock()
            .iter()
            .filter(|(key, _)| ObjectName::parse(key).is_document())
            .map(|(key, object)| UploadedDocument {
                name: key.clone(),
                size: object.bytes.len() as u64,
                mimetype: Some(object.content_type.clone()),
                created_at: Some(object.created_at),
                updated_at: Some(object.created_at),
            })
            .collect())
    }

    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> StoreResult<()> {
        let mut objects = self.lock();
        if objects.contains_key(key) {
            return Err(StoreError::Conflict(format!("object {key} already exists")));
        }
        objects.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        if self.failing_removals.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable);
        }
        self.lock()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("object {key}")))
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{key}", self.base_url)
    }
}
