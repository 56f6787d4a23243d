use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{ContentRepository, StoreError, StoreResult};
use crate::config::{is_valid_table_name, StoreConfig};
use crate::content::model::{ContentEntry, Insight, InsightRecord};

const CONTENT_COLUMNS: &str = "id, section, text, created_at, updated_at";
const INSIGHT_COLUMNS: &str = "id, title, description, image_url, document_url, \
     document_filename, display_order, is_active, created_at, updated_at";

/// `ContentRepository` over the store's PostgreSQL database.
#[derive(Debug, Clone)]
pub struct PgContentRepository {
    pool: PgPool,
    content_table: String,
    insights_table: String,
}

impl PgContentRepository {
    pub fn new(pool: PgPool, config: &StoreConfig) -> StoreResult<Self> {
        for table in [&config.content_table, &config.insights_table] {
            if !is_valid_table_name(table) {
                return Err(StoreError::Decode(format!("invalid table name: {table}")));
            }
        }
        Ok(Self {
            pool,
            content_table: config.content_table.clone(),
            insights_table: config.insights_table.clone(),
        })
    }
}

/// Unique violations (one insight per document) become conflicts.
fn write_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(db.message().to_string())
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl ContentRepository for PgContentRepository {
    async fn list_content_entries(&self) -> StoreResult<Vec<ContentEntry>> {
        let sql = format!(
            "SELECT {CONTENT_COLUMNS} FROM {} ORDER BY section",
            self.content_table
        );
        let rows = sqlx::query_as::<_, ContentEntry>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn upsert_content_entry(&self, section: &str, text: &str) -> StoreResult<ContentEntry> {
        let sql = format!(
            "INSERT INTO {} (section, text) VALUES ($1, $2) \
             ON CONFLICT (section) DO UPDATE SET text = EXCLUDED.text, updated_at = now() \
             RETURNING {CONTENT_COLUMNS}",
            self.content_table
        );
        let row = sqlx::query_as::<_, ContentEntry>(&sql)
            .bind(section)
            .bind(text)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_active_insights(&self) -> StoreResult<Vec<Insight>> {
        let sql = format!(
            "SELECT {INSIGHT_COLUMNS} FROM {} WHERE is_active = true \
             ORDER BY display_order ASC",
            self.insights_table
        );
        let rows = sqlx::query_as::<_, Insight>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_insights(&self) -> StoreResult<Vec<Insight>> {
        let sql = format!(
            "SELECT {INSIGHT_COLUMNS} FROM {} ORDER BY display_order ASC, created_at DESC",
            self.insights_table
        );
        let rows = sqlx::query_as::<_, Insight>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get_insight(&self, id: Uuid) -> StoreResult<Insight> {
        let sql = format!(
            "SELECT {INSIGHT_COLUMNS} FROM {} WHERE id = $1",
            self.insights_table
        );
        sqlx::query_as::<_, Insight>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("insight {id}")))
    }

    async fn create_insight(&self, record: &InsightRecord) -> StoreResult<Insight> {
        let sql = format!(
            "INSERT INTO {} (title, description, image_url, document_url, document_filename, \
             display_order, is_active) VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {INSIGHT_COLUMNS}",
            self.insights_table
        );
        let row = sqlx::query_as::<_, Insight>(&sql)
            .bind(&record.title)
            .bind(&record.description)
            .bind(&record.image_url)
            .bind(&record.document_url)
            .bind(&record.document_filename)
            .bind(record.display_order)
            .bind(record.is_active)
            .fetch_one(&self.pool)
            .await
            .map_err(write_error)?;
        Ok(row)
    }

    async fn update_insight(&self, id: Uuid, record: &InsightRecord) -> StoreResult<Insight> {
        let sql = format!(
            "UPDATE {} SET title = $2, description = $3, image_url = $4, document_url = $5, \
             document_filename = $6, display_order = $7, is_active = $8, updated_at = now() \
             WHERE id = $1 RETURNING {INSIGHT_COLUMNS}",
            self.insights_table
        );
        sqlx::query_as::<_, Insight>(&sql)
            .bind(id)
            .bind(&record.title)
            .bind(&record.description)
            .bind(&record.image_url)
            .bind(&record.document_url)
            .bind(&record.document_filename)
            .bind(record.display_order)
            .bind(record.is_active)
            .fetch_optional(&self.pool)
            .await
            .map_err(write_error)?
            .ok_or_else(|| StoreError::NotFound(format!("insight {id}")))
    }

    async fn delete_insight(&self, id: Uuid) -> StoreResult<()> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.insights_table);
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("insight {id}")));
        }
        Ok(())
    }

    async fn delete_insights_for_document(&self, filename: &str) -> StoreResult<u64> {
        let sql = format!(
            "DELETE FROM {} WHERE document_filename = $1",
            self.insights_table
        );
        let result = sqlx::query(&sql).bind(filename).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
