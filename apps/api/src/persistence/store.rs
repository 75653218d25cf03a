use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::models::resume::ResumeVersionRow;
use crate::resume::record::ResumeRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Stored resume is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Revision {0} does not fit the storage column")]
    RevisionOverflow(u64),

    #[cfg(test)]
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// The latest committed state of one resume.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredResume {
    pub revision: u64,
    pub record: ResumeRecord,
}

/// Durable storage for canonical records. Carried as `Arc<dyn ResumeStore>`.
#[async_trait]
pub trait ResumeStore: Send + Sync {
    async fn load(&self, resume_id: Uuid) -> Result<Option<StoredResume>, StoreError>;

    async fn save(
        &self,
        resume_id: Uuid,
        revision: u64,
        record: &ResumeRecord,
    ) -> Result<(), StoreError>;
}

/// PostgreSQL store. Append-only: each save inserts a new version row and
/// loads read the highest revision.
pub struct PgResumeStore {
    pool: PgPool,
}

impl PgResumeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResumeStore for PgResumeStore {
    async fn load(&self, resume_id: Uuid) -> Result<Option<StoredResume>, StoreError> {
        let row: Option<ResumeVersionRow> = sqlx::query_as(
            r#"
            SELECT * FROM resume_versions
            WHERE resume_id = $1
            ORDER BY revision DESC
            LIMIT 1
            "#,
        )
        .bind(resume_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(StoredResume {
            revision: u64::try_from(row.revision).unwrap_or_default(),
            record: ResumeRecord::from_value(row.data)?,
        }))
    }

    async fn save(
        &self,
        resume_id: Uuid,
        revision: u64,
        record: &ResumeRecord,
    ) -> Result<(), StoreError> {
        let stored_revision =
            i64::try_from(revision).map_err(|_| StoreError::RevisionOverflow(revision))?;
        let data = serde_json::to_value(record)?;

        sqlx::query(
            r#"
            INSERT INTO resume_versions (id, resume_id, revision, data)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(resume_id)
        .bind(stored_revision)
        .bind(&data)
        .execute(&self.pool)
        .await?;

        info!("Saved resume {resume_id} revision {revision}");
        Ok(())
    }
}
