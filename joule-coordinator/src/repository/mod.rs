//! Metadata persistence
//!
//! Job and JobResult records are persisted after every state transition so
//! an observer can always see current progress. Updates are idempotent-safe
//! against repeated identical writes.

pub mod job;
pub mod memory;
pub mod result;

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use joule_core::domain::job::{Job, JobResult};

pub use memory::InMemoryMetadataStore;

/// Metadata persistence errors
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("job not found: {0}")]
    JobNotFound(Uuid),

    /// Stored record does not round-trip into the domain type
    #[error("corrupt metadata record: {0}")]
    Corrupt(String),
}

/// Persistence operations the coordinator needs for job metadata
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn create_job(&self, job: &Job) -> Result<(), MetadataError>;

    /// Persists the job's mutable fields; repeating an identical write is a
    /// no-op at the storage level
    async fn update_job(&self, job: &Job) -> Result<(), MetadataError>;

    async fn get_job(&self, id: Uuid) -> Result<Job, MetadataError>;

    async fn create_result(&self, result: &JobResult) -> Result<(), MetadataError>;

    async fn update_result(&self, result: &JobResult) -> Result<(), MetadataError>;
}

/// Postgres-backed metadata store
#[derive(Debug, Clone)]
pub struct PostgresMetadataStore {
    pool: PgPool,
}

impl PostgresMetadataStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetadataStore for PostgresMetadataStore {
    async fn create_job(&self, job: &Job) -> Result<(), MetadataError> {
        job::create(&self.pool, job).await?;
        Ok(())
    }

    async fn update_job(&self, job: &Job) -> Result<(), MetadataError> {
        job::update(&self.pool, job).await?;
        Ok(())
    }

    async fn get_job(&self, id: Uuid) -> Result<Job, MetadataError> {
        job::find_by_id(&self.pool, id)
            .await?
            .ok_or(MetadataError::JobNotFound(id))
    }

    async fn create_result(&self, result: &JobResult) -> Result<(), MetadataError> {
        result::create(&self.pool, result).await?;
        Ok(())
    }

    async fn update_result(&self, result: &JobResult) -> Result<(), MetadataError> {
        result::update(&self.pool, result).await?;
        Ok(())
    }
}
