//! In-memory metadata store
//!
//! Backs unit tests and embedded runs where no database is available. The
//! coordinator only ever has a single writer per job, so a plain map behind
//! an async lock is sufficient.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use joule_core::domain::job::{Job, JobResult};

use crate::repository::{MetadataError, MetadataStore};

#[derive(Debug, Default)]
pub struct InMemoryMetadataStore {
    jobs: RwLock<HashMap<Uuid, Job>>,
    results: RwLock<HashMap<Uuid, JobResult>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a stored result record
    pub async fn result(&self, id: Uuid) -> Option<JobResult> {
        self.results.read().await.get(&id).cloned()
    }

    /// Snapshot of all stored jobs
    pub async fn jobs(&self) -> Vec<Job> {
        self.jobs.read().await.values().cloned().collect()
    }

    /// Snapshot of all stored result records
    pub async fn results(&self) -> Vec<JobResult> {
        self.results.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn create_job(&self, job: &Job) -> Result<(), MetadataError> {
        self.jobs.write().await.insert(job.id, job.clone());
        Ok(())
    }

    async fn update_job(&self, job: &Job) -> Result<(), MetadataError> {
        self.jobs.write().await.insert(job.id, job.clone());
        Ok(())
    }

    async fn get_job(&self, id: Uuid) -> Result<Job, MetadataError> {
        self.jobs
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(MetadataError::JobNotFound(id))
    }

    async fn create_result(&self, result: &JobResult) -> Result<(), MetadataError> {
        self.results.write().await.insert(result.id, result.clone());
        Ok(())
    }

    async fn update_result(&self, result: &JobResult) -> Result<(), MetadataError> {
        self.results.write().await.insert(result.id, result.clone());
        Ok(())
    }
}
