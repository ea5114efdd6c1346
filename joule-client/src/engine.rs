//! Compute-engine abstraction
//!
//! The coordinator's job state machine is generic over this trait so its
//! lifecycle logic can be unit-tested against a scripted engine.

use async_trait::async_trait;

use joule_core::dto::engine::{ClusterInfo, JobDefinition, Run};

use crate::error::Result;

/// Operations the coordinator needs from the external compute engine
#[async_trait]
pub trait ComputeEngine: Send + Sync {
    /// Full cluster roster
    async fn list_clusters(&self) -> Result<Vec<ClusterInfo>>;

    /// Issue a start command for a terminated cluster
    async fn start_cluster(&self, cluster_id: &str) -> Result<()>;

    /// Current state of one cluster
    async fn get_cluster(&self, cluster_id: &str) -> Result<ClusterInfo>;

    /// Register a job definition, returning the engine job id
    async fn create_job(&self, definition: &JobDefinition) -> Result<i64>;

    /// Trigger a run of a registered job, returning the run id
    async fn run_now(&self, job_id: i64) -> Result<i64>;

    /// Current status of a run
    async fn get_run(&self, run_id: i64) -> Result<Run>;
}
