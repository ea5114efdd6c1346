//! Job-related API endpoints
//!
//! Also carries the [`ComputeEngine`] implementation for the HTTP client,
//! tying both endpoint groups together behind the trait the coordinator
//! consumes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use joule_core::dto::engine::{ClusterInfo, JobDefinition, Run};

use crate::EngineClient;
use crate::engine::ComputeEngine;
use crate::error::Result;

#[derive(Debug, Deserialize)]
struct CreateJobResponse {
    job_id: i64,
}

#[derive(Debug, Serialize)]
struct RunNowRequest {
    job_id: i64,
}

#[derive(Debug, Deserialize)]
struct RunNowResponse {
    run_id: i64,
}

#[derive(Debug, Deserialize)]
struct RunStateResponse {
    run_id: i64,
    state: RunState,
}

#[derive(Debug, Deserialize)]
struct RunState {
    life_cycle_state: String,
    #[serde(default)]
    result_state: Option<String>,
}

impl EngineClient {
    /// Register a job definition with the engine
    pub async fn create_job_http(&self, definition: &JobDefinition) -> Result<i64> {
        let response = self
            .post("/api/2.0/jobs/create")
            .json(definition)
            .send()
            .await?;

        let created: CreateJobResponse = self.handle_response(response).await?;
        Ok(created.job_id)
    }

    /// Trigger a run of a registered job
    pub async fn run_now_http(&self, job_id: i64) -> Result<i64> {
        let response = self
            .post("/api/2.0/jobs/run-now")
            .json(&RunNowRequest { job_id })
            .send()
            .await?;

        let run: RunNowResponse = self.handle_response(response).await?;
        Ok(run.run_id)
    }

    /// Get the status of a run
    pub async fn get_run_http(&self, run_id: i64) -> Result<Run> {
        let response = self
            .get("/api/2.0/jobs/runs/get")
            .query(&[("run_id", run_id.to_string())])
            .send()
            .await?;

        let state: RunStateResponse = self.handle_response(response).await?;
        Ok(state.into())
    }
}

impl From<RunStateResponse> for Run {
    fn from(response: RunStateResponse) -> Self {
        let is_completed = matches!(
            response.state.life_cycle_state.as_str(),
            "TERMINATED" | "SKIPPED" | "INTERNAL_ERROR"
        );
        Run {
            run_id: response.run_id,
            is_completed,
            is_success: response.state.result_state.as_deref() == Some("SUCCESS"),
        }
    }
}

#[async_trait]
impl ComputeEngine for EngineClient {
    async fn list_clusters(&self) -> Result<Vec<ClusterInfo>> {
        self.list_clusters_http().await
    }

    async fn start_cluster(&self, cluster_id: &str) -> Result<()> {
        tracing::info!("Starting cluster {}", cluster_id);
        self.start_cluster_http(cluster_id).await
    }

    async fn get_cluster(&self, cluster_id: &str) -> Result<ClusterInfo> {
        self.get_cluster_http(cluster_id).await
    }

    async fn create_job(&self, definition: &JobDefinition) -> Result<i64> {
        tracing::info!("Registering engine job {}", definition.name);
        self.create_job_http(definition).await
    }

    async fn run_now(&self, job_id: i64) -> Result<i64> {
        self.run_now_http(job_id).await
    }

    async fn get_run(&self, run_id: i64) -> Result<Run> {
        self.get_run_http(run_id).await
    }
}
