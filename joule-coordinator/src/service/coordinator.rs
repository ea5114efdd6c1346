//! Coordinator service
//!
//! Owns the lifecycle of one aggregation run against the external compute
//! engine: requests cluster start, polls cluster state against a deadline,
//! submits the job, polls the run to completion, and persists every state
//! transition so observers always see current progress.
//!
//! One polling sequence runs per job; separate jobs may be supervised
//! concurrently since the service holds no per-job state between calls.
//! After a crash the external engine's cluster/run status is authoritative,
//! not the last persisted description.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use uuid::Uuid;

use joule_client::ComputeEngine;
use joule_core::domain::job::{Job, JobState};
use joule_core::domain::market::ProcessType;
use joule_core::dto::engine::{ClusterInfo, ClusterState, JobDefinition};

use crate::config::CoordinatorConfig;
use crate::dispatch::DispatchEngine;
use crate::error::{CoordinatorError, Result};
use crate::repository::MetadataStore;
use crate::storage::ResultStore;
use crate::transport::OutboundTransport;

/// Cancellation signal checked on every poll iteration
pub type CancelSignal = watch::Receiver<bool>;

pub struct CoordinatorService<E> {
    pub(crate) config: CoordinatorConfig,
    pub(crate) engine: Arc<E>,
    pub(crate) store: Arc<dyn MetadataStore>,
    pub(crate) results: Arc<dyn ResultStore>,
    pub(crate) transport: Arc<dyn OutboundTransport>,
    pub(crate) dispatch: DispatchEngine,
}

impl<E: ComputeEngine> CoordinatorService<E> {
    pub fn new(
        config: CoordinatorConfig,
        engine: Arc<E>,
        store: Arc<dyn MetadataStore>,
        results: Arc<dyn ResultStore>,
        transport: Arc<dyn OutboundTransport>,
        dispatch: DispatchEngine,
    ) -> Self {
        Self {
            config,
            engine,
            store,
            results,
            transport,
            dispatch,
        }
    }

    /// Starts an aggregation job and supervises it to completion
    ///
    /// Returns the job id once the engine run has completed successfully.
    /// Any failure is logged with full context, reflected on the job record
    /// where a terminal state applies, and re-thrown without retry;
    /// cancellation propagates without marking the job failed.
    pub async fn start_aggregation_job(
        &self,
        process_type: ProcessType,
        begin_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        persist_source: bool,
        mut cancel: CancelSignal,
    ) -> Result<Uuid> {
        if end_time <= begin_time {
            return Err(CoordinatorError::Validation(
                "end_time must be after begin_time".to_string(),
            ));
        }

        let mut job = Job::new(process_type, begin_time, end_time, persist_source);
        self.store.create_job(&job).await?;
        tracing::info!(job_id = %job.id, process_type = process_type.name(), "Aggregation job created");

        match self.supervise(&mut job, &mut cancel).await {
            Ok(()) => Ok(job.id),
            Err(CoordinatorError::Cancelled) => {
                tracing::info!(job_id = %job.id, "Aggregation job cancelled");
                Err(CoordinatorError::Cancelled)
            }
            Err(err) => {
                tracing::error!(
                    job_id = %job.id,
                    process_type = process_type.name(),
                    %begin_time,
                    %end_time,
                    error = %err,
                    "Aggregation job failed"
                );
                Err(err)
            }
        }
    }

    /// Drives one job through the full engine sequence
    async fn supervise(&self, job: &mut Job, cancel: &mut CancelSignal) -> Result<()> {
        let cluster = self.await_cluster(job, cancel).await?;

        job.cluster_id = Some(cluster.cluster_id.clone());
        self.transition(job, JobState::ClusterCreated, JobState::ClusterCreated.description())
            .await?;

        let definition = self.job_definition(job, &cluster.cluster_id);
        let engine_job_id = self.engine.create_job(&definition).await?;
        job.engine_job_id = Some(engine_job_id);
        self.store.update_job(job).await?;

        let run_id = self.engine.run_now(engine_job_id).await?;
        job.run_id = Some(run_id);
        self.transition(job, JobState::Calculating, format!("Waiting for run {}", run_id))
            .await?;

        self.await_run(job, run_id, cancel).await
    }

    /// Resolves the configured cluster and waits until it is running
    ///
    /// Issues a start command only when the cluster is terminated. Exceeding
    /// the configured timeout marks the job `ClusterFailed` and fails the
    /// operation; no job is submitted in that case.
    async fn await_cluster(&self, job: &mut Job, cancel: &mut CancelSignal) -> Result<ClusterInfo> {
        let clusters = self.engine.list_clusters().await?;
        let mut cluster = clusters
            .into_iter()
            .find(|c| c.cluster_name == self.config.cluster_name)
            .ok_or_else(|| {
                CoordinatorError::Validation(format!(
                    "cluster {} is not registered with the engine",
                    self.config.cluster_name
                ))
            })?;

        if cluster.state == ClusterState::Terminated {
            self.transition(
                job,
                JobState::ClusterStartup,
                format!("Starting cluster {}", cluster.cluster_id),
            )
            .await?;
            self.engine.start_cluster(&cluster.cluster_id).await?;
        }

        let deadline =
            tokio::time::Instant::now() + Duration::from_secs(60 * self.config.cluster_timeout_minutes);

        while !cluster.is_running() {
            let description = format!(
                "Waiting for cluster {}, state is {:?}",
                cluster.cluster_id, cluster.state
            );
            tracing::info!(job_id = %job.id, "{}", description);
            if job.state == JobState::ClusterWarmingUp {
                self.describe(job, description).await?;
            } else {
                self.transition(job, JobState::ClusterWarmingUp, description).await?;
            }

            if tokio::time::Instant::now() >= deadline {
                let reason = format!(
                    "Could not start cluster {} within {} minutes",
                    cluster.cluster_id, self.config.cluster_timeout_minutes
                );
                tracing::error!(job_id = %job.id, "{}", reason);
                self.transition(job, JobState::ClusterFailed, reason).await?;
                return Err(CoordinatorError::ClusterStartTimeout {
                    cluster_id: cluster.cluster_id,
                    minutes: self.config.cluster_timeout_minutes,
                });
            }

            self.wait(self.config.cluster_poll_interval, cancel).await?;
            cluster = self.engine.get_cluster(&cluster.cluster_id).await?;
        }

        Ok(cluster)
    }

    /// Polls the run until the engine reports completion
    ///
    /// This loop has no deadline: the engine enforces its own run timeout,
    /// so completion is awaited indefinitely.
    async fn await_run(&self, job: &mut Job, run_id: i64, cancel: &mut CancelSignal) -> Result<()> {
        let mut run = self.engine.get_run(run_id).await?;

        while !run.is_completed {
            tracing::info!(job_id = %job.id, run_id, "Waiting for engine run to complete");
            self.describe(job, format!("Waiting for engine run {} to complete", run_id))
                .await?;
            self.wait(self.config.run_poll_interval, cancel).await?;
            run = self.engine.get_run(run_id).await?;
        }

        if run.is_success {
            self.transition(job, JobState::Completed, JobState::Completed.description())
                .await?;
            tracing::info!(job_id = %job.id, run_id, "Aggregation run completed");
            Ok(())
        } else {
            self.transition(
                job,
                JobState::CompletedWithFail,
                format!("Engine run {} completed with failure", run_id),
            )
            .await?;
            Err(CoordinatorError::RunFailed { run_id })
        }
    }

    /// Builds the engine job definition from the request parameters
    fn job_definition(&self, job: &Job, cluster_id: &str) -> JobDefinition {
        let config = &self.config;
        JobDefinition {
            name: config.job_name.clone(),
            existing_cluster_id: cluster_id.to_string(),
            task_file: config.task_file.clone(),
            parameters: vec![
                format!("--input-storage-account-name={}", config.input_storage_account),
                format!("--input-storage-container-name={}", config.input_storage_container),
                format!("--input-path={}", config.input_path),
                format!("--grid-loss-sys-cor-path={}", config.grid_loss_sys_cor_path),
                format!("--beginning-date-time={}", job.begin_time.to_rfc3339()),
                format!("--end-date-time={}", job.end_time.to_rfc3339()),
                format!("--process-type={}", job.process_type.name()),
                format!("--result-url={}", config.result_url),
                format!("--snapshot-url={}", config.snapshot_url),
                format!("--result-id={}", job.id),
                format!("--persist-source-dataframe={}", job.persist_source),
                format!("--persist-source-dataframe-location={}", config.persist_location),
            ],
        }
    }

    /// Applies and persists a state transition
    async fn transition(
        &self,
        job: &mut Job,
        next: JobState,
        description: impl Into<String>,
    ) -> Result<()> {
        let previous = job.transition_to(next, description)?;
        tracing::debug!(job_id = %job.id, from = ?previous, to = ?next, "Job state transition");
        self.store.update_job(job).await?;
        Ok(())
    }

    /// Persists a new state description without changing state
    async fn describe(&self, job: &mut Job, description: String) -> Result<()> {
        job.state_description = description;
        job.updated_at = Utc::now();
        self.store.update_job(job).await?;
        Ok(())
    }

    /// Sleeps one poll interval, returning early on cancellation
    async fn wait(&self, interval: Duration, cancel: &mut CancelSignal) -> Result<()> {
        if *cancel.borrow() {
            return Err(CoordinatorError::Cancelled);
        }
        tokio::select! {
            _ = tokio::time::sleep(interval) => Ok(()),
            changed = cancel.changed() => match changed {
                Ok(()) if *cancel.borrow() => Err(CoordinatorError::Cancelled),
                // Sender gone or a non-cancel update: finish the sleep.
                _ => {
                    tokio::time::sleep(interval).await;
                    Ok(())
                }
            },
        }
    }
}
