//! Job repository
//!
//! Handles all database operations related to jobs.

use sqlx::PgPool;
use uuid::Uuid;

use joule_core::domain::job::{Job, JobState};
use joule_core::domain::market::ProcessType;

use crate::repository::MetadataError;

/// Create a new job record
pub async fn create(pool: &PgPool, job: &Job) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO jobs (id, process_type, state, state_description, cluster_id,
                          engine_job_id, run_id, begin_time, end_time, persist_source,
                          created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(job.id)
    .bind(job.process_type.name())
    .bind(state_to_string(job.state))
    .bind(&job.state_description)
    .bind(&job.cluster_id)
    .bind(job.engine_job_id)
    .bind(job.run_id)
    .bind(job.begin_time)
    .bind(job.end_time)
    .bind(job.persist_source)
    .bind(job.created_at)
    .bind(job.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Persist the job's mutable fields
pub async fn update(pool: &PgPool, job: &Job) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE jobs
        SET state = $1, state_description = $2, cluster_id = $3,
            engine_job_id = $4, run_id = $5, updated_at = $6
        WHERE id = $7
        "#,
    )
    .bind(state_to_string(job.state))
    .bind(&job.state_description)
    .bind(&job.cluster_id)
    .bind(job.engine_job_id)
    .bind(job.run_id)
    .bind(job.updated_at)
    .bind(job.id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Find a job by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Job>, MetadataError> {
    let row = sqlx::query_as::<_, JobRow>(
        r#"
        SELECT id, process_type, state, state_description, cluster_id,
               engine_job_id, run_id, begin_time, end_time, persist_source,
               created_at, updated_at
        FROM jobs
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(Job::try_from).transpose()
}

// =============================================================================
// Helper Functions
// =============================================================================

fn state_to_string(state: JobState) -> &'static str {
    match state {
        JobState::Created => "Created",
        JobState::ClusterStartup => "ClusterStartup",
        JobState::ClusterWarmingUp => "ClusterWarmingUp",
        JobState::ClusterCreated => "ClusterCreated",
        JobState::Calculating => "Calculating",
        JobState::Completed => "Completed",
        JobState::CompletedWithFail => "CompletedWithFail",
        JobState::ClusterFailed => "ClusterFailed",
    }
}

fn string_to_state(s: &str) -> Option<JobState> {
    match s {
        "Created" => Some(JobState::Created),
        "ClusterStartup" => Some(JobState::ClusterStartup),
        "ClusterWarmingUp" => Some(JobState::ClusterWarmingUp),
        "ClusterCreated" => Some(JobState::ClusterCreated),
        "Calculating" => Some(JobState::Calculating),
        "Completed" => Some(JobState::Completed),
        "CompletedWithFail" => Some(JobState::CompletedWithFail),
        "ClusterFailed" => Some(JobState::ClusterFailed),
        _ => None,
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    process_type: String,
    state: String,
    state_description: String,
    cluster_id: Option<String>,
    engine_job_id: Option<i64>,
    run_id: Option<i64>,
    begin_time: chrono::DateTime<chrono::Utc>,
    end_time: chrono::DateTime<chrono::Utc>,
    persist_source: bool,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<JobRow> for Job {
    type Error = MetadataError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let state = string_to_state(&row.state)
            .ok_or_else(|| MetadataError::Corrupt(format!("unknown job state {}", row.state)))?;
        let process_type: ProcessType = row
            .process_type
            .parse()
            .map_err(|e| MetadataError::Corrupt(format!("{}", e)))?;

        Ok(Job {
            id: row.id,
            process_type,
            state,
            state_description: row.state_description,
            cluster_id: row.cluster_id,
            engine_job_id: row.engine_job_id,
            run_id: row.run_id,
            begin_time: row.begin_time,
            end_time: row.end_time,
            persist_source: row.persist_source,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
