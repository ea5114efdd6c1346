//! Job API Handlers
//!
//! HTTP endpoints for starting aggregation jobs and handling engine result
//! notifications.

use axum::{Json, extract::Path, extract::State};
use serde::Serialize;
use uuid::Uuid;

use joule_core::domain::job::Job;
use joule_core::domain::market::ProcessType;
use joule_core::dto::api::{ResultNotification, StartJobRequest};

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};

#[derive(Debug, Serialize)]
pub struct StartJobResponse {
    pub job_id: Uuid,
}

/// POST /job/start
/// Start a new aggregation job and supervise it to completion
pub async fn start_job(
    State(state): State<AppState>,
    Json(req): Json<StartJobRequest>,
) -> ApiResult<Json<StartJobResponse>> {
    tracing::info!("Starting aggregation job: {}", req.process_type);

    let process_type: ProcessType = req
        .process_type
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("{}", e)))?;

    let job_id = state
        .service
        .start_aggregation_job(
            process_type,
            req.begin_time,
            req.end_time,
            req.persist_source,
            state.shutdown.clone(),
        )
        .await?;

    Ok(Json(StartJobResponse { job_id }))
}

/// GET /job/{id}
/// Get job details by ID
pub async fn get_job(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Job>> {
    tracing::debug!("Getting job: {}", id);

    let job = state
        .store
        .get_job(id)
        .await
        .map_err(crate::error::CoordinatorError::from)?;

    Ok(Json(job))
}

/// POST /result/handle
/// Handle one engine result notification
pub async fn handle_result(
    State(state): State<AppState>,
    Json(notification): Json<ResultNotification>,
) -> ApiResult<Json<serde_json::Value>> {
    state.service.handle_result(&notification).await?;
    Ok(Json(serde_json::json!({ "status": "handled" })))
}

/// POST /result/documents
/// Build CIM XML documents for one result path
pub async fn build_result_documents(
    State(state): State<AppState>,
    Json(notification): Json<ResultNotification>,
) -> ApiResult<Json<Vec<String>>> {
    let documents = state.service.build_result_documents(&notification).await?;
    Ok(Json(documents))
}
