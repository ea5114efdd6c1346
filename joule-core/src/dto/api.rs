//! Coordinator HTTP surface DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request to start a new aggregation job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartJobRequest {
    pub process_type: String,
    pub begin_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub persist_source: bool,
}

/// Notification that engine output is ready at a storage path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultNotification {
    pub input_path: String,
    pub result_id: String,
    pub process_type: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}
