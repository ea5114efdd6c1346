//! Compute-engine wire types
//!
//! Shapes exchanged with the external compute engine's cluster and job APIs.

use serde::{Deserialize, Serialize};

/// Cluster roster entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterInfo {
    pub cluster_id: String,
    pub cluster_name: String,
    pub state: ClusterState,
}

impl ClusterInfo {
    pub fn is_running(&self) -> bool {
        self.state == ClusterState::Running
    }
}

/// Engine-reported cluster state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClusterState {
    Pending,
    Running,
    Restarting,
    Terminating,
    Terminated,
    Error,
}

/// Job definition submitted to the engine
///
/// Parameters are flattened `key=value` strings, the form the engine's task
/// entry point parses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDefinition {
    pub name: String,
    pub existing_cluster_id: String,
    pub task_file: String,
    pub parameters: Vec<String>,
}

/// Run status as reported by the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: i64,
    pub is_completed: bool,
    /// Meaningful only once `is_completed` is true
    pub is_success: bool,
}
