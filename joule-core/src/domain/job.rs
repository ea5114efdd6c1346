//! Job domain types
//!
//! An aggregation job supervises one run of the external compute engine.
//! The coordinator persists the record after every state transition so an
//! observer can always see current progress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::market::ProcessType;

/// Aggregation job record
///
/// Owned exclusively by the coordinator's job state machine. Never deleted,
/// only superseded by new jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub process_type: ProcessType,
    pub state: JobState,
    /// Human-readable description of the current state, e.g. the cluster
    /// state observed during the last poll.
    pub state_description: String,
    pub cluster_id: Option<String>,
    pub engine_job_id: Option<i64>,
    pub run_id: Option<i64>,
    pub begin_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub persist_source: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Creates a new job in the `Created` state
    pub fn new(
        process_type: ProcessType,
        begin_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        persist_source: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            process_type,
            state: JobState::Created,
            state_description: JobState::Created.description().to_string(),
            cluster_id: None,
            engine_job_id: None,
            run_id: None,
            begin_time,
            end_time,
            persist_source,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a state transition, rejecting any backward move.
    ///
    /// Returns the previous state on success so callers can log the edge.
    pub fn transition_to(
        &mut self,
        next: JobState,
        description: impl Into<String>,
    ) -> Result<JobState, InvalidTransition> {
        if !self.state.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        let previous = self.state;
        self.state = next;
        self.state_description = description.into();
        self.updated_at = Utc::now();
        Ok(previous)
    }
}

/// Job lifecycle state
///
/// States form a strict forward progression; the two failure states are
/// reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Created,
    ClusterStartup,
    ClusterWarmingUp,
    ClusterCreated,
    Calculating,
    Completed,
    CompletedWithFail,
    ClusterFailed,
}

impl JobState {
    /// Whether this state admits no further transitions
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::CompletedWithFail | JobState::ClusterFailed
        )
    }

    /// Whether a transition from `self` to `next` is legal.
    ///
    /// Forward skips along the chain are allowed (a cluster that is already
    /// running jumps straight past the warm-up states); backward moves and
    /// transitions out of a terminal state are not.
    pub fn can_transition_to(self, next: JobState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            JobState::ClusterFailed | JobState::CompletedWithFail => true,
            JobState::Completed => self == JobState::Calculating,
            _ => next.rank() > self.rank(),
        }
    }

    /// Default state description, matching what the coordinator persists
    pub fn description(self) -> &'static str {
        match self {
            JobState::Created => "Created",
            JobState::ClusterStartup => "Starting cluster",
            JobState::ClusterWarmingUp => "Cluster warming up",
            JobState::ClusterCreated => "Cluster created",
            JobState::Calculating => "Calculation running",
            JobState::Completed => "Calculation completed",
            JobState::CompletedWithFail => "Calculation failed",
            JobState::ClusterFailed => "Cluster failed to start",
        }
    }

    fn rank(self) -> u8 {
        match self {
            JobState::Created => 0,
            JobState::ClusterStartup => 1,
            JobState::ClusterWarmingUp => 2,
            JobState::ClusterCreated => 3,
            JobState::Calculating => 4,
            JobState::Completed => 5,
            // Failure states sit outside the forward chain.
            JobState::CompletedWithFail | JobState::ClusterFailed => u8::MAX,
        }
    }
}

/// Rejected state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: JobState,
    pub to: JobState,
}

impl std::fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid job state transition {:?} -> {:?}",
            self.from, self.to
        )
    }
}

impl std::error::Error for InvalidTransition {}

/// Result record for one engine output path
///
/// Created once the output path is known; the processing-state string is
/// updated as handling stages complete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub id: Uuid,
    pub job_id: Uuid,
    pub result_name: String,
    pub input_path: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobResult {
    pub fn new(job_id: Uuid, result_name: impl Into<String>, input_path: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            job_id,
            result_name: result_name.into(),
            input_path: input_path.into(),
            state: "Created".to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Job {
        Job::new(
            ProcessType::BalanceFixing,
            Utc::now(),
            Utc::now(),
            false,
        )
    }

    #[test]
    fn test_forward_chain_is_legal() {
        let mut job = job();
        for next in [
            JobState::ClusterStartup,
            JobState::ClusterWarmingUp,
            JobState::ClusterCreated,
            JobState::Calculating,
            JobState::Completed,
        ] {
            job.transition_to(next, next.description()).unwrap();
        }
        assert_eq!(job.state, JobState::Completed);
    }

    #[test]
    fn test_forward_skip_is_legal() {
        // Cluster already running: no warm-up states are visited.
        let mut job = job();
        job.transition_to(JobState::ClusterCreated, "Cluster created")
            .unwrap();
        job.transition_to(JobState::Calculating, "Calculation running")
            .unwrap();
    }

    #[test]
    fn test_backward_move_is_rejected() {
        let mut job = job();
        job.transition_to(JobState::Calculating, "Calculation running")
            .unwrap();
        let err = job
            .transition_to(JobState::ClusterStartup, "Starting cluster")
            .unwrap_err();
        assert_eq!(err.from, JobState::Calculating);
        assert_eq!(err.to, JobState::ClusterStartup);
    }

    #[test]
    fn test_failure_reachable_from_any_non_terminal_state() {
        for state in [
            JobState::Created,
            JobState::ClusterStartup,
            JobState::ClusterWarmingUp,
            JobState::ClusterCreated,
            JobState::Calculating,
        ] {
            assert!(state.can_transition_to(JobState::ClusterFailed));
            assert!(state.can_transition_to(JobState::CompletedWithFail));
        }
    }

    #[test]
    fn test_terminal_states_admit_no_transition() {
        for state in [
            JobState::Completed,
            JobState::CompletedWithFail,
            JobState::ClusterFailed,
        ] {
            assert!(state.is_terminal());
            assert!(!state.can_transition_to(JobState::Calculating));
            assert!(!state.can_transition_to(JobState::ClusterFailed));
        }
    }

    #[test]
    fn test_completed_only_from_calculating() {
        assert!(JobState::Calculating.can_transition_to(JobState::Completed));
        assert!(!JobState::ClusterCreated.can_transition_to(JobState::Completed));
        assert!(!JobState::Created.can_transition_to(JobState::Completed));
    }

    #[test]
    fn test_transition_records_description() {
        let mut job = job();
        job.transition_to(JobState::ClusterWarmingUp, "Waiting for cluster abc, state is Pending")
            .unwrap();
        assert_eq!(
            job.state_description,
            "Waiting for cluster abc, state is Pending"
        );
    }
}
