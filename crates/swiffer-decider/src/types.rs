// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! High-level types for the decider.

use std::fmt;

/// Lifecycle of a trackable unit (activity, timer, child workflow, marker)
/// as reconstructed from history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WorkflowEventState {
    /// No event for the unit exists
    #[default]
    NotStarted,
    /// Scheduled/initiated, not yet confirmed as started
    Initial,
    /// Started and running
    Active,
    /// Ended by cancellation
    Canceled,
    /// Ended successfully
    Success,
    /// Ended with a failure
    Error,
    /// Ended by a timeout
    Timeout,
}

impl WorkflowEventState {
    /// Terminal states are frozen: later events never change them.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowEventState::Canceled
                | WorkflowEventState::Success
                | WorkflowEventState::Error
                | WorkflowEventState::Timeout
        )
    }
}

impl fmt::Display for WorkflowEventState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowEventState::NotStarted => "NOT_STARTED",
            WorkflowEventState::Initial => "INITIAL",
            WorkflowEventState::Active => "ACTIVE",
            WorkflowEventState::Canceled => "CANCELED",
            WorkflowEventState::Success => "SUCCESS",
            WorkflowEventState::Error => "ERROR",
            WorkflowEventState::Timeout => "TIMEOUT",
        };
        f.write_str(name)
    }
}

/// State of one decider worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Between tasks
    Idle,
    /// Waiting on the long poll
    Polling,
    /// Reducing history and running handlers
    Executing,
    /// Waiting for the service to acknowledge the decision batch
    Submitting,
    /// Stop was requested and the loop exited
    Stopped,
}

/// What happened to one decision task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The decision batch was acknowledged
    Submitted {
        /// Number of decisions in the batch
        decisions: usize,
    },
    /// The service rejected the submission as a client-side condition; the
    /// task will be redelivered after its timeout
    RetryLater {
        reason: String,
    },
    /// The task could not be handled and was not acknowledged
    Abandoned {
        reason: String,
    },
}

impl TaskOutcome {
    /// True when the service acknowledged the task.
    pub fn is_submitted(&self) -> bool {
        matches!(self, TaskOutcome::Submitted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!WorkflowEventState::NotStarted.is_terminal());
        assert!(!WorkflowEventState::Initial.is_terminal());
        assert!(!WorkflowEventState::Active.is_terminal());
        assert!(WorkflowEventState::Canceled.is_terminal());
        assert!(WorkflowEventState::Success.is_terminal());
        assert!(WorkflowEventState::Error.is_terminal());
        assert!(WorkflowEventState::Timeout.is_terminal());
    }

    #[test]
    fn test_state_default_and_display() {
        assert_eq!(WorkflowEventState::default(), WorkflowEventState::NotStarted);
        assert_eq!(WorkflowEventState::NotStarted.to_string(), "NOT_STARTED");
        assert_eq!(WorkflowEventState::Timeout.to_string(), "TIMEOUT");
    }

    #[test]
    fn test_task_outcome_is_submitted() {
        assert!(TaskOutcome::Submitted { decisions: 0 }.is_submitted());
        assert!(
            !TaskOutcome::RetryLater {
                reason: "x".to_string()
            }
            .is_submitted()
        );
    }
}
