// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Reserved markers and timers the decider writes for itself.
//!
//! Two protocols live in history next to user decisions:
//!
//! - **Closure markers.** Every closing decision is preceded in the same
//!   batch by a marker named after the closure kind whose details hold a
//!   [`CloseWorkflowControl`]. When a later task finds such a marker, the
//!   workflow already decided to close and the terminal decision is issued
//!   again without running handlers.
//! - **Retry timers and counters.** A retry is a timer whose control holds a
//!   [`RetryControl`]; when it fires, a counter marker holding a
//!   [`RetryCount`] is recorded and the original activity is scheduled again.
//!   Both are keyed by the activity name and the scheduled event id of the
//!   first attempt, so parallel invocations of one activity type retry
//!   independently.

use serde::{Deserialize, Serialize};
use swiffer_protocol::{
    CancelWorkflowExecutionAttributes, CompleteWorkflowExecutionAttributes, Decision,
    FailWorkflowExecutionAttributes,
};

/// Marker recorded before `CompleteWorkflowExecution`.
pub const COMPLETE_MARKER: &str = "__swiffer.complete";
/// Marker recorded before `CancelWorkflowExecution`.
pub const CANCEL_MARKER: &str = "__swiffer.cancel";
/// Marker recorded before `FailWorkflowExecution`.
pub const FAIL_MARKER: &str = "__swiffer.fail";

/// Prefix of retry timer ids; `<activity name>.<root scheduled event id>` follows.
pub const RETRY_TIMER_PREFIX: &str = "__swiffer.retry-timer.";
/// Prefix of retry counter markers; `<activity name>.<root scheduled event id>` follows.
pub const RETRY_MARKER_PREFIX: &str = "__swiffer.retry-count.";

const CLOSURE_MARKERS: [&str; 3] = [COMPLETE_MARKER, CANCEL_MARKER, FAIL_MARKER];

/// True when user code may not record a marker with this name.
pub fn is_reserved_marker(name: &str) -> bool {
    CLOSURE_MARKERS.iter().any(|prefix| name.starts_with(prefix))
        || is_retry_marker(name)
}

/// True when the marker is one of the closure markers.
pub fn is_closure_marker(name: &str) -> bool {
    CLOSURE_MARKERS.contains(&name)
}

/// True when user code may not start a timer with this id.
pub fn is_reserved_timer(timer_id: &str) -> bool {
    timer_id.starts_with(RETRY_TIMER_PREFIX)
}

/// Retry timer id for one logical activity invocation.
pub fn retry_timer_id(activity_name: &str, root_scheduled_event_id: i64) -> String {
    format!("{}{}.{}", RETRY_TIMER_PREFIX, activity_name, root_scheduled_event_id)
}

/// Retry counter marker name for one logical activity invocation.
pub fn retry_marker_name(activity_name: &str, root_scheduled_event_id: i64) -> String {
    format!("{}{}.{}", RETRY_MARKER_PREFIX, activity_name, root_scheduled_event_id)
}

/// True when the marker is a retry counter.
pub fn is_retry_marker(name: &str) -> bool {
    name.starts_with(RETRY_MARKER_PREFIX)
}

/// Details of a closure marker: the terminal decision to (re-)issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CloseWorkflowControl {
    Complete {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<String>,
    },
    Cancel {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
    Fail {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
}

impl CloseWorkflowControl {
    /// Name of the marker recorded for this closure.
    pub fn marker_name(&self) -> &'static str {
        match self {
            CloseWorkflowControl::Complete { .. } => COMPLETE_MARKER,
            CloseWorkflowControl::Cancel { .. } => CANCEL_MARKER,
            CloseWorkflowControl::Fail { .. } => FAIL_MARKER,
        }
    }

    /// The terminal decision this closure stands for.
    pub fn to_decision(&self) -> Decision {
        match self {
            CloseWorkflowControl::Complete { result } => {
                Decision::CompleteWorkflowExecution(CompleteWorkflowExecutionAttributes {
                    result: result.clone(),
                })
            }
            CloseWorkflowControl::Cancel { details } => {
                Decision::CancelWorkflowExecution(CancelWorkflowExecutionAttributes {
                    details: details.clone(),
                })
            }
            CloseWorkflowControl::Fail { reason, details } => {
                Decision::FailWorkflowExecution(FailWorkflowExecutionAttributes {
                    reason: reason.clone(),
                    details: details.clone(),
                })
            }
        }
    }
}

/// Control payload carried by a retry timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryControl {
    /// `ActivityTaskScheduled` event of the attempt that failed
    pub scheduled_event_id: i64,
    /// `ActivityTaskScheduled` event of the first attempt
    pub root_scheduled_event_id: i64,
    /// Activity type name
    pub activity_name: String,
    /// Attempt number this retry stands for (1-based)
    pub attempt: u32,
}

/// Details of a retry counter marker.
///
/// Recorded in the same batch as the rescheduled activity, whose id it
/// names. A later failure of that activity finds its way back to the first
/// attempt through this marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryCount {
    /// `ActivityTaskScheduled` event of the first attempt
    pub root_scheduled_event_id: i64,
    /// Retries scheduled so far
    pub attempt: u32,
    /// Activity id of the rescheduled attempt
    pub activity_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reserved_names() {
        assert!(is_reserved_marker("__swiffer.complete"));
        assert!(is_reserved_marker("__swiffer.cancel.extra"));
        assert!(is_reserved_marker("__swiffer.retry-count.ActA.5"));
        assert!(is_retry_marker("__swiffer.retry-count.ActA.5"));
        assert!(!is_retry_marker(COMPLETE_MARKER));
        assert!(!is_reserved_marker("checkpoint"));
        assert!(is_reserved_timer("__swiffer.retry-timer.ActA.5"));
        assert!(!is_reserved_timer("reminder"));
    }

    #[test]
    fn test_closure_marker_exact_names() {
        assert!(is_closure_marker(FAIL_MARKER));
        assert!(!is_closure_marker("__swiffer.fail.extra"));
    }

    #[test]
    fn test_retry_names() {
        assert_eq!(retry_timer_id("ActA", 5), "__swiffer.retry-timer.ActA.5");
        assert_eq!(retry_marker_name("ActA", 5), "__swiffer.retry-count.ActA.5");
        assert_ne!(retry_timer_id("ActA", 5), retry_timer_id("ActA", 6));
    }

    #[test]
    fn test_close_control_wire_shape() {
        let control = CloseWorkflowControl::Fail {
            reason: Some("boom".to_string()),
            details: None,
        };
        assert_eq!(
            serde_json::to_value(&control).unwrap(),
            json!({"action": "fail", "reason": "boom"})
        );
        assert_eq!(control.marker_name(), FAIL_MARKER);
        assert!(control.to_decision().is_closing());
    }

    #[test]
    fn test_retry_control_wire_shape() {
        let control = RetryControl {
            scheduled_event_id: 9,
            root_scheduled_event_id: 5,
            activity_name: "ActA".to_string(),
            attempt: 2,
        };
        assert_eq!(
            serde_json::to_value(&control).unwrap(),
            json!({
                "scheduledEventId": 9,
                "rootScheduledEventId": 5,
                "activityName": "ActA",
                "attempt": 2
            })
        );
    }

    #[test]
    fn test_retry_count_wire_shape() {
        let count = RetryCount {
            root_scheduled_event_id: 5,
            attempt: 1,
            activity_id: "a-2".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&count).unwrap(),
            json!({"rootScheduledEventId": 5, "attempt": 1, "activityId": "a-2"})
        );
    }
}
