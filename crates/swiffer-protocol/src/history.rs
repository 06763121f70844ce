// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! History events.
//!
//! A workflow execution's history is an append-only list of events, totally
//! ordered by `event_id`. Each event carries kind-specific attributes; the
//! kind is encoded in the `eventType` field and the attributes are flattened
//! next to it:
//!
//! ```json
//! {
//!   "eventId": 5,
//!   "eventTimestamp": "2025-06-15T12:00:00Z",
//!   "eventType": "ActivityTaskCompleted",
//!   "scheduledEventId": 3,
//!   "startedEventId": 4,
//!   "result": "42"
//! }
//! ```
//!
//! Event kinds this crate does not know deserialize to
//! [`EventAttributes::Unknown`] so that newer services stay readable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decision::ChildPolicy;
use crate::types::{ActivityType, TaskList, WorkflowExecution, WorkflowType};

/// One entry of a workflow execution's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEvent {
    /// Monotonically increasing id, unique within the execution
    pub event_id: i64,
    /// When the service recorded the event
    pub event_timestamp: DateTime<Utc>,
    /// Kind and kind-specific attributes
    #[serde(flatten)]
    pub attributes: EventAttributes,
}

impl HistoryEvent {
    pub fn new(event_id: i64, event_timestamp: DateTime<Utc>, attributes: EventAttributes) -> Self {
        Self {
            event_id,
            event_timestamp,
            attributes,
        }
    }

    /// The wire name of this event's kind.
    pub fn event_type(&self) -> &'static str {
        self.attributes.event_type()
    }
}

/// Kind-tagged event attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "eventType")]
pub enum EventAttributes {
    // ========== Workflow ==========
    WorkflowExecutionStarted(WorkflowExecutionStartedAttributes),
    WorkflowExecutionSignaled(WorkflowExecutionSignaledAttributes),
    WorkflowExecutionCancelRequested(WorkflowExecutionCancelRequestedAttributes),
    CompleteWorkflowExecutionFailed(CloseWorkflowExecutionFailedAttributes),
    FailWorkflowExecutionFailed(CloseWorkflowExecutionFailedAttributes),
    CancelWorkflowExecutionFailed(CloseWorkflowExecutionFailedAttributes),
    ContinueAsNewWorkflowExecutionFailed(CloseWorkflowExecutionFailedAttributes),

    // ========== Decision tasks ==========
    DecisionTaskScheduled(DecisionTaskScheduledAttributes),
    DecisionTaskStarted(DecisionTaskStartedAttributes),
    DecisionTaskCompleted(DecisionTaskCompletedAttributes),
    DecisionTaskTimedOut(DecisionTaskTimedOutAttributes),

    // ========== Activities ==========
    ActivityTaskScheduled(ActivityTaskScheduledAttributes),
    ActivityTaskStarted(ActivityTaskStartedAttributes),
    ActivityTaskCompleted(ActivityTaskCompletedAttributes),
    ActivityTaskFailed(ActivityTaskFailedAttributes),
    ActivityTaskTimedOut(ActivityTaskTimedOutAttributes),
    ActivityTaskCanceled(ActivityTaskCanceledAttributes),
    ActivityTaskCancelRequested(ActivityTaskCancelRequestedAttributes),
    ScheduleActivityTaskFailed(ScheduleActivityTaskFailedAttributes),

    // ========== Timers ==========
    TimerStarted(TimerStartedAttributes),
    TimerFired(TimerFiredAttributes),
    TimerCanceled(TimerCanceledAttributes),
    StartTimerFailed(StartTimerFailedAttributes),

    // ========== Markers ==========
    MarkerRecorded(MarkerRecordedAttributes),
    RecordMarkerFailed(RecordMarkerFailedAttributes),

    // ========== Child workflows ==========
    StartChildWorkflowExecutionInitiated(StartChildWorkflowExecutionInitiatedAttributes),
    ChildWorkflowExecutionStarted(ChildWorkflowExecutionStartedAttributes),
    ChildWorkflowExecutionCompleted(ChildWorkflowExecutionCompletedAttributes),
    ChildWorkflowExecutionFailed(ChildWorkflowExecutionFailedAttributes),
    ChildWorkflowExecutionTimedOut(ChildWorkflowExecutionTimedOutAttributes),
    ChildWorkflowExecutionCanceled(ChildWorkflowExecutionCanceledAttributes),
    ChildWorkflowExecutionTerminated(ChildWorkflowExecutionTerminatedAttributes),
    StartChildWorkflowExecutionFailed(StartChildWorkflowExecutionFailedAttributes),

    // ========== External workflows ==========
    RequestCancelExternalWorkflowExecutionInitiated(
        RequestCancelExternalWorkflowExecutionInitiatedAttributes,
    ),
    ExternalWorkflowExecutionCancelRequested(ExternalWorkflowExecutionCancelRequestedAttributes),
    RequestCancelExternalWorkflowExecutionFailed(
        RequestCancelExternalWorkflowExecutionFailedAttributes,
    ),

    /// Any event kind not modelled above
    #[serde(other)]
    Unknown,
}

impl EventAttributes {
    /// The wire name of this kind.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::WorkflowExecutionStarted(_) => "WorkflowExecutionStarted",
            Self::WorkflowExecutionSignaled(_) => "WorkflowExecutionSignaled",
            Self::WorkflowExecutionCancelRequested(_) => "WorkflowExecutionCancelRequested",
            Self::CompleteWorkflowExecutionFailed(_) => "CompleteWorkflowExecutionFailed",
            Self::FailWorkflowExecutionFailed(_) => "FailWorkflowExecutionFailed",
            Self::CancelWorkflowExecutionFailed(_) => "CancelWorkflowExecutionFailed",
            Self::ContinueAsNewWorkflowExecutionFailed(_) => "ContinueAsNewWorkflowExecutionFailed",
            Self::DecisionTaskScheduled(_) => "DecisionTaskScheduled",
            Self::DecisionTaskStarted(_) => "DecisionTaskStarted",
            Self::DecisionTaskCompleted(_) => "DecisionTaskCompleted",
            Self::DecisionTaskTimedOut(_) => "DecisionTaskTimedOut",
            Self::ActivityTaskScheduled(_) => "ActivityTaskScheduled",
            Self::ActivityTaskStarted(_) => "ActivityTaskStarted",
            Self::ActivityTaskCompleted(_) => "ActivityTaskCompleted",
            Self::ActivityTaskFailed(_) => "ActivityTaskFailed",
            Self::ActivityTaskTimedOut(_) => "ActivityTaskTimedOut",
            Self::ActivityTaskCanceled(_) => "ActivityTaskCanceled",
            Self::ActivityTaskCancelRequested(_) => "ActivityTaskCancelRequested",
            Self::ScheduleActivityTaskFailed(_) => "ScheduleActivityTaskFailed",
            Self::TimerStarted(_) => "TimerStarted",
            Self::TimerFired(_) => "TimerFired",
            Self::TimerCanceled(_) => "TimerCanceled",
            Self::StartTimerFailed(_) => "StartTimerFailed",
            Self::MarkerRecorded(_) => "MarkerRecorded",
            Self::RecordMarkerFailed(_) => "RecordMarkerFailed",
            Self::StartChildWorkflowExecutionInitiated(_) => "StartChildWorkflowExecutionInitiated",
            Self::ChildWorkflowExecutionStarted(_) => "ChildWorkflowExecutionStarted",
            Self::ChildWorkflowExecutionCompleted(_) => "ChildWorkflowExecutionCompleted",
            Self::ChildWorkflowExecutionFailed(_) => "ChildWorkflowExecutionFailed",
            Self::ChildWorkflowExecutionTimedOut(_) => "ChildWorkflowExecutionTimedOut",
            Self::ChildWorkflowExecutionCanceled(_) => "ChildWorkflowExecutionCanceled",
            Self::ChildWorkflowExecutionTerminated(_) => "ChildWorkflowExecutionTerminated",
            Self::StartChildWorkflowExecutionFailed(_) => "StartChildWorkflowExecutionFailed",
            Self::RequestCancelExternalWorkflowExecutionInitiated(_) => {
                "RequestCancelExternalWorkflowExecutionInitiated"
            }
            Self::ExternalWorkflowExecutionCancelRequested(_) => {
                "ExternalWorkflowExecutionCancelRequested"
            }
            Self::RequestCancelExternalWorkflowExecutionFailed(_) => {
                "RequestCancelExternalWorkflowExecutionFailed"
            }
            Self::Unknown => "Unknown",
        }
    }

    /// True for the bookkeeping events the service emits around each
    /// decision task; they never reach user handlers.
    pub fn is_decision_task_event(&self) -> bool {
        matches!(
            self,
            Self::DecisionTaskScheduled(_)
                | Self::DecisionTaskStarted(_)
                | Self::DecisionTaskCompleted(_)
                | Self::DecisionTaskTimedOut(_)
        )
    }

    /// True when one of this worker's closing decisions was rejected.
    pub fn is_close_failure(&self) -> bool {
        matches!(
            self,
            Self::CompleteWorkflowExecutionFailed(_)
                | Self::FailWorkflowExecutionFailed(_)
                | Self::CancelWorkflowExecutionFailed(_)
                | Self::ContinueAsNewWorkflowExecutionFailed(_)
        )
    }
}

// ============================================================================
// Workflow attributes
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkflowExecutionStartedAttributes {
    pub input: Option<String>,
    pub workflow_type: Option<WorkflowType>,
    pub task_list: Option<TaskList>,
    pub execution_start_to_close_timeout: Option<String>,
    pub task_start_to_close_timeout: Option<String>,
    pub child_policy: Option<ChildPolicy>,
    pub tag_list: Vec<String>,
    pub parent_workflow_execution: Option<WorkflowExecution>,
    pub continued_execution_run_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkflowExecutionSignaledAttributes {
    pub signal_name: String,
    pub input: Option<String>,
    pub external_workflow_execution: Option<WorkflowExecution>,
    pub external_initiated_event_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkflowExecutionCancelRequestedAttributes {
    pub cause: Option<String>,
    pub external_workflow_execution: Option<WorkflowExecution>,
    pub external_initiated_event_id: Option<i64>,
}

/// Shared by the four "closing decision rejected" events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CloseWorkflowExecutionFailedAttributes {
    pub cause: String,
    pub decision_task_completed_event_id: i64,
}

// ============================================================================
// Decision task attributes
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DecisionTaskScheduledAttributes {
    pub task_list: Option<TaskList>,
    pub start_to_close_timeout: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DecisionTaskStartedAttributes {
    pub identity: Option<String>,
    pub scheduled_event_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DecisionTaskCompletedAttributes {
    pub execution_context: Option<String>,
    pub scheduled_event_id: i64,
    pub started_event_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DecisionTaskTimedOutAttributes {
    pub timeout_type: String,
    pub scheduled_event_id: i64,
    pub started_event_id: i64,
}

// ============================================================================
// Activity attributes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityTaskScheduledAttributes {
    pub activity_type: ActivityType,
    pub activity_id: String,
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub control: Option<String>,
    #[serde(default)]
    pub task_list: Option<TaskList>,
    #[serde(default)]
    pub task_priority: Option<String>,
    #[serde(default)]
    pub schedule_to_start_timeout: Option<String>,
    #[serde(default)]
    pub schedule_to_close_timeout: Option<String>,
    #[serde(default)]
    pub start_to_close_timeout: Option<String>,
    #[serde(default)]
    pub heartbeat_timeout: Option<String>,
    #[serde(default)]
    pub decision_task_completed_event_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActivityTaskStartedAttributes {
    pub identity: Option<String>,
    pub scheduled_event_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActivityTaskCompletedAttributes {
    pub result: Option<String>,
    pub scheduled_event_id: i64,
    pub started_event_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActivityTaskFailedAttributes {
    pub reason: Option<String>,
    pub details: Option<String>,
    pub scheduled_event_id: i64,
    pub started_event_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActivityTaskTimedOutAttributes {
    pub timeout_type: String,
    pub details: Option<String>,
    pub scheduled_event_id: i64,
    pub started_event_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActivityTaskCanceledAttributes {
    pub details: Option<String>,
    pub scheduled_event_id: i64,
    pub started_event_id: i64,
    pub latest_cancel_requested_event_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActivityTaskCancelRequestedAttributes {
    pub activity_id: String,
    pub decision_task_completed_event_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScheduleActivityTaskFailedAttributes {
    pub activity_type: Option<ActivityType>,
    pub activity_id: String,
    pub cause: String,
    pub decision_task_completed_event_id: i64,
}

// ============================================================================
// Timer attributes
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimerStartedAttributes {
    pub timer_id: String,
    pub control: Option<String>,
    pub start_to_fire_timeout: String,
    pub decision_task_completed_event_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimerFiredAttributes {
    pub timer_id: String,
    pub started_event_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimerCanceledAttributes {
    pub timer_id: String,
    pub started_event_id: i64,
    pub decision_task_completed_event_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StartTimerFailedAttributes {
    pub timer_id: String,
    pub cause: String,
    pub decision_task_completed_event_id: i64,
}

// ============================================================================
// Marker attributes
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MarkerRecordedAttributes {
    pub marker_name: String,
    pub details: Option<String>,
    pub decision_task_completed_event_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecordMarkerFailedAttributes {
    pub marker_name: String,
    pub cause: String,
    pub decision_task_completed_event_id: i64,
}

// ============================================================================
// Child workflow attributes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartChildWorkflowExecutionInitiatedAttributes {
    pub workflow_id: String,
    pub workflow_type: WorkflowType,
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub control: Option<String>,
    #[serde(default)]
    pub task_list: Option<TaskList>,
    #[serde(default)]
    pub execution_start_to_close_timeout: Option<String>,
    #[serde(default)]
    pub task_start_to_close_timeout: Option<String>,
    #[serde(default)]
    pub child_policy: Option<ChildPolicy>,
    #[serde(default)]
    pub decision_task_completed_event_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChildWorkflowExecutionStartedAttributes {
    pub workflow_execution: WorkflowExecution,
    pub workflow_type: Option<WorkflowType>,
    pub initiated_event_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChildWorkflowExecutionCompletedAttributes {
    pub workflow_execution: WorkflowExecution,
    pub workflow_type: Option<WorkflowType>,
    pub result: Option<String>,
    pub initiated_event_id: i64,
    pub started_event_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChildWorkflowExecutionFailedAttributes {
    pub workflow_execution: WorkflowExecution,
    pub workflow_type: Option<WorkflowType>,
    pub reason: Option<String>,
    pub details: Option<String>,
    pub initiated_event_id: i64,
    pub started_event_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChildWorkflowExecutionTimedOutAttributes {
    pub workflow_execution: WorkflowExecution,
    pub workflow_type: Option<WorkflowType>,
    pub timeout_type: String,
    pub initiated_event_id: i64,
    pub started_event_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChildWorkflowExecutionCanceledAttributes {
    pub workflow_execution: WorkflowExecution,
    pub workflow_type: Option<WorkflowType>,
    pub details: Option<String>,
    pub initiated_event_id: i64,
    pub started_event_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChildWorkflowExecutionTerminatedAttributes {
    pub workflow_execution: WorkflowExecution,
    pub workflow_type: Option<WorkflowType>,
    pub initiated_event_id: i64,
    pub started_event_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StartChildWorkflowExecutionFailedAttributes {
    pub workflow_id: String,
    pub workflow_type: Option<WorkflowType>,
    pub cause: String,
    pub control: Option<String>,
    pub initiated_event_id: i64,
    pub decision_task_completed_event_id: i64,
}

// ============================================================================
// External workflow attributes
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RequestCancelExternalWorkflowExecutionInitiatedAttributes {
    pub workflow_id: String,
    pub run_id: Option<String>,
    pub control: Option<String>,
    pub decision_task_completed_event_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExternalWorkflowExecutionCancelRequestedAttributes {
    pub workflow_execution: WorkflowExecution,
    pub initiated_event_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RequestCancelExternalWorkflowExecutionFailedAttributes {
    pub workflow_id: String,
    pub run_id: Option<String>,
    pub cause: String,
    pub control: Option<String>,
    pub initiated_event_id: i64,
    pub decision_task_completed_event_id: i64,
}
