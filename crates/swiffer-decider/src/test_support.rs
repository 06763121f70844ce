// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! History builders for unit tests.

use chrono::{DateTime, TimeZone, Utc};
use swiffer_protocol::history::*;
use swiffer_protocol::{
    ActivityType, DecisionTask, EventAttributes, HistoryEvent, WorkflowExecution, WorkflowType,
};

pub(crate) fn timestamp(event_id: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap() + chrono::Duration::seconds(event_id)
}

pub(crate) fn event(event_id: i64, attributes: EventAttributes) -> HistoryEvent {
    HistoryEvent::new(event_id, timestamp(event_id), attributes)
}

pub(crate) fn workflow_type() -> WorkflowType {
    WorkflowType::new("workflowType1", "1")
}

pub(crate) fn task(events: Vec<HistoryEvent>, previous_started_event_id: i64) -> DecisionTask {
    let started_event_id = events.last().map(|e| e.event_id).unwrap_or(0);
    DecisionTask {
        task_token: "token".to_string(),
        workflow_type: workflow_type(),
        workflow_execution: WorkflowExecution::new("wf-1", "run-1"),
        events,
        previous_started_event_id,
        started_event_id,
    }
}

pub(crate) fn started(event_id: i64, input: Option<&str>) -> HistoryEvent {
    event(
        event_id,
        EventAttributes::WorkflowExecutionStarted(WorkflowExecutionStartedAttributes {
            input: input.map(str::to_string),
            workflow_type: Some(workflow_type()),
            ..Default::default()
        }),
    )
}

pub(crate) fn signaled(event_id: i64, name: &str, input: Option<&str>) -> HistoryEvent {
    event(
        event_id,
        EventAttributes::WorkflowExecutionSignaled(WorkflowExecutionSignaledAttributes {
            signal_name: name.to_string(),
            input: input.map(str::to_string),
            ..Default::default()
        }),
    )
}

pub(crate) fn decision_started(event_id: i64) -> HistoryEvent {
    event(
        event_id,
        EventAttributes::DecisionTaskStarted(DecisionTaskStartedAttributes {
            identity: None,
            scheduled_event_id: event_id - 1,
        }),
    )
}

pub(crate) fn scheduled(
    event_id: i64,
    activity_name: &str,
    activity_id: &str,
    input: Option<&str>,
) -> HistoryEvent {
    event(
        event_id,
        EventAttributes::ActivityTaskScheduled(ActivityTaskScheduledAttributes {
            activity_type: ActivityType::new(activity_name, "1"),
            activity_id: activity_id.to_string(),
            input: input.map(str::to_string),
            control: None,
            task_list: None,
            task_priority: None,
            schedule_to_start_timeout: None,
            schedule_to_close_timeout: None,
            start_to_close_timeout: Some("60".to_string()),
            heartbeat_timeout: None,
            decision_task_completed_event_id: 0,
        }),
    )
}

pub(crate) fn activity_started(event_id: i64, scheduled_event_id: i64) -> HistoryEvent {
    event(
        event_id,
        EventAttributes::ActivityTaskStarted(ActivityTaskStartedAttributes {
            identity: None,
            scheduled_event_id,
        }),
    )
}

pub(crate) fn activity_completed(
    event_id: i64,
    scheduled_event_id: i64,
    result: Option<&str>,
) -> HistoryEvent {
    event(
        event_id,
        EventAttributes::ActivityTaskCompleted(ActivityTaskCompletedAttributes {
            result: result.map(str::to_string),
            scheduled_event_id,
            started_event_id: scheduled_event_id + 1,
        }),
    )
}

pub(crate) fn activity_failed(
    event_id: i64,
    scheduled_event_id: i64,
    reason: &str,
    details: Option<&str>,
) -> HistoryEvent {
    event(
        event_id,
        EventAttributes::ActivityTaskFailed(ActivityTaskFailedAttributes {
            reason: Some(reason.to_string()),
            details: details.map(str::to_string),
            scheduled_event_id,
            started_event_id: scheduled_event_id + 1,
        }),
    )
}

pub(crate) fn activity_timed_out(
    event_id: i64,
    scheduled_event_id: i64,
    timeout_type: &str,
) -> HistoryEvent {
    event(
        event_id,
        EventAttributes::ActivityTaskTimedOut(ActivityTaskTimedOutAttributes {
            timeout_type: timeout_type.to_string(),
            details: None,
            scheduled_event_id,
            started_event_id: scheduled_event_id + 1,
        }),
    )
}

pub(crate) fn timer_started(event_id: i64, timer_id: &str, control: Option<&str>) -> HistoryEvent {
    event(
        event_id,
        EventAttributes::TimerStarted(TimerStartedAttributes {
            timer_id: timer_id.to_string(),
            control: control.map(str::to_string),
            start_to_fire_timeout: "10".to_string(),
            decision_task_completed_event_id: 0,
        }),
    )
}

pub(crate) fn timer_fired(event_id: i64, timer_id: &str, started_event_id: i64) -> HistoryEvent {
    event(
        event_id,
        EventAttributes::TimerFired(TimerFiredAttributes {
            timer_id: timer_id.to_string(),
            started_event_id,
        }),
    )
}

pub(crate) fn marker(event_id: i64, name: &str, details: Option<&str>) -> HistoryEvent {
    event(
        event_id,
        EventAttributes::MarkerRecorded(MarkerRecordedAttributes {
            marker_name: name.to_string(),
            details: details.map(str::to_string),
            decision_task_completed_event_id: 0,
        }),
    )
}

pub(crate) fn schedule_failed(
    event_id: i64,
    name: &str,
    activity_id: &str,
    cause: &str,
) -> HistoryEvent {
    event(
        event_id,
        EventAttributes::ScheduleActivityTaskFailed(ScheduleActivityTaskFailedAttributes {
            activity_type: Some(ActivityType::new(name, "1")),
            activity_id: activity_id.to_string(),
            cause: cause.to_string(),
            decision_task_completed_event_id: 0,
        }),
    )
}

pub(crate) fn start_timer_failed(event_id: i64, timer_id: &str, cause: &str) -> HistoryEvent {
    event(
        event_id,
        EventAttributes::StartTimerFailed(StartTimerFailedAttributes {
            timer_id: timer_id.to_string(),
            cause: cause.to_string(),
            decision_task_completed_event_id: 0,
        }),
    )
}

pub(crate) fn unknown(event_id: i64) -> HistoryEvent {
    event(event_id, EventAttributes::Unknown)
}
