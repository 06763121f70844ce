// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Read-only views handed to handlers.
//!
//! [`DecisionTaskContext`] wraps one decision task (its full history plus
//! the cursor separating already-handled events from new ones).
//! [`EventContext`] pairs it with the event being dispatched.

use serde::de::DeserializeOwned;
use swiffer_protocol::history::ActivityTaskScheduledAttributes;
use swiffer_protocol::{
    ActivityType, DecisionTask, EventAttributes, HistoryEvent, WorkflowExecution, WorkflowType,
};

use crate::control::{self, CloseWorkflowControl, RetryCount};
use crate::error::DecodeError;
use crate::payload;
use crate::reducer::{self, UnitRef, UnitSnapshot};
use crate::template::EventCategory;

/// One decision task as seen by handlers.
#[derive(Debug, Clone)]
pub struct DecisionTaskContext {
    task: DecisionTask,
}

impl DecisionTaskContext {
    pub fn new(task: DecisionTask) -> Self {
        Self { task }
    }

    pub fn task_token(&self) -> &str {
        &self.task.task_token
    }

    pub fn workflow_type(&self) -> &WorkflowType {
        &self.task.workflow_type
    }

    pub fn workflow_execution(&self) -> &WorkflowExecution {
        &self.task.workflow_execution
    }

    /// Full history, ordered by event id.
    pub fn events(&self) -> &[HistoryEvent] {
        &self.task.events
    }

    pub fn previous_started_event_id(&self) -> i64 {
        self.task.previous_started_event_id
    }

    pub fn started_event_id(&self) -> i64 {
        self.task.started_event_id
    }

    /// Events after the previous decision task's start, excluding decision
    /// task bookkeeping. These are the events handlers are dispatched for.
    pub fn new_events(&self) -> impl Iterator<Item = &HistoryEvent> {
        let cursor = self.task.previous_started_event_id;
        self.task
            .events
            .iter()
            .filter(move |e| e.event_id > cursor && !e.attributes.is_decision_task_event())
    }

    /// Look up an event by id.
    pub fn event(&self, event_id: i64) -> Option<&HistoryEvent> {
        self.task
            .events
            .binary_search_by_key(&event_id, |e| e.event_id)
            .ok()
            .map(|index| &self.task.events[index])
    }

    /// The `ActivityTaskScheduled` attributes recorded under `scheduled_event_id`.
    pub fn scheduled_activity(&self, scheduled_event_id: i64) -> Option<&ActivityTaskScheduledAttributes> {
        match self.event(scheduled_event_id).map(|e| &e.attributes) {
            Some(EventAttributes::ActivityTaskScheduled(attrs)) => Some(attrs),
            _ => None,
        }
    }

    /// Decode the workflow's start input. An absent input decodes as `null`.
    pub fn workflow_input<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        let input = self.task.events.iter().find_map(|e| match &e.attributes {
            EventAttributes::WorkflowExecutionStarted(attrs) => attrs.input.as_deref(),
            _ => None,
        });
        payload::decode(input, || "workflow input".to_string())
    }

    /// Details of the latest marker named `name`, decoded.
    ///
    /// `Ok(None)` when no such marker was recorded.
    pub fn marker_details<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, DecodeError> {
        let found = self.task.events.iter().rev().find_map(|e| match &e.attributes {
            EventAttributes::MarkerRecorded(attrs) if attrs.marker_name == name => Some(attrs),
            _ => None,
        });
        match found {
            Some(attrs) => payload::decode(attrs.details.as_deref(), || {
                format!("marker '{}' details", name)
            })
            .map(Some),
            None => Ok(None),
        }
    }

    /// The retry counter recorded when the activity `activity_id` was
    /// scheduled as a retry, `None` for a first attempt.
    pub fn retry_count(&self, activity_id: &str) -> Result<Option<RetryCount>, DecodeError> {
        for event in self.task.events.iter().rev() {
            let EventAttributes::MarkerRecorded(attrs) = &event.attributes else {
                continue;
            };
            if !control::is_retry_marker(&attrs.marker_name) {
                continue;
            }
            let count: RetryCount = payload::decode(attrs.details.as_deref(), || {
                format!("marker '{}' details", attrs.marker_name)
            })?;
            if count.activity_id == activity_id {
                return Ok(Some(count));
            }
        }
        Ok(None)
    }

    /// Reconstructed state of a unit.
    pub fn unit_state(&self, unit: &UnitRef) -> UnitSnapshot {
        reducer::reduce(&self.task.events, unit)
    }

    /// The closure the workflow already decided on, if any.
    pub fn closure_intent(&self) -> Result<Option<CloseWorkflowControl>, DecodeError> {
        let found = self.task.events.iter().rev().find_map(|e| match &e.attributes {
            EventAttributes::MarkerRecorded(attrs) if control::is_closure_marker(&attrs.marker_name) => {
                Some(attrs)
            }
            _ => None,
        });
        match found {
            Some(attrs) => payload::decode(attrs.details.as_deref(), || {
                format!("closure marker '{}'", attrs.marker_name)
            })
            .map(Some),
            None => Ok(None),
        }
    }
}

/// The event being dispatched, with access to the whole task.
#[derive(Debug, Clone, Copy)]
pub struct EventContext<'a> {
    task: &'a DecisionTaskContext,
    event: &'a HistoryEvent,
    category: EventCategory,
}

impl<'a> EventContext<'a> {
    pub fn new(task: &'a DecisionTaskContext, event: &'a HistoryEvent, category: EventCategory) -> Self {
        Self {
            task,
            event,
            category,
        }
    }

    pub fn task(&self) -> &'a DecisionTaskContext {
        self.task
    }

    pub fn event(&self) -> &'a HistoryEvent {
        self.event
    }

    pub fn event_id(&self) -> i64 {
        self.event.event_id
    }

    pub fn category(&self) -> EventCategory {
        self.category
    }

    /// The event's primary payload: workflow or signal input, activity or
    /// child result, marker details, or failure/cancellation details.
    pub fn payload(&self) -> Option<&'a str> {
        match &self.event.attributes {
            EventAttributes::WorkflowExecutionStarted(a) => a.input.as_deref(),
            EventAttributes::WorkflowExecutionSignaled(a) => a.input.as_deref(),
            EventAttributes::ActivityTaskCompleted(a) => a.result.as_deref(),
            EventAttributes::ChildWorkflowExecutionCompleted(a) => a.result.as_deref(),
            EventAttributes::MarkerRecorded(a) => a.details.as_deref(),
            _ => self.details(),
        }
    }

    /// Decode the primary payload. An absent payload decodes as `null`.
    pub fn input<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        payload::decode(self.payload(), || {
            format!("{} payload of event {}", self.event.event_type(), self.event.event_id)
        })
    }

    /// Failure reason, cause or timeout type.
    pub fn reason(&self) -> Option<&'a str> {
        match &self.event.attributes {
            EventAttributes::ActivityTaskFailed(a) => a.reason.as_deref(),
            EventAttributes::ActivityTaskTimedOut(a) => Some(a.timeout_type.as_str()),
            EventAttributes::ChildWorkflowExecutionFailed(a) => a.reason.as_deref(),
            EventAttributes::ChildWorkflowExecutionTimedOut(a) => Some(a.timeout_type.as_str()),
            EventAttributes::StartChildWorkflowExecutionFailed(a) => Some(a.cause.as_str()),
            EventAttributes::WorkflowExecutionCancelRequested(a) => a.cause.as_deref(),
            EventAttributes::ScheduleActivityTaskFailed(a) => Some(a.cause.as_str()),
            EventAttributes::StartTimerFailed(a) => Some(a.cause.as_str()),
            EventAttributes::RecordMarkerFailed(a) => Some(a.cause.as_str()),
            EventAttributes::CompleteWorkflowExecutionFailed(a)
            | EventAttributes::FailWorkflowExecutionFailed(a)
            | EventAttributes::CancelWorkflowExecutionFailed(a)
            | EventAttributes::ContinueAsNewWorkflowExecutionFailed(a) => Some(a.cause.as_str()),
            _ => None,
        }
    }

    /// Failure or cancellation details.
    pub fn details(&self) -> Option<&'a str> {
        match &self.event.attributes {
            EventAttributes::ActivityTaskFailed(a) => a.details.as_deref(),
            EventAttributes::ActivityTaskTimedOut(a) => a.details.as_deref(),
            EventAttributes::ActivityTaskCanceled(a) => a.details.as_deref(),
            EventAttributes::ChildWorkflowExecutionFailed(a) => a.details.as_deref(),
            EventAttributes::ChildWorkflowExecutionCanceled(a) => a.details.as_deref(),
            _ => None,
        }
    }

    /// `ActivityTaskScheduled` event id for activity events.
    pub fn scheduled_event_id(&self) -> Option<i64> {
        match &self.event.attributes {
            EventAttributes::ActivityTaskStarted(a) => Some(a.scheduled_event_id),
            EventAttributes::ActivityTaskCompleted(a) => Some(a.scheduled_event_id),
            EventAttributes::ActivityTaskFailed(a) => Some(a.scheduled_event_id),
            EventAttributes::ActivityTaskTimedOut(a) => Some(a.scheduled_event_id),
            EventAttributes::ActivityTaskCanceled(a) => Some(a.scheduled_event_id),
            _ => None,
        }
    }

    /// Scheduling attributes of the activity this event is about.
    pub fn scheduled_activity(&self) -> Option<&'a ActivityTaskScheduledAttributes> {
        self.scheduled_event_id()
            .and_then(|id| self.task.scheduled_activity(id))
    }

    pub fn activity_type(&self) -> Option<&'a ActivityType> {
        match &self.event.attributes {
            EventAttributes::ScheduleActivityTaskFailed(a) => a.activity_type.as_ref(),
            _ => self.scheduled_activity().map(|a| &a.activity_type),
        }
    }

    pub fn activity_id(&self) -> Option<&'a str> {
        match &self.event.attributes {
            EventAttributes::ScheduleActivityTaskFailed(a) => Some(a.activity_id.as_str()),
            _ => self.scheduled_activity().map(|a| a.activity_id.as_str()),
        }
    }

    pub fn timer_id(&self) -> Option<&'a str> {
        match &self.event.attributes {
            EventAttributes::TimerFired(a) => Some(a.timer_id.as_str()),
            EventAttributes::TimerCanceled(a) => Some(a.timer_id.as_str()),
            EventAttributes::StartTimerFailed(a) => Some(a.timer_id.as_str()),
            _ => None,
        }
    }

    pub fn signal_name(&self) -> Option<&'a str> {
        match &self.event.attributes {
            EventAttributes::WorkflowExecutionSignaled(a) => Some(a.signal_name.as_str()),
            _ => None,
        }
    }

    pub fn marker_name(&self) -> Option<&'a str> {
        match &self.event.attributes {
            EventAttributes::MarkerRecorded(a) => Some(a.marker_name.as_str()),
            EventAttributes::RecordMarkerFailed(a) => Some(a.marker_name.as_str()),
            _ => None,
        }
    }

    /// Initiating event id for child workflow events.
    pub fn initiated_event_id(&self) -> Option<i64> {
        match &self.event.attributes {
            EventAttributes::ChildWorkflowExecutionStarted(a) => Some(a.initiated_event_id),
            EventAttributes::ChildWorkflowExecutionCompleted(a) => Some(a.initiated_event_id),
            EventAttributes::ChildWorkflowExecutionFailed(a) => Some(a.initiated_event_id),
            EventAttributes::ChildWorkflowExecutionTimedOut(a) => Some(a.initiated_event_id),
            EventAttributes::ChildWorkflowExecutionCanceled(a) => Some(a.initiated_event_id),
            EventAttributes::ChildWorkflowExecutionTerminated(a) => Some(a.initiated_event_id),
            EventAttributes::StartChildWorkflowExecutionFailed(a) => Some(a.initiated_event_id),
            _ => None,
        }
    }

    /// Child workflow type for child workflow events.
    pub fn child_workflow_type(&self) -> Option<&'a WorkflowType> {
        let initiated = self.initiated_event_id().and_then(|id| self.task.event(id));
        match initiated.map(|e| &e.attributes) {
            Some(EventAttributes::StartChildWorkflowExecutionInitiated(a)) => Some(&a.workflow_type),
            _ => match &self.event.attributes {
                EventAttributes::StartChildWorkflowExecutionFailed(a) => a.workflow_type.as_ref(),
                _ => None,
            },
        }
    }

    /// Child workflow id for child workflow events.
    pub fn child_workflow_id(&self) -> Option<&'a str> {
        match &self.event.attributes {
            EventAttributes::ChildWorkflowExecutionStarted(a) => Some(a.workflow_execution.workflow_id.as_str()),
            EventAttributes::ChildWorkflowExecutionCompleted(a) => Some(a.workflow_execution.workflow_id.as_str()),
            EventAttributes::ChildWorkflowExecutionFailed(a) => Some(a.workflow_execution.workflow_id.as_str()),
            EventAttributes::ChildWorkflowExecutionTimedOut(a) => Some(a.workflow_execution.workflow_id.as_str()),
            EventAttributes::ChildWorkflowExecutionCanceled(a) => Some(a.workflow_execution.workflow_id.as_str()),
            EventAttributes::ChildWorkflowExecutionTerminated(a) => Some(a.workflow_execution.workflow_id.as_str()),
            EventAttributes::StartChildWorkflowExecutionFailed(a) => Some(a.workflow_id.as_str()),
            _ => None,
        }
    }

    /// Raw control payload given when the unit behind this event was started.
    pub fn raw_control(&self) -> Option<&'a str> {
        match &self.event.attributes {
            EventAttributes::TimerFired(a) => self.timer_control(a.started_event_id),
            EventAttributes::TimerCanceled(a) => self.timer_control(a.started_event_id),
            EventAttributes::StartChildWorkflowExecutionFailed(a) => a.control.as_deref(),
            _ => {
                if let Some(activity) = self.scheduled_activity() {
                    return activity.control.as_deref();
                }
                let initiated = self.initiated_event_id().and_then(|id| self.task.event(id));
                match initiated.map(|e| &e.attributes) {
                    Some(EventAttributes::StartChildWorkflowExecutionInitiated(a)) => {
                        a.control.as_deref()
                    }
                    _ => None,
                }
            }
        }
    }

    /// Decode the control payload. `Ok(None)` when there is none.
    pub fn control<T: DeserializeOwned>(&self) -> Result<Option<T>, DecodeError> {
        match self.raw_control() {
            Some(raw) => payload::decode(Some(raw), || {
                format!("control of event {}", self.event.event_id)
            })
            .map(Some),
            None => Ok(None),
        }
    }

    /// The name a handler filter is matched against: activity type name,
    /// timer id, signal name, marker name or child workflow type name.
    pub fn name(&self) -> Option<&'a str> {
        match self.category {
            EventCategory::WorkflowStarted
            | EventCategory::WorkflowCancelRequested
            | EventCategory::WorkflowCloseFailed => None,
            EventCategory::SignalReceived => self.signal_name(),
            EventCategory::ActivityCompleted
            | EventCategory::ActivityFailed
            | EventCategory::ActivityTimedOut
            | EventCategory::ActivityCanceled
            | EventCategory::ActivityScheduleFailed => self.activity_type().map(|t| t.name.as_str()),
            EventCategory::TimerFired
            | EventCategory::TimerCanceled
            | EventCategory::TimerStartFailed => self.timer_id(),
            EventCategory::MarkerRecorded | EventCategory::MarkerRecordFailed => self.marker_name(),
            EventCategory::ChildWorkflowStarted
            | EventCategory::ChildWorkflowCompleted
            | EventCategory::ChildWorkflowFailed
            | EventCategory::ChildWorkflowTimedOut
            | EventCategory::ChildWorkflowCanceled
            | EventCategory::ChildWorkflowTerminated => {
                self.child_workflow_type().map(|t| t.name.as_str())
            }
        }
    }

    fn timer_control(&self, started_event_id: i64) -> Option<&'a str> {
        match self.task.event(started_event_id).map(|e| &e.attributes) {
            Some(EventAttributes::TimerStarted(a)) => a.control.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::COMPLETE_MARKER;
    use crate::test_support::*;

    #[test]
    fn test_new_events_skip_decision_bookkeeping_and_prior_events() {
        let ctx = DecisionTaskContext::new(task(
            vec![
                started(1, None),
                decision_started(3),
                scheduled(5, "ActA", "a-1", None),
                activity_completed(7, 5, Some("1")),
                decision_started(9),
            ],
            3,
        ));

        let ids: Vec<i64> = ctx.new_events().map(|e| e.event_id).collect();
        assert_eq!(ids, vec![5, 7]);
    }

    #[test]
    fn test_workflow_input() {
        let ctx = DecisionTaskContext::new(task(vec![started(1, Some("\"x\""))], 0));
        assert_eq!(ctx.workflow_input::<String>().unwrap(), "x");

        let ctx = DecisionTaskContext::new(task(vec![started(1, None)], 0));
        assert_eq!(ctx.workflow_input::<Option<String>>().unwrap(), None);
    }

    #[test]
    fn test_marker_details_absent_vs_malformed() {
        let ctx = DecisionTaskContext::new(task(
            vec![started(1, None), marker(5, "count", Some("not json"))],
            0,
        ));
        assert!(ctx.marker_details::<u32>("other").unwrap().is_none());
        assert!(ctx.marker_details::<u32>("count").is_err());
    }

    #[test]
    fn test_closure_intent() {
        let ctx = DecisionTaskContext::new(task(
            vec![
                started(1, None),
                marker(5, COMPLETE_MARKER, Some("{\"action\":\"complete\",\"result\":\"1\"}")),
            ],
            0,
        ));
        assert_eq!(
            ctx.closure_intent().unwrap(),
            Some(CloseWorkflowControl::Complete {
                result: Some("1".to_string())
            })
        );
    }

    #[test]
    fn test_event_context_activity_accessors() {
        let ctx = DecisionTaskContext::new(task(
            vec![
                started(1, None),
                scheduled(5, "ActA", "a-1", Some("42")),
                activity_failed(7, 5, "boom", Some("\"trace\"")),
            ],
            0,
        ));
        let event = ctx.event(7).unwrap();
        let ectx = EventContext::new(&ctx, event, EventCategory::ActivityFailed);

        assert_eq!(ectx.scheduled_event_id(), Some(5));
        assert_eq!(ectx.activity_id(), Some("a-1"));
        assert_eq!(ectx.activity_type().map(|t| t.name.as_str()), Some("ActA"));
        assert_eq!(ectx.name(), Some("ActA"));
        assert_eq!(ectx.reason(), Some("boom"));
        assert_eq!(ectx.input::<String>().unwrap(), "trace");
    }

    #[test]
    fn test_event_context_timer_control() {
        let ctx = DecisionTaskContext::new(task(
            vec![
                started(1, None),
                timer_started(5, "t1", Some("{\"step\":2}")),
                timer_fired(8, "t1", 5),
            ],
            0,
        ));
        let event = ctx.event(8).unwrap();
        let ectx = EventContext::new(&ctx, event, EventCategory::TimerFired);

        assert_eq!(ectx.name(), Some("t1"));
        let control: serde_json::Value = ectx.control().unwrap().unwrap();
        assert_eq!(control["step"], 2);
    }
}
