// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! History state reducer.
//!
//! Folds an ordered history into the lifecycle state of one unit. The fold
//! is a pure function of the events: the same history always yields the
//! same snapshot, however many times it is replayed.
//!
//! Units are identified the way the service identifies them in decisions:
//! activities by activity id, timers by timer id, child workflows by
//! workflow id and markers by name. Completion events refer back to the
//! initiating event by id; the reducer follows those references from the
//! first initiating event of the unit.
//!
//! Terminal states are frozen. Markers are the exception in the sense that
//! they carry no lifecycle: a later marker with the same name replaces the
//! details of the earlier one.

use serde::de::DeserializeOwned;
use swiffer_protocol::{EventAttributes, HistoryEvent};

use crate::error::DecodeError;
use crate::payload;
use crate::types::WorkflowEventState;

/// A trackable unit of a workflow execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UnitRef {
    Activity(String),
    Timer(String),
    ChildWorkflow(String),
    Marker(String),
}

impl UnitRef {
    pub fn activity(id: impl Into<String>) -> Self {
        UnitRef::Activity(id.into())
    }

    pub fn timer(id: impl Into<String>) -> Self {
        UnitRef::Timer(id.into())
    }

    pub fn child_workflow(workflow_id: impl Into<String>) -> Self {
        UnitRef::ChildWorkflow(workflow_id.into())
    }

    pub fn marker(name: impl Into<String>) -> Self {
        UnitRef::Marker(name.into())
    }
}

/// The reconstructed state of one unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitSnapshot {
    pub state: WorkflowEventState,
    /// Id of the event that scheduled/started/initiated/recorded the unit
    pub initiated_event_id: Option<i64>,
    /// Id of the last event that changed the snapshot
    pub last_event_id: Option<i64>,
    /// Control payload given when the unit was started
    pub control: Option<String>,
    /// Result payload (marker details for markers)
    pub result: Option<String>,
    /// Failure reason, cause or timeout type
    pub reason: Option<String>,
    /// Failure or cancellation details
    pub details: Option<String>,
}

impl UnitSnapshot {
    /// Decode the result payload. `Ok(None)` when the unit has no result.
    pub fn decode_result<T: DeserializeOwned>(&self) -> Result<Option<T>, DecodeError> {
        match self.result.as_deref() {
            Some(raw) => payload::decode(Some(raw), || "unit result".to_string()).map(Some),
            None => Ok(None),
        }
    }

    fn begin(&mut self, event_id: i64, state: WorkflowEventState, control: Option<&String>) {
        *self = UnitSnapshot {
            state,
            initiated_event_id: Some(event_id),
            last_event_id: Some(event_id),
            control: control.cloned(),
            ..UnitSnapshot::default()
        };
    }

    fn advance(&mut self, event_id: i64, state: WorkflowEventState) {
        self.state = state;
        self.last_event_id = Some(event_id);
    }

    fn is_open(&self) -> bool {
        !self.state.is_terminal() && self.initiated_event_id.is_some()
    }

    fn follows(&self, initiating_event_id: i64) -> bool {
        self.is_open() && self.initiated_event_id == Some(initiating_event_id)
    }
}

/// Fold `events` (ordered by event id) into the snapshot of `unit`.
pub fn reduce(events: &[HistoryEvent], unit: &UnitRef) -> UnitSnapshot {
    let mut snapshot = UnitSnapshot::default();
    for event in events {
        match unit {
            UnitRef::Activity(id) => apply_activity(&mut snapshot, event, id),
            UnitRef::Timer(id) => apply_timer(&mut snapshot, event, id),
            UnitRef::ChildWorkflow(id) => apply_child(&mut snapshot, event, id),
            UnitRef::Marker(name) => apply_marker(&mut snapshot, event, name),
        }
    }
    snapshot
}

fn apply_activity(s: &mut UnitSnapshot, event: &HistoryEvent, id: &str) {
    use WorkflowEventState::*;

    let event_id = event.event_id;
    match &event.attributes {
        EventAttributes::ActivityTaskScheduled(a) if a.activity_id == id => {
            if s.state == NotStarted {
                s.begin(event_id, Initial, a.control.as_ref());
            }
        }
        EventAttributes::ScheduleActivityTaskFailed(a) if a.activity_id == id => {
            if s.state == NotStarted {
                s.advance(event_id, Error);
                s.reason = Some(a.cause.clone());
            }
        }
        EventAttributes::ActivityTaskStarted(a) if s.follows(a.scheduled_event_id) => {
            s.advance(event_id, Active);
        }
        EventAttributes::ActivityTaskCompleted(a) if s.follows(a.scheduled_event_id) => {
            s.advance(event_id, Success);
            s.result = a.result.clone();
        }
        EventAttributes::ActivityTaskFailed(a) if s.follows(a.scheduled_event_id) => {
            s.advance(event_id, Error);
            s.reason = a.reason.clone();
            s.details = a.details.clone();
        }
        EventAttributes::ActivityTaskTimedOut(a) if s.follows(a.scheduled_event_id) => {
            s.advance(event_id, Timeout);
            s.reason = Some(a.timeout_type.clone());
            s.details = a.details.clone();
        }
        EventAttributes::ActivityTaskCanceled(a) if s.follows(a.scheduled_event_id) => {
            s.advance(event_id, Canceled);
            s.details = a.details.clone();
        }
        _ => {}
    }
}

fn apply_timer(s: &mut UnitSnapshot, event: &HistoryEvent, id: &str) {
    use WorkflowEventState::*;

    let event_id = event.event_id;
    match &event.attributes {
        // Timers have no start confirmation and never become Active.
        EventAttributes::TimerStarted(a) if a.timer_id == id => {
            if s.state == NotStarted {
                s.begin(event_id, Initial, a.control.as_ref());
            }
        }
        EventAttributes::StartTimerFailed(a) if a.timer_id == id => {
            if s.state == NotStarted {
                s.advance(event_id, Error);
                s.reason = Some(a.cause.clone());
            }
        }
        EventAttributes::TimerFired(a) if s.follows(a.started_event_id) => {
            s.advance(event_id, Success);
        }
        EventAttributes::TimerCanceled(a) if s.follows(a.started_event_id) => {
            s.advance(event_id, Canceled);
        }
        _ => {}
    }
}

fn apply_child(s: &mut UnitSnapshot, event: &HistoryEvent, workflow_id: &str) {
    use WorkflowEventState::*;

    let event_id = event.event_id;
    match &event.attributes {
        EventAttributes::StartChildWorkflowExecutionInitiated(a) if a.workflow_id == workflow_id => {
            if s.state == NotStarted {
                s.begin(event_id, Initial, a.control.as_ref());
            }
        }
        EventAttributes::StartChildWorkflowExecutionFailed(a) if a.workflow_id == workflow_id => {
            if !s.state.is_terminal() {
                s.advance(event_id, Error);
                s.reason = Some(a.cause.clone());
            }
        }
        EventAttributes::ChildWorkflowExecutionStarted(a) if s.follows(a.initiated_event_id) => {
            s.advance(event_id, Active);
        }
        EventAttributes::ChildWorkflowExecutionCompleted(a) if s.follows(a.initiated_event_id) => {
            s.advance(event_id, Success);
            s.result = a.result.clone();
        }
        EventAttributes::ChildWorkflowExecutionFailed(a) if s.follows(a.initiated_event_id) => {
            s.advance(event_id, Error);
            s.reason = a.reason.clone();
            s.details = a.details.clone();
        }
        EventAttributes::ChildWorkflowExecutionTimedOut(a) if s.follows(a.initiated_event_id) => {
            s.advance(event_id, Timeout);
            s.reason = Some(a.timeout_type.clone());
        }
        EventAttributes::ChildWorkflowExecutionCanceled(a) if s.follows(a.initiated_event_id) => {
            s.advance(event_id, Canceled);
            s.details = a.details.clone();
        }
        EventAttributes::ChildWorkflowExecutionTerminated(a) if s.follows(a.initiated_event_id) => {
            s.advance(event_id, Error);
            s.reason = Some("TERMINATED".to_string());
        }
        _ => {}
    }
}

fn apply_marker(s: &mut UnitSnapshot, event: &HistoryEvent, name: &str) {
    let event_id = event.event_id;
    match &event.attributes {
        EventAttributes::MarkerRecorded(a) if a.marker_name == name => {
            s.state = WorkflowEventState::Success;
            s.initiated_event_id = Some(event_id);
            s.last_event_id = Some(event_id);
            s.result = a.details.clone();
            s.reason = None;
        }
        EventAttributes::RecordMarkerFailed(a) if a.marker_name == name => {
            if s.state == WorkflowEventState::NotStarted {
                s.advance(event_id, WorkflowEventState::Error);
                s.reason = Some(a.cause.clone());
            }
        }
        _ => {}
    }
}
