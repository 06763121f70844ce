// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared helpers for decider integration tests.
//!
//! [`History`] plays the service's part: it appends events, hands out decision
//! tasks and turns an accepted decision batch into the events the service would
//! record for it.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use swiffer_decider::swiffer_protocol::history::{
    ActivityTaskCompletedAttributes, ActivityTaskFailedAttributes, ActivityTaskScheduledAttributes,
    ActivityTaskStartedAttributes, DecisionTaskCompletedAttributes, DecisionTaskScheduledAttributes,
    DecisionTaskStartedAttributes, MarkerRecordedAttributes, TimerCanceledAttributes,
    TimerFiredAttributes, TimerStartedAttributes, WorkflowExecutionSignaledAttributes,
    WorkflowExecutionStartedAttributes,
};
use swiffer_decider::swiffer_protocol::{
    Decision, DecisionTask, EventAttributes, HistoryEvent, WorkflowExecution, WorkflowType,
};

pub const TASK_TOKEN: &str = "token";

pub fn workflow_type() -> WorkflowType {
    WorkflowType::new("workflowType1", "1")
}

/// Install a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

fn timestamp(event_id: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap() + chrono::Duration::seconds(event_id)
}

/// Append-only event history of one workflow execution.
#[derive(Debug, Default)]
pub struct History {
    events: Vec<HistoryEvent>,
    previous_started_event_id: i64,
    last_started_event_id: i64,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[HistoryEvent] {
        &self.events
    }

    pub fn push(&mut self, attributes: EventAttributes) -> i64 {
        let event_id = self.events.len() as i64 + 1;
        self.events
            .push(HistoryEvent::new(event_id, timestamp(event_id), attributes));
        event_id
    }

    // ========== Workflow ==========

    pub fn workflow_started(&mut self, input: Option<&str>) -> i64 {
        self.push(EventAttributes::WorkflowExecutionStarted(
            WorkflowExecutionStartedAttributes {
                input: input.map(str::to_string),
                workflow_type: Some(workflow_type()),
                ..Default::default()
            },
        ))
    }

    pub fn signaled(&mut self, name: &str, input: Option<&str>) -> i64 {
        self.push(EventAttributes::WorkflowExecutionSignaled(
            WorkflowExecutionSignaledAttributes {
                signal_name: name.to_string(),
                input: input.map(str::to_string),
                ..Default::default()
            },
        ))
    }

    // ========== Activities ==========

    pub fn activity_scheduled(&mut self, name: &str, activity_id: &str, input: Option<&str>) -> i64 {
        self.push(EventAttributes::ActivityTaskScheduled(
            ActivityTaskScheduledAttributes {
                activity_type: swiffer_decider::swiffer_protocol::ActivityType::new(name, "1"),
                activity_id: activity_id.to_string(),
                input: input.map(str::to_string),
                control: None,
                task_list: None,
                task_priority: None,
                schedule_to_start_timeout: None,
                schedule_to_close_timeout: None,
                start_to_close_timeout: Some("60".to_string()),
                heartbeat_timeout: None,
                decision_task_completed_event_id: self.last_started_event_id,
            },
        ))
    }

    pub fn activity_started(&mut self, scheduled_event_id: i64) -> i64 {
        self.push(EventAttributes::ActivityTaskStarted(
            ActivityTaskStartedAttributes {
                identity: Some("activity-worker".to_string()),
                scheduled_event_id,
            },
        ))
    }

    pub fn activity_completed(&mut self, scheduled_event_id: i64, result: Option<&str>) -> i64 {
        let started_event_id = self.activity_started(scheduled_event_id);
        self.push(EventAttributes::ActivityTaskCompleted(
            ActivityTaskCompletedAttributes {
                result: result.map(str::to_string),
                scheduled_event_id,
                started_event_id,
            },
        ))
    }

    pub fn activity_failed(&mut self, scheduled_event_id: i64, reason: &str) -> i64 {
        let started_event_id = self.activity_started(scheduled_event_id);
        self.push(EventAttributes::ActivityTaskFailed(
            ActivityTaskFailedAttributes {
                reason: Some(reason.to_string()),
                details: None,
                scheduled_event_id,
                started_event_id,
            },
        ))
    }

    // ========== Timers ==========

    pub fn timer_fired(&mut self, timer_id: &str) -> i64 {
        let started_event_id = self.timer_started_id(timer_id);
        self.push(EventAttributes::TimerFired(TimerFiredAttributes {
            timer_id: timer_id.to_string(),
            started_event_id,
        }))
    }

    pub fn timer_canceled(&mut self, timer_id: &str) -> i64 {
        let started_event_id = self.timer_started_id(timer_id);
        self.push(EventAttributes::TimerCanceled(TimerCanceledAttributes {
            timer_id: timer_id.to_string(),
            started_event_id,
            decision_task_completed_event_id: self.last_started_event_id,
        }))
    }

    fn timer_started_id(&self, timer_id: &str) -> i64 {
        self.events
            .iter()
            .rev()
            .find(|e| {
                matches!(&e.attributes, EventAttributes::TimerStarted(a) if a.timer_id == timer_id)
            })
            .map(|e| e.event_id)
            .unwrap_or_else(|| panic!("timer {timer_id} was never started"))
    }

    // ========== Decision tasks ==========

    /// Schedule and start a decision task, returning what the decider polls.
    pub fn decision_task(&mut self) -> DecisionTask {
        let scheduled_event_id = self.push(EventAttributes::DecisionTaskScheduled(
            DecisionTaskScheduledAttributes::default(),
        ));
        let started_event_id = self.push(EventAttributes::DecisionTaskStarted(
            DecisionTaskStartedAttributes {
                identity: Some("decider".to_string()),
                scheduled_event_id,
            },
        ));
        self.previous_started_event_id = self.last_started_event_id;
        self.last_started_event_id = started_event_id;

        DecisionTask {
            task_token: TASK_TOKEN.to_string(),
            workflow_type: workflow_type(),
            workflow_execution: WorkflowExecution::new("wf-1", "run-1"),
            events: self.events.clone(),
            previous_started_event_id: self.previous_started_event_id,
            started_event_id,
        }
    }

    /// Record an accepted batch the way the service does.
    ///
    /// Returns `true` when the batch closed the workflow.
    pub fn apply(&mut self, decisions: &[Decision]) -> bool {
        let completed_event_id = self.push(EventAttributes::DecisionTaskCompleted(
            DecisionTaskCompletedAttributes {
                execution_context: None,
                scheduled_event_id: self.last_started_event_id - 1,
                started_event_id: self.last_started_event_id,
            },
        ));

        let mut closed = false;
        for decision in decisions {
            match decision {
                Decision::ScheduleActivityTask(attrs) => {
                    self.push(EventAttributes::ActivityTaskScheduled(
                        ActivityTaskScheduledAttributes {
                            activity_type: attrs.activity_type.clone(),
                            activity_id: attrs.activity_id.clone(),
                            input: attrs.input.clone(),
                            control: attrs.control.clone(),
                            task_list: attrs.task_list.clone(),
                            task_priority: attrs.task_priority.clone(),
                            schedule_to_start_timeout: attrs.schedule_to_start_timeout.clone(),
                            schedule_to_close_timeout: attrs.schedule_to_close_timeout.clone(),
                            start_to_close_timeout: attrs.start_to_close_timeout.clone(),
                            heartbeat_timeout: attrs.heartbeat_timeout.clone(),
                            decision_task_completed_event_id: completed_event_id,
                        },
                    ));
                }
                Decision::StartTimer(attrs) => {
                    self.push(EventAttributes::TimerStarted(TimerStartedAttributes {
                        timer_id: attrs.timer_id.clone(),
                        control: attrs.control.clone(),
                        start_to_fire_timeout: attrs.start_to_fire_timeout.clone(),
                        decision_task_completed_event_id: completed_event_id,
                    }));
                }
                Decision::RecordMarker(attrs) => {
                    self.push(EventAttributes::MarkerRecorded(MarkerRecordedAttributes {
                        marker_name: attrs.marker_name.clone(),
                        details: attrs.details.clone(),
                        decision_task_completed_event_id: completed_event_id,
                    }));
                }
                other if other.is_closing() => closed = true,
                _ => {}
            }
        }
        closed
    }

    /// Ids of the activities scheduled so far, by activity type name.
    pub fn scheduled_event_ids(&self, activity_name: &str) -> Vec<i64> {
        self.events
            .iter()
            .filter(|e| {
                matches!(
                    &e.attributes,
                    EventAttributes::ActivityTaskScheduled(a) if a.activity_type.name == activity_name
                )
            })
            .map(|e| e.event_id)
            .collect()
    }
}
