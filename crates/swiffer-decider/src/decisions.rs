// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Decision builder.
//!
//! Handlers append decisions to a per-task [`Decisions`] batch. Every append
//! validates its identifiers, encodes payloads and durations, and returns the
//! builder for chaining:
//!
//! ```ignore
//! decisions
//!     .record_marker("step", &1)?
//!     .schedule_activity_task(&ActivityType::new("Charge", "1"), &order)?;
//! ```
//!
//! Closing calls (`complete_workflow`, `cancel_workflow`, `fail_workflow`)
//! record a closure marker right before the terminal decision. Nothing can be
//! appended after a closing decision.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use swiffer_protocol::history::ActivityTaskScheduledAttributes;
use swiffer_protocol::{
    ActivityType, CancelTimerAttributes, ChildPolicy, ContinueAsNewWorkflowExecutionAttributes,
    Decision, RecordMarkerAttributes, RequestCancelActivityTaskAttributes,
    RequestCancelExternalWorkflowExecutionAttributes, ScheduleActivityTaskAttributes,
    SignalExternalWorkflowExecutionAttributes, StartChildWorkflowExecutionAttributes,
    StartTimerAttributes, TaskList, WorkflowType, encode_seconds, encode_timeout,
};
use tracing::{trace, warn};
use uuid::Uuid;

use crate::control::{self, CloseWorkflowControl};
use crate::duration::{DurationTransformer, IdentityTransformer};
use crate::error::DecisionError;
use crate::payload;
use crate::retry::{ExponentialRetryPolicy, RetryPolicy};

const MAX_ID_LEN: usize = 256;

/// Worker-wide settings every batch is built with.
#[derive(Clone)]
pub struct DecisionSettings {
    /// Policy used by [`Decisions::retry_activity`]
    pub retry_policy: Arc<dyn RetryPolicy>,
    /// Applied to every duration before encoding
    pub duration_transformer: Arc<dyn DurationTransformer>,
}

impl Default for DecisionSettings {
    fn default() -> Self {
        Self {
            retry_policy: Arc::new(ExponentialRetryPolicy::default()),
            duration_transformer: Arc::new(IdentityTransformer),
        }
    }
}

impl fmt::Debug for DecisionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecisionSettings").finish_non_exhaustive()
    }
}

/// Options for scheduling an activity.
///
/// Timeouts left unset are sent as `"NONE"` (no timeout). Scheduling without
/// options leaves them out so the activity type's registered defaults apply.
#[derive(Debug, Clone, Default)]
pub struct ActivityOptions {
    /// Activity id; a fresh UUID when unset
    pub activity_id: Option<String>,
    /// Raw control payload, echoed back in history
    pub control: Option<String>,
    pub task_list: Option<String>,
    pub task_priority: Option<i32>,
    pub schedule_to_start_timeout: Option<Duration>,
    pub schedule_to_close_timeout: Option<Duration>,
    pub start_to_close_timeout: Option<Duration>,
    pub heartbeat_timeout: Option<Duration>,
}

impl ActivityOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_activity_id(mut self, activity_id: impl Into<String>) -> Self {
        self.activity_id = Some(activity_id.into());
        self
    }

    pub fn with_control(mut self, control: impl Into<String>) -> Self {
        self.control = Some(control.into());
        self
    }

    pub fn with_task_list(mut self, task_list: impl Into<String>) -> Self {
        self.task_list = Some(task_list.into());
        self
    }

    pub fn with_task_priority(mut self, priority: i32) -> Self {
        self.task_priority = Some(priority);
        self
    }

    pub fn with_schedule_to_start_timeout(mut self, timeout: Duration) -> Self {
        self.schedule_to_start_timeout = Some(timeout);
        self
    }

    pub fn with_schedule_to_close_timeout(mut self, timeout: Duration) -> Self {
        self.schedule_to_close_timeout = Some(timeout);
        self
    }

    pub fn with_start_to_close_timeout(mut self, timeout: Duration) -> Self {
        self.start_to_close_timeout = Some(timeout);
        self
    }

    pub fn with_heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = Some(timeout);
        self
    }
}

/// Options for starting a child workflow or continuing as new.
///
/// Unset timeouts are left out so the workflow type's defaults apply.
#[derive(Debug, Clone, Default)]
pub struct WorkflowOptions {
    /// Workflow type version to continue as (continue-as-new only)
    pub version: Option<String>,
    /// Raw control payload (child workflows only)
    pub control: Option<String>,
    pub task_list: Option<String>,
    pub task_priority: Option<i32>,
    pub execution_timeout: Option<Duration>,
    pub task_timeout: Option<Duration>,
    pub child_policy: Option<ChildPolicy>,
    pub tags: Vec<String>,
}

impl WorkflowOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_control(mut self, control: impl Into<String>) -> Self {
        self.control = Some(control.into());
        self
    }

    pub fn with_task_list(mut self, task_list: impl Into<String>) -> Self {
        self.task_list = Some(task_list.into());
        self
    }

    pub fn with_task_priority(mut self, priority: i32) -> Self {
        self.task_priority = Some(priority);
        self
    }

    pub fn with_execution_timeout(mut self, timeout: Duration) -> Self {
        self.execution_timeout = Some(timeout);
        self
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = Some(timeout);
        self
    }

    pub fn with_child_policy(mut self, policy: ChildPolicy) -> Self {
        self.child_policy = Some(policy);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// The ordered decision batch answering one decision task.
#[derive(Debug)]
pub struct Decisions {
    settings: DecisionSettings,
    decisions: Vec<Decision>,
    activity_ids: HashSet<String>,
    timer_ids: HashSet<String>,
    marker_names: HashSet<String>,
    closing: bool,
}

impl Default for Decisions {
    fn default() -> Self {
        Self::new(DecisionSettings::default())
    }
}

impl Decisions {
    pub fn new(settings: DecisionSettings) -> Self {
        Self {
            settings,
            decisions: Vec::new(),
            activity_ids: HashSet::new(),
            timer_ids: HashSet::new(),
            marker_names: HashSet::new(),
            closing: false,
        }
    }

    /// The accumulated decisions, in append order.
    pub fn decisions(&self) -> &[Decision] {
        &self.decisions
    }

    pub fn into_decisions(self) -> Vec<Decision> {
        self.decisions
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    /// True once a closing decision was appended.
    pub fn is_closing(&self) -> bool {
        self.closing
    }

    pub(crate) fn settings(&self) -> &DecisionSettings {
        &self.settings
    }

    // ========== Activities ==========

    /// Schedule an activity with a generated id and the type's default
    /// timeouts.
    pub fn schedule_activity_task<T: Serialize + ?Sized>(
        &mut self,
        activity_type: &ActivityType,
        input: &T,
    ) -> Result<&mut Self, DecisionError> {
        self.ensure_open()?;
        let attrs = ScheduleActivityTaskAttributes {
            activity_type: activity_type.clone(),
            activity_id: Uuid::new_v4().to_string(),
            input: payload::encode(input)?,
            control: None,
            task_list: None,
            task_priority: None,
            schedule_to_start_timeout: None,
            schedule_to_close_timeout: None,
            start_to_close_timeout: None,
            heartbeat_timeout: None,
        };
        self.push_activity(attrs)
    }

    /// Schedule an activity with explicit options.
    pub fn schedule_activity_task_with<T: Serialize + ?Sized>(
        &mut self,
        activity_type: &ActivityType,
        input: &T,
        options: &ActivityOptions,
    ) -> Result<&mut Self, DecisionError> {
        self.ensure_open()?;
        let activity_id = options
            .activity_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let attrs = ScheduleActivityTaskAttributes {
            activity_type: activity_type.clone(),
            activity_id,
            input: payload::encode(input)?,
            control: options.control.clone(),
            task_list: options.task_list.as_deref().map(TaskList::new),
            task_priority: options.task_priority.map(|p| p.to_string()),
            schedule_to_start_timeout: Some(self.timeout(options.schedule_to_start_timeout)),
            schedule_to_close_timeout: Some(self.timeout(options.schedule_to_close_timeout)),
            start_to_close_timeout: Some(self.timeout(options.start_to_close_timeout)),
            heartbeat_timeout: Some(self.timeout(options.heartbeat_timeout)),
        };
        self.push_activity(attrs)
    }

    /// Schedule a copy of a previously scheduled activity under a fresh id.
    pub fn reschedule_activity_task(
        &mut self,
        scheduled: &ActivityTaskScheduledAttributes,
    ) -> Result<&mut Self, DecisionError> {
        self.reschedule_activity_task_as(scheduled, Uuid::new_v4().to_string())
    }

    pub(crate) fn reschedule_activity_task_as(
        &mut self,
        scheduled: &ActivityTaskScheduledAttributes,
        activity_id: String,
    ) -> Result<&mut Self, DecisionError> {
        self.ensure_open()?;
        let attrs = ScheduleActivityTaskAttributes {
            activity_type: scheduled.activity_type.clone(),
            activity_id,
            input: scheduled.input.clone(),
            control: scheduled.control.clone(),
            task_list: scheduled.task_list.clone(),
            task_priority: scheduled.task_priority.clone(),
            schedule_to_start_timeout: scheduled.schedule_to_start_timeout.clone(),
            schedule_to_close_timeout: scheduled.schedule_to_close_timeout.clone(),
            start_to_close_timeout: scheduled.start_to_close_timeout.clone(),
            heartbeat_timeout: scheduled.heartbeat_timeout.clone(),
        };
        self.push_activity(attrs)
    }

    pub fn request_cancel_activity_task(
        &mut self,
        activity_id: &str,
    ) -> Result<&mut Self, DecisionError> {
        self.ensure_open()?;
        validate_id("activity id", activity_id)?;
        self.push(Decision::RequestCancelActivityTask(
            RequestCancelActivityTaskAttributes {
                activity_id: activity_id.to_string(),
            },
        ))
    }

    fn push_activity(
        &mut self,
        attrs: ScheduleActivityTaskAttributes,
    ) -> Result<&mut Self, DecisionError> {
        validate_id("activity id", &attrs.activity_id)?;
        claim(&mut self.activity_ids, "activity id", &attrs.activity_id)?;
        self.push(Decision::ScheduleActivityTask(attrs))
    }

    // ========== Timers ==========

    /// Start a timer. A missing duration fires immediately.
    pub fn start_timer(
        &mut self,
        timer_id: &str,
        duration: Option<Duration>,
    ) -> Result<&mut Self, DecisionError> {
        self.ensure_open()?;
        if control::is_reserved_timer(timer_id) {
            return Err(DecisionError::ReservedName(timer_id.to_string()));
        }
        self.push_timer(timer_id, duration, None)
    }

    /// Start a timer carrying a control payload, available again when it fires.
    pub fn start_timer_with_control<T: Serialize + ?Sized>(
        &mut self,
        timer_id: &str,
        duration: Option<Duration>,
        control: &T,
    ) -> Result<&mut Self, DecisionError> {
        self.ensure_open()?;
        if control::is_reserved_timer(timer_id) {
            return Err(DecisionError::ReservedName(timer_id.to_string()));
        }
        let control = payload::encode(control)?;
        self.push_timer(timer_id, duration, control)
    }

    pub fn cancel_timer(&mut self, timer_id: &str) -> Result<&mut Self, DecisionError> {
        self.ensure_open()?;
        validate_id("timer id", timer_id)?;
        self.push(Decision::CancelTimer(CancelTimerAttributes {
            timer_id: timer_id.to_string(),
        }))
    }

    pub(crate) fn push_timer(
        &mut self,
        timer_id: &str,
        duration: Option<Duration>,
        control: Option<String>,
    ) -> Result<&mut Self, DecisionError> {
        self.ensure_open()?;
        validate_id("timer id", timer_id)?;
        let duration = duration.unwrap_or_else(|| {
            warn!(timer_id = %timer_id, "Timer started without a duration, using zero");
            Duration::ZERO
        });
        let start_to_fire_timeout = encode_seconds(self.transform(duration));
        claim(&mut self.timer_ids, "timer id", timer_id)?;
        self.push(Decision::StartTimer(StartTimerAttributes {
            timer_id: timer_id.to_string(),
            start_to_fire_timeout,
            control,
        }))
    }

    // ========== Markers ==========

    /// Record a marker. Names of the decider's own markers are rejected.
    pub fn record_marker<T: Serialize + ?Sized>(
        &mut self,
        marker_name: &str,
        details: &T,
    ) -> Result<&mut Self, DecisionError> {
        self.ensure_open()?;
        if control::is_reserved_marker(marker_name) {
            return Err(DecisionError::ReservedName(marker_name.to_string()));
        }
        let details = payload::encode(details)?;
        self.push_marker(marker_name, details)
    }

    pub(crate) fn push_marker(
        &mut self,
        marker_name: &str,
        details: Option<String>,
    ) -> Result<&mut Self, DecisionError> {
        self.ensure_open()?;
        validate_name("marker name", marker_name)?;
        claim(&mut self.marker_names, "marker name", marker_name)?;
        self.push(Decision::RecordMarker(RecordMarkerAttributes {
            marker_name: marker_name.to_string(),
            details,
        }))
    }

    // ========== Child and external workflows ==========

    pub fn start_child_workflow<T: Serialize + ?Sized>(
        &mut self,
        workflow_type: &WorkflowType,
        workflow_id: &str,
        input: &T,
        options: &WorkflowOptions,
    ) -> Result<&mut Self, DecisionError> {
        self.ensure_open()?;
        validate_workflow_id(workflow_id)?;
        let attrs = StartChildWorkflowExecutionAttributes {
            workflow_type: workflow_type.clone(),
            workflow_id: workflow_id.to_string(),
            input: payload::encode(input)?,
            control: options.control.clone(),
            task_list: options.task_list.as_deref().map(TaskList::new),
            task_priority: options.task_priority.map(|p| p.to_string()),
            execution_start_to_close_timeout: self.optional_timeout(options.execution_timeout),
            task_start_to_close_timeout: self.optional_timeout(options.task_timeout),
            child_policy: options.child_policy,
            tag_list: options.tags.clone(),
        };
        self.push(Decision::StartChildWorkflowExecution(attrs))
    }

    pub fn request_cancel_external_workflow(
        &mut self,
        workflow_id: &str,
        run_id: Option<&str>,
    ) -> Result<&mut Self, DecisionError> {
        self.ensure_open()?;
        validate_workflow_id(workflow_id)?;
        self.push(Decision::RequestCancelExternalWorkflowExecution(
            RequestCancelExternalWorkflowExecutionAttributes {
                workflow_id: workflow_id.to_string(),
                run_id: run_id.map(str::to_string),
                control: None,
            },
        ))
    }

    pub fn signal_external_workflow<T: Serialize + ?Sized>(
        &mut self,
        workflow_id: &str,
        run_id: Option<&str>,
        signal_name: &str,
        input: &T,
    ) -> Result<&mut Self, DecisionError> {
        self.ensure_open()?;
        validate_workflow_id(workflow_id)?;
        validate_name("signal name", signal_name)?;
        let input = payload::encode(input)?;
        self.push(Decision::SignalExternalWorkflowExecution(
            SignalExternalWorkflowExecutionAttributes {
                workflow_id: workflow_id.to_string(),
                run_id: run_id.map(str::to_string),
                signal_name: signal_name.to_string(),
                input,
                control: None,
            },
        ))
    }

    // ========== Closing ==========

    pub fn complete_workflow<T: Serialize + ?Sized>(
        &mut self,
        result: &T,
    ) -> Result<&mut Self, DecisionError> {
        self.ensure_open()?;
        let result = payload::encode(result)?;
        self.close(CloseWorkflowControl::Complete { result })
    }

    pub fn cancel_workflow(&mut self, details: Option<&str>) -> Result<&mut Self, DecisionError> {
        self.close(CloseWorkflowControl::Cancel {
            details: details.map(str::to_string),
        })
    }

    pub fn fail_workflow(
        &mut self,
        reason: &str,
        details: Option<&str>,
    ) -> Result<&mut Self, DecisionError> {
        self.close(CloseWorkflowControl::Fail {
            reason: Some(reason.to_string()),
            details: details.map(str::to_string),
        })
    }

    pub fn continue_as_new_workflow<T: Serialize + ?Sized>(
        &mut self,
        input: &T,
        options: &WorkflowOptions,
    ) -> Result<&mut Self, DecisionError> {
        self.ensure_open()?;
        let attrs = ContinueAsNewWorkflowExecutionAttributes {
            input: payload::encode(input)?,
            workflow_type_version: options.version.clone(),
            task_list: options.task_list.as_deref().map(TaskList::new),
            task_priority: options.task_priority.map(|p| p.to_string()),
            execution_start_to_close_timeout: self.optional_timeout(options.execution_timeout),
            task_start_to_close_timeout: self.optional_timeout(options.task_timeout),
            child_policy: options.child_policy,
            tag_list: options.tags.clone(),
        };
        self.push(Decision::ContinueAsNewWorkflowExecution(attrs))
    }

    fn close(&mut self, control: CloseWorkflowControl) -> Result<&mut Self, DecisionError> {
        self.ensure_open()?;
        let details = payload::encode(&control)?;
        self.push_marker(control.marker_name(), details)?;
        self.push(control.to_decision())
    }

    /// Issue the terminal decision of an already recorded closure.
    pub(crate) fn reissue_close(
        &mut self,
        control: &CloseWorkflowControl,
    ) -> Result<&mut Self, DecisionError> {
        self.push(control.to_decision())
    }

    // ========== Internals ==========

    fn ensure_open(&self) -> Result<(), DecisionError> {
        if self.closing {
            return Err(DecisionError::WorkflowClosing);
        }
        Ok(())
    }

    fn push(&mut self, decision: Decision) -> Result<&mut Self, DecisionError> {
        self.ensure_open()?;
        trace!(decision_type = decision.decision_type(), "Appending decision");
        self.closing = decision.is_closing();
        self.decisions.push(decision);
        Ok(self)
    }

    pub(crate) fn transform(&self, duration: Duration) -> Duration {
        self.settings.duration_transformer.transform(duration)
    }

    fn timeout(&self, duration: Option<Duration>) -> String {
        encode_timeout(duration.map(|d| self.transform(d)))
    }

    fn optional_timeout(&self, duration: Option<Duration>) -> Option<String> {
        duration.map(|d| encode_seconds(self.transform(d)))
    }
}

fn claim(
    seen: &mut HashSet<String>,
    kind: &'static str,
    id: &str,
) -> Result<(), DecisionError> {
    if !seen.insert(id.to_string()) {
        return Err(DecisionError::DuplicateId {
            kind,
            id: id.to_string(),
        });
    }
    Ok(())
}

fn invalid(kind: &'static str, id: &str, reason: &'static str) -> DecisionError {
    DecisionError::InvalidId {
        kind,
        id: id.to_string(),
        reason,
    }
}

fn validate_name(kind: &'static str, name: &str) -> Result<(), DecisionError> {
    if name.is_empty() {
        return Err(invalid(kind, name, "must not be empty"));
    }
    if name.chars().count() > MAX_ID_LEN {
        return Err(invalid(kind, name, "must be at most 256 characters"));
    }
    Ok(())
}

fn validate_id(kind: &'static str, id: &str) -> Result<(), DecisionError> {
    validate_name(kind, id)?;
    if id.trim() != id {
        return Err(invalid(kind, id, "must not start or end with whitespace"));
    }
    if id.chars().any(char::is_control) {
        return Err(invalid(kind, id, "must not contain control characters"));
    }
    if id.contains([':', '/', '|']) {
        return Err(invalid(kind, id, "must not contain ':', '/' or '|'"));
    }
    Ok(())
}

fn validate_workflow_id(workflow_id: &str) -> Result<(), DecisionError> {
    validate_id("workflow id", workflow_id)?;
    if workflow_id.contains("arn") {
        return Err(invalid("workflow id", workflow_id, "must not contain 'arn'"));
    }
    Ok(())
}
