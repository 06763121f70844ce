// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Swiffer Protocol - wire types for decision tasks
//!
//! This crate holds the messages exchanged between a decider and the
//! workflow-orchestration service:
//! - Inbound: decision tasks carrying the append-only event history
//! - Outbound: the ordered decision batch acknowledging a task
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    swiffer-protocol                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Tasks: DecisionTask / RespondDecisionTaskCompletedRequest  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  History: HistoryEvent + kind-tagged EventAttributes        │
//! │  Decisions: Decision + kind-tagged decision attributes      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Serialization: JSON (serde, camelCase)                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The transport itself (long-poll HTTP, SDK client, ...) is not part of this
//! crate; any transport that can move these serde types can drive a decider.
//!
//! # Usage
//!
//! ```ignore
//! use swiffer_protocol::{DecisionTask, EventAttributes};
//!
//! let task: DecisionTask = serde_json::from_slice(&body)?;
//! for event in &task.events {
//!     if let EventAttributes::WorkflowExecutionStarted(attrs) = &event.attributes {
//!         println!("started with input {:?}", attrs.input);
//!     }
//! }
//! ```

pub mod decision;
pub mod duration;
pub mod error;
pub mod history;
pub mod task;
pub mod types;

// Re-export main types
pub use decision::{
    CancelTimerAttributes, CancelWorkflowExecutionAttributes, ChildPolicy,
    CompleteWorkflowExecutionAttributes, ContinueAsNewWorkflowExecutionAttributes, Decision,
    FailWorkflowExecutionAttributes, RecordMarkerAttributes, RequestCancelActivityTaskAttributes,
    RequestCancelExternalWorkflowExecutionAttributes, ScheduleActivityTaskAttributes,
    SignalExternalWorkflowExecutionAttributes, StartChildWorkflowExecutionAttributes,
    StartTimerAttributes,
};
pub use duration::{NONE, WireDurationError, encode_seconds, encode_timeout, parse_timeout};
pub use error::{ServiceError, ServiceErrorType};
pub use history::{EventAttributes, HistoryEvent};
pub use task::{DecisionTask, PollForDecisionTaskRequest, RespondDecisionTaskCompletedRequest};
pub use types::{ActivityType, TaskList, WorkflowExecution, WorkflowType};
