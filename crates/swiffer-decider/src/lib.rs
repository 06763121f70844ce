// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Swiffer Decider - replay-safe decision engine for swiffer workflows.
//!
//! A decider never keeps workflow state in memory. Every decision task carries
//! the full event history of one workflow execution; the decider folds that
//! history into the state of each unit of work (activity, timer, child
//! workflow, marker), runs the handlers declared for the events that are new
//! since the previous task, and answers with one ordered batch of decisions.
//!
//! # Features
//!
//! - **Templates**: declare handlers per event category, optionally filtered
//!   by activity type, timer id, signal name, marker name or child workflow
//! - **Decision builder**: validated, duplicate-checked decision batches
//! - **Replay-safe closure**: closing a workflow records a marker first, so a
//!   redelivered task re-issues the same terminal decision
//! - **Retries**: activity retries driven by durable timers and markers
//! - **Driver**: long-poll worker loop with cooperative stop
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                         Decider (worker)                      │
//! │   Idle → Polling → Executing → Submitting → Idle / Stopped    │
//! ├───────────────────────────────────────────────────────────────┤
//! │  TemplateRegistry ── WorkflowTemplate ── handlers             │
//! │         │                    │                                │
//! │  DecisionTaskContext   EventContext  ──►  Decisions (batch)   │
//! │         │                                      │              │
//! │      reducer (history → unit state)      retry controller     │
//! ├───────────────────────────────────────────────────────────────┤
//! │  DecisionTaskService (poll / respond)      swiffer-protocol   │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use swiffer_decider::{Decider, DeciderConfig, EventCategory, WorkflowTemplate};
//! use swiffer_protocol::{ActivityType, WorkflowType};
//!
//! let template = WorkflowTemplate::builder(WorkflowType::new("Order", "1"))
//!     .on(EventCategory::WorkflowStarted, |ctx, decisions| {
//!         let order: Order = ctx.input()?;
//!         decisions.schedule_activity_task(&ActivityType::new("Charge", "1"), &order)?;
//!         Ok(())
//!     })
//!     .on_named(EventCategory::ActivityCompleted, "Charge", |ctx, decisions| {
//!         let receipt: Receipt = ctx.input()?;
//!         decisions.complete_workflow(&receipt)?;
//!         Ok(())
//!     })
//!     .on(EventCategory::ActivityFailed, |ctx, decisions| {
//!         decisions.retry_activity(ctx)?;
//!         Ok(())
//!     })
//!     .build()?;
//!
//! let decider = Decider::builder(DeciderConfig::from_env()?, Arc::new(service))
//!     .template(template)
//!     .build()?;
//! decider.run().await;
//! ```
//!
//! # Closing a workflow
//!
//! `complete_workflow`, `cancel_workflow` and `fail_workflow` append a
//! reserved marker before the terminal decision. If the service rejects the
//! terminal decision (for example because a signal arrived in between), the
//! next task finds the marker in history and re-issues the terminal decision
//! without running any handler.

pub mod backend;
pub mod config;
pub mod context;
pub mod control;
pub mod decider;
pub mod decisions;
pub mod duration;
pub mod error;
pub mod payload;
pub mod reducer;
pub mod registry;
pub mod retry;
pub mod template;
pub mod types;

#[cfg(test)]
mod test_support;

// Main types
pub use backend::DecisionTaskService;
pub use backend::memory::InMemoryDecisionService;
pub use config::{DeciderConfig, HandlerErrorPolicy};
pub use context::{DecisionTaskContext, EventContext};
pub use control::CloseWorkflowControl;
pub use decider::{Decider, DeciderBuilder, DeciderHandle, HANDLER_ERROR_REASON};
pub use decisions::{ActivityOptions, DecisionSettings, Decisions, WorkflowOptions};
pub use duration::{DurationTransformer, IdentityTransformer, ScaledTransformer};
pub use error::{ConfigError, DeciderError, DecisionError, DecodeError, DispatchError, Result};
pub use reducer::{UnitRef, UnitSnapshot, reduce};
pub use registry::TemplateRegistry;
pub use retry::{ExponentialRetryPolicy, FixedDelayRetryPolicy, NoRetryPolicy, RetryPolicy};
pub use template::{EventCategory, Handler, WorkflowTemplate, WorkflowTemplateBuilder};
pub use types::{TaskOutcome, WorkerState, WorkflowEventState};

// Re-export wire types for convenience
pub use swiffer_protocol;
