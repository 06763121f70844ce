// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Decider error types.

use swiffer_protocol::{ServiceError, WorkflowType};
use thiserror::Error;

use crate::template::EventCategory;

/// Invalid worker or template configuration. Always fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting (e.g. environment variable) is missing
    #[error("missing configuration: {0}")]
    Missing(String),

    /// A setting has an unusable value
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// Two templates declare the same workflow type
    #[error("workflow type {0} is registered by more than one template")]
    DuplicateWorkflowType(WorkflowType),

    /// A template declares no handler at all
    #[error("template for {0} declares no handlers")]
    EmptyTemplate(WorkflowType),

    /// Two handlers of a template match the same events
    #[error("template for {workflow_type} declares more than one handler for {category} ({name})")]
    AmbiguousHandler {
        workflow_type: WorkflowType,
        category: EventCategory,
        name: String,
    },

    /// A name filter was given for a category whose events carry no name
    #[error("template for {workflow_type}: {category} handlers cannot be filtered by name")]
    UnnamedCategory {
        workflow_type: WorkflowType,
        category: EventCategory,
    },
}

/// A payload could not be decoded.
///
/// Distinct from "absent": lookups that find nothing return `Ok(None)`.
#[derive(Debug, Error)]
#[error("failed to decode {what}: {source}")]
pub struct DecodeError {
    /// What was being decoded (e.g. `marker 'x' details`)
    pub what: String,
    #[source]
    pub source: serde_json::Error,
}

impl DecodeError {
    pub(crate) fn new(what: impl Into<String>, source: serde_json::Error) -> Self {
        Self {
            what: what.into(),
            source,
        }
    }
}

/// A decision could not be appended to the batch.
#[derive(Debug, Error)]
pub enum DecisionError {
    /// The same activity id, timer id or marker name was used twice in one batch
    #[error("duplicate {kind} '{id}' in decision batch")]
    DuplicateId { kind: &'static str, id: String },

    /// The name is reserved for the decider's own protocol markers/timers
    #[error("'{0}' is a reserved name")]
    ReservedName(String),

    /// The identifier does not satisfy the service's constraints
    #[error("invalid {kind} '{id}': {reason}")]
    InvalidId {
        kind: &'static str,
        id: String,
        reason: &'static str,
    },

    /// A closing decision was already appended to this batch
    #[error("a closing decision was already added to this batch")]
    WorkflowClosing,

    /// A payload could not be serialized
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    /// A payload read from history could not be decoded
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The retry policy panicked while computing the next delay
    #[error("retry policy panicked for activity '{activity}' attempt {attempt}")]
    RetryPolicy { activity: String, attempt: u32 },
}

/// Building the decision batch for a task failed.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A user handler returned an error
    #[error("{category} handler failed on event {event_id}: {source:#}")]
    Handler {
        event_id: i64,
        category: EventCategory,
        #[source]
        source: anyhow::Error,
    },

    /// A user handler panicked
    #[error("{category} handler panicked on event {event_id}: {message}")]
    HandlerPanicked {
        event_id: i64,
        category: EventCategory,
        message: String,
    },

    /// An internal decision could not be appended
    #[error(transparent)]
    Decision(#[from] DecisionError),

    /// A protocol payload in history could not be decoded
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// History references an event the task does not contain
    #[error("history has no {kind} event with id {event_id}")]
    MissingEvent { kind: &'static str, event_id: i64 },
}

/// Errors surfaced by the decider driver.
#[derive(Debug, Error)]
pub enum DeciderError {
    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The orchestration service returned an error
    #[error("service error: {0}")]
    Service(#[from] ServiceError),

    /// The worker task could not be joined
    #[error("internal error: {0}")]
    Internal(String),
}

/// Type alias for decider results.
pub type Result<T> = std::result::Result<T, DeciderError>;
