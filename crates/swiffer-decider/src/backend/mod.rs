// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Orchestration service backends.
//!
//! The decider talks to the orchestration service only through
//! [`DecisionTaskService`]. This module provides:
//! - `memory`: an in-process scripted service for tests and local runs
//!
//! Production transports (HTTP clients, signing, endpoints) implement the
//! trait outside this crate.

pub mod memory;

use async_trait::async_trait;
use swiffer_protocol::{
    DecisionTask, PollForDecisionTaskRequest, RespondDecisionTaskCompletedRequest, ServiceError,
};

/// Decision task operations of the orchestration service.
#[async_trait]
pub trait DecisionTaskService: Send + Sync {
    /// Long-poll for the next decision task.
    ///
    /// `Ok(None)` (or an empty task) means the poll expired without work.
    async fn poll_for_decision_task(
        &self,
        request: &PollForDecisionTaskRequest,
    ) -> Result<Option<DecisionTask>, ServiceError>;

    /// Acknowledge a decision task with its decision batch.
    async fn respond_decision_task_completed(
        &self,
        request: RespondDecisionTaskCompletedRequest,
    ) -> Result<(), ServiceError>;
}
