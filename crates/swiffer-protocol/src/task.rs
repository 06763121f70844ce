// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Decision task request/response messages.

use serde::{Deserialize, Serialize};

use crate::decision::Decision;
use crate::history::HistoryEvent;
use crate::types::{TaskList, WorkflowExecution, WorkflowType};

/// Long-poll request for the next decision task of a task list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollForDecisionTaskRequest {
    pub domain: String,
    pub task_list: TaskList,
    pub identity: String,
    /// Return the newest events first (deciders want `false`)
    #[serde(default)]
    pub reverse_order: bool,
}

/// A decision task handed out by the service.
///
/// An empty `task_token` means the long poll expired without work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionTask {
    pub task_token: String,
    pub workflow_type: WorkflowType,
    pub workflow_execution: WorkflowExecution,
    /// Full history, ordered by event id
    #[serde(default)]
    pub events: Vec<HistoryEvent>,
    /// `DecisionTaskStarted` id of the previously completed decision task,
    /// 0 when this is the first decision task of the execution
    #[serde(default)]
    pub previous_started_event_id: i64,
    /// `DecisionTaskStarted` id of this task
    #[serde(default)]
    pub started_event_id: i64,
}

impl DecisionTask {
    /// True when the long poll returned nothing to do.
    pub fn is_empty(&self) -> bool {
        self.task_token.is_empty() || self.events.is_empty()
    }
}

/// Acknowledgment of a decision task with its decision batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondDecisionTaskCompletedRequest {
    pub task_token: String,
    pub decisions: Vec<Decision>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_context: Option<String>,
}
