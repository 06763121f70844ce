// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-memory decision task service.
//!
//! Polls are answered from a queue of scripted results; when the queue is
//! empty a poll waits until something is pushed, like a long poll that never
//! expires. Responses are recorded for inspection and can be scripted to fail.

use std::collections::VecDeque;

use async_trait::async_trait;
use swiffer_protocol::{
    DecisionTask, PollForDecisionTaskRequest, RespondDecisionTaskCompletedRequest, ServiceError,
};
use tokio::sync::{Mutex, Notify};
use tracing::debug;

use super::DecisionTaskService;

#[derive(Debug, Default)]
struct State {
    polls: VecDeque<Result<Option<DecisionTask>, ServiceError>>,
    respond_errors: VecDeque<ServiceError>,
    poll_requests: Vec<PollForDecisionTaskRequest>,
    responses: Vec<RespondDecisionTaskCompletedRequest>,
}

/// Scripted in-process [`DecisionTaskService`].
#[derive(Debug, Default)]
pub struct InMemoryDecisionService {
    state: Mutex<State>,
    pushed: Notify,
}

impl InMemoryDecisionService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a task for a future poll.
    pub async fn push_task(&self, task: DecisionTask) {
        self.push_poll_result(Ok(Some(task))).await;
    }

    /// Queue an expired (empty) poll.
    pub async fn push_empty_poll(&self) {
        self.push_poll_result(Ok(None)).await;
    }

    /// Queue a failing poll.
    pub async fn push_poll_error(&self, error: ServiceError) {
        self.push_poll_result(Err(error)).await;
    }

    /// Make the next respond call fail with `error`.
    pub async fn fail_next_response(&self, error: ServiceError) {
        self.state.lock().await.respond_errors.push_back(error);
    }

    /// Every poll request received so far.
    pub async fn poll_requests(&self) -> Vec<PollForDecisionTaskRequest> {
        self.state.lock().await.poll_requests.clone()
    }

    /// Every accepted response so far.
    pub async fn responses(&self) -> Vec<RespondDecisionTaskCompletedRequest> {
        self.state.lock().await.responses.clone()
    }

    async fn push_poll_result(&self, result: Result<Option<DecisionTask>, ServiceError>) {
        self.state.lock().await.polls.push_back(result);
        self.pushed.notify_one();
    }
}

#[async_trait]
impl DecisionTaskService for InMemoryDecisionService {
    async fn poll_for_decision_task(
        &self,
        request: &PollForDecisionTaskRequest,
    ) -> Result<Option<DecisionTask>, ServiceError> {
        self.state
            .lock()
            .await
            .poll_requests
            .push(request.clone());
        loop {
            let notified = self.pushed.notified();
            if let Some(result) = self.state.lock().await.polls.pop_front() {
                return result;
            }
            debug!(task_list = %request.task_list.name, "No scripted task, waiting");
            notified.await;
        }
    }

    async fn respond_decision_task_completed(
        &self,
        request: RespondDecisionTaskCompletedRequest,
    ) -> Result<(), ServiceError> {
        let mut state = self.state.lock().await;
        if let Some(error) = state.respond_errors.pop_front() {
            return Err(error);
        }
        state.responses.push(request);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swiffer_protocol::TaskList;

    fn request() -> PollForDecisionTaskRequest {
        PollForDecisionTaskRequest {
            domain: "orders".to_string(),
            task_list: TaskList::new("decisions"),
            identity: "test".to_string(),
            reverse_order: false,
        }
    }

    #[tokio::test]
    async fn test_scripted_polls_in_order() {
        let service = InMemoryDecisionService::new();
        service.push_empty_poll().await;
        service.push_poll_error(ServiceError::service("500", "down")).await;

        assert!(service.poll_for_decision_task(&request()).await.unwrap().is_none());
        assert!(service.poll_for_decision_task(&request()).await.is_err());
        assert_eq!(service.poll_requests().await.len(), 2);
    }

    #[tokio::test]
    async fn test_respond_failure_is_consumed_once() {
        let service = InMemoryDecisionService::new();
        service
            .fail_next_response(ServiceError::client("400", "bad"))
            .await;

        let response = RespondDecisionTaskCompletedRequest {
            task_token: "t".to_string(),
            decisions: vec![],
            execution_context: None,
        };
        assert!(
            service
                .respond_decision_task_completed(response.clone())
                .await
                .is_err()
        );
        assert!(service.respond_decision_task_completed(response).await.is_ok());
        assert_eq!(service.responses().await.len(), 1);
    }
}
