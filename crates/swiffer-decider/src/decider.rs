// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Decision task driver.
//!
//! A [`Decider`] is one worker: it long-polls the service for a decision
//! task, dispatches the new events through the template registered for the
//! task's workflow type, and submits the resulting batch. One task is run to
//! completion before the next poll.

use std::sync::Arc;
use std::time::Duration;

use swiffer_protocol::{
    Decision, DecisionTask, PollForDecisionTaskRequest, RespondDecisionTaskCompletedRequest,
    TaskList,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::backend::DecisionTaskService;
use crate::config::{DeciderConfig, HandlerErrorPolicy};
use crate::context::DecisionTaskContext;
use crate::decisions::{DecisionSettings, Decisions};
use crate::duration::DurationTransformer;
use crate::error::{ConfigError, DecisionError, DeciderError, DispatchError, Result};
use crate::registry::TemplateRegistry;
use crate::retry::RetryPolicy;
use crate::template::WorkflowTemplate;
use crate::types::{TaskOutcome, WorkerState};

/// Reason sent with the `FailWorkflowExecution` decision when a handler fails.
pub const HANDLER_ERROR_REASON: &str = "decision handler error";

/// Builder for a [`Decider`].
pub struct DeciderBuilder {
    config: DeciderConfig,
    service: Arc<dyn DecisionTaskService>,
    templates: Vec<WorkflowTemplate>,
    registry: Option<Arc<TemplateRegistry>>,
    settings: DecisionSettings,
}

impl DeciderBuilder {
    /// Register a template. Mutually exclusive with [`DeciderBuilder::registry`].
    pub fn template(mut self, template: WorkflowTemplate) -> Self {
        self.templates.push(template);
        self
    }

    /// Register several templates.
    pub fn templates(mut self, templates: impl IntoIterator<Item = WorkflowTemplate>) -> Self {
        self.templates.extend(templates);
        self
    }

    /// Use a registry shared with other workers.
    pub fn registry(mut self, registry: Arc<TemplateRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Policy used by `retry_activity` in handlers.
    pub fn retry_policy(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.settings.retry_policy = Arc::new(policy);
        self
    }

    /// Transformer applied to every duration before it is encoded.
    pub fn duration_transformer(mut self, transformer: impl DurationTransformer + 'static) -> Self {
        self.settings.duration_transformer = Arc::new(transformer);
        self
    }

    pub fn build(self) -> std::result::Result<Decider, ConfigError> {
        if self.config.domain.is_empty() {
            return Err(ConfigError::Invalid("domain must not be empty".to_string()));
        }
        if self.config.task_list.is_empty() {
            return Err(ConfigError::Invalid("task list must not be empty".to_string()));
        }

        let registry = match self.registry {
            Some(_) if !self.templates.is_empty() => {
                return Err(ConfigError::Invalid(
                    "templates and a shared registry are mutually exclusive".to_string(),
                ));
            }
            Some(registry) => registry,
            None => Arc::new(TemplateRegistry::new(self.templates)?),
        };
        if registry.is_empty() {
            return Err(ConfigError::Invalid("no workflow templates registered".to_string()));
        }

        let (state, _) = watch::channel(WorkerState::Idle);
        Ok(Decider {
            config: self.config,
            service: self.service,
            registry,
            settings: self.settings,
            cancel_token: CancellationToken::new(),
            state,
        })
    }
}

/// A single decision worker.
pub struct Decider {
    config: DeciderConfig,
    service: Arc<dyn DecisionTaskService>,
    registry: Arc<TemplateRegistry>,
    settings: DecisionSettings,
    cancel_token: CancellationToken,
    state: watch::Sender<WorkerState>,
}

impl Decider {
    pub fn builder(config: DeciderConfig, service: Arc<dyn DecisionTaskService>) -> DeciderBuilder {
        DeciderBuilder {
            config,
            service,
            templates: Vec::new(),
            registry: None,
            settings: DecisionSettings::default(),
        }
    }

    pub fn config(&self) -> &DeciderConfig {
        &self.config
    }

    /// The registry this worker dispatches through.
    pub fn registry(&self) -> &Arc<TemplateRegistry> {
        &self.registry
    }

    /// Current worker state.
    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Watch worker state transitions.
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    /// Token cancelled by [`Decider::stop`].
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Request a cooperative stop.
    ///
    /// A poll in flight is interrupted; a task being executed or submitted
    /// runs to completion first.
    pub fn stop(&self) {
        info!(identity = %self.config.identity, "Stop requested");
        self.cancel_token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.state() == WorkerState::Stopped
    }

    fn set_state(&self, state: WorkerState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(from = ?previous, to = ?state, "Worker state changed");
        }
    }

    // ========== Worker loop ==========

    /// Poll and execute tasks until stopped.
    ///
    /// Poll failures are logged and retried after
    /// `poll_error_backoff_ms`.
    #[instrument(skip(self), fields(domain = %self.config.domain, task_list = %self.config.task_list, identity = %self.config.identity))]
    pub async fn run(&self) {
        info!(
            workflow_types = self.registry.len(),
            "Decider started"
        );

        while !self.cancel_token.is_cancelled() {
            if let Err(e) = self.poll_and_execute().await {
                self.set_state(WorkerState::Idle);
                let backoff_ms = self.config.poll_error_backoff_ms;
                error!(error = %e, backoff_ms, "Polling for decision task failed");
                tokio::select! {
                    biased;
                    _ = self.cancel_token.cancelled() => break,
                    _ = tokio::time::sleep(Duration::from_millis(backoff_ms)) => {}
                }
            }
        }

        self.set_state(WorkerState::Stopped);
        info!("Decider stopped");
    }

    /// Poll for one task and execute it.
    ///
    /// Returns `Ok(None)` when the poll was interrupted by [`Decider::stop`].
    pub async fn poll_and_execute(&self) -> Result<Option<TaskOutcome>> {
        let Some(task) = self.poll().await? else {
            self.set_state(WorkerState::Idle);
            return Ok(None);
        };
        let outcome = self.execute_task(task).await;
        self.set_state(WorkerState::Idle);
        Ok(Some(outcome))
    }

    /// Long-poll until a task with at least one event arrives.
    ///
    /// Expired (empty) polls are retried. Returns `Ok(None)` once stop is
    /// requested.
    pub async fn poll(&self) -> Result<Option<DecisionTask>> {
        self.set_state(WorkerState::Polling);
        let request = PollForDecisionTaskRequest {
            domain: self.config.domain.clone(),
            task_list: TaskList::new(self.config.task_list.clone()),
            identity: self.config.identity.clone(),
            reverse_order: false,
        };

        loop {
            let polled = tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => {
                    debug!("Poll interrupted by stop");
                    return Ok(None);
                }
                result = self.service.poll_for_decision_task(&request) => result?,
            };
            match polled {
                Some(task) if !task.is_empty() => {
                    debug!(
                        task_token = %task.task_token,
                        events = task.events.len(),
                        "Received decision task"
                    );
                    return Ok(Some(task));
                }
                _ => debug!("Poll expired without a task"),
            }
        }
    }

    // ========== Task execution ==========

    /// Dispatch a task's new events and submit the resulting batch.
    #[instrument(
        skip(self, task),
        fields(
            task_token = %task.task_token,
            workflow_type = %task.workflow_type,
            workflow_id = %task.workflow_execution.workflow_id,
        )
    )]
    pub async fn execute_task(&self, task: DecisionTask) -> TaskOutcome {
        self.set_state(WorkerState::Executing);
        let ctx = DecisionTaskContext::new(task);

        let Some(template) = self.registry.resolve(ctx.workflow_type()) else {
            error!("No template registered for workflow type, abandoning task");
            return TaskOutcome::Abandoned {
                reason: format!("no template registered for {}", ctx.workflow_type()),
            };
        };

        let decisions = match template.decide(&ctx, &self.settings) {
            Ok(decisions) => decisions.into_decisions(),
            Err(e) => match self.recover(&e) {
                Some(decisions) => decisions,
                None => {
                    return TaskOutcome::Abandoned {
                        reason: e.to_string(),
                    };
                }
            },
        };

        self.submit(ctx.task_token(), decisions).await
    }

    /// Replacement batch for a failed dispatch, per the handler error policy.
    fn recover(&self, error: &DispatchError) -> Option<Vec<Decision>> {
        match self.config.handler_error_policy {
            HandlerErrorPolicy::Abandon => {
                error!(error = %error, "Decision handler failed, abandoning task");
                None
            }
            HandlerErrorPolicy::FailWorkflow => {
                error!(error = %error, "Decision handler failed, failing workflow");
                match self.failure_batch(error) {
                    Ok(decisions) => Some(decisions),
                    Err(e) => {
                        error!(error = %e, "Could not build failure batch, abandoning task");
                        None
                    }
                }
            }
        }
    }

    fn failure_batch(&self, error: &DispatchError) -> std::result::Result<Vec<Decision>, DecisionError> {
        let mut decisions = Decisions::new(self.settings.clone());
        decisions.fail_workflow(HANDLER_ERROR_REASON, Some(&error.to_string()))?;
        Ok(decisions.into_decisions())
    }

    async fn submit(&self, task_token: &str, decisions: Vec<Decision>) -> TaskOutcome {
        self.set_state(WorkerState::Submitting);
        let count = decisions.len();
        let request = RespondDecisionTaskCompletedRequest {
            task_token: task_token.to_string(),
            decisions,
            execution_context: None,
        };

        match self.service.respond_decision_task_completed(request).await {
            Ok(()) => {
                info!(decisions = count, "Decision task completed");
                TaskOutcome::Submitted { decisions: count }
            }
            Err(e) if e.is_client_error() => {
                warn!(error = %e, "Decisions rejected, leaving task for redelivery");
                TaskOutcome::RetryLater {
                    reason: e.to_string(),
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to submit decisions, abandoning task");
                TaskOutcome::Abandoned {
                    reason: e.to_string(),
                }
            }
        }
    }

    // ========== Background worker ==========

    /// Run the worker on a tokio task.
    pub fn spawn(self) -> DeciderHandle {
        let decider = Arc::new(self);
        let state = decider.subscribe();
        let cancel_token = decider.cancel_token();
        let worker = Arc::clone(&decider);
        let join = tokio::spawn(async move { worker.run().await });

        DeciderHandle {
            join,
            cancel_token,
            state,
        }
    }
}

/// Handle to a worker started with [`Decider::spawn`].
pub struct DeciderHandle {
    join: JoinHandle<()>,
    cancel_token: CancellationToken,
    state: watch::Receiver<WorkerState>,
}

impl DeciderHandle {
    pub fn stop(&self) {
        self.cancel_token.cancel();
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state.clone()
    }

    /// Wait for the worker to exit.
    pub async fn join(self) -> Result<()> {
        self.join
            .await
            .map_err(|e| DeciderError::Internal(format!("decider task failed: {e}")))
    }

    /// Stop the worker and wait for it to exit.
    pub async fn shutdown(self) -> Result<()> {
        self.stop();
        self.join().await
    }
}
