// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Workflow templates: the handler table of one workflow type.
//!
//! A template maps `(EventCategory, optional name filter)` to a handler
//! closure. For each new event of a decision task exactly one handler (or
//! none) applies: a handler whose name filter matches the event takes
//! precedence over the category-wide handler.
//!
//! ```ignore
//! let template = WorkflowTemplate::builder(WorkflowType::new("Order", "1"))
//!     .on(EventCategory::WorkflowStarted, |ctx, decisions| {
//!         let order: Order = ctx.input()?;
//!         decisions.schedule_activity_task(&ActivityType::new("Charge", "1"), &order)?;
//!         Ok(())
//!     })
//!     .on_named(EventCategory::ActivityFailed, "Charge", |ctx, decisions| {
//!         decisions.retry_activity(ctx)?;
//!         Ok(())
//!     })
//!     .build()?;
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use swiffer_protocol::{EventAttributes, WorkflowType};
use tracing::{debug, trace};

use crate::context::{DecisionTaskContext, EventContext};
use crate::control;
use crate::decisions::{DecisionSettings, Decisions};
use crate::error::{ConfigError, DispatchError};
use crate::retry;

/// Kinds of history events handlers can be declared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    WorkflowStarted,
    SignalReceived,
    WorkflowCancelRequested,
    ActivityCompleted,
    ActivityFailed,
    ActivityTimedOut,
    ActivityCanceled,
    /// The service rejected a `ScheduleActivityTask` decision
    ActivityScheduleFailed,
    TimerFired,
    TimerCanceled,
    /// The service rejected a `StartTimer` decision
    TimerStartFailed,
    MarkerRecorded,
    /// The service rejected a `RecordMarker` decision
    MarkerRecordFailed,
    /// The service rejected a closing decision
    WorkflowCloseFailed,
    ChildWorkflowStarted,
    ChildWorkflowCompleted,
    ChildWorkflowFailed,
    ChildWorkflowTimedOut,
    ChildWorkflowCanceled,
    ChildWorkflowTerminated,
}

impl EventCategory {
    /// Category of an event, `None` for events never dispatched to handlers.
    pub fn of(attributes: &EventAttributes) -> Option<Self> {
        let category = match attributes {
            EventAttributes::WorkflowExecutionStarted(_) => Self::WorkflowStarted,
            EventAttributes::WorkflowExecutionSignaled(_) => Self::SignalReceived,
            EventAttributes::WorkflowExecutionCancelRequested(_) => Self::WorkflowCancelRequested,
            EventAttributes::ActivityTaskCompleted(_) => Self::ActivityCompleted,
            EventAttributes::ActivityTaskFailed(_) => Self::ActivityFailed,
            EventAttributes::ActivityTaskTimedOut(_) => Self::ActivityTimedOut,
            EventAttributes::ActivityTaskCanceled(_) => Self::ActivityCanceled,
            EventAttributes::ScheduleActivityTaskFailed(_) => Self::ActivityScheduleFailed,
            EventAttributes::TimerFired(_) => Self::TimerFired,
            EventAttributes::TimerCanceled(_) => Self::TimerCanceled,
            EventAttributes::StartTimerFailed(_) => Self::TimerStartFailed,
            EventAttributes::MarkerRecorded(_) => Self::MarkerRecorded,
            EventAttributes::RecordMarkerFailed(_) => Self::MarkerRecordFailed,
            EventAttributes::CompleteWorkflowExecutionFailed(_)
            | EventAttributes::FailWorkflowExecutionFailed(_)
            | EventAttributes::CancelWorkflowExecutionFailed(_)
            | EventAttributes::ContinueAsNewWorkflowExecutionFailed(_) => Self::WorkflowCloseFailed,
            EventAttributes::ChildWorkflowExecutionStarted(_) => Self::ChildWorkflowStarted,
            EventAttributes::ChildWorkflowExecutionCompleted(_) => Self::ChildWorkflowCompleted,
            EventAttributes::ChildWorkflowExecutionFailed(_)
            | EventAttributes::StartChildWorkflowExecutionFailed(_) => Self::ChildWorkflowFailed,
            EventAttributes::ChildWorkflowExecutionTimedOut(_) => Self::ChildWorkflowTimedOut,
            EventAttributes::ChildWorkflowExecutionCanceled(_) => Self::ChildWorkflowCanceled,
            EventAttributes::ChildWorkflowExecutionTerminated(_) => Self::ChildWorkflowTerminated,
            _ => return None,
        };
        Some(category)
    }

    /// Whether events of this category carry a name handlers can filter on.
    pub fn is_nameable(&self) -> bool {
        !matches!(
            self,
            Self::WorkflowStarted | Self::WorkflowCancelRequested | Self::WorkflowCloseFailed
        )
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A user handler. Handlers must be free of outside I/O: everything they
/// need is in the context, everything they do goes into the batch.
pub type Handler =
    Arc<dyn Fn(&EventContext<'_>, &mut Decisions) -> anyhow::Result<()> + Send + Sync>;

type HandlerKey = (EventCategory, Option<String>);

/// The handler table of one workflow type.
#[derive(Clone)]
pub struct WorkflowTemplate {
    workflow_type: WorkflowType,
    handlers: HashMap<HandlerKey, Handler>,
}

impl fmt::Debug for WorkflowTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self
            .handlers
            .keys()
            .map(|(category, name)| match name {
                Some(name) => format!("{}({})", category, name),
                None => category.to_string(),
            })
            .collect();
        keys.sort();
        f.debug_struct("WorkflowTemplate")
            .field("workflow_type", &self.workflow_type)
            .field("handlers", &keys)
            .finish()
    }
}

impl WorkflowTemplate {
    pub fn builder(workflow_type: WorkflowType) -> WorkflowTemplateBuilder {
        WorkflowTemplateBuilder {
            workflow_type,
            handlers: Vec::new(),
        }
    }

    pub fn workflow_type(&self) -> &WorkflowType {
        &self.workflow_type
    }

    /// The handler applying to an event, named handlers first.
    pub fn handler_for(&self, category: EventCategory, name: Option<&str>) -> Option<&Handler> {
        name.and_then(|name| self.handlers.get(&(category, Some(name.to_string()))))
            .or_else(|| self.handlers.get(&(category, None)))
    }

    /// Build the decision batch for a task.
    ///
    /// When history already holds a closure marker the recorded terminal
    /// decision is issued again and no handler runs. Otherwise each new event
    /// is dispatched in order until a closing decision is appended.
    pub fn decide(
        &self,
        task: &DecisionTaskContext,
        settings: &DecisionSettings,
    ) -> Result<Decisions, DispatchError> {
        let mut decisions = Decisions::new(settings.clone());

        if let Some(intent) = task.closure_intent()? {
            debug!(
                workflow_id = %task.workflow_execution().workflow_id,
                marker = intent.marker_name(),
                "Workflow already closing, re-issuing terminal decision"
            );
            decisions.reissue_close(&intent)?;
            return Ok(decisions);
        }

        for event in task.new_events() {
            if decisions.is_closing() {
                debug!(
                    event_id = event.event_id,
                    "Closing decision appended, skipping remaining events"
                );
                break;
            }
            let Some(category) = EventCategory::of(&event.attributes) else {
                trace!(event_id = event.event_id, event_type = event.event_type(), "No handler category");
                continue;
            };
            let ctx = EventContext::new(task, event, category);
            let name = ctx.name();

            match category {
                EventCategory::TimerFired if name.is_some_and(control::is_reserved_timer) => {
                    retry::handle_retry_timer(&ctx, &mut decisions)?;
                    continue;
                }
                EventCategory::TimerCanceled if name.is_some_and(control::is_reserved_timer) => {
                    continue;
                }
                EventCategory::MarkerRecorded if name.is_some_and(control::is_reserved_marker) => {
                    continue;
                }
                _ => {}
            }

            let Some(handler) = self.handler_for(category, name) else {
                trace!(event_id = event.event_id, %category, "No handler declared");
                continue;
            };
            debug!(event_id = event.event_id, %category, name = ?name, "Dispatching event");
            // A panicking handler fails this task only, never the worker.
            panic::catch_unwind(AssertUnwindSafe(|| handler(&ctx, &mut decisions)))
                .map_err(|payload| DispatchError::HandlerPanicked {
                    event_id: event.event_id,
                    category,
                    message: panic_message(payload.as_ref()),
                })?
                .map_err(|source| DispatchError::Handler {
                    event_id: event.event_id,
                    category,
                    source,
                })?;
        }

        Ok(decisions)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Collects handler declarations for one workflow type.
pub struct WorkflowTemplateBuilder {
    workflow_type: WorkflowType,
    handlers: Vec<(HandlerKey, Handler)>,
}

impl WorkflowTemplateBuilder {
    /// Handle every event of a category.
    pub fn on<F>(mut self, category: EventCategory, handler: F) -> Self
    where
        F: Fn(&EventContext<'_>, &mut Decisions) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.handlers.push(((category, None), Arc::new(handler)));
        self
    }

    /// Handle the events of a category whose name (activity type, timer id,
    /// signal, marker or child workflow type name) equals `name`.
    pub fn on_named<F>(mut self, category: EventCategory, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&EventContext<'_>, &mut Decisions) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.handlers
            .push(((category, Some(name.into())), Arc::new(handler)));
        self
    }

    pub fn build(self) -> Result<WorkflowTemplate, ConfigError> {
        if self.handlers.is_empty() {
            return Err(ConfigError::EmptyTemplate(self.workflow_type));
        }

        let mut handlers = HashMap::with_capacity(self.handlers.len());
        for (key, handler) in self.handlers {
            let (category, name) = &key;
            if name.is_some() && !category.is_nameable() {
                return Err(ConfigError::UnnamedCategory {
                    workflow_type: self.workflow_type,
                    category: *category,
                });
            }
            if handlers.contains_key(&key) {
                return Err(ConfigError::AmbiguousHandler {
                    workflow_type: self.workflow_type,
                    category: key.0,
                    name: key.1.unwrap_or_else(|| "any".to_string()),
                });
            }
            handlers.insert(key, handler);
        }

        Ok(WorkflowTemplate {
            workflow_type: self.workflow_type,
            handlers,
        })
    }
}
