// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Activity retries.
//!
//! Retry state lives only in history. Retries are counted per logical
//! invocation: the first attempt of an activity is its root, and every retry
//! of it is keyed by the activity name and the root's scheduled event id.
//! Retrying:
//!
//! 1. finds the root and attempt count of the failed activity (a first
//!    attempt is its own root with count 0);
//! 2. increments the count and asks the [`RetryPolicy`] for a delay;
//! 3. when the policy gives up, nothing is appended;
//! 4. otherwise a retry timer is started whose control is a [`RetryControl`].
//!
//! When the retry timer fires, [`handle_retry_timer`] records a counter
//! marker holding a [`RetryCount`] and schedules a copy of the failed
//! activity under the id the marker names.

use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use tracing::{debug, info};
use uuid::Uuid;

use crate::context::{DecisionTaskContext, EventContext};
use crate::control::{self, RetryControl, RetryCount};
use crate::decisions::Decisions;
use crate::error::{DecisionError, DispatchError};
use crate::payload;

/// Computes the delay before the next attempt of a failed activity.
pub trait RetryPolicy: Send + Sync {
    /// Delay before attempt `attempt` (1-based), `None` to give up.
    fn duration_to_next_try(&self, attempt: u32) -> Option<Duration>;
}

impl<F> RetryPolicy for F
where
    F: Fn(u32) -> Option<Duration> + Send + Sync,
{
    fn duration_to_next_try(&self, attempt: u32) -> Option<Duration> {
        self(attempt)
    }
}

/// Doubling backoff: `initial_delay * 2^(attempt-1)`, capped at `max_delay`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExponentialRetryPolicy {
    /// Delay before the first retry (default: 1s)
    pub initial_delay: Duration,
    /// Upper bound for a single delay (default: none)
    pub max_delay: Option<Duration>,
    /// Maximum number of retries (default: 3)
    pub max_attempts: u32,
}

impl ExponentialRetryPolicy {
    pub fn new(initial_delay: Duration, max_attempts: u32) -> Self {
        Self {
            initial_delay,
            max_delay: None,
            max_attempts,
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }
}

impl Default for ExponentialRetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), 3)
    }
}

impl RetryPolicy for ExponentialRetryPolicy {
    fn duration_to_next_try(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        let multiplier = 2u32.saturating_pow(attempt - 1);
        let delay = self
            .initial_delay
            .checked_mul(multiplier)
            .unwrap_or(Duration::MAX);
        Some(match self.max_delay {
            Some(max) => delay.min(max),
            None => delay,
        })
    }
}

/// The same delay before each of at most `max_attempts` retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedDelayRetryPolicy {
    pub delay: Duration,
    pub max_attempts: u32,
}

impl FixedDelayRetryPolicy {
    pub fn new(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts,
        }
    }
}

impl RetryPolicy for FixedDelayRetryPolicy {
    fn duration_to_next_try(&self, attempt: u32) -> Option<Duration> {
        (1..=self.max_attempts).contains(&attempt).then_some(self.delay)
    }
}

/// Never retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetryPolicy;

impl RetryPolicy for NoRetryPolicy {
    fn duration_to_next_try(&self, _attempt: u32) -> Option<Duration> {
        None
    }
}

impl Decisions {
    /// Retry the activity behind an activity failure/timeout event with the
    /// worker's default policy.
    pub fn retry_activity(&mut self, ctx: &EventContext<'_>) -> Result<&mut Self, DecisionError> {
        let policy = self.settings().retry_policy.clone();
        self.retry_activity_with(ctx, policy.as_ref())
    }

    /// Retry the activity behind an activity failure/timeout event.
    ///
    /// Events that do not refer to a scheduled activity append nothing.
    pub fn retry_activity_with(
        &mut self,
        ctx: &EventContext<'_>,
        policy: &dyn RetryPolicy,
    ) -> Result<&mut Self, DecisionError> {
        let (Some(scheduled_event_id), Some(activity_type)) =
            (ctx.scheduled_event_id(), ctx.activity_type())
        else {
            debug!(
                event_id = ctx.event_id(),
                "Event does not refer to a scheduled activity, not retrying"
            );
            return Ok(self);
        };
        let name = activity_type.name.clone();
        self.retry_activity_named(scheduled_event_id, &name, ctx.task(), policy)
    }

    /// Retry the activity scheduled by `scheduled_event_id`.
    ///
    /// Attempts are counted per logical invocation of `activity_name`, so
    /// two activities of one type failing together retry independently.
    pub fn retry_activity_named(
        &mut self,
        scheduled_event_id: i64,
        activity_name: &str,
        task: &DecisionTaskContext,
        policy: &dyn RetryPolicy,
    ) -> Result<&mut Self, DecisionError> {
        let lineage = match task.scheduled_activity(scheduled_event_id) {
            Some(scheduled) => task.retry_count(&scheduled.activity_id)?,
            None => None,
        };
        let (root_scheduled_event_id, previous) = lineage
            .map(|count| (count.root_scheduled_event_id, count.attempt))
            .unwrap_or((scheduled_event_id, 0));
        let attempt = previous.saturating_add(1);

        let delay = panic::catch_unwind(AssertUnwindSafe(|| policy.duration_to_next_try(attempt)))
            .map_err(|_| DecisionError::RetryPolicy {
                activity: activity_name.to_string(),
                attempt,
            })?;

        let Some(delay) = delay else {
            info!(
                activity = %activity_name,
                attempt,
                "Retry policy exhausted, not retrying"
            );
            return Ok(self);
        };

        debug!(
            activity = %activity_name,
            root_scheduled_event_id,
            attempt,
            delay_secs = delay.as_secs(),
            "Scheduling activity retry"
        );
        let retry = RetryControl {
            scheduled_event_id,
            root_scheduled_event_id,
            activity_name: activity_name.to_string(),
            attempt,
        };
        let control = payload::encode(&retry)?;
        let timer_id = control::retry_timer_id(activity_name, root_scheduled_event_id);
        self.push_timer(&timer_id, Some(delay), control)
    }
}

/// Built-in handler for a fired retry timer.
pub(crate) fn handle_retry_timer(
    ctx: &EventContext<'_>,
    decisions: &mut Decisions,
) -> Result<(), DispatchError> {
    let retry: RetryControl = ctx.control()?.ok_or(DispatchError::MissingEvent {
        kind: "TimerStarted with retry control",
        event_id: ctx.event_id(),
    })?;

    let scheduled = ctx
        .task()
        .scheduled_activity(retry.scheduled_event_id)
        .ok_or(DispatchError::MissingEvent {
            kind: "ActivityTaskScheduled",
            event_id: retry.scheduled_event_id,
        })?;

    let count = RetryCount {
        root_scheduled_event_id: retry.root_scheduled_event_id,
        attempt: retry.attempt,
        activity_id: Uuid::new_v4().to_string(),
    };
    info!(
        activity = %retry.activity_name,
        attempt = retry.attempt,
        scheduled_event_id = retry.scheduled_event_id,
        activity_id = %count.activity_id,
        "Retrying activity"
    );
    let marker_name = control::retry_marker_name(&retry.activity_name, retry.root_scheduled_event_id);
    let details = payload::encode(&count).map_err(DecisionError::from)?;
    decisions
        .push_marker(&marker_name, details)?
        .reschedule_activity_task_as(scheduled, count.activity_id)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::EventCategory;
    use crate::test_support::*;
    use swiffer_protocol::Decision;

    #[test]
    fn test_exponential_policy() {
        let policy = ExponentialRetryPolicy::new(Duration::from_millis(100), 3);
        assert_eq!(policy.duration_to_next_try(1), Some(Duration::from_millis(100)));
        assert_eq!(policy.duration_to_next_try(2), Some(Duration::from_millis(200)));
        assert_eq!(policy.duration_to_next_try(3), Some(Duration::from_millis(400)));
        assert_eq!(policy.duration_to_next_try(4), None);
        assert_eq!(policy.duration_to_next_try(0), None);

        let capped = ExponentialRetryPolicy::new(Duration::from_secs(10), 10)
            .with_max_delay(Duration::from_secs(30));
        assert_eq!(capped.duration_to_next_try(5), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_fixed_and_no_retry_policies() {
        let fixed = FixedDelayRetryPolicy::new(Duration::from_secs(5), 2);
        assert_eq!(fixed.duration_to_next_try(2), Some(Duration::from_secs(5)));
        assert_eq!(fixed.duration_to_next_try(3), None);
        assert_eq!(NoRetryPolicy.duration_to_next_try(1), None);
    }

    fn retry_control(decision: &Decision) -> RetryControl {
        match decision {
            Decision::StartTimer(attrs) => {
                serde_json::from_str(attrs.control.as_deref().unwrap()).unwrap()
            }
            other => panic!("expected a retry timer, got {:?}", other),
        }
    }

    #[test]
    fn test_retry_starts_timer_with_control() {
        let ctx = DecisionTaskContext::new(task(
            vec![
                started(1, None),
                scheduled(5, "ActA", "a-1", Some("42")),
                activity_failed(7, 5, "boom", None),
            ],
            0,
        ));
        let ectx = EventContext::new(&ctx, ctx.event(7).unwrap(), EventCategory::ActivityFailed);
        let mut decisions = Decisions::default();
        decisions
            .retry_activity_with(&ectx, &FixedDelayRetryPolicy::new(Duration::from_secs(30), 3))
            .unwrap();

        match decisions.decisions() {
            [Decision::StartTimer(attrs)] => {
                assert_eq!(attrs.timer_id, "__swiffer.retry-timer.ActA.5");
                assert_eq!(attrs.start_to_fire_timeout, "30");
            }
            other => panic!("unexpected decisions {:?}", other),
        }
        assert_eq!(
            retry_control(&decisions.decisions()[0]),
            RetryControl {
                scheduled_event_id: 5,
                root_scheduled_event_id: 5,
                activity_name: "ActA".to_string(),
                attempt: 1,
            }
        );
    }

    #[test]
    fn test_parallel_failures_of_one_type_retry_independently() {
        let ctx = DecisionTaskContext::new(task(
            vec![
                started(1, None),
                scheduled(5, "ActA", "a-1", Some("1")),
                scheduled(6, "ActA", "a-2", Some("2")),
                activity_failed(9, 5, "boom", None),
                activity_failed(10, 6, "boom", None),
            ],
            0,
        ));
        let policy = FixedDelayRetryPolicy::new(Duration::from_secs(5), 3);
        let mut decisions = Decisions::default();
        for event_id in [9, 10] {
            let ectx = EventContext::new(
                &ctx,
                ctx.event(event_id).unwrap(),
                EventCategory::ActivityFailed,
            );
            decisions.retry_activity_with(&ectx, &policy).unwrap();
        }

        let timer_ids: Vec<&str> = decisions
            .decisions()
            .iter()
            .filter_map(|d| match d {
                Decision::StartTimer(attrs) => Some(attrs.timer_id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            timer_ids,
            vec!["__swiffer.retry-timer.ActA.5", "__swiffer.retry-timer.ActA.6"]
        );
        assert_eq!(retry_control(&decisions.decisions()[1]).attempt, 1);
    }

    #[test]
    fn test_retried_activity_counts_from_its_root() {
        let count = "{\"rootScheduledEventId\":5,\"attempt\":1,\"activityId\":\"a-retry\"}";
        let ctx = DecisionTaskContext::new(task(
            vec![
                started(1, None),
                scheduled(5, "ActA", "a-1", Some("42")),
                activity_failed(7, 5, "boom", None),
                marker(13, "__swiffer.retry-count.ActA.5", Some(count)),
                scheduled(14, "ActA", "a-retry", Some("42")),
                activity_failed(16, 14, "boom", None),
            ],
            10,
        ));
        let ectx = EventContext::new(&ctx, ctx.event(16).unwrap(), EventCategory::ActivityFailed);
        let mut decisions = Decisions::default();
        decisions
            .retry_activity_with(&ectx, &FixedDelayRetryPolicy::new(Duration::from_secs(5), 3))
            .unwrap();

        match decisions.decisions() {
            [Decision::StartTimer(attrs)] => {
                assert_eq!(attrs.timer_id, "__swiffer.retry-timer.ActA.5");
            }
            other => panic!("unexpected decisions {:?}", other),
        }
        assert_eq!(
            retry_control(&decisions.decisions()[0]),
            RetryControl {
                scheduled_event_id: 14,
                root_scheduled_event_id: 5,
                activity_name: "ActA".to_string(),
                attempt: 2,
            }
        );
    }

    #[test]
    fn test_unrelated_invocation_starts_a_fresh_count() {
        let count = "{\"rootScheduledEventId\":5,\"attempt\":2,\"activityId\":\"a-retry\"}";
        let ctx = DecisionTaskContext::new(task(
            vec![
                started(1, None),
                scheduled(5, "ActA", "a-1", None),
                marker(13, "__swiffer.retry-count.ActA.5", Some(count)),
                scheduled(14, "ActA", "a-retry", None),
                scheduled(20, "ActA", "a-later", None),
                activity_failed(22, 20, "boom", None),
            ],
            10,
        ));
        let ectx = EventContext::new(&ctx, ctx.event(22).unwrap(), EventCategory::ActivityFailed);
        let mut decisions = Decisions::default();
        decisions
            .retry_activity_with(&ectx, &FixedDelayRetryPolicy::new(Duration::from_secs(5), 1))
            .unwrap();

        let control = retry_control(&decisions.decisions()[0]);
        assert_eq!(control.root_scheduled_event_id, 20);
        assert_eq!(control.attempt, 1);
    }

    #[test]
    fn test_same_history_same_retry_decision() {
        let count = "{\"rootScheduledEventId\":5,\"attempt\":1,\"activityId\":\"a-retry\"}";
        let ctx = DecisionTaskContext::new(task(
            vec![
                started(1, None),
                scheduled(5, "ActA", "a-1", None),
                marker(13, "__swiffer.retry-count.ActA.5", Some(count)),
                scheduled(14, "ActA", "a-retry", None),
                activity_failed(16, 14, "boom", None),
            ],
            10,
        ));
        let policy = ExponentialRetryPolicy::new(Duration::from_secs(2), 5);

        let mut first = Decisions::default();
        first.retry_activity_named(14, "ActA", &ctx, &policy).unwrap();
        let mut second = Decisions::default();
        second.retry_activity_named(14, "ActA", &ctx, &policy).unwrap();

        assert_eq!(first.decisions(), second.decisions());
        match first.decisions() {
            [Decision::StartTimer(attrs)] => assert_eq!(attrs.start_to_fire_timeout, "4"),
            other => panic!("unexpected decisions {:?}", other),
        }
        assert_eq!(retry_control(&first.decisions()[0]).attempt, 2);
    }

    #[test]
    fn test_retry_exhausted_appends_nothing() {
        let count = "{\"rootScheduledEventId\":3,\"attempt\":2,\"activityId\":\"a-2\"}";
        let ctx = DecisionTaskContext::new(task(
            vec![
                started(1, None),
                marker(4, "__swiffer.retry-count.ActA.3", Some(count)),
                scheduled(5, "ActA", "a-2", None),
                activity_failed(7, 5, "boom", None),
            ],
            0,
        ));
        let ectx = EventContext::new(&ctx, ctx.event(7).unwrap(), EventCategory::ActivityFailed);
        let policy = |attempt: u32| (attempt <= 2).then_some(Duration::from_secs(1));

        let mut decisions = Decisions::default();
        decisions.retry_activity_with(&ectx, &policy).unwrap();
        assert!(decisions.is_empty());
    }

    #[test]
    fn test_undecodable_retry_counter_is_an_error() {
        let ctx = DecisionTaskContext::new(task(
            vec![
                started(1, None),
                scheduled(5, "ActA", "a-1", None),
                marker(6, "__swiffer.retry-count.ActA.2", Some("3")),
                activity_failed(7, 5, "boom", None),
            ],
            0,
        ));
        let mut decisions = Decisions::default();
        let err = decisions
            .retry_activity_named(5, "ActA", &ctx, &NoRetryPolicy)
            .unwrap_err();
        assert!(matches!(err, DecisionError::Decode(_)));
    }

    #[test]
    fn test_panicking_policy_is_an_error() {
        let ctx = DecisionTaskContext::new(task(vec![started(1, None)], 0));
        let policy = |_attempt: u32| -> Option<Duration> { panic!("bad policy") };

        let mut decisions = Decisions::default();
        let err = decisions
            .retry_activity_named(5, "ActA", &ctx, &policy)
            .unwrap_err();
        assert!(matches!(err, DecisionError::RetryPolicy { attempt: 1, .. }));
    }

    #[test]
    fn test_retry_timer_records_count_and_reschedules() {
        let control = "{\"scheduledEventId\":5,\"rootScheduledEventId\":5,\"activityName\":\"ActA\",\"attempt\":2}";
        let ctx = DecisionTaskContext::new(task(
            vec![
                started(1, None),
                scheduled(5, "ActA", "a-1", Some("42")),
                activity_failed(7, 5, "boom", None),
                timer_started(9, "__swiffer.retry-timer.ActA.5", Some(control)),
                timer_fired(12, "__swiffer.retry-timer.ActA.5", 9),
            ],
            10,
        ));
        let ectx = EventContext::new(&ctx, ctx.event(12).unwrap(), EventCategory::TimerFired);
        let mut decisions = Decisions::default();
        handle_retry_timer(&ectx, &mut decisions).unwrap();

        match decisions.decisions() {
            [Decision::RecordMarker(m), Decision::ScheduleActivityTask(a)] => {
                assert_eq!(m.marker_name, "__swiffer.retry-count.ActA.5");
                let count: RetryCount = serde_json::from_str(m.details.as_deref().unwrap()).unwrap();
                assert_eq!(count.root_scheduled_event_id, 5);
                assert_eq!(count.attempt, 2);
                assert_eq!(count.activity_id, a.activity_id);
                assert_eq!(a.activity_type.name, "ActA");
                assert_eq!(a.input.as_deref(), Some("42"));
                assert_ne!(a.activity_id, "a-1");
            }
            other => panic!("unexpected decisions {:?}", other),
        }
    }

    #[test]
    fn test_retry_timer_without_scheduled_event_fails() {
        let control = "{\"scheduledEventId\":99,\"rootScheduledEventId\":99,\"activityName\":\"ActA\",\"attempt\":1}";
        let ctx = DecisionTaskContext::new(task(
            vec![
                started(1, None),
                timer_started(9, "__swiffer.retry-timer.ActA.99", Some(control)),
                timer_fired(12, "__swiffer.retry-timer.ActA.99", 9),
            ],
            10,
        ));
        let ectx = EventContext::new(&ctx, ctx.event(12).unwrap(), EventCategory::TimerFired);
        let mut decisions = Decisions::default();
        assert!(matches!(
            handle_retry_timer(&ectx, &mut decisions),
            Err(DispatchError::MissingEvent {
                event_id: 99,
                ..
            })
        ));
    }
}
