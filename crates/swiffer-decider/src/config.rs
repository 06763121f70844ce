// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Decider worker configuration.

use std::env;
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// What the driver does when building a decision batch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandlerErrorPolicy {
    /// Submit a batch that records the fail marker and fails the workflow
    #[default]
    FailWorkflow,
    /// Leave the task unacknowledged so the service redelivers it after
    /// its timeout
    Abandon,
}

impl FromStr for HandlerErrorPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail_workflow" | "fail" => Ok(HandlerErrorPolicy::FailWorkflow),
            "abandon" => Ok(HandlerErrorPolicy::Abandon),
            other => Err(ConfigError::Invalid(format!(
                "unknown handler error policy '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for HandlerErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerErrorPolicy::FailWorkflow => f.write_str("fail_workflow"),
            HandlerErrorPolicy::Abandon => f.write_str("abandon"),
        }
    }
}

/// Configuration of one decider worker.
#[derive(Debug, Clone)]
pub struct DeciderConfig {
    /// Domain the workflows live in (required)
    pub domain: String,
    /// Task list to poll for decision tasks (required)
    pub task_list: String,
    /// Identity reported with each poll (default: "swiffer-decider-<pid>")
    pub identity: String,
    /// Delay before polling again after a failed poll (default: 1_000)
    pub poll_error_backoff_ms: u64,
    /// Reaction to handler errors (default: fail the workflow)
    pub handler_error_policy: HandlerErrorPolicy,
}

impl DeciderConfig {
    /// Load configuration from environment variables.
    ///
    /// # Required Environment Variables
    /// - `SWIFFER_DOMAIN` - Domain the workflows live in
    /// - `SWIFFER_TASK_LIST` - Decision task list to poll
    ///
    /// # Optional Environment Variables
    /// - `SWIFFER_IDENTITY` - Worker identity (default: "swiffer-decider-<pid>")
    /// - `SWIFFER_POLL_ERROR_BACKOFF_MS` - Backoff after a failed poll (default: 1000)
    /// - `SWIFFER_HANDLER_ERROR_POLICY` - `fail_workflow` or `abandon` (default: fail_workflow)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let domain = lookup("SWIFFER_DOMAIN")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::Missing("SWIFFER_DOMAIN is required".to_string()))?;

        let task_list = lookup("SWIFFER_TASK_LIST")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::Missing("SWIFFER_TASK_LIST is required".to_string()))?;

        let mut config = Self::new(domain, task_list);

        if let Some(identity) = lookup("SWIFFER_IDENTITY") {
            config.identity = identity;
        }

        if let Some(backoff) = lookup("SWIFFER_POLL_ERROR_BACKOFF_MS") {
            config.poll_error_backoff_ms = backoff.parse().map_err(|e| {
                ConfigError::Invalid(format!("invalid SWIFFER_POLL_ERROR_BACKOFF_MS: {}", e))
            })?;
        }

        if let Some(policy) = lookup("SWIFFER_HANDLER_ERROR_POLICY") {
            config.handler_error_policy = policy.parse()?;
        }

        Ok(config)
    }

    /// Create a new configuration for the given domain and task list.
    pub fn new(domain: impl Into<String>, task_list: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            task_list: task_list.into(),
            identity: format!("swiffer-decider-{}", std::process::id()),
            poll_error_backoff_ms: 1_000,
            handler_error_policy: HandlerErrorPolicy::default(),
        }
    }

    /// Set the identity reported with each poll.
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }

    /// Set the backoff applied after a failed poll.
    pub fn with_poll_error_backoff_ms(mut self, backoff_ms: u64) -> Self {
        self.poll_error_backoff_ms = backoff_ms;
        self
    }

    /// Set the reaction to handler errors.
    pub fn with_handler_error_policy(mut self, policy: HandlerErrorPolicy) -> Self {
        self.handler_error_policy = policy;
        self
    }
}
