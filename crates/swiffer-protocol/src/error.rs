// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Errors reported by the orchestration service.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which side of the call the service blames for a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceErrorType {
    /// The request was rejected (validation, unknown resource, throttling, ...)
    Client,
    /// The service failed internally
    Service,
    /// The failure could not be attributed (transport error, unparsable reply)
    Unknown,
}

/// An error returned by a transport call to the orchestration service.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{error_type:?} error {code}: {message}")]
#[serde(rename_all = "camelCase")]
pub struct ServiceError {
    /// Which side failed
    pub error_type: ServiceErrorType,
    /// Service error code (e.g. `ValidationException`)
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl ServiceError {
    /// A client-side rejection.
    pub fn client(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: ServiceErrorType::Client,
            code: code.into(),
            message: message.into(),
        }
    }

    /// A service-side failure.
    pub fn service(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: ServiceErrorType::Service,
            code: code.into(),
            message: message.into(),
        }
    }

    /// A failure that could not be attributed to either side.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self {
            error_type: ServiceErrorType::Unknown,
            code: "Unknown".to_string(),
            message: message.into(),
        }
    }

    /// Client-side rejections are expected conditions: the task will be
    /// redelivered once its start-to-close timeout elapses.
    pub fn is_client_error(&self) -> bool {
        self.error_type == ServiceErrorType::Client
    }
}
