// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Pluggable duration transformation.
//!
//! Every duration a handler hands to the decision builder (timer delays,
//! activity timeouts, retry delays) passes through a [`DurationTransformer`]
//! before it is encoded. Tests use this to compress hours into seconds.

use std::time::Duration;

/// Maps a requested duration to the one actually sent to the service.
pub trait DurationTransformer: Send + Sync {
    fn transform(&self, duration: Duration) -> Duration;
}

impl<F> DurationTransformer for F
where
    F: Fn(Duration) -> Duration + Send + Sync,
{
    fn transform(&self, duration: Duration) -> Duration {
        self(duration)
    }
}

/// Leaves durations untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransformer;

impl DurationTransformer for IdentityTransformer {
    fn transform(&self, duration: Duration) -> Duration {
        duration
    }
}

/// Divides every duration by a fixed factor.
#[derive(Debug, Clone, Copy)]
pub struct ScaledTransformer {
    divisor: u32,
}

impl ScaledTransformer {
    /// A divisor of zero is treated as one.
    pub fn new(divisor: u32) -> Self {
        Self {
            divisor: divisor.max(1),
        }
    }
}

impl DurationTransformer for ScaledTransformer {
    fn transform(&self, duration: Duration) -> Duration {
        duration / self.divisor
    }
}
