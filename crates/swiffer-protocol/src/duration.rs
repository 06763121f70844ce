// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Wire encoding of durations.
//!
//! Timeouts travel as strings holding whole seconds. The literal `"NONE"`
//! means "no timeout".

use std::time::Duration;

use thiserror::Error;

/// Sentinel meaning "no timeout".
pub const NONE: &str = "NONE";

/// A duration string that is neither whole seconds nor `"NONE"`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid wire duration '{0}'")]
pub struct WireDurationError(pub String);

/// Encode a duration as whole seconds. Sub-second precision is truncated.
pub fn encode_seconds(duration: Duration) -> String {
    duration.as_secs().to_string()
}

/// Encode an optional timeout, `None` becoming the `"NONE"` sentinel.
pub fn encode_timeout(duration: Option<Duration>) -> String {
    match duration {
        Some(d) => encode_seconds(d),
        None => NONE.to_string(),
    }
}

/// Parse a wire timeout back into a duration.
pub fn parse_timeout(value: &str) -> Result<Option<Duration>, WireDurationError> {
    if value == NONE {
        return Ok(None);
    }
    value
        .parse::<u64>()
        .map(|secs| Some(Duration::from_secs(secs)))
        .map_err(|_| WireDurationError(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_truncates_to_seconds() {
        assert_eq!(encode_seconds(Duration::from_millis(1_999)), "1");
        assert_eq!(encode_seconds(Duration::ZERO), "0");
        assert_eq!(encode_seconds(Duration::from_secs(3_600)), "3600");
    }

    #[test]
    fn test_encode_timeout_none() {
        assert_eq!(encode_timeout(None), "NONE");
        assert_eq!(encode_timeout(Some(Duration::from_secs(30))), "30");
    }

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout("NONE"), Ok(None));
        assert_eq!(parse_timeout("45"), Ok(Some(Duration::from_secs(45))));
        assert!(parse_timeout("4.5").is_err());
        assert!(parse_timeout("").is_err());
    }
}
