// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! JSON payload coding.
//!
//! Inputs, results, details and control strings are JSON documents. An
//! absent payload reads as JSON `null`, so handlers can decode it into
//! `Option<T>` or `()`. A value that serializes to `null` is sent as an
//! absent payload.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::DecodeError;

/// Serialize a value into an optional wire payload.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Option<String>, serde_json::Error> {
    let json = serde_json::to_value(value)?;
    if json.is_null() {
        return Ok(None);
    }
    serde_json::to_string(&json).map(Some)
}

/// Deserialize an optional wire payload.
pub fn decode<T: DeserializeOwned>(
    payload: Option<&str>,
    what: impl FnOnce() -> String,
) -> Result<T, DecodeError> {
    let result = match payload {
        Some(raw) => serde_json::from_str(raw),
        None => serde_json::from_value(serde_json::Value::Null),
    };
    result.map_err(|source| DecodeError::new(what(), source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Order {
        id: u32,
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode("x").unwrap().as_deref(), Some("\"x\""));
        assert_eq!(encode(&42).unwrap().as_deref(), Some("42"));
        assert_eq!(encode(&Order { id: 1 }).unwrap().as_deref(), Some("{\"id\":1}"));
        assert_eq!(encode(&()).unwrap(), None);
        assert_eq!(encode(&None::<u32>).unwrap(), None);
    }

    #[test]
    fn test_decode_present() {
        let order: Order = decode(Some("{\"id\":7}"), || "order".to_string()).unwrap();
        assert_eq!(order, Order { id: 7 });
    }

    #[test]
    fn test_decode_absent_reads_as_null() {
        let value: Option<Order> = decode(None, || "order".to_string()).unwrap();
        assert!(value.is_none());
        let err = decode::<Order>(None, || "order".to_string()).unwrap_err();
        assert_eq!(err.what, "order");
    }

    #[test]
    fn test_decode_malformed() {
        let err = decode::<u32>(Some("not json"), || "count".to_string()).unwrap_err();
        assert!(err.to_string().contains("count"));
    }
}
