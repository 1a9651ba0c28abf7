//! Column encodings shared by the repositories
//!
//! Timestamps are stored as RFC 3339 text with microsecond precision and JSON
//! values as serialized text, so the same schema works on every backend the
//! `Any` driver supports.

use crate::persistence::error::PersistenceError;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{de::DeserializeOwned, Serialize};

/// Current time at the precision the database keeps
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, PersistenceError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| {
            PersistenceError::Serialization(format!("Invalid timestamp in {}: {}", column, e))
        })
}

/// Serialize an optional value into a JSON text column
pub fn encode_json<T: Serialize>(value: Option<&T>) -> Result<Option<String>, PersistenceError> {
    value
        .map(|v| serde_json::to_string(v))
        .transpose()
        .map_err(PersistenceError::from)
}

/// Parse an optional JSON text column
pub fn decode_json<T: DeserializeOwned>(
    raw: Option<String>,
) -> Result<Option<T>, PersistenceError> {
    raw.as_deref()
        .map(|s| serde_json::from_str::<T>(s))
        .transpose()
        .map_err(PersistenceError::from)
}
