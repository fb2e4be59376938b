//! Conversion between typed domain values and raw store records.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{CoreError, Result};

/// Decodes a store record into a domain type.
pub fn decode_record<T: DeserializeOwned>(record: Value) -> Result<T> {
    serde_json::from_value(record).map_err(CoreError::from)
}

/// Encodes a domain value as a JSON object suitable for insert or patch.
pub fn encode_record<T: Serialize>(value: &T) -> Result<Value> {
    let encoded = serde_json::to_value(value)?;
    if !encoded.is_object() {
        return Err(CoreError::invalid_record("record must encode to a JSON object"));
    }
    Ok(encoded)
}
