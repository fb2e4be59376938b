//! Mapping of PostgREST failures onto `StorageError`.

use healthhub_storage::StorageError;
use serde::Deserialize;

/// PostgREST code for "the result contains 0 rows" on a singular read.
pub const PGRST_NO_ROWS: &str = "PGRST116";

/// PostgreSQL unique violation.
pub const PG_UNIQUE_VIOLATION: &str = "23505";

/// Error body returned by PostgREST.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl ApiErrorBody {
    /// Parses an error body, keeping the raw text as message when it is not JSON.
    pub fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_else(|_| Self {
            message: (!body.trim().is_empty()).then(|| body.trim().to_string()),
            ..Self::default()
        })
    }

    fn describe(&self) -> String {
        let mut message = self
            .message
            .clone()
            .unwrap_or_else(|| "An error occurred".to_string());
        if let Some(details) = self.details.as_deref().filter(|d| !d.is_empty()) {
            message.push_str(&format!(" ({details})"));
        }
        if let Some(hint) = self.hint.as_deref().filter(|h| !h.is_empty()) {
            message.push_str(&format!("; hint: {hint}"));
        }
        message
    }
}

/// Maps a non-success response onto a storage error.
///
/// `id` is the row the call targeted, when there was one.
pub fn from_response(status: u16, body: &str, table: &str, id: Option<&str>) -> StorageError {
    let parsed = ApiErrorBody::parse(body);
    match parsed.code.as_deref() {
        Some(PGRST_NO_ROWS) => StorageError::not_found(table, id.unwrap_or_default()),
        Some(PG_UNIQUE_VIOLATION) => {
            StorageError::already_exists(table, id.unwrap_or_default())
        }
        _ => StorageError::remote(status, parsed.code.clone(), parsed.describe()),
    }
}

/// Maps a transport-level reqwest failure onto a storage error.
pub fn from_transport(err: &reqwest::Error) -> StorageError {
    if err.is_timeout() {
        StorageError::timeout(err.to_string())
    } else if err.is_connect() || err.is_request() {
        StorageError::connection(err.to_string())
    } else if err.is_decode() || err.is_body() {
        StorageError::internal(format!("Failed to read response: {err}"))
    } else {
        StorageError::connection(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_rows_maps_to_not_found() {
        let body = r#"{"code":"PGRST116","message":"JSON object requested, multiple (or no) rows returned","details":"The result contains 0 rows","hint":null}"#;
        let err = from_response(406, body, "beds", Some("b1"));
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Record not found: beds/b1");
    }

    #[test]
    fn test_unique_violation_maps_to_already_exists() {
        let body = r#"{"code":"23505","message":"duplicate key value violates unique constraint \"beds_bed_number_key\"","details":"Key (bed_number)=(A-1) already exists.","hint":null}"#;
        let err = from_response(409, body, "beds", None);
        assert!(err.is_already_exists());
    }

    #[test]
    fn test_other_codes_are_remote() {
        let body = r#"{"code":"22P02","message":"invalid input value for enum bed_status: \"cleaning\"","details":null,"hint":null}"#;
        match from_response(400, body, "beds", Some("b1")) {
            StorageError::Remote {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 400);
                assert_eq!(code.as_deref(), Some("22P02"));
                assert!(message.contains("bed_status"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_plain_text_body() {
        match from_response(502, "Bad Gateway", "beds", None) {
            StorageError::Remote { code, message, .. } => {
                assert_eq!(code, None);
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = from_response(500, "", "beds", None);
        assert_eq!(err.to_string(), "Remote error (HTTP 500): An error occurred");
    }
}
