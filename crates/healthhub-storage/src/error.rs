//! Storage error types for the record store abstraction.

use std::fmt;

/// Errors that can occur during record store operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested record was not found.
    #[error("Record not found: {table}/{id}")]
    NotFound {
        /// The table that was queried.
        table: String,
        /// The ID of the record that was not found.
        id: String,
    },

    /// A conditional update found the row but its current values did not match.
    #[error("Condition failed for {table}/{id}")]
    ConditionFailed {
        /// The table that was updated.
        table: String,
        /// The ID of the row whose condition did not hold.
        id: String,
    },

    /// Attempted to insert a record whose ID is already taken.
    #[error("Record already exists: {table}/{id}")]
    AlreadyExists {
        /// The table of the existing record.
        table: String,
        /// The ID of the existing record.
        id: String,
    },

    /// The record or filter is malformed.
    #[error("Invalid record: {message}")]
    InvalidRecord {
        /// Description of why the record is invalid.
        message: String,
    },

    /// Failed to reach the storage backend.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// The backend did not answer in time.
    #[error("Timeout: {message}")]
    Timeout {
        /// Description of the timed out call.
        message: String,
    },

    /// The backend answered with an error.
    #[error("Remote error (HTTP {status}{}): {message}", .code.as_deref().map(|c| format!(", code {c}")).unwrap_or_default())]
    Remote {
        /// HTTP status of the response.
        status: u16,
        /// Backend error code, when the body carried one.
        code: Option<String>,
        /// Backend error message.
        message: String,
    },

    /// An internal storage error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(table: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            table: table.into(),
            id: id.into(),
        }
    }

    /// Creates a new `ConditionFailed` error.
    #[must_use]
    pub fn condition_failed(table: impl Into<String>, id: impl Into<String>) -> Self {
        Self::ConditionFailed {
            table: table.into(),
            id: id.into(),
        }
    }

    /// Creates a new `AlreadyExists` error.
    #[must_use]
    pub fn already_exists(table: impl Into<String>, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            table: table.into(),
            id: id.into(),
        }
    }

    /// Creates a new `InvalidRecord` error.
    #[must_use]
    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            message: message.into(),
        }
    }

    /// Creates a new `Connection` error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a new `Timeout` error.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Creates a new `Remote` error.
    #[must_use]
    pub fn remote(status: u16, code: Option<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            code,
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if a conditional update lost to a concurrent change.
    #[must_use]
    pub fn is_condition_failed(&self) -> bool {
        matches!(self, Self::ConditionFailed { .. })
    }

    /// Returns `true` if this is an already exists error.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Returns `true` for transport failures where the write may or may not
    /// have been applied remotely.
    #[must_use]
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Connection { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::ConditionFailed { .. } | Self::AlreadyExists { .. } => ErrorCategory::Conflict,
            Self::InvalidRecord { .. } => ErrorCategory::Validation,
            Self::Connection { .. } | Self::Timeout { .. } => ErrorCategory::Infrastructure,
            Self::Remote { status, .. } if *status < 500 => ErrorCategory::Validation,
            Self::Remote { .. } => ErrorCategory::Infrastructure,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Logs this error with the backend, operation and table as fields.
    pub fn trace(&self, backend: &'static str, operation: &'static str, table: &str) {
        tracing::error!(
            backend,
            operation,
            table,
            error.category = %self.category(),
            error = %self,
            "record store call failed"
        );
    }
}

/// Categories of storage errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Record not found.
    NotFound,
    /// Conflict (failed condition or existing id).
    Conflict,
    /// Validation error.
    Validation,
    /// Infrastructure/connection error.
    Infrastructure,
    /// Internal error.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
