use thiserror::Error;

/// Core error types for HealthHub domain values
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid ID: {0}")]
    InvalidId(String),

    #[error("Invalid timestamp: {0}")]
    InvalidDateTime(String),

    #[error("Invalid {kind} status: {value}")]
    InvalidStatus { kind: &'static str, value: String },

    #[error("Invalid record: {message}")]
    InvalidRecord { message: String },

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CoreError {
    pub fn invalid_id(id: impl Into<String>) -> Self {
        Self::InvalidId(id.into())
    }

    pub fn invalid_date_time(datetime: impl Into<String>) -> Self {
        Self::InvalidDateTime(datetime.into())
    }

    /// `kind` names the entity whose status failed to parse.
    pub fn invalid_status(kind: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidStatus {
            kind,
            value: value.into(),
        }
    }

    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            message: message.into(),
        }
    }

    /// Coarse classification of the error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidId(_) | Self::InvalidDateTime(_) | Self::InvalidStatus { .. } => {
                ErrorCategory::Validation
            }
            Self::InvalidRecord { .. } => ErrorCategory::Validation,
            Self::JsonError(_) => ErrorCategory::Serialization,
        }
    }
}

/// Classification of core errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Serialization,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Serialization => write!(f, "serialization"),
        }
    }
}

/// Result alias for core conversions.
pub type Result<T> = std::result::Result<T, CoreError>;
