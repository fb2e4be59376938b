//! Outcome and error types for the bed workflows.

use std::fmt;

use healthhub_core::CoreError;
use healthhub_storage::StorageError;
use serde::Serialize;

/// Kind of entity an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Bed,
    Allocation,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bed => write!(f, "bed"),
            Self::Allocation => write!(f, "allocation"),
        }
    }
}

/// Classification of a failed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The target row does not exist.
    NotFound,
    /// The target exists but is in the wrong state for the operation.
    InvalidState,
    /// A conditional write lost to a concurrent change.
    Conflict,
    /// The store failed for another reason.
    Store,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::InvalidState => write!(f, "invalid_state"),
            Self::Conflict => write!(f, "conflict"),
            Self::Store => write!(f, "store"),
        }
    }
}

/// Errors returned by the bed workflows and the bed directory.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: String },

    #[error("{entity} {id} is {actual}, expected {expected}")]
    InvalidState {
        entity: Entity,
        id: String,
        expected: String,
        actual: String,
    },

    #[error("{entity} {id} was changed concurrently")]
    Conflict { entity: Entity, id: String },

    #[error("Malformed {entity} record: {source}")]
    Decode {
        entity: Entity,
        #[source]
        source: CoreError,
    },

    #[error(transparent)]
    Store(#[from] StorageError),
}

impl WorkflowError {
    pub fn not_found(entity: Entity, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn invalid_state(
        entity: Entity,
        id: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::InvalidState {
            entity,
            id: id.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn conflict(entity: Entity, id: impl Into<String>) -> Self {
        Self::Conflict {
            entity,
            id: id.into(),
        }
    }

    pub fn decode(entity: Entity, source: CoreError) -> Self {
        Self::Decode { entity, source }
    }

    /// Maps a store error raised while touching `entity`/`id`.
    ///
    /// Missing rows and failed conditions become domain errors; everything
    /// else keeps the store error as its cause.
    pub fn from_store(err: StorageError, entity: Entity, id: &str) -> Self {
        match err {
            StorageError::NotFound { .. } => Self::not_found(entity, id),
            StorageError::ConditionFailed { .. } => Self::conflict(entity, id),
            other => Self::Store(other),
        }
    }

    /// Category of the underlying cause, logged as `error.category`.
    pub fn category(&self) -> String {
        match self {
            Self::NotFound { .. } => "not_found".into(),
            Self::InvalidState { .. } => "validation".into(),
            Self::Conflict { .. } => "conflict".into(),
            Self::Decode { source, .. } => source.category().to_string(),
            Self::Store(err) => err.category().to_string(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NotFound { .. } => FailureKind::NotFound,
            Self::InvalidState { .. } => FailureKind::InvalidState,
            Self::Conflict { .. } => FailureKind::Conflict,
            Self::Decode { .. } | Self::Store(_) => FailureKind::Store,
        }
    }
}

/// The two-step operation a partial failure interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Allocate,
    Discharge,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allocate => write!(f, "allocate"),
            Self::Discharge => write!(f, "discharge"),
        }
    }
}

/// The allocation write committed but the bed write did not.
///
/// Carries both ids so the bed can be reconciled. [`PartialFailure::artifact_id`]
/// names the row an operator has to look at: the created allocation for
/// `allocate`, the bed left occupied for `discharge`.
#[derive(Debug, thiserror::Error)]
#[error("{operation} partially failed ({kind}): allocation {allocation_id} written, bed {bed_id} not updated: {source}")]
pub struct PartialFailure {
    pub operation: Operation,
    pub kind: FailureKind,
    pub allocation_id: String,
    pub bed_id: String,
    #[source]
    pub source: WorkflowError,
}

impl PartialFailure {
    pub fn new(
        operation: Operation,
        allocation_id: impl Into<String>,
        bed_id: impl Into<String>,
        source: WorkflowError,
    ) -> Self {
        Self {
            operation,
            kind: source.kind(),
            allocation_id: allocation_id.into(),
            bed_id: bed_id.into(),
            source,
        }
    }

    pub fn artifact_id(&self) -> &str {
        match self.operation {
            Operation::Allocate => &self.allocation_id,
            Operation::Discharge => &self.bed_id,
        }
    }
}

/// Result of a two-step workflow.
///
/// A partial failure is a distinct state, not an error flavour: the first
/// write is durable and the store is inconsistent until reconciled.
#[derive(Debug)]
#[must_use]
pub enum WorkflowOutcome<T> {
    Success(T),
    Failed(WorkflowError),
    PartialFailure(PartialFailure),
}

/// Error form of a non-successful outcome.
#[derive(Debug, thiserror::Error)]
pub enum OutcomeError {
    #[error(transparent)]
    Failed(#[from] WorkflowError),
    #[error(transparent)]
    Partial(#[from] PartialFailure),
}

impl<T> WorkflowOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, Self::PartialFailure(_))
    }

    /// Failure kind, `None` on success.
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success(_) => None,
            Self::Failed(err) => Some(err.kind()),
            Self::PartialFailure(partial) => Some(partial.kind),
        }
    }

    pub fn success(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> WorkflowOutcome<U> {
        match self {
            Self::Success(value) => WorkflowOutcome::Success(f(value)),
            Self::Failed(err) => WorkflowOutcome::Failed(err),
            Self::PartialFailure(partial) => WorkflowOutcome::PartialFailure(partial),
        }
    }

    pub fn into_result(self) -> Result<T, OutcomeError> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failed(err) => Err(err.into()),
            Self::PartialFailure(partial) => Err(partial.into()),
        }
    }
}

impl<T> From<WorkflowError> for WorkflowOutcome<T> {
    fn from(err: WorkflowError) -> Self {
        Self::Failed(err)
    }
}
