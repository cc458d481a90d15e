//! Error taxonomy for the convergence engine
//!
//! Every failure carries a [`FailureCategory`] so the exit code mapper can
//! translate it into the process exit code the orchestrator consumes.

use thiserror::Error;

use crate::schema::Operation;

/// Broad classification of a failure, used by the exit code mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCategory {
    /// Uncategorized failure, including connectivity loss
    Generic,
    /// Payload failed parse or schema validation
    MalformedInput,
    /// Well-formed but semantically invalid value (e.g. an unresolved enumerator)
    InvalidArgument,
    /// Backend authorization rejection
    PermissionDenied,
    /// Backend precondition violated (e.g. deleting a protected built-in unit)
    InvalidOperation,
}

/// Errors raised by resource backends.
///
/// `NotFound` is special: the engine absorbs it in Get (converted to an
/// absent instance) and Delete (idempotent success). Every other variant
/// propagates to the exit code mapper.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The unit named by the filter does not exist
    #[error("unit '{0}' not found")]
    NotFound(String),

    /// The backend rejected the caller's authorization
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The backend refused the operation (precondition violated)
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// A well-formed value the backend cannot resolve
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Any other backend failure (I/O, connectivity, corruption)
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl ResourceError {
    /// Classify this error for exit code mapping
    pub fn category(&self) -> FailureCategory {
        match self {
            Self::NotFound(_) | Self::Backend(_) => FailureCategory::Generic,
            Self::PermissionDenied(_) => FailureCategory::PermissionDenied,
            Self::InvalidOperation(_) => FailureCategory::InvalidOperation,
            Self::InvalidArgument(_) => FailureCategory::InvalidArgument,
        }
    }
}

/// Errors raised by the engine itself
#[derive(Debug, Error)]
pub enum EngineError {
    /// Payload failed JSON parse or schema validation
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Well-formed payload carrying a semantically invalid value
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The resource type does not advertise this operation
    #[error("resource '{resource}' does not support {operation}")]
    UnsupportedOperation {
        resource: String,
        operation: Operation,
    },

    /// A backend failure that was not absorbed by the operation contract
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Engine-internal fault (e.g. an invalid pattern in a schema declaration)
    #[error("internal: {0}")]
    Internal(String),
}

impl EngineError {
    /// Classify this error for exit code mapping
    pub fn category(&self) -> FailureCategory {
        match self {
            Self::MalformedInput(_) => FailureCategory::MalformedInput,
            Self::InvalidArgument(_) => FailureCategory::InvalidArgument,
            Self::UnsupportedOperation { .. } => FailureCategory::InvalidOperation,
            Self::Resource(err) => err.category(),
            Self::Internal(_) => FailureCategory::Generic,
        }
    }
}
