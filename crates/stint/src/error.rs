//! Error types for stint operations.
//!
//! Every engine operation returns exactly one [`Error`]. The variants map onto
//! the caller-visible taxonomy: not found, permission denied, validation,
//! conflict, and internal (storage) failures. Storage failures are wrapped
//! with the operation that hit them but never change kind on the way up.

use crate::domain::{IssueId, ProjectId, Role, UserId};
use std::io;
use thiserror::Error;

/// The error type for stint operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested issue does not exist.
    #[error("Issue not found: {0}")]
    IssueNotFound(IssueId),

    /// The requested project does not exist.
    #[error("Project not found: {0}")]
    ProjectNotFound(ProjectId),

    /// The caller's role on the project is below the required minimum.
    #[error("Permission denied: {user} needs at least {required} on project {project}")]
    PermissionDenied {
        /// Caller that was rejected.
        user: UserId,
        /// Project the check ran against.
        project: ProjectId,
        /// Minimum role the operation requires.
        required: Role,
    },

    /// The request breaks a structural or settings rule.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The issue is in a state that blocks the operation.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage-layer failure, with the operation that hit it.
    #[error("Storage error while {context}: {source}")]
    Storage {
        /// What the engine was doing.
        context: String,
        /// The underlying failure.
        #[source]
        source: StorageError,
    },

    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns `true` for the not-found family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::IssueNotFound(_) | Self::ProjectNotFound(_))
    }
}

/// Structural and settings rules that a request can break.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// An issue was asked to become its own parent.
    #[error("an issue cannot be its own parent")]
    SelfParent,

    /// Parent and child live in different projects.
    #[error("cross-project parent is not allowed")]
    CrossProjectParent,

    /// The issue already hangs under the requested parent.
    #[error("nothing has changed")]
    Unchanged,

    /// The project requires a description on root issues.
    #[error("description required")]
    DescriptionRequired,

    /// No project reference was supplied.
    #[error("project reference cannot be empty")]
    EmptyProjectReference,

    /// Title is empty after trimming.
    #[error("title cannot be empty")]
    EmptyTitle,

    /// Assignment method string that names no known policy.
    #[error("unknown assignment method: {0}")]
    UnknownAssignmentMethod(String),

    /// Any other enum value that could not be parsed.
    #[error("invalid {field}: '{value}'")]
    InvalidValue {
        /// Field being parsed.
        field: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Failures raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// `SQLite` operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored row could not be decoded.
    #[error("corrupt row in {table}: {reason}")]
    CorruptRow {
        /// Table the row came from.
        table: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// A snapshot could not be encoded or decoded.
    #[error("snapshot encoding failed: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// A write targeted a row that does not exist.
    #[error("no row in {table} with id {id}")]
    MissingRow {
        /// Table that was written.
        table: &'static str,
        /// Identifier that matched nothing.
        id: String,
    },

    /// Failure injected by a test.
    #[error("injected failure: {0}")]
    Injected(&'static str),
}

/// Wrap storage failures with the operation that produced them.
pub(crate) trait StorageContext<T> {
    /// Attach `context` to a storage failure.
    fn context(self, context: &str) -> Result<T>;
}

impl<T, E: Into<StorageError>> StorageContext<T> for std::result::Result<T, E> {
    fn context(self, context: &str) -> Result<T> {
        self.map_err(|source| Error::Storage {
            context: context.to_string(),
            source: source.into(),
        })
    }
}

/// A specialized Result type for stint operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_context_keeps_the_source() {
        let failed: std::result::Result<(), StorageError> =
            Err(StorageError::Injected("activity insert"));
        let err = failed.context("recording activity").unwrap_err();

        assert!(matches!(err, Error::Storage { .. }));
        assert_eq!(
            err.to_string(),
            "Storage error while recording activity: injected failure: activity insert"
        );
    }

    #[test]
    fn validation_errors_convert() {
        let err: Error = ValidationError::SelfParent.into();
        assert!(matches!(err, Error::Validation(ValidationError::SelfParent)));
        assert!(!err.is_not_found());
    }
}
