use std::path::PathBuf;
use thiserror::Error;

use crate::model::ProcedureType;

/// Failure enumerating a source tree. Fatal to the procedure.
#[derive(Debug, Error)]
pub enum DiscoverError {
    #[error("cannot list {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot walk {path}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// A procedure is missing something its kind requires, or a precondition failed.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{kind} procedure is missing required field `{field}`")]
    MissingField {
        kind: ProcedureType,
        field: &'static str,
    },
    #[error("source path does not exist: {0}")]
    SourceMissing(PathBuf),
    #[error("target directory does not exist: {0}")]
    TargetMissing(PathBuf),
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("source and target resolve to the same directory: {0}")]
    SameLocation(PathBuf),
    #[error("invalid {syntax} pattern '{pattern}': {reason}")]
    InvalidPattern {
        syntax: &'static str,
        pattern: String,
        reason: String,
    },
    #[error("{0} is not supported")]
    Unsupported(&'static str),
}

/// Failure while a procedure's pipeline was running.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Discover(#[from] DiscoverError),
    #[error("cannot clean {path}")]
    Clean {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Anything a handler can fail with.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// The single error type surfaced by [`crate::dispatch::Dispatcher::dispatch`].
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no handler registered for {0} procedures")]
    Unmapped(ProcedureType),
    #[error("error executing procedure: {name}")]
    Failed {
        name: String,
        #[source]
        source: HandlerError,
    },
}

impl DispatchError {
    /// True when the procedure was rejected before any filesystem mutation.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DispatchError::Unmapped(_)
                | DispatchError::Failed {
                    source: HandlerError::Validation(_),
                    ..
                }
        )
    }
}
