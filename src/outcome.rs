use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Outcome of one attempted move.
///
/// `resolved` is true only when the filesystem mutation completed. `target`
/// is `None` when no destination could even be computed (e.g. the target
/// directory is missing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileAction {
    pub source: PathBuf,
    pub target: Option<PathBuf>,
    pub resolved: bool,
}

impl FileAction {
    pub fn resolved(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: Some(target.into()),
            resolved: true,
        }
    }

    pub fn unresolved(source: impl Into<PathBuf>, target: Option<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target,
            resolved: false,
        }
    }

    pub fn target(&self) -> Option<&Path> {
        self.target.as_deref()
    }
}

/// Outcome of one attempted delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDeletion {
    pub target: PathBuf,
    pub resolved: bool,
}

impl FileDeletion {
    pub fn resolved(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            resolved: true,
        }
    }

    pub fn unresolved(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            resolved: false,
        }
    }
}

/// Pipeline phase, used to report where a procedure stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Validate,
    Discover,
    Filter,
    Act,
    Resolve,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Validate => "validate",
            Phase::Discover => "discover",
            Phase::Filter => "filter",
            Phase::Act => "act",
            Phase::Resolve => "resolve",
        };
        f.write_str(name)
    }
}

/// Counters collected while a procedure runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Entries produced by discovery (directories visited, for clean).
    pub discovered: usize,
    /// Entries that passed the filter.
    pub filtered: usize,
    /// Mutations that completed, including successful retries.
    pub resolved: usize,
    /// Items left unresolved after the act phase.
    pub conflicts: usize,
    /// Items still unresolved when the procedure ended.
    pub remainder: Vec<PathBuf>,
}

/// How a procedure terminated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Outcome {
    /// Discovery or filtering produced nothing; later phases did not run.
    Cancelled { phase: Phase },
    /// Every phase ran. `summary.remainder` may still hold unresolved items.
    Completed { summary: Summary },
    /// Validation passed; execution was not requested.
    Validated,
}

impl Outcome {
    pub fn completed(summary: Summary) -> Self {
        Outcome::Completed { summary }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled { .. })
    }

    /// Completed with zero conflicts.
    pub fn is_clean(&self) -> bool {
        matches!(self, Outcome::Completed { summary } if summary.conflicts == 0)
    }

    pub fn remainder(&self) -> &[PathBuf] {
        match self {
            Outcome::Completed { summary } => &summary.remainder,
            _ => &[],
        }
    }

    pub fn summary(&self) -> Option<&Summary> {
        match self {
            Outcome::Completed { summary } => Some(summary),
            _ => None,
        }
    }
}
