use std::fmt::Debug;
use std::path::Path;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Decides which discovered files a procedure acts on.
pub trait FilterStrategy: Debug {
    fn accept(&self, path: &Path) -> bool;
}

/// How pattern strings are interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PatternSyntax {
    /// Shell glob (`*.txt`).
    #[default]
    Glob,
    /// Regular expression that must match the whole file name.
    Regex,
}

/// A compiled file-name pattern.
#[derive(Debug, Clone)]
pub enum Pattern {
    Glob(glob::Pattern),
    Regex(Regex),
}

impl Pattern {
    pub fn glob(pattern: &str) -> Result<Self, ValidationError> {
        glob::Pattern::new(pattern)
            .map(Pattern::Glob)
            .map_err(|e| ValidationError::InvalidPattern {
                syntax: "glob",
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })
    }

    /// Anchored so that, like a glob, it has to match the entire name.
    pub fn regex(pattern: &str) -> Result<Self, ValidationError> {
        Regex::new(&format!("^(?:{pattern})$"))
            .map(Pattern::Regex)
            .map_err(|e| ValidationError::InvalidPattern {
                syntax: "regex",
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn parse(syntax: PatternSyntax, pattern: &str) -> Result<Self, ValidationError> {
        match syntax {
            PatternSyntax::Glob => Self::glob(pattern),
            PatternSyntax::Regex => Self::regex(pattern),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            Pattern::Glob(p) => p.matches(name),
            Pattern::Regex(r) => r.is_match(name),
        }
    }
}

/// Include/exclude filter on the file name.
///
/// Any exclude match rejects. Otherwise an empty include list accepts
/// everything, and a non-empty one requires at least one match.
#[derive(Debug, Clone, Default)]
pub struct PatternFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl PatternFilter {
    pub fn new(include: Vec<Pattern>, exclude: Vec<Pattern>) -> Self {
        Self { include, exclude }
    }

    /// Filter that accepts every file.
    pub fn accept_all() -> Self {
        Self::default()
    }

    pub fn from_strings<I, E, S>(syntax: PatternSyntax, include: I, exclude: E) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let compile = |items: Vec<S>| {
            items
                .iter()
                .map(|p| Pattern::parse(syntax, p.as_ref()))
                .collect::<Result<Vec<_>, _>>()
        };
        Ok(Self {
            include: compile(include.into_iter().collect())?,
            exclude: compile(exclude.into_iter().collect())?,
        })
    }
}

impl FilterStrategy for PatternFilter {
    fn accept(&self, path: &Path) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };
        let name = name.to_string_lossy();
        if self.exclude.iter().any(|p| p.matches(&name)) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|p| p.matches(&name))
    }
}
