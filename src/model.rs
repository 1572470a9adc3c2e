use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::conflict::{ConflictStrategy, RenameConflict, SkipConflict};
use crate::delete::{DeleteStrategy, HardDelete, SoftDelete};
use crate::discover::{DiscoverStrategy, FlatDiscover, RecursiveDiscover};
use crate::error::ValidationError;
use crate::filter::{FilterStrategy, PatternFilter, PatternSyntax};
use crate::placement::{FlatMove, MoveStrategy, StructuralMove};

/// Kind of work a procedure performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProcedureType {
    Move,
    Delete,
    Clean,
    Copy,
    Zip,
    Unzip,
    Rename,
}

impl fmt::Display for ProcedureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcedureType::Move => "move",
            ProcedureType::Delete => "delete",
            ProcedureType::Clean => "clean",
            ProcedureType::Copy => "copy",
            ProcedureType::Zip => "zip",
            ProcedureType::Unzip => "unzip",
            ProcedureType::Rename => "rename",
        };
        f.write_str(name)
    }
}

/// One declared unit of bulk file work.
#[derive(Debug, Clone)]
pub struct Procedure {
    /// Caller-assigned; uniqueness is not enforced.
    pub id: String,
    /// Display label used in every event message.
    pub name: String,
    pub kind: ProcedureKind,
}

impl Procedure {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: impl Into<ProcedureKind>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: kind.into(),
        }
    }

    pub fn procedure_type(&self) -> ProcedureType {
        self.kind.procedure_type()
    }
}

/// Kind-specific payload of a [`Procedure`].
#[derive(Debug, Clone)]
pub enum ProcedureKind {
    Move(MoveProcedure),
    Delete(DeleteProcedure),
    Clean(CleanProcedure),
    // Reserved kinds: accepted in configuration, no handler ships for them.
    Copy,
    Zip,
    Unzip,
    Rename,
}

impl ProcedureKind {
    pub fn procedure_type(&self) -> ProcedureType {
        match self {
            ProcedureKind::Move(_) => ProcedureType::Move,
            ProcedureKind::Delete(_) => ProcedureType::Delete,
            ProcedureKind::Clean(_) => ProcedureType::Clean,
            ProcedureKind::Copy => ProcedureType::Copy,
            ProcedureKind::Zip => ProcedureType::Zip,
            ProcedureKind::Unzip => ProcedureType::Unzip,
            ProcedureKind::Rename => ProcedureType::Rename,
        }
    }
}

impl From<MoveProcedure> for ProcedureKind {
    fn from(p: MoveProcedure) -> Self {
        ProcedureKind::Move(p)
    }
}

impl From<DeleteProcedure> for ProcedureKind {
    fn from(p: DeleteProcedure) -> Self {
        ProcedureKind::Delete(p)
    }
}

impl From<CleanProcedure> for ProcedureKind {
    fn from(p: CleanProcedure) -> Self {
        ProcedureKind::Clean(p)
    }
}

/// Move every accepted file from `source_path` into `target_directory`.
#[derive(Debug, Clone)]
pub struct MoveProcedure {
    source_path: PathBuf,
    target_directory: PathBuf,
    discover: Arc<dyn DiscoverStrategy>,
    filter: Arc<dyn FilterStrategy>,
    placement: Arc<dyn MoveStrategy>,
    conflict: Arc<dyn ConflictStrategy>,
}

impl MoveProcedure {
    pub fn builder() -> MoveProcedureBuilder {
        MoveProcedureBuilder::default()
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn target_directory(&self) -> &Path {
        &self.target_directory
    }

    pub fn discover(&self) -> &dyn DiscoverStrategy {
        self.discover.as_ref()
    }

    pub fn filter(&self) -> &dyn FilterStrategy {
        self.filter.as_ref()
    }

    pub fn placement(&self) -> &dyn MoveStrategy {
        self.placement.as_ref()
    }

    pub fn conflict(&self) -> &dyn ConflictStrategy {
        self.conflict.as_ref()
    }
}

#[derive(Debug, Default)]
pub struct MoveProcedureBuilder {
    source_path: Option<PathBuf>,
    target_directory: Option<PathBuf>,
    discover: Option<Arc<dyn DiscoverStrategy>>,
    filter: Option<Arc<dyn FilterStrategy>>,
    placement: Option<Arc<dyn MoveStrategy>>,
    conflict: Option<Arc<dyn ConflictStrategy>>,
}

impl MoveProcedureBuilder {
    pub fn source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    pub fn target_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.target_directory = Some(path.into());
        self
    }

    pub fn discover(mut self, strategy: impl DiscoverStrategy + 'static) -> Self {
        self.discover = Some(Arc::new(strategy));
        self
    }

    pub fn filter(mut self, strategy: impl FilterStrategy + 'static) -> Self {
        self.filter = Some(Arc::new(strategy));
        self
    }

    pub fn placement(mut self, strategy: impl MoveStrategy + 'static) -> Self {
        self.placement = Some(Arc::new(strategy));
        self
    }

    pub fn conflict(mut self, strategy: impl ConflictStrategy + 'static) -> Self {
        self.conflict = Some(Arc::new(strategy));
        self
    }

    pub fn build(self) -> Result<MoveProcedure, ValidationError> {
        let missing = |field| ValidationError::MissingField {
            kind: ProcedureType::Move,
            field,
        };
        Ok(MoveProcedure {
            source_path: self.source_path.ok_or_else(|| missing("source_path"))?,
            target_directory: self.target_directory.ok_or_else(|| missing("target_directory"))?,
            discover: self.discover.ok_or_else(|| missing("discover"))?,
            filter: self.filter.ok_or_else(|| missing("filter"))?,
            placement: self.placement.ok_or_else(|| missing("placement"))?,
            conflict: self.conflict.ok_or_else(|| missing("conflict"))?,
        })
    }
}

/// Delete every accepted file below `source_path`.
#[derive(Debug, Clone)]
pub struct DeleteProcedure {
    source_path: PathBuf,
    discover: Arc<dyn DiscoverStrategy>,
    filter: Arc<dyn FilterStrategy>,
    delete: Arc<dyn DeleteStrategy>,
}

impl DeleteProcedure {
    pub fn builder() -> DeleteProcedureBuilder {
        DeleteProcedureBuilder::default()
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn discover(&self) -> &dyn DiscoverStrategy {
        self.discover.as_ref()
    }

    pub fn filter(&self) -> &dyn FilterStrategy {
        self.filter.as_ref()
    }

    pub fn delete(&self) -> &dyn DeleteStrategy {
        self.delete.as_ref()
    }
}

#[derive(Debug, Default)]
pub struct DeleteProcedureBuilder {
    source_path: Option<PathBuf>,
    discover: Option<Arc<dyn DiscoverStrategy>>,
    filter: Option<Arc<dyn FilterStrategy>>,
    delete: Option<Arc<dyn DeleteStrategy>>,
}

impl DeleteProcedureBuilder {
    pub fn source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    pub fn discover(mut self, strategy: impl DiscoverStrategy + 'static) -> Self {
        self.discover = Some(Arc::new(strategy));
        self
    }

    pub fn filter(mut self, strategy: impl FilterStrategy + 'static) -> Self {
        self.filter = Some(Arc::new(strategy));
        self
    }

    pub fn delete(mut self, strategy: impl DeleteStrategy + 'static) -> Self {
        self.delete = Some(Arc::new(strategy));
        self
    }

    pub fn build(self) -> Result<DeleteProcedure, ValidationError> {
        let missing = |field| ValidationError::MissingField {
            kind: ProcedureType::Delete,
            field,
        };
        Ok(DeleteProcedure {
            source_path: self.source_path.ok_or_else(|| missing("source_path"))?,
            discover: self.discover.ok_or_else(|| missing("discover"))?,
            filter: self.filter.ok_or_else(|| missing("filter"))?,
            delete: self.delete.ok_or_else(|| missing("delete"))?,
        })
    }
}

/// Remove directories below (and including) `source_path` that hold no files.
#[derive(Debug, Clone)]
pub struct CleanProcedure {
    source_path: PathBuf,
}

impl CleanProcedure {
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
        }
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }
}

// ---------------------------------------------------------------------------
// Configuration document
// ---------------------------------------------------------------------------

/// Root configuration document.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Configuration {
    /// Descriptive metadata; not interpreted.
    #[serde(default)]
    pub meta: Meta,
    /// Run-wide options.
    #[serde(default)]
    pub options: Options,
    /// Procedures, dispatched in order.
    pub procedures: Vec<ProcedureConfig>,
}

impl Configuration {
    /// Convert every declared procedure, failing on the first invalid one.
    pub fn procedures(&self) -> Result<Vec<Procedure>, ValidationError> {
        self.procedures.iter().cloned().map(Procedure::try_from).collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Meta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Options {
    /// Stop dispatching further procedures after the first failure.
    #[serde(default)]
    pub stop_on_error: bool,
}

/// A procedure as written in the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProcedureConfig {
    /// Defaults to a random UUID.
    #[serde(default = "new_id")]
    pub id: String,
    /// Defaults to the id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub settings: ProcedureSettings,
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn default_true() -> bool {
    true
}

/// Kind-specific part of a configured procedure.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProcedureSettings {
    Move {
        source: PathBuf,
        target: PathBuf,
        discover: DiscoverKind,
        #[serde(default)]
        filter: FilterConfig,
        placement: PlacementKind,
        conflict: ConflictKind,
        /// Restore timestamps, permissions and ownership after each move.
        #[serde(default = "default_true")]
        preserve_attributes: bool,
    },
    Delete {
        source: PathBuf,
        discover: DiscoverKind,
        #[serde(default)]
        filter: FilterConfig,
        delete: DeleteKind,
        /// Trash directory for soft deletes; the user's trash when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        trash_dir: Option<PathBuf>,
    },
    Clean {
        source: PathBuf,
    },
    Copy,
    Zip,
    Unzip,
    Rename,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DiscoverKind {
    /// Direct children only.
    Flat,
    /// Whole subtree.
    Recursive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PlacementKind {
    /// `target/<file name>`.
    Flat,
    /// `target/<path relative to source>`.
    Structural,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConflictKind {
    /// Retry under a timestamped name.
    Rename,
    /// Leave the conflict unresolved.
    Skip,
    /// Reserved; rejected when procedures are built.
    Overwrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeleteKind {
    /// Unlink immediately.
    Hard,
    /// Move to the trash.
    Soft,
}

/// File-name patterns. Empty `include` means every non-excluded file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct FilterConfig {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub syntax: PatternSyntax,
}

impl FilterConfig {
    fn build(&self) -> Result<PatternFilter, ValidationError> {
        PatternFilter::from_strings(self.syntax, &self.include, &self.exclude)
    }
}

fn discover_strategy(kind: DiscoverKind) -> Arc<dyn DiscoverStrategy> {
    match kind {
        DiscoverKind::Flat => Arc::new(FlatDiscover),
        DiscoverKind::Recursive => Arc::new(RecursiveDiscover),
    }
}

impl TryFrom<ProcedureConfig> for Procedure {
    type Error = ValidationError;

    fn try_from(config: ProcedureConfig) -> Result<Self, Self::Error> {
        let kind = match config.settings {
            ProcedureSettings::Move {
                source,
                target,
                discover,
                filter,
                placement,
                conflict,
                preserve_attributes,
            } => {
                let placement: Arc<dyn MoveStrategy> = match placement {
                    PlacementKind::Flat => Arc::new(FlatMove { preserve_attributes }),
                    PlacementKind::Structural => {
                        Arc::new(StructuralMove::new(&source).preserving_attributes(preserve_attributes))
                    }
                };
                let conflict: Arc<dyn ConflictStrategy> = match conflict {
                    ConflictKind::Rename => Arc::new(RenameConflict),
                    ConflictKind::Skip => Arc::new(SkipConflict),
                    ConflictKind::Overwrite => {
                        return Err(ValidationError::Unsupported("the overwrite conflict strategy"));
                    }
                };
                ProcedureKind::Move(MoveProcedure {
                    filter: Arc::new(filter.build()?),
                    discover: discover_strategy(discover),
                    source_path: source,
                    target_directory: target,
                    placement,
                    conflict,
                })
            }
            ProcedureSettings::Delete {
                source,
                discover,
                filter,
                delete,
                trash_dir,
            } => {
                let delete: Arc<dyn DeleteStrategy> = match (delete, trash_dir) {
                    (DeleteKind::Hard, _) => Arc::new(HardDelete),
                    (DeleteKind::Soft, Some(dir)) => Arc::new(SoftDelete::with_trash_dir(dir)),
                    (DeleteKind::Soft, None) => Arc::new(SoftDelete::new()),
                };
                ProcedureKind::Delete(DeleteProcedure {
                    filter: Arc::new(filter.build()?),
                    discover: discover_strategy(discover),
                    source_path: source,
                    delete,
                })
            }
            ProcedureSettings::Clean { source } => ProcedureKind::Clean(CleanProcedure::new(source)),
            ProcedureSettings::Copy => ProcedureKind::Copy,
            ProcedureSettings::Zip => ProcedureKind::Zip,
            ProcedureSettings::Unzip => ProcedureKind::Unzip,
            ProcedureSettings::Rename => ProcedureKind::Rename,
        };
        let name = config.name.unwrap_or_else(|| config.id.clone());
        Ok(Procedure::new(config.id, name, kind))
    }
}

/// Generate JSON Schema for the Configuration type.
pub fn generate_schema() -> String {
    let schema = schemars::schema_for!(Configuration);
    serde_json::to_string_pretty(&schema).expect("failed to serialize schema")
}

/// Load a Configuration from a JSON file.
pub fn load_configuration(path: &Path) -> Result<Configuration> {
    let file = std::fs::File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let reader = std::io::BufReader::new(file);
    let config = serde_json::from_reader(reader).with_context(|| format!("invalid configuration {}", path.display()))?;
    Ok(config)
}

/// Create a Configuration from a JSON string.
pub fn from_json(json: &str) -> Result<Configuration> {
    let config = serde_json::from_str(json)?;
    Ok(config)
}

/// Write a Configuration as pretty-printed JSON.
pub fn save_configuration(path: &Path, config: &Configuration) -> Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json).with_context(|| format!("cannot write {}", path.display()))?;
    Ok(())
}
