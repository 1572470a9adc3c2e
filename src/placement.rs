use std::fmt::Debug;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::fsops::{self, Attributes};
use crate::outcome::FileAction;
use crate::resolve;

/// Decides where a file goes inside the target directory and moves it there.
pub trait MoveStrategy: Debug {
    /// Destination for `source` under `target_dir`, or `None` if it has no place there.
    fn target_for(&self, source: &Path, target_dir: &Path) -> Option<PathBuf>;

    /// Whether timestamps, permissions and ownership survive the move.
    fn preserve_attributes(&self) -> bool;

    /// Move `source` into `target_dir`. Never fails; problems yield an unresolved action.
    fn move_file(&self, source: &Path, target_dir: &Path) -> FileAction {
        if !target_dir.is_dir() {
            debug!(target_dir = %target_dir.display(), "target directory missing");
            return FileAction::unresolved(source, None);
        }
        match self.target_for(source, target_dir) {
            Some(target) => self.relocate(source, &target),
            None => FileAction::unresolved(source, None),
        }
    }

    /// Move `source` to exactly `target`. Used for retries after a conflict was resolved.
    fn relocate(&self, source: &Path, target: &Path) -> FileAction {
        relocate(source, target, self.preserve_attributes())
    }
}

/// Shared move routine behind every placement policy.
pub fn relocate(source: &Path, target: &Path, preserve_attributes: bool) -> FileAction {
    if resolve::same_file(source, target) {
        return FileAction::resolved(source, target);
    }
    let attributes = if preserve_attributes {
        match Attributes::capture(source) {
            Ok(attrs) => Some(attrs),
            Err(e) => {
                debug!(source = %source.display(), error = %e, "cannot read source");
                return FileAction::unresolved(source, Some(target.to_path_buf()));
            }
        }
    } else {
        None
    };

    if let Some(parent) = target.parent()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        debug!(parent = %parent.display(), error = %e, "cannot create target parent");
        return FileAction::unresolved(source, Some(target.to_path_buf()));
    }

    if let Err(e) = fsops::move_file(source, target) {
        debug!(source = %source.display(), target = %target.display(), error = %e, "move failed");
        return FileAction::unresolved(source, Some(target.to_path_buf()));
    }

    if let Some(attrs) = attributes
        && let Err(e) = attrs.restore(target)
    {
        warn!(target = %target.display(), error = %e, "attributes not restored");
    }
    debug!(source = %source.display(), target = %target.display(), "moved");
    FileAction::resolved(source, target)
}

/// Drops every file directly into the target directory.
#[derive(Debug, Clone, Copy)]
pub struct FlatMove {
    pub preserve_attributes: bool,
}

impl Default for FlatMove {
    fn default() -> Self {
        Self {
            preserve_attributes: true,
        }
    }
}

impl MoveStrategy for FlatMove {
    fn target_for(&self, source: &Path, target_dir: &Path) -> Option<PathBuf> {
        source.file_name().map(|name| target_dir.join(name))
    }

    fn preserve_attributes(&self) -> bool {
        self.preserve_attributes
    }
}

/// Mirrors the file's position below `source_root` inside the target directory.
#[derive(Debug, Clone)]
pub struct StructuralMove {
    source_root: PathBuf,
    preserve_attributes: bool,
}

impl StructuralMove {
    pub fn new(source_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            preserve_attributes: true,
        }
    }

    pub fn preserving_attributes(mut self, preserve: bool) -> Self {
        self.preserve_attributes = preserve;
        self
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }
}

impl MoveStrategy for StructuralMove {
    fn target_for(&self, source: &Path, target_dir: &Path) -> Option<PathBuf> {
        let relative = resolve::relativize(&self.source_root, source)?;
        if relative.as_os_str().is_empty() {
            return None;
        }
        Some(target_dir.join(relative))
    }

    fn preserve_attributes(&self) -> bool {
        self.preserve_attributes
    }
}
