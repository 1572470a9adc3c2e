use std::fmt::Debug;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::outcome::FileAction;
use crate::resolve;

/// Decides what happens to a move that could not be placed.
///
/// `Some(action)` with `resolved == true` asks the executor to retry the move
/// to `action.target`. `None` leaves the conflict in place without a retry.
pub trait ConflictStrategy: Debug {
    fn resolve(&self, conflict: &FileAction) -> Option<FileAction>;
}

/// Leaves every conflict unresolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipConflict;

impl ConflictStrategy for SkipConflict {
    fn resolve(&self, conflict: &FileAction) -> Option<FileAction> {
        debug!(source = %conflict.source.display(), "conflict skipped");
        None
    }
}

/// Renames the target by inserting a millisecond timestamp before the extension.
///
/// Stamps come from a process-wide clock that never repeats a value, so each
/// attempt names a different file and the search always ends.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenameConflict;

impl ConflictStrategy for RenameConflict {
    fn resolve(&self, conflict: &FileAction) -> Option<FileAction> {
        let Some(original) = conflict.target() else {
            // Nothing to rename: the action never had a destination.
            return Some(conflict.clone());
        };
        let mut candidate = original.to_path_buf();
        while exists(&candidate) {
            candidate = resolve::tagged_name(original, &next_stamp().to_string());
        }
        debug!(source = %conflict.source.display(), target = %candidate.display(), "conflict renamed");
        Some(FileAction::resolved(&conflict.source, candidate))
    }
}

fn exists(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok()
}

static LAST_STAMP: AtomicU64 = AtomicU64::new(0);

/// Wall-clock milliseconds, bumped past the previous value when the clock
/// has not advanced (or went backwards).
fn next_stamp() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();
    let mut last = LAST_STAMP.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_STAMP.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(current) => last = current,
        }
    }
}
