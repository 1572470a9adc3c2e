use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::discover::DiscoverStrategy;
use crate::error::{DiscoverError, ExecutionError};
use crate::events::{Emit, Listener};
use crate::filter::FilterStrategy;
use crate::model::{CleanProcedure, DeleteProcedure, MoveProcedure};
use crate::outcome::{FileAction, Outcome, Phase, Summary};

/// Runs the pipeline of one procedure kind.
pub trait Executor<P> {
    fn execute(&self, name: &str, procedure: &P, listener: &dyn Listener) -> Result<Outcome, ExecutionError>;
}

/// Phase 1. `None` means nothing was found and the procedure was cancelled.
fn discover_phase(
    name: &str,
    source: &Path,
    strategy: &dyn DiscoverStrategy,
    listener: &dyn Listener,
) -> Result<Option<Vec<PathBuf>>, ExecutionError> {
    listener.start(format!("Discovering files for procedure: {name}"));
    let discovered = strategy.discover(source, listener)?;
    if discovered.is_empty() {
        listener.cancel(format!("No files found for procedure: {name}"));
        return Ok(None);
    }
    listener.end(format!("Discovering files finished. {} files found.", discovered.len()));
    Ok(Some(discovered))
}

/// Phase 2. Progress is reported against the discovered set.
fn filter_phase(
    name: &str,
    discovered: &[PathBuf],
    strategy: &dyn FilterStrategy,
    listener: &dyn Listener,
) -> Option<Vec<PathBuf>> {
    listener.start(format!("Filtering files for procedure: {name}"));
    // Rejected files still count, so a rejected last file keeps progress below 100.
    let total = discovered.len();
    let mut filtered = Vec::new();
    for (index, path) in discovered.iter().enumerate() {
        if strategy.accept(path) {
            listener.progress(index + 1, total, format!("Accepted file: {}.", path.display()));
            filtered.push(path.clone());
        }
    }
    if filtered.is_empty() {
        listener.cancel(format!("No files remaining after filtering for procedure: {name}"));
        return None;
    }
    listener.end(format!("Filtering files finished. {} files remaining.", filtered.len()));
    Some(filtered)
}

/// Discover, filter, move, then resolve conflicts once.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveExecutor;

impl Executor<MoveProcedure> for MoveExecutor {
    fn execute(&self, name: &str, procedure: &MoveProcedure, listener: &dyn Listener) -> Result<Outcome, ExecutionError> {
        let Some(discovered) = discover_phase(name, procedure.source_path(), procedure.discover(), listener)? else {
            return Ok(Outcome::Cancelled { phase: Phase::Discover });
        };
        let Some(filtered) = filter_phase(name, &discovered, procedure.filter(), listener) else {
            return Ok(Outcome::Cancelled { phase: Phase::Filter });
        };
        let mut summary = Summary {
            discovered: discovered.len(),
            filtered: filtered.len(),
            ..Summary::default()
        };

        let placement = procedure.placement();
        let target_dir = procedure.target_directory();
        listener.start(format!("Moving files for procedure: {name}"));
        let total = filtered.len();
        let mut conflicts: Vec<FileAction> = Vec::new();
        for (index, path) in filtered.iter().enumerate() {
            let action = placement.move_file(path, target_dir);
            if action.resolved {
                summary.resolved += 1;
                listener.progress(index + 1, total, format!("Moved {}.", path.display()));
            } else {
                listener.progress(index + 1, total, format!("Conflict {}.", path.display()));
                conflicts.push(action);
            }
        }
        summary.conflicts = conflicts.len();
        listener.end(format!("Files moved. {} conflicts occurred.", conflicts.len()));
        if conflicts.is_empty() {
            info!(procedure = name, moved = summary.resolved, "move finished");
            return Ok(Outcome::completed(summary));
        }

        listener.start(format!("Resolving conflicts for procedure: {name}"));
        let strategy = procedure.conflict();
        let total = conflicts.len();
        for (index, conflict) in conflicts.iter().enumerate() {
            let done = index + 1;
            let retried = match strategy.resolve(conflict) {
                None => {
                    listener.progress(done, total, format!("Skipped {}.", conflict.source.display()));
                    summary.remainder.push(conflict.source.clone());
                    continue;
                }
                Some(answer) => match answer.target() {
                    Some(target) if answer.resolved => placement.relocate(&answer.source, target),
                    _ => answer,
                },
            };
            if retried.resolved {
                summary.resolved += 1;
                let target = retried.target().unwrap_or(Path::new(""));
                listener.progress(
                    done,
                    total,
                    format!("Resolved {} as {}.", retried.source.display(), target.display()),
                );
            } else {
                listener.progress(done, total, format!("Unresolved {}.", retried.source.display()));
                summary.remainder.push(retried.source);
            }
        }
        listener.end(format!(
            "Resolving conflicts finished. {} files remain unresolved.",
            summary.remainder.len()
        ));
        info!(
            procedure = name,
            moved = summary.resolved,
            unresolved = summary.remainder.len(),
            "move finished"
        );
        Ok(Outcome::completed(summary))
    }
}

/// Discover, filter, delete. Failed deletions end up in the remainder.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteExecutor;

impl Executor<DeleteProcedure> for DeleteExecutor {
    fn execute(&self, name: &str, procedure: &DeleteProcedure, listener: &dyn Listener) -> Result<Outcome, ExecutionError> {
        let Some(discovered) = discover_phase(name, procedure.source_path(), procedure.discover(), listener)? else {
            return Ok(Outcome::Cancelled { phase: Phase::Discover });
        };
        let Some(filtered) = filter_phase(name, &discovered, procedure.filter(), listener) else {
            return Ok(Outcome::Cancelled { phase: Phase::Filter });
        };
        let mut summary = Summary {
            discovered: discovered.len(),
            filtered: filtered.len(),
            ..Summary::default()
        };

        listener.start(format!("Deleting files for procedure: {name}"));
        let strategy = procedure.delete();
        let total = filtered.len();
        for (index, path) in filtered.iter().enumerate() {
            let deletion = strategy.delete(path);
            if deletion.resolved {
                summary.resolved += 1;
                listener.progress(index + 1, total, format!("Deleted {}.", path.display()));
            } else {
                listener.progress(index + 1, total, format!("Conflict {}.", path.display()));
                summary.remainder.push(deletion.target);
            }
        }
        summary.conflicts = summary.remainder.len();
        listener.end(format!("Files deleted. {} conflicts occurred.", summary.conflicts));
        info!(procedure = name, deleted = summary.resolved, unresolved = summary.conflicts, "delete finished");
        Ok(Outcome::completed(summary))
    }
}

/// Removes directories that hold no files once their subdirectories are cleaned.
///
/// Anything that is not a directory (files, symlinks, sockets) keeps its
/// parent alive. Symlinked directories are never entered.
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanExecutor;

struct CleanRun<'a> {
    listener: &'a dyn Listener,
    total: usize,
    visited: usize,
    removed: usize,
}

impl CleanRun<'_> {
    /// Returns whether `dir` was removed.
    fn clean(&mut self, dir: &Path) -> Result<bool, ExecutionError> {
        let io_err = |source| ExecutionError::Clean {
            path: dir.to_path_buf(),
            source,
        };
        let mut keep = false;
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            let file_type = entry.file_type().map_err(io_err)?;
            if file_type.is_dir() {
                if !self.clean(&entry.path())? {
                    keep = true;
                }
            } else {
                keep = true;
            }
        }
        self.visited += 1;
        if keep {
            return Ok(false);
        }
        std::fs::remove_dir(dir).map_err(io_err)?;
        self.removed += 1;
        debug!(dir = %dir.display(), "removed empty directory");
        self.listener
            .progress(self.visited, self.total, format!("Deleting: {}.", dir.display()));
        Ok(true)
    }
}

impl Executor<CleanProcedure> for CleanExecutor {
    fn execute(&self, name: &str, procedure: &CleanProcedure, listener: &dyn Listener) -> Result<Outcome, ExecutionError> {
        let source = procedure.source_path();
        listener.start(format!("Cleaning empty directories for procedure: {name}"));

        let mut total = 0;
        for entry in WalkDir::new(source).follow_links(false) {
            let entry = entry.map_err(|e| DiscoverError::Walk {
                path: source.to_path_buf(),
                source: e,
            })?;
            if entry.file_type().is_dir() {
                total += 1;
            }
        }

        let mut run = CleanRun {
            listener,
            total,
            visited: 0,
            removed: 0,
        };
        run.clean(source)?;
        listener.end(format!("Cleaning finished. {} directories removed.", run.removed));
        info!(procedure = name, removed = run.removed, "clean finished");
        Ok(Outcome::completed(Summary {
            discovered: total,
            filtered: total,
            resolved: run.removed,
            ..Summary::default()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::{RenameConflict, SkipConflict};
    use crate::delete::HardDelete;
    use crate::discover::{FlatDiscover, RecursiveDiscover};
    use crate::events::{Recorded, Recorder};
    use crate::filter::{PatternFilter, PatternSyntax};
    use crate::placement::{FlatMove, StructuralMove};
    use std::fs;

    fn txt_only() -> PatternFilter {
        PatternFilter::from_strings(PatternSyntax::Glob, ["*.txt"], []).unwrap()
    }

    #[test]
    fn empty_source_cancels_after_discovery() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let procedure = MoveProcedure::builder()
            .source_path(dir.path())
            .target_directory(dir.path())
            .discover(FlatDiscover)
            .filter(PatternFilter::accept_all())
            .placement(FlatMove::default())
            .conflict(SkipConflict)
            .build()?;
        let recorder = Recorder::default();

        let outcome = MoveExecutor.execute("empty", &procedure, &recorder)?;
        assert_eq!(outcome, Outcome::Cancelled { phase: Phase::Discover });
        assert_eq!(
            recorder.take(),
            vec![
                Recorded::Start("Discovering files for procedure: empty".into()),
                Recorded::Cancel("No files found for procedure: empty".into()),
            ]
        );
        Ok(())
    }

    #[test]
    fn filter_progress_counts_rejected_files() {
        let discovered = [PathBuf::from("/s/a.txt"), PathBuf::from("/s/b.log")];
        let recorder = Recorder::default();

        let filtered = filter_phase("f", &discovered, &txt_only(), &recorder);
        assert_eq!(filtered, Some(vec![PathBuf::from("/s/a.txt")]));
        assert_eq!(recorder.progress_values(), vec![50]);
        assert_eq!(
            recorder.take().last(),
            Some(&Recorded::End("Filtering files finished. 1 files remaining.".into()))
        );
    }

    #[test]
    fn nothing_accepted_cancels_after_filtering() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("a.log"), "")?;
        let procedure = DeleteProcedure::builder()
            .source_path(dir.path())
            .discover(FlatDiscover)
            .filter(txt_only())
            .delete(HardDelete)
            .build()?;
        let recorder = Recorder::default();

        let outcome = DeleteExecutor.execute("d", &procedure, &recorder)?;
        assert_eq!(outcome, Outcome::Cancelled { phase: Phase::Filter });
        assert!(matches!(recorder.take().last(), Some(Recorded::Cancel(_))));
        assert!(dir.path().join("a.log").exists());
        Ok(())
    }

    #[test]
    fn move_pipeline_moves_filtered_files() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::create_dir_all(&src)?;
        fs::create_dir_all(&dst)?;
        for name in ["a.txt", "b.log", "c.txt"] {
            fs::write(src.join(name), name)?;
        }
        let procedure = MoveProcedure::builder()
            .source_path(&src)
            .target_directory(&dst)
            .discover(FlatDiscover)
            .filter(txt_only())
            .placement(FlatMove::default())
            .conflict(SkipConflict)
            .build()?;
        let recorder = Recorder::default();

        let outcome = MoveExecutor.execute("sort", &procedure, &recorder)?;
        assert!(outcome.is_clean());
        let summary = outcome.summary().unwrap();
        assert_eq!((summary.discovered, summary.filtered, summary.resolved), (3, 2, 2));
        assert!(dst.join("a.txt").exists() && dst.join("c.txt").exists());
        assert!(src.join("b.log").exists());

        let progress = recorder.progress_values();
        assert!(progress.iter().all(|p| *p <= 100));
        assert_eq!(progress.last(), Some(&100));
        Ok(())
    }

    #[test]
    fn rename_conflicts_are_retried() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::create_dir_all(&src)?;
        fs::create_dir_all(&dst)?;
        fs::write(src.join("a.txt"), "new")?;
        fs::write(src.join("b.txt"), "b")?;
        fs::write(dst.join("a.txt"), "old")?;
        let procedure = MoveProcedure::builder()
            .source_path(&src)
            .target_directory(&dst)
            .discover(FlatDiscover)
            .filter(PatternFilter::accept_all())
            .placement(FlatMove::default())
            .conflict(RenameConflict)
            .build()?;

        let outcome = MoveExecutor.execute("sort", &procedure, &Recorder::default())?;
        let summary = outcome.summary().unwrap();
        assert_eq!(summary.conflicts, 1);
        assert_eq!(summary.resolved, 2);
        assert!(summary.remainder.is_empty());
        assert!(!outcome.is_clean());

        assert_eq!(fs::read_to_string(dst.join("a.txt"))?, "old");
        let renamed: Vec<_> = fs::read_dir(&dst)?
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with('a') && n != "a.txt")
            .collect();
        assert_eq!(renamed.len(), 1);
        assert_eq!(fs::read_to_string(dst.join(&renamed[0]))?, "new");
        assert_eq!(fs::read_dir(&src)?.count(), 0);
        Ok(())
    }

    #[test]
    fn skipped_conflicts_form_the_remainder() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::create_dir_all(src.join("nested"))?;
        fs::create_dir_all(dst.join("nested"))?;
        fs::write(src.join("nested/a.txt"), "new")?;
        fs::write(dst.join("nested/a.txt"), "old")?;
        let procedure = MoveProcedure::builder()
            .source_path(&src)
            .target_directory(&dst)
            .discover(RecursiveDiscover)
            .filter(PatternFilter::accept_all())
            .placement(StructuralMove::new(&src))
            .conflict(SkipConflict)
            .build()?;
        let recorder = Recorder::default();

        let outcome = MoveExecutor.execute("mirror", &procedure, &recorder)?;
        assert_eq!(outcome.remainder(), &[src.join("nested/a.txt")]);
        let summary = outcome.summary().unwrap();
        assert!(summary.remainder.len() <= summary.conflicts);
        assert_eq!(summary.conflicts, summary.filtered - summary.resolved);
        assert!(src.join("nested/a.txt").exists());
        assert_eq!(fs::read_to_string(dst.join("nested/a.txt"))?, "old");
        assert!(
            recorder
                .take()
                .iter()
                .any(|r| matches!(r, Recorded::Progress(100, m) if m.starts_with("Skipped")))
        );
        Ok(())
    }

    #[test]
    fn delete_pipeline_reports_failures_without_aborting() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("a.txt"), "")?;
        fs::write(dir.path().join("b.txt"), "")?;
        let procedure = DeleteProcedure::builder()
            .source_path(dir.path())
            .discover(FlatDiscover)
            .filter(txt_only())
            .delete(HardDelete)
            .build()?;

        let outcome = DeleteExecutor.execute("purge", &procedure, &Recorder::default())?;
        assert!(outcome.is_clean());
        assert_eq!(fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn clean_removes_only_file_free_directories() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let root = dir.path().join("root");
        fs::create_dir_all(root.join("empty/deeper/deepest"))?;
        fs::create_dir_all(root.join("kept/empty_child"))?;
        fs::write(root.join("kept/file.txt"), "")?;
        let recorder = Recorder::default();

        let outcome = CleanExecutor.execute("tidy", &CleanProcedure::new(&root), &recorder)?;
        assert!(!root.join("empty").exists());
        assert!(!root.join("kept/empty_child").exists());
        assert!(root.join("kept/file.txt").exists());
        assert!(root.is_dir());

        let summary = outcome.summary().unwrap();
        assert_eq!(summary.discovered, 6);
        assert_eq!(summary.resolved, 4);
        assert_eq!(recorder.progress_values().len(), 4);
        Ok(())
    }

    #[test]
    fn clean_removes_an_entirely_empty_tree() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let root = dir.path().join("root");
        fs::create_dir_all(root.join("a/b"))?;
        fs::create_dir_all(root.join("c"))?;
        let recorder = Recorder::default();

        CleanExecutor.execute("tidy", &CleanProcedure::new(&root), &recorder)?;
        assert!(!root.exists());
        assert_eq!(recorder.progress_values().last(), Some(&100));
        Ok(())
    }
}
