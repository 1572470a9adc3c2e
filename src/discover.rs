use std::fmt::Debug;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::DiscoverError;
use crate::events::{Emit, Listener};

/// Produces the candidate files of a procedure.
///
/// Order follows the underlying directory listing and carries no meaning.
pub trait DiscoverStrategy: Debug {
    fn discover(&self, source: &Path, listener: &dyn Listener) -> Result<Vec<PathBuf>, DiscoverError>;
}

/// Direct children of the source directory, directories excluded.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatDiscover;

impl DiscoverStrategy for FlatDiscover {
    fn discover(&self, source: &Path, _listener: &dyn Listener) -> Result<Vec<PathBuf>, DiscoverError> {
        let io_err = |e| DiscoverError::Io {
            path: source.to_path_buf(),
            source: e,
        };
        let mut files = Vec::new();
        for entry in std::fs::read_dir(source).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_dir() {
                continue;
            }
            files.push(path);
        }
        debug!(source = %source.display(), found = files.len(), "flat discovery");
        Ok(files)
    }
}

/// Every regular file below the source directory. Symlinks are not followed
/// and not reported. One progress event is emitted per visited entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecursiveDiscover;

impl DiscoverStrategy for RecursiveDiscover {
    fn discover(&self, source: &Path, listener: &dyn Listener) -> Result<Vec<PathBuf>, DiscoverError> {
        let entries = WalkDir::new(source)
            .follow_links(false)
            .into_iter()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DiscoverError::Walk {
                path: source.to_path_buf(),
                source: e,
            })?;

        let total = entries.len();
        let mut files = Vec::new();
        for (index, entry) in entries.into_iter().enumerate() {
            listener.progress(index + 1, total, format!("{}.", entry.path().display()));
            let file_type = entry.file_type();
            if file_type.is_dir() || file_type.is_symlink() {
                continue;
            }
            files.push(entry.into_path());
        }
        debug!(source = %source.display(), visited = total, found = files.len(), "recursive discovery");
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Recorder;
    use std::fs;

    #[test]
    fn flat_skips_directories() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("a.txt"), "a")?;
        fs::write(dir.path().join("b.log"), "b")?;
        fs::create_dir(dir.path().join("nested"))?;
        fs::write(dir.path().join("nested/c.txt"), "c")?;

        let mut found = FlatDiscover.discover(dir.path(), &Recorder::default())?;
        found.sort();
        assert_eq!(found, vec![dir.path().join("a.txt"), dir.path().join("b.log")]);
        Ok(())
    }

    #[test]
    fn recursive_returns_only_files_and_reports_every_entry() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::create_dir_all(dir.path().join("x/y"))?;
        fs::write(dir.path().join("top.txt"), "")?;
        fs::write(dir.path().join("x/y/deep.txt"), "")?;

        let recorder = Recorder::default();
        let mut found = RecursiveDiscover.discover(dir.path(), &recorder)?;
        found.sort();
        assert_eq!(found, vec![dir.path().join("top.txt"), dir.path().join("x/y/deep.txt")]);

        // root, x, x/y, two files
        let progress = recorder.progress_values();
        assert_eq!(progress.len(), 5);
        assert!(progress.iter().all(|p| *p <= 100));
        assert_eq!(progress.last(), Some(&100));
        Ok(())
    }

    #[test]
    #[cfg(unix)]
    fn recursive_excludes_symlinks() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("real.txt"), "")?;
        std::os::unix::fs::symlink(dir.path().join("real.txt"), dir.path().join("link.txt"))?;

        let found = RecursiveDiscover.discover(dir.path(), &Recorder::default())?;
        assert_eq!(found, vec![dir.path().join("real.txt")]);
        Ok(())
    }

    #[test]
    fn missing_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            FlatDiscover.discover(&missing, &Recorder::default()),
            Err(DiscoverError::Io { .. })
        ));
        assert!(matches!(
            RecursiveDiscover.discover(&missing, &Recorder::default()),
            Err(DiscoverError::Walk { .. })
        ));
    }
}
