use std::io;
use std::path::Path;

use filetime::FileTime;
use tracing::{debug, warn};

/// Check if a file and a destination directory are on the same filesystem.
#[cfg(unix)]
fn same_filesystem(src: &Path, dst_dir: &Path) -> io::Result<bool> {
    use std::os::unix::fs::MetadataExt;
    let src_meta = std::fs::symlink_metadata(src)?;
    let dst_meta = std::fs::metadata(dst_dir)?;
    Ok(src_meta.dev() == dst_meta.dev())
}

#[cfg(not(unix))]
fn same_filesystem(_src: &Path, _dst_dir: &Path) -> io::Result<bool> {
    // No stable volume id off unix; take the copy+delete path.
    Ok(false)
}

/// Move a single file, refusing to replace anything already at `dst`.
///
/// Within one filesystem this links `dst` then unlinks `src`, so an existing
/// destination makes the link itself fail. Across filesystems the file is
/// copied and the source removed.
pub fn move_file(src: &Path, dst: &Path) -> io::Result<()> {
    if std::fs::symlink_metadata(dst).is_ok() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("destination exists: {}", dst.display()),
        ));
    }
    let dst_dir = dst.parent().unwrap_or_else(|| Path::new("."));
    if same_filesystem(src, dst_dir)? {
        match std::fs::hard_link(src, dst) {
            Ok(()) => {
                // Unlinking the source can still fail; drop the new link so
                // the file stays only where it was.
                if let Err(e) = std::fs::remove_file(src) {
                    discard(dst);
                    return Err(e);
                }
                return Ok(());
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Err(e),
            // Some filesystems have no hard links.
            Err(e) => debug!(error = %e, "hard link unavailable, falling back to copy"),
        }
    }
    let options = fs_extra::file::CopyOptions::new();
    fs_extra::file::move_file(src, dst, &options)
        .map(|_| ())
        .map_err(|e| {
            // An AlreadyExists here means someone else took `dst` meanwhile.
            if !matches!(e.kind, fs_extra::error::ErrorKind::AlreadyExists) {
                discard(dst);
            }
            io::Error::other(e.to_string())
        })
}

/// Remove what a failed move left at `dst`, which was free before the move.
fn discard(dst: &Path) {
    if let Err(e) = remove_file(dst) {
        warn!(path = %dst.display(), error = %e, "cannot remove partial move destination");
    }
}

/// Remove a file; a missing file counts as removed.
pub fn remove_file(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// File attributes captured before a move so they can be put back afterwards.
#[derive(Debug, Clone)]
pub struct Attributes {
    accessed: FileTime,
    modified: FileTime,
    #[cfg(unix)]
    posix: Option<Posix>,
}

#[cfg(unix)]
#[derive(Debug, Clone, Copy)]
struct Posix {
    mode: u32,
    uid: u32,
    gid: u32,
}

impl Attributes {
    pub fn capture(path: &Path) -> io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        Ok(Self {
            accessed: FileTime::from_last_access_time(&meta),
            modified: FileTime::from_last_modification_time(&meta),
            #[cfg(unix)]
            posix: {
                use std::os::unix::fs::MetadataExt;
                Some(Posix {
                    mode: meta.mode(),
                    uid: meta.uid(),
                    gid: meta.gid(),
                })
            },
        })
    }

    /// Apply the captured timestamps, then permissions and ownership where
    /// the platform exposes them. Ownership changes that the process is not
    /// allowed to make are skipped.
    pub fn restore(&self, path: &Path) -> io::Result<()> {
        filetime::set_file_times(path, self.accessed, self.modified)?;
        #[cfg(unix)]
        restore_posix(self.posix, path)?;
        Ok(())
    }
}

#[cfg(unix)]
fn restore_posix(posix: Option<Posix>, path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let Some(posix) = posix else {
        return Ok(());
    };
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(posix.mode))?;
    match std::os::unix::fs::chown(path, Some(posix.uid), Some(posix.gid)) {
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            debug!(path = %path.display(), "ownership not restored: permission denied");
            Ok(())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn move_file_relocates_content() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let src = dir.path().join("a.txt");
        let dst = dir.path().join("b.txt");
        fs::write(&src, "payload")?;

        move_file(&src, &dst)?;
        assert!(!src.exists());
        assert_eq!(fs::read_to_string(&dst)?, "payload");
        Ok(())
    }

    #[test]
    fn move_file_never_overwrites() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let src = dir.path().join("a.txt");
        let dst = dir.path().join("b.txt");
        fs::write(&src, "new")?;
        fs::write(&dst, "old")?;

        let err = move_file(&src, &dst).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read_to_string(&dst)?, "old");
        assert!(src.exists());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn failed_move_leaves_no_destination() -> anyhow::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir()?;
        let from = dir.path().join("from");
        let to = dir.path().join("to");
        fs::create_dir(&from)?;
        fs::create_dir(&to)?;
        let src = from.join("a.txt");
        fs::write(&src, "payload")?;
        fs::set_permissions(&from, fs::Permissions::from_mode(0o555))?;

        // Permission bits do not bind root.
        if fs::write(from.join("writable"), "").is_ok() {
            fs::set_permissions(&from, fs::Permissions::from_mode(0o755))?;
            return Ok(());
        }

        let result = move_file(&src, &to.join("a.txt"));
        fs::set_permissions(&from, fs::Permissions::from_mode(0o755))?;

        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::PermissionDenied);
        assert_eq!(fs::read_to_string(&src)?, "payload");
        assert!(!to.join("a.txt").exists());
        Ok(())
    }

    #[test]
    fn remove_missing_file_is_ok() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        remove_file(&dir.path().join("ghost"))?;
        Ok(())
    }

    #[test]
    fn attributes_roundtrip_modification_time() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::write(&a, "")?;
        fs::write(&b, "")?;
        let stamp = FileTime::from_unix_time(1_000_000_000, 0);
        filetime::set_file_mtime(&a, stamp)?;

        let attrs = Attributes::capture(&a)?;
        attrs.restore(&b)?;
        let restored = FileTime::from_last_modification_time(&fs::metadata(&b)?);
        assert_eq!(restored, stamp);
        Ok(())
    }
}
