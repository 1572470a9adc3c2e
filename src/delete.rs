use std::fmt::Debug;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::fsops;
use crate::outcome::FileDeletion;
use crate::resolve;

/// Removes one file. Never fails; problems yield an unresolved deletion.
pub trait DeleteStrategy: Debug {
    fn delete(&self, path: &Path) -> FileDeletion;
}

/// Unlinks the file for good.
#[derive(Debug, Clone, Copy, Default)]
pub struct HardDelete;

impl DeleteStrategy for HardDelete {
    fn delete(&self, path: &Path) -> FileDeletion {
        match fsops::remove_file(path) {
            Ok(()) => FileDeletion::resolved(path),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "delete failed");
                FileDeletion::unresolved(path)
            }
        }
    }
}

/// Moves the file to the user's trash.
///
/// Without an explicit trash directory the desktop helper (`gio trash`) is
/// tried first, then the freedesktop.org layout under the user's data
/// directory. Windows has no supported route and always reports unresolved.
#[derive(Debug, Clone, Default)]
pub struct SoftDelete {
    trash_dir: Option<PathBuf>,
}

impl SoftDelete {
    /// Use the platform trash.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `dir` as a freedesktop.org style trash (`files/` + `info/`).
    pub fn with_trash_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            trash_dir: Some(dir.into()),
        }
    }
}

impl DeleteStrategy for SoftDelete {
    fn delete(&self, path: &Path) -> FileDeletion {
        let result = match &self.trash_dir {
            Some(dir) => trash_into(dir, path).map(|_| ()),
            None => system_trash(path),
        };
        match result {
            Ok(()) => FileDeletion::resolved(path),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not move to trash");
                FileDeletion::unresolved(path)
            }
        }
    }
}

fn system_trash(path: &Path) -> io::Result<()> {
    if std::env::consts::OS == "windows" {
        return Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "recycle bin integration is not available",
        ));
    }
    if desktop_trash(path) {
        return Ok(());
    }
    let home = dirs::data_local_dir()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no user data directory"))?
        .join("Trash");
    trash_into(&home, path).map(|_| ())
}

/// `gio trash <path>`; false when the helper is missing or refuses.
fn desktop_trash(path: &Path) -> bool {
    let status = Command::new("gio")
        .arg("trash")
        .arg(resolve::absolute(path))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    match status {
        Ok(status) if status.success() => true,
        Ok(status) => {
            debug!(?status, "gio trash refused, using trash directory");
            false
        }
        Err(e) => {
            debug!(error = %e, "gio unavailable, using trash directory");
            false
        }
    }
}

/// Move `path` into `trash/files`, recording its origin in `trash/info/<name>.trashinfo`.
/// Returns the location inside the trash.
pub fn trash_into(trash: &Path, path: &Path) -> io::Result<PathBuf> {
    std::fs::symlink_metadata(path)?;
    let name = path
        .file_name()
        .map(PathBuf::from)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let files = trash.join("files");
    let info = trash.join("info");
    std::fs::create_dir_all(&files)?;
    std::fs::create_dir_all(&info)?;

    let mut attempt = 1u32;
    let (stored, info_path, mut info_file) = loop {
        let candidate = if attempt == 1 {
            name.clone()
        } else {
            resolve::tagged_name(&name, &format!("_{attempt}"))
        };
        attempt += 1;
        let stored = files.join(&candidate);
        if std::fs::symlink_metadata(&stored).is_ok() {
            continue;
        }
        let mut info_name = candidate.into_os_string();
        info_name.push(".trashinfo");
        let info_path = info.join(info_name);
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&info_path)
        {
            Ok(file) => break (stored, info_path, file),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    };

    let deleted_at = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S");
    let written = write!(
        info_file,
        "[Trash Info]\nPath={}\nDeletionDate={}\n",
        resolve::absolute(path).display(),
        deleted_at
    )
    .and_then(|_| fsops::move_file(path, &stored));
    if let Err(e) = written {
        let _ = std::fs::remove_file(&info_path);
        return Err(e);
    }
    debug!(path = %path.display(), stored = %stored.display(), "trashed");
    Ok(stored)
}
