use path_absolutize::Absolutize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Absolute, lexically normalized form of `path`. Does not touch the filesystem
/// and does not resolve symlinks.
pub fn absolute(path: &Path) -> PathBuf {
    match path.absolutize() {
        Ok(abs) => abs.into_owned(),
        Err(_) => path.to_path_buf(),
    }
}

/// `path` expressed relative to `root`, or `None` when it lies outside of it.
pub fn relativize(root: &Path, path: &Path) -> Option<PathBuf> {
    let root = absolute(root);
    let path = absolute(path);
    path.strip_prefix(&root).ok().map(Path::to_path_buf)
}

/// True when both paths exist and canonicalize to the same location.
pub fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Sibling of `name` with `tag` inserted before the extension:
/// `report.txt` becomes `report<tag>.txt`, `README` becomes `README<tag>`.
pub fn tagged_name(name: &Path, tag: &str) -> PathBuf {
    let mut file_name = name.file_stem().map(OsString::from).unwrap_or_default();
    file_name.push(tag);
    if let Some(ext) = name.extension() {
        file_name.push(".");
        file_name.push(ext);
    }
    name.with_file_name(file_name)
}
