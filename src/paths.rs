//! Filesystem path validation.
//!
//! Used before reading public keys and mutual TLS material from disk.

use crate::error::PathError;
use std::path::{Path, PathBuf};

/// Validate a set of paths, returning true only if every one of them
/// resolves to an existing regular file.
pub fn validate_paths<I, P>(paths: I) -> bool
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    paths.into_iter().all(|p| require_path(p).is_ok())
}

/// Validate a set of paths, stopping at the first failure.
///
/// On success returns the resolved absolute paths in input order.
pub fn require_paths<I, P>(paths: I) -> Result<Vec<PathBuf>, PathError>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    paths.into_iter().map(require_path).collect()
}

/// Validate a single path and return its absolute form.
///
/// Checks, in order: the path is not blank, it exists, it is a regular file.
pub fn require_path<P: AsRef<Path>>(path: P) -> Result<PathBuf, PathError> {
    let path = path.as_ref();
    let raw = path.to_string_lossy();
    if raw.trim().is_empty() {
        return Err(PathError::Empty(raw.into_owned()));
    }

    let resolved = absolute(path);
    let metadata = match std::fs::metadata(&resolved) {
        Ok(metadata) => metadata,
        Err(_) => return Err(PathError::NotFound(resolved)),
    };

    if !metadata.is_file() {
        return Err(PathError::NotAFile(resolved));
    }

    Ok(resolved)
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}
