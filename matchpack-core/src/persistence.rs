//! Persistence helpers: atomic JSON writes and the directory save/load discipline.
//!
//! Saved objects live in a user-chosen directory under a fixed file name.
//! Saving never overwrites: if the target file is already present the call
//! fails with [`PackError::AlreadyExists`] and the existing file is left as is.

use crate::error::PackError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io;
use std::path::{Path, PathBuf};

/// Atomically create `path` holding `data` serialized as JSON.
///
/// Serializes `data`, writes it to a `.tmp` sibling file, then hard-links
/// the sibling onto `path`. The link fails if `path` already exists, so an
/// existing file is never replaced, even one created after any prior check.
pub fn atomic_write_json<T: Serialize>(path: &Path, data: &T) -> Result<(), PackError> {
    let json = serde_json::to_vec(data)?;
    atomic_write(path, &json)
}

/// Atomically create `path` holding raw bytes.
///
/// Creates parent directories if they don't exist. Fails with
/// [`PackError::AlreadyExists`] if `path` is present.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<(), PackError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, data)?;
    let linked = std::fs::hard_link(&tmp, path);
    std::fs::remove_file(&tmp)?;
    match linked {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            Err(PackError::AlreadyExists(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Load and deserialize JSON from a file.
///
/// Returns `Ok(None)` if the file doesn't exist.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, PackError> {
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read(path)?;
    Ok(Some(serde_json::from_slice(&data)?))
}

/// Save `value` as `dirpath/file_name`, creating `dirpath` when missing.
///
/// Fails with [`PackError::AlreadyExists`] if the target file is present.
pub fn save_to_dir<T: Serialize>(
    dirpath: &Path,
    file_name: &str,
    value: &T,
) -> Result<PathBuf, PackError> {
    let target = dirpath.join(file_name);
    if target.exists() {
        return Err(PackError::AlreadyExists(target));
    }
    if !dirpath.exists() {
        tracing::debug!(dir = %dirpath.display(), "Creating save directory");
        std::fs::create_dir_all(dirpath)?;
    }
    atomic_write_json(&target, value)?;
    tracing::info!(path = %target.display(), "Saved");
    Ok(target)
}

/// Load the object saved by [`save_to_dir`] from `dirpath/file_name`.
pub fn load_from_dir<T: DeserializeOwned>(dirpath: &Path, file_name: &str) -> Result<T, PackError> {
    let target = dirpath.join(file_name);
    let value = load_json(&target)?
        .ok_or_else(|| PackError::not_found(target.display().to_string()))?;
    tracing::info!(path = %target.display(), "Loaded");
    Ok(value)
}
