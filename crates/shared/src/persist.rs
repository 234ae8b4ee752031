//! Atomic JSON persistence helpers.
//!
//! Every snapshot mutation must be durable before the caller observes it, so
//! writes go to a sibling temp file and are renamed into place. Rename within
//! one directory is atomic on the platforms we support.

use crate::{ErrorEnvelope, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::process;

/// Serialize `value` as pretty JSON and atomically swap it into `path`.
pub fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let payload = serde_json::to_vec_pretty(value)?;

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            ErrorEnvelope::expected(
                crate::ErrorCode::invalid_input(),
                "persist path must name a file",
            )
            .with_metadata("path", path.display().to_string())
        })?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    // Unique per process so concurrent writers never share a temp file.
    let temp_name = format!(".{file_name}.{}.tmp", process::id());
    let temp_path = path.with_file_name(temp_name);

    std::fs::write(&temp_path, payload)?;
    match std::fs::rename(&temp_path, path) {
        Ok(()) => Ok(()),
        Err(error) => {
            let _ = std::fs::remove_file(&temp_path);
            Err(ErrorEnvelope::from(error)
                .with_metadata("path", path.display().to_string()))
        },
    }
}

/// Read and deserialize JSON from `path`, returning `None` when absent.
pub fn read_json_if_exists<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(error) => {
            return Err(ErrorEnvelope::from(error)
                .with_metadata("path", path.display().to_string()));
        },
    };

    let value = serde_json::from_slice(&bytes)?;
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn write_then_read_round_trips() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("snapshot.json");

        let mut value = BTreeMap::new();
        value.insert("a".to_owned(), 1u32);
        atomic_write_json(&path, &value)?;

        let loaded: Option<BTreeMap<String, u32>> = read_json_if_exists(&path)?;
        assert_eq!(loaded, Some(value));
        Ok(())
    }

    #[test]
    fn read_missing_file_returns_none() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("absent.json");
        let loaded: Option<u32> = read_json_if_exists(&path)?;
        assert!(loaded.is_none());
        Ok(())
    }

    #[test]
    fn rewrite_replaces_previous_contents() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("snapshot.json");

        atomic_write_json(&path, &1u32)?;
        atomic_write_json(&path, &2u32)?;

        let loaded: Option<u32> = read_json_if_exists(&path)?;
        assert_eq!(loaded, Some(2));
        Ok(())
    }

    #[test]
    fn write_rejects_bare_root_path() {
        let error = atomic_write_json(Path::new("/"), &1u32).err();
        assert!(error.is_some());
    }
}
