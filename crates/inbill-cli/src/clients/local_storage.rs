//! Storage client writing into a locally synced folder.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use inbill_core::clients::StorageSyncClient;
use inbill_core::error::CollaboratorError;
use inbill_core::naming::next_available_path;

/// Copies invoice files into the sync folder tree.
///
/// Owns the collision rule: an occupied destination gets a numeric suffix,
/// existing files are never overwritten.
#[derive(Debug, Default)]
pub struct LocalStorage;

impl LocalStorage {
    pub fn new() -> Self {
        Self
    }
}

impl StorageSyncClient for LocalStorage {
    fn copy_file(
        &mut self,
        bytes: &[u8],
        dest_dir: &Path,
        file_name: &str,
    ) -> Result<PathBuf, CollaboratorError> {
        fs::create_dir_all(dest_dir).map_err(|e| {
            CollaboratorError::Storage(format!("create {}: {}", dest_dir.display(), e))
        })?;

        let target = next_available_path(dest_dir, file_name);
        fs::write(&target, bytes).map_err(|e| {
            CollaboratorError::Storage(format!("write {}: {}", target.display(), e))
        })?;

        // Read the size back so a silently truncated write surfaces here
        // instead of as a broken file in the sync folder.
        let written = fs::metadata(&target)
            .map_err(|e| CollaboratorError::Storage(format!("stat {}: {}", target.display(), e)))?
            .len();
        if written != bytes.len() as u64 {
            return Err(CollaboratorError::Storage(format!(
                "short write to {}: {} of {} bytes",
                target.display(),
                written,
                bytes.len()
            )));
        }

        info!("Copied {} bytes to {}", bytes.len(), target.display());
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_copy_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("2025").join("Vodafone");
        let mut storage = LocalStorage::new();

        let stored = storage.copy_file(b"pdf bytes", &dest, "szamla.pdf").unwrap();
        assert_eq!(stored, dest.join("szamla.pdf"));
        assert_eq!(fs::read(&stored).unwrap(), b"pdf bytes");
    }

    #[test]
    fn test_collision_gets_suffix_instead_of_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = LocalStorage::new();

        let first = storage.copy_file(b"first", dir.path(), "szamla.pdf").unwrap();
        let second = storage.copy_file(b"second", dir.path(), "szamla.pdf").unwrap();

        assert_eq!(first, dir.path().join("szamla.pdf"));
        assert_eq!(second, dir.path().join("szamla_1.pdf"));
        assert_eq!(fs::read(&first).unwrap(), b"first");
        assert_eq!(fs::read(&second).unwrap(), b"second");
    }
}
