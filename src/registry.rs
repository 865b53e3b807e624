//! Shared identity registry
//!
//! One JSON file under the studio-scoped config directory, visible to
//! every game title installed on the device. Each title records its
//! own locker address so sibling saves can find it later ("reunion").
//! There is no locking: concurrent writers race and the last write
//! wins, which is acceptable for a file touched once per deposit.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::error::LockerError;

const REGISTRY_FILE: &str = "locker_registry.json";

/// Device-local registry of {game title -> locker address}.
pub struct IdentityRegistry {
    path: PathBuf,
}

impl IdentityRegistry {
    /// Registry rooted at the given studio directory.
    pub fn new(studio_dir: PathBuf) -> Self {
        Self {
            path: studio_dir.join(REGISTRY_FILE),
        }
    }

    /// Record this save's locker address under its game title,
    /// overwriting any previous entry for the same title. A missing or
    /// unparsable file starts from an empty mapping.
    pub fn record_self(&self, title: &str, address: &str) -> anyhow::Result<()> {
        let mut entries = self.load_lenient();
        entries.insert(title.to_string(), address.to_string());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&self.path, serde_json::to_string(&entries)?)?;

        tracing::debug!("Recorded locker address for {} in registry", title);
        Ok(())
    }

    /// Every other title's entry, in sorted-title order. A missing file
    /// is an empty list; a file that exists but will not parse is
    /// reported as unreadable rather than silently dropped.
    pub fn list_others(&self, exclude_title: &str) -> Result<Vec<(String, String)>, LockerError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let contents =
            fs::read_to_string(&self.path).map_err(|_| LockerError::RegistryUnreadable)?;
        let entries: BTreeMap<String, String> =
            serde_json::from_str(&contents).map_err(|_| LockerError::RegistryUnreadable)?;

        Ok(entries
            .into_iter()
            .filter(|(title, _)| title != exclude_title)
            .collect())
    }

    fn load_lenient(&self) -> BTreeMap<String, String> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("Registry file unparsable, starting fresh: {}", e);
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_list_excludes_self() {
        let dir = tempfile::tempdir().unwrap();
        let registry = IdentityRegistry::new(dir.path().to_path_buf());

        registry.record_self("TitleX", "Ash_7").unwrap();
        registry.record_self("TitleY", "Misty_3").unwrap();
        registry.record_self("TitleZ", "Brock_9").unwrap();

        let others = registry.list_others("TitleX").unwrap();
        assert_eq!(others.len(), 2);
        assert!(others.iter().all(|(title, _)| title != "TitleX"));

        // Deterministic order across repeated reads.
        assert_eq!(others, registry.list_others("TitleX").unwrap());
        assert_eq!(others[0].0, "TitleY");
    }

    #[test]
    fn test_overwrite_keeps_one_entry_per_title() {
        let dir = tempfile::tempdir().unwrap();
        let registry = IdentityRegistry::new(dir.path().to_path_buf());

        registry.record_self("TitleX", "Ash_7").unwrap();
        registry.record_self("TitleX", "Ash_8").unwrap();

        let entries = registry.list_others("SomethingElse").unwrap();
        assert_eq!(entries, vec![("TitleX".to_string(), "Ash_8".to_string())]);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = IdentityRegistry::new(dir.path().join("nowhere"));
        assert!(registry.list_others("TitleX").unwrap().is_empty());
    }

    #[test]
    fn test_unparsable_file_reads_as_unreadable_but_writes_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let registry = IdentityRegistry::new(dir.path().to_path_buf());
        fs::write(dir.path().join(REGISTRY_FILE), "{ not json").unwrap();

        let err = registry.list_others("TitleX").unwrap_err();
        assert!(matches!(err, LockerError::RegistryUnreadable));

        // The write path starts over from empty.
        registry.record_self("TitleX", "Ash_7").unwrap();
        let entries = registry.list_others("Other").unwrap();
        assert_eq!(entries.len(), 1);
    }
}
