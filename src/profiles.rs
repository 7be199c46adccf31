//! Profile store.
//!
//! This module handles the "data model" of profiles:
//! - Resetting and initializing the store
//! - Creating, selecting and saving profiles
//! - Listing available profiles and the active one
//! - Validating profile names
//!
//! The store is a directory with one file per profile. Which profile is active
//! is decided by the [`Switcher`] backend and read back from the active
//! configuration file.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::fs_utils::remove_if_exists;
use crate::paths::Paths;
use crate::switch::{ActiveStatus, Switcher};

/// Profile created by store initialization, holding the local registry login
pub const LOCAL_PROFILE: &str = "local";

/// Profile holding the remote registry login, active after a capture run
pub const DEFAULT_PROFILE: &str = "default";

/// Validate profile name
///
/// Only allows alphanumeric characters, underscores, and hyphens.
pub fn validate_profile_name(name: &str) -> Result<(), StoreError> {
    let valid = !name.is_empty()
        && name.chars().count() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_string()))
    }
}

/// Summary of one stored profile
#[derive(Debug, Clone, Serialize)]
pub struct ProfileInfo {
    pub name: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    pub active: bool,
}

/// Explicit "log and carry on" policy for store operations
///
/// Switch operations are best effort: a failure must not abort the caller,
/// but it is never dropped silently either.
pub trait BestEffort {
    /// Log a failure as a warning and report whether the operation succeeded
    fn best_effort(self, action: &str) -> bool;
}

impl BestEffort for Result<(), StoreError> {
    fn best_effort(self, action: &str) -> bool {
        match self {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "{} failed, continuing", action);
                false
            }
        }
    }
}

/// Directory-backed collection of named configuration snapshots
pub struct ProfileStore {
    paths: Paths,
    switcher: Box<dyn Switcher>,
}

impl ProfileStore {
    pub fn new(paths: Paths, switcher: Box<dyn Switcher>) -> Self {
        Self { paths, switcher }
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    /// Delete the store directory and the active configuration
    ///
    /// Idempotent: missing targets are not an error.
    pub fn reset(&self) -> Result<(), StoreError> {
        for path in [&self.paths.store_dir, &self.paths.active_config] {
            if remove_if_exists(path).map_err(|e| StoreError::io("failed to remove", path, e))? {
                debug!(path = %path.display(), "removed");
            }
        }
        Ok(())
    }

    /// Create the store; yields the initial profile `local`
    pub async fn initialize(&self) -> Result<(), StoreError> {
        info!(store = %self.paths.store_dir.display(), "initializing profile store");
        self.switcher.init(&self.paths).await
    }

    /// Register a new profile
    ///
    /// An existing name fails with [`StoreError::AlreadyExists`].
    pub async fn create_profile(&self, name: &str) -> Result<(), StoreError> {
        info!(profile = name, "creating profile");
        self.switcher.create(&self.paths, name).await
    }

    /// Make `name` the active profile and materialize it at the active path
    pub async fn select_profile(&self, name: &str) -> Result<(), StoreError> {
        info!(profile = name, "selecting profile");
        self.switcher.activate(&self.paths, name).await
    }

    /// Persist `content` as the blob for `name`, active or not
    pub fn save_active_blob(&self, name: &str, content: &[u8]) -> Result<(), StoreError> {
        validate_profile_name(name)?;

        fs::create_dir_all(&self.paths.store_dir)
            .map_err(|e| StoreError::io("failed to create store", &self.paths.store_dir, e))?;

        let blob = self.paths.profile_blob(name);
        fs::write(&blob, content).map_err(|e| StoreError::io("failed to write", &blob, e))?;
        debug!(profile = name, bytes = content.len(), "profile saved");
        Ok(())
    }

    /// Read the stored blob for `name`
    pub fn read_blob(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        validate_profile_name(name)?;
        let blob = self.paths.profile_blob(name);
        fs::read(&blob).map_err(|e| StoreError::io("failed to read", &blob, e))
    }

    /// Check if a profile exists
    pub fn profile_exists(&self, name: &str) -> bool {
        validate_profile_name(name).is_ok() && self.paths.profile_blob(name).is_file()
    }

    /// Name of the profile currently materialized at the active path
    pub fn active_profile(&self) -> Option<String> {
        ActiveStatus::detect(&self.paths.active_config).profile_name(&self.paths)
    }

    /// List stored profiles, sorted by name
    pub fn list_profiles(&self) -> Result<Vec<ProfileInfo>, StoreError> {
        let store_dir = &self.paths.store_dir;
        if !store_dir.exists() {
            return Ok(Vec::new());
        }

        let active = self.active_profile();
        let mut profiles = Vec::new();
        for entry in
            fs::read_dir(store_dir).map_err(|e| StoreError::io("failed to read", store_dir, e))?
        {
            let entry = entry.map_err(|e| StoreError::io("failed to read", store_dir, e))?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            let metadata = entry
                .metadata()
                .map_err(|e| StoreError::io("failed to inspect", entry.path(), e))?;
            if !metadata.is_file() {
                continue;
            }

            profiles.push(ProfileInfo {
                active: active.as_deref() == Some(name.as_str()),
                size: metadata.len(),
                modified: metadata.modified().ok().map(DateTime::<Utc>::from),
                name,
            });
        }
        profiles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(profiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::switch::NativeSwitcher;
    use crate::test_utils::{FailingSwitcher, setup_test_paths};
    use tempfile::TempDir;

    fn native_store(temp_dir: &TempDir) -> ProfileStore {
        ProfileStore::new(setup_test_paths(temp_dir), Box::new(NativeSwitcher))
    }

    fn names(store: &ProfileStore) -> Vec<String> {
        store
            .list_profiles()
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect()
    }

    #[test]
    fn test_profile_name_validation() {
        assert!(validate_profile_name("local").is_ok());
        assert!(validate_profile_name("my-profile").is_ok());
        assert!(validate_profile_name("test_123").is_ok());

        assert!(validate_profile_name("").is_err());
        assert!(validate_profile_name("invalid name").is_err());
        assert!(validate_profile_name("test/profile").is_err());
        assert!(validate_profile_name(".hidden").is_err());
        assert!(validate_profile_name(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_reset_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let store = native_store(&temp_dir);

        store.reset().unwrap();
        store.save_active_blob(LOCAL_PROFILE, b"x").unwrap();
        fs::write(&store.paths().active_config, "y").unwrap();

        store.reset().unwrap();
        store.reset().unwrap();
        assert!(!store.paths().store_dir.exists());
        assert!(!store.paths().active_config.exists());
    }

    #[tokio::test]
    async fn test_reset_then_initialize_yields_only_local() {
        let temp_dir = TempDir::new().unwrap();
        let store = native_store(&temp_dir);
        store.save_active_blob("stale", b"old").unwrap();
        store.save_active_blob(DEFAULT_PROFILE, b"old").unwrap();

        store.reset().unwrap();
        store.initialize().await.unwrap();

        assert_eq!(names(&store), vec![LOCAL_PROFILE]);
        assert_eq!(store.active_profile().as_deref(), Some(LOCAL_PROFILE));
    }

    #[tokio::test]
    async fn test_save_then_select_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = native_store(&temp_dir);
        store.initialize().await.unwrap();

        for (name, content) in [
            ("work", &b"//npm.work/:_authToken=w"[..]),
            ("local", &b"@acme:registry=http://127.0.0.1:4873\n"[..]),
            ("empty", &b""[..]),
        ] {
            store.save_active_blob(name, content).unwrap();
            store.select_profile(name).await.unwrap();
            assert_eq!(fs::read(&store.paths().active_config).unwrap(), content);
            assert_eq!(store.active_profile().as_deref(), Some(name));
        }
    }

    #[tokio::test]
    async fn test_save_inactive_profile_leaves_active_alone() {
        let temp_dir = TempDir::new().unwrap();
        let store = native_store(&temp_dir);
        store.initialize().await.unwrap();
        store.save_active_blob(LOCAL_PROFILE, b"local").unwrap();

        store.save_active_blob(DEFAULT_PROFILE, b"remote").unwrap();

        assert_eq!(store.active_profile().as_deref(), Some(LOCAL_PROFILE));
        assert_eq!(fs::read(&store.paths().active_config).unwrap(), b"local");
        assert_eq!(store.read_blob(DEFAULT_PROFILE).unwrap(), b"remote");
    }

    #[tokio::test]
    async fn test_list_marks_active() {
        let temp_dir = TempDir::new().unwrap();
        let store = native_store(&temp_dir);
        store.initialize().await.unwrap();
        store.save_active_blob(DEFAULT_PROFILE, b"abc").unwrap();
        store.select_profile(DEFAULT_PROFILE).await.unwrap();

        let profiles = store.list_profiles().unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].name, DEFAULT_PROFILE);
        assert!(profiles[0].active);
        assert_eq!(profiles[0].size, 3);
        assert_eq!(profiles[1].name, LOCAL_PROFILE);
        assert!(!profiles[1].active);
    }

    #[test]
    fn test_list_missing_store() {
        let temp_dir = TempDir::new().unwrap();
        let store = native_store(&temp_dir);
        assert!(store.list_profiles().unwrap().is_empty());
        assert!(store.active_profile().is_none());
    }

    #[tokio::test]
    async fn test_best_effort_reports_failure() {
        let temp_dir = TempDir::new().unwrap();
        let store = ProfileStore::new(setup_test_paths(&temp_dir), Box::new(FailingSwitcher));

        assert!(!store.initialize().await.best_effort("initialize store"));
        assert!(!store.select_profile(DEFAULT_PROFILE).await.best_effort("select"));
        assert!(Ok::<(), StoreError>(()).best_effort("noop"));
    }
}
