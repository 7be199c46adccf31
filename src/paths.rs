use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};

use crate::error::ConfigError;

/// Default name of the profile store directory
pub const DEFAULT_STORE_DIR: &str = ".npmrcs";

/// Name of the active configuration file read by npm
pub const ACTIVE_CONFIG: &str = ".npmrc";

/// Name of the version-control ignore list amended by the capture run
pub const IGNORE_FILE: &str = ".gitignore";

/// All computed paths used by npmrc-switch, rooted at one working directory
#[derive(Debug, Clone)]
pub struct Paths {
    /// Working directory everything else hangs off
    pub root: PathBuf,
    /// <root>/.npmrcs
    pub store_dir: PathBuf,
    /// <root>/.npmrc
    pub active_config: PathBuf,
    /// <root>/.gitignore
    pub ignore_file: PathBuf,
}

impl Paths {
    /// Paths rooted at the process's current directory
    pub fn new() -> Result<Self> {
        let root = std::env::current_dir().context("Failed to determine current directory")?;
        Ok(Self::in_dir(root))
    }

    /// Paths rooted at `root` with the default store directory name
    pub fn in_dir(root: impl Into<PathBuf>) -> Self {
        Self::build(root.into(), DEFAULT_STORE_DIR)
    }

    /// Paths rooted at `root` with a custom store directory name
    ///
    /// The store is wiped on every capture run, so `store_name` must name a
    /// single directory directly inside `root`.
    pub fn with_store(root: impl Into<PathBuf>, store_name: &str) -> Result<Self, ConfigError> {
        validate_store_name(store_name)?;
        Ok(Self::build(root.into(), store_name))
    }

    fn build(root: PathBuf, store_name: &str) -> Self {
        Self {
            store_dir: root.join(store_name),
            active_config: root.join(ACTIVE_CONFIG),
            ignore_file: root.join(IGNORE_FILE),
            root,
        }
    }

    /// Get the path to a specific profile's stored blob
    pub fn profile_blob(&self, name: &str) -> PathBuf {
        self.store_dir.join(name)
    }

    /// Get the pending-capture path a login for `profile` writes to
    ///
    /// For the default layout this is `<root>/.npmrc_<profile>`.
    pub fn pending_capture(&self, profile: &str) -> PathBuf {
        let base = self
            .active_config
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(ACTIVE_CONFIG);
        self.root.join(format!("{}_{}", base, profile))
    }

    /// The entry that excludes the store directory from version control
    pub fn store_ignore_entry(&self) -> String {
        self.store_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_STORE_DIR.to_string())
    }

    /// Check if a path is within the store directory
    pub fn is_in_store(&self, path: &Path) -> bool {
        path.starts_with(&self.store_dir)
    }
}

/// Accept exactly one plain path component that is not one of the files the
/// store sits next to
fn validate_store_name(name: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::Invalid {
        flag: "store",
        reason: format!("'{}' {}", name, reason),
    };

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => {}
        _ => return Err(invalid("must be a single directory name inside the project")),
    }

    let trimmed = name.trim_end_matches(['/', '\\']);
    if trimmed == ACTIVE_CONFIG || trimmed == IGNORE_FILE {
        return Err(invalid("collides with a file managed next to the store"));
    }

    Ok(())
}
