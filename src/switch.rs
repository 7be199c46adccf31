//! Profile switching backends.
//!
//! Switching is what the profile store delegates: initializing the store,
//! registering a profile, and making a profile the active one. Two backends
//! implement [`Switcher`]:
//! - [`NativeSwitcher`] does the work in-process. The active configuration
//!   becomes a symlink into the store, which is also how the active profile is
//!   recorded.
//! - [`NpmrcCommand`] shells out to the `npmrc` tool via `npx`, pointing it at
//!   our store and active file through `NPMRC_STORE` and `NPMRC`.

use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::fs_utils::remove_if_exists;
use crate::paths::Paths;
use crate::profiles::{LOCAL_PROFILE, validate_profile_name};

/// The mechanism that initializes the store and moves the active pointer
#[async_trait]
pub trait Switcher: Send + Sync {
    /// Create the store, yielding an initial active profile
    async fn init(&self, paths: &Paths) -> Result<(), StoreError>;

    /// Register a new, empty profile and make it active
    async fn create(&self, paths: &Paths, name: &str) -> Result<(), StoreError>;

    /// Make `name` the active profile
    async fn activate(&self, paths: &Paths, name: &str) -> Result<(), StoreError>;
}

/// Represents the status of the active configuration file
#[derive(Debug, PartialEq, Eq)]
pub enum ActiveStatus {
    Missing,
    RegularFile,
    Symlink { target: PathBuf },
    BrokenSymlink { target: PathBuf },
}

impl ActiveStatus {
    pub fn detect(path: &Path) -> Self {
        // symlink_metadata does not follow the link
        match fs::symlink_metadata(path) {
            Ok(meta) if meta.file_type().is_symlink() => {
                let target = fs::read_link(path).unwrap_or_default();
                if path.exists() {
                    Self::Symlink { target }
                } else {
                    Self::BrokenSymlink { target }
                }
            }
            Ok(_) => Self::RegularFile,
            Err(_) => Self::Missing,
        }
    }

    /// Name of the store profile this link points at, if any
    pub fn profile_name(&self, paths: &Paths) -> Option<String> {
        let Self::Symlink { target } = self else {
            return None;
        };

        let resolved = if target.is_relative() {
            paths
                .active_config
                .parent()
                .map(|p| p.join(target))
                .unwrap_or_else(|| target.clone())
        } else {
            target.clone()
        };

        if resolved.parent() != Some(paths.store_dir.as_path()) {
            return None;
        }
        resolved
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
    }
}

/// In-process switcher working directly on the filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeSwitcher;

#[async_trait]
impl Switcher for NativeSwitcher {
    async fn init(&self, paths: &Paths) -> Result<(), StoreError> {
        fs::create_dir_all(&paths.store_dir)
            .map_err(|e| StoreError::io("failed to create store", &paths.store_dir, e))?;

        if store_has_profiles(&paths.store_dir)? {
            debug!(store = %paths.store_dir.display(), "store already initialized");
            return Ok(());
        }

        let initial = paths.profile_blob(LOCAL_PROFILE);
        if ActiveStatus::detect(&paths.active_config) == ActiveStatus::RegularFile {
            // Adopt the existing configuration as the first profile
            fs::rename(&paths.active_config, &initial).map_err(|e| {
                StoreError::io("failed to adopt", &paths.active_config, e)
            })?;
            debug!(profile = LOCAL_PROFILE, "adopted existing configuration");
        } else {
            fs::write(&initial, b"")
                .map_err(|e| StoreError::io("failed to create profile", &initial, e))?;
        }

        link_active(paths, LOCAL_PROFILE)
    }

    async fn create(&self, paths: &Paths, name: &str) -> Result<(), StoreError> {
        validate_profile_name(name)?;

        let blob = paths.profile_blob(name);
        if fs::symlink_metadata(&blob).is_ok() {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }

        fs::create_dir_all(&paths.store_dir)
            .map_err(|e| StoreError::io("failed to create store", &paths.store_dir, e))?;
        fs::write(&blob, b"").map_err(|e| StoreError::io("failed to create profile", &blob, e))?;

        link_active(paths, name)
    }

    async fn activate(&self, paths: &Paths, name: &str) -> Result<(), StoreError> {
        validate_profile_name(name)?;

        let blob = paths.profile_blob(name);
        if !blob.exists() {
            debug!(profile = name, "registering profile with an empty blob");
            fs::create_dir_all(&paths.store_dir)
                .map_err(|e| StoreError::io("failed to create store", &paths.store_dir, e))?;
            fs::write(&blob, b"")
                .map_err(|e| StoreError::io("failed to create profile", &blob, e))?;
        }

        link_active(paths, name)
    }
}

fn store_has_profiles(store_dir: &Path) -> Result<bool, StoreError> {
    let entries =
        fs::read_dir(store_dir).map_err(|e| StoreError::io("failed to read store", store_dir, e))?;
    Ok(entries
        .filter_map(|e| e.ok())
        .any(|e| !e.file_name().to_string_lossy().starts_with('.')))
}

/// Point the active configuration at a profile's blob
fn link_active(paths: &Paths, name: &str) -> Result<(), StoreError> {
    let link = &paths.active_config;

    if ActiveStatus::detect(link) == ActiveStatus::RegularFile {
        warn!(path = %link.display(), "replacing configuration that is not managed by the store");
    }
    remove_if_exists(link).map_err(|e| StoreError::io("failed to remove", link, e))?;

    // Relative targets keep the link valid if the project directory moves
    let target = paths.profile_blob(name);
    let target = link
        .parent()
        .and_then(|parent| target.strip_prefix(parent).ok())
        .map(Path::to_path_buf)
        .unwrap_or(target);

    make_symlink(&target, link)?;
    debug!(profile = name, "active profile switched");
    Ok(())
}

fn make_symlink(target: &Path, link: &Path) -> Result<(), StoreError> {
    #[cfg(unix)]
    std::os::unix::fs::symlink(target, link)
        .map_err(|e| StoreError::io("failed to create symlink", link, e))?;

    #[cfg(windows)]
    std::os::windows::fs::symlink_file(target, link)
        .map_err(|e| StoreError::io("failed to create symlink", link, e))?;

    Ok(())
}

/// Switcher delegating to the `npmrc` command-line tool
#[derive(Debug, Clone)]
pub struct NpmrcCommand {
    program: String,
    prefix: Vec<String>,
}

impl Default for NpmrcCommand {
    fn default() -> Self {
        Self::with_program("npx", ["npmrc"])
    }
}

impl NpmrcCommand {
    /// Use a different launcher, e.g. a globally installed `npmrc`
    pub fn with_program<I, S>(program: impl Into<String>, prefix: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            prefix: prefix.into_iter().map(Into::into).collect(),
        }
    }

    async fn run(&self, paths: &Paths, args: &[&str]) -> Result<(), StoreError> {
        let command = std::iter::once(self.program.as_str())
            .chain(self.prefix.iter().map(String::as_str))
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");

        let output = Command::new(&self.program)
            .args(&self.prefix)
            .args(args)
            .env("NPMRC_STORE", &paths.store_dir)
            .env("NPMRC", &paths.active_config)
            .current_dir(&paths.root)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| StoreError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(StoreError::Command {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        debug!(%command, "npmrc finished");
        Ok(())
    }
}

#[async_trait]
impl Switcher for NpmrcCommand {
    async fn init(&self, paths: &Paths) -> Result<(), StoreError> {
        self.run(paths, &[]).await
    }

    async fn create(&self, paths: &Paths, name: &str) -> Result<(), StoreError> {
        validate_profile_name(name)?;
        self.run(paths, &["-c", name]).await
    }

    async fn activate(&self, paths: &Paths, name: &str) -> Result<(), StoreError> {
        validate_profile_name(name)?;
        self.run(paths, &[name]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_paths;
    use tempfile::TempDir;

    #[test]
    fn test_active_status_detect() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);

        // 1. Missing
        assert_eq!(ActiveStatus::detect(&paths.active_config), ActiveStatus::Missing);

        // 2. Regular file
        fs::write(&paths.active_config, "registry=x").unwrap();
        assert_eq!(
            ActiveStatus::detect(&paths.active_config),
            ActiveStatus::RegularFile
        );

        // 3. Symlink into the store
        fs::remove_file(&paths.active_config).unwrap();
        fs::create_dir_all(&paths.store_dir).unwrap();
        fs::write(paths.profile_blob("work"), "registry=y").unwrap();
        make_symlink(&paths.profile_blob("work"), &paths.active_config).unwrap();

        let status = ActiveStatus::detect(&paths.active_config);
        assert!(matches!(status, ActiveStatus::Symlink { .. }));
        assert_eq!(status.profile_name(&paths), Some("work".to_string()));

        // 4. Broken symlink
        fs::remove_file(paths.profile_blob("work")).unwrap();
        let status = ActiveStatus::detect(&paths.active_config);
        assert!(matches!(status, ActiveStatus::BrokenSymlink { .. }));
        assert_eq!(status.profile_name(&paths), None);
    }

    #[test]
    fn test_symlink_outside_store_has_no_profile() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);

        let elsewhere = temp_dir.path().join("other.npmrc");
        fs::write(&elsewhere, "").unwrap();
        make_symlink(&elsewhere, &paths.active_config).unwrap();

        let status = ActiveStatus::detect(&paths.active_config);
        assert!(matches!(status, ActiveStatus::Symlink { .. }));
        assert_eq!(status.profile_name(&paths), None);
    }

    #[tokio::test]
    async fn test_native_init_creates_local() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);

        NativeSwitcher.init(&paths).await.unwrap();

        assert!(paths.profile_blob(LOCAL_PROFILE).exists());
        let status = ActiveStatus::detect(&paths.active_config);
        assert_eq!(status.profile_name(&paths), Some(LOCAL_PROFILE.to_string()));
    }

    #[tokio::test]
    async fn test_native_init_adopts_existing_config() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        fs::write(&paths.active_config, "//registry/:_authToken=old").unwrap();

        NativeSwitcher.init(&paths).await.unwrap();

        assert_eq!(
            fs::read_to_string(paths.profile_blob(LOCAL_PROFILE)).unwrap(),
            "//registry/:_authToken=old"
        );
        assert_eq!(
            fs::read_to_string(&paths.active_config).unwrap(),
            "//registry/:_authToken=old"
        );
    }

    #[tokio::test]
    async fn test_native_create_duplicate() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);

        NativeSwitcher.init(&paths).await.unwrap();
        let err = NativeSwitcher.create(&paths, LOCAL_PROFILE).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(name) if name == LOCAL_PROFILE));
    }

    #[tokio::test]
    async fn test_native_activate_registers_missing_profile() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);

        NativeSwitcher.init(&paths).await.unwrap();
        NativeSwitcher.activate(&paths, "default").await.unwrap();

        assert!(paths.profile_blob("default").exists());
        assert_eq!(fs::read(&paths.active_config).unwrap(), b"");
        let status = ActiveStatus::detect(&paths.active_config);
        assert_eq!(status.profile_name(&paths), Some("default".to_string()));
    }

    #[tokio::test]
    async fn test_native_rejects_bad_name() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);

        let err = NativeSwitcher.activate(&paths, "../escape").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidName(_)));
        assert!(!paths.active_config.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_npmrc_command_environment() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);

        let switcher = NpmrcCommand::with_program(
            "sh",
            [
                "-c",
                r#"printf '%s|%s|%s' "$NPMRC_STORE" "$NPMRC" "$1" > invoked"#,
                "npmrc",
            ],
        );
        switcher.activate(&paths, "default").await.unwrap();

        let invoked = fs::read_to_string(temp_dir.path().join("invoked")).unwrap();
        assert_eq!(
            invoked,
            format!(
                "{}|{}|default",
                paths.store_dir.display(),
                paths.active_config.display()
            )
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_npmrc_command_failure() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);

        let switcher = NpmrcCommand::with_program("sh", ["-c", "echo nope >&2; exit 3", "npmrc"]);
        let err = switcher.init(&paths).await.unwrap_err();
        match err {
            StoreError::Command { stderr, .. } => assert_eq!(stderr, "nope"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_npmrc_command_missing_program() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);

        let switcher = NpmrcCommand::with_program("npmrc-switch-no-such-program", Vec::<String>::new());
        let err = switcher.init(&paths).await.unwrap_err();
        assert!(matches!(err, StoreError::Spawn { .. }));
    }
}
