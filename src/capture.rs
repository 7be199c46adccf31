//! Credential capture workflow.
//!
//! One run rebuilds the profile store from scratch and fills it with two
//! logins: the local test registry under `local` and the remote registry under
//! `default`. Each login writes to a pending-capture file that is polled for,
//! copied into the store, and deleted. The run ends with `default` active.
//!
//! Steps run strictly in sequence. Switch operations are best effort; poll
//! timeouts and filesystem errors abort the run without rolling back.

use tracing::info;

use crate::config::{CaptureArgs, CaptureSettings};
use crate::error::{CaptureError, StoreError};
use crate::fs_utils::{ensure_ignore_entry, remove_if_exists};
use crate::login::{Login, LoginRequest};
use crate::poller::{PollConfig, await_file};
use crate::profiles::{BestEffort, DEFAULT_PROFILE, LOCAL_PROFILE, ProfileStore};

/// Outcome of a successful capture run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureReport {
    /// Check on which the local login's output appeared
    pub local_attempts: u32,
    /// Check on which the remote login's output appeared
    pub default_attempts: u32,
    /// Profile materialized at the active path when the run finished
    pub active: Option<String>,
}

pub struct CaptureWorkflow<'a> {
    store: &'a ProfileStore,
    login: &'a dyn Login,
}

impl<'a> CaptureWorkflow<'a> {
    pub fn new(store: &'a ProfileStore, login: &'a dyn Login) -> Self {
        Self { store, login }
    }

    /// Validate `args`, then run the whole capture
    ///
    /// Configuration errors are returned before anything on disk changes.
    pub async fn run(&self, args: &CaptureArgs) -> Result<CaptureReport, CaptureError> {
        let settings = CaptureSettings::resolve(args)?;
        let poll = args.poll.to_config()?;
        self.run_with(&settings, &poll).await
    }

    pub async fn run_with(
        &self,
        settings: &CaptureSettings,
        poll: &PollConfig,
    ) -> Result<CaptureReport, CaptureError> {
        let store = self.store;
        let paths = store.paths();

        store.reset()?;
        store.initialize().await.best_effort("initialize store");
        // init already yields `local`; registering it again is harmless
        store
            .create_profile(LOCAL_PROFILE)
            .await
            .best_effort("create profile 'local'");

        let entry = paths.store_ignore_entry();
        let changed = ensure_ignore_entry(&paths.ignore_file, &entry).map_err(|source| {
            CaptureError::IgnoreFile {
                path: paths.ignore_file.clone(),
                source,
            }
        })?;
        if changed {
            info!(file = %paths.ignore_file.display(), %entry, "store excluded from version control");
        }

        let local_request = settings.local_login(paths.pending_capture(LOCAL_PROFILE));
        let local_attempts = self.capture(LOCAL_PROFILE, &local_request, poll).await?;

        store
            .select_profile(DEFAULT_PROFILE)
            .await
            .best_effort("select profile 'default'");

        let default_request = settings.remote_login(paths.pending_capture(DEFAULT_PROFILE));
        let default_attempts = self.capture(DEFAULT_PROFILE, &default_request, poll).await?;

        for pending in [&local_request.output, &default_request.output] {
            remove_if_exists(pending).map_err(|e| StoreError::io("failed to remove", pending, e))?;
        }

        store
            .select_profile(DEFAULT_PROFILE)
            .await
            .best_effort("select profile 'default'");

        let report = CaptureReport {
            local_attempts,
            default_attempts,
            active: store.active_profile(),
        };
        info!(active = ?report.active, "capture finished");
        Ok(report)
    }

    /// Run one login and move its output into the store under `profile`
    async fn capture(
        &self,
        profile: &str,
        request: &LoginRequest,
        poll: &PollConfig,
    ) -> Result<u32, CaptureError> {
        // A leftover file from an aborted run would be captured as-is
        remove_if_exists(&request.output)
            .map_err(|e| StoreError::io("failed to remove", &request.output, e))?;

        self.login.start(request).await?;
        let captured = await_file(&request.output, poll).await?;
        self.store.save_active_blob(profile, &captured.content)?;

        info!(profile, attempts = captured.attempts, "login captured");
        Ok(captured.attempts)
    }
}
