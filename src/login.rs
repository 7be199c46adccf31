//! Launching the external registry login.
//!
//! A login authenticates against a registry and eventually writes an npmrc
//! fragment to its output path. Starting it is all [`Login::start`] does;
//! completion is only observable through that file (see [`crate::poller`]).

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::LoginError;

/// Everything one login needs
#[derive(Clone, PartialEq, Eq)]
pub struct LoginRequest {
    pub username: String,
    /// Password for the local registry, access token for the remote one
    pub secret: String,
    pub email: String,
    pub registry: String,
    pub scope: String,
    /// Where the login writes its credentials
    pub output: PathBuf,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .field("email", &self.email)
            .field("registry", &self.registry)
            .field("scope", &self.scope)
            .field("output", &self.output)
            .finish()
    }
}

/// The mechanism that performs a registry login out of band
#[async_trait]
pub trait Login: Send + Sync {
    /// Start a login; returns once it is launched, not once it has finished
    async fn start(&self, request: &LoginRequest) -> Result<(), LoginError>;
}

/// Login through the `npm-cli-login` tool, launched with `npx`
#[derive(Debug, Clone)]
pub struct NpmCliLogin {
    program: String,
    prefix: Vec<String>,
    working_dir: PathBuf,
}

impl NpmCliLogin {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self::with_program(working_dir, "npx", ["npm-cli-login"])
    }

    /// Use a different launcher, e.g. a globally installed `npm-cli-login`
    pub fn with_program<I, S>(
        working_dir: impl Into<PathBuf>,
        program: impl Into<String>,
        prefix: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            prefix: prefix.into_iter().map(Into::into).collect(),
            working_dir: working_dir.into(),
        }
    }

    fn args(request: &LoginRequest) -> Vec<String> {
        vec![
            "-u".into(),
            request.username.clone(),
            "-p".into(),
            request.secret.clone(),
            "-e".into(),
            request.email.clone(),
            "-r".into(),
            request.registry.clone(),
            "-s".into(),
            request.scope.clone(),
            "--config-path".into(),
            request.output.to_string_lossy().into_owned(),
        ]
    }
}

#[async_trait]
impl Login for NpmCliLogin {
    async fn start(&self, request: &LoginRequest) -> Result<(), LoginError> {
        let command = format!("{} {}", self.program, self.prefix.join(" "));
        let child = Command::new(&self.program)
            .args(&self.prefix)
            .args(Self::args(request))
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .spawn()
            .map_err(|source| LoginError::Spawn {
                command: command.clone(),
                source,
            })?;

        info!(
            registry = %request.registry,
            scope = %request.scope,
            output = %request.output.display(),
            "login started"
        );
        watch_exit(command, child);
        Ok(())
    }
}

/// Record how a detached login ended
///
/// The poller still decides success by the output file; this only leaves a
/// trace in the log when the login process itself failed.
fn watch_exit(command: String, mut child: Child) -> JoinHandle<Option<ExitStatus>> {
    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) if status.success() => {
                debug!(%command, %status, "login exited");
                Some(status)
            }
            Ok(status) => {
                warn!(%command, %status, "login exited unsuccessfully");
                Some(status)
            }
            Err(e) => {
                warn!(%command, error = %e, "failed to wait for login");
                None
            }
        }
    })
}
