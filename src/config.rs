//! Capture run configuration.
//!
//! Flags arrive as [`CaptureArgs`] with everything optional, so that a missing
//! required value is reported by [`CaptureSettings::resolve`] as a
//! [`ConfigError`] before the run touches the filesystem.

use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::login::LoginRequest;
use crate::poller::PollConfig;

pub const DEFAULT_LOCAL_USERNAME: &str = "verdaccio";
pub const DEFAULT_LOCAL_PASSWORD: &str = "verdaccio";
pub const DEFAULT_LOCAL_EMAIL: &str = "test@verdaccio.com";
pub const DEFAULT_LOCAL_REGISTRY: &str = "http://127.0.0.1:4873";

/// Flags for the capture run
#[derive(Debug, Clone, Default, Args)]
pub struct CaptureArgs {
    /// Access token for the remote registry (required)
    #[arg(long, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Package scope the logins are bound to, e.g. @acme (required)
    #[arg(long, value_name = "SCOPE")]
    pub scope: Option<String>,

    /// URL of the remote registry (required)
    #[arg(long, value_name = "URL")]
    pub registry: Option<String>,

    /// Username for both logins [default: verdaccio]
    #[arg(long = "localUsername", value_name = "NAME")]
    pub local_username: Option<String>,

    /// Password for the local registry [default: verdaccio]
    #[arg(long = "localPassword", value_name = "PASSWORD")]
    pub local_password: Option<String>,

    /// Email for both logins [default: test@verdaccio.com]
    #[arg(long = "localEmail", value_name = "EMAIL")]
    pub local_email: Option<String>,

    /// URL of the local test registry [default: http://127.0.0.1:4873]
    #[arg(long = "localRegistry", value_name = "URL")]
    pub local_registry: Option<String>,

    #[command(flatten)]
    pub poll: PollArgs,
}

/// Flags controlling how long to wait for each login's output
#[derive(Debug, Clone, Args)]
pub struct PollArgs {
    /// Number of checks for a login's output file before giving up
    #[arg(long, value_name = "N", default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_attempts: u32,

    /// Growth factor of the delay between checks
    #[arg(long, value_name = "FACTOR", default_value_t = 3.0)]
    pub backoff_factor: f64,

    /// Delay before the second check, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 1000)]
    pub initial_delay_ms: u64,
}

impl Default for PollArgs {
    fn default() -> Self {
        let config = PollConfig::default();
        Self {
            max_attempts: config.max_attempts,
            backoff_factor: config.backoff_factor,
            initial_delay_ms: config.initial_delay.as_millis() as u64,
        }
    }
}

impl PollArgs {
    pub fn to_config(&self) -> Result<PollConfig, ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                flag: "max-attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor <= 0.0 {
            return Err(ConfigError::Invalid {
                flag: "backoff-factor",
                reason: format!("expected a positive number, got {}", self.backoff_factor),
            });
        }

        Ok(PollConfig {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            backoff_factor: self.backoff_factor,
        })
    }
}

/// Validated capture configuration
#[derive(Clone, PartialEq, Eq)]
pub struct CaptureSettings {
    pub token: String,
    pub scope: String,
    pub registry: String,
    pub local_username: String,
    pub local_password: String,
    pub local_email: String,
    pub local_registry: String,
}

impl std::fmt::Debug for CaptureSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSettings")
            .field("token", &"<redacted>")
            .field("scope", &self.scope)
            .field("registry", &self.registry)
            .field("local_username", &self.local_username)
            .field("local_password", &"<redacted>")
            .field("local_email", &self.local_email)
            .field("local_registry", &self.local_registry)
            .finish()
    }
}

fn required(value: &Option<String>, flag: &'static str) -> Result<String, ConfigError> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ConfigError::Missing(flag)),
    }
}

fn or_default(value: &Option<String>, default: &str) -> String {
    match value.as_deref() {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

impl CaptureSettings {
    /// Check required flags in order and fill in defaults
    pub fn resolve(args: &CaptureArgs) -> Result<Self, ConfigError> {
        Ok(Self {
            token: required(&args.token, "token")?,
            scope: required(&args.scope, "scope")?,
            registry: required(&args.registry, "registry")?,
            local_username: or_default(&args.local_username, DEFAULT_LOCAL_USERNAME),
            local_password: or_default(&args.local_password, DEFAULT_LOCAL_PASSWORD),
            local_email: or_default(&args.local_email, DEFAULT_LOCAL_EMAIL),
            local_registry: or_default(&args.local_registry, DEFAULT_LOCAL_REGISTRY),
        })
    }

    /// Login against the local test registry
    pub fn local_login(&self, output: PathBuf) -> LoginRequest {
        LoginRequest {
            username: self.local_username.clone(),
            secret: self.local_password.clone(),
            email: self.local_email.clone(),
            registry: self.local_registry.clone(),
            scope: self.scope.clone(),
            output,
        }
    }

    /// Login against the remote registry, authenticated by token
    pub fn remote_login(&self, output: PathBuf) -> LoginRequest {
        LoginRequest {
            username: self.local_username.clone(),
            secret: self.token.clone(),
            email: self.local_email.clone(),
            registry: self.registry.clone(),
            scope: self.scope.clone(),
            output,
        }
    }
}
