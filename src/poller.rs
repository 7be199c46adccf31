//! Waiting for files written by an out-of-band process.
//!
//! The external login gives no completion signal; the only evidence that it
//! finished is its output file. [`await_file`] checks for that file on an
//! exponential backoff schedule and returns its content the first time it is
//! seen. There is no stabilization wait, so a producer still mid-write can be
//! observed with partial content.

use std::io;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, trace};

use crate::error::PollError;

/// Backoff schedule for a polling wait
#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    /// Total number of checks, including the first one (at least 1)
    pub max_attempts: u32,
    /// Delay between the first and second check
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after every further check
    pub backoff_factor: f64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            backoff_factor: 3.0,
        }
    }
}

impl PollConfig {
    /// Delay to wait after failed check number `attempt` (1-based)
    ///
    /// The first delay is unscaled, then ×factor, ×factor², …
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Content captured from a pending file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captured {
    pub content: Vec<u8>,
    /// The check on which the file was first observed (1-based)
    pub attempts: u32,
}

/// Wait for `path` to exist and return its full content
pub async fn await_file(path: &Path, config: &PollConfig) -> Result<Captured, PollError> {
    let (content, attempts) = poll_until(config, path, || match std::fs::read(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    })
    .await?;

    Ok(Captured { content, attempts })
}

/// Run `probe` on the backoff schedule until it yields a value
///
/// `path` only labels errors and log events. Returns the value together with
/// the attempt number it was produced on.
pub async fn poll_until<T, F>(
    config: &PollConfig,
    path: &Path,
    mut probe: F,
) -> Result<(T, u32), PollError>
where
    F: FnMut() -> io::Result<Option<T>>,
{
    let max_attempts = config.attempts();

    for attempt in 1..=max_attempts {
        match probe() {
            Ok(Some(value)) => {
                debug!(path = %path.display(), attempt, "pending capture observed");
                return Ok((value, attempt));
            }
            Ok(None) => {}
            Err(source) => {
                return Err(PollError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        }

        if attempt < max_attempts {
            let delay = config.delay_after(attempt);
            trace!(path = %path.display(), attempt, ?delay, "pending capture absent, retrying");
            tokio::time::sleep(delay).await;
        }
    }

    Err(PollError::Timeout {
        path: path.to_path_buf(),
        attempts: max_attempts,
    })
}
