//! Test utilities shared across test modules
//!
//! This module provides common helpers and fake collaborators for testing,
//! avoiding duplication across multiple test suites.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use crate::error::{LoginError, StoreError};
use crate::login::{Login, LoginRequest};
use crate::paths::Paths;
use crate::switch::{NativeSwitcher, Switcher};

/// Create a Paths struct for testing rooted at a temporary directory
pub fn setup_test_paths(temp_dir: &TempDir) -> Paths {
    Paths::in_dir(temp_dir.path())
}

/// Switcher whose every operation fails, like a broken `npx npmrc`
pub struct FailingSwitcher;

impl FailingSwitcher {
    fn error(action: &str) -> StoreError {
        StoreError::Command {
            command: format!("npx npmrc {}", action),
            status: "exit status: 1".to_string(),
            stderr: "npmrc: command failed".to_string(),
        }
    }
}

#[async_trait]
impl Switcher for FailingSwitcher {
    async fn init(&self, _paths: &Paths) -> Result<(), StoreError> {
        Err(Self::error(""))
    }

    async fn create(&self, _paths: &Paths, name: &str) -> Result<(), StoreError> {
        Err(Self::error(&format!("-c {}", name)))
    }

    async fn activate(&self, _paths: &Paths, name: &str) -> Result<(), StoreError> {
        Err(Self::error(name))
    }
}

/// Native switcher that records every call it receives
#[derive(Default)]
pub struct RecordingSwitcher {
    calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingSwitcher {
    pub fn calls(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.calls)
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Switcher for RecordingSwitcher {
    async fn init(&self, paths: &Paths) -> Result<(), StoreError> {
        self.record("init".to_string());
        NativeSwitcher.init(paths).await
    }

    async fn create(&self, paths: &Paths, name: &str) -> Result<(), StoreError> {
        self.record(format!("create {}", name));
        NativeSwitcher.create(paths, name).await
    }

    async fn activate(&self, paths: &Paths, name: &str) -> Result<(), StoreError> {
        self.record(format!("activate {}", name));
        NativeSwitcher.activate(paths, name).await
    }
}

/// Login that writes canned content to its output file after a delay
///
/// Outputs are matched by file name; a login with no script entry never
/// writes anything.
#[derive(Default)]
pub struct ScriptedLogin {
    script: Vec<(String, Vec<u8>, Duration)>,
    requests: Mutex<Vec<LoginRequest>>,
}

impl ScriptedLogin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(mut self, file_name: &str, content: &str, after: Duration) -> Self {
        self.script
            .push((file_name.to_string(), content.as_bytes().to_vec(), after));
        self
    }

    pub fn requests(&self) -> Vec<LoginRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Login for ScriptedLogin {
    async fn start(&self, request: &LoginRequest) -> Result<(), LoginError> {
        self.requests.lock().unwrap().push(request.clone());

        let file_name = request
            .output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        let entry = self
            .script
            .iter()
            .find(|(name, _, _)| Some(name) == file_name.as_ref());

        if let Some((_, content, after)) = entry {
            let output = request.output.clone();
            let content = content.clone();
            let after = *after;
            tokio::spawn(async move {
                tokio::time::sleep(after).await;
                std::fs::write(&output, content).expect("write scripted login output");
            });
        }
        Ok(())
    }
}
