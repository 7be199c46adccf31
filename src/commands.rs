//! High-level command orchestration for the CLI.
//!
//! This module contains the handler functions for each CLI command (the
//! capture run, `list`, `current`, `use`). It serves as the coordination
//! layer, interacting with:
//! - `crate::ui` for user interaction (output, prompts, spinners).
//! - `crate::profiles` for the profile store.
//! - `crate::capture` for the credential capture workflow.
//!
//! Each function here generally corresponds to a subcommand in `main.rs`.

use anyhow::{Context, Result, bail};
use inquire::Select;

use crate::capture::CaptureWorkflow;
use crate::config::CaptureArgs;
use crate::error::{CaptureError, PollError};
use crate::login::Login;
use crate::profiles::{DEFAULT_PROFILE, ProfileStore};
use crate::ui::{Tone, Ui};

/// Run the credential capture and show the resulting store
pub async fn capture(
    store: &ProfileStore,
    login: &dyn Login,
    args: &CaptureArgs,
    ui: &Ui,
) -> Result<()> {
    let spinner = ui.spinner("Capturing registry logins...");

    let report = match CaptureWorkflow::new(store, login).run(args).await {
        Ok(report) => report,
        Err(e) => {
            ui.spinner_finish_err(&spinner, format!("Capture failed: {}", e));
            return Err(with_hint(e));
        }
    };

    ui.spinner_finish_ok(&spinner, "Captured registry logins");
    ui.newline();
    list(store, ui, false)?;

    if report.active.as_deref() != Some(DEFAULT_PROFILE) {
        ui.newline();
        ui.warn(format!(
            "Profile '{}' is not active. Switching reported errors; rerun with -v for details.",
            DEFAULT_PROFILE
        ));
    }

    Ok(())
}

fn with_hint(err: CaptureError) -> anyhow::Error {
    let hint = match &err {
        CaptureError::Config(_) => {
            Some("Hint: --token, --scope and --registry must all be given.")
        }
        CaptureError::Poll(PollError::Timeout { .. }) => Some(
            "Hint: check that the registry is reachable, or wait longer with --max-attempts / --backoff-factor.",
        ),
        _ => None,
    };

    match hint {
        Some(hint) => anyhow::Error::new(err).context(hint),
        None => anyhow::Error::new(err),
    }
}

/// List all stored profiles
pub fn list(store: &ProfileStore, ui: &Ui, json: bool) -> Result<()> {
    let profiles = store.list_profiles()?;

    if json {
        let out = serde_json::to_string_pretty(&profiles).context("Failed to serialize profiles")?;
        ui.println(out);
        return Ok(());
    }

    if profiles.is_empty() {
        ui.warn("No profiles found.");
        ui.newline();
        ui.println("Capture some with:");
        ui.println(format!(
            "  {} --token <TOKEN> --scope <SCOPE> --registry <URL>",
            ui.bold("npmrc-switch")
        ));
        return Ok(());
    }

    let mut table = ui.table();
    table.set_header(vec![
        ui.header_cell(""),
        ui.header_cell("Profile"),
        ui.header_cell("Size"),
        ui.header_cell("Updated"),
        ui.header_cell("Status"),
    ]);

    for profile in &profiles {
        let icon = if profile.active { ui.icon_ok() } else { " " };
        let status_cell = if profile.active {
            ui.toned_cell("active", Tone::Good)
        } else {
            ui.cell("-")
        };
        let updated = profile
            .modified
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "?".to_string());

        table.add_row(vec![
            ui.cell(icon),
            ui.cell(&profile.name),
            ui.cell(format_bytes(profile.size)),
            ui.cell(updated),
            status_cell,
        ]);
    }

    ui.section("Profiles");
    ui.println(table.to_string());

    Ok(())
}

/// Show the active profile and the state of the active configuration file
pub fn current(store: &ProfileStore, ui: &Ui) -> Result<()> {
    use crate::switch::ActiveStatus;

    let paths = store.paths();
    ui.section("Current Profile");
    ui.newline();

    let mut table = ui.simple_table();

    match store.active_profile() {
        Some(profile) => {
            table.add_row(vec![ui.cell("Active profile:"), ui.header_cell(profile)]);
        }
        None => {
            table.add_row(vec![ui.cell("Active profile:"), ui.cell("(none)")]);
        }
    }

    let status = ActiveStatus::detect(&paths.active_config);
    let status_cell = match &status {
        ActiveStatus::Missing => ui.toned_cell("missing", Tone::Caution),
        ActiveStatus::RegularFile => ui.cell("regular file (not managed)"),
        ActiveStatus::Symlink { target } => ui.cell(format!("symlink → {}", target.display())),
        ActiveStatus::BrokenSymlink { target } => ui.toned_cell(
            format!("broken symlink → {}", target.display()),
            Tone::Bad,
        ),
    };
    table.add_row(vec![
        ui.cell(format!("{}:", paths.active_config.display())),
        status_cell,
    ]);
    table.add_row(vec![
        ui.cell("Store:"),
        ui.cell(paths.store_dir.display().to_string()),
    ]);

    ui.println(table.to_string());
    Ok(())
}

/// Switch to a profile, asking interactively when no name is given
pub async fn use_profile(store: &ProfileStore, name: Option<&str>, ui: &Ui) -> Result<()> {
    let name = match name {
        Some(name) => name.to_string(),
        None => pick_profile(store)?,
    };

    if !store.profile_exists(&name) {
        bail!(
            "Profile '{}' does not exist.\nHint: Use 'npmrc-switch list' to see available profiles.",
            name
        );
    }

    let spinner = ui.spinner(format!("Switching to profile '{}'...", name));

    // An explicit switch is not best effort: report the failure
    match store.select_profile(&name).await {
        Ok(()) => {
            ui.spinner_finish_ok(&spinner, format!("Active profile: {}", name));
            Ok(())
        }
        Err(e) => {
            ui.spinner_finish_err(&spinner, format!("Failed to switch: {}", e));
            Err(e.into())
        }
    }
}

fn pick_profile(store: &ProfileStore) -> Result<String> {
    let profiles = store.list_profiles()?;
    if profiles.is_empty() {
        bail!("No profiles found.\nHint: Run a capture first to create 'local' and 'default'.");
    }

    let active = profiles.iter().position(|p| p.active).unwrap_or(0);
    let names: Vec<String> = profiles.into_iter().map(|p| p.name).collect();

    Select::new("Which profile should be active?", names)
        .with_starting_cursor(active)
        .prompt()
        .context("Profile selection cancelled")
}

/// Format bytes as human-readable string
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
