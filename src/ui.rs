//! Terminal output for npmrc-switch: labels, tables, spinners.
//!
//! Colors are disabled, in priority order, by:
//! 1. the `--no-color` flag
//! 2. a `NO_COLOR` environment variable (any value)
//! 3. `TERM=dumb`
//! 4. stdout not being a terminal (in `auto` mode)

use anstream::{eprintln, println};
use anstyle::{AnsiColor, Color, Style};
use clap::ValueEnum;
use comfy_table::{Attribute, Cell, ContentArrangement, Table, presets};
use indicatif::{ProgressBar, ProgressStyle};
use std::borrow::Cow;
use std::io::IsTerminal;
use std::time::Duration;

/// When to emit ANSI colors
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    Always,
    /// Only on a terminal
    #[default]
    Auto,
    Never,
}

/// Meaning of a highlighted piece of output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Good,
    Caution,
    Bad,
}

impl Tone {
    fn ansi(self) -> AnsiColor {
        match self {
            Tone::Good => AnsiColor::Green,
            Tone::Caution => AnsiColor::Yellow,
            Tone::Bad => AnsiColor::Red,
        }
    }

    fn table_color(self) -> comfy_table::Color {
        match self {
            Tone::Good => comfy_table::Color::Green,
            Tone::Caution => comfy_table::Color::Yellow,
            Tone::Bad => comfy_table::Color::Red,
        }
    }
}

/// Decide whether to emit colors from the flags and the environment
fn resolve_color(
    mode: ColorMode,
    force_no_color: bool,
    no_color: bool,
    term: Option<&str>,
    is_tty: bool,
) -> bool {
    if force_no_color || no_color || term == Some("dumb") {
        return false;
    }

    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => is_tty,
    }
}

/// Resolved display settings
#[derive(Debug, Clone)]
pub struct Ui {
    pub color_enabled: bool,
    /// Spinners need both color and a terminal
    pub spinner_enabled: bool,
}

impl Default for Ui {
    fn default() -> Self {
        Self::new(ColorMode::Auto, false)
    }
}

impl Ui {
    pub fn new(mode: ColorMode, force_no_color: bool) -> Self {
        let is_tty = std::io::stdout().is_terminal();
        let term = std::env::var("TERM").ok();
        let color_enabled = resolve_color(
            mode,
            force_no_color,
            std::env::var_os("NO_COLOR").is_some(),
            term.as_deref(),
            is_tty,
        );
        let spinner_enabled = color_enabled && is_tty;

        if !color_enabled {
            anstream::ColorChoice::write_global(anstream::ColorChoice::Never);
        }

        Self {
            color_enabled,
            spinner_enabled,
        }
    }

    fn style(&self, tone: Tone) -> Style {
        if self.color_enabled {
            Style::new().fg_color(Some(Color::Ansi(tone.ansi())))
        } else {
            Style::new()
        }
    }

    // -------------------------------------------------------------------------
    // Labelled messages
    // -------------------------------------------------------------------------

    /// `OK <msg>` on stdout
    pub fn ok(&self, msg: impl AsRef<str>) {
        let label = self.style(Tone::Good).bold();
        println!("{label}OK{label:#} {}", msg.as_ref());
    }

    /// `WARN <msg>` on stdout
    pub fn warn(&self, msg: impl AsRef<str>) {
        let label = self.style(Tone::Caution).bold();
        println!("{label}WARN{label:#} {}", msg.as_ref());
    }

    /// `ERROR <msg>` on stderr
    pub fn err(&self, msg: impl AsRef<str>) {
        let label = self.style(Tone::Bad).bold();
        eprintln!("{label}ERROR{label:#} {}", msg.as_ref());
    }

    pub fn bold(&self, s: impl AsRef<str>) -> String {
        if self.color_enabled {
            let st = Style::new().bold();
            format!("{st}{}{st:#}", s.as_ref())
        } else {
            s.as_ref().to_string()
        }
    }

    pub fn icon_ok(&self) -> &'static str {
        if self.color_enabled { "✓" } else { "[OK]" }
    }

    // -------------------------------------------------------------------------
    // Tables
    // -------------------------------------------------------------------------

    /// Bordered table, ASCII when colors are off
    pub fn table(&self) -> Table {
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.load_preset(if self.color_enabled {
            presets::UTF8_FULL_CONDENSED
        } else {
            presets::ASCII_MARKDOWN
        });
        table
    }

    /// Borderless table for key/value listings
    pub fn simple_table(&self) -> Table {
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.load_preset(presets::NOTHING);
        table
    }

    pub fn cell(&self, content: impl Into<String>) -> Cell {
        Cell::new(content.into())
    }

    pub fn header_cell(&self, content: impl Into<String>) -> Cell {
        let cell = Cell::new(content.into());
        if self.color_enabled {
            cell.add_attribute(Attribute::Bold)
        } else {
            cell
        }
    }

    /// Colored through comfy-table so column widths stay correct
    pub fn toned_cell(&self, content: impl Into<String>, tone: Tone) -> Cell {
        let cell = Cell::new(content.into());
        if self.color_enabled {
            cell.fg(tone.table_color())
        } else {
            cell
        }
    }

    // -------------------------------------------------------------------------
    // Spinners
    // -------------------------------------------------------------------------

    /// Spinner for a long wait; hidden when spinners are disabled
    pub fn spinner(&self, message: impl Into<Cow<'static, str>>) -> ProgressBar {
        let pb = if self.spinner_enabled {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                    .template("{spinner:.cyan} {msg}")
                    .expect("valid template"),
            );
            pb.enable_steady_tick(Duration::from_millis(80));
            pb
        } else {
            ProgressBar::hidden()
        };
        pb.set_message(message);
        pb
    }

    pub fn spinner_finish_ok(&self, pb: &ProgressBar, msg: impl Into<Cow<'static, str>>) {
        self.spinner_finish(pb, Tone::Good, msg.into());
    }

    pub fn spinner_finish_err(&self, pb: &ProgressBar, msg: impl Into<Cow<'static, str>>) {
        self.spinner_finish(pb, Tone::Bad, msg.into());
    }

    fn spinner_finish(&self, pb: &ProgressBar, tone: Tone, msg: Cow<'static, str>) {
        if !self.spinner_enabled {
            pb.finish_and_clear();
            match tone {
                Tone::Bad => self.err(msg),
                Tone::Caution => self.warn(msg),
                Tone::Good => self.ok(msg),
            }
            return;
        }

        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{msg}")
                .expect("valid template"),
        );
        let st = self.style(tone);
        let icon = if tone == Tone::Bad { "✗" } else { "✓" };
        pb.finish_with_message(format!("{st}{icon}{st:#} {}", msg));
    }

    // -------------------------------------------------------------------------
    // Plain output
    // -------------------------------------------------------------------------

    pub fn println(&self, msg: impl AsRef<str>) {
        println!("{}", msg.as_ref());
    }

    pub fn newline(&self) {
        println!();
    }

    pub fn section(&self, title: impl AsRef<str>) {
        println!("{}", self.bold(title));
    }
}
