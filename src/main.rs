use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

use npmrc_switch::{
    commands,
    config::CaptureArgs,
    logging,
    login::NpmCliLogin,
    paths::{DEFAULT_STORE_DIR, Paths},
    profiles::ProfileStore,
    switch::{NativeSwitcher, NpmrcCommand, Switcher},
    ui::{ColorMode, Ui},
};

#[derive(Parser)]
#[command(name = "npmrc-switch")]
#[command(about = "npmrc profile switcher - capture registry logins into switchable .npmrc profiles")]
#[command(version)]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// When to use colors: always, auto, never
    #[arg(long, global = true, value_enum, value_name = "WHEN", default_value_t = ColorMode::Auto)]
    color: ColorMode,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Project directory holding .npmrc [default: current directory]
    #[arg(long, global = true, value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Name of the profile store directory
    #[arg(long, global = true, value_name = "NAME", default_value = DEFAULT_STORE_DIR)]
    store: String,

    /// Mechanism used to switch profiles
    #[arg(long, global = true, value_enum, default_value_t = SwitcherKind::Native)]
    switcher: SwitcherKind,

    #[command(flatten)]
    capture: CaptureArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SwitcherKind {
    /// Switch in-process by linking .npmrc into the store
    Native,
    /// Delegate to `npx npmrc`
    Npmrc,
}

#[derive(Subcommand)]
enum Commands {
    /// List all stored profiles
    List {
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the active profile and .npmrc status
    Current,

    /// Switch to a profile (interactive when NAME is omitted)
    Use {
        /// Name of the profile to activate
        name: Option<String>,
    },

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn resolve_paths(cli: &Cli) -> Result<Paths> {
    let root = match &cli.dir {
        Some(dir) => dir
            .canonicalize()
            .with_context(|| format!("Failed to resolve directory: {}", dir.display()))?,
        None => Paths::new()?.root,
    };
    Ok(Paths::with_store(root, &cli.store)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let ui = Ui::new(cli.color, cli.no_color);

    if let Some(Commands::Completions { shell }) = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "npmrc-switch", &mut std::io::stdout());
        return Ok(());
    }

    let paths = resolve_paths(&cli)?;
    let switcher: Box<dyn Switcher> = match cli.switcher {
        SwitcherKind::Native => Box::new(NativeSwitcher),
        SwitcherKind::Npmrc => Box::new(NpmrcCommand::default()),
    };
    let store = ProfileStore::new(paths, switcher);

    match &cli.command {
        None => {
            let login = NpmCliLogin::new(&store.paths().root);
            commands::capture(&store, &login, &cli.capture, &ui).await
        }
        Some(Commands::List { json }) => commands::list(&store, &ui, *json),
        Some(Commands::Current) => commands::current(&store, &ui),
        Some(Commands::Use { name }) => commands::use_profile(&store, name.as_deref(), &ui).await,
        Some(Commands::Completions { .. }) => Ok(()),
    }
}
