use brewscout::colors::{self, ColorChoice};
use brewscout::{Config, Confirmation, MetadataBackend, RunCoordinator, ScoutError};
use clap::{CommandFactory, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "brewscout")]
#[command(author, version, about = "See what a Homebrew update brings before upgrading", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Package manager binary
    #[arg(long, global = true, env = "BREWSCOUT_BREW", default_value = "brew")]
    brew: PathBuf,

    /// Where package homepages and descriptions come from
    #[arg(long, global = true, env = "BREWSCOUT_METADATA", value_enum, default_value_t = MetadataBackend::Local)]
    metadata: MetadataBackend,

    /// Directory for the run log [default: system temp dir]
    #[arg(long, global = true, env = "BREWSCOUT_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Concurrent metadata lookups
    #[arg(short, long, global = true, default_value_t = 8, value_parser = clap::value_parser!(u16).range(1..))]
    jobs: u16,

    /// Timeout for each package manager command, in seconds
    #[arg(long, global = true, default_value_t = 120)]
    timeout: u64,

    /// Upgrade without asking
    #[arg(short, long, conflicts_with = "no_upgrade")]
    yes: bool,

    /// Report only, never upgrade
    #[arg(long)]
    no_upgrade: bool,

    /// Keep the before/after inventories as JSON in this directory
    #[arg(long)]
    save_snapshots: Option<PathBuf>,

    /// When to use colors
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Report new packages between two saved snapshots
    Diff {
        /// Inventory captured before the refresh
        before: PathBuf,
        /// Inventory captured after the refresh
        after: PathBuf,
    },

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

impl Cli {
    fn config(&self) -> Config {
        let confirmation = if self.yes {
            Confirmation::AssumeYes
        } else if self.no_upgrade {
            Confirmation::AssumeNo
        } else {
            Confirmation::Prompt
        };

        let defaults = Config::default();
        Config {
            brew: self.brew.clone(),
            metadata: self.metadata,
            log_dir: self.log_dir.clone().unwrap_or(defaults.log_dir),
            jobs: usize::from(self.jobs),
            command_timeout: Duration::from_secs(self.timeout),
            metadata_timeout: defaults.metadata_timeout,
            confirmation,
            staging_root: defaults.staging_root,
            save_snapshots: self.save_snapshots.clone(),
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    colors::init_colors(cli.color);
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if matches!(e.downcast_ref::<ScoutError>(), Some(ScoutError::Interrupted)) => {
            eprintln!("\n{} Interrupted", "✗".red());
            // A pending confirmation read would otherwise hold up runtime shutdown
            std::process::exit(130);
        }
        Err(e) => {
            let fatal = e.downcast_ref::<ScoutError>().is_some_and(ScoutError::is_fatal);
            if fatal {
                eprintln!("{} {}", "✗".red().bold(), e.to_string().red().bold());
            } else {
                eprintln!("{} {:#}", "✗".red(), e);
            }
            ExitCode::FAILURE
        }
    }
}

/// Drive `work` until it finishes or Ctrl-C arrives. On interrupt the future is
/// dropped before returning, which releases staging and removes an empty log.
async fn until_interrupted<T>(
    work: impl Future<Output = brewscout::Result<T>>,
) -> brewscout::Result<T> {
    let mut work = Box::pin(work);
    let result = tokio::select! {
        result = &mut work => result,
        _ = tokio::signal::ctrl_c() => Err(ScoutError::Interrupted),
    };
    drop(work);
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.config();
    let manager = config.manager();
    let metadata = config.metadata_source(&manager)?;
    let confirmation = config.confirmation;
    let coordinator = RunCoordinator::new(manager, metadata, config);
    let mut stdout = std::io::stdout();

    match cli.command {
        None => {
            until_interrupted(coordinator.run(&mut stdout, || confirmation.confirm())).await?;
        }
        Some(Commands::Diff { before, after }) => {
            until_interrupted(coordinator.diff_snapshots(&mut stdout, &before, &after)).await?;
        }
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(shell, &mut Cli::command(), "brewscout", &mut stdout);
        }
    }

    Ok(())
}
