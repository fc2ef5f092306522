//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use odr_core::config::{self, Config};
use odr_core::core::interrupt;

mod commands;

#[derive(Parser)]
#[command(name = "odr")]
#[command(version = "0.1")]
#[command(about = "Interactive console driver for a hosted deep-research agent")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// The research question; enters an interactive prompt when omitted
    #[arg(value_name = "QUESTION", num_args = 0..)]
    question: Vec<String>,

    /// Per-step progress detail instead of dots
    #[arg(short, long)]
    verbose: bool,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Probe engine connectivity and show the research knobs
    Check,
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    interrupt::init();
    let _log_guard = init_tracing();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

/// Diagnostics go to a rolling file under the odr home; the console belongs
/// to the progress UI.
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let logs_dir = config::paths::logs_dir();
    std::fs::create_dir_all(&logs_dir).ok()?;
    let appender = tracing_appender::rolling::daily(logs_dir, "odr.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = tracing_subscriber::EnvFilter::try_from_env("ODR_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("odr=info,odr_core=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Some(guard)
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::load().context("load config")?;

    match cli.command {
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        },
        Some(Commands::Check) => commands::check::run(&config).await,
        None => {
            let question = cli.question.join(" ");
            commands::run::run(&config, question.trim(), cli.verbose).await
        }
    }
}
