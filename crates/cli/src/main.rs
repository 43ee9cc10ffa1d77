//! wsctl - WS-28xx weather station CLI
//!
//! Probe the transceiver, pair a console, and read current weather,
//! history, and configuration. Use `--json` for machine-readable output.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod commands;
mod error;
mod output;

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::CliError;

#[derive(Parser)]
#[command(name = "wsctl")]
#[command(about = "Control and read LaCrosse WS-28xx weather stations")]
#[command(version)]
struct Cli {
    /// Output in JSON format for machine parsing
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Driver configuration file (JSON)
    #[arg(long, global = true, env = "WSCTL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe the transceiver and print its serial and device id
    CheckTransceiver,

    /// Pair with a console (press SET on the console when prompted)
    Pair {
        /// Pairing window in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Dump the console configuration
    Info,

    /// Print one current-weather observation
    Current,

    /// Dump archive records
    History {
        /// Number of records to fetch
        #[arg(long, conflicts_with = "history_since")]
        history: Option<usize>,

        /// Fetch records from the last N minutes
        #[arg(long)]
        history_since: Option<i64>,
    },

    /// Set the archive recording interval in minutes
    SetInterval {
        /// Interval in minutes (1, 5, 10, 15, 20, 30, 60, 120, 240, 360,
        /// 480, 720, 1440)
        minutes: u32,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("wslink={log_level},wsctl={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Commands::Completion { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "wsctl", &mut std::io::stdout());
        return;
    }

    let result = run(&cli).await;
    match result {
        Ok(()) => {}
        Err(err) => {
            let code = err.exit_code();
            output::print_error(&err, cli.json);
            std::process::exit(code);
        }
    }
}

async fn run(cli: &Cli) -> Result<(), CliError> {
    let config = commands::load_config(cli.config.as_deref())?;
    match &cli.command {
        Commands::CheckTransceiver => commands::check_transceiver(config, cli.json).await,
        Commands::Pair { timeout } => commands::pair(config, *timeout, cli.json).await,
        Commands::Info => commands::info(config, cli.json).await,
        Commands::Current => commands::current(config, cli.json).await,
        Commands::History {
            history,
            history_since,
        } => commands::history(config, *history, *history_since, cli.json).await,
        Commands::SetInterval { minutes } => {
            commands::set_interval(config, *minutes, cli.json).await
        }
        Commands::Completion { .. } => Ok(()),
    }
}
