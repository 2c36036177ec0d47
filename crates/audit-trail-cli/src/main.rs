//! Audit Trail CLI - log and query audit events from the command line.
//!
//! A thin front end over the async client. Connection settings come from
//! flags, then the config file, then `AUDIT_TRAIL_*` environment variables.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;
use std::process::ExitCode;

use audit_trail_sdk::{AuditTrailClient, AuditTrailError, ClientSettings};
use clap::{Parser, Subcommand};

mod commands;
mod config;
mod logging;
mod theme;

use commands::{LogArgs, OutputFormat, SearchArgs};
use logging::LogFormat;
use theme::Theme;

/// Audit Trail - submit and query audit events
#[derive(Parser)]
#[command(name = "audit-trail")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Audit service base URL
    #[arg(long, global = true)]
    server_url: Option<String>,

    /// API key sent as `X-API-Key`
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log a single event
    Log(LogArgs),

    /// Log a JSON array of events from a file as one batch
    Batch {
        /// Path to the events file
        file: PathBuf,
    },

    /// Fetch an event by ID
    Get {
        /// Event ID
        id: String,
    },

    /// Search events within a tenant
    Search(SearchArgs),
}

impl Cli {
    fn flag_settings(&self) -> ClientSettings {
        ClientSettings {
            server_url: self.server_url.clone(),
            api_key: self.api_key.clone(),
            ..ClientSettings::default()
        }
    }
}

/// One-line description of an error, with violations inlined.
fn describe(err: &anyhow::Error) -> String {
    match err.downcast_ref::<AuditTrailError>() {
        Some(api_err) if !api_err.violations().is_empty() => {
            format!("{err:#} ({})", api_err.violations().join("; "))
        },
        _ => format!("{err:#}"),
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = config::resolve(cli.flag_settings(), cli.config.as_deref())?;
    let client: AuditTrailClient = settings.into_builder()?.build()?;

    match &cli.command {
        Commands::Log(args) => commands::log_event(&client, args, cli.output).await,
        Commands::Batch { file } => commands::log_batch(&client, file, cli.output).await,
        Commands::Get { id } => commands::get_event(&client, id, cli.output).await,
        Commands::Search(args) => commands::search_events(&client, args, cli.output).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::setup_logging(cli.log_format, cli.verbose) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", Theme::error(&describe(&e)));
            ExitCode::FAILURE
        },
    }
}
