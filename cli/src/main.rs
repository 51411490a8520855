// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # obstack
//!
//! Stands up and maintains a single-host observability stack (OpenTelemetry
//! collector, ClickHouse, Grafana) under Docker Compose.
//!
//! ## Commands
//!
//! - `obstack init` - Scaffold the stack directory
//! - `obstack install` - Install Docker and the Compose plugin if missing
//! - `obstack deploy` - Install, provision credentials, start and wait for readiness
//! - `obstack status|logs|stop` - Day-to-day operation
//! - `obstack update` - Snapshot, pull newer images, restart, check
//! - `obstack backup create|list|prune|restore` - Snapshot management
//! - `obstack config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;

use obstack_cli::commands::{self, BackupCommand, ConfigCommand};

/// obstack - observability stack lifecycle
#[derive(Parser)]
#[command(name = "obstack")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "OBSTACK_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "OBSTACK_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Log output format
    #[arg(long, global = true, env = "OBSTACK_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold the stack directory from the built-in templates
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },

    /// Install the container runtime and Compose plugin if missing
    Install,

    /// Deploy the stack and wait for every service to become ready
    Deploy {
        /// Assume Docker is already installed
        #[arg(long)]
        skip_install: bool,
    },

    /// Show containers and a single health check per service
    Status,

    /// Show service logs
    Logs {
        /// Limit to one service
        service: Option<String>,

        /// Follow log output
        #[arg(short, long)]
        follow: bool,
    },

    /// Stop the stack (data volumes are kept)
    Stop,

    /// Snapshot, pull newer images, restart and check critical services
    Update,

    /// Snapshot management
    Backup {
        #[command(subcommand)]
        command: BackupCommand,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() {
    // .env first so clap `env` attributes see it
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    init_logging(&cli.log_level, cli.log_format)?;

    match cli.command {
        Some(Commands::Init { force }) => commands::init::execute(cli.config, force).await,
        Some(Commands::Install) => commands::install::execute(cli.config).await,
        Some(Commands::Deploy { skip_install }) => {
            commands::deploy::execute(cli.config, skip_install).await
        }
        Some(Commands::Status) => commands::status::execute(cli.config).await,
        Some(Commands::Logs { service, follow }) => {
            commands::logs::execute(cli.config, service, follow).await
        }
        Some(Commands::Stop) => commands::stop::execute(cli.config).await,
        Some(Commands::Update) => commands::update::execute(cli.config).await,
        Some(Commands::Backup { command }) => {
            commands::backup::handle_command(command, cli.config).await
        }
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        None => {
            // No command provided - show help
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging. Logs go to stderr so they never
/// interleave with command output on stdout.
fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        LogFormat::Text => builder.compact().init(),
        LogFormat::Json => builder.json().init(),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_update_takes_no_arguments() {
        let cli = Cli::try_parse_from(["obstack", "update"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Update)));
        assert!(Cli::try_parse_from(["obstack", "update", "extra"]).is_err());
    }
}
