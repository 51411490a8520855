// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use obstack_core::domain::backup::RetentionPolicy;
use obstack_core::domain::stack_config::{StackConfig, CONFIG_PATH_ENV};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,

        /// Print the resolved configuration as YAML
        #[arg(long)]
        yaml: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate a configuration file populated with the defaults
    Generate {
        /// Output path (default: ./obstack-config.yaml)
        #[arg(short, long, default_value = "./obstack-config.yaml")]
        output: PathBuf,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths, yaml } => show(config_override, paths, yaml).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output } => generate(output).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool, as_yaml: bool) -> Result<()> {
    let config = StackConfig::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. {}: {}",
            CONFIG_PATH_ENV,
            std::env::var(CONFIG_PATH_ENV)
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./obstack-config.yaml");
        println!("  4. ~/.obstack/config.yaml");
        println!("  5. /etc/obstack/config.yaml");
        println!();
    }

    if as_yaml {
        print!("{}", serde_yaml::to_string(&config)?);
        return Ok(());
    }

    let spec = &config.spec;
    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Stack:".bold());
    println!("  Name: {}", config.metadata.name);
    println!("  Directory: {}", spec.stack_dir.display());
    println!("  Compose: {} (project {})", config.compose_file().display(), spec.compose.project);
    println!("  Credentials: {}", config.secrets_record().display());
    println!();

    println!("{}", "Services:".bold());
    for service in &spec.services {
        println!(
            "  {} ({}, {} × {:?}{})",
            service.name.bold(),
            service.health_check.target(),
            service.max_attempts,
            service.poll_interval,
            if service.critical { "" } else { ", non-critical" }
        );
    }
    println!();

    println!("{}", "Backups:".bold());
    println!("  Root: {}", config.backup_root().display());
    match spec.backup.retention {
        RetentionPolicy::MaxAgeDays(days) => println!("  Retention: {} days", days),
        RetentionPolicy::KeepLatest(count) => println!("  Retention: newest {}", count),
    }
    println!("  Artifacts: {}", spec.backup.artifacts.len());
    for export in &spec.backup.exports {
        println!("  Export: {}", export.service);
    }
    println!();

    println!("{}", "Update:".bold());
    println!("  Settle delay: {:?}", spec.update.settle_delay);
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = StackConfig::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf) -> Result<()> {
    StackConfig::default()
        .to_yaml_file(&output)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}
