// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `obstack deploy`
//!
//! Runs the deploy workflow, then prints service URLs and, on first deploy,
//! the generated credentials. Credentials go to stdout exactly once and are
//! never passed to the logger.

use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use std::path::PathBuf;

use obstack_core::application::{DeployError, DeployOptions, DeployReport};
use obstack_core::domain::platform::RuntimeStatus;
use obstack_core::infrastructure::discover_public_ip;

use crate::commands::install::print_status;
use crate::context::StackContext;
use crate::output;

pub async fn execute(config_path: Option<PathBuf>, skip_install: bool) -> Result<()> {
    let ctx = StackContext::load(config_path)?;
    ctx.require_stack()?;

    let workflow = ctx.deploy_workflow()?;
    let sp = output::spinner("Deploying stack (pull, start, wait for readiness)...");

    let report = match workflow.run(DeployOptions { skip_install }, Utc::now()).await {
        Ok(report) => report,
        Err(DeployError::NotReady { report, source }) => {
            output::finish_err(&sp, "Some services did not become ready");
            output::print_readiness(&report.readiness);
            print_secrets(&report);
            println!("Inspect with: obstack logs <service>");
            return Err(source.into());
        }
        Err(e) => {
            output::finish_err(&sp, "Deployment failed");
            if let Some(report) = e.report() {
                print_secrets(report);
                println!("Credentials are stored in {}", ctx.config.secrets_record().display());
            }
            return Err(e.into());
        }
    };

    if report.needs_relogin() {
        output::finish_ok(&sp, "Container runtime installed");
        print_status(RuntimeStatus::InstalledNeedsRelogin);
        return Ok(());
    }

    output::finish_ok(&sp, "Stack deployed");
    output::print_readiness(&report.readiness);
    println!();

    let spec = &ctx.config.spec;
    let host = discover_public_ip(&spec.network.public_ip_url, spec.network.public_ip_timeout).await;
    println!("{}", "Services:".bold());
    for service in &spec.services {
        if let Some(url) = output::service_url(service, &host) {
            println!("  {:<16} {}", service.name, url);
        }
    }
    println!();

    println!("{}", "Agent telemetry environment:".bold());
    let telemetry = &spec.telemetry;
    println!("  OTLP_HTTP_ENDPOINT={}", telemetry.otlp_http_endpoint);
    if let Some(name) = &telemetry.service_name {
        println!("  SERVICE_NAME={}", name);
    }
    println!("  SERVICE_VERSION={}", telemetry.service_version);
    println!("  ENVIRONMENT={}", telemetry.environment);
    println!();

    print_secrets(&report);
    println!("Credentials are stored in {}", ctx.config.secrets_record().display());

    Ok(())
}

fn print_secrets(report: &DeployReport) {
    let Some(secrets) = &report.secrets else {
        return;
    };
    println!("{}", "Generated credentials (shown once):".bold().yellow());
    for secret in &secrets.secrets {
        println!("  {}={}", secret.name, secret.value);
    }
    println!();
}
