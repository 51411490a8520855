// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Terminal narration helpers

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use obstack_core::domain::service::{
    CheckOutcome, ManagedService, ReadinessOutcome, ReadinessReport, ServiceCheck,
};

pub fn spinner(msg: &str) -> ProgressBar {
    let sp = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.cyan.bold} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", " "]);
    sp.set_style(style);
    sp.set_message(msg.to_string());
    sp.enable_steady_tick(Duration::from_millis(80));
    sp
}

pub fn finish_ok(sp: &ProgressBar, msg: &str) {
    sp.finish_and_clear();
    println!("{} {}", "✓".green().bold(), msg);
}

pub fn finish_err(sp: &ProgressBar, msg: &str) {
    sp.finish_and_clear();
    println!("{} {}", "✗".red().bold(), msg);
}

pub fn print_readiness(report: &ReadinessReport) {
    for result in &report.results {
        match result.outcome {
            ReadinessOutcome::Ready => println!(
                "  {} {} ready ({} attempt{})",
                "✓".green(),
                result.service_name.bold(),
                result.attempts_used,
                if result.attempts_used == 1 { "" } else { "s" }
            ),
            ReadinessOutcome::TimedOut => println!(
                "  {} {} timed out after {} attempts",
                "✗".red(),
                result.service_name.bold(),
                result.attempts_used
            ),
        }
    }
}

pub fn print_checks(checks: &[ServiceCheck]) {
    for check in checks {
        let outcome = match check.outcome {
            CheckOutcome::Ok => check.outcome.to_string().green(),
            CheckOutcome::Failed => check.outcome.to_string().red(),
        };
        println!("  {:<20} {}", check.service_name, outcome);
    }
}

/// Operator-facing URL with `{host}` filled in
pub fn service_url(service: &ManagedService, host: &str) -> Option<String> {
    service
        .display_url
        .as_ref()
        .map(|url| url.replace("{host}", host))
}

#[cfg(test)]
mod tests {
    use super::*;
    use obstack_core::domain::service::HealthCheck;

    #[test]
    fn test_service_url_substitutes_host() {
        let mut service = ManagedService::new(
            "grafana",
            HealthCheck::HttpHealth {
                url: "http://localhost:3000/api/health".to_string(),
            },
        );
        assert_eq!(service_url(&service, "203.0.113.7"), None);

        service.display_url = Some("http://{host}:3000".to_string());
        assert_eq!(
            service_url(&service, "203.0.113.7").as_deref(),
            Some("http://203.0.113.7:3000")
        );
    }
}
