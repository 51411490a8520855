// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::debug;

/// Used in service URLs when no public address can be discovered
pub const FALLBACK_HOST: &str = "localhost";

/// Ask the cloud metadata endpoint for this machine's public IPv4 address.
/// Any failure (no endpoint, timeout, garbage body) falls back to `localhost`.
pub async fn discover_public_ip(url: &str, timeout: Duration) -> String {
    match fetch(url, timeout).await {
        Ok(Some(ip)) => ip.to_string(),
        Ok(None) => {
            debug!("Metadata endpoint returned no usable address");
            FALLBACK_HOST.to_string()
        }
        Err(e) => {
            debug!("Public IP discovery failed: {}", e);
            FALLBACK_HOST.to_string()
        }
    }
}

async fn fetch(url: &str, timeout: Duration) -> Result<Option<Ipv4Addr>, reqwest::Error> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let response = client.get(url).send().await?.error_for_status()?;
    let body = response.text().await?;
    Ok(body.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_returns_metadata_address() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/latest/meta-data/public-ipv4")
            .with_body("203.0.113.7\n")
            .create_async()
            .await;

        let url = format!("{}/latest/meta-data/public-ipv4", server.url());
        assert_eq!(discover_public_ip(&url, Duration::from_secs(2)).await, "203.0.113.7");
    }

    #[tokio::test]
    async fn test_falls_back_to_localhost() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/latest/meta-data/public-ipv4")
            .with_status(404)
            .create_async()
            .await;

        let url = format!("{}/latest/meta-data/public-ipv4", server.url());
        assert_eq!(discover_public_ip(&url, Duration::from_secs(2)).await, FALLBACK_HOST);
        assert_eq!(
            discover_public_ip("http://127.0.0.1:1/", Duration::from_millis(200)).await,
            FALLBACK_HOST
        );
    }
}
