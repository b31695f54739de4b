//! Application-level HTTP reachability probe

use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// True when the URL answers with any HTTP status at all.
///
/// An uninstalled WordPress happily returns 500s; what this probe proves is
/// that the web layer (PHP + server) is up, not that the site is configured.
pub async fn url_reachable(url: &str) -> bool {
    let client = match reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build() {
        Ok(c) => c,
        Err(e) => {
            debug!(error = %e, "Failed to build HTTP client");
            return false;
        }
    };

    match client.get(url).send().await {
        Ok(resp) => {
            debug!(url, status = resp.status().as_u16(), "HTTP probe answered");
            true
        }
        Err(e) => {
            debug!(url, error = %e, "HTTP probe failed");
            false
        }
    }
}

/// True when the URL answers with a non-server-error status.
///
/// Used by the final verification step, where a 500 means the install went
/// wrong even though the web layer is up. Redirects to the login page are
/// followed by the client and count as success.
pub async fn url_healthy(url: &str) -> bool {
    let client = match reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build() {
        Ok(c) => c,
        Err(_) => return false,
    };

    match client.get(url).send().await {
        Ok(resp) => !resp.status().is_server_error(),
        Err(_) => false,
    }
}
