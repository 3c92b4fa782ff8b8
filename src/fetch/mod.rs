//! Feed retrieval over HTTP (or from a saved copy on disk).

mod basic;
mod client;
pub mod auth;
#[cfg(test)]
pub(crate) mod stub;

pub use basic::{BasicClient, DEFAULT_TIMEOUT};
pub use client::HttpClient;

use anyhow::{Context, Result};
use tracing::{debug, error};

/// Live cycle-hire status feed published by TfL.
pub const DEFAULT_FEED_URL: &str =
    "https://tfl.gov.uk/tfl/syndication/feeds/cycle-hire/livecyclehireupdates.xml";

/// GETs `url` and returns the body verbatim.
///
/// # Errors
///
/// Fails on transport errors (including timeouts) and on non-2xx statuses.
pub async fn fetch_text<C: HttpClient>(client: &C, url: &str) -> Result<String> {
    let req = reqwest::Request::new(
        reqwest::Method::GET,
        url.parse().with_context(|| format!("invalid feed URL '{url}'"))?,
    );

    let resp = client.execute(req).await?.error_for_status()?;
    Ok(resp.text().await?)
}

/// Loads the feed from a URL or, for anything not starting with `http`, a
/// local file.
///
/// Failures are logged and reported as `None`; this never returns an error.
#[tracing::instrument(skip(client), fields(source = %source))]
pub async fn fetch_feed<C: HttpClient>(client: &C, source: &str) -> Option<String> {
    let result = if source.starts_with("http") {
        fetch_text(client, source).await
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("failed to read feed file '{source}'"))
    };

    match result {
        Ok(body) => {
            debug!(bytes = body.len(), "Feed received");
            Some(body)
        }
        Err(e) => {
            error!(error = %e, "Error fetching cycle hire feed");
            None
        }
    }
}
