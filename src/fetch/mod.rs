//! HTTP plumbing shared by the vendor adapters.
//!
//! [`HttpClient`] is the seam every outbound request goes through, so tests
//! can substitute canned responses and auth wrappers can decorate requests.

mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result, anyhow, bail};
use tracing::debug;

/// Issues a GET for `url` and decodes the body as JSON.
///
/// # Errors
///
/// Fails on transport errors, non-2xx statuses, and bodies that are not JSON.
pub async fn fetch_json<C: HttpClient + ?Sized>(
    client: &C,
    url: reqwest::Url,
) -> Result<serde_json::Value> {
    let path = url.path().to_string();
    let req = reqwest::Request::new(reqwest::Method::GET, url);

    // Auth decorators may have put secrets in the query string; keep the URL
    // out of the error.
    let resp = client
        .execute(req)
        .await
        .map_err(|e| anyhow!("request to {path} failed: {}", e.without_url()))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("{path} returned status {status}: {body}");
    }

    let bytes = resp
        .bytes()
        .await
        .map_err(|e| anyhow!("reading {path} body failed: {}", e.without_url()))?;
    debug!(path, bytes = bytes.len(), "Response received");

    serde_json::from_slice(&bytes).with_context(|| format!("{path} returned invalid JSON"))
}
