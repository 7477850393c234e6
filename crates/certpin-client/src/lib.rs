//! Certpin Demo Client
//!
//! A small pinned HTTP client: builds a reqwest client on top of the
//! pinning verifier and fetches a URL, reporting the status line the way
//! the training demos expect. Everything interesting happens in the
//! verifier; this crate is transport plumbing.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use certpin_core::PinningConfig;
use certpin_rustls::{pinned_client_config, PinnedServerCertVerifier};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const READ_TIMEOUT: Duration = Duration::from_secs(20);

/// HTTP client with SPKI pinning installed.
pub struct DemoClient {
    client: reqwest::Client,
}

impl DemoClient {
    /// Build a client from a session pinning configuration. Mode and policy
    /// are fixed for the lifetime of the client; reconfiguring means
    /// building a new one.
    pub fn new(config: &PinningConfig) -> anyhow::Result<Self> {
        let registry = config.build_registry()?;
        let verifier = PinnedServerCertVerifier::with_webpki_roots(
            registry,
            config.policy,
            config.mode,
        )?;
        let tls = pinned_client_config(verifier);

        let client = reqwest::Client::builder()
            .use_preconfigured_tls(Arc::unwrap_or_clone(tls))
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(READ_TIMEOUT)
            .build()
            .context("failed to build pinned HTTP client")?;

        Ok(DemoClient { client })
    }

    /// Blocking variant for callers without a runtime (FFI, CLIs).
    pub fn fetch_demo_blocking(&self, url: &str) -> anyhow::Result<String> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to create tokio runtime")?;
        rt.block_on(self.fetch_demo(url))
    }

    /// Fetch a URL through the pinned client and summarize the response.
    pub async fn fetch_demo(&self, url: &str) -> anyhow::Result<String> {
        tracing::info!(url, "pinned fetch");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("pinned request failed")?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok(summarize(status, &body))
    }
}

/// `"HTTP <status>: <first line, at most 200 chars>"`.
fn summarize(status: u16, body: &str) -> String {
    let first_line: String = body.lines().next().unwrap_or("").chars().take(200).collect();
    if first_line.is_empty() {
        format!("HTTP {status}: <empty>")
    } else {
        format!("HTTP {status}: {first_line}")
    }
}
