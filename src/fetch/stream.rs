// src/fetch/stream.rs

use anyhow::{Context, Result};
use reqwest::{blocking::Client, header::USER_AGENT};
use std::{path::Path, time::Duration};
use tracing::debug;

use super::{copy_in_chunks, Transport};

/// Some hosts refuse or redirect clients that do not look like a browser.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Plain streamed GET of the configured URL.
pub struct StreamTransport {
    timeout: Duration,
}

impl StreamTransport {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Transport for StreamTransport {
    fn name(&self) -> &'static str {
        "stream"
    }

    fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .context("building HTTP client")?;

        debug!(url, "streaming GET");
        let resp = client
            .get(url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .with_context(|| format!("GET {} failed", url))?
            .error_for_status()
            .with_context(|| format!("Non-success status {}", url))?;

        copy_in_chunks(resp, dest)
    }
}
