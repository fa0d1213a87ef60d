// src/fetch/drive.rs
//
// Large-file helper for files published on Google Drive. Files above the
// virus-scan size limit are served behind an HTML interstitial whose form
// (or link) carries the confirm token for the real download.

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{
    blocking::{Client, Response},
    header::CONTENT_TYPE,
};
use scraper::{Html, Selector};
use std::{path::Path, time::Duration};
use tracing::{debug, info};
use url::Url;

use super::{copy_in_chunks, Transport};

const DOWNLOAD_ENDPOINT: &str = "https://drive.google.com/uc";

static SHARE_PATH_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/file/d/([A-Za-z0-9_-]+)").expect("share path regex"));
static QUERY_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[?&]id=([A-Za-z0-9_-]+)").expect("query id regex"));
static BARE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{20,}$").expect("bare id regex"));

pub struct DriveTransport {
    timeout: Duration,
}

impl DriveTransport {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    // Built per download: the blocking client must live on the blocking pool.
    fn client(&self) -> Result<Client> {
        Client::builder()
            .timeout(self.timeout)
            .cookie_store(true)
            .build()
            .context("building drive HTTP client")
    }
}

impl Transport for DriveTransport {
    fn name(&self) -> &'static str {
        "drive"
    }

    fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        let id = extract_file_id(url).ok_or_else(|| anyhow!("no drive file id in {}", url))?;
        let link = Url::parse_with_params(
            DOWNLOAD_ENDPOINT,
            &[("export", "download"), ("id", id.as_str())],
        )?;
        let client = self.client()?;

        debug!(%link, "requesting drive download");
        let mut resp = client
            .get(link.clone())
            .send()
            .with_context(|| format!("GET {} failed", link))?
            .error_for_status()
            .with_context(|| format!("Non-success status {}", link))?;

        if is_html(&resp) {
            let page = resp.text().context("reading interstitial page")?;
            let confirm = confirm_url_from_page(&page, &link)
                .ok_or_else(|| anyhow!("drive returned a page without a download link"))?;
            info!(%confirm, "following large-file confirmation");
            resp = client
                .get(confirm.clone())
                .send()
                .with_context(|| format!("GET {} failed", confirm))?
                .error_for_status()
                .with_context(|| format!("Non-success status {}", confirm))?;
        }

        copy_in_chunks(resp, dest)
    }
}

fn is_html(resp: &Response) -> bool {
    resp.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |ct| ct.contains("text/html"))
}

/// Pull the file id out of a share link, a `?id=` link, or a bare id.
pub fn extract_file_id(url: &str) -> Option<String> {
    let url = url.trim();
    SHARE_PATH_ID
        .captures(url)
        .or_else(|| QUERY_ID.captures(url))
        .map(|caps| caps[1].to_string())
        .or_else(|| BARE_ID.is_match(url).then(|| url.to_string()))
}

/// Find the real download URL on the interstitial page.
///
/// Newer pages carry a `download-form` whose hidden inputs become the query
/// string; older ones link straight to a `confirm=` URL.
pub fn confirm_url_from_page(html: &str, base: &Url) -> Option<Url> {
    let doc = Html::parse_document(html);
    let form_sel = Selector::parse("form#download-form").expect("form selector should parse");
    let input_sel = Selector::parse("input[name]").expect("input selector should parse");
    let link_sel = Selector::parse(r#"a#uc-download-link, a[href*="confirm="]"#)
        .expect("link selector should parse");

    if let Some(form) = doc.select(&form_sel).next() {
        let action = form.value().attr("action")?;
        let mut url = base.join(action).ok()?;
        {
            let mut pairs = url.query_pairs_mut();
            for input in form.select(&input_sel) {
                let name = input.value().attr("name").unwrap_or_default();
                let value = input.value().attr("value").unwrap_or_default();
                pairs.append_pair(name, value);
            }
        }
        return Some(url);
    }

    doc.select(&link_sel)
        .filter_map(|a| a.value().attr("href"))
        .find_map(|href| base.join(href).ok())
}
