// src/fetch/mod.rs

use anyhow::{Context, Result};
use std::{
    fs::{self, File},
    io::{BufRead, BufReader, Read, Write},
    path::Path,
    time::Instant,
};
use tracing::{error, info, instrument, warn};

use crate::config::Config;
use crate::error::FetchError;

pub mod drive;
pub mod stream;

pub use drive::DriveTransport;
pub use stream::StreamTransport;

/// Bytes moved per read/write when copying a response body to disk.
pub const CHUNK_SIZE: usize = 8192;

/// One way of getting the remote dataset onto local disk.
pub trait Transport: Send + Sync {
    fn name(&self) -> &'static str;

    /// Write the resource at `url` to `dest`, returning the number of bytes written.
    fn download(&self, url: &str, dest: &Path) -> Result<u64>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    AlreadyPresent,
    Downloaded { transport: &'static str, bytes: u64 },
}

/// Ordered chain of transports in front of a single local cache file.
pub struct Fetcher {
    source_url: String,
    transports: Vec<Box<dyn Transport>>,
}

impl Fetcher {
    pub fn new(source_url: impl Into<String>, transports: Vec<Box<dyn Transport>>) -> Self {
        Self {
            source_url: source_url.into(),
            transports,
        }
    }

    /// Default chain: the large-file helper first, then a plain streamed GET.
    pub fn from_config(cfg: &Config) -> Self {
        let timeout = cfg.fetch_timeout();
        Self::new(
            cfg.source_url.clone(),
            vec![
                Box::new(DriveTransport::new(timeout)),
                Box::new(StreamTransport::new(timeout)),
            ],
        )
    }

    /// Make sure `dest` holds the dataset. An existing file is trusted as-is.
    #[instrument(level = "info", skip(self), fields(dest = %dest.display()))]
    pub fn ensure_local(&self, dest: &Path) -> Result<FetchOutcome, FetchError> {
        if dest.exists() {
            info!("cache file present, skipping fetch");
            return Ok(FetchOutcome::AlreadyPresent);
        }
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut attempts = Vec::with_capacity(self.transports.len());
        for transport in &self.transports {
            let name = transport.name();
            let start = Instant::now();
            match transport.download(&self.source_url, dest) {
                Ok(bytes) => {
                    info!(transport = name, bytes, elapsed = ?start.elapsed(), "downloaded");
                    validate_tabular(dest)?;
                    return Ok(FetchOutcome::Downloaded {
                        transport: name,
                        bytes,
                    });
                }
                Err(e) => {
                    warn!(transport = name, error = %format!("{:#}", e), "transport failed");
                    remove_partial(dest);
                    attempts.push(format!("{}: {:#}", name, e));
                }
            }
        }

        error!(attempts = attempts.len(), "no transport could fetch the dataset");
        Err(FetchError::NetworkError { attempts })
    }
}

/// Reject files whose first line is markup: a login or error page saved as data.
pub fn validate_tabular(path: &Path) -> Result<(), FetchError> {
    let mut first = Vec::new();
    BufReader::new(File::open(path)?).read_until(b'\n', &mut first)?;

    let line = first.trim_ascii_start();
    if line.starts_with(b"<!DOCTYPE") || line.starts_with(b"<html") {
        error!(path = %path.display(), "fetched an HTML page instead of data, discarding");
        fs::remove_file(path)?;
        return Err(FetchError::AuthenticationWall {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// Copy `body` into a fresh file at `dest` in `CHUNK_SIZE` pieces.
pub(crate) fn copy_in_chunks<R: Read>(mut body: R, dest: &Path) -> Result<u64> {
    let mut file =
        File::create(dest).with_context(|| format!("creating {}", dest.display()))?;
    let mut buf = [0u8; CHUNK_SIZE];
    let mut total = 0u64;
    loop {
        let n = body.read(&mut buf).context("reading response body")?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n])
            .with_context(|| format!("writing {}", dest.display()))?;
        total += n as u64;
    }
    file.flush()?;
    Ok(total)
}

fn remove_partial(dest: &Path) {
    if dest.exists() {
        if let Err(e) = fs::remove_file(dest) {
            warn!(path = %dest.display(), error = %e, "could not remove partial download");
        }
    }
}
