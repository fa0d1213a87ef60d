//! Runtime settings for the loader.
//!
//! Layered as: built-in defaults, then an optional YAML file named by
//! `PADRON_CONFIG`, then individual `PADRON_*` environment overrides.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{env, fs, path::PathBuf, time::Duration};

/// Shared link of the published roster.
pub const DEFAULT_SOURCE_URL: &str =
    "https://drive.google.com/uc?id=1Ix1bGOI3SZeN3RWbkwRWIQhp5-lwiSbX";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the raw dataset is published.
    pub source_url: String,

    /// Local cache file. Presence alone means "already fetched".
    pub data_path: PathBuf,

    /// Deadline for each HTTP request made by the fetcher.
    pub fetch_timeout_secs: u64,

    /// Row ceiling for the strict parse attempt.
    pub strict_row_cap: usize,

    /// Row ceiling for the permissive retry; must be below `strict_row_cap`.
    pub permissive_row_cap: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            data_path: PathBuf::from("data/padron.csv"),
            fetch_timeout_secs: 300,
            strict_row_cap: 2_000_000,
            permissive_row_cap: 500_000,
        }
    }
}

impl Config {
    /// Build the effective config from the process environment.
    pub fn load() -> Result<Self> {
        let mut cfg = match env::var("PADRON_CONFIG") {
            Ok(path) => Self::from_yaml_file(&path)?,
            Err(_) => Self::default(),
        };
        cfg.apply_overrides(|key| env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("reading config {}", path))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing config {}", path))
    }

    /// Apply `PADRON_*` overrides; `lookup` abstracts the environment for tests.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PADRON_SOURCE_URL") {
            self.source_url = v;
        }
        if let Some(v) = lookup("PADRON_DATA_PATH") {
            self.data_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("PADRON_FETCH_TIMEOUT_SECS") {
            self.fetch_timeout_secs = parse_number("PADRON_FETCH_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("PADRON_STRICT_ROW_CAP") {
            self.strict_row_cap = parse_number("PADRON_STRICT_ROW_CAP", &v)?;
        }
        if let Some(v) = lookup("PADRON_PERMISSIVE_ROW_CAP") {
            self.permissive_row_cap = parse_number("PADRON_PERMISSIVE_ROW_CAP", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.source_url.trim().is_empty() {
            bail!("source_url must not be empty");
        }
        if self.fetch_timeout_secs == 0 {
            bail!("fetch_timeout_secs must be positive");
        }
        if self.permissive_row_cap == 0 || self.permissive_row_cap >= self.strict_row_cap {
            bail!(
                "permissive_row_cap ({}) must be positive and below strict_row_cap ({})",
                self.permissive_row_cap,
                self.strict_row_cap
            );
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| anyhow!("{} must be a non-negative integer, got {:?}", key, raw))
}
