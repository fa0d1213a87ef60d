// src/parse/mod.rs
use anyhow::{Context, Result};
use csv::{ByteRecord, ErrorKind, ReaderBuilder};
use std::{borrow::Cow, collections::HashSet, path::Path};
use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::error::ParseError;

mod cell;

pub use cell::Cell;

/// Fewer columns than this means the delimiter or encoding guess was wrong.
pub const MIN_COLUMNS: usize = 5;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// Header names in file order, de-duplicated.
    pub columns: Vec<String>,
    /// Every row has exactly `columns.len()` cells.
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    pub strict_row_cap: usize,
    pub permissive_row_cap: usize,
}

impl From<&Config> for ParseOptions {
    fn from(cfg: &Config) -> Self {
        Self {
            strict_row_cap: cfg.strict_row_cap,
            permissive_row_cap: cfg.permissive_row_cap,
        }
    }
}

/// Result of one attempt that did not produce a usable table.
enum AttemptFailure {
    Narrow(usize),
    Raised(String),
}

/// Parse `path` strictly, retrying once with a permissive reader.
#[instrument(level = "info", skip(opts), fields(path = %path.display()))]
pub fn parse(path: &Path, opts: &ParseOptions) -> Result<Table, ParseError> {
    let strict = match read_strict(path, opts.strict_row_cap) {
        Ok(table) if table.columns.len() >= MIN_COLUMNS => {
            info!(rows = table.len(), columns = table.columns.len(), "parsed (strict)");
            return Ok(table);
        }
        Ok(table) => {
            warn!(columns = table.columns.len(), "strict parse too narrow, retrying permissively");
            AttemptFailure::Narrow(table.columns.len())
        }
        Err(e) => {
            warn!(error = %format!("{:#}", e), "strict parse failed, retrying permissively");
            AttemptFailure::Raised(format!("{:#}", e))
        }
    };

    match read_permissive(path, opts.permissive_row_cap) {
        Ok(table) if table.columns.len() >= MIN_COLUMNS => {
            info!(rows = table.len(), columns = table.columns.len(), "parsed (permissive)");
            Ok(table)
        }
        Ok(table) => Err(ParseError::SchemaTooNarrow {
            columns: table.columns.len(),
        }),
        Err(e) => match strict {
            AttemptFailure::Narrow(columns) => Err(ParseError::SchemaTooNarrow { columns }),
            AttemptFailure::Raised(strict) => Err(ParseError::Unparseable {
                strict,
                permissive: format!("{:#}", e),
            }),
        },
    }
}

/// Fixed delimiter, quote-aware, UTF-8 only. Rows of the wrong width are
/// skipped; any other reader error aborts the attempt. At most `cap` records
/// are read.
fn read_strict(path: &Path, cap: usize) -> Result<Table> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b',')
        .quote(b'"')
        .double_quote(true)
        .has_headers(true)
        .flexible(false)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let headers = rdr.headers().context("reading header row")?.clone();
    let columns = normalize_headers(headers.iter().map(Cow::Borrowed));

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    // the cap bounds records read, skipped ones included
    for (idx, result) in rdr.records().take(cap).enumerate() {
        match result {
            Ok(record) => rows.push(record.iter().map(Cell::infer).collect()),
            Err(e) if matches!(e.kind(), ErrorKind::UnequalLengths { .. }) => skipped += 1,
            Err(e) => return Err(e).with_context(|| format!("CSV parse error at record {}", idx)),
        }
    }

    if skipped > 0 {
        info!(skipped, "dropped rows with the wrong number of fields");
    }
    Ok(Table { columns, rows })
}

/// Byte records decoded lossily; short rows padded, long rows and unreadable
/// records dropped.
fn read_permissive(path: &Path, cap: usize) -> Result<Table> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let headers = rdr.byte_headers().context("reading header row")?.clone();
    let columns = normalize_headers(headers.iter().map(String::from_utf8_lossy));
    let width = columns.len();

    let mut rows = Vec::new();
    let mut record = ByteRecord::new();
    let mut dropped = 0usize;
    let mut read = 0usize;
    while read < cap {
        match rdr.read_byte_record(&mut record) {
            Ok(false) => break,
            Ok(true) if record.len() > width => dropped += 1,
            Ok(true) => {
                let mut row: Vec<Cell> = record
                    .iter()
                    .map(|f| Cell::infer(&String::from_utf8_lossy(f)))
                    .collect();
                row.resize(width, Cell::Missing);
                rows.push(row);
            }
            Err(e) if e.is_io_error() => return Err(e).context("reading records"),
            Err(_) => dropped += 1,
        }
        read += 1;
    }

    if dropped > 0 {
        info!(dropped, "dropped malformed rows");
    }
    Ok(Table { columns, rows })
}

/// Trim names, strip a BOM, name blank headers `Unnamed: <i>` and suffix
/// repeats with `.1`, `.2`, ...
fn normalize_headers<'a, I>(raw: I) -> Vec<String>
where
    I: Iterator<Item = Cow<'a, str>>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for (i, name) in raw.enumerate() {
        let name = name.trim_start_matches('\u{feff}').trim();
        let base = if name.is_empty() {
            format!("Unnamed: {}", i)
        } else {
            name.to_string()
        };

        let mut candidate = base.clone();
        let mut n = 0;
        while seen.contains(&candidate) {
            n += 1;
            candidate = format!("{}.{}", base, n);
        }
        seen.insert(candidate.clone());
        out.push(candidate);
    }
    out
}
