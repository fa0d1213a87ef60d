// src/service.rs
//
// What a front end (HTTP, CLI) calls into: one-shot load plus typed lookups.

use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::config::Config;
use crate::dataset::{Dataset, DatasetHandle, LoadState};
use crate::error::{LoadError, QueryError};
use crate::fetch::{FetchOutcome, Fetcher};
use crate::parse::{self, ParseOptions};
use crate::query::{QueryEngine, QueryResult, Stats};
use crate::schema::LogicalField;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadOutcome {
    pub loaded: bool,
    pub record_count: usize,
}

/// Readiness report for health checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Health {
    pub ready: bool,
    pub records: usize,
    pub state: &'static str,
}

#[derive(Clone)]
pub struct Service {
    config: Arc<Config>,
    fetcher: Arc<Fetcher>,
    handle: Arc<DatasetHandle>,
}

impl Service {
    pub fn new(config: Config) -> Self {
        let fetcher = Fetcher::from_config(&config);
        Self::with_fetcher(config, fetcher)
    }

    pub fn with_fetcher(config: Config, fetcher: Fetcher) -> Self {
        Self {
            config: Arc::new(config),
            fetcher: Arc::new(fetcher),
            handle: Arc::new(DatasetHandle::new()),
        }
    }

    pub fn handle(&self) -> Arc<DatasetHandle> {
        Arc::clone(&self.handle)
    }

    /// Fetch, parse and install the dataset on the blocking pool.
    ///
    /// Failures are logged and reported as `loaded: false`; the caller keeps
    /// serving and every query answers `NotReady`.
    pub async fn startup_load(&self) -> LoadOutcome {
        let this = self.clone();
        match tokio::task::spawn_blocking(move || this.load_blocking()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "load task panicked");
                self.handle.mark_unavailable();
                self.outcome()
            }
        }
    }

    /// Load again if nothing is installed and no load is running.
    ///
    /// Lookups never trigger a load themselves: they are synchronous and a
    /// load does blocking network I/O. A front end that wants lazy recovery
    /// after a failed startup calls this before answering a request.
    pub async fn ensure_loaded(&self) -> LoadOutcome {
        if self.handle.is_ready() || self.handle.state() == LoadState::Loading {
            return self.outcome();
        }
        self.startup_load().await
    }

    /// Same pipeline as [`Service::startup_load`], on the current thread.
    pub fn load_blocking(&self) -> LoadOutcome {
        if !self.handle.begin_loading() {
            info!("load already in progress");
            return self.outcome();
        }

        match self.run_pipeline() {
            Ok(dataset) => {
                self.handle.install(dataset);
            }
            Err(e) => {
                error!(error = %e, "dataset unavailable");
                self.handle.mark_unavailable();
            }
        }
        self.outcome()
    }

    #[instrument(level = "info", skip(self), fields(path = %self.config.data_path.display()))]
    fn run_pipeline(&self) -> Result<Dataset, LoadError> {
        let path = &self.config.data_path;
        match self.fetcher.ensure_local(path)? {
            FetchOutcome::AlreadyPresent => info!("using cached dataset"),
            FetchOutcome::Downloaded { transport, bytes } => {
                info!(transport, bytes, "fetched dataset")
            }
        }

        let table = parse::parse(path, &ParseOptions::from(&*self.config))?;
        let dataset = Dataset::new(table, path.clone());
        for field in LogicalField::ALL {
            if !dataset.mapping.contains(field) {
                warn!(field = %field, "queries on this field will be rejected");
            }
        }
        Ok(dataset)
    }

    pub fn is_ready(&self) -> bool {
        self.handle.is_ready()
    }

    pub fn record_count(&self) -> usize {
        self.handle.record_count()
    }

    pub fn health(&self) -> Health {
        Health {
            ready: self.handle.is_ready(),
            records: self.handle.record_count(),
            state: self.handle.state().as_str(),
        }
    }

    pub fn lookup_by_document(&self, id: &str) -> Result<QueryResult, QueryError> {
        self.with_engine(|q| q.exact_lookup(LogicalField::DocumentId, id))
    }

    pub fn lookup_by_payroll(&self, id: &str) -> Result<QueryResult, QueryError> {
        self.with_engine(|q| q.exact_lookup(LogicalField::PayrollId, id))
    }

    pub fn search_by_name(&self, query: &str) -> Result<QueryResult, QueryError> {
        self.with_engine(|q| q.name_search(query))
    }

    /// Counts for whichever of department, status and sex the source provides.
    pub fn stats(&self) -> Result<Stats, QueryError> {
        self.with_engine(|q| {
            let dataset = q.dataset();
            let fields: Vec<LogicalField> = LogicalField::CATEGORICAL
                .into_iter()
                .filter(|f| dataset.mapping.contains(*f))
                .collect();
            if fields.is_empty() {
                return Err(q.unsupported(LogicalField::CATEGORICAL[0]));
            }
            Self::stats_with(q, &fields)
        })
    }

    /// Counts for exactly `fields`; each one must be mapped.
    pub fn stats_for(&self, fields: &[LogicalField]) -> Result<Stats, QueryError> {
        self.with_engine(|q| Self::stats_with(q, fields))
    }

    fn stats_with(q: &QueryEngine<'_>, fields: &[LogicalField]) -> Result<Stats, QueryError> {
        Ok(Stats {
            total_records: q.dataset().len(),
            counts: q.aggregate(fields)?,
        })
    }

    fn with_engine<T, F>(&self, f: F) -> Result<T, QueryError>
    where
        F: FnOnce(&QueryEngine<'_>) -> Result<T, QueryError>,
    {
        let dataset = self.handle.current().ok_or(QueryError::NotReady)?;
        f(&QueryEngine::new(&dataset))
    }

    fn outcome(&self) -> LoadOutcome {
        LoadOutcome {
            loaded: self.handle.is_ready(),
            record_count: self.handle.record_count(),
        }
    }
}
