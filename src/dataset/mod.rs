// src/dataset/mod.rs

use chrono::{DateTime, Utc};
use std::{
    path::PathBuf,
    sync::{Arc, Mutex, RwLock},
};
use tracing::info;

use crate::parse::Table;
use crate::schema::{self, FieldMapping};

mod state;

pub use state::LoadState;

/// A loaded table together with the column mapping discovered for it.
#[derive(Debug)]
pub struct Dataset {
    pub table: Table,
    pub mapping: FieldMapping,
    pub source: PathBuf,
    pub loaded_at: DateTime<Utc>,
}

impl Dataset {
    /// Resolve the mapping once; it is never recomputed per query.
    pub fn new(table: Table, source: impl Into<PathBuf>) -> Self {
        let mapping = schema::resolve(&table.columns);
        Self {
            table,
            mapping,
            source: source.into(),
            loaded_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Process-wide reference to the current dataset.
///
/// Readers clone the inner `Arc` and keep using it even if a reload swaps in a
/// new table underneath them.
#[derive(Debug)]
pub struct DatasetHandle {
    current: RwLock<Option<Arc<Dataset>>>,
    state: Mutex<LoadState>,
}

impl Default for DatasetHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetHandle {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
            state: Mutex::new(LoadState::Idle),
        }
    }

    pub fn current(&self) -> Option<Arc<Dataset>> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Swap in `dataset` as a whole and mark the handle ready.
    pub fn install(&self, dataset: Dataset) -> Arc<Dataset> {
        let dataset = Arc::new(dataset);
        info!(records = dataset.len(), columns = dataset.table.columns.len(), "dataset installed");
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Arc::clone(&dataset));
        self.set_state(LoadState::Ready);
        dataset
    }

    pub fn is_ready(&self) -> bool {
        self.current().is_some()
    }

    pub fn record_count(&self) -> usize {
        self.current().map_or(0, |d| d.len())
    }

    pub fn state(&self) -> LoadState {
        *self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claim the right to run a load. Returns `false` if one is already running.
    pub fn begin_loading(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if *state == LoadState::Loading {
            return false;
        }
        *state = LoadState::Loading;
        true
    }

    /// Record a failed load. A table installed earlier stays in service.
    pub fn mark_unavailable(&self) {
        let next = if self.is_ready() {
            LoadState::Ready
        } else {
            LoadState::Unavailable
        };
        self.set_state(next);
    }

    fn set_state(&self, next: LoadState) {
        *self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = next;
    }
}
