use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{debug, error, info, warn};

use tracesync_types::{FormatError, Record, RecordFormat};

use crate::error::{FilterInstallError, StoreError};
use crate::filter::CompiledFilter;
use crate::store::{StoreEvent, TraceStore};
use crate::sync::SyncHandle;
use crate::time_index::{self, FilteredRows};

/// Change notification for whoever presents a view
///
/// Row ranges are half-open and in filtered coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewEvent {
    Inserted { start: usize, end: usize },
    Removed { start: usize, end: usize },
    /// Every row may have changed; re-read the whole view
    Reset,
    /// Another view selected a point in time; this row is nearest to it
    ScrollTo { row: usize },
}

/// Window onto the store showing only the records that pass a filter
pub struct FilteredView {
    store: TraceStore,
    filter: Option<CompiledFilter>,
    format: RecordFormat,

    /// Store indices of matching records, ascending
    rows: Vec<usize>,

    /// Store generation `rows` was built from; `None` forces a rebuild
    rows_generation: Option<u64>,

    /// Row count last reported through [`ViewEvent`]s
    known_rows: usize,

    store_events: broadcast::Receiver<StoreEvent>,
    pending: VecDeque<ViewEvent>,
    sync: Option<SyncHandle>,
}

impl FilteredView {
    /// Create an unfiltered view over `store`
    pub fn new(store: TraceStore) -> Self {
        let store_events = store.subscribe();
        let mut view = Self {
            store,
            filter: None,
            format: RecordFormat::default(),
            rows: Vec::new(),
            rows_generation: None,
            known_rows: 0,
            store_events,
            pending: VecDeque::new(),
            sync: None,
        };
        view.known_rows = view.row_count();
        view
    }

    /// Number of records passing the filter
    pub fn row_count(&mut self) -> usize {
        self.with_rows(|view, _| view.rows.len())
    }

    /// Store index behind a filtered row
    pub fn row_at(&mut self, row: usize) -> Result<usize, StoreError> {
        self.with_rows(|view, _| view.lookup(row))
    }

    /// Record behind a filtered row
    pub fn record(&mut self, row: usize) -> Result<Arc<Record>, StoreError> {
        self.with_rows(|view, records| -> Result<Arc<Record>, StoreError> {
            let index = view.lookup(row)?;
            Ok(Arc::clone(&records[index]))
        })
    }

    /// Filtered row rendered through the display format
    pub fn data(&mut self, row: usize) -> Result<String, StoreError> {
        self.with_rows(|view, records| -> Result<String, StoreError> {
            let index = view.lookup(row)?;
            Ok(view.format.render(&records[index]))
        })
    }

    /// Install or remove the filter
    ///
    /// A new filter is evaluated against the first stored record before it replaces
    /// the current one. On error the current filter stays active.
    pub fn set_filter(&mut self, filter: Option<CompiledFilter>) -> Result<(), FilterInstallError> {
        let store = self.store.clone();
        let installed = store.with_records(|records, generation| -> Result<(), FilterInstallError> {
            if let Some(filter) = &filter {
                let sample = records.first().ok_or(FilterInstallError::NoSampleRecord)?;
                filter.validate(sample)?;
            }

            match &filter {
                Some(f) => info!(filter = f.source(), "installed filter"),
                None => info!("cleared filter"),
            }
            self.filter = filter;
            self.rows_generation = None;
            self.reset(records, generation);
            Ok(())
        });
        installed.inspect_err(|e| warn!(error = %e, "filter rejected"))
    }

    /// Compile and install filter text; blank text removes the filter
    pub fn set_filter_text(&mut self, text: &str) -> Result<(), FilterInstallError> {
        if text.trim().is_empty() {
            return self.set_filter(None);
        }
        let filter = CompiledFilter::compile(text)
            .map_err(FilterInstallError::from)
            .inspect_err(|e| warn!(error = %e, "filter rejected"))?;
        self.set_filter(Some(filter))
    }

    pub fn filter(&self) -> Option<&CompiledFilter> {
        self.filter.as_ref()
    }

    /// Replace the display format
    pub fn set_format(&mut self, template: &str) -> Result<(), FormatError> {
        self.format = RecordFormat::parse(template)?;
        self.pending.push_back(ViewEvent::Reset);
        Ok(())
    }

    pub fn format(&self) -> &RecordFormat {
        &self.format
    }

    /// Last filtered row at or before `timestamp`, clamped to the view
    pub fn nearest_row(&mut self, timestamp: i64) -> Result<usize, StoreError> {
        self.with_rows(|view, records| {
            let rows = FilteredRows {
                records,
                rows: &view.rows,
            };
            time_index::nearest_index(&rows, timestamp)
        })
    }

    /// Select a row and announce its timestamp to synced views
    pub fn select_row(&mut self, row: usize) -> Result<i64, StoreError> {
        let timestamp = self.record(row)?.timestamp();
        if let Some(sync) = &self.sync {
            sync.publish(timestamp);
        }
        Ok(timestamp)
    }

    /// Take part in cross-view time sync
    pub fn attach_sync(&mut self, handle: SyncHandle) {
        self.sync = Some(handle);
    }

    /// Follow the latest timestamp another view selected
    ///
    /// Queues [`ViewEvent::ScrollTo`] and returns the row, if there was anything to
    /// follow and anything to scroll to.
    pub fn apply_sync(&mut self) -> Option<usize> {
        let timestamp = self.sync.as_mut()?.latest()?;
        match self.nearest_row(timestamp) {
            Ok(row) => {
                self.pending.push_back(ViewEvent::ScrollTo { row });
                Some(row)
            }
            Err(e) => {
                debug!(timestamp, error = %e, "nothing to sync to");
                None
            }
        }
    }

    /// Turn store changes since the last call into [`ViewEvent`]s
    pub fn refresh(&mut self) {
        let store = self.store.clone();
        store.with_records(|records, generation| {
            let mut lagged = false;
            loop {
                match self.store_events.try_recv() {
                    Ok(StoreEvent::Cleared { .. }) => {
                        if self.known_rows > 0 {
                            self.pending.push_back(ViewEvent::Removed {
                                start: 0,
                                end: self.known_rows,
                            });
                        }
                        self.known_rows = 0;
                    }
                    Ok(StoreEvent::Inserted { .. }) => {}
                    Err(TryRecvError::Lagged(skipped)) => {
                        warn!(skipped, "view fell behind store events");
                        lagged = true;
                    }
                    Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
                }
            }

            if lagged {
                self.reset(records, generation);
                return;
            }

            self.ensure_rows(records, generation);
            let count = self.rows.len();
            if count > self.known_rows {
                self.pending.push_back(ViewEvent::Inserted {
                    start: self.known_rows,
                    end: count,
                });
            } else if count < self.known_rows {
                self.pending.push_back(ViewEvent::Reset);
            }
            self.known_rows = count;
        });
    }

    /// Hand queued notifications to the caller
    pub fn take_events(&mut self) -> Vec<ViewEvent> {
        self.pending.drain(..).collect()
    }

    fn lookup(&self, row: usize) -> Result<usize, StoreError> {
        self.rows
            .get(row)
            .copied()
            .ok_or(StoreError::IndexOutOfRange {
                index: row,
                len: self.rows.len(),
            })
    }

    fn with_rows<R>(&mut self, f: impl FnOnce(&mut Self, &[Arc<Record>]) -> R) -> R {
        let store = self.store.clone();
        store.with_records(|records, generation| {
            self.ensure_rows(records, generation);
            f(self, records)
        })
    }

    fn ensure_rows(&mut self, records: &[Arc<Record>], generation: u64) {
        if self.rows_generation != Some(generation) {
            self.rows = scan(records, self.filter.as_ref());
            self.rows_generation = Some(generation);
        }
    }

    /// Rebuild everything and discard store events already covered by the snapshot
    fn reset(&mut self, records: &[Arc<Record>], generation: u64) {
        while !matches!(
            self.store_events.try_recv(),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed)
        ) {}
        self.ensure_rows(records, generation);
        self.known_rows = self.rows.len();
        self.pending.push_back(ViewEvent::Reset);
    }
}

/// Store indices of the records passing `filter`
///
/// A record the filter fails on is left out; the first failure is logged.
fn scan(records: &[Arc<Record>], filter: Option<&CompiledFilter>) -> Vec<usize> {
    let Some(filter) = filter else {
        return (0..records.len()).collect();
    };

    let mut rows = Vec::new();
    let mut failures = 0usize;
    for (index, record) in records.iter().enumerate() {
        match filter.matches(record) {
            Ok(true) => rows.push(index),
            Ok(false) => {}
            Err(e) => {
                if failures == 0 {
                    error!(filter = filter.source(), index, error = %e, "filter evaluation failed");
                }
                failures += 1;
            }
        }
    }
    if failures > 1 {
        error!(filter = filter.source(), failures, "rows excluded by failed evaluation");
    }
    rows
}
