use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use tracesync_types::Record;

use crate::error::StoreError;
use crate::time_index;

/// Capacity of the store change notification channel
const EVENT_CAPACITY: usize = 1024;

/// Change notification sent to store observers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreEvent {
    /// Records `[start, end)` were appended
    Inserted { start: usize, end: usize },
    /// Every record was removed
    Cleared { removed: usize },
}

/// Producer-side handle to the hand-off queue
#[derive(Clone, Debug)]
pub struct RecordSender {
    tx: mpsc::UnboundedSender<Record>,
}

impl RecordSender {
    /// Queue a record without blocking
    pub fn send(&self, record: Record) -> Result<(), StoreError> {
        self.tx.send(record).map_err(|_| StoreError::Closed)
    }

    /// Whether the store behind this sender is gone
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Append-only, time-ordered trace store
///
/// Producers push into an unbounded hand-off queue; the consumer moves everything
/// queued into the visible sequence with [`TraceStore::drain_tick`]. Readers only
/// ever see whole batches.
#[derive(Clone)]
pub struct TraceStore {
    /// Visible records, in arrival (and timestamp) order
    records: Arc<RwLock<Vec<Arc<Record>>>>,

    /// Hand-off queue, producer side
    sender: RecordSender,

    /// Hand-off queue, consumer side; locked for the whole drain
    queue: Arc<Mutex<mpsc::UnboundedReceiver<Record>>>,

    /// Bumped on every change to `records`
    generation: Arc<AtomicU64>,

    /// Observer notifications
    events: broadcast::Sender<StoreEvent>,
}

impl TraceStore {
    /// Create an empty store
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
            sender: RecordSender { tx },
            queue: Arc::new(Mutex::new(rx)),
            generation: Arc::new(AtomicU64::new(0)),
            events,
        }
    }

    /// Handle for a producer running elsewhere
    pub fn sender(&self) -> RecordSender {
        self.sender.clone()
    }

    /// Queue a record for the next drain
    pub fn enqueue(&self, record: Record) {
        // The receiver lives as long as `self`, so this cannot fail here
        if self.sender.send(record).is_err() {
            warn!("hand-off queue closed, record dropped");
        }
    }

    /// Move every queued record into the visible sequence
    ///
    /// Returns the appended index range, or `None` if nothing was queued.
    pub fn drain_tick(&self) -> Option<Range<usize>> {
        let mut queue = self.queue.lock();
        let mut batch = Vec::new();
        while let Ok(record) = queue.try_recv() {
            batch.push(Arc::new(record));
        }
        if batch.is_empty() {
            return None;
        }

        let mut records = self.records.write();
        let mut previous = records.last().map(|r| r.timestamp());
        for record in &batch {
            if previous.is_some_and(|p| record.timestamp() < p) {
                warn!(
                    timestamp = record.timestamp(),
                    previous = ?previous,
                    "record arrived out of timestamp order"
                );
            }
            previous = Some(record.timestamp());
        }

        let start = records.len();
        records.extend(batch);
        let end = records.len();
        self.generation.fetch_add(1, Ordering::SeqCst);
        let _ = self.events.send(StoreEvent::Inserted { start, end });
        drop(records);

        debug!(start, end, "drained {} records", end - start);
        Some(start..end)
    }

    /// Number of visible records
    pub fn row_count(&self) -> usize {
        self.records.read().len()
    }

    /// Check if the store has no visible records
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Record at a visible index
    pub fn record_at(&self, index: usize) -> Result<Arc<Record>, StoreError> {
        let records = self.records.read();
        records
            .get(index)
            .cloned()
            .ok_or(StoreError::IndexOutOfRange {
                index,
                len: records.len(),
            })
    }

    /// Index of the last record at or before `timestamp`, clamped to the store
    pub fn nearest_index(&self, timestamp: i64) -> Result<usize, StoreError> {
        time_index::nearest_index(self.records.read().as_slice(), timestamp)
    }

    /// Remove every visible record
    ///
    /// The hand-off queue is untouched: records still queued are appended by the
    /// next drain.
    pub fn clear(&self) {
        let mut records = self.records.write();
        let removed = records.len();
        records.clear();
        self.generation.fetch_add(1, Ordering::SeqCst);
        let _ = self.events.send(StoreEvent::Cleared { removed });
        drop(records);

        info!(removed, "cleared trace store");
    }

    /// Run `f` over a consistent snapshot of the records and its generation
    pub fn with_records<R>(&self, f: impl FnOnce(&[Arc<Record>], u64) -> R) -> R {
        let records = self.records.read();
        f(&records, self.generation.load(Ordering::SeqCst))
    }

    /// Current change counter
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Subscribe to insert/clear notifications
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

impl Default for TraceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(timestamp: i64) -> Record {
        Record::new("2", "core", timestamp, format!("record {}", timestamp))
    }

    #[test]
    fn test_drain_moves_queued_records() {
        let store = TraceStore::new();
        assert_eq!(store.drain_tick(), None);

        store.enqueue(record(1));
        store.enqueue(record(2));
        assert_eq!(store.row_count(), 0);

        assert_eq!(store.drain_tick(), Some(0..2));
        assert_eq!(store.row_count(), 2);

        store.enqueue(record(3));
        assert_eq!(store.drain_tick(), Some(2..3));
        assert_eq!(store.record_at(2).unwrap().timestamp(), 3);
    }

    #[test]
    fn test_record_at_out_of_range() {
        let store = TraceStore::new();
        store.enqueue(record(1));
        store.drain_tick();
        assert_eq!(
            store.record_at(1),
            Err(StoreError::IndexOutOfRange { index: 1, len: 1 })
        );
    }

    #[test]
    fn test_events() {
        let store = TraceStore::new();
        let mut events = store.subscribe();

        store.enqueue(record(1));
        store.enqueue(record(2));
        store.drain_tick();
        store.clear();

        assert_eq!(
            events.try_recv().unwrap(),
            StoreEvent::Inserted { start: 0, end: 2 }
        );
        assert_eq!(events.try_recv().unwrap(), StoreEvent::Cleared { removed: 2 });
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_clear_keeps_queued_records() {
        let store = TraceStore::new();
        store.enqueue(record(1));
        store.drain_tick();
        store.enqueue(record(2));

        let before = store.generation();
        store.clear();
        assert!(store.is_empty());
        assert!(store.generation() > before);

        assert_eq!(store.drain_tick(), Some(0..1));
        assert_eq!(store.record_at(0).unwrap().timestamp(), 2);
    }

    #[test]
    fn test_concurrent_producers_lose_nothing() {
        let store = TraceStore::new();
        let producers: Vec<_> = (0..4)
            .map(|p| {
                let sender = store.sender();
                std::thread::spawn(move || {
                    for i in 0..250 {
                        sender.send(record(p * 1000 + i)).unwrap();
                    }
                })
            })
            .collect();

        let mut drained = 0;
        while producers.iter().any(|p| !p.is_finished()) {
            if let Some(range) = store.drain_tick() {
                drained += range.len();
            }
        }
        for producer in producers {
            producer.join().unwrap();
        }
        while let Some(range) = store.drain_tick() {
            drained += range.len();
        }

        assert_eq!(drained, 1000);
        assert_eq!(store.row_count(), 1000);
        let mut seen: Vec<i64> = store.with_records(|records, _| {
            records.iter().map(|r| r.timestamp()).collect()
        });
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 1000);
    }

    #[test]
    fn test_sender_reports_dropped_store() {
        let store = TraceStore::new();
        let sender = store.sender();
        drop(store);
        assert!(sender.is_closed());
        assert_eq!(sender.send(record(1)), Err(StoreError::Closed));
    }
}
