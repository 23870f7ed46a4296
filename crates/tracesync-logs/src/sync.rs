use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{debug, warn};

const SYNC_CAPACITY: usize = 64;

/// Identity of a view taking part in time sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewId(u64);

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view-{}", self.0)
    }
}

/// "Scrolled to this point in time" announcement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncEvent {
    pub source: ViewId,
    pub timestamp: i64,
}

/// Broadcast hub keeping views aligned on a timestamp
#[derive(Clone)]
pub struct TimeSync {
    tx: broadcast::Sender<SyncEvent>,
    next_id: Arc<AtomicU64>,
}

impl TimeSync {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(SYNC_CAPACITY);
        Self {
            tx,
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Register a new participant
    pub fn join(&self) -> SyncHandle {
        let id = ViewId(self.next_id.fetch_add(1, Ordering::SeqCst));
        debug!(%id, "joined time sync");
        SyncHandle {
            id,
            tx: self.tx.clone(),
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for TimeSync {
    fn default() -> Self {
        Self::new()
    }
}

/// One participant's end of the [`TimeSync`] hub
pub struct SyncHandle {
    id: ViewId,
    tx: broadcast::Sender<SyncEvent>,
    rx: broadcast::Receiver<SyncEvent>,
}

impl SyncHandle {
    pub fn id(&self) -> ViewId {
        self.id
    }

    /// Announce a timestamp to every other participant
    pub fn publish(&self, timestamp: i64) {
        let event = SyncEvent {
            source: self.id,
            timestamp,
        };
        // No receivers is fine: nobody else is listening yet
        let _ = self.tx.send(event);
    }

    /// Latest timestamp published by another participant since the last call
    pub fn latest(&mut self) -> Option<i64> {
        let mut latest = None;
        loop {
            match self.rx.try_recv() {
                Ok(event) if event.source != self.id => latest = Some(event.timestamp),
                Ok(_) => {}
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(id = %self.id, skipped, "time sync receiver lagged");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        latest
    }
}
