//! Trace streaming and filtered views for tracesync
//!
//! A [`TraceProducer`] feeds generated records through an unbounded channel into a
//! [`TraceStore`], which makes them visible in batches on each
//! [`TraceStore::drain_tick`]. [`FilteredView`]s expose the records passing a
//! [`CompiledFilter`] and can be kept on the same point in time with [`TimeSync`].

mod clock;
mod error;
mod filter;
mod generator;
mod producer;
mod store;
mod sync;
mod time_index;
mod view;

pub use clock::{Clock, SequenceClock, SystemClock};
pub use error::{FilterInstallError, StoreError};
pub use filter::CompiledFilter;
pub use generator::RecordGenerator;
pub use producer::{ProducerConfig, TraceProducer};
pub use store::{RecordSender, StoreEvent, TraceStore};
pub use sync::{SyncEvent, SyncHandle, TimeSync, ViewId};
pub use time_index::{FilteredRows, TimeOrdered, nearest_index};
pub use view::{FilteredView, ViewEvent};

// Re-export types used in our public API
pub use tracesync_types::{FormatError, Record, RecordFormat};
