use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::generator::RecordGenerator;
use crate::store::RecordSender;

/// Delay bounds between generated records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProducerConfig {
    pub min_jitter: Duration,
    pub max_jitter: Duration,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            min_jitter: Duration::from_millis(50),
            max_jitter: Duration::from_millis(100),
        }
    }
}

/// Background task feeding generated records into a store
pub struct TraceProducer {
    config: ProducerConfig,

    /// Cancellation token for stopping the task
    cancel: CancellationToken,

    task: Option<JoinHandle<()>>,

    paused: Arc<AtomicBool>,

    /// Records sent since creation
    produced: Arc<AtomicU64>,
}

impl TraceProducer {
    pub fn new(config: ProducerConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
            task: None,
            paused: Arc::new(AtomicBool::new(false)),
            produced: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Spawn the producer task; a running one is stopped first
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, sender: RecordSender, mut generator: RecordGenerator) {
        self.stop();

        let cancel = self.cancel.clone();
        let paused = Arc::clone(&self.paused);
        let produced = Arc::clone(&self.produced);
        let config = self.config;

        info!(
            min_ms = config.min_jitter.as_millis() as u64,
            max_ms = config.max_jitter.as_millis() as u64,
            "starting trace producer"
        );

        self.task = Some(tokio::spawn(async move {
            loop {
                let delay = generator.jitter(config.min_jitter, config.max_jitter);
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }

                if paused.load(Ordering::SeqCst) {
                    continue;
                }

                if sender.send(generator.generate()).is_err() {
                    // Store is gone, nothing left to feed
                    debug!("record channel closed, producer exiting");
                    break;
                }
                produced.fetch_add(1, Ordering::SeqCst);
            }
        }));
    }

    /// Keep the task alive but stop generating
    pub fn pause(&self) {
        if !self.paused.swap(true, Ordering::SeqCst) {
            info!("trace producer paused");
        }
    }

    pub fn resume(&self) {
        if self.paused.swap(false, Ordering::SeqCst) {
            info!("trace producer resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Stop the task
    pub fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
            info!(produced = self.produced(), "trace producer stopped");
        }
        // Fresh token so the producer can be started again
        self.cancel = CancellationToken::new();
    }

    /// Check if the task is still running
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn produced(&self) -> u64 {
        self.produced.load(Ordering::SeqCst)
    }
}

impl Default for TraceProducer {
    fn default() -> Self {
        Self::new(ProducerConfig::default())
    }
}

impl Drop for TraceProducer {
    fn drop(&mut self) {
        self.stop();
    }
}
