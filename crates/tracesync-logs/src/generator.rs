use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use tracesync_types::Record;

use crate::clock::Clock;

/// Number of distinct modules a generator emits records for
const MODULE_COUNT: usize = 5;

const WORDS: &[&str] = &[
    "anchor", "beacon", "buffer", "cache", "channel", "cluster", "cursor", "daemon", "delta",
    "engine", "fiber", "frame", "gateway", "handle", "index", "journal", "kernel", "ledger",
    "matrix", "mirror", "module", "packet", "parser", "pipeline", "pointer", "queue", "relay",
    "router", "sampler", "scheduler", "segment", "signal", "socket", "spindle", "stream",
    "thread", "ticket", "timer", "vector", "worker",
];

/// Synthetic trace source
///
/// Produces records with a task id between 2 and 5, one of a fixed set of module
/// names chosen when the generator is built, and a short random sentence.
pub struct RecordGenerator {
    rng: StdRng,
    clock: Arc<dyn Clock>,
    modules: Vec<String>,
}

impl RecordGenerator {
    /// Create a generator seeded from the operating system
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_rng(clock, StdRng::from_os_rng())
    }

    /// Create a reproducible generator
    pub fn seeded(clock: Arc<dyn Clock>, seed: u64) -> Self {
        Self::with_rng(clock, StdRng::seed_from_u64(seed))
    }

    fn with_rng(clock: Arc<dyn Clock>, mut rng: StdRng) -> Self {
        let modules = WORDS
            .choose_multiple(&mut rng, MODULE_COUNT)
            .map(|word| word.to_string())
            .collect();
        Self {
            rng,
            clock,
            modules,
        }
    }

    /// Module names this generator draws from
    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    /// Build the next record, stamped by the clock
    pub fn generate(&mut self) -> Record {
        let task_id = self.rng.random_range(2..=5).to_string();
        let module = self
            .modules
            .choose(&mut self.rng)
            .cloned()
            .unwrap_or_default();
        let message = self.sentence();
        Record::new(task_id, module, self.clock.now(), message)
    }

    /// Generate `count` records in one go
    pub fn backlog(&mut self, count: usize) -> Vec<Record> {
        (0..count).map(|_| self.generate()).collect()
    }

    /// Random delay within `[min, max]`
    pub fn jitter(&mut self, min: Duration, max: Duration) -> Duration {
        if max <= min {
            return min;
        }
        let millis = self
            .rng
            .random_range(min.as_millis() as u64..=max.as_millis() as u64);
        Duration::from_millis(millis)
    }

    fn sentence(&mut self) -> String {
        let len = self.rng.random_range(4..=12);
        let mut sentence = String::new();
        for i in 0..len {
            let word = WORDS.choose(&mut self.rng).copied().unwrap_or("trace");
            if i == 0 {
                let mut chars = word.chars();
                if let Some(first) = chars.next() {
                    sentence.extend(first.to_uppercase());
                    sentence.push_str(chars.as_str());
                }
            } else {
                sentence.push(' ');
                sentence.push_str(word);
            }
        }
        sentence.push('.');
        sentence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SequenceClock;

    #[test]
    fn test_generated_records() {
        let mut generator = RecordGenerator::seeded(Arc::new(SequenceClock::new(0, 1)), 7);
        assert_eq!(generator.modules().len(), MODULE_COUNT);

        let records = generator.backlog(50);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.timestamp(), i as i64);
            assert!(["2", "3", "4", "5"].contains(&record.task_id()));
            assert!(generator.modules().iter().any(|m| m == record.module()));
            assert!(record.message().ends_with('.'));
        }
    }

    #[test]
    fn test_seeded_generators_agree() {
        let mut a = RecordGenerator::seeded(Arc::new(SequenceClock::new(0, 1)), 42);
        let mut b = RecordGenerator::seeded(Arc::new(SequenceClock::new(0, 1)), 42);
        assert_eq!(a.backlog(10), b.backlog(10));
    }

    #[test]
    fn test_jitter_bounds() {
        let mut generator = RecordGenerator::seeded(Arc::new(SequenceClock::new(0, 1)), 1);
        let min = Duration::from_millis(50);
        let max = Duration::from_millis(100);
        for _ in 0..100 {
            let delay = generator.jitter(min, max);
            assert!(delay >= min && delay <= max);
        }
        assert_eq!(generator.jitter(max, min), max);
    }
}
