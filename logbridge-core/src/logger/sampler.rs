//! Rate sampling for repetition storms
//!
//! Records are counted per level and message within a tick. The first
//! `first` records of each tick pass; after that only every
//! `thereafter`-th one does.

use super::core_backend::Core;
use crate::format::Record;
use crate::level::Level;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

const COUNTERS_PER_LEVEL: usize = 4096;

/// Sampling parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sampling {
    /// Counting window
    pub tick: Duration,
    /// Records per window that always pass
    pub first: u64,
    /// After `first`, pass every n-th record (0 drops the rest)
    pub thereafter: u64,
}

impl Default for Sampling {
    fn default() -> Self {
        Self { tick: Duration::from_secs(1), first: 8, thereafter: 2 }
    }
}

#[derive(Default)]
struct Counter {
    reset_at: AtomicU64,
    count: AtomicU64,
}

impl Counter {
    fn incr_check_reset(&self, now: u64, tick: u64) -> u64 {
        let reset_after = self.reset_at.load(Ordering::Acquire);
        if reset_after > now {
            return self.count.fetch_add(1, Ordering::AcqRel) + 1;
        }

        self.count.store(1, Ordering::Release);
        let new_reset = now + tick;
        if self
            .reset_at
            .compare_exchange(reset_after, new_reset, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            // lost the race, someone else already reset this window
            return self.count.fetch_add(1, Ordering::AcqRel) + 1;
        }
        1
    }
}

/// [`Core`] wrapper dropping repeated records
pub struct Sampler {
    inner: Box<dyn Core>,
    config: Sampling,
    epoch: Instant,
    counters: Vec<Counter>,
}

impl Sampler {
    pub fn new(inner: Box<dyn Core>, config: Sampling) -> Self {
        let counters = (0..Level::ALL.len() * COUNTERS_PER_LEVEL).map(|_| Counter::default()).collect();
        Self { inner, config, epoch: Instant::now(), counters }
    }

    fn counter(&self, level: Level, message: &str) -> &Counter {
        let slot = fnv32a(message) as usize % COUNTERS_PER_LEVEL;
        &self.counters[level.index() * COUNTERS_PER_LEVEL + slot]
    }

    fn sampled(&self, record: &Record) -> bool {
        let now = self.epoch.elapsed().as_nanos() as u64;
        let tick = self.config.tick.as_nanos().max(1) as u64;
        let n = self.counter(record.level, &record.message).incr_check_reset(now, tick);

        if n <= self.config.first {
            return true;
        }
        self.config.thereafter > 0 && (n - self.config.first) % self.config.thereafter == 0
    }
}

impl Core for Sampler {
    fn enabled(&self, level: Level) -> bool {
        self.inner.enabled(level)
    }

    fn write(&self, record: &Record) {
        if self.sampled(record) {
            self.inner.write(record);
        }
    }
}

fn fnv32a(s: &str) -> u32 {
    const OFFSET: u32 = 2_166_136_261;
    const PRIME: u32 = 16_777_619;
    s.bytes().fold(OFFSET, |hash, b| (hash ^ u32::from(b)).wrapping_mul(PRIME))
}
