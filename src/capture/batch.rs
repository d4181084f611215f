use std::mem;
use std::time::{Duration, Instant};

/// Accumulates items and decides when the in-progress batch is due.
///
/// A batch is due once it holds `max` items, or, when an interval is set,
/// once that much time has passed since the previous flush. Empty batches
/// are never due.
#[derive(Debug)]
pub struct Batcher<T> {
    items: Vec<T>,
    max: usize,
    interval: Option<Duration>,
    last_flush: Instant,
}

impl<T> Batcher<T> {
    pub fn new(max: usize, interval: Option<Duration>, now: Instant) -> Self {
        let max = max.max(1);
        Self { items: Vec::with_capacity(max), max, interval, last_flush: now }
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        if self.items.is_empty() {
            return false;
        }
        self.items.len() >= self.max
            || self.interval.is_some_and(|i| now.saturating_duration_since(self.last_flush) >= i)
    }

    /// Hands over the batch and restarts the interval clock.
    pub fn take(&mut self, now: Instant) -> Vec<T> {
        self.last_flush = now;
        mem::replace(&mut self.items, Vec::with_capacity(self.max))
    }
}
