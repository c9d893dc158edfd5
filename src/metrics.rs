use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    /// Event re-emitted under its foreign key.
    Rekeyed,
    /// Event dropped because it had no usable foreign key or payload.
    Malformed,
    /// Event republished to the debug feed.
    Tapped,
    Matched,
    /// Lookup found no admitted entity. Expected, not a fault.
    Missed,
    Admitted,
    Rejected,
    /// Null value on the reference feed, ignored by the table.
    Tombstones,
}

/// Per-pipeline counters. Shared between the reference side and the event
/// side so a single snapshot tells the whole story.
#[derive(Debug, Default)]
pub struct JoinMetrics {
    rekeyed: AtomicU64,
    malformed: AtomicU64,
    tapped: AtomicU64,
    matched: AtomicU64,
    missed: AtomicU64,
    admitted: AtomicU64,
    rejected: AtomicU64,
    tombstones: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub rekeyed: u64,
    pub malformed: u64,
    pub tapped: u64,
    pub matched: u64,
    pub missed: u64,
    pub admitted: u64,
    pub rejected: u64,
    pub tombstones: u64,
}

impl JoinMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, counter: Counter) -> &AtomicU64 {
        match counter {
            Counter::Rekeyed => &self.rekeyed,
            Counter::Malformed => &self.malformed,
            Counter::Tapped => &self.tapped,
            Counter::Matched => &self.matched,
            Counter::Missed => &self.missed,
            Counter::Admitted => &self.admitted,
            Counter::Rejected => &self.rejected,
            Counter::Tombstones => &self.tombstones,
        }
    }

    pub fn incr(&self, counter: Counter) {
        self.counter(counter).fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, counter: Counter) -> u64 {
        self.counter(counter).load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rekeyed: self.get(Counter::Rekeyed),
            malformed: self.get(Counter::Malformed),
            tapped: self.get(Counter::Tapped),
            matched: self.get(Counter::Matched),
            missed: self.get(Counter::Missed),
            admitted: self.get(Counter::Admitted),
            rejected: self.get(Counter::Rejected),
            tombstones: self.get(Counter::Tombstones),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_independent() {
        let m = JoinMetrics::new();
        m.incr(Counter::Missed);
        m.incr(Counter::Missed);
        m.incr(Counter::Malformed);

        let snap = m.snapshot();
        assert_eq!(snap.missed, 2);
        assert_eq!(snap.malformed, 1);
        assert_eq!(snap.matched, 0);
    }
}
