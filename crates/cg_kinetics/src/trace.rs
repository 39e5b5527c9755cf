//! A bounded trace of executed reactions.
//!
//! Switched off by default; when enabled the solver pushes one record per
//! step and the buffer keeps the most recent `capacity` of them. Meant for
//! post-mortem inspection of short windows, not for full trajectories.

use std::collections::VecDeque;
use std::fmt;

/// One executed kMC step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepRecord {
    /// Cycle counter at execution time (zero-based).
    pub cycle: u64,
    /// Simulated time after the step's increment.
    pub time: f64,
    /// Total rate the selection was drawn against.
    pub k_tot: f64,
    /// Index into the rate table that was chosen.
    pub choice: usize,
    pub origin: (usize, usize, usize),
    pub destination: (usize, usize, usize),
}

impl fmt::Display for StepRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cycle {:>8}  t {:>13.6e}  kTot {:>13.6e}  #{:<6} ({}, {}, {}) -> ({}, {}, {})",
            self.cycle,
            self.time,
            self.k_tot,
            self.choice,
            self.origin.0,
            self.origin.1,
            self.origin.2,
            self.destination.0,
            self.destination.1,
            self.destination.2,
        )
    }
}

#[derive(Debug, Default)]
pub struct TraceBuffer {
    enabled: bool,
    capacity: usize,
    records: VecDeque<StepRecord>,
}

impl TraceBuffer {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn bounded(capacity: usize) -> Self {
        Self {
            enabled: capacity > 0,
            capacity,
            records: VecDeque::with_capacity(capacity),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn push(&mut self, record: StepRecord) {
        if !self.enabled {
            return;
        }
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn latest(&self) -> Option<&StepRecord> {
        self.records.back()
    }

    /// Records in execution order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &StepRecord> {
        self.records.iter()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
