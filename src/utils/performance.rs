//! Step counters for layout passes
//!
//! Counts how often each pipeline step did something during one layout
//! run (collisions discarded, endpoints relocated, ...). The counts are
//! returned with the layout result and logged at debug level.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-step counters for one layout run
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct StepCounters {
    counts: BTreeMap<String, usize>,
}

impl StepCounters {
    pub fn new() -> Self {
        Self {
            counts: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, step: &str) {
        self.record_many(step, 1);
    }

    pub fn record_many(&mut self, step: &str, count: usize) {
        if count == 0 {
            return;
        }
        *self.counts.entry(step.to_string()).or_insert(0) += count;
    }

    pub fn count(&self, step: &str) -> usize {
        self.counts.get(step).copied().unwrap_or(0)
    }

    /// One-line summary, e.g. `collected=12 relocated=1`
    pub fn summary(&self) -> String {
        self.counts
            .iter()
            .map(|(step, count)| format!("{}={}", step, count))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_summary() {
        let mut counters = StepCounters::new();
        counters.record("relocated");
        counters.record_many("collected", 3);
        counters.record_many("ignored", 0);
        counters.record("relocated");

        assert_eq!(counters.count("relocated"), 2);
        assert_eq!(counters.count("collected"), 3);
        assert_eq!(counters.count("ignored"), 0);
        assert_eq!(counters.summary(), "collected=3 relocated=2");
    }
}
