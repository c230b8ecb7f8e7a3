//! Collection-cycle statistics.
//!
//! When `CollectorConfig::stats_history` is non-zero the collector
//! records one [`CycleStats`] per completed cycle, keeping the most
//! recent entries. Records serialize to JSON for external tooling.

use chrono::{DateTime, Local};
use serde::Serialize;

/// Statistics for one completed collection cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleStats {
    /// 1-based cycle number.
    pub cycle: u64,
    /// Exclusive upper bound of the collected generations.
    pub upto: u32,
    /// Wall-clock time the cycle started.
    pub started_at: DateTime<Local>,
    /// Cycle duration in microseconds.
    pub duration_us: u64,
    /// Number of root entries walked.
    pub roots_scanned: usize,
    /// Objects evacuated into to-space.
    pub objects_evacuated: usize,
    /// Payload bytes evacuated (padded sizes).
    pub bytes_evacuated: usize,
    /// Unreachable objects whose destructors ran during the sweep.
    pub objects_dropped: usize,
    /// Bytes allocated across all to-spaces after the cycle.
    pub allocated_after: usize,
}

impl std::fmt::Display for CycleStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cycle {} upto g{}: {} roots, {} objects / {} bytes evacuated, \
             {} dropped, {} us",
            self.cycle,
            self.upto,
            self.roots_scanned,
            self.objects_evacuated,
            self.bytes_evacuated,
            self.objects_dropped,
            self.duration_us
        )
    }
}

/// Bounded history of recent cycles.
#[derive(Debug, Default)]
pub struct StatsHistory {
    capacity: usize,
    entries: Vec<CycleStats>,
}

impl StatsHistory {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, entries: Vec::new() }
    }

    /// Append a record, evicting the oldest when full.
    pub fn push(&mut self, stats: CycleStats) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.remove(0);
        }
        self.entries.push(stats);
    }

    /// Recorded cycles, oldest first.
    pub fn entries(&self) -> &[CycleStats] {
        &self.entries
    }

    /// Render the history as a JSON array.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.entries).unwrap_or_else(|_| "[]".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(cycle: u64) -> CycleStats {
        CycleStats {
            cycle,
            upto: 1,
            started_at: Local::now(),
            duration_us: 12,
            roots_scanned: 1,
            objects_evacuated: 2,
            bytes_evacuated: 32,
            objects_dropped: 0,
            allocated_after: 64,
        }
    }

    #[test]
    fn test_bounded_history() {
        let mut h = StatsHistory::new(2);

        h.push(sample(1));
        h.push(sample(2));
        h.push(sample(3));

        let cycles: Vec<u64> = h.entries().iter().map(|s| s.cycle).collect();
        assert_eq!(cycles, vec![2, 3]);
    }

    #[test]
    fn test_zero_capacity_records_nothing() {
        let mut h = StatsHistory::new(0);
        h.push(sample(1));
        assert!(h.entries().is_empty());
    }

    #[test]
    fn test_json_round_trip() {
        let mut h = StatsHistory::new(4);
        h.push(sample(1));

        let json = h.to_json();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["cycle"], 1);
        assert_eq!(parsed[0]["objects_evacuated"], 2);
    }

    #[test]
    fn test_display() {
        let s = sample(7).to_string();
        assert!(s.contains("cycle 7"));
        assert!(s.contains("32 bytes"));
    }
}
