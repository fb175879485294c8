//! Bounded accumulation window of cycle results.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::CycleResult;

/// Number of cycles accumulated before a flush.
pub const WINDOW_CAPACITY: usize = 5;

/// Running totals over the current window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub protocol: u8,
    pub cycles: u32,
    #[serde(with = "super::secs")]
    pub wall_time: Duration,
    #[serde(with = "super::secs")]
    pub cpu_user: Duration,
    #[serde(with = "super::secs")]
    pub cpu_system: Duration,
    #[serde(with = "super::secs")]
    pub cpu_total: Duration,
    /// Sum of per-workload peak memory over the window.
    pub peak_memory_kb: i64,
}

impl Totals {
    fn add(&mut self, result: &CycleResult) {
        self.protocol = result.protocol;
        self.cycles += 1;
        self.wall_time += result.wall_time;
        for stats in result.workloads.values() {
            self.cpu_user += stats.usage.user_cpu;
            self.cpu_system += stats.usage.system_cpu;
            self.peak_memory_kb += stats.usage.max_rss_kb;
        }
        self.cpu_total = self.cpu_user + self.cpu_system;
    }
}

/// A full window, taken out of [`AccumulatedMetrics`] for export.
#[derive(Debug, Clone)]
pub struct WindowFlush {
    pub results: Vec<CycleResult>,
    pub totals: Totals,
}

/// Accumulated metrics: the pending window plus its running totals.
#[derive(Debug, Default)]
pub struct AccumulatedMetrics {
    window: Vec<CycleResult>,
    totals: Totals,
}

impl AccumulatedMetrics {
    pub fn new() -> Self {
        Self {
            window: Vec::with_capacity(WINDOW_CAPACITY),
            totals: Totals::default(),
        }
    }

    /// Add a cycle result.
    ///
    /// When the window reaches capacity its contents and totals are handed
    /// back for export and the accumulator is cleared, so the window never
    /// holds more than [`WINDOW_CAPACITY`] entries.
    pub fn record(&mut self, result: CycleResult) -> Option<WindowFlush> {
        self.totals.add(&result);
        self.window.push(result);
        if self.window.len() < WINDOW_CAPACITY {
            return None;
        }
        let results = std::mem::replace(&mut self.window, Vec::with_capacity(WINDOW_CAPACITY));
        let totals = std::mem::take(&mut self.totals);
        Some(WindowFlush { results, totals })
    }

    /// Discard the window and totals without exporting.
    pub fn clear(&mut self) {
        self.window.clear();
        self.totals = Totals::default();
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn totals(&self) -> &Totals {
        &self.totals
    }
}
