//! Metrics aggregation and report export.
//!
//! Raw `rusage` snapshots become [`ProcessStats`], the stats of a cycle become
//! a [`CycleResult`], and results accumulate in a bounded window that is
//! exported through [`ReportWriter`] whenever it fills up.

mod cycle;
pub mod report;
mod secs;
mod stats;
mod window;

pub use cycle::{Baseline, CycleResult};
pub use report::ReportWriter;
pub use stats::{ExitKind, ProcessStats, ResourceUsage, ScheduleTally, SignalTally};
pub use window::{AccumulatedMetrics, Totals, WINDOW_CAPACITY, WindowFlush};
