//! Per-cycle results and the speedup baseline.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol::Protocol;
use crate::workload::Role;

use super::ProcessStats;

/// Result of one executed cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleResult {
    pub cycle: u32,
    pub protocol: u8,
    #[serde(with = "super::secs")]
    pub wall_time: Duration,
    /// Baseline wall time divided by this cycle's wall time, once a baseline exists.
    pub speedup: Option<f64>,
    /// Cycle wall time minus the summed workload wall times, in seconds.
    /// Negative when workloads overlapped.
    pub overhead: f64,
    pub workloads: BTreeMap<Role, ProcessStats>,
}

impl CycleResult {
    /// Combine the per-role stats of a finished cycle.
    ///
    /// Roles that never ran get an empty record so every result carries all
    /// three workloads.
    pub fn assemble(
        cycle: u32,
        protocol: Protocol,
        wall_time: Duration,
        speedup: Option<f64>,
        mut workloads: BTreeMap<Role, ProcessStats>,
    ) -> Self {
        for role in Role::ALL {
            workloads
                .entry(role)
                .or_insert_with(|| ProcessStats::empty(role));
        }
        let busy: f64 = workloads
            .values()
            .map(|stats| stats.wall_time.as_secs_f64())
            .sum();
        Self {
            cycle,
            protocol: protocol.number(),
            wall_time,
            speedup,
            overhead: wall_time.as_secs_f64() - busy,
            workloads,
        }
    }

    /// Stats of one role.
    pub fn stats(&self, role: Role) -> Option<&ProcessStats> {
        self.workloads.get(&role)
    }
}

/// Reference wall time used to compute speedup.
///
/// Established by the first completed cycle of the reference protocol and
/// kept for the lifetime of the orchestrator, across operator resets.
#[derive(Debug, Clone, Default)]
pub struct Baseline {
    reference: Option<Duration>,
}

impl Baseline {
    /// Protocol whose first cycle establishes the baseline.
    pub const REFERENCE: Protocol = Protocol::StrictSequential;

    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed cycle. Returns `true` if it established the baseline.
    pub fn observe(&mut self, protocol: Protocol, wall_time: Duration) -> bool {
        if protocol != Self::REFERENCE || self.reference.is_some() || wall_time.is_zero() {
            return false;
        }
        self.reference = Some(wall_time);
        true
    }

    pub fn reference(&self) -> Option<Duration> {
        self.reference
    }

    /// Baseline / current, or `None` while either side is undefined or zero.
    pub fn speedup(&self, wall_time: Duration) -> Option<f64> {
        let reference = self.reference?;
        if reference.is_zero() || wall_time.is_zero() {
            return None;
        }
        Some(reference.as_secs_f64() / wall_time.as_secs_f64())
    }
}
