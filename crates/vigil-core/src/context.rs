//! Per-cycle execution context.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::metrics::{CycleResult, ProcessStats};
use crate::protocol::Protocol;
use crate::workload::Role;

/// State owned by one cycle and passed down the protocol call chain.
///
/// Collects the stats of every workload that terminates during the cycle,
/// keyed by role. Repeated invocations of a role within the cycle (the
/// reactive shield) are folded into one record.
#[derive(Debug)]
pub struct CycleContext {
    cycle: u32,
    protocol: Protocol,
    started: Instant,
    stats: BTreeMap<Role, ProcessStats>,
}

impl CycleContext {
    pub fn new(cycle: u32, protocol: Protocol) -> Self {
        Self {
            cycle,
            protocol,
            started: Instant::now(),
            stats: BTreeMap::new(),
        }
    }

    pub fn cycle(&self) -> u32 {
        self.cycle
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Record the stats of a terminated workload.
    pub fn record(&mut self, stats: ProcessStats) {
        match self.stats.get_mut(&stats.role) {
            Some(existing) => existing.absorb(&stats),
            None => {
                self.stats.insert(stats.role, stats);
            }
        }
    }

    pub fn stats(&self, role: Role) -> Option<&ProcessStats> {
        self.stats.get(&role)
    }

    /// Close the cycle into a result.
    pub fn into_result(self, wall_time: Duration, speedup: Option<f64>) -> CycleResult {
        CycleResult::assemble(self.cycle, self.protocol, wall_time, speedup, self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_folds_repeated_roles() {
        let mut ctx = CycleContext::new(1, Protocol::RoundRobin);
        for _ in 0..3 {
            let mut stats = ProcessStats::empty(Role::Shield);
            stats.invocations = 1;
            stats.wall_time = Duration::from_millis(10);
            ctx.record(stats);
        }
        let shield = ctx.stats(Role::Shield).unwrap();
        assert_eq!(shield.invocations, 3);
        assert_eq!(shield.wall_time, Duration::from_millis(30));
        assert!(ctx.stats(Role::Receiver).is_none());

        let result = ctx.into_result(Duration::from_secs(1), None);
        assert_eq!(result.workloads.len(), 3);
        assert_eq!(result.cycle, 1);
    }
}
