//! Cooperative round-robin scheduler.
//!
//! Workloads run only while the scheduler grants them a quantum: each grant
//! resumes the workload, sleeps for the quantum and then checks without
//! blocking whether it exited. A workload that is still alive is suspended
//! again; one that exited is reaped and dropped from the rotation.
//!
//! ```text
//!            admit (hold)
//!                 │
//!                 ▼
//!   ┌──────── Suspended ◀──────┐
//!   │ resume                   │ quantum elapsed, still alive
//!   ▼                          │ (pause_count += 1)
//! Running ─────────────────────┘
//!   │ exited during quantum
//!   ▼
//! Exited (stats captured, never signaled again)
//! ```

use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::metrics::ProcessStats;
use crate::monitor;
use crate::workload::{Role, Workload};

struct Entry {
    workload: Workload,
    quantum: Duration,
}

/// Round-robin scheduler over a fixed set of workloads.
///
/// Entries keep admission order, which is the order quanta are granted in.
#[derive(Default)]
pub struct Scheduler {
    entries: Vec<Entry>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take over a freshly launched workload and suspend it immediately.
    pub fn admit(&mut self, mut workload: Workload, quantum: Duration) -> Result<()> {
        workload.hold()?;
        debug!(role = %workload.role(), ?quantum, "admitted to round-robin rotation");
        self.entries.push(Entry { workload, quantum });
        Ok(())
    }

    /// Roles in rotation order.
    pub fn roles(&self) -> Vec<Role> {
        self.entries.iter().map(|e| e.workload.role()).collect()
    }

    /// Whether any admitted workload has not exited yet.
    pub fn any_live(&self) -> bool {
        self.entries.iter().any(|e| e.workload.is_live())
    }

    pub fn is_live(&self, role: Role) -> bool {
        self.entry(role).is_some_and(|e| e.workload.is_live())
    }

    pub fn workload(&self, role: Role) -> Option<&Workload> {
        self.entry(role).map(|e| &e.workload)
    }

    /// Stats captured for a role, once it has exited.
    pub fn stats(&self, role: Role) -> Option<&ProcessStats> {
        self.entry(role).and_then(|e| e.workload.stats())
    }

    /// Grant one quantum to `role`.
    ///
    /// Returns the workload's stats if it exited during the quantum. Granting
    /// to a role that is not live does nothing.
    pub fn grant(&mut self, role: Role) -> Result<Option<ProcessStats>> {
        let Some(entry) = self.entry_mut(role) else {
            return Ok(None);
        };
        let workload = &mut entry.workload;
        let Some(pid) = workload.pid() else {
            return Ok(None);
        };
        if !workload.is_live() {
            return Ok(None);
        }

        workload.resume()?;
        workload.grant(entry.quantum);
        debug!(%role, pid, quantum = ?entry.quantum, "quantum granted");
        thread::sleep(entry.quantum);

        match monitor::try_reap(pid) {
            Ok(Some(reaped)) => {
                let started = workload.started_at();
                Ok(Some(monitor::finish(workload, Ok(reaped), false, started)))
            }
            Ok(None) => {
                workload.suspend()?;
                info!(%role, pid, "CPU time exhausted, pausing {}", role.label());
                Ok(None)
            }
            Err(e) => {
                warn!(%role, pid, "status check failed, terminating: {}", e);
                let started = workload.started_at();
                Ok(Some(monitor::terminate(workload, started)))
            }
        }
    }

    /// Force-terminate a live workload and reap it.
    pub fn terminate(&mut self, role: Role) -> Option<ProcessStats> {
        let entry = self.entry_mut(role)?;
        if !entry.workload.is_live() {
            return None;
        }
        let started = entry.workload.started_at();
        Some(monitor::terminate(&mut entry.workload, started))
    }

    /// Terminate everything still alive. Used when a cycle is abandoned.
    pub fn terminate_all(&mut self) -> Vec<ProcessStats> {
        let roles = self.roles();
        roles
            .into_iter()
            .filter_map(|role| self.terminate(role))
            .collect()
    }

    fn entry(&self, role: Role) -> Option<&Entry> {
        self.entries.iter().find(|e| e.workload.role() == role)
    }

    fn entry_mut(&mut self, role: Role) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.workload.role() == role)
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        // No workload outlives its cycle.
        for stats in self.terminate_all() {
            debug!(role = %stats.role, "terminated on scheduler drop");
        }
    }
}
