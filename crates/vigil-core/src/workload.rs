//! Workload roles and per-process lifecycle state.
//!
//! A [`Workload`] is the orchestrator's handle on one launched subsystem
//! process. Every control signal goes through it, so the lifecycle state
//! decides whether a signal may be sent at all: once a process has been
//! reaped its pid may be recycled by the OS and must never be signaled again.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::metrics::{ProcessStats, ScheduleTally};

/// The three fixed subsystem roles.
///
/// Roles are assigned when a workload is launched; nothing is inferred from
/// program paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Signal receiver: consumes the telemetry stream.
    Receiver,
    /// Shield controller: takes an optional activation argument.
    Shield,
    /// Spectral analyzer: consumes receiver output and emits readings.
    Analyzer,
}

impl Role {
    /// All roles, in report order.
    pub const ALL: [Role; 3] = [Role::Receiver, Role::Shield, Role::Analyzer];

    /// Human-readable subsystem name.
    pub fn label(self) -> &'static str {
        match self {
            Role::Receiver => "Signal Receiver",
            Role::Shield => "Shield Control",
            Role::Analyzer => "Spectral Analyzer",
        }
    }

    /// Stable lowercase key, used in report files.
    pub fn key(self) -> &'static str {
        match self {
            Role::Receiver => "receiver",
            Role::Shield => "shield",
            Role::Analyzer => "analyzer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Lifecycle state of a workload process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadState {
    NotStarted,
    Running,
    Suspended,
    Exited,
    Killed,
}

impl WorkloadState {
    /// Whether the process still exists and may be signaled.
    pub fn is_live(self) -> bool {
        matches!(self, WorkloadState::Running | WorkloadState::Suspended)
    }
}

/// Control signals the orchestrator delivers to workloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    Suspend,
    Resume,
    Kill,
}

impl ControlSignal {
    fn raw(self) -> libc::c_int {
        match self {
            ControlSignal::Suspend => libc::SIGSTOP,
            ControlSignal::Resume => libc::SIGCONT,
            ControlSignal::Kill => libc::SIGKILL,
        }
    }

    fn name(self) -> &'static str {
        match self {
            ControlSignal::Suspend => "SIGSTOP",
            ControlSignal::Resume => "SIGCONT",
            ControlSignal::Kill => "SIGKILL",
        }
    }
}

/// Handle to one launched workload process.
#[derive(Debug)]
pub struct Workload {
    role: Role,
    pid: Option<libc::pid_t>,
    state: WorkloadState,
    argument: Option<String>,
    started_at: Instant,
    /// When the current running stretch began.
    resumed_at: Option<Instant>,
    /// When the current suspended stretch began.
    suspended_at: Option<Instant>,
    tally: ScheduleTally,
    /// Stats captured when the process was reaped.
    stats: Option<ProcessStats>,
}

impl Workload {
    /// Track a freshly spawned, running process.
    pub(crate) fn spawned(role: Role, pid: libc::pid_t, argument: Option<String>) -> Self {
        let now = Instant::now();
        Self {
            role,
            pid: Some(pid),
            state: WorkloadState::Running,
            argument,
            started_at: now,
            resumed_at: Some(now),
            suspended_at: None,
            tally: ScheduleTally::default(),
            stats: None,
        }
    }

    /// A workload whose program image never loaded.
    ///
    /// It is already terminal and carries an `unknown` exit record.
    pub(crate) fn failed(role: Role, argument: Option<String>) -> Self {
        let mut stats = ProcessStats::empty(role);
        stats.invocations = 1;
        Self {
            role,
            pid: None,
            state: WorkloadState::Exited,
            argument,
            started_at: Instant::now(),
            resumed_at: None,
            suspended_at: None,
            tally: ScheduleTally::default(),
            stats: Some(stats),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn pid(&self) -> Option<libc::pid_t> {
        self.pid
    }

    pub fn state(&self) -> WorkloadState {
        self.state
    }

    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn is_live(&self) -> bool {
        self.state.is_live()
    }

    pub fn tally(&self) -> &ScheduleTally {
        &self.tally
    }

    /// Stats captured at reap time, if the process has terminated.
    pub fn stats(&self) -> Option<&ProcessStats> {
        self.stats.as_ref()
    }

    /// Stop a just-launched workload before any data reaches it.
    ///
    /// This establishes the initial suspended state and is not counted as a
    /// pause.
    pub fn hold(&mut self) -> Result<()> {
        if self.state != WorkloadState::Running {
            return Ok(());
        }
        self.signal(ControlSignal::Suspend)?;
        self.state = WorkloadState::Suspended;
        self.resumed_at = None;
        self.suspended_at = Some(Instant::now());
        Ok(())
    }

    /// Suspend a running workload at the end of its quantum.
    pub fn suspend(&mut self) -> Result<()> {
        if self.state != WorkloadState::Running {
            return Ok(());
        }
        self.signal(ControlSignal::Suspend)?;
        let now = Instant::now();
        if let Some(resumed) = self.resumed_at.take() {
            self.tally.quantum_consumed += now.duration_since(resumed);
        }
        self.tally.pause_count += 1;
        self.suspended_at = Some(now);
        self.state = WorkloadState::Suspended;
        Ok(())
    }

    /// Resume a suspended workload.
    pub fn resume(&mut self) -> Result<()> {
        if self.state != WorkloadState::Suspended {
            return Ok(());
        }
        self.signal(ControlSignal::Resume)?;
        let now = Instant::now();
        if let Some(suspended) = self.suspended_at.take() {
            self.tally.paused_time += now.duration_since(suspended);
        }
        self.resumed_at = Some(now);
        self.state = WorkloadState::Running;
        Ok(())
    }

    /// Deliver a forced-termination signal. The caller must still reap.
    pub fn kill(&mut self) -> Result<()> {
        if !self.is_live() {
            return Ok(());
        }
        self.signal(ControlSignal::Kill)
    }

    /// Record that `quantum` was granted to this workload.
    pub(crate) fn grant(&mut self, quantum: Duration) {
        self.tally.quantum_granted += quantum;
    }

    /// Close the lifecycle after the process has been reaped.
    ///
    /// Folds any open running or suspended stretch into the tally and
    /// returns it; the pid is never signaled again after this.
    pub(crate) fn mark_reaped(&mut self, killed: bool) -> ScheduleTally {
        let now = Instant::now();
        if let Some(resumed) = self.resumed_at.take() {
            self.tally.quantum_consumed += now.duration_since(resumed);
        }
        if let Some(suspended) = self.suspended_at.take() {
            self.tally.paused_time += now.duration_since(suspended);
        }
        self.state = if killed {
            WorkloadState::Killed
        } else {
            WorkloadState::Exited
        };
        self.tally.clone()
    }

    pub(crate) fn store_stats(&mut self, stats: ProcessStats) {
        self.stats = Some(stats);
    }

    fn signal(&mut self, signal: ControlSignal) -> Result<()> {
        let Some(pid) = self.pid else {
            return Ok(());
        };
        debug!(role = %self.role, pid, signal = signal.name(), "delivering control signal");
        let ret = unsafe { libc::kill(pid, signal.raw()) };
        if ret == -1 {
            return Err(Error::Signal {
                pid,
                signal: signal.name(),
                source: std::io::Error::last_os_error(),
            });
        }
        match signal {
            ControlSignal::Suspend => self.tally.signals.suspend += 1,
            ControlSignal::Resume => self.tally.signals.resume += 1,
            ControlSignal::Kill => self.tally.signals.kill += 1,
        }
        Ok(())
    }
}

impl Drop for Workload {
    fn drop(&mut self) {
        // A handle dropped on an error path must not leave its process behind.
        if self.is_live() {
            let started = self.started_at;
            let stats = crate::monitor::terminate(self, started);
            debug!(role = %stats.role, pid = ?stats.pid, "terminated on handle drop");
        }
    }
}
