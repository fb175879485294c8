//! Per-workload statistics.
//!
//! A [`ProcessStats`] record is produced exactly once per terminated process,
//! from the `rusage` returned when it is reaped plus the scheduling tally
//! kept by its [`Workload`](crate::workload::Workload).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::workload::Role;

/// Resource usage of one terminated process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    #[serde(with = "super::secs")]
    pub user_cpu: Duration,
    #[serde(with = "super::secs")]
    pub system_cpu: Duration,
    /// Peak resident set size in kilobytes.
    pub max_rss_kb: i64,
    pub voluntary_switches: i64,
    pub involuntary_switches: i64,
}

impl ResourceUsage {
    /// Normalize a raw `rusage` snapshot.
    pub fn from_rusage(usage: &libc::rusage) -> Self {
        Self {
            user_cpu: timeval_to_duration(&usage.ru_utime),
            system_cpu: timeval_to_duration(&usage.ru_stime),
            max_rss_kb: usage.ru_maxrss as i64,
            voluntary_switches: usage.ru_nvcsw as i64,
            involuntary_switches: usage.ru_nivcsw as i64,
        }
    }

    /// User plus system CPU time.
    pub fn effective_cpu(&self) -> Duration {
        self.user_cpu + self.system_cpu
    }
}

fn timeval_to_duration(tv: &libc::timeval) -> Duration {
    let secs = tv.tv_sec.max(0) as u64;
    let micros = tv.tv_usec.clamp(0, 999_999) as u32;
    Duration::new(secs, micros * 1_000)
}

/// How a workload process terminated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ExitKind {
    Normal {
        code: i32,
    },
    Signaled {
        signal: i32,
    },
    /// No status could be collected (launch failure or reap error).
    #[default]
    Unknown,
}

impl ExitKind {
    /// Classify a raw wait status.
    pub fn from_wait_status(status: libc::c_int) -> Self {
        if libc::WIFEXITED(status) {
            ExitKind::Normal {
                code: libc::WEXITSTATUS(status),
            }
        } else if libc::WIFSIGNALED(status) {
            ExitKind::Signaled {
                signal: libc::WTERMSIG(status),
            }
        } else {
            ExitKind::Unknown
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, ExitKind::Normal { code: 0 })
    }

    /// Short form for tables.
    pub fn describe(self) -> String {
        match self {
            ExitKind::Normal { code } => format!("exit {code}"),
            ExitKind::Signaled { signal } => format!("signal {signal}"),
            ExitKind::Unknown => "unknown".to_string(),
        }
    }
}

/// Control signals delivered to a workload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalTally {
    pub suspend: u32,
    pub resume: u32,
    pub kill: u32,
}

impl SignalTally {
    pub fn total(&self) -> u32 {
        self.suspend + self.resume + self.kill
    }

    fn absorb(&mut self, other: &SignalTally) {
        self.suspend += other.suspend;
        self.resume += other.resume;
        self.kill += other.kill;
    }
}

/// Scheduling bookkeeping kept while a workload is alive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleTally {
    /// Running-to-suspended transitions.
    pub pause_count: u32,
    /// Total time spent suspended.
    #[serde(with = "super::secs")]
    pub paused_time: Duration,
    /// Sum of quanta granted by the scheduler.
    #[serde(with = "super::secs")]
    pub quantum_granted: Duration,
    /// Measured time actually spent running between resume and suspend/exit.
    #[serde(with = "super::secs")]
    pub quantum_consumed: Duration,
    pub signals: SignalTally,
}

impl ScheduleTally {
    fn absorb(&mut self, other: &ScheduleTally) {
        self.pause_count += other.pause_count;
        self.paused_time += other.paused_time;
        self.quantum_granted += other.quantum_granted;
        self.quantum_consumed += other.quantum_consumed;
        self.signals.absorb(&other.signals);
    }
}

/// Normalized statistics for one workload role within a cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessStats {
    pub role: Role,
    pub pid: Option<i32>,
    pub exit: ExitKind,
    /// Terminated by the orchestrator rather than on its own.
    pub killed: bool,
    /// Processes folded into this record (the shield may run several times).
    pub invocations: u32,
    #[serde(with = "super::secs")]
    pub wall_time: Duration,
    #[serde(with = "super::secs")]
    pub effective_cpu: Duration,
    #[serde(flatten)]
    pub usage: ResourceUsage,
    #[serde(flatten)]
    pub schedule: ScheduleTally,
}

impl ProcessStats {
    /// A record for a role that did not run.
    pub fn empty(role: Role) -> Self {
        Self {
            role,
            pid: None,
            exit: ExitKind::Unknown,
            killed: false,
            invocations: 0,
            wall_time: Duration::ZERO,
            effective_cpu: Duration::ZERO,
            usage: ResourceUsage::default(),
            schedule: ScheduleTally::default(),
        }
    }

    /// Build the record for a reaped process.
    pub fn collect(
        role: Role,
        pid: i32,
        exit: ExitKind,
        killed: bool,
        wall_time: Duration,
        usage: ResourceUsage,
        schedule: ScheduleTally,
    ) -> Self {
        Self {
            role,
            pid: Some(pid),
            exit,
            killed,
            invocations: 1,
            wall_time,
            effective_cpu: usage.effective_cpu(),
            usage,
            schedule,
        }
    }

    /// Whether any process contributed to this record.
    pub fn ran(&self) -> bool {
        self.invocations > 0
    }

    /// Fold a later invocation of the same role into this record.
    ///
    /// Times, CPU, context switches and tallies add up; peak memory keeps the
    /// maximum; pid and exit status follow the latest invocation.
    pub fn absorb(&mut self, later: &ProcessStats) {
        debug_assert_eq!(self.role, later.role);
        self.pid = later.pid.or(self.pid);
        self.exit = later.exit;
        self.killed |= later.killed;
        self.invocations += later.invocations;
        self.wall_time += later.wall_time;
        self.usage.user_cpu += later.usage.user_cpu;
        self.usage.system_cpu += later.usage.system_cpu;
        self.usage.max_rss_kb = self.usage.max_rss_kb.max(later.usage.max_rss_kb);
        self.usage.voluntary_switches += later.usage.voluntary_switches;
        self.usage.involuntary_switches += later.usage.involuntary_switches;
        self.effective_cpu = self.usage.effective_cpu();
        self.schedule.absorb(&later.schedule);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(role: Role, wall_ms: u64, rss: i64) -> ProcessStats {
        ProcessStats::collect(
            role,
            100,
            ExitKind::Normal { code: 0 },
            false,
            Duration::from_millis(wall_ms),
            ResourceUsage {
                user_cpu: Duration::from_millis(10),
                system_cpu: Duration::from_millis(5),
                max_rss_kb: rss,
                voluntary_switches: 3,
                involuntary_switches: 1,
            },
            ScheduleTally::default(),
        )
    }

    #[test]
    fn test_exit_kind_from_wait_status() {
        // Exit code lives in the second byte of the status word.
        assert_eq!(ExitKind::from_wait_status(3 << 8), ExitKind::Normal { code: 3 });
        assert_eq!(
            ExitKind::from_wait_status(libc::SIGKILL),
            ExitKind::Signaled {
                signal: libc::SIGKILL
            }
        );
        assert!(ExitKind::from_wait_status(0).is_success());
    }

    #[test]
    fn test_resource_usage_from_rusage() {
        let mut raw: libc::rusage = unsafe { std::mem::zeroed() };
        raw.ru_utime.tv_sec = 1;
        raw.ru_utime.tv_usec = 250_000;
        raw.ru_stime.tv_usec = 500;
        raw.ru_maxrss = 2048;
        raw.ru_nvcsw = 7;
        raw.ru_nivcsw = 2;

        let usage = ResourceUsage::from_rusage(&raw);
        assert_eq!(usage.user_cpu, Duration::from_millis(1250));
        assert_eq!(usage.system_cpu, Duration::from_micros(500));
        assert_eq!(usage.max_rss_kb, 2048);
        assert_eq!(usage.voluntary_switches, 7);
        assert_eq!(usage.involuntary_switches, 2);
        assert_eq!(usage.effective_cpu(), Duration::from_micros(1_250_500));
    }

    #[test]
    fn test_absorb_accumulates_invocations() {
        let mut first = sample(Role::Shield, 100, 900);
        let mut second = sample(Role::Shield, 50, 1200);
        second.pid = Some(200);
        second.exit = ExitKind::Normal { code: 1 };

        first.absorb(&second);
        assert_eq!(first.invocations, 2);
        assert_eq!(first.pid, Some(200));
        assert_eq!(first.exit, ExitKind::Normal { code: 1 });
        assert_eq!(first.wall_time, Duration::from_millis(150));
        assert_eq!(first.usage.max_rss_kb, 1200);
        assert_eq!(first.usage.voluntary_switches, 6);
        assert_eq!(first.effective_cpu, Duration::from_millis(30));
    }

    #[test]
    fn test_empty_record_did_not_run() {
        let mut empty = ProcessStats::empty(Role::Shield);
        assert!(!empty.ran());
        empty.absorb(&sample(Role::Shield, 10, 1));
        assert!(empty.ran());
        assert_eq!(empty.invocations, 1);
    }

    #[test]
    fn test_stats_serialize_flat() {
        let stats = sample(Role::Receiver, 1500, 512);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["role"], "receiver");
        assert_eq!(json["exit"]["kind"], "normal");
        assert_eq!(json["wall_time"], 1.5);
        assert_eq!(json["max_rss_kb"], 512);
        assert_eq!(json["pause_count"], 0);
        assert_eq!(json["signals"]["kill"], 0);

        let back: ProcessStats = serde_json::from_value(json).unwrap();
        assert_eq!(back.role, Role::Receiver);
        assert_eq!(back.wall_time, Duration::from_millis(1500));
        assert_eq!(back.usage.max_rss_kb, 512);
    }
}
