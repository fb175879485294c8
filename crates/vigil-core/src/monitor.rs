//! Liveness monitor.
//!
//! Waits for workloads to terminate, escalating to a forced kill when a
//! timeout elapses, and turns every termination into a [`ProcessStats`]
//! record. Reaping always goes through `wait4` so the resource snapshot is
//! taken exactly once, after the process is gone.

use std::io;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::metrics::{ExitKind, ProcessStats, ResourceUsage};
use crate::workload::Workload;

/// Interval between non-blocking status checks while a timeout runs.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Raw result of reaping a process.
#[derive(Clone, Copy)]
pub(crate) struct Reaped {
    status: libc::c_int,
    usage: libc::rusage,
}

fn wait4(pid: libc::pid_t, options: libc::c_int) -> io::Result<Option<Reaped>> {
    let mut status: libc::c_int = 0;
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    loop {
        let ret = unsafe { libc::wait4(pid, &mut status, options, &mut usage) };
        if ret == pid {
            return Ok(Some(Reaped { status, usage }));
        }
        if ret == 0 {
            return Ok(None);
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

/// Non-blocking status check.
pub(crate) fn try_reap(pid: libc::pid_t) -> io::Result<Option<Reaped>> {
    wait4(pid, libc::WNOHANG)
}

/// Blocking reap.
pub(crate) fn reap(pid: libc::pid_t) -> io::Result<Reaped> {
    match wait4(pid, 0)? {
        Some(reaped) => Ok(reaped),
        None => Err(io::Error::other("wait4 returned without a status")),
    }
}

/// Wait for `workload` to exit and collect its stats.
///
/// With `timeout_secs == 0` this blocks until the workload exits. Otherwise
/// the workload is polled once per [`POLL_INTERVAL`] for up to
/// `timeout_secs`; if it is still alive it is killed and reaped. Wall time is
/// measured from `started`. A record is returned on every path.
pub fn await_workload(workload: &mut Workload, timeout_secs: u64, started: Instant) -> ProcessStats {
    if let Some(stats) = workload.stats() {
        return stats.clone();
    }
    let Some(pid) = workload.pid() else {
        return finish(workload, Err(io::Error::other("workload has no process")), false, started);
    };

    if timeout_secs == 0 {
        info!(role = %workload.role(), pid, "waiting for {} to finish", workload.role().label());
        let outcome = reap(pid);
        return finish(workload, outcome, false, started);
    }

    for _ in 0..timeout_secs {
        match try_reap(pid) {
            Ok(Some(reaped)) => return finish(workload, Ok(reaped), false, started),
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                warn!(role = %workload.role(), pid, "status check failed, terminating: {}", e);
                return terminate(workload, started);
            }
        }
    }
    if let Ok(Some(reaped)) = try_reap(pid) {
        return finish(workload, Ok(reaped), false, started);
    }

    warn!(
        role = %workload.role(),
        pid,
        timeout_secs,
        "{} is not responding, forcing termination",
        workload.role().label()
    );
    terminate(workload, started)
}

/// Kill a live workload and reap it.
pub fn terminate(workload: &mut Workload, started: Instant) -> ProcessStats {
    if let Some(stats) = workload.stats() {
        return stats.clone();
    }
    let Some(pid) = workload.pid() else {
        return finish(workload, Err(io::Error::other("workload has no process")), false, started);
    };
    if let Err(e) = workload.kill() {
        // The process may have exited on its own; the reap below settles it.
        warn!(role = %workload.role(), pid, "kill failed: {}", e);
    }
    let outcome = reap(pid);
    finish(workload, outcome, true, started)
}

/// Single exit path for every termination: closes the workload's lifecycle
/// and builds its stats record.
pub(crate) fn finish(
    workload: &mut Workload,
    outcome: io::Result<Reaped>,
    killed: bool,
    started: Instant,
) -> ProcessStats {
    let wall_time = started.elapsed();
    let schedule = workload.mark_reaped(killed);
    let role = workload.role();

    let stats = match (workload.pid(), outcome) {
        (Some(pid), Ok(reaped)) => ProcessStats::collect(
            role,
            pid,
            ExitKind::from_wait_status(reaped.status),
            killed,
            wall_time,
            ResourceUsage::from_rusage(&reaped.usage),
            schedule,
        ),
        (pid, outcome) => {
            if let Err(e) = outcome {
                warn!(%role, ?pid, "no exit status collected: {}", e);
            }
            let mut stats = ProcessStats::empty(role);
            stats.pid = pid;
            stats.killed = killed;
            stats.invocations = 1;
            stats.wall_time = wall_time;
            stats.schedule = schedule;
            stats
        }
    };

    info!(
        %role,
        pid = ?stats.pid,
        exit = %stats.exit.describe(),
        wall_secs = wall_time.as_secs_f64(),
        "{} has completed its task",
        role.label()
    );
    workload.store_stats(stats.clone());
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::Role;

    #[test]
    fn test_failed_workload_returns_its_record() {
        let mut workload = Workload::failed(Role::Analyzer, None);
        let stats = await_workload(&mut workload, 3, Instant::now());
        assert_eq!(stats.role, Role::Analyzer);
        assert_eq!(stats.exit, ExitKind::Unknown);
        assert_eq!(stats.invocations, 1);
    }

    #[test]
    fn test_reap_unknown_child_is_an_error() {
        // pid 1 is never our child.
        assert!(try_reap(1).is_err());
    }
}
