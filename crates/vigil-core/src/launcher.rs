//! Workload launcher.
//!
//! Replicates the orchestrator, applies the stream wiring in the child and
//! loads the workload through the emulation launcher (e.g. `qemu-riscv32`).

use std::io;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{error, info};

use crate::channel::Wiring;
use crate::error::{Error, Result};
use crate::workload::{Role, Workload};

/// Launches workload programs.
#[derive(Debug, Clone)]
pub struct Launcher {
    /// Emulation launcher; `None` executes workload programs directly.
    emulator: Option<PathBuf>,
}

impl Launcher {
    pub fn new(emulator: Option<PathBuf>) -> Self {
        Self { emulator }
    }

    /// Launch `program` in the given role.
    ///
    /// The wiring's descriptors move into the child; the orchestrator's copies
    /// are closed before this returns, so a consumer sees end-of-stream as soon
    /// as the workload holding the producer end exits.
    ///
    /// A program image that fails to load is diagnosed and yields a workload
    /// that is already terminal. Only a failure to create the process at all
    /// is returned as an error.
    pub fn launch(
        &self,
        role: Role,
        program: &Path,
        argument: Option<&str>,
        wiring: Wiring,
    ) -> Result<Workload> {
        let mut command = match &self.emulator {
            Some(emulator) => {
                let mut command = Command::new(emulator);
                command.arg(program);
                command
            }
            None => Command::new(program),
        };
        command.args(argument);

        let (stdin, stdout) = wiring.into_stdio();
        command
            .stdin(stdin)
            .stdout(stdout)
            .stderr(Stdio::inherit())
            // Keep terminal-generated signals aimed at the operator away from workloads.
            .process_group(0);

        let spawned = command.spawn();
        // Dropping the command closes the orchestrator's copies of the wired ends.
        drop(command);

        match spawned {
            Ok(child) => {
                let pid = child.id() as libc::pid_t;
                info!(%role, pid, program = %program.display(), argument, "launched {}", role.label());
                // The child is reaped through wait4 by the liveness monitor.
                drop(child);
                Ok(Workload::spawned(role, pid, argument.map(str::to_owned)))
            }
            Err(source) if is_resource_exhaustion(&source) => Err(Error::Spawn { role, source }),
            Err(e) => {
                error!(
                    %role,
                    program = %program.display(),
                    "failed to load {} program image: {}",
                    role.label(),
                    e
                );
                Ok(Workload::failed(role, argument.map(str::to_owned)))
            }
        }
    }
}

fn is_resource_exhaustion(err: &io::Error) -> bool {
    matches!(
        err.raw_os_error(),
        Some(libc::EAGAIN | libc::ENOMEM | libc::EMFILE | libc::ENFILE)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::WorkloadState;

    #[test]
    fn test_missing_program_yields_terminal_workload() {
        let launcher = Launcher::new(None);
        let workload = launcher
            .launch(
                Role::Shield,
                Path::new("/nonexistent/vigil/shield"),
                Some("1"),
                Wiring::new(),
            )
            .unwrap();
        assert_eq!(workload.state(), WorkloadState::Exited);
        assert_eq!(workload.pid(), None);
        let stats = workload.stats().unwrap();
        assert_eq!(stats.exit, crate::metrics::ExitKind::Unknown);
    }

    #[test]
    fn test_resource_exhaustion_classification() {
        assert!(is_resource_exhaustion(&io::Error::from_raw_os_error(libc::EAGAIN)));
        assert!(is_resource_exhaustion(&io::Error::from_raw_os_error(libc::EMFILE)));
        assert!(!is_resource_exhaustion(&io::Error::from_raw_os_error(libc::ENOENT)));
        assert!(!is_resource_exhaustion(&io::Error::from_raw_os_error(libc::EACCES)));
    }
}
