//! Orchestrator configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::protocol::Protocol;
use crate::workload::Role;

/// Default emulation launcher for the workload binaries.
pub const DEFAULT_LAUNCHER: &str = "qemu-riscv32";

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Emulation launcher. `None` executes workload binaries directly.
    pub launcher: Option<PathBuf>,

    /// Signal receiver binary.
    pub receiver: PathBuf,

    /// Shield controller binary.
    pub shield: PathBuf,

    /// Spectral analyzer binary.
    pub analyzer: PathBuf,

    /// Telemetry file streamed into the receiver.
    pub telemetry: PathBuf,

    /// Directory receiving the report files.
    pub report_dir: PathBuf,

    /// Round-robin quantum granted to the receiver.
    pub receiver_quantum: Duration,

    /// Round-robin quantum granted to the analyzer.
    pub analyzer_quantum: Duration,

    /// Liveness timeout for the analyzer under strict sequential (0 = unbounded).
    pub analyzer_timeout_secs: u64,

    /// Sleep between cycles.
    pub cycle_delay: Duration,

    /// Protocol to run without prompting first.
    pub protocol: Option<Protocol>,

    /// Stop after this many executed cycles.
    pub max_cycles: Option<u64>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            launcher: Some(PathBuf::from(DEFAULT_LAUNCHER)),
            receiver: PathBuf::from("./workloads/receiver"),
            shield: PathBuf::from("./workloads/shield"),
            analyzer: PathBuf::from("./workloads/analyzer"),
            telemetry: PathBuf::from("telemetry.txt"),
            report_dir: PathBuf::from("."),
            receiver_quantum: Duration::from_secs(10),
            analyzer_quantum: Duration::from_secs(5),
            analyzer_timeout_secs: 5,
            cycle_delay: Duration::from_secs(10),
            protocol: None,
            max_cycles: None,
        }
    }
}

impl OrchestratorConfig {
    /// Binary path for a role.
    pub fn program(&self, role: Role) -> &Path {
        match role {
            Role::Receiver => &self.receiver,
            Role::Shield => &self.shield,
            Role::Analyzer => &self.analyzer,
        }
    }

    /// Round-robin quantum for a role. The shield never enters the rotation.
    pub fn quantum(&self, role: Role) -> Duration {
        match role {
            Role::Receiver => self.receiver_quantum,
            Role::Shield | Role::Analyzer => self.analyzer_quantum,
        }
    }
}
