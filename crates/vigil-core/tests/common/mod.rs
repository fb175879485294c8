//! Shared fixtures: shell scripts standing in for the workload binaries.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use vigil_core::{OrchestratorConfig, telemetry};

pub const SHELL: &str = "/bin/sh";

/// Temporary directory holding workload scripts, telemetry and reports.
pub struct Mission {
    temp_dir: TempDir,
}

impl Mission {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write a script run by `/bin/sh`.
    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.path().join(name);
        fs::write(&path, body).expect("Failed to write script");
        path
    }

    pub fn telemetry(&self, readings: &[i32]) -> PathBuf {
        let path = self.path().join("telemetry.txt");
        telemetry::write_file(&path, readings).expect("Failed to write telemetry");
        path
    }

    /// Shield script that appends its argument (or `-`) to `shield.log`.
    pub fn logging_shield(&self) -> PathBuf {
        let log = self.shield_log();
        self.script(
            "shield.sh",
            &format!("echo \"${{1:--}}\" >> '{}'\n", log.display()),
        )
    }

    pub fn shield_log(&self) -> PathBuf {
        self.path().join("shield.log")
    }

    pub fn shield_arguments(&self) -> Vec<String> {
        fs::read_to_string(self.shield_log())
            .unwrap_or_default()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    /// Config running the given scripts through `/bin/sh` with short quanta.
    pub fn config(&self, receiver: &Path, shield: &Path, analyzer: &Path) -> OrchestratorConfig {
        OrchestratorConfig {
            launcher: Some(PathBuf::from(SHELL)),
            receiver: receiver.to_path_buf(),
            shield: shield.to_path_buf(),
            analyzer: analyzer.to_path_buf(),
            telemetry: self.path().join("telemetry.txt"),
            report_dir: self.path().to_path_buf(),
            receiver_quantum: Duration::from_millis(300),
            analyzer_quantum: Duration::from_millis(300),
            analyzer_timeout_secs: 5,
            cycle_delay: Duration::ZERO,
            protocol: None,
            max_cycles: None,
        }
    }
}
