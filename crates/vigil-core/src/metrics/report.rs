//! Report files.
//!
//! Two files per protocol live in the report directory:
//!
//! ```text
//! mission_metrics_<p>.json   # JSON array, one object per cycle, appended per window
//! mission_totals_<p>.json    # JSON object, totals of the latest window
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{Error, Result};

use super::{CycleResult, Totals};

/// Path of the per-cycle report for a protocol.
pub fn metrics_path(dir: &Path, protocol: u8) -> PathBuf {
    dir.join(format!("mission_metrics_{protocol}.json"))
}

/// Path of the accumulated-totals report for a protocol.
pub fn totals_path(dir: &Path, protocol: u8) -> PathBuf {
    dir.join(format!("mission_totals_{protocol}.json"))
}

/// Writes window exports to the report directory.
pub struct ReportWriter {
    dir: PathBuf,
    /// Protocols whose metrics file was already written by this writer.
    started: HashSet<u8>,
}

impl ReportWriter {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            started: HashSet::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Append a window of cycle results to the protocol's metrics file.
    ///
    /// The first write for a protocol replaces whatever file a previous run
    /// left behind; later writes extend the array.
    pub fn append_window(&mut self, protocol: u8, results: &[CycleResult]) -> Result<PathBuf> {
        let path = metrics_path(&self.dir, protocol);
        let mut entries: Vec<serde_json::Value> = if self.started.contains(&protocol) {
            read_array(&path)?
        } else {
            Vec::new()
        };
        for result in results {
            entries.push(serde_json::to_value(result)?);
        }
        write_json(&path, &entries)?;
        self.started.insert(protocol);
        info!(path = %path.display(), cycles = results.len(), "appended metrics window");
        Ok(path)
    }

    /// Replace the protocol's totals file.
    pub fn write_totals(&self, totals: &Totals) -> Result<PathBuf> {
        let path = totals_path(&self.dir, totals.protocol);
        write_json(&path, totals)?;
        info!(path = %path.display(), "wrote accumulated totals");
        Ok(path)
    }
}

fn read_array(path: &Path) -> Result<Vec<serde_json::Value>> {
    match fs::read_to_string(path) {
        Ok(text) if text.trim().is_empty() => Ok(Vec::new()),
        Ok(text) => Ok(serde_json::from_str(&text)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(source) => Err(Error::Report {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, text).map_err(|source| Error::Report {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a protocol's per-cycle report.
pub fn load_metrics(dir: &Path, protocol: u8) -> Result<Vec<CycleResult>> {
    let path = metrics_path(dir, protocol);
    let text = fs::read_to_string(&path).map_err(|source| Error::Report {
        path: path.clone(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

/// Load a protocol's totals report.
pub fn load_totals(dir: &Path, protocol: u8) -> Result<Totals> {
    let path = totals_path(dir, protocol);
    let text = fs::read_to_string(&path).map_err(|source| Error::Report {
        path: path.clone(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}
