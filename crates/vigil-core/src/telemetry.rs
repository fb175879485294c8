//! Telemetry: the temperature stream fed to the signal receiver.
//!
//! The file format is one integer reading per line.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::os::fd::OwnedFd;
use std::path::Path;

use rand::Rng;
use tracing::{debug, warn};

use crate::channel::set_nonblocking;
use crate::error::{Error, Result};

/// Lowest reading the generator produces.
pub const MIN_READING: i32 = 45;
/// Highest reading the generator produces.
pub const MAX_READING: i32 = 105;
/// Above this the heat source shuts down.
pub const DEACTIVATE_ABOVE: i32 = 90;
/// Below this the heat source starts again.
pub const REACTIVATE_BELOW: i32 = 55;
/// Readings per generated file.
pub const DEFAULT_READINGS: usize = 40;

/// Generate a random-walk temperature sequence.
///
/// While the heat source is active each step rises by 10..=49 (capped at
/// [`MAX_READING`]); while inactive it falls by the same range (floored at
/// [`MIN_READING`]). The source latches off above [`DEACTIVATE_ABOVE`] and
/// back on below [`REACTIVATE_BELOW`].
pub fn generate<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<i32> {
    let mut active = true;
    let mut temp = MIN_READING;
    let mut readings = Vec::with_capacity(count);
    for _ in 0..count {
        let step = rng.random_range(10..50);
        temp = if active {
            (temp + step).min(MAX_READING)
        } else {
            (temp - step).max(MIN_READING)
        };
        readings.push(temp);
        if temp > DEACTIVATE_ABOVE {
            active = false;
        }
        if temp < REACTIVATE_BELOW {
            active = true;
        }
    }
    readings
}

/// Write readings in the telemetry file format.
pub fn write_file(path: &Path, readings: &[i32]) -> Result<()> {
    let mut text = String::with_capacity(readings.len() * 4);
    for reading in readings {
        text.push_str(&reading.to_string());
        text.push('\n');
    }
    fs::write(path, text).map_err(|source| Error::Telemetry {
        path: path.to_path_buf(),
        source,
    })
}

/// Copy the whole telemetry file into `channel`, then close it.
///
/// A missing file or a consumer that is already gone is diagnosed, not
/// fatal: the channel is closed either way so the receiver sees
/// end-of-stream. Returns the number of bytes delivered.
pub fn stream(path: &Path, channel: Option<OwnedFd>) -> u64 {
    let Some(fd) = channel else {
        return 0;
    };
    let mut sink = File::from(fd);
    let mut source = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            warn!(path = %path.display(), "cannot open telemetry file: {}", e);
            return 0;
        }
    };
    match io::copy(&mut source, &mut sink) {
        Ok(bytes) => {
            debug!(bytes, "telemetry streamed to receiver");
            bytes
        }
        Err(e) => {
            warn!(path = %path.display(), "telemetry stream interrupted: {}", e);
            0
        }
    }
}

/// Incremental telemetry feed over a non-blocking channel.
///
/// Used while the receiver is being suspended and resumed: each
/// [`pump`](Self::pump) writes only what the channel accepts without
/// blocking, and the channel is closed once everything was delivered.
pub struct TelemetryPump {
    pending: Vec<u8>,
    offset: usize,
    sink: Option<File>,
}

impl TelemetryPump {
    /// Load the telemetry file and prepare `channel` for non-blocking writes.
    pub fn open(path: &Path, channel: Option<OwnedFd>) -> Self {
        let pending = match File::open(path).and_then(|mut f| {
            let mut bytes = Vec::new();
            f.read_to_end(&mut bytes).map(|_| bytes)
        }) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %path.display(), "cannot open telemetry file: {}", e);
                Vec::new()
            }
        };
        let sink = channel.map(File::from).and_then(|file| match set_nonblocking(&file) {
            Ok(()) => Some(file),
            Err(e) => {
                warn!("cannot make telemetry channel non-blocking: {}", e);
                None
            }
        });
        let mut pump = Self {
            pending,
            offset: 0,
            sink,
        };
        if pump.remaining() == 0 {
            pump.sink = None;
        }
        pump
    }

    /// Bytes not yet delivered.
    pub fn remaining(&self) -> usize {
        self.pending.len() - self.offset
    }

    /// Whether the channel has been closed.
    pub fn is_closed(&self) -> bool {
        self.sink.is_none()
    }

    /// Write as much as the channel accepts right now.
    ///
    /// Returns `true` once the feed is complete and the channel closed.
    pub fn pump(&mut self) -> bool {
        let Some(sink) = self.sink.as_mut() else {
            return true;
        };
        while self.offset < self.pending.len() {
            match sink.write(&self.pending[self.offset..]) {
                Ok(0) => break,
                Ok(n) => self.offset += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return false,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("telemetry feed closed early: {}", e);
                    self.offset = self.pending.len();
                }
            }
        }
        debug!(bytes = self.pending.len(), "telemetry fully delivered, closing feed");
        self.sink = None;
        true
    }
}
