//! Analyzer readings and the shield decisions derived from them.

use std::fs::File;
use std::io::{self, Read};

use tracing::{info, warn};

use crate::channel::set_nonblocking;

/// Readings above this engage the shield.
pub const SHIELD_THRESHOLD: i64 = 90;

/// Argument passed to the shield workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Engage,
    Disengage,
}

impl Activation {
    pub fn from_reading(reading: i64) -> Self {
        if reading > SHIELD_THRESHOLD {
            Activation::Engage
        } else {
            Activation::Disengage
        }
    }

    /// Command-line form understood by the shield.
    pub fn as_arg(self) -> &'static str {
        match self {
            Activation::Engage => "1",
            Activation::Disengage => "0",
        }
    }
}

/// Parse the integer prefix of `text` the way C's `atoi` does: optional
/// leading whitespace, optional sign, then digits. `None` if no digits.
pub fn leading_int(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let value: i64 = digits[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}

/// The last whitespace-delimited numeric token in `text`.
pub fn last_reading(text: &str) -> Option<i64> {
    text.split_whitespace().rev().find_map(leading_int)
}

/// The analyzer's one-shot summary: the integer its output starts with, or
/// 0 when it produced nothing usable.
pub fn summary_value(text: &str) -> i64 {
    leading_int(text).unwrap_or(0)
}

/// Non-blocking reader over the analyzer's output channel.
pub struct AnalyzerOutput {
    source: Option<File>,
}

impl AnalyzerOutput {
    pub fn new(source: Option<File>) -> Self {
        let source = source.and_then(|file| match set_nonblocking(&file) {
            Ok(()) => Some(file),
            Err(e) => {
                warn!("cannot make analyzer channel non-blocking: {}", e);
                None
            }
        });
        Self { source }
    }

    /// Read everything the analyzer has written so far and return the
    /// latest reading in it, if any.
    pub fn drain(&mut self) -> Option<i64> {
        let source = self.source.as_mut()?;
        let mut bytes = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            match source.read(&mut buf) {
                Ok(0) => {
                    self.source = None;
                    break;
                }
                Ok(n) => bytes.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("analyzer channel read failed: {}", e);
                    self.source = None;
                    break;
                }
            }
        }
        if bytes.is_empty() {
            return None;
        }
        let text = String::from_utf8_lossy(&bytes);
        info!(output = %text.trim_end(), "analyzer data");
        let reading = last_reading(&text);
        if let Some(value) = reading {
            info!(reading = value, "latest temperature reading");
        }
        reading
    }
}
