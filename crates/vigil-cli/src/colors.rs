//! ANSI styles for the operator console.

use std::io::{self, Write};

use vigil_core::Role;

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";

/// `[Control]` tags on orchestrator notices.
pub const CONTROL: &str = "\x1b[34m";
/// Cycle banners and cycle timing.
pub const CYCLE: &str = "\x1b[33m";
/// Speedup and report headings.
pub const HIGHLIGHT: &str = "\x1b[36m";

pub const OK: &str = "\x1b[32m";
pub const WARN: &str = "\x1b[33m";
pub const FAIL: &str = "\x1b[31m";

pub const RECEIVER: &str = "\x1b[1;32m";
pub const SHIELD: &str = "\x1b[1;35m";
pub const ANALYZER: &str = "\x1b[1;36m";

/// Per-role label color in workload tables.
pub fn role(role: Role) -> &'static str {
    match role {
        Role::Receiver => RECEIVER,
        Role::Shield => SHIELD,
        Role::Analyzer => ANALYZER,
    }
}

/// Flush stdout so a prompt without a trailing newline is visible.
pub fn flush_stdout() {
    io::stdout().flush().ok();
}
