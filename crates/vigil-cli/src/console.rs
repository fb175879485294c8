//! Operator console: protocol selection prompt.

use std::io::{self, BufRead};

use tracing::warn;
use vigil_core::{Protocol, ProtocolSource, Selection};

use crate::colors;

/// Prompts on stdout and reads the answer from `input`.
pub struct Console<R> {
    input: R,
}

impl Console<io::StdinLock<'static>> {
    pub fn stdin() -> Self {
        Self::new(io::stdin().lock())
    }
}

impl<R: BufRead> Console<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }
}

impl<R: BufRead> ProtocolSource for Console<R> {
    fn select(&mut self) -> Selection {
        println!("\n{}Protocols:{}", colors::BOLD, colors::RESET);
        for protocol in Protocol::ALL {
            println!("  {}. {}", protocol.number(), protocol.title());
        }
        print!("{}Select execution protocol (1-4): {}", colors::BOLD, colors::RESET);
        colors::flush_stdout();

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => {
                println!();
                Selection::Closed
            }
            Ok(_) => parse_selection(&line),
            Err(e) => {
                warn!("cannot read operator input: {}", e);
                Selection::Closed
            }
        }
    }
}

/// Interpret one line of operator input.
pub fn parse_selection(line: &str) -> Selection {
    let answer = line.trim();
    match answer.parse::<u8>().ok().and_then(|n| Protocol::try_from(n).ok()) {
        Some(protocol) => Selection::Protocol(protocol),
        None => Selection::Invalid(answer.to_string()),
    }
}
