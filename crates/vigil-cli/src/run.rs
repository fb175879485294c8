//! Run command implementation for Vigil CLI.
//!
//! Drives the orchestration cycle loop with the operator console as the
//! protocol source and prints each cycle's resource table.

use vigil_core::{
    CycleObserver, CycleResult, Orchestrator, OrchestratorConfig, Protocol, ProtocolOutcome,
    ResetFlag, StopReason, WindowFlush,
};

use crate::colors;
use crate::console::Console;
use crate::display;

/// Prints cycle progress for the operator.
struct TerminalObserver;

impl CycleObserver for TerminalObserver {
    fn on_cycle_start(&mut self, cycle: u32, protocol: Protocol) {
        println!(
            "\n{}--- Cycle #{} start ---{}",
            colors::CYCLE,
            cycle,
            colors::RESET
        );
        println!(
            "{}[Control]{} running {}",
            colors::CONTROL,
            colors::RESET,
            protocol
        );
    }

    fn on_cycle(&mut self, result: &CycleResult, outcome: &ProtocolOutcome) {
        display::print_resource_table(result);

        if let Some(summary) = outcome.summary {
            println!(
                "\n{}[Control]{} analyzer summary: {}",
                colors::CONTROL,
                colors::RESET,
                summary
            );
        }
        if !outcome.shield_activations.is_empty() {
            let args: Vec<&str> = outcome
                .shield_activations
                .iter()
                .map(|a| a.map_or("-", |a| a.as_arg()))
                .collect();
            println!(
                "{}[Control]{} shield launches: {}",
                colors::CONTROL,
                colors::RESET,
                args.join(" ")
            );
        }

        println!(
            "\n{}Cycle wall time:{} {:.6}s  {}(overhead {:.6}s){}",
            colors::CYCLE,
            colors::RESET,
            result.wall_time.as_secs_f64(),
            colors::DIM,
            result.overhead,
            colors::RESET
        );
        display::print_speedup(result.speedup);
        println!(
            "{}--- Cycle #{} end ---{}",
            colors::CYCLE,
            result.cycle,
            colors::RESET
        );
    }

    fn on_not_ready(&mut self, protocol: Protocol) {
        println!(
            "{}Protocol {} is not ready yet.{}",
            colors::WARN,
            protocol.number(),
            colors::RESET
        );
    }

    fn on_flush(&mut self, flush: &WindowFlush) {
        display::print_totals(&flush.totals);
    }

    fn on_reset(&mut self) {
        println!(
            "\n{}[Control]{} Protocol reset requested. Select a new protocol.",
            colors::CONTROL,
            colors::RESET
        );
    }
}

/// Run the orchestrator until the cycle limit or the end of operator input.
pub fn execute(config: OrchestratorConfig) -> anyhow::Result<()> {
    let reset = ResetFlag::install()?;

    println!(
        "{}Vigil orchestrator{} - a cycle runs every {:.0}s",
        colors::BOLD,
        colors::RESET,
        config.cycle_delay.as_secs_f64()
    );
    println!(
        "{}Press Ctrl+Z to reset and select a new protocol.{}",
        colors::DIM,
        colors::RESET
    );

    let mut orchestrator = Orchestrator::new(config, Console::stdin(), TerminalObserver, reset);
    let reason = orchestrator.run()?;

    let pending = orchestrator.metrics().len();
    match reason {
        StopReason::CycleLimit => println!(
            "\n{}Completed{} requested cycles",
            colors::OK,
            colors::RESET
        ),
        StopReason::SourceClosed => println!(
            "\n{}Operator input closed{}",
            colors::OK,
            colors::RESET
        ),
    }
    if pending > 0 {
        println!(
            "{}{} cycle(s) in the current window were not exported{}",
            colors::DIM,
            pending,
            colors::RESET
        );
    }
    Ok(())
}
