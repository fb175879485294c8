//! Protocols 2 and 3: cooperative round-robin.
//!
//! ```text
//! telemetry ──feed──▶ receiver ──link──▶ analyzer ──analysis──▶ orchestrator
//!                                                                   │
//!                                                  shield ◀── activation
//! ```
//!
//! Receiver and analyzer alternate quanta. The analysis channel is read
//! without blocking after each analyzer quantum. The shield runs outside the
//! rotation, to completion, once per pass.

use tracing::{info, warn};

use super::{Activation, AnalyzerOutput, ProtocolEngine, ProtocolOutcome};
use crate::channel::{Channel, Wiring};
use crate::context::CycleContext;
use crate::error::Result;
use crate::scheduler::Scheduler;
use crate::telemetry::TelemetryPump;
use crate::workload::Role;

/// Order in which quanta are granted each pass.
const ROTATION: [Role; 2] = [Role::Receiver, Role::Analyzer];

/// When the shield runs relative to a scheduling pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ShieldPolicy {
    /// After the pass, driven by the latest reading. Skipped until a reading exists.
    Reactive,
    /// Before the pass, driven by the reading carried over from the previous
    /// pass. The first launch has no argument.
    Leading,
}

pub(super) fn run(
    engine: &ProtocolEngine,
    ctx: &mut CycleContext,
    policy: ShieldPolicy,
) -> Result<ProtocolOutcome> {
    let config = engine.config();
    let mut feed = Channel::create()?;
    let mut link = Channel::create()?;
    let mut analysis = Channel::create()?;

    let mut scheduler = Scheduler::new();
    let receiver = engine.launch(
        Role::Receiver,
        None,
        Wiring::new()
            .stdin(feed.take_read())
            .stdout(link.take_write()),
    )?;
    scheduler.admit(receiver, config.quantum(Role::Receiver))?;
    let analyzer = engine.launch(
        Role::Analyzer,
        None,
        Wiring::new()
            .stdin(link.take_read())
            .stdout(analysis.take_write()),
    )?;
    scheduler.admit(analyzer, config.quantum(Role::Analyzer))?;
    // Workloads whose image never loaded are terminal from the start.
    for role in ROTATION {
        if let Some(stats) = scheduler.stats(role) {
            ctx.record(stats.clone());
        }
    }

    let mut pump = TelemetryPump::open(&config.telemetry, feed.take_write());
    let mut output = AnalyzerOutput::new(analysis.into_reader());
    let mut outcome = ProtocolOutcome::default();
    let mut pass = 0u32;

    while scheduler.any_live() {
        pass += 1;
        if policy == ShieldPolicy::Leading {
            let carried = outcome.last_reading.map(Activation::from_reading);
            engine.run_shield(ctx, &mut outcome, carried)?;
        }

        for role in ROTATION {
            if !scheduler.is_live(role) {
                continue;
            }
            pump.pump();
            if let Some(stats) = scheduler.grant(role)? {
                ctx.record(stats);
            }
            if role == Role::Analyzer {
                if let Some(reading) = output.drain() {
                    outcome.last_reading = Some(reading);
                }
            }
        }
        pump.pump();

        if !scheduler.is_live(Role::Analyzer) && scheduler.is_live(Role::Receiver) {
            warn!(pass, "analyzer finished first, terminating receiver");
            if let Some(stats) = scheduler.terminate(Role::Receiver) {
                ctx.record(stats);
            }
        }

        if policy == ShieldPolicy::Reactive {
            match outcome.last_reading {
                Some(reading) => {
                    let activation = Activation::from_reading(reading);
                    info!(pass, reading, argument = activation.as_arg(), "triggering shield");
                    engine.run_shield(ctx, &mut outcome, Some(activation))?;
                }
                None => info!(pass, "no reading yet, shield not triggered"),
            }
        }
    }

    // Output written just before the analyzer exited.
    if let Some(reading) = output.drain() {
        outcome.last_reading = Some(reading);
    }
    info!(passes = pass, last_reading = ?outcome.last_reading, "rotation complete");
    Ok(outcome)
}
