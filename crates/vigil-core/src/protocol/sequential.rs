//! Protocol 1: strict sequential.
//!
//! ```text
//! telemetry ──feed──▶ receiver ──link──▶ analyzer ──summary──▶ orchestrator
//!                     shield (no channels)
//! ```
//!
//! The receiver runs to completion first, then the shield, then the analyzer
//! under the liveness timeout. Shield and analyzer are launched up front and
//! held, so their wall time starts when they are resumed.
//!
//! Every workload still alive when this returns early is killed and reaped
//! when its handle drops.

use std::io::Read;
use std::time::Instant;

use tracing::{info, warn};

use super::{ProtocolEngine, ProtocolOutcome, summary_value};
use crate::channel::{Channel, Wiring};
use crate::context::CycleContext;
use crate::error::Result;
use crate::monitor;
use crate::telemetry;
use crate::workload::Role;

pub(super) fn run(engine: &ProtocolEngine, ctx: &mut CycleContext) -> Result<ProtocolOutcome> {
    let config = engine.config();
    let mut feed = Channel::create()?;
    let mut link = Channel::create()?;
    let mut summary = Channel::create()?;

    let mut receiver = engine.launch(
        Role::Receiver,
        None,
        Wiring::new()
            .stdin(feed.take_read())
            .stdout(link.take_write()),
    )?;
    let mut shield = engine.launch(Role::Shield, None, Wiring::new())?;
    shield.hold()?;
    let mut analyzer = engine.launch(
        Role::Analyzer,
        None,
        Wiring::new()
            .stdin(link.take_read())
            .stdout(summary.take_write()),
    )?;
    analyzer.hold()?;

    telemetry::stream(&config.telemetry, feed.take_write());

    let started = receiver.started_at();
    ctx.record(monitor::await_workload(&mut receiver, 0, started));

    let started = Instant::now();
    shield.resume()?;
    ctx.record(monitor::await_workload(&mut shield, 0, started));

    let started = Instant::now();
    analyzer.resume()?;
    ctx.record(monitor::await_workload(
        &mut analyzer,
        config.analyzer_timeout_secs,
        started,
    ));

    let value = read_summary(summary);
    info!(summary = value, "analyzer summary received");
    Ok(ProtocolOutcome {
        summary: Some(value),
        ..ProtocolOutcome::default()
    })
}

/// Read the analyzer's one-shot summary. Everything holding the producer end
/// has been reaped by now, so this cannot block.
fn read_summary(channel: Channel) -> i64 {
    let Some(mut reader) = channel.into_reader() else {
        return 0;
    };
    let mut text = String::new();
    if let Err(e) = reader.read_to_string(&mut text) {
        warn!("cannot read analyzer summary: {}", e);
        return 0;
    }
    if text.trim().is_empty() {
        warn!("analyzer produced no summary");
    }
    summary_value(&text)
}
