//! Cycle driver: the orchestrator's top-level loop.
//!
//! Each loop iteration checks for an operator reset, obtains a protocol if
//! none is selected, runs one cycle of it, records and exports the metrics,
//! and sleeps for the configured delay.

use std::thread;
use std::time::Instant;

use tracing::{info, warn};

use crate::config::OrchestratorConfig;
use crate::context::CycleContext;
use crate::error::Result;
use crate::interrupt::ResetFlag;
use crate::metrics::{AccumulatedMetrics, Baseline, CycleResult, ReportWriter, WindowFlush};
use crate::protocol::{Protocol, ProtocolEngine, ProtocolOutcome};

/// Answer from a [`ProtocolSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Protocol(Protocol),
    /// Input that names no protocol. The driver asks again.
    Invalid(String),
    /// No more input will arrive. The driver stops.
    Closed,
}

/// Where protocol selections come from (normally the operator console).
pub trait ProtocolSource {
    fn select(&mut self) -> Selection;
}

/// Receives what the driver produces, for display.
pub trait CycleObserver {
    fn on_cycle_start(&mut self, _cycle: u32, _protocol: Protocol) {}

    fn on_cycle(&mut self, _result: &CycleResult, _outcome: &ProtocolOutcome) {}

    /// A reserved protocol was selected; nothing ran.
    fn on_not_ready(&mut self, _protocol: Protocol) {}

    /// A full window was exported.
    fn on_flush(&mut self, _flush: &WindowFlush) {}

    fn on_reset(&mut self) {}
}

/// Observer that displays nothing.
pub struct SilentObserver;

impl CycleObserver for SilentObserver {}

/// Why [`Orchestrator::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The configured cycle limit was reached.
    CycleLimit,
    /// The protocol source closed.
    SourceClosed,
}

/// The orchestrator: owns the cycle loop and all cross-cycle state.
pub struct Orchestrator<S, O> {
    engine: ProtocolEngine,
    source: S,
    observer: O,
    reset: ResetFlag,
    selected: Option<Protocol>,
    cycle: u32,
    executed: u64,
    baseline: Baseline,
    metrics: AccumulatedMetrics,
    reports: ReportWriter,
}

impl<S: ProtocolSource, O: CycleObserver> Orchestrator<S, O> {
    pub fn new(config: OrchestratorConfig, source: S, observer: O, reset: ResetFlag) -> Self {
        let reports = ReportWriter::new(&config.report_dir);
        let selected = config.protocol;
        Self {
            engine: ProtocolEngine::new(config),
            source,
            observer,
            reset,
            selected,
            cycle: 1,
            executed: 0,
            baseline: Baseline::new(),
            metrics: AccumulatedMetrics::new(),
            reports,
        }
    }

    pub fn selected(&self) -> Option<Protocol> {
        self.selected
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    pub fn metrics(&self) -> &AccumulatedMetrics {
        &self.metrics
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Run cycles until the cycle limit is reached or the source closes.
    ///
    /// Only resource-level failures return an error.
    pub fn run(&mut self) -> Result<StopReason> {
        loop {
            if self.reset.take() {
                self.apply_reset();
            }
            if self
                .engine
                .config()
                .max_cycles
                .is_some_and(|max| self.executed >= max)
            {
                return Ok(StopReason::CycleLimit);
            }

            let protocol = match self.selected {
                Some(protocol) => protocol,
                None => match self.source.select() {
                    Selection::Protocol(protocol) => {
                        // A reset raised while the prompt was open is already satisfied.
                        self.reset.take();
                        info!("{} selected", protocol);
                        self.selected = Some(protocol);
                        protocol
                    }
                    Selection::Invalid(input) => {
                        warn!(input = %input, "invalid protocol selection");
                        continue;
                    }
                    Selection::Closed => {
                        info!("protocol source closed, stopping");
                        return Ok(StopReason::SourceClosed);
                    }
                },
            };

            self.run_cycle(protocol)?;
            self.executed += 1;

            if self
                .engine
                .config()
                .max_cycles
                .is_some_and(|max| self.executed >= max)
            {
                return Ok(StopReason::CycleLimit);
            }
            thread::sleep(self.engine.config().cycle_delay);
        }
    }

    /// Execute one cycle of `protocol` and record its result.
    pub fn run_cycle(&mut self, protocol: Protocol) -> Result<Option<CycleResult>> {
        let cycle = self.cycle;
        self.cycle += 1;
        self.observer.on_cycle_start(cycle, protocol);

        if !protocol.is_ready() {
            warn!(cycle, "{} is not ready, nothing to run", protocol);
            self.observer.on_not_ready(protocol);
            return Ok(None);
        }

        let started = Instant::now();
        let mut ctx = CycleContext::new(cycle, protocol);
        let outcome = self.engine.execute(&mut ctx)?;
        let wall_time = started.elapsed();

        if self.baseline.observe(protocol, wall_time) {
            info!(
                baseline_secs = wall_time.as_secs_f64(),
                "baseline established by {}", protocol
            );
        }
        let speedup = self.baseline.speedup(wall_time);
        let result = ctx.into_result(wall_time, speedup);
        info!(
            cycle,
            wall_secs = wall_time.as_secs_f64(),
            speedup = ?speedup,
            overhead_secs = result.overhead,
            "cycle complete"
        );
        self.observer.on_cycle(&result, &outcome);

        if let Some(flush) = self.metrics.record(result.clone()) {
            self.export(&flush);
            self.observer.on_flush(&flush);
        }
        Ok(Some(result))
    }

    /// Forget the selected protocol and the pending window.
    fn apply_reset(&mut self) {
        info!(pending = self.metrics.len(), "operator reset, protocol selection cleared");
        self.selected = None;
        self.cycle = 1;
        self.metrics.clear();
        self.observer.on_reset();
    }

    fn export(&mut self, flush: &WindowFlush) {
        let protocol = flush.totals.protocol;
        if let Err(e) = self.reports.append_window(protocol, &flush.results) {
            warn!(protocol, "metrics window dropped: {}", e);
        }
        if let Err(e) = self.reports.write_totals(&flush.totals) {
            warn!(protocol, "accumulated totals dropped: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::time::Duration;

    use super::*;

    struct Scripted(VecDeque<Selection>);

    impl ProtocolSource for Scripted {
        fn select(&mut self) -> Selection {
            self.0.pop_front().unwrap_or(Selection::Closed)
        }
    }

    #[derive(Default)]
    struct Recorder {
        starts: Vec<(u32, u8)>,
        not_ready: u32,
        resets: u32,
    }

    impl CycleObserver for Recorder {
        fn on_cycle_start(&mut self, cycle: u32, protocol: Protocol) {
            self.starts.push((cycle, protocol.number()));
        }

        fn on_not_ready(&mut self, _protocol: Protocol) {
            self.not_ready += 1;
        }

        fn on_reset(&mut self) {
            self.resets += 1;
        }
    }

    fn config() -> OrchestratorConfig {
        OrchestratorConfig {
            launcher: None,
            cycle_delay: Duration::ZERO,
            ..OrchestratorConfig::default()
        }
    }

    #[test]
    fn test_invalid_selection_prompts_again() {
        let source = Scripted(VecDeque::from([
            Selection::Invalid("9".into()),
            Selection::Protocol(Protocol::Reserved),
        ]));
        let mut orchestrator = Orchestrator::new(
            OrchestratorConfig {
                max_cycles: Some(2),
                ..config()
            },
            source,
            Recorder::default(),
            ResetFlag::new(),
        );
        assert_eq!(orchestrator.run().unwrap(), StopReason::CycleLimit);
        // Selected once, then kept.
        assert_eq!(orchestrator.observer().starts, [(1, 4), (2, 4)]);
        assert_eq!(orchestrator.observer().not_ready, 2);
        assert!(orchestrator.metrics().is_empty());
    }

    #[test]
    fn test_closed_source_stops() {
        let mut orchestrator =
            Orchestrator::new(config(), Scripted(VecDeque::new()), SilentObserver, ResetFlag::new());
        assert_eq!(orchestrator.run().unwrap(), StopReason::SourceClosed);
        assert_eq!(orchestrator.selected(), None);
    }

    #[test]
    fn test_reset_clears_selection_and_renumbers() {
        let reset = ResetFlag::new();
        let source = Scripted(VecDeque::from([Selection::Protocol(Protocol::Reserved)]));
        let mut orchestrator = Orchestrator::new(
            OrchestratorConfig {
                protocol: Some(Protocol::Reserved),
                max_cycles: Some(3),
                ..config()
            },
            source,
            Recorder::default(),
            reset.clone(),
        );
        orchestrator.run_cycle(Protocol::Reserved).unwrap();
        orchestrator.run_cycle(Protocol::Reserved).unwrap();
        orchestrator.executed = 2;

        reset.request();
        assert_eq!(orchestrator.run().unwrap(), StopReason::CycleLimit);
        let observer = orchestrator.observer();
        assert_eq!(observer.resets, 1);
        assert_eq!(observer.starts, [(1, 4), (2, 4), (1, 4)]);
        assert_eq!(orchestrator.selected(), Some(Protocol::Reserved));
    }
}
