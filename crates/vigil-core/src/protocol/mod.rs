//! Protocol engine.
//!
//! A protocol fixes the channel topology between the orchestrator and the
//! three workloads, the order in which they run and the rules that trigger
//! the shield:
//!
//! | # | Protocol | Receiver / analyzer | Shield |
//! |---|----------|---------------------|--------|
//! | 1 | Strict sequential | run to completion, one after the other | between them, no argument |
//! | 2 | Round-robin | alternate quanta | after every pass, from the latest reading |
//! | 3 | Shield-first | alternate quanta | before every pass, from the previous reading |
//! | 4 | Reserved | - | - |

mod reading;
mod round_robin;
mod sequential;

use std::fmt;

use tracing::{info, warn};

pub use reading::{
    Activation, AnalyzerOutput, SHIELD_THRESHOLD, last_reading, leading_int, summary_value,
};

use crate::channel::Wiring;
use crate::config::OrchestratorConfig;
use crate::context::CycleContext;
use crate::error::{Error, Result};
use crate::launcher::Launcher;
use crate::monitor;
use crate::workload::{Role, Workload};

use round_robin::ShieldPolicy;

/// The selectable orchestration protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    StrictSequential,
    RoundRobin,
    ShieldFirst,
    /// Selectable but not implemented by the mission software yet.
    Reserved,
}

impl Protocol {
    pub const ALL: [Protocol; 4] = [
        Protocol::StrictSequential,
        Protocol::RoundRobin,
        Protocol::ShieldFirst,
        Protocol::Reserved,
    ];

    /// Operator-facing number, also used in report file names.
    pub fn number(self) -> u8 {
        match self {
            Protocol::StrictSequential => 1,
            Protocol::RoundRobin => 2,
            Protocol::ShieldFirst => 3,
            Protocol::Reserved => 4,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Protocol::StrictSequential => "Strict sequential",
            Protocol::RoundRobin => "Round-robin with reactive shield",
            Protocol::ShieldFirst => "Shield-first round-robin",
            Protocol::Reserved => "Reserved",
        }
    }

    /// Whether running this protocol launches anything.
    pub fn is_ready(self) -> bool {
        !matches!(self, Protocol::Reserved)
    }
}

impl TryFrom<u8> for Protocol {
    type Error = Error;

    fn try_from(number: u8) -> Result<Self> {
        Protocol::ALL
            .into_iter()
            .find(|p| p.number() == number)
            .ok_or(Error::InvalidProtocol(number))
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "protocol {} ({})", self.number(), self.title())
    }
}

/// What a protocol run observed, besides the per-workload stats recorded in
/// the cycle context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtocolOutcome {
    /// Analyzer's one-shot summary (strict sequential only).
    pub summary: Option<i64>,
    /// Latest reading parsed from the analyzer's output.
    pub last_reading: Option<i64>,
    /// Argument of every shield launch, in order.
    pub shield_activations: Vec<Option<Activation>>,
}

/// Executes protocols against the configured workloads.
#[derive(Debug, Clone)]
pub struct ProtocolEngine {
    config: OrchestratorConfig,
    launcher: Launcher,
}

impl ProtocolEngine {
    pub fn new(config: OrchestratorConfig) -> Self {
        let launcher = Launcher::new(config.launcher.clone());
        Self { config, launcher }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run the cycle's protocol to completion.
    ///
    /// Every workload launched is reaped before this returns, and its stats
    /// are recorded in `ctx`. Errors are resource-level failures only.
    pub fn execute(&self, ctx: &mut CycleContext) -> Result<ProtocolOutcome> {
        let protocol = ctx.protocol();
        info!(cycle = ctx.cycle(), "starting {}", protocol);
        let outcome = match protocol {
            Protocol::StrictSequential => sequential::run(self, ctx)?,
            Protocol::RoundRobin => round_robin::run(self, ctx, ShieldPolicy::Reactive)?,
            Protocol::ShieldFirst => round_robin::run(self, ctx, ShieldPolicy::Leading)?,
            Protocol::Reserved => {
                warn!("{} is not ready", protocol);
                return Ok(ProtocolOutcome::default());
            }
        };
        info!(
            cycle = ctx.cycle(),
            elapsed_secs = ctx.elapsed().as_secs_f64(),
            "{} finished",
            protocol
        );
        Ok(outcome)
    }

    fn launch(&self, role: Role, argument: Option<&str>, wiring: Wiring) -> Result<Workload> {
        self.launcher
            .launch(role, self.config.program(role), argument, wiring)
    }

    /// Launch the shield with `activation` and wait for it to finish.
    fn run_shield(
        &self,
        ctx: &mut CycleContext,
        outcome: &mut ProtocolOutcome,
        activation: Option<Activation>,
    ) -> Result<()> {
        let mut shield = self.launch(Role::Shield, activation.map(Activation::as_arg), Wiring::new())?;
        let started = shield.started_at();
        ctx.record(monitor::await_workload(&mut shield, 0, started));
        outcome.shield_activations.push(activation);
        Ok(())
    }
}
