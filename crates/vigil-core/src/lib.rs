//! Core engine for the Vigil satellite workload orchestrator.
//!
//! This crate provides:
//! - Channel wiring and workload launching through an emulation launcher
//! - Liveness monitoring with timeout escalation
//! - A cooperative round-robin scheduler driven by stop/continue signals
//! - The protocol engine and the cycle driver
//! - Metrics aggregation and JSON report export

pub mod channel;
pub mod config;
pub mod context;
pub mod driver;
pub mod error;
pub mod interrupt;
pub mod launcher;
pub mod metrics;
pub mod monitor;
pub mod protocol;
pub mod scheduler;
pub mod telemetry;
pub mod workload;

pub use channel::{Channel, Wiring};
pub use config::OrchestratorConfig;
pub use context::CycleContext;
pub use driver::{CycleObserver, Orchestrator, ProtocolSource, Selection, SilentObserver, StopReason};
pub use error::{Error, Result};
pub use interrupt::ResetFlag;
pub use launcher::Launcher;
pub use metrics::{
    AccumulatedMetrics, Baseline, CycleResult, ExitKind, ProcessStats, ReportWriter,
    ResourceUsage, ScheduleTally, SignalTally, Totals, WINDOW_CAPACITY, WindowFlush,
};
pub use protocol::{Activation, Protocol, ProtocolEngine, ProtocolOutcome};
pub use scheduler::Scheduler;
pub use telemetry::TelemetryPump;
pub use workload::{Role, Workload, WorkloadState};
