//! Protocol scenarios with shell scripts standing in for the workloads.

mod common;

use std::time::Duration;

use common::Mission;
use vigil_core::{
    Activation, CycleContext, ExitKind, Orchestrator, Protocol, ProtocolEngine, ResetFlag, Role,
    SilentObserver, StopReason, WINDOW_CAPACITY,
    driver::{ProtocolSource, Selection},
    metrics::report,
};

/// Receiver forwarding the telemetry unchanged.
const FORWARD: &str = "cat\n";
/// Analyzer echoing every reading it receives.
const ECHO_READINGS: &str = "while read -r t; do echo \"temp $t\"; done\n";

fn run(engine: &ProtocolEngine, protocol: Protocol) -> (CycleContext, vigil_core::ProtocolOutcome) {
    let mut ctx = CycleContext::new(1, protocol);
    let outcome = engine.execute(&mut ctx).unwrap();
    (ctx, outcome)
}

// =============================================================================
// Protocol 1: strict sequential
// =============================================================================

#[test]
fn test_sequential_reads_analyzer_summary() {
    let mission = Mission::new();
    mission.telemetry(&[60, 95, 100, 50]);
    let receiver = mission.script("receiver.sh", FORWARD);
    let shield = mission.logging_shield();
    let analyzer = mission.script("analyzer.sh", "tail -n 1\n");

    let engine = ProtocolEngine::new(mission.config(&receiver, &shield, &analyzer));
    let (ctx, outcome) = run(&engine, Protocol::StrictSequential);

    assert_eq!(outcome.summary, Some(50));
    for role in Role::ALL {
        let stats = ctx.stats(role).unwrap();
        assert_eq!(stats.invocations, 1, "{role}");
        assert_eq!(stats.exit, ExitKind::Normal { code: 0 }, "{role}");
        assert!(!stats.killed, "{role}");
    }
    // Shield and analyzer were held at launch and resumed once.
    for role in [Role::Shield, Role::Analyzer] {
        let signals = &ctx.stats(role).unwrap().schedule.signals;
        assert_eq!((signals.suspend, signals.resume), (1, 1), "{role}");
        assert_eq!(ctx.stats(role).unwrap().schedule.pause_count, 0);
    }
    // The shield runs without an activation argument.
    assert_eq!(mission.shield_arguments(), ["-"]);
}

#[test]
fn test_sequential_times_held_workloads_from_release() {
    let mission = Mission::new();
    mission.telemetry(&[60, 95, 100, 50]);
    let receiver = mission.script("receiver.sh", "sleep 2\ncat\n");
    let shield = mission.logging_shield();
    let analyzer = mission.script("analyzer.sh", "tail -n 1\n");

    let config = mission.config(&receiver, &shield, &analyzer);
    let mut orchestrator = Orchestrator::new(config, Never, SilentObserver, ResetFlag::new());
    let result = orchestrator
        .run_cycle(Protocol::StrictSequential)
        .unwrap()
        .unwrap();

    let receiver = result.stats(Role::Receiver).unwrap();
    let shield = result.stats(Role::Shield).unwrap();
    let analyzer = result.stats(Role::Analyzer).unwrap();
    assert!(receiver.wall_time >= Duration::from_secs(2));
    assert!(shield.wall_time < Duration::from_millis(500), "{:?}", shield.wall_time);
    assert!(analyzer.wall_time < Duration::from_secs(1), "{:?}", analyzer.wall_time);
    // The hold covers the receiver's whole run.
    assert!(shield.schedule.paused_time >= Duration::from_millis(1900));
    // Workloads run one after the other, so they never overlap.
    assert!(result.overhead >= 0.0, "overhead {}", result.overhead);
}

#[test]
fn test_sequential_analyzer_timeout_yields_zero() {
    let mission = Mission::new();
    mission.telemetry(&[60, 95, 100, 50]);
    let receiver = mission.script("receiver.sh", FORWARD);
    let shield = mission.logging_shield();
    let analyzer = mission.script("analyzer.sh", "exec sleep 30\n");

    let mut config = mission.config(&receiver, &shield, &analyzer);
    config.analyzer_timeout_secs = 1;
    let engine = ProtocolEngine::new(config);
    let (ctx, outcome) = run(&engine, Protocol::StrictSequential);

    assert_eq!(outcome.summary, Some(0));
    let analyzer = ctx.stats(Role::Analyzer).unwrap();
    assert!(analyzer.killed);
    assert_eq!(analyzer.exit, ExitKind::Signaled { signal: libc::SIGKILL });
    assert!(analyzer.wall_time >= Duration::from_secs(1));
    assert!(!ctx.stats(Role::Receiver).unwrap().killed);
}

#[test]
fn test_sequential_missing_telemetry_closes_feed() {
    let mission = Mission::new();
    let receiver = mission.script("receiver.sh", FORWARD);
    let shield = mission.logging_shield();
    let analyzer = mission.script("analyzer.sh", "tail -n 1\n");

    let engine = ProtocolEngine::new(mission.config(&receiver, &shield, &analyzer));
    let (ctx, outcome) = run(&engine, Protocol::StrictSequential);

    assert_eq!(outcome.summary, Some(0));
    assert!(!ctx.stats(Role::Receiver).unwrap().killed);
}

#[test]
fn test_sequential_missing_binary_is_diagnosed() {
    let mission = Mission::new();
    mission.telemetry(&[60]);
    let receiver = mission.script("receiver.sh", FORWARD);
    let shield = mission.logging_shield();
    let analyzer = mission.path().join("absent.sh");

    let engine = ProtocolEngine::new(mission.config(&receiver, &shield, &analyzer));
    let (ctx, outcome) = run(&engine, Protocol::StrictSequential);

    // /bin/sh itself loads and reports the missing script.
    let analyzer = ctx.stats(Role::Analyzer).unwrap();
    assert!(!analyzer.exit.is_success());
    assert_eq!(outcome.summary, Some(0));
}

// =============================================================================
// Protocols 2 and 3: round-robin
// =============================================================================

#[test]
fn test_round_robin_high_reading_engages_shield() {
    let mission = Mission::new();
    mission.telemetry(&[95]);
    let receiver = mission.script("receiver.sh", FORWARD);
    let shield = mission.logging_shield();
    let analyzer = mission.script("analyzer.sh", ECHO_READINGS);

    let engine = ProtocolEngine::new(mission.config(&receiver, &shield, &analyzer));
    let (ctx, outcome) = run(&engine, Protocol::RoundRobin);

    assert_eq!(outcome.last_reading, Some(95));
    assert!(!outcome.shield_activations.is_empty());
    assert!(
        outcome
            .shield_activations
            .iter()
            .all(|a| *a == Some(Activation::Engage))
    );
    let arguments = mission.shield_arguments();
    assert!(!arguments.is_empty());
    assert!(arguments.iter().all(|a| a == "1"));

    let shield_stats = ctx.stats(Role::Shield).unwrap();
    assert_eq!(shield_stats.invocations as usize, outcome.shield_activations.len());
    assert!(!ctx.stats(Role::Receiver).unwrap().killed);
    assert!(!ctx.stats(Role::Analyzer).unwrap().killed);
}

#[test]
fn test_round_robin_low_reading_disengages_shield() {
    let mission = Mission::new();
    mission.telemetry(&[40]);
    let receiver = mission.script("receiver.sh", FORWARD);
    let shield = mission.logging_shield();
    let analyzer = mission.script("analyzer.sh", ECHO_READINGS);

    let engine = ProtocolEngine::new(mission.config(&receiver, &shield, &analyzer));
    let (_ctx, outcome) = run(&engine, Protocol::RoundRobin);

    assert_eq!(outcome.last_reading, Some(40));
    let arguments = mission.shield_arguments();
    assert!(!arguments.is_empty());
    assert!(arguments.iter().all(|a| a == "0"));
}

#[test]
fn test_round_robin_without_reading_skips_shield() {
    let mission = Mission::new();
    mission.telemetry(&[60, 70]);
    let receiver = mission.script("receiver.sh", FORWARD);
    let shield = mission.logging_shield();
    let analyzer = mission.script("analyzer.sh", "cat > /dev/null\n");

    let engine = ProtocolEngine::new(mission.config(&receiver, &shield, &analyzer));
    let (ctx, outcome) = run(&engine, Protocol::RoundRobin);

    assert_eq!(outcome.last_reading, None);
    assert!(outcome.shield_activations.is_empty());
    assert!(mission.shield_arguments().is_empty());
    assert!(!ctx.stats(Role::Shield).is_some_and(|s| s.ran()));
}

#[test]
fn test_analyzer_exit_terminates_receiver() {
    let mission = Mission::new();
    mission.telemetry(&[60, 70]);
    let receiver = mission.script("receiver.sh", "exec sleep 30\n");
    let shield = mission.logging_shield();
    let analyzer = mission.script("analyzer.sh", "echo \"temp 40\"\n");

    let engine = ProtocolEngine::new(mission.config(&receiver, &shield, &analyzer));
    let (ctx, outcome) = run(&engine, Protocol::RoundRobin);

    let receiver = ctx.stats(Role::Receiver).unwrap();
    assert!(receiver.killed);
    assert_eq!(receiver.schedule.signals.kill, 1);
    assert!(receiver.schedule.pause_count >= 1);
    assert!(!ctx.stats(Role::Analyzer).unwrap().killed);
    assert_eq!(outcome.last_reading, Some(40));
    assert_eq!(mission.shield_arguments(), ["0"]);
}

#[test]
fn test_shield_first_carries_previous_reading() {
    let mission = Mission::new();
    mission.telemetry(&[95]);
    let receiver = mission.script("receiver.sh", FORWARD);
    let shield = mission.logging_shield();
    // Keeps running past its first quantum so a second pass happens.
    let analyzer = mission.script(
        "analyzer.sh",
        "while read -r t; do echo \"temp $t\"; done\nsleep 0.5\n",
    );

    let engine = ProtocolEngine::new(mission.config(&receiver, &shield, &analyzer));
    let (_ctx, outcome) = run(&engine, Protocol::ShieldFirst);

    let activations = &outcome.shield_activations;
    assert!(activations.len() >= 2, "{activations:?}");
    assert_eq!(activations[0], None);
    assert!(activations[1..].iter().all(|a| *a == Some(Activation::Engage)));

    let arguments = mission.shield_arguments();
    assert_eq!(arguments[0], "-");
    assert!(arguments[1..].iter().all(|a| a == "1"));
}

// =============================================================================
// Cycle driver
// =============================================================================

struct Never;

impl ProtocolSource for Never {
    fn select(&mut self) -> Selection {
        Selection::Closed
    }
}

#[test]
fn test_full_window_is_exported() {
    let mission = Mission::new();
    mission.telemetry(&[60, 95, 100, 50]);
    let receiver = mission.script("receiver.sh", FORWARD);
    let shield = mission.logging_shield();
    let analyzer = mission.script("analyzer.sh", "tail -n 1\n");

    let mut config = mission.config(&receiver, &shield, &analyzer);
    config.protocol = Some(Protocol::StrictSequential);
    config.max_cycles = Some(WINDOW_CAPACITY as u64 + 1);
    let mut orchestrator = Orchestrator::new(config, Never, SilentObserver, ResetFlag::new());

    assert_eq!(orchestrator.run().unwrap(), StopReason::CycleLimit);
    // The sixth cycle opens a new window.
    assert_eq!(orchestrator.metrics().len(), 1);
    assert!(orchestrator.baseline().reference().is_some());

    let results = report::load_metrics(mission.path(), 1).unwrap();
    assert_eq!(results.len(), WINDOW_CAPACITY);
    let cycles: Vec<u32> = results.iter().map(|r| r.cycle).collect();
    assert_eq!(cycles, [1, 2, 3, 4, 5]);
    // The baseline cycle compares against itself.
    let first = results[0].speedup.unwrap();
    assert!((first - 1.0).abs() < 1e-9);
    assert!(results.iter().all(|r| r.workloads.len() == 3));
    assert!(results.iter().all(|r| r.speedup.is_some()));

    let totals = report::load_totals(mission.path(), 1).unwrap();
    assert_eq!(totals.protocol, 1);
    assert_eq!(totals.cycles, WINDOW_CAPACITY as u32);
    let summed: Duration = results.iter().map(|r| r.wall_time).sum();
    let diff = (summed.as_secs_f64() - totals.wall_time.as_secs_f64()).abs();
    assert!(diff < 1e-3);
}

#[test]
fn test_round_robin_without_baseline_reports_no_speedup() {
    let mission = Mission::new();
    mission.telemetry(&[40]);
    let receiver = mission.script("receiver.sh", FORWARD);
    let shield = mission.logging_shield();
    let analyzer = mission.script("analyzer.sh", ECHO_READINGS);

    let config = mission.config(&receiver, &shield, &analyzer);
    let mut orchestrator = Orchestrator::new(config, Never, SilentObserver, ResetFlag::new());
    let result = orchestrator.run_cycle(Protocol::RoundRobin).unwrap().unwrap();

    assert_eq!(result.protocol, 2);
    assert_eq!(result.speedup, None);
    assert!(orchestrator.baseline().reference().is_none());
    let summed: f64 = result
        .workloads
        .values()
        .map(|s| s.wall_time.as_secs_f64())
        .sum();
    assert!((result.wall_time.as_secs_f64() - summed - result.overhead).abs() < 1e-6);
}
