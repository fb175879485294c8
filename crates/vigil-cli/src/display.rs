//! Tables shared by the run and report commands.

use std::time::Duration;

use vigil_core::{CycleResult, ExitKind, ProcessStats, Role, Totals};

use crate::colors;

const RULE_WIDTH: usize = 92;

fn secs(d: Duration) -> String {
    format!("{:.3}s", d.as_secs_f64())
}

fn exit_color(stats: &ProcessStats) -> &'static str {
    match stats.exit {
        ExitKind::Normal { code: 0 } if !stats.killed => colors::OK,
        ExitKind::Unknown => colors::FAIL,
        _ => colors::WARN,
    }
}

/// One row per workload that ran this cycle.
pub fn print_resource_table(result: &CycleResult) {
    println!(
        "\n{}{:<18} {:>8} {:>10} {:>10} {:>10} {:>10}  {}{}",
        colors::BOLD,
        "Workload",
        "PID",
        "Wall",
        "User CPU",
        "Sys CPU",
        "Max RSS",
        "Exit",
        colors::RESET
    );
    println!("{}", "─".repeat(RULE_WIDTH));
    for role in Role::ALL {
        let Some(stats) = result.stats(role).filter(|s| s.ran()) else {
            continue;
        };
        let pid = stats
            .pid
            .map_or_else(|| "-".to_string(), |pid| pid.to_string());
        let runs = if stats.invocations > 1 {
            format!(" x{}", stats.invocations)
        } else {
            String::new()
        };
        println!(
            "{}{:<18}{} {:>8} {:>10} {:>10} {:>10} {:>8}kB  {}{}{}{}",
            colors::role(role),
            format!("{}{}", role.label(), runs),
            colors::RESET,
            pid,
            secs(stats.wall_time),
            secs(stats.usage.user_cpu),
            secs(stats.usage.system_cpu),
            stats.usage.max_rss_kb,
            exit_color(stats),
            stats.exit.describe(),
            if stats.killed { " (killed)" } else { "" },
            colors::RESET
        );
    }
}

/// Scheduling detail per workload, as stored in the report files.
pub fn print_schedule_table(result: &CycleResult) {
    println!(
        "{}{:<18} {:>10} {:>10} {:>7} {:>10} {:>10} {:>8} {:>8}{}",
        colors::DIM,
        "Workload",
        "Eff. CPU",
        "Paused",
        "Pauses",
        "Granted",
        "Consumed",
        "Vol.CS",
        "Inv.CS",
        colors::RESET
    );
    for role in Role::ALL {
        let Some(stats) = result.stats(role).filter(|s| s.ran()) else {
            continue;
        };
        println!(
            "{}{:<18}{} {:>10} {:>10} {:>7} {:>10} {:>10} {:>8} {:>8}",
            colors::role(role),
            role.label(),
            colors::RESET,
            secs(stats.effective_cpu),
            secs(stats.schedule.paused_time),
            stats.schedule.pause_count,
            secs(stats.schedule.quantum_granted),
            secs(stats.schedule.quantum_consumed),
            stats.usage.voluntary_switches,
            stats.usage.involuntary_switches
        );
    }
}

pub fn print_speedup(speedup: Option<f64>) {
    match speedup {
        Some(speedup) => println!(
            "{}Speedup vs protocol 1:{} {:.2}x",
            colors::HIGHLIGHT,
            colors::RESET,
            speedup
        ),
        None => println!(
            "{}Speedup vs protocol 1: n/a (no baseline yet){}",
            colors::DIM,
            colors::RESET
        ),
    }
}

pub fn print_totals(totals: &Totals) {
    println!(
        "\n{}Accumulated totals, protocol {} ({} cycles){}",
        colors::BOLD,
        totals.protocol,
        totals.cycles,
        colors::RESET
    );
    println!("{}", "─".repeat(48));
    println!("  Wall time     {:>14}", secs(totals.wall_time));
    println!("  CPU user      {:>14}", secs(totals.cpu_user));
    println!("  CPU system    {:>14}", secs(totals.cpu_system));
    println!("  CPU total     {:>14}", secs(totals.cpu_total));
    println!("  Peak memory   {:>12}kB", totals.peak_memory_kb);
}
