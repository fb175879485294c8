//! Report command: prints a protocol's exported metrics.

use std::path::Path;

use vigil_core::metrics::report;

use crate::colors;
use crate::display;

pub fn execute(dir: &Path, protocol: u8) -> anyhow::Result<()> {
    let results = report::load_metrics(dir, protocol)?;
    let totals = report::load_totals(dir, protocol)?;

    println!(
        "{}Protocol {} report{} {}({}){}",
        colors::BOLD,
        protocol,
        colors::RESET,
        colors::DIM,
        report::metrics_path(dir, protocol).display(),
        colors::RESET
    );

    if results.is_empty() {
        println!("\n{}No cycles recorded.{}", colors::WARN, colors::RESET);
    }
    for result in &results {
        let speedup = result
            .speedup
            .map_or_else(|| "n/a".to_string(), |s| format!("{s:.2}x"));
        println!(
            "\n{}Cycle #{}{}  wall {:.3}s  overhead {:.3}s  speedup {}",
            colors::HIGHLIGHT,
            result.cycle,
            colors::RESET,
            result.wall_time.as_secs_f64(),
            result.overhead,
            speedup
        );
        display::print_resource_table(result);
        display::print_schedule_table(result);
    }

    display::print_totals(&totals);
    Ok(())
}
