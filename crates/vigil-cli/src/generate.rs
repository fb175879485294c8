//! Generate command: writes a telemetry file.

use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;
use vigil_core::telemetry;

use crate::colors;

pub fn execute(output: &Path, count: usize, seed: Option<u64>) -> anyhow::Result<()> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let readings = telemetry::generate(count, &mut rng);
    telemetry::write_file(output, &readings)?;

    println!(
        "{}Generated{} {} readings into {}",
        colors::OK,
        colors::RESET,
        readings.len(),
        output.display()
    );
    Ok(())
}
