//! Vigil CLI - satellite subsystem workload orchestrator.

mod colors;
mod console;
mod display;
mod generate;
mod report;
mod run;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use vigil_core::{OrchestratorConfig, Protocol};

#[derive(Parser)]
#[command(name = "vigil")]
#[command(about = "Orchestrates emulated satellite subsystem workloads")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the orchestration cycle loop
    Run(RunArgs),

    /// Generate a telemetry file
    Generate {
        /// Output path
        #[arg(short, long, default_value = "telemetry.txt")]
        output: PathBuf,

        /// Number of readings
        #[arg(short = 'n', long, default_value_t = vigil_core::telemetry::DEFAULT_READINGS)]
        count: usize,

        /// Seed for a reproducible sequence
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show an exported protocol report
    Report {
        /// Protocol number (1-3)
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=3))]
        protocol: u8,

        /// Directory holding the report files
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Protocol to run (1-4); prompts when omitted
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=4))]
    protocol: Option<u8>,

    /// Stop after this many cycles
    #[arg(short, long)]
    cycles: Option<u64>,

    /// Emulation launcher; pass an empty string to execute workloads directly
    #[arg(long, default_value = vigil_core::config::DEFAULT_LAUNCHER)]
    launcher: String,

    /// Signal receiver binary
    #[arg(long, default_value = "./workloads/receiver")]
    receiver: PathBuf,

    /// Shield controller binary
    #[arg(long, default_value = "./workloads/shield")]
    shield: PathBuf,

    /// Spectral analyzer binary
    #[arg(long, default_value = "./workloads/analyzer")]
    analyzer: PathBuf,

    /// Telemetry file streamed into the receiver
    #[arg(short, long, default_value = "telemetry.txt")]
    telemetry: PathBuf,

    /// Directory for report files
    #[arg(long, default_value = ".")]
    report_dir: PathBuf,

    /// Receiver quantum in seconds
    #[arg(long, default_value = "10", value_parser = parse_secs)]
    receiver_quantum: Duration,

    /// Analyzer quantum in seconds
    #[arg(long, default_value = "5", value_parser = parse_secs)]
    analyzer_quantum: Duration,

    /// Analyzer timeout in whole seconds under protocol 1 (0 waits forever)
    #[arg(long, default_value_t = 5)]
    analyzer_timeout: u64,

    /// Delay between cycles in seconds
    #[arg(long, default_value = "10", value_parser = parse_secs)]
    cycle_delay: Duration,
}

impl RunArgs {
    fn into_config(self) -> anyhow::Result<OrchestratorConfig> {
        let protocol = self.protocol.map(Protocol::try_from).transpose()?;
        let launcher = if self.launcher.is_empty() {
            None
        } else {
            Some(PathBuf::from(self.launcher))
        };
        Ok(OrchestratorConfig {
            launcher,
            receiver: self.receiver,
            shield: self.shield,
            analyzer: self.analyzer,
            telemetry: self.telemetry,
            report_dir: self.report_dir,
            receiver_quantum: self.receiver_quantum,
            analyzer_quantum: self.analyzer_quantum,
            analyzer_timeout_secs: self.analyzer_timeout,
            cycle_delay: self.cycle_delay,
            protocol,
            max_cycles: self.cycles,
        })
    }
}

/// Parse a non-negative number of seconds, fractions allowed.
fn parse_secs(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .parse()
        .map_err(|_| format!("`{value}` is not a number of seconds"))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("`{value}`: {e}"))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Helper to format vigil-core errors with recovery hints
    let format_error = |err: anyhow::Error| -> anyhow::Error {
        if let Some(vigil_err) = err.downcast_ref::<vigil_core::Error>() {
            anyhow::anyhow!("{}", vigil_err.with_hint())
        } else {
            err
        }
    };

    match cli.command {
        Commands::Run(args) => {
            let config = args.into_config().map_err(format_error)?;
            run::execute(config).map_err(format_error)?;
        }

        Commands::Generate {
            output,
            count,
            seed,
        } => {
            generate::execute(&output, count, seed).map_err(format_error)?;
        }

        Commands::Report { protocol, dir } => {
            report::execute(&dir, protocol).map_err(format_error)?;
        }
    }

    Ok(())
}
