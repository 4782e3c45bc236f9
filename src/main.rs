// Border Wait Simulator - Main Entry Point
//
// You can run it via Cargo:
//
// ```console
// $ cargo build --release
// $ ./target/release/border-wait-sim --seed 42
// ```
//
// Or with custom configuration:
//
// ```console
// $ ./target/release/border-wait-sim --num-queues 2 --nodes-per-queue 1,2 --service-rates 3,3,4 --verbose
// ```

use anyhow::{Context, Result};
use border_wait_sim::simulation::{LoggingConfig, LoggingGuard, Simulation, SimulationReport};
use border_wait_sim::types::config::CliArgs;
use border_wait_sim::types::ScenarioConfig;
use clap::Parser;
use std::fs;
use std::process;
use tracing::{error, info, Level};

fn main() {
    // Parse CLI arguments first to check for special flags
    let args = CliArgs::parse();

    if args.print_config {
        match ScenarioConfig::default().print_json() {
            Ok(json) => {
                println!("{}", json);
                return;
            }
            Err(e) => {
                eprintln!("Failed to serialize default configuration: {}", e);
                process::exit(1);
            }
        }
    }

    let _logging_guard = match init_logging(&args) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run(args) {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn init_logging(args: &CliArgs) -> Result<LoggingGuard> {
    let level = if args.debug {
        Level::DEBUG
    } else if args.verbose {
        Level::INFO
    } else {
        // Default: minimal logging for normal users
        Level::WARN
    };

    let mut config = LoggingConfig::new().with_level(level);
    if args.debug || args.verbose {
        config = config.with_span_events();
    }
    if args.json_logs {
        config = config.with_json_format();
    }
    config.init().map_err(|e| anyhow::anyhow!("{}", e))
}

fn run(args: CliArgs) -> Result<()> {
    info!("Starting border wait simulator");

    let dry_run = args.dry_run;
    let output = args.output.clone();

    let scenario = ScenarioConfig::from_cli_args(args).context("Failed to load configuration")?;
    scenario.validate().context("Configuration validation failed")?;
    info!("Configuration loaded and validated successfully");

    if dry_run {
        eprintln!("Configuration validation successful!");
        eprintln!("Dry run mode - simulation will not be executed.");
        print_configuration_summary(&scenario);
        return Ok(());
    }

    print_startup_banner(&scenario);

    let mut simulation = Simulation::from_scenario(&scenario).context("Failed to create simulation")?;
    let report = simulation.run().context("Simulation failed")?;

    eprintln!("{}", report.generate_summary_report());
    info!("{}", report.compact_summary());

    if let Some(path) = output {
        write_report(&report, &path)?;
        eprintln!("Report written to: {}", path);
    }

    Ok(())
}

fn write_report(report: &SimulationReport, path: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    fs::write(path, json).with_context(|| format!("Failed to write report to '{}'", path))?;
    info!("Report written to {}", path);
    Ok(())
}

/// Print startup banner and configuration summary
fn print_startup_banner(scenario: &ScenarioConfig) {
    eprintln!("Border Wait Simulator");
    eprintln!("=====================");
    eprintln!("Vehicle flow through a multi-lane inspection crossing");
    eprintln!();

    print_configuration_summary(scenario);
}

fn print_configuration_summary(scenario: &ScenarioConfig) {
    let crossing = &scenario.border_crossing;
    let sim = &scenario.simulation;

    eprintln!("Configuration:");
    eprintln!("  Queues: {}", crossing.num_queues);
    eprintln!("  Booths per Queue: {:?}", crossing.nodes_per_queue);
    eprintln!("  Arrival Rate: {:.2} cars/min", crossing.arrival_rate);
    eprintln!("  Service Rates: {:?}", crossing.service_rates);
    eprintln!("  Assignment: {}", crossing.queue_assignment);
    eprintln!("  Service Model: {}", crossing.service_time_model);
    eprintln!("  Time-of-Day Arrivals: {}", crossing.time_of_day_modulation);
    eprintln!("  Safe Distance: {:.1} m", crossing.safe_distance);
    eprintln!("  Max Queue Length: {}", crossing.max_queue_length);
    eprintln!("  Horizon: {:.0} s", sim.max_simulation_time);
    eprintln!("  Tick: {} s", sim.time_factor);
    if let Some(seed) = sim.seed {
        eprintln!("  Random Seed: {}", seed);
    }
    eprintln!();
}
