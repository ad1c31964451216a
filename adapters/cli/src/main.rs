#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that resolves Skirmish battles.

mod loader;

use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use skirmish_core::{Resolution, Scenario, UnitCatalog};
use skirmish_system_validation::{challenge_disqualifiers, find_scenario_errors};
use tracing_subscriber::EnvFilter;

/// Deterministic battle resolver.
#[derive(Parser, Debug)]
#[command(name = "skirmish", author, version, about = "Resolve tactical battles deterministically", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Simulate a scenario and report its outcome.
    Resolve {
        #[command(flatten)]
        inputs: Inputs,
        /// TOML file overriding battle configuration values.
        #[arg(long)]
        config: Option<PathBuf>,
        /// How to print the resolution.
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Check a scenario without simulating it.
    Validate {
        #[command(flatten)]
        inputs: Inputs,
    },
}

#[derive(Args, Debug)]
struct Inputs {
    /// Scenario JSON file.
    #[arg(long)]
    scenario: PathBuf,
    /// Unit catalog JSON file.
    #[arg(long)]
    units: PathBuf,
}

impl Inputs {
    fn load(&self) -> Result<(Scenario, UnitCatalog)> {
        let scenario = loader::load_scenario(&self.scenario).context("failed to load scenario")?;
        let units = loader::load_units(&self.units).context("failed to load unit catalog")?;
        Ok((scenario, units))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

/// Entry point for the Skirmish command-line interface.
fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("skirmish=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Resolve {
            inputs,
            config,
            format,
        } => {
            let (scenario, units) = inputs.load()?;
            let config = loader::load_config(config.as_deref())
                .context("failed to load battle configuration")?;
            tracing::info!(
                target: "skirmish::cli",
                scenario = %inputs.scenario.display(),
                timestep_ms = config.timestep_ms,
                "resolving battle"
            );
            let resolution = skirmish_world::resolve_with(&scenario, &units, &config);
            match format {
                Format::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&resolution)
                        .context("failed to encode resolution")?
                ),
                Format::Text => print_summary(&resolution),
            }
            Ok(exit_code(resolution.is_rejected()))
        }
        Command::Validate { inputs } => {
            let (scenario, units) = inputs.load()?;
            let errors = find_scenario_errors(&scenario, &units);
            for error in &errors {
                println!("error: {error}");
            }
            for challenge in scenario.challenges.iter().filter(|challenge| challenge.is_static()) {
                let reasons = challenge_disqualifiers(&scenario, None, &units, challenge);
                if reasons.is_empty() {
                    println!("challenge met: {challenge}");
                } else {
                    println!("challenge missed: {challenge} ({})", reasons.join("; "));
                }
            }
            if errors.is_empty() {
                println!("scenario is valid");
            }
            Ok(exit_code(!errors.is_empty()))
        }
    }
}

fn exit_code(failed: bool) -> ExitCode {
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn print_summary(resolution: &Resolution) {
    if resolution.is_rejected() {
        println!("scenario rejected:");
        for error in &resolution.errors {
            println!("  {error}");
        }
        return;
    }

    println!("elapsed: {:.1}s", resolution.elapsed.as_secs_f64());
    println!("events: {}", resolution.events.len());
    let columns = [
        ("breaches", &resolution.breaches),
        ("attacker casualties", &resolution.attacker_casualties),
        ("defender casualties", &resolution.defender_casualties),
        ("attacker resources", &resolution.attacker_resources),
        ("defender resources", &resolution.defender_resources),
    ];
    for (label, per_team) in columns {
        let teams: Vec<String> = per_team
            .iter()
            .enumerate()
            .map(|(team, value)| format!("team {team}: {value}"))
            .collect();
        println!("{label}: {}", teams.join(", "));
    }
    for challenge in &resolution.achieved_challenges {
        println!("challenge met: {challenge}");
    }
    for challenge in &resolution.failed_challenges {
        println!("challenge missed: {challenge}");
    }
}
