//! Command-line front end for the wormhole detection simulation.
//!
//! Runs the Monte-Carlo ensemble experiment (default) or one of the standalone
//! heuristic scenarios, printing results or exporting them to a directory.

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use tracing::info;
#[cfg(not(feature = "large-scale"))]
use wormhole_reporting::{run_experiment, run_experiment_with_clock};
use wormhole_reporting::{export, init_logging, render, OutputFormat, Settings};
use wormhole_simulation::random::{from_entropy, seeded};
use wormhole_simulation::{ExperimentOutcome, ManualClock, SystemClock};

fn cli() -> Command {
    Command::new("wormhole-sim")
        .version(wormhole_reporting::VERSION)
        .about("Evaluate wormhole-attack detection heuristics for vehicular ad-hoc networks")
        .subcommand_required(false)
        .arg(Arg::new("config")
            .short('c')
            .long("config")
            .value_name("FILE")
            .help("TOML settings file (WORMHOLE__* environment variables override it)")
            .global(true))
        .arg(Arg::new("trials")
            .short('t')
            .long("trials")
            .value_name("N")
            .help("Number of independent trials")
            .value_parser(clap::value_parser!(usize))
            .global(true))
        .arg(Arg::new("nodes")
            .short('n')
            .long("nodes")
            .value_name("N")
            .help("Nodes per topology (vehicles for dphi)")
            .value_parser(clap::value_parser!(usize))
            .global(true))
        .arg(Arg::new("attacks")
            .short('a')
            .long("attacks")
            .value_name("N")
            .help("Distinct wormhole pairs per trial")
            .value_parser(clap::value_parser!(usize))
            .global(true))
        .arg(Arg::new("range")
            .short('r')
            .long("range")
            .value_name("METERS")
            .help("Communication range")
            .value_parser(clap::value_parser!(f64))
            .global(true))
        .arg(Arg::new("seed")
            .short('s')
            .long("seed")
            .value_name("SEED")
            .help("Master seed for reproducible runs")
            .value_parser(clap::value_parser!(u64))
            .global(true))
        .arg(Arg::new("format")
            .short('f')
            .long("format")
            .value_name("FORMAT")
            .help("Output format (table, json, csv)")
            .global(true))
        .arg(Arg::new("output")
            .short('o')
            .long("output")
            .value_name("DIR")
            .help("Write results to this directory instead of stdout")
            .global(true))
        .arg(Arg::new("records")
            .long("records")
            .help("Include per-attack result records")
            .action(ArgAction::SetTrue)
            .global(true))
        .arg(Arg::new("wall-clock")
            .long("wall-clock")
            .help("Stamp and verify packets with system time instead of a frozen clock")
            .action(ArgAction::SetTrue)
            .global(true))
        .arg(Arg::new("verbose")
            .short('v')
            .long("verbose")
            .help("Log every heuristic verdict")
            .action(ArgAction::SetTrue)
            .global(true))
        .subcommand(Command::new("ensemble").about("GPS baseline vs. Karen defense over randomized trials"))
        .subcommand(Command::new("gps").about("One random wormhole pair checked by GPS distance"))
        .subcommand(Command::new("leash").about("Packet leash over the fixed five-vehicle ring"))
        .subcommand(Command::new("dphi").about("Delay-per-hop checks followed by unchecked hops"))
        .subcommand(Command::new("print-config").about("Print the effective settings as TOML"))
}

/// Apply command-line overrides on top of the loaded settings
fn apply_overrides(settings: &mut Settings, matches: &ArgMatches) -> Result<()> {
    if let Some(&trials) = matches.get_one::<usize>("trials") {
        settings.experiment.num_trials = trials;
    }
    if let Some(&nodes) = matches.get_one::<usize>("nodes") {
        settings.experiment.num_nodes = nodes;
        settings.scenarios.gps.num_nodes = nodes;
        settings.scenarios.dphi.num_vehicles = nodes;
    }
    if let Some(&attacks) = matches.get_one::<usize>("attacks") {
        settings.experiment.attacks_per_trial = attacks;
    }
    if let Some(&range) = matches.get_one::<f64>("range") {
        settings.experiment.communication_range = range;
        settings.scenarios.gps.communication_range = range;
    }
    if let Some(&seed) = matches.get_one::<u64>("seed") {
        settings.experiment.seed = Some(seed);
    }
    if let Some(format) = matches.get_one::<String>("format") {
        settings.output.format = format.parse::<OutputFormat>()?;
    }
    if let Some(dir) = matches.get_one::<String>("output") {
        settings.output.directory = Some(PathBuf::from(dir));
    }
    if matches.get_flag("records") {
        settings.output.include_records = true;
    }

    // Scenario subcommands never run the experiment
    match matches.subcommand_name() {
        Some("gps") | Some("leash") | Some("dphi") => settings.validate_scenarios()?,
        _ => settings.validate()?,
    }
    Ok(())
}

fn emit_scenario<T: serde::Serialize>(settings: &Settings, name: &str, report: &T, table: String) -> Result<()> {
    let text = match settings.output.format {
        OutputFormat::Table | OutputFormat::Csv => table,
        OutputFormat::Json => serde_json::to_string_pretty(report)?,
    };
    match &settings.output.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let extension = if settings.output.format == OutputFormat::Json { "json" } else { "txt" };
            let path = dir.join(format!("{}.{}", name, extension));
            std::fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => print!("{}", text),
    }
    Ok(())
}

#[cfg(not(feature = "large-scale"))]
fn execute(settings: &Settings, wall_clock: bool) -> Result<ExperimentOutcome> {
    Ok(if wall_clock {
        run_experiment_with_clock(settings, &SystemClock)?
    } else {
        run_experiment(settings)?
    })
}

#[cfg(feature = "large-scale")]
fn execute(settings: &Settings, wall_clock: bool) -> Result<ExperimentOutcome> {
    use wormhole_reporting::run_experiment_parallel;

    Ok(if wall_clock {
        run_experiment_parallel(settings, &SystemClock)?
    } else {
        run_experiment_parallel(settings, &ManualClock::default())?
    })
}

fn run_ensemble(settings: &Settings, wall_clock: bool) -> Result<()> {
    let outcome = execute(settings, wall_clock)?;

    let output = &settings.output;
    if let Some(dir) = &output.directory {
        let files = export::write_outcome(&outcome, &settings.experiment, dir, output.format, output.include_records)?;
        for file in files {
            println!("Wrote {}", file.display());
        }
        return Ok(());
    }

    match output.format {
        OutputFormat::Table => {
            print!("{}", render::summary_table(&outcome.summary));
            if output.include_records {
                println!();
                print!("{}", render::records_table("Without Karen Defense", &outcome.baseline_records));
                println!();
                print!("{}", render::records_table("With Karen Defense", &outcome.ensemble_records));
            }
        }
        OutputFormat::Json => {
            let document = export::summary_json(&outcome, &settings.experiment, output.include_records)?;
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        OutputFormat::Csv => {
            print!("{}", export::outcome_csv(&outcome, output.include_records));
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let matches = cli().get_matches();

    let config_path = matches.get_one::<String>("config").map(PathBuf::from);
    let mut settings = Settings::load(config_path.as_deref())
        .with_context(|| "failed to load settings")?;
    apply_overrides(&mut settings, &matches)?;
    init_logging(&settings.logging, matches.get_flag("verbose"))?;

    let mut rng = match settings.experiment.seed {
        Some(seed) => seeded(seed),
        None => from_entropy(),
    };
    let wall_clock = matches.get_flag("wall-clock");

    match matches.subcommand_name() {
        None | Some("ensemble") => {
            info!(
                trials = settings.experiment.num_trials,
                nodes = settings.experiment.num_nodes,
                attacks = settings.experiment.attacks_per_trial,
                "running ensemble experiment"
            );
            run_ensemble(&settings, wall_clock)?;
        }
        Some("gps") => {
            let report = settings.scenarios.gps.run(&mut rng)?;
            emit_scenario(&settings, "gps", &report, render::gps_report(&report))?;
        }
        Some("leash") => {
            let report = if wall_clock {
                settings.scenarios.leash.run(&SystemClock)?
            } else {
                settings.scenarios.leash.run(&ManualClock::default())?
            };
            emit_scenario(&settings, "leash", &report, render::leash_report(&report))?;
        }
        Some("dphi") => {
            let report = settings.scenarios.dphi.run(&mut rng)?;
            emit_scenario(&settings, "dphi", &report, render::dphi_report(&report))?;
        }
        Some("print-config") => print!("{}", settings.to_toml()?),
        Some(other) => anyhow::bail!("unknown subcommand {}", other),
    }
    Ok(())
}
