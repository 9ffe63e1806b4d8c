#![deny(warnings)]

//! Headless CLI: build a neighborhood, run it year by year and export the run.

use anyhow::{bail, Context, Result};
use persistence::RunWriter;
use sim_core::{NormMode, PackageKind, SimConfig};
use sim_runtime::{run, RunControl, RunOutcome, Simulation};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    preset: Option<String>,
    years: Option<u32>,
    seed: Option<u64>,
    households: Option<u32>,
    residents: Option<u32>,
    norm_mode: Option<NormMode>,
    delay_ms: Option<u64>,
    out: Option<PathBuf>,
}

fn value<T: std::str::FromStr>(flag: &str, raw: Option<String>) -> Result<T> {
    let Some(raw) = raw else {
        bail!("{flag} needs a value");
    };
    match raw.parse() {
        Ok(v) => Ok(v),
        Err(_) => bail!("invalid value for {flag}: {raw}"),
    }
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => parsed.config = Some(value(&arg, it.next())?),
            "--preset" => parsed.preset = Some(value(&arg, it.next())?),
            "--years" => parsed.years = Some(value(&arg, it.next())?),
            "--seed" => parsed.seed = Some(value(&arg, it.next())?),
            "--households" => parsed.households = Some(value(&arg, it.next())?),
            "--residents" => parsed.residents = Some(value(&arg, it.next())?),
            "--norm-mode" => parsed.norm_mode = Some(value(&arg, it.next())?),
            "--delay-ms" => parsed.delay_ms = Some(value(&arg, it.next())?),
            "--out" => parsed.out = Some(value(&arg, it.next())?),
            other => bail!("unknown argument: {other}"),
        }
    }
    Ok(parsed)
}

fn load_config(args: &Args) -> Result<SimConfig> {
    let mut config = match (&args.config, args.preset.as_deref()) {
        (Some(path), _) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        (None, None | Some("default")) => SimConfig::default(),
        (None, Some("testing")) => SimConfig::testing(),
        (None, Some(other)) => bail!("unknown preset: {other}"),
    };
    if let Some(v) = args.years {
        config.simulation_years = v;
    }
    if let Some(v) = args.seed {
        config.seed = v;
    }
    if let Some(v) = args.households {
        config.nr_households = v;
    }
    if let Some(v) = args.residents {
        config.nr_residents = v;
    }
    if let Some(v) = args.norm_mode {
        config.norm_mode = v;
    }
    Ok(config)
}

/// Build the population, then claim a run file. An invalid config never
/// reaches the output folder.
fn start_run(config: SimConfig, out: Option<&Path>) -> Result<(Simulation, Option<RunWriter>)> {
    let sim = Simulation::create(config).context("invalid configuration")?;
    let writer = match out {
        Some(dir) => Some(RunWriter::create(dir, sim.config())?),
        None => None,
    };
    Ok((sim, writer))
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = parse_args(std::env::args().skip(1))?;
    let config = load_config(&args)?;
    info!(
        households = config.nr_households,
        residents = config.nr_residents,
        years = config.simulation_years,
        seed = config.seed,
        mode = ?config.norm_mode,
        "starting CLI"
    );

    let (mut sim, mut writer) = start_run(config, args.out.as_deref())?;
    let control = RunControl::default();
    if let Some(ms) = args.delay_ms {
        control.set_year_delay(Duration::from_millis(ms));
    }

    let mut write_error = None;
    let outcome = run(&mut sim, &control, |_, snap| {
        println!(
            "KPI | year: {} | {}: +{} decided, {} installed, €{} | {}: +{} decided, {} installed, €{} | CO2 saved: {:.0} kg",
            snap.year,
            PackageKind::SolarPanel,
            snap.decisions.solar_panel,
            snap.installed.solar_panel,
            snap.prices.solar_panel,
            PackageKind::HeatPump,
            snap.decisions.heat_pump,
            snap.installed.heat_pump,
            snap.prices.heat_pump,
            snap.co2_saved_kg,
        );
        if let Some(w) = writer.as_mut() {
            if let Err(e) = w.append_year(snap) {
                if write_error.is_none() {
                    write_error = Some(e);
                }
                control.request_stop();
            }
        }
    });
    if let Some(e) = write_error {
        return Err(e);
    }
    if let RunOutcome::Cancelled { years } = outcome {
        warn!(years, "run stopped early");
    }

    if let Some(w) = writer.as_mut() {
        w.write_households(sim.household_report())?;
        info!(path = %w.path().display(), "run exported");
    }
    println!("{}", sim.summary());
    Ok(())
}
