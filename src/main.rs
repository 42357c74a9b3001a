//! # meteoqc Runner
//!
//! Command-line runner for the daily station quality control. The usual
//! deployment is a cron job shortly after midnight, grading the day that
//! just closed and mailing the digest when something looks off.
//!
//! ## Usage
//!
//! ```bash
//! # Grade yesterday's helios day with the local configuration
//! meteoqc check --station helios
//!
//! # Grade a specific geonica day, charts off
//! meteoqc check --station geonica --date 2024-06-01 --no-plots
//!
//! # Synthesize a clear-sky day and run the battery over it
//! meteoqc demo --fault
//!
//! # Hourly solar position table for the default site
//! meteoqc sun --date 2024-06-21
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use log::info;

use meteoqc::checks::{geonica_battery, helios_battery, meteo_battery, CheckSession};
use meteoqc::config::{QcConfig, ReportPaths};
use meteoqc::incident::{IncidentLog, Severity};
use meteoqc::loader::{StationKind, StationLoader};
use meteoqc::render::{DiagnosticRenderer, NullRenderer, SvgPlotter};
use meteoqc::report::Reporter;
use meteoqc::series::{Column, StationDay};
use meteoqc::solar::{solar_position, Location};

/// meteoqc - Daily Quality Control for Solar Meteo Stations
#[derive(Parser)]
#[command(name = "meteoqc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a station's check battery over one day
    Check {
        /// Station to analyze (helios, geonica or meteo)
        #[arg(short, long)]
        station: StationKind,

        /// Day to analyze, YYYY-MM-DD (defaults to yesterday)
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Configuration file (defaults to meteoqc.toml when present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Skip diagnostic chart rendering
        #[arg(long)]
        no_plots: bool,
    },

    /// Grade a synthetic clear-sky day, no station files needed
    Demo {
        /// Inject an out-of-range fault into the synthetic day
        #[arg(long)]
        fault: bool,
    },

    /// Print an hourly solar position table
    Sun {
        /// Day to tabulate, YYYY-MM-DD (defaults to today)
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Site latitude in decimal degrees, north positive
        #[arg(long)]
        lat: Option<f64>,

        /// Site longitude in decimal degrees, east positive
        #[arg(long)]
        lon: Option<f64>,

        /// Site standard-time offset from UTC in hours
        #[arg(long)]
        utc_offset: Option<f64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Check {
            station,
            date,
            config,
            no_plots,
        } => run_check(station, date, config, no_plots),
        Commands::Demo { fault } => run_demo(fault),
        Commands::Sun {
            date,
            lat,
            lon,
            utc_offset,
        } => run_sun(date, lat, lon, utc_offset),
    }
}

/// Run one station's battery over one day and report.
fn run_check(
    station: StationKind,
    date: Option<NaiveDate>,
    config_path: Option<PathBuf>,
    no_plots: bool,
) -> Result<()> {
    let config = load_config(config_path.as_deref())?;
    let date = date.unwrap_or_else(yesterday);

    info!("meteoqc - Station Day Quality Control");
    info!("Station: {}", station);
    info!("Date:    {}", date);

    let loader = config.stations.loader();
    let renderer: Box<dyn DiagnosticRenderer> = if no_plots {
        Box::new(NullRenderer)
    } else {
        Box::new(SvgPlotter::default())
    };
    let reporter = build_reporter(&config)?;

    let mut session = CheckSession::open(station, date, &loader, &config, renderer, reporter)
        .context("cannot open the check session")?;

    match station {
        StationKind::Helios => {
            let sibling = sibling_day(&loader, StationKind::Geonica, date);
            helios_battery(&mut session, sibling.as_ref());
        }
        StationKind::Geonica => {
            let sibling = sibling_day(&loader, StationKind::Helios, date);
            geonica_battery(&mut session, sibling.as_ref());
        }
        StationKind::Meteo => meteo_battery(&mut session),
    }

    let log = session.finish().context("cannot close the check session")?;
    print_report(&log);

    if log.any_at_or_above(Severity::Error) {
        std::process::exit(1);
    }
    Ok(())
}

/// Grade a synthetic clear-sky geonica day through the prepared-day path.
fn run_demo(fault: bool) -> Result<()> {
    info!("meteoqc demo - synthetic clear-sky day");

    let config = QcConfig::default();
    let date = yesterday();
    let day = clear_sky_day(date, &config.location, fault)?;

    let dir = std::env::temp_dir().join("meteoqc-demo");
    info!("Report directory: {}", dir.display());
    let reporter = Reporter::new(ReportPaths {
        dir,
        ..ReportPaths::default()
    });

    let mut session = CheckSession::from_day(
        "demo",
        day,
        &config,
        Box::new(SvgPlotter::default()),
        reporter,
    )
    .context("cannot open the demo session")?;
    geonica_battery(&mut session, None);

    let log = session.finish().context("cannot close the demo session")?;
    print_report(&log);
    Ok(())
}

/// Print azimuth and zenith for every hour of one day.
fn run_sun(
    date: Option<NaiveDate>,
    lat: Option<f64>,
    lon: Option<f64>,
    utc_offset: Option<f64>,
) -> Result<()> {
    let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
    let mut location = Location::default();
    if let Some(lat) = lat {
        location.latitude = lat;
    }
    if let Some(lon) = lon {
        location.longitude = lon;
    }
    if let Some(offset) = utc_offset {
        location.utc_offset = offset;
    }

    println!(
        "Solar position on {} at {:.2}N {:.2}E (UTC{:+.1})",
        date, location.latitude, location.longitude, location.utc_offset
    );
    println!("{:>5}  {:>11}  {:>10}", "hour", "azimuth", "zenith");
    for hour in 0..24 {
        let instant = date
            .and_hms_opt(hour, 0, 0)
            .context("hour out of range")?;
        let position = solar_position(instant, &location);
        println!(
            "{:>2}:00  {:>10.2}  {:>9.2}",
            hour,
            position.azimuth.to_degrees(),
            position.zenith.to_degrees()
        );
    }
    Ok(())
}

/// Load the named configuration file, or fall back to `meteoqc.toml` in the
/// working directory, or to built-in defaults when neither exists.
fn load_config(path: Option<&Path>) -> Result<QcConfig> {
    match path {
        Some(path) => QcConfig::from_file(path)
            .with_context(|| format!("cannot load configuration from {}", path.display())),
        None => {
            let default_path = Path::new("meteoqc.toml");
            if default_path.exists() {
                QcConfig::from_file(default_path).context("cannot load meteoqc.toml")
            } else {
                log::debug!("no meteoqc.toml found, using built-in defaults");
                Ok(QcConfig::default())
            }
        }
    }
}

/// Reporter with digest delivery attached when the build and the
/// configuration both allow it.
fn build_reporter(config: &QcConfig) -> Result<Reporter> {
    let reporter = Reporter::new(config.report.clone());

    #[cfg(feature = "smtp")]
    if config.email.enabled {
        let notifier = meteoqc::notify::SmtpNotifier::new(config.email.clone())
            .context("digest delivery is enabled but misconfigured")?;
        return Ok(reporter.with_notifier(config.email.clone(), Box::new(notifier)));
    }

    #[cfg(not(feature = "smtp"))]
    if config.email.enabled {
        log::warn!("digest delivery is enabled but this build carries no smtp support");
    }

    Ok(reporter)
}

/// The other radiation station's day, when its file loads.
fn sibling_day(
    loader: &dyn StationLoader,
    kind: StationKind,
    date: NaiveDate,
) -> Option<StationDay> {
    match loader.load(kind, date) {
        Ok((day, _)) => Some(day),
        Err(err) => {
            log::debug!("no {} day to compare against: {}", kind, err);
            None
        }
    }
}

fn print_report(log: &IncidentLog) {
    #[cfg(feature = "colorized_output")]
    println!("{}", log.format_colored());
    #[cfg(not(feature = "colorized_output"))]
    println!("{}", log);
}

fn yesterday() -> NaiveDate {
    chrono::Local::now().date_naive() - chrono::Duration::days(1)
}

/// A full minute-sampled geonica-style day driven by the solar model:
/// constant direct beam and diffuse while the sun is up, global closed
/// against them, isotype cells mirroring the beam.
fn clear_sky_day(date: NaiveDate, location: &Location, fault: bool) -> Result<StationDay> {
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .context("cannot build the day start")?;
    let times: Vec<_> = (0..1440)
        .map(|i| midnight + chrono::Duration::minutes(i))
        .collect();

    let mut direct = Vec::with_capacity(times.len());
    let mut diffuse = Vec::with_capacity(times.len());
    let mut global = Vec::with_capacity(times.len());
    let mut ambient = Vec::with_capacity(times.len());
    for t in &times {
        let cos_zenith = solar_position(*t, location).zenith.cos();
        if cos_zenith > 0.0 {
            direct.push(850.0);
            diffuse.push(80.0);
            global.push(80.0 + 850.0 * cos_zenith);
            ambient.push(15.0 + 10.0 * cos_zenith);
        } else {
            direct.push(0.0);
            diffuse.push(0.0);
            global.push(0.0);
            ambient.push(15.0);
        }
    }

    if fault {
        // a noon spike past the plausible global range
        global[720] = 2000.0;
    }

    let mut day = StationDay::new("demo", date);
    day.times = times;
    day.columns.push(Column::new("B", direct.clone()));
    day.columns.push(Column::new("G(0)", global));
    day.columns.push(Column::new("D(0)", diffuse));
    day.columns.push(Column::new("Top", direct.clone()));
    day.columns.push(Column::new("Mid", direct.clone()));
    day.columns.push(Column::new("Bot", direct));
    day.columns.push(Column::new("Tamb", ambient));
    Ok(day)
}
