//! # meteoqc - Daily Quality Control for Solar Meteo Stations
//!
//! `meteoqc` grades one completed day of measurements from a solar
//! meteorological station: it loads the day file, runs a battery of
//! plausibility and coherence checks over every channel, collects graded
//! findings into an incident log, and closes the session by persisting the
//! log and escalating it by mail when the day warrants attention.
//!
//! ## Key Features
//!
//! - **Physics-backed oracles**: global radiation is tested against the
//!   `DHI + DNI cos(zenith)` closure using a built-in solar position model,
//!   direct radiation against redundant loggers and the isotype cell
//!   triplet.
//!
//! - **Cloud-aware suppression**: cross-source comparisons count sharp
//!   irradiance steps first and withhold their verdict on broken-cloud
//!   days, so a stormy sky does not page anyone.
//!
//! - **Tracker misalignment scan**: a shape detector picks out the
//!   shallow symmetric valleys a mis-pointed two-axis tracker drags
//!   through the direct-irradiance trace.
//!
//! - **Incident log with teardown guarantees**: every finding is graded
//!   INFO through CRITICAL, stamped and echoed to the logger; teardown
//!   always writes the session TSV, the rolling history TSV and an HTML
//!   table, even when the session dies at construction.
//!
//! - **Inline-image digests**: failed checks render SVG charts that ride
//!   inside the escalation e-mail by content-id, no attachments to open.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chrono::NaiveDate;
//! use meteoqc::checks::{helios_battery, CheckSession};
//! use meteoqc::config::QcConfig;
//! use meteoqc::loader::{StationKind, StationLoader};
//! use meteoqc::render::SvgPlotter;
//! use meteoqc::report::Reporter;
//!
//! let config = QcConfig::from_file(std::path::Path::new("meteoqc.toml"))?;
//! let loader = config.stations.loader();
//! let reporter = Reporter::new(config.report.clone());
//!
//! let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
//! let mut session = CheckSession::open(
//!     StationKind::Helios,
//!     date,
//!     &loader,
//!     &config,
//!     Box::new(SvgPlotter::default()),
//!     reporter,
//! )?;
//!
//! // the geonica day backs the cross-source comparisons when it loads
//! let sibling = loader.load(StationKind::Geonica, date).ok();
//! helios_battery(&mut session, sibling.as_ref().map(|(day, _)| day));
//!
//! let log = session.finish()?;
//! println!("{}", log);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - [`series`]: time-stamped column tables and alignment primitives
//! - [`loader`]: station day files, their naming scheme and TSV dialect
//! - [`solar`]: solar position, declination and daylight-saving shifts
//! - [`signal`]: transition counting and daily irradiation integrals
//! - [`valley`]: the tracker-misalignment valley detector
//! - [`checks`]: the check engine, one session per station-day
//! - [`incident`]: graded findings and the session log
//! - [`render`]: diagnostic SVG charts for failed checks
//! - [`report`]: session persistence and escalation policy
//! - [`notify`]: SMTP digest delivery with inline images
//! - [`config`]: TOML configuration for sites, thresholds and delivery

// Documentation lints - enforce complete documentation for publication
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
// Allow some patterns common in scientific code
#![allow(clippy::too_many_arguments)]

pub mod checks;
pub mod config;
pub mod incident;
pub mod loader;
pub mod notify;
pub mod render;
pub mod report;
pub mod series;
pub mod signal;
pub mod solar;
pub mod valley;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::checks::{
        geonica_battery, helios_battery, meteo_battery, CheckSession, SessionError,
    };
    pub use crate::config::{
        ConfigError, EmailConfig, QcConfig, ReportPaths, StationPaths, Thresholds,
    };
    pub use crate::incident::{CheckKind, Finding, IncidentLog, Severity};
    pub use crate::loader::{DataDirLoader, LoaderError, StationKind, StationLoader};
    #[cfg(feature = "smtp")]
    pub use crate::notify::SmtpNotifier;
    pub use crate::notify::{Digest, Notifier, NotifyError};
    pub use crate::render::{
        DiagnosticRenderer, NullRenderer, PlotRequest, RenderError, RenderedPlot, SvgPlotter,
    };
    pub use crate::report::{ReportError, Reporter};
    pub use crate::series::{Column, SeriesError, StationDay, TimeSeries};
    pub use crate::signal::{count_transitions, daily_irradiation};
    pub use crate::solar::{
        declination, equation_of_time, is_dst, shift_clock, solar_position, solar_positions,
        ClockShift, Location, SolarPosition,
    };
    pub use crate::valley::{detect_valleys, ValleyParams, ValleyScan};
}
