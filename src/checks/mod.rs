//! # Quality Check Engine
//!
//! One [`CheckSession`] per station-day. Construction loads the day through
//! the station loader (or takes a prepared [`StationDay`]), establishes the
//! sampling rate and seeds the incident log with the session notices; the
//! check methods then run in caller order, each appending at most one graded
//! finding per failed condition. A failed check never aborts the session.
//! Fatal conditions exist only at construction, and even those flush the log
//! through the reporter before raising, so a broken morning still leaves a
//! readable report behind.
//!
//! The check families live in submodules: structure and timestamp axis,
//! bounded variation, and the radiation oracles with their cloud-transition
//! suppression rule. Station-specific sequences are in [`battery`] helpers
//! re-exported here.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chrono::NaiveDate;
//! use meteoqc::checks::CheckSession;
//! use meteoqc::config::QcConfig;
//! use meteoqc::loader::StationKind;
//! use meteoqc::render::SvgPlotter;
//! use meteoqc::report::Reporter;
//!
//! let config = QcConfig::default();
//! let loader = config.stations.loader();
//! let reporter = Reporter::new(config.report.clone());
//! let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
//!
//! let mut session = CheckSession::open(
//!     StationKind::Helios,
//!     date,
//!     &loader,
//!     &config,
//!     Box::new(SvgPlotter::default()),
//!     reporter,
//! )?;
//! session.check_format();
//! session.check_range("G(0)", 0.0, 1600.0);
//! let log = session.finish()?;
//! println!("{}", log);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};

use crate::config::{QcConfig, Thresholds};
use crate::incident::{CheckKind, Finding, IncidentLog, Severity};
use crate::loader::{LoaderError, StationKind, StationLoader};
use crate::render::{DiagnosticRenderer, PlotRequest, RenderedPlot};
use crate::report::{ReportError, Reporter};
use crate::series::{SeriesError, StationDay, TimeSeries};
use crate::solar::Location;

pub use battery::{geonica_battery, helios_battery, meteo_battery};

mod battery;
mod bounds;
mod radiation;
mod structural;

/// Errors that end a session before any check can run
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The station label was left blank
    #[error("station label is not set")]
    UnsetStation,

    /// The station file could not be located or parsed
    #[error("cannot open station data: {0}")]
    Load(#[from] LoaderError),

    /// The sampling rate could not be inferred from the loaded timestamps
    #[error("samples per hour cannot be inferred: {0}")]
    SamplingRate(#[from] SeriesError),

    /// Teardown could not persist the report
    #[error("failed to persist the session report: {0}")]
    Report(#[from] ReportError),
}

/// One station-day under examination.
pub struct CheckSession {
    label: String,
    date: NaiveDate,
    day: StationDay,
    samples_per_hour: u32,
    source: Option<PathBuf>,
    log: IncidentLog,
    thresholds: Thresholds,
    location: Location,
    renderer: Box<dyn DiagnosticRenderer>,
    reporter: Reporter,
}

impl CheckSession {
    /// Open a session for a supported station and date through the loader.
    ///
    /// A loader failure is logged CRITICAL and flushed before this returns
    /// the error; there is no session to salvage without data.
    pub fn open(
        kind: StationKind,
        date: NaiveDate,
        loader: &dyn StationLoader,
        config: &QcConfig,
        renderer: Box<dyn DiagnosticRenderer>,
        reporter: Reporter,
    ) -> Result<Self, SessionError> {
        let label = kind.as_str().to_string();
        let mut log = IncidentLog::new();
        log.push(
            Finding::new(
                Severity::Info,
                format!("Analyzing meteo data of type '{}' from {}", label, date),
            )
            .with_station(&label),
        );
        log.push(Finding::new(Severity::Info, "Opening file...").with_station(&label));

        let (day, path) = match loader.load(kind, date) {
            Ok(loaded) => loaded,
            Err(err) => {
                log.push(
                    Finding::new(Severity::Critical, err.to_string()).with_station(&label),
                );
                flush_after_fatal(&reporter, &mut log, date);
                return Err(SessionError::Load(err));
            }
        };

        Self::with_day(label, day, Some(path), config, renderer, reporter, log)
    }

    /// Session over a prepared day under a caller-chosen label.
    ///
    /// This is the road for loggers the file loader does not know: read the
    /// table yourself, then hand it in. A blank label is logged CRITICAL and
    /// refused.
    pub fn from_day(
        label: &str,
        day: StationDay,
        config: &QcConfig,
        renderer: Box<dyn DiagnosticRenderer>,
        reporter: Reporter,
    ) -> Result<Self, SessionError> {
        let mut log = IncidentLog::new();
        if label.trim().is_empty() {
            log.push(Finding::new(
                Severity::Critical,
                "Undefined type of meteo station",
            ));
            flush_after_fatal(&reporter, &mut log, day.date);
            return Err(SessionError::UnsetStation);
        }

        log.push(
            Finding::new(
                Severity::Info,
                format!("Analyzing meteo data of type '{}' from {}", label, day.date),
            )
            .with_station(label),
        );

        Self::with_day(label.to_string(), day, None, config, renderer, reporter, log)
    }

    fn with_day(
        label: String,
        day: StationDay,
        source: Option<PathBuf>,
        config: &QcConfig,
        renderer: Box<dyn DiagnosticRenderer>,
        reporter: Reporter,
        mut log: IncidentLog,
    ) -> Result<Self, SessionError> {
        let samples_per_hour = match day.sampling_rate() {
            Ok(rate) => rate,
            Err(err) => {
                log.push(
                    Finding::new(Severity::Critical, "Samples per hour cannot be inferred")
                        .with_station(&label)
                        .with_source(source.clone()),
                );
                flush_after_fatal(&reporter, &mut log, day.date);
                return Err(SessionError::SamplingRate(err));
            }
        };

        log::debug!(
            "session for '{}' on {}: {} rows at {} samples/hour",
            label,
            day.date,
            day.n_rows(),
            samples_per_hour
        );

        Ok(Self {
            label,
            date: day.date,
            day,
            samples_per_hour,
            source,
            log,
            thresholds: config.thresholds.clone(),
            location: config.location,
            renderer,
            reporter,
        })
    }

    /// Station label under analysis.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The analyzed date.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Sampling rate established at construction.
    pub fn samples_per_hour(&self) -> u32 {
        self.samples_per_hour
    }

    /// The loaded day.
    pub fn day(&self) -> &StationDay {
        &self.day
    }

    /// Findings so far, in detection order.
    pub fn log(&self) -> &IncidentLog {
        &self.log
    }

    /// Close the session: persist and (policy permitting) escalate the log,
    /// then hand the final snapshot back for display. The session's own log
    /// is cleared by the handoff.
    pub fn finish(mut self) -> Result<IncidentLog, SessionError> {
        self.reporter.finish(&mut self.log, Some(self.date))?;
        Ok(std::mem::take(&mut self.log))
    }

    /// Record a failed condition, rendering its chart when one was requested.
    fn fail(
        &mut self,
        check: CheckKind,
        severity: Severity,
        message: String,
        request: Option<PlotRequest>,
    ) {
        let plot = request.and_then(|r| self.render_or_warn(&r));
        self.log.push(
            Finding::new(severity, message)
                .with_station(&self.label)
                .with_check(check)
                .with_source(self.source.clone())
                .with_plot(plot),
        );
    }

    /// A chart that fails to draw costs a log line, never the finding.
    fn render_or_warn(&self, request: &PlotRequest) -> Option<RenderedPlot> {
        match self.renderer.render(request) {
            Ok(plot) => plot,
            Err(err) => {
                log::warn!("diagnostic chart '{}' failed: {}", request.title, err);
                None
            }
        }
    }

    /// Fetch a column as a series, or flag its absence as an ERROR finding.
    fn series_or_flag(&mut self, check: CheckKind, name: &str) -> Option<TimeSeries> {
        match self.day.series(name) {
            Some(series) => Some(series),
            None => {
                let message = format!(
                    "Column \"{}\" not found in {} data",
                    name, self.label
                );
                self.fail(check, Severity::Error, message, None);
                None
            }
        }
    }
}

fn flush_after_fatal(reporter: &Reporter, log: &mut IncidentLog, date: NaiveDate) {
    if let Err(err) = reporter.finish(log, Some(date)) {
        log::error!("failed to flush the session report after a fatal error: {}", err);
    }
}

/// Instants joined for a message, truncated past ten entries.
pub(crate) fn join_times(times: &[NaiveDateTime]) -> String {
    const SHOWN: usize = 10;
    let mut parts: Vec<String> = times
        .iter()
        .take(SHOWN)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .collect();
    if times.len() > SHOWN {
        parts.push(format!("... ({} total)", times.len()));
    }
    parts.join(", ")
}

/// Flagged samples joined for a message, `instant value` pairs.
pub(crate) fn join_flagged(flagged: &[(NaiveDateTime, f64)]) -> String {
    const SHOWN: usize = 10;
    let mut parts: Vec<String> = flagged
        .iter()
        .take(SHOWN)
        .map(|(t, v)| format!("{} {:.1}", t.format("%Y-%m-%d %H:%M:%S"), v))
        .collect();
    if flagged.len() > SHOWN {
        parts.push(format!("... ({} total)", flagged.len()));
    }
    parts.join(" - ")
}


#[cfg(test)]
mod tests {
    use super::testkit::{day_with, session_over};
    use super::*;
    use crate::config::ReportPaths;
    use crate::render::NullRenderer;
    use crate::series::Column;

    #[test]
    fn test_blank_label_is_fatal_and_flushed() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = Reporter::new(ReportPaths {
            dir: dir.path().to_path_buf(),
            ..ReportPaths::default()
        });
        let day = day_with("G(0)", vec![500.0; 10]);
        let config = QcConfig::default();

        let result =
            CheckSession::from_day("  ", day, &config, Box::new(NullRenderer), reporter);
        assert!(matches!(result, Err(SessionError::UnsetStation)));

        // the fatal path flushed the log before raising
        let session_log =
            std::fs::read_to_string(dir.path().join("meteoqc_session.log")).unwrap();
        assert!(session_log.contains("CRITICAL"));
        assert!(session_log.contains("Undefined type of meteo station"));
    }

    #[test]
    fn test_unknown_sampling_rate_is_fatal_and_flushed() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = Reporter::new(ReportPaths {
            dir: dir.path().to_path_buf(),
            ..ReportPaths::default()
        });

        // a single row cannot yield a rate
        let mut day = StationDay::new("oddball", chrono::NaiveDate::from_ymd_opt(2024, 6, 21).unwrap());
        day.times = super::testkit::minute_axis(1);
        day.columns.push(Column::new("G(0)", vec![500.0]));
        let config = QcConfig::default();

        let result =
            CheckSession::from_day("oddball", day, &config, Box::new(NullRenderer), reporter);
        assert!(matches!(result, Err(SessionError::SamplingRate(_))));

        let session_log =
            std::fs::read_to_string(dir.path().join("meteoqc_session.log")).unwrap();
        assert!(session_log.contains("Samples per hour cannot be inferred"));
    }

    #[test]
    fn test_session_establishes_sampling_rate() {
        let day = day_with("G(0)", vec![500.0; 30]);
        let config = QcConfig::default();
        let (session, _dir) = session_over(day, &config);
        assert_eq!(session.samples_per_hour(), 60);
        assert_eq!(session.label(), "testbench");
        // construction left only the opening notice
        assert!(session.log().all_informational());
    }

    #[test]
    fn test_finish_returns_snapshot_and_persists() {
        let day = day_with("G(0)", vec![500.0; 30]);
        let config = QcConfig::default();
        let (mut session, dir) = session_over(day, &config);
        session.check_range("G(0)", 0.0, 100.0);

        let log = session.finish().unwrap();
        assert!(log.any_at_or_above(crate::incident::Severity::Warning));
        assert!(log
            .entries()
            .iter()
            .any(|f| f.message == "Finishing logging session"));
        assert!(dir.path().join("meteoqc_session.log").exists());
        assert!(dir.path().join("meteoqc_history.log").exists());
        assert!(dir.path().join("meteoqc_log.html").exists());
    }

    #[test]
    fn test_missing_column_is_one_error_finding() {
        let day = day_with("G(0)", vec![500.0; 30]);
        let config = QcConfig::default();
        let (mut session, _dir) = session_over(day, &config);

        session.check_null("Nope");
        let findings: Vec<_> = session
            .log()
            .entries()
            .iter()
            .filter(|f| f.check == Some(CheckKind::Null))
            .collect();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Error);
        assert!(findings[0].message.contains("\"Nope\" not found"));
    }
}
