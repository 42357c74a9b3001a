//! # Incident Log
//!
//! Graded findings accumulated over one checking session. Checks append
//! [`Finding`]s as they fail; the log answers severity queries (did anything
//! reach the notification bar, is everything informational) and renders the
//! end-of-session report. Persistence and delivery live in
//! [`crate::report`].
//!
//! The log is owned by the session that fills it. Nothing here is global.

use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::Deserialize;

#[cfg(feature = "colorized_output")]
use console::style;

use crate::render::RenderedPlot;

/// Severity grade of a finding, strictly ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Lifecycle notices and suppressed checks
    Info,
    /// A check failed on plausible data
    Warning,
    /// A check failed in a way that taints the day
    Error,
    /// The session could not be set up at all
    Critical,
}

impl Severity {
    /// Upper-case label used in logs and serialized reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which check produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    /// Row count and column dtypes
    Format,
    /// Uniqueness, monotonicity and parseability of the timestamp axis
    TimeIndex,
    /// Gaps in one column
    Null,
    /// Values outside fixed physical bounds
    Range,
    /// Relative step over a sample window
    PctChange,
    /// Peak-to-peak amplitude over a rolling window
    AbsChange,
    /// Sample-to-sample step
    Differential,
    /// Tracker misalignment valley pattern
    Misalignment,
    /// Global vs diffuse-plus-direct closure
    CoherenceRadiation,
    /// Direct vs isotype-weighted reference
    CoherenceIsotypes,
    /// Same channel from a second station
    RadiationOtherSource,
    /// Daily energy ceiling
    TotalIrradiation,
    /// Daily energy vs a second station
    TotalIrradiationOtherSource,
    /// Cloud-transition counts vs a second station
    TransitionsOtherSource,
}

impl CheckKind {
    /// Stable snake-case label used in serialized reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckKind::Format => "format",
            CheckKind::TimeIndex => "time_index",
            CheckKind::Null => "null",
            CheckKind::Range => "range",
            CheckKind::PctChange => "pct_change",
            CheckKind::AbsChange => "abs_change",
            CheckKind::Differential => "differential",
            CheckKind::Misalignment => "misalignment",
            CheckKind::CoherenceRadiation => "coherence_radiation",
            CheckKind::CoherenceIsotypes => "coherence_isotypes",
            CheckKind::RadiationOtherSource => "radiation_other_source",
            CheckKind::TotalIrradiation => "total_irradiation",
            CheckKind::TotalIrradiationOtherSource => "total_irradiation_other_source",
            CheckKind::TransitionsOtherSource => "transitions_other_source",
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One graded quality finding.
#[derive(Debug, Clone)]
pub struct Finding {
    /// Wall-clock instant the finding was recorded
    pub at: NaiveDateTime,
    /// Severity grade
    pub severity: Severity,
    /// Station label, absent on session lifecycle notices
    pub station: Option<String>,
    /// Check that produced the finding, absent on lifecycle notices
    pub check: Option<CheckKind>,
    /// Human-readable description
    pub message: String,
    /// Path of the analyzed file, when one was opened
    pub source: Option<PathBuf>,
    /// Diagnostic chart, when the check rendered one
    pub plot: Option<RenderedPlot>,
}

impl Finding {
    /// Create a finding stamped with the current wall clock.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            at: chrono::Local::now().naive_local(),
            severity,
            station: None,
            check: None,
            message: message.into(),
            source: None,
            plot: None,
        }
    }

    /// Attach the station label.
    pub fn with_station(mut self, station: impl Into<String>) -> Self {
        self.station = Some(station.into());
        self
    }

    /// Attach the originating check.
    pub fn with_check(mut self, check: CheckKind) -> Self {
        self.check = Some(check);
        self
    }

    /// Attach the analyzed file path.
    pub fn with_source(mut self, source: Option<PathBuf>) -> Self {
        self.source = source;
        self
    }

    /// Attach a diagnostic chart.
    pub fn with_plot(mut self, plot: Option<RenderedPlot>) -> Self {
        self.plot = plot;
        self
    }

    /// Detection stamp with a single decimal of seconds.
    pub fn stamp(&self) -> String {
        format!(
            "{}.{}",
            self.at.format("%Y-%m-%d %H:%M:%S"),
            chrono::Timelike::nanosecond(&self.at) / 100_000_000
        )
    }

    /// The seven serialized fields, in report column order.
    pub fn tsv_record(&self) -> [String; 7] {
        [
            self.stamp(),
            self.severity.as_str().to_string(),
            self.station.clone().unwrap_or_default(),
            self.check.map(|c| c.as_str().to_string()).unwrap_or_default(),
            self.message.clone(),
            self.source
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            self.plot
                .as_ref()
                .map(|p| p.mime.clone())
                .unwrap_or_default(),
        ]
    }
}

/// Append-only log of the findings of one session.
#[derive(Debug, Clone, Default)]
pub struct IncidentLog {
    entries: Vec<Finding>,
}

impl IncidentLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finding and echo it to the process log.
    pub fn push(&mut self, finding: Finding) {
        let check = finding.check.map(|c| c.as_str()).unwrap_or("-");
        let station = finding.station.as_deref().unwrap_or("-");
        match finding.severity {
            Severity::Info => log::info!("[{}] [{}] {}", station, check, finding.message),
            Severity::Warning => log::warn!("[{}] [{}] {}", station, check, finding.message),
            Severity::Error | Severity::Critical => {
                log::error!("[{}] [{}] {}", station, check, finding.message)
            }
        }
        self.entries.push(finding);
    }

    /// All findings, in detection order.
    pub fn entries(&self) -> &[Finding] {
        &self.entries
    }

    /// Number of findings
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no findings were recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest severity recorded, `None` on an empty log.
    pub fn max_severity(&self) -> Option<Severity> {
        self.entries.iter().map(|e| e.severity).max()
    }

    /// True when any finding reaches `floor`.
    pub fn any_at_or_above(&self, floor: Severity) -> bool {
        self.entries.iter().any(|e| e.severity >= floor)
    }

    /// True when every finding is informational (vacuously true when empty).
    pub fn all_informational(&self) -> bool {
        self.entries.iter().all(|e| e.severity == Severity::Info)
    }

    /// Count of findings at one severity
    pub fn count_at(&self, severity: Severity) -> usize {
        self.entries.iter().filter(|e| e.severity == severity).count()
    }

    /// Drop all findings.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Render the log as an HTML table, one row per finding.
    pub fn to_html(&self) -> String {
        let mut out = String::from(
            "<table border=\"1\" class=\"incident-log\">\n<thead><tr>\
             <th>time_stamp</th><th>severity</th><th>station</th><th>check</th>\
             <th>message</th><th>file</th><th>plot</th></tr></thead>\n<tbody>\n",
        );
        for entry in &self.entries {
            out.push_str("<tr>");
            for field in entry.tsv_record() {
                out.push_str("<td>");
                out.push_str(&escape_html(&field));
                out.push_str("</td>");
            }
            out.push_str("</tr>\n");
        }
        out.push_str("</tbody>\n</table>");
        out
    }

    /// Format the report with colors (requires console feature)
    pub fn format_colored(&self) -> String {
        #[cfg(feature = "colorized_output")]
        {
            let mut output = String::new();
            output.push_str(&format!("{}\n", style("Quality Control Report").bold().cyan()));
            output.push_str(&format!("{}\n", style("======================").cyan()));

            for entry in &self.entries {
                let padded = format!("{:<8}", entry.severity.as_str());
                let level = match entry.severity {
                    Severity::Info => style(padded.as_str()).green(),
                    Severity::Warning => style(padded.as_str()).yellow(),
                    Severity::Error => style(padded.as_str()).red(),
                    Severity::Critical => style(padded.as_str()).red().bold(),
                };
                output.push_str(&format!(
                    "{}  {}  {:<10}  {:<30}  {}{}\n",
                    entry.stamp(),
                    level,
                    entry.station.as_deref().unwrap_or("-"),
                    entry.check.map(|c| c.as_str()).unwrap_or("-"),
                    entry.message,
                    if entry.plot.is_some() { " [plot]" } else { "" },
                ));
            }

            output.push('\n');
            output.push_str(&format!(
                "{}: {} info, {} warnings, {} errors, {} critical\n",
                style("Summary").bold(),
                style(self.count_at(Severity::Info)).green(),
                style(self.count_at(Severity::Warning)).yellow(),
                style(self.count_at(Severity::Error)).red(),
                style(self.count_at(Severity::Critical)).red()
            ));
            if self.all_informational() {
                output.push_str(&format!(
                    "{}\n",
                    style("No findings above INFO").green().bold()
                ));
            }
            output
        }

        #[cfg(not(feature = "colorized_output"))]
        {
            format!("{}", self)
        }
    }
}

impl fmt::Display for IncidentLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Quality Control Report")?;
        writeln!(f, "======================")?;

        for entry in &self.entries {
            writeln!(
                f,
                "{}  {:<8}  {:<10}  {:<30}  {}{}",
                entry.stamp(),
                entry.severity.as_str(),
                entry.station.as_deref().unwrap_or("-"),
                entry.check.map(|c| c.as_str()).unwrap_or("-"),
                entry.message,
                if entry.plot.is_some() { " [plot]" } else { "" },
            )?;
        }

        writeln!(f)?;
        writeln!(
            f,
            "Summary: {} info, {} warnings, {} errors, {} critical",
            self.count_at(Severity::Info),
            self.count_at(Severity::Warning),
            self.count_at(Severity::Error),
            self.count_at(Severity::Critical)
        )?;
        if self.all_informational() {
            writeln!(f, "No findings above INFO")?;
        }

        Ok(())
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_total_order() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
    }

    #[test]
    fn test_severity_parses_from_config_labels() {
        #[derive(Deserialize)]
        struct Probe {
            v: Severity,
        }
        let probe: Probe = toml::from_str("v = \"WARNING\"").unwrap();
        assert_eq!(probe.v, Severity::Warning);
        assert!(toml::from_str::<Probe>("v = \"warning\"").is_err());
    }

    #[test]
    fn test_max_severity_and_threshold_queries() {
        let mut log = IncidentLog::new();
        assert_eq!(log.max_severity(), None);
        assert!(log.all_informational());

        log.push(Finding::new(Severity::Info, "opening file"));
        log.push(
            Finding::new(Severity::Warning, "out of range").with_check(CheckKind::Range),
        );

        assert_eq!(log.max_severity(), Some(Severity::Warning));
        assert!(log.any_at_or_above(Severity::Warning));
        assert!(!log.any_at_or_above(Severity::Error));
        assert!(!log.all_informational());
    }

    #[test]
    fn test_tsv_record_fields() {
        let finding = Finding::new(Severity::Error, "index not monotonic")
            .with_station("helios")
            .with_check(CheckKind::TimeIndex)
            .with_source(Some(PathBuf::from("/data/data2024_06_01.txt")));
        let record = finding.tsv_record();
        assert_eq!(record[1], "ERROR");
        assert_eq!(record[2], "helios");
        assert_eq!(record[3], "time_index");
        assert_eq!(record[4], "index not monotonic");
        assert_eq!(record[5], "/data/data2024_06_01.txt");
        assert_eq!(record[6], "");
        // one decimal of seconds
        let fractional = record[0].rsplit('.').next().unwrap();
        assert_eq!(fractional.len(), 1);
    }

    #[test]
    fn test_display_flags_all_informational() {
        let mut log = IncidentLog::new();
        log.push(Finding::new(Severity::Info, "nothing to see"));
        let text = format!("{}", log);
        assert!(text.contains("No findings above INFO"));

        log.push(Finding::new(Severity::Warning, "hmm").with_check(CheckKind::Null));
        let text = format!("{}", log);
        assert!(!text.contains("No findings above INFO"));
        assert!(text.contains("1 warnings"));
    }

    #[test]
    fn test_html_escapes_messages() {
        let mut log = IncidentLog::new();
        log.push(Finding::new(Severity::Warning, "value < lower & bound"));
        let html = log.to_html();
        assert!(html.contains("value &lt; lower &amp; bound"));
        assert!(!html.contains("value < lower"));
    }
}
