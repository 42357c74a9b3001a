//! # TOML Configuration
//!
//! All tunables of the check engine live in one TOML file:
//!
//! ```toml
//! # meteoqc.toml
//! [location]
//! latitude = 40.45
//! longitude = -3.73
//! utc_offset = 1.0
//!
//! [thresholds]
//! step_threshold = 10.0
//! cloud_transitions_max = 10
//!
//! [stations]
//! helios_dir = "/data/helios"
//! geonica_dir = "/data/geonica"
//! meteo_dir = "/data/meteo"
//!
//! [email]
//! enabled = true
//! min_severity = "WARNING"
//! recipients = ["ops@example.com"]
//! ```
//!
//! Every section and every field is optional; omissions fall back to the
//! defaults below, which match the thresholds the checks were tuned with.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::incident::Severity;
use crate::loader::DataDirLoader;
use crate::solar::Location;
use crate::valley::ValleyParams;

/// Errors raised while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Offending path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema
    #[error("failed to parse TOML configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Root configuration structure for meteoqc.toml files.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct QcConfig {
    /// Geographic location the solar geometry is computed for.
    pub location: Location,
    /// Check thresholds.
    pub thresholds: Thresholds,
    /// Station data directories.
    pub stations: StationPaths,
    /// Report file locations.
    pub report: ReportPaths,
    /// Digest delivery.
    pub email: EmailConfig,
}

/// Numeric limits of the check battery.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Irradiance step (W/m² per sample) that counts as a cloud transition
    pub step_threshold: f64,
    /// Transition count at which coherence checks stand down to INFO
    pub cloud_transitions_max: usize,
    /// Direct-irradiance floor (W/m²) for cross-source comparisons
    pub dni_floor: f64,
    /// Global-irradiance floor (W/m²) for the closure check
    pub ghi_floor: f64,
    /// Daily energy (kWh/m²) below which cross-source totals are not compared
    pub irradiation_floor_kwh: f64,
    /// Accepted misalignment-valley lengths, in samples
    pub valley_lengths: Vec<usize>,
    /// Lower bound of the valley retained-energy band
    pub valley_depth_min: f64,
    /// Upper bound of the valley retained-energy band
    pub valley_depth_max: f64,
    /// Valley count at which the tracker is considered misaligned
    pub valleys_max: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            step_threshold: 10.0,
            cloud_transitions_max: 10,
            dni_floor: 700.0,
            ghi_floor: 300.0,
            irradiation_floor_kwh: 1.0,
            valley_lengths: vec![6, 7, 8],
            valley_depth_min: 0.80,
            valley_depth_max: 0.95,
            valleys_max: 5,
        }
    }
}

impl Thresholds {
    /// Valley-scan parameters derived from these thresholds.
    pub fn valley_params(&self) -> ValleyParams {
        ValleyParams {
            step_threshold: self.step_threshold,
            valid_lengths: self.valley_lengths.clone(),
            depth_min: self.valley_depth_min,
            depth_max: self.valley_depth_max,
        }
    }
}

/// Data directories of the three stations.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StationPaths {
    /// Root of helios day files
    pub helios_dir: PathBuf,
    /// Root of geonica day files
    pub geonica_dir: PathBuf,
    /// Root of meteo day files
    pub meteo_dir: PathBuf,
}

impl Default for StationPaths {
    fn default() -> Self {
        Self {
            helios_dir: PathBuf::from("data/helios"),
            geonica_dir: PathBuf::from("data/geonica"),
            meteo_dir: PathBuf::from("data/meteo"),
        }
    }
}

impl StationPaths {
    /// Build a file loader over these directories.
    pub fn loader(&self) -> DataDirLoader {
        DataDirLoader::new(&self.helios_dir, &self.geonica_dir, &self.meteo_dir)
    }
}

/// Where session and history reports are written.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportPaths {
    /// Directory holding all report files
    pub dir: PathBuf,
    /// Session TSV, overwritten every run
    pub session_file: String,
    /// History TSV, appended every run
    pub history_file: String,
    /// HTML rendering of the last session
    pub html_file: String,
}

impl Default for ReportPaths {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("reports"),
            session_file: "meteoqc_session.log".to_string(),
            history_file: "meteoqc_history.log".to_string(),
            html_file: "meteoqc_log.html".to_string(),
        }
    }
}

impl ReportPaths {
    /// Full path of the session TSV.
    pub fn session_path(&self) -> PathBuf {
        self.dir.join(&self.session_file)
    }

    /// Full path of the history TSV.
    pub fn history_path(&self) -> PathBuf {
        self.dir.join(&self.history_file)
    }

    /// Full path of the HTML report.
    pub fn html_path(&self) -> PathBuf {
        self.dir.join(&self.html_file)
    }
}

/// SMTP digest delivery settings.
///
/// Delivery is off by default; with `enabled = true` the digest goes out
/// whenever a session records a finding at `min_severity` or above.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// Master switch for digest delivery
    pub enabled: bool,
    /// Lowest severity that triggers a digest
    pub min_severity: Severity,
    /// Recipient addresses
    pub recipients: Vec<String>,
    /// Sender address
    pub sender: String,
    /// SMTP relay host
    pub smtp_server: String,
    /// SMTP relay port (STARTTLS)
    pub smtp_port: u16,
    /// Relay login
    pub username: String,
    /// Relay password
    pub password: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_severity: Severity::Warning,
            recipients: Vec::new(),
            sender: String::new(),
            smtp_server: String::new(),
            smtp_port: 587,
            username: String::new(),
            password: String::new(),
        }
    }
}

impl QcConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}
