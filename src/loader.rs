//! # Station File Loading
//!
//! Resolves and parses the day files the measurement loggers drop on disk.
//! Every station writes one tab-delimited file per day; the three supported
//! loggers differ in filename prefix, archive layout for past years, and how
//! the timestamp is spelled (split date and time columns, or a single
//! timestamp column).
//!
//! Loading is behind the [`StationLoader`] trait so the engine can be fed
//! from a directory tree in production and from fixtures in tests.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::series::{Column, StationDay};

/// Accepted spellings of a split date plus time pair.
const SPLIT_FORMATS: &[&str] = &["%Y/%m/%d %H:%M:%S", "%Y/%m/%d %H:%M"];

/// Accepted spellings of a single timestamp column.
const SINGLE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

/// Errors that can occur while locating or parsing a station file
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TSV parsing error
    #[error("TSV error: {0}")]
    Tsv(#[from] csv::Error),

    /// A required column is absent from the file header
    #[error("column not found: {0}")]
    MissingColumn(String),

    /// Label does not name a supported station
    #[error("unsupported station label: {0}")]
    UnknownStation(String),
}

/// The supported measurement loggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StationKind {
    /// Fixed radiometric station, split timestamp, fixed channel subset
    Helios,
    /// Tracker-mounted station with isotype sensors, split timestamp
    Geonica,
    /// General weather mast, single timestamp column
    Meteo,
}

impl StationKind {
    /// All supported stations, in battery order.
    pub const ALL: [StationKind; 3] = [StationKind::Helios, StationKind::Geonica, StationKind::Meteo];

    /// Lower-case label used in logs, reports and the CLI.
    pub fn as_str(&self) -> &'static str {
        match self {
            StationKind::Helios => "helios",
            StationKind::Geonica => "geonica",
            StationKind::Meteo => "meteo",
        }
    }

    /// Filename prefix ahead of the `%Y_%m_%d` date part.
    fn file_prefix(&self) -> &'static str {
        match self {
            StationKind::Helios => "data",
            StationKind::Geonica => "geonica",
            StationKind::Meteo => "meteo",
        }
    }

    /// Subdirectory holding files of a past year.
    fn archive_subdir(&self, year: i32) -> String {
        match self {
            StationKind::Helios => format!("Data{}", year),
            StationKind::Geonica | StationKind::Meteo => year.to_string(),
        }
    }

    /// Day-file name for a date.
    pub fn file_name(&self, date: NaiveDate) -> String {
        format!("{}{}.txt", self.file_prefix(), date.format("%Y_%m_%d"))
    }

    /// Channels kept at load time, `None` keeps whatever the file carries.
    fn kept_columns(&self) -> Option<&'static [&'static str]> {
        match self {
            StationKind::Helios => {
                Some(&["G(0)", "G(41)", "D(0)", "B", "Wvel", "Wdir", "Tamb"])
            }
            StationKind::Geonica | StationKind::Meteo => None,
        }
    }

    /// True when the timestamp is spelled as separate date and time columns.
    fn split_timestamp(&self) -> bool {
        matches!(self, StationKind::Helios | StationKind::Geonica)
    }
}

impl fmt::Display for StationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StationKind {
    type Err = LoaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "helios" => Ok(StationKind::Helios),
            "geonica" => Ok(StationKind::Geonica),
            "meteo" => Ok(StationKind::Meteo),
            other => Err(LoaderError::UnknownStation(other.to_string())),
        }
    }
}

/// Source of station-days for the check engine.
pub trait StationLoader {
    /// Load one station-day, returning the parsed table and the file it came
    /// from.
    fn load(&self, kind: StationKind, date: NaiveDate)
        -> Result<(StationDay, PathBuf), LoaderError>;
}

/// Loader that resolves day files under one data directory per station.
#[derive(Debug, Clone)]
pub struct DataDirLoader {
    /// Root directory of helios day files
    pub helios_dir: PathBuf,
    /// Root directory of geonica day files
    pub geonica_dir: PathBuf,
    /// Root directory of meteo day files
    pub meteo_dir: PathBuf,
}

impl DataDirLoader {
    /// Create a loader over the three station roots.
    pub fn new(
        helios_dir: impl Into<PathBuf>,
        geonica_dir: impl Into<PathBuf>,
        meteo_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            helios_dir: helios_dir.into(),
            geonica_dir: geonica_dir.into(),
            meteo_dir: meteo_dir.into(),
        }
    }

    /// Path a station-day file is expected at.
    ///
    /// Files of the current year sit in the station root; past years live in
    /// an archive subdirectory.
    pub fn path_for(&self, kind: StationKind, date: NaiveDate) -> PathBuf {
        self.resolve(kind, date, chrono::Local::now().date_naive())
    }

    fn resolve(&self, kind: StationKind, date: NaiveDate, today: NaiveDate) -> PathBuf {
        let root = match kind {
            StationKind::Helios => &self.helios_dir,
            StationKind::Geonica => &self.geonica_dir,
            StationKind::Meteo => &self.meteo_dir,
        };
        let name = kind.file_name(date);
        if date.year() == today.year() {
            root.join(name)
        } else {
            root.join(kind.archive_subdir(date.year())).join(name)
        }
    }
}

impl StationLoader for DataDirLoader {
    fn load(
        &self,
        kind: StationKind,
        date: NaiveDate,
    ) -> Result<(StationDay, PathBuf), LoaderError> {
        let path = self.path_for(kind, date);
        let day = read_station_day(&path, kind, date)?;
        Ok((day, path))
    }
}

/// Parse one station-day file.
///
/// Rows with an unparseable timestamp are dropped and recorded in
/// [`StationDay::unparsed_instants`]. Empty cells become `NaN`; a cell of
/// stray text becomes `NaN` and clears the column's numeric flag.
pub fn read_station_day(
    path: &Path,
    kind: StationKind,
    date: NaiveDate,
) -> Result<StationDay, LoaderError> {
    let file = std::fs::File::open(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(file);

    let headers = reader.headers()?.clone();
    let header_names: Vec<String> = headers.iter().map(|h| h.trim().to_string()).collect();

    // timestamp column positions
    let (index_positions, formats): (Vec<usize>, &[&str]) = if kind.split_timestamp() {
        let date_pos = position_of(&header_names, "yyyy/mm/dd")?;
        let time_pos = position_of(&header_names, "hh:mm")?;
        (vec![date_pos, time_pos], SPLIT_FORMATS)
    } else {
        (vec![0], SINGLE_FORMATS)
    };

    // measurement columns: a fixed subset in its canonical order, or
    // everything but the timestamp in file order
    let value_positions: Vec<(usize, String)> = match kind.kept_columns() {
        Some(kept) => kept
            .iter()
            .map(|name| Ok((position_of(&header_names, name)?, name.to_string())))
            .collect::<Result<_, LoaderError>>()?,
        None => header_names
            .iter()
            .enumerate()
            .filter(|(i, _)| !index_positions.contains(i))
            .map(|(i, name)| (i, name.clone()))
            .collect(),
    };

    let mut day = StationDay::new(kind.as_str(), date);
    let mut columns: Vec<Column> = value_positions
        .iter()
        .map(|(_, name)| Column::new(name.clone(), Vec::new()))
        .collect();

    for result in reader.records() {
        let record = result?;
        let stamp_text = index_positions
            .iter()
            .map(|&i| record.get(i).unwrap_or("").trim())
            .collect::<Vec<_>>()
            .join(" ");

        let instant = formats
            .iter()
            .find_map(|f| NaiveDateTime::parse_from_str(stamp_text.trim(), f).ok());
        let instant = match instant {
            Some(t) => t,
            None => {
                day.unparsed_instants.push(stamp_text.trim().to_string());
                continue;
            }
        };

        day.times.push(instant);
        for (column, (pos, _)) in columns.iter_mut().zip(&value_positions) {
            let cell = record.get(*pos).unwrap_or("").trim();
            if cell.is_empty() {
                column.values.push(f64::NAN);
            } else {
                match cell.parse::<f64>() {
                    Ok(v) => column.values.push(v),
                    Err(_) => {
                        column.values.push(f64::NAN);
                        column.numeric = false;
                    }
                }
            }
        }
    }

    day.columns = columns;
    Ok(day)
}

fn position_of(headers: &[String], name: &str) -> Result<usize, LoaderError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| LoaderError::MissingColumn(name.to_string()))
}
