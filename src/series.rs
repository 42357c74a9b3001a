//! # Time Series Data Model
//!
//! Core data carriers for one station-day of measurements: a named
//! [`TimeSeries`] (timestamp axis plus values), a raw [`Column`] as parsed
//! from a station file, and the [`StationDay`] table that the check engine
//! operates on.
//!
//! All timestamps are naive civil time in the station's local zone; the
//! solar module handles the shift to UTC where geometry needs it.

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;

/// Errors raised by time-axis queries
#[derive(Debug, thiserror::Error)]
pub enum SeriesError {
    /// Too few timestamps to measure a sample spacing
    #[error("cannot infer sampling rate from {0} timestamp(s)")]
    TooFewTimestamps(usize),

    /// Median gap is non-positive or does not divide one hour evenly
    #[error("median sample spacing of {0} s does not divide one hour")]
    IrregularSpacing(i64),
}

/// A named series of measurements on a shared timestamp axis.
///
/// `times` and `values` always have the same length. Gaps in the source data
/// appear as `NaN` values, not as missing rows.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    /// Channel name, e.g. `"G(0)"` or `"B"`
    pub name: String,
    /// Sample instants in station-local civil time
    pub times: Vec<NaiveDateTime>,
    /// Measured values, `NaN` where the source row was empty
    pub values: Vec<f64>,
}

impl TimeSeries {
    /// Create a series from parallel timestamp and value vectors.
    ///
    /// The two vectors must have the same length.
    pub fn new(name: impl Into<String>, times: Vec<NaiveDateTime>, values: Vec<f64>) -> Self {
        debug_assert_eq!(times.len(), values.len());
        Self {
            name: name.into(),
            times,
            values,
        }
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the series holds no samples
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keep only the samples whose value is strictly above `threshold`.
    ///
    /// `NaN` samples never compare above anything and are dropped.
    pub fn filter_above(&self, threshold: f64) -> TimeSeries {
        let mut times = Vec::new();
        let mut values = Vec::new();
        for (t, v) in self.times.iter().zip(&self.values) {
            if *v > threshold {
                times.push(*t);
                values.push(*v);
            }
        }
        TimeSeries {
            name: self.name.clone(),
            times,
            values,
        }
    }

    /// Inner-join two series on their timestamps.
    ///
    /// Returns `(self, other)` restricted to the instants present in both,
    /// in this series' order. When `other` carries a duplicated instant its
    /// last occurrence wins.
    pub fn align_inner(&self, other: &TimeSeries) -> (TimeSeries, TimeSeries) {
        let lookup: HashMap<NaiveDateTime, f64> = other
            .times
            .iter()
            .copied()
            .zip(other.values.iter().copied())
            .collect();

        let mut times = Vec::new();
        let mut left = Vec::new();
        let mut right = Vec::new();
        for (t, v) in self.times.iter().zip(&self.values) {
            if let Some(w) = lookup.get(t) {
                times.push(*t);
                left.push(*v);
                right.push(*w);
            }
        }

        (
            TimeSeries {
                name: self.name.clone(),
                times: times.clone(),
                values: left,
            },
            TimeSeries {
                name: other.name.clone(),
                times,
                values: right,
            },
        )
    }

    /// First differences, same length as the series.
    ///
    /// `d[0]` is `NaN`; `d[i] = v[i] - v[i-1]` for the rest.
    pub fn diffs(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.values.len());
        for (i, v) in self.values.iter().enumerate() {
            if i == 0 {
                out.push(f64::NAN);
            } else {
                out.push(v - self.values[i - 1]);
            }
        }
        out
    }

}

/// One column of a station file, as parsed.
///
/// A column stays `numeric` when every non-empty cell parsed as a float;
/// empty cells become `NaN` without affecting the flag. A single cell of
/// stray text clears the flag (that cell also becomes `NaN`).
#[derive(Debug, Clone)]
pub struct Column {
    /// Header name from the station file
    pub name: String,
    /// Parsed values, one per kept row
    pub values: Vec<f64>,
    /// False when any cell failed to parse as a float
    pub numeric: bool,
}

impl Column {
    /// Create a fully numeric column.
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
            numeric: true,
        }
    }

    /// Count of `NaN` cells
    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_nan()).count()
    }
}

/// One day of measurements from one station.
///
/// Rows whose timestamp cell could not be parsed are dropped from the table
/// and their raw text is kept in `unparsed_instants` so the time-index check
/// can report them.
#[derive(Debug, Clone)]
pub struct StationDay {
    /// Station label, e.g. `"helios"`
    pub station: String,
    /// Civil date the file covers
    pub date: NaiveDate,
    /// Timestamp axis shared by all columns
    pub times: Vec<NaiveDateTime>,
    /// Measurement columns, all the same length as `times`
    pub columns: Vec<Column>,
    /// Raw text of timestamp cells that failed to parse
    pub unparsed_instants: Vec<String>,
}

impl StationDay {
    /// Create an empty day for the given station and date.
    pub fn new(station: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            station: station.into(),
            date,
            times: Vec::new(),
            columns: Vec::new(),
            unparsed_instants: Vec::new(),
        }
    }

    /// Number of kept rows
    pub fn n_rows(&self) -> usize {
        self.times.len()
    }

    /// Names of all measurement columns, in file order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Extract one column as a [`TimeSeries`] on the day's timestamp axis.
    pub fn series(&self, name: &str) -> Option<TimeSeries> {
        self.column(name).map(|c| TimeSeries {
            name: c.name.clone(),
            times: self.times.clone(),
            values: c.values.clone(),
        })
    }

    /// True when timestamps are strictly increasing (implies no duplicates).
    pub fn is_strictly_increasing(&self) -> bool {
        self.times.windows(2).all(|w| w[0] < w[1])
    }

    /// Instants that appear more than once, each reported once.
    pub fn duplicated_times(&self) -> Vec<NaiveDateTime> {
        let mut seen: HashMap<NaiveDateTime, u32> = HashMap::new();
        for t in &self.times {
            *seen.entry(*t).or_insert(0) += 1;
        }
        let mut dups: Vec<NaiveDateTime> =
            seen.into_iter().filter(|(_, n)| *n > 1).map(|(t, _)| t).collect();
        dups.sort_unstable();
        dups
    }

    /// Samples per hour, inferred from the median gap between timestamps.
    ///
    /// Fails when fewer than two timestamps are present, or when the median
    /// gap is non-positive or does not divide 3600 s evenly. The
    /// divisibility rule keeps the expected-row-count arithmetic exact and
    /// rejects grossly irregular axes.
    pub fn sampling_rate(&self) -> Result<u32, SeriesError> {
        if self.times.len() < 2 {
            return Err(SeriesError::TooFewTimestamps(self.times.len()));
        }
        let mut gaps: Vec<i64> = self
            .times
            .windows(2)
            .map(|w| (w[1] - w[0]).num_seconds())
            .collect();
        gaps.sort_unstable();
        let median = gaps[gaps.len() / 2];
        if median <= 0 || 3600 % median != 0 {
            return Err(SeriesError::IrregularSpacing(median));
        }
        Ok((3600 / median) as u32)
    }

    /// Rows a complete day should hold at the given sampling rate.
    pub fn expected_rows(samples_per_hour: u32) -> usize {
        24 * samples_per_hour as usize
    }
}
