//! Bounded-value and bounded-variation checks.
//!
//! Each method grades one column against a caller-supplied envelope: static
//! bounds, percent change over a lag, peak-to-peak range inside a rolling
//! window, or sample-to-sample slope. Violation tests are phrased so a `NaN`
//! statistic counts as a failure rather than slipping through a comparison.

use chrono::NaiveDateTime;

use crate::incident::{CheckKind, Severity};
use crate::render::PlotRequest;
use crate::series::TimeSeries;

use super::{join_flagged, CheckSession};

impl CheckSession {
    /// Every kept value must lie inside `[minimum, maximum]`, bounds
    /// included. Gaps are the null check's business and are skipped here.
    pub fn check_range(&mut self, column: &str, minimum: f64, maximum: f64) {
        let Some(series) = self.series_or_flag(CheckKind::Range, column) else {
            return;
        };

        let flagged: Vec<(NaiveDateTime, f64)> = series
            .times
            .iter()
            .zip(&series.values)
            .filter(|(_, v)| !v.is_nan() && !(**v >= minimum && **v <= maximum))
            .map(|(t, v)| (*t, *v))
            .collect();
        if flagged.is_empty() {
            return;
        }

        let message = format!(
            "Column \"{}\" is not in range [{}, {}]",
            column, minimum, maximum
        );
        let request = self.column_chart(CheckKind::Range, column, series, flagged);
        self.fail(CheckKind::Range, Severity::Warning, message, Some(request));
    }

    /// Percent change over a lag of `window` samples must stay under
    /// `threshold_pct`. The leading lag is backfilled so the start of the
    /// day cannot fail by construction; an unfillable statistic still fails.
    pub fn check_pct_change(&mut self, column: &str, window: usize, threshold_pct: f64) {
        let Some(series) = self.series_or_flag(CheckKind::PctChange, column) else {
            return;
        };

        let stat = backfill(window_pct_change(&series.values, window));
        let flagged = flag_where(&series, &stat, threshold_pct);
        if flagged.is_empty() {
            return;
        }

        let message = format!(
            "Percent change [%] of column {} is not in window of {} samples and threshold {}%. List of values: {}",
            column,
            window,
            threshold_pct,
            join_flagged(&flagged)
        );
        let request = self.column_chart(CheckKind::PctChange, column, series, flagged);
        self.fail(CheckKind::PctChange, Severity::Warning, message, Some(request));
    }

    /// Peak-to-peak spread inside a trailing window of `window` samples
    /// must stay under `threshold`. A window touching a gap yields no
    /// spread and is backfilled like the leading edge.
    pub fn check_abs_change(&mut self, column: &str, window: usize, threshold: f64) {
        let Some(series) = self.series_or_flag(CheckKind::AbsChange, column) else {
            return;
        };

        let stat = backfill(rolling_spread(&series.values, window));
        let flagged = flag_where(&series, &stat, threshold);
        if flagged.is_empty() {
            return;
        }

        let message = format!(
            "Absolute change of column {} is not in window of {} samples and threshold {}. List of values: {}",
            column,
            window,
            threshold,
            join_flagged(&flagged)
        );
        let request = self.column_chart(CheckKind::AbsChange, column, series, flagged);
        self.fail(CheckKind::AbsChange, Severity::Warning, message, Some(request));
    }

    /// Sample-to-sample change must stay under `threshold` in magnitude.
    /// The first sample borrows the second's difference so it cannot fail
    /// on its own.
    pub fn check_differential(&mut self, column: &str, threshold: f64) {
        let Some(series) = self.series_or_flag(CheckKind::Differential, column) else {
            return;
        };
        if series.len() < 2 {
            return;
        }

        let mut stat: Vec<f64> = series.diffs().iter().map(|d| d.abs()).collect();
        stat[0] = stat[1];
        let flagged = flag_where(&series, &stat, threshold);
        if flagged.is_empty() {
            return;
        }

        let message = format!(
            "Differential change of column {} larger than threshold {}. List of values: {}",
            column,
            threshold,
            join_flagged(&flagged)
        );
        let request = self.column_chart(CheckKind::Differential, column, series, flagged);
        self.fail(
            CheckKind::Differential,
            Severity::Warning,
            message,
            Some(request),
        );
    }

    /// Chart request for a single-column check: the raw trace with the
    /// objected samples highlighted.
    fn column_chart(
        &self,
        check: CheckKind,
        column: &str,
        series: TimeSeries,
        flagged: Vec<(NaiveDateTime, f64)>,
    ) -> PlotRequest {
        let title = format!("{}:{}", check.as_str(), column);
        PlotRequest::new(title, &self.label, series, flagged)
    }
}

/// Samples whose statistic escapes the threshold, reported with the raw
/// value at that instant. A `NaN` statistic never satisfies `< threshold`
/// and is flagged.
fn flag_where(series: &TimeSeries, stat: &[f64], threshold: f64) -> Vec<(NaiveDateTime, f64)> {
    series
        .times
        .iter()
        .zip(&series.values)
        .zip(stat)
        .filter(|(_, s)| !(**s < threshold))
        .map(|((t, v), _)| (*t, *v))
        .collect()
}

/// Absolute percent change against the value `window` samples back. The
/// leading `window` entries have no reference and come out `NaN`.
fn window_pct_change(values: &[f64], window: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            if i < window {
                f64::NAN
            } else {
                ((values[i] - values[i - window]) / values[i - window]).abs() * 100.0
            }
        })
        .collect()
}

/// `max - min` over the trailing window ending at each sample. Windows that
/// are short or touch a `NaN` come out `NaN`.
fn rolling_spread(values: &[f64], window: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return f64::NAN;
            }
            let slice = &values[i + 1 - window..=i];
            if slice.iter().any(|v| v.is_nan()) {
                return f64::NAN;
            }
            let mut lo = f64::INFINITY;
            let mut hi = f64::NEG_INFINITY;
            for v in slice {
                lo = lo.min(*v);
                hi = hi.max(*v);
            }
            hi - lo
        })
        .collect()
}

/// Fill each `NaN` with the next valid value. Trailing `NaN`s have no next
/// value and survive, which downstream comparisons treat as failures.
fn backfill(mut values: Vec<f64>) -> Vec<f64> {
    let mut next = f64::NAN;
    for v in values.iter_mut().rev() {
        if v.is_nan() {
            *v = next;
        } else {
            next = *v;
        }
    }
    values
}
