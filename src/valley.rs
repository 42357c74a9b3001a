//! # Tracker Misalignment Valleys
//!
//! A mis-pointed two-axis tracker drags a shallow, symmetric dip through an
//! otherwise smooth direct-irradiance trace every time the controller steps
//! past the sun and corrects back. This module scans a day for such dips:
//! short dip-and-recover runs whose retained energy sits in a narrow band
//! below the flat-top ideal and whose two rims end at nearly the same level.
//!
//! Deep ragged cloud valleys fail the depth band, and genuine irradiance
//! ramps fail the closure test, so the scan stays quiet on ordinary days.

use chrono::NaiveDateTime;

use crate::series::TimeSeries;

/// Shape limits for a run to count as a misalignment valley.
#[derive(Debug, Clone)]
pub struct ValleyParams {
    /// Minimum per-sample step (W/m²) for a slope to count as steep
    pub step_threshold: f64,
    /// Accepted run lengths, closing sample included
    pub valid_lengths: Vec<usize>,
    /// Lower bound (exclusive) on retained-energy fraction
    pub depth_min: f64,
    /// Upper bound (exclusive) on retained-energy fraction
    pub depth_max: f64,
}

impl Default for ValleyParams {
    fn default() -> Self {
        Self {
            step_threshold: 10.0,
            valid_lengths: vec![6, 7, 8],
            depth_min: 0.80,
            depth_max: 0.95,
        }
    }
}

/// Outcome of a valley scan over one series.
#[derive(Debug, Clone, Default)]
pub struct ValleyScan {
    /// Number of runs that matched the valley shape
    pub count: usize,
    /// Every instant inside a matched run, in scan order
    pub instants: Vec<NaiveDateTime>,
}

/// Scan a series for misalignment valleys.
///
/// Each sample is judged by its step toward the *next* sample (the final
/// sample reuses its neighbour's step). A run opens on a steep negative
/// step, grows while the slope stays steep in either direction, and closes
/// on the first flat sample, which joins the run. A closed run is a valley
/// when its length is in `valid_lengths`, its summed values divided by
/// `first-rim value x length` fall strictly inside the depth band, and its
/// rims differ by less than three step thresholds. A run still open when
/// the series ends is discarded.
pub fn detect_valleys(series: &TimeSeries, params: &ValleyParams) -> ValleyScan {
    let n = series.len();
    if n < 2 {
        return ValleyScan::default();
    }

    // look-ahead steps: deltas[i] = v[i+1] - v[i], last one reused
    let mut deltas = Vec::with_capacity(n);
    for i in 0..n - 1 {
        deltas.push(series.values[i + 1] - series.values[i]);
    }
    deltas.push(deltas[n - 2]);

    let mut in_valley = false;
    let mut run: Vec<usize> = Vec::new();
    let mut scan = ValleyScan::default();

    for i in 0..n {
        if deltas[i].abs() <= params.step_threshold {
            // flat zone
            in_valley = false;
        } else if !in_valley {
            if deltas[i] <= -params.step_threshold {
                in_valley = true;
                run.push(i);
            }
        } else {
            run.push(i);
        }

        if !in_valley && !run.is_empty() {
            // the flat sample that ended the run joins it
            run.push(i);

            let actual: f64 = run.iter().map(|&j| series.values[j]).sum();
            let ideal = series.values[run[0]] * run.len() as f64;
            let depth = actual / ideal;
            let rim_gap = (series.values[run[0]] - series.values[run[run.len() - 1]]).abs();
            let closed = rim_gap < 3.0 * params.step_threshold;

            if params.valid_lengths.contains(&run.len())
                && depth > params.depth_min
                && depth < params.depth_max
                && closed
            {
                scan.instants.extend(run.iter().map(|&j| series.times[j]));
                scan.count += 1;
            }
            run.clear();
        }
    }

    scan
}
