//! # Irradiance Signal Shape
//!
//! Scalar descriptors of one day's irradiance trace: how often the signal
//! jumps (passing clouds) and how much energy it integrates to. Both are
//! pure functions over a value slice; the caller picks and filters the
//! series.

/// Count samples whose step from the previous sample exceeds `step_threshold`
/// in magnitude.
///
/// The first sample has no predecessor and reuses the following step, so a
/// series that opens with a sharp edge counts it twice. Fewer than two
/// samples count zero transitions. A clear-sky day stays near zero while a
/// broken-cloud day racks up tens of transitions, which is what the
/// suppression rule keys on.
pub fn count_transitions(values: &[f64], step_threshold: f64) -> usize {
    if values.len() < 2 {
        return 0;
    }

    let mut deltas: Vec<f64> = Vec::with_capacity(values.len());
    // first step stands in for the missing one
    deltas.push(values[1] - values[0]);
    for i in 1..values.len() {
        deltas.push(values[i] - values[i - 1]);
    }

    deltas.iter().filter(|d| d.abs() > step_threshold).count()
}

/// Integrate a day of irradiance samples into kWh/m².
///
/// Trapezoidal rule with a sample spacing of `1 / samples_per_hour` hours;
/// input is W/m². Fewer than two samples integrate to zero. `NaN` samples
/// poison the result, so filter the series first when gaps are possible.
pub fn daily_irradiation(values: &[f64], samples_per_hour: u32) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let dx = 1.0 / samples_per_hour as f64;
    let mut area = 0.0;
    for w in values.windows(2) {
        area += (w[0] + w[1]) / 2.0 * dx;
    }
    area / 1000.0
}
