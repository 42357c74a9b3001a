//! Radiation plausibility and cross-source coherence checks.
//!
//! Each oracle compares a measured radiation trace against something that
//! should agree with it: the clear-sky closure model, a redundant sensor on
//! another logger, or the isotype cell triplet. Broken-cloud days make every
//! one of these comparisons noisy, so the cross checks first count sharp
//! steps in the primary trace and, past `cloud_transitions_max`, withhold
//! the verdict with an INFO note instead of raising a false alarm. A chart
//! still rides along with the note whenever the comparison itself failed,
//! so the day can be inspected by eye.
//!
//! Deviations are tested as `!(x < threshold)`, which makes a `NaN`
//! statistic a failure instead of a silent pass.

use std::collections::HashSet;

use chrono::NaiveDateTime;

use crate::incident::{CheckKind, Severity};
use crate::render::PlotRequest;
use crate::series::TimeSeries;
use crate::signal::{count_transitions, daily_irradiation};
use crate::solar::solar_positions;
use crate::valley::detect_valleys;

use super::{join_flagged, join_times, CheckSession};

/// Spectral weights mapping the isotype triplet onto broadband DNI.
const ISOTYPE_TOP_WEIGHT: f64 = 0.51;
const ISOTYPE_MID_WEIGHT: f64 = 0.10;
const ISOTYPE_BOT_WEIGHT: f64 = 0.39;

impl CheckSession {
    /// Scan direct radiation for the shallow symmetric dips a mis-pointed
    /// tracker leaves behind. Fires once the day's valley count reaches
    /// `valleys_max`.
    pub fn check_tracker_misalignment(&mut self, column: &str) {
        let Some(series) = self.series_or_flag(CheckKind::Misalignment, column) else {
            return;
        };

        let params = self.thresholds.valley_params();
        let scan = detect_valleys(&series, &params);
        log::debug!(
            "misalignment scan of '{}': {} suspicious valleys",
            column,
            scan.count
        );
        if scan.count < self.thresholds.valleys_max {
            return;
        }

        let flagged = values_at(&series, &scan.instants);
        let message = format!(
            "Possible misalignment in {} direct radiation due to the number of suspicious valleys ({}) larger than threshold, {}. List of values: {}",
            self.label,
            scan.count,
            self.thresholds.valleys_max,
            join_flagged(&flagged)
        );
        let request = PlotRequest::new(
            CheckKind::Misalignment.as_str(),
            &self.label,
            series,
            flagged,
        );
        self.fail(
            CheckKind::Misalignment,
            Severity::Warning,
            message,
            Some(request),
        );
    }

    /// The day's integrated irradiation must stay under `max_kwh`. A trace
    /// with gaps integrates to `NaN`, which also fails.
    pub fn check_total_irradiation(&mut self, column: &str, max_kwh: f64) {
        let Some(series) = self.series_or_flag(CheckKind::TotalIrradiation, column) else {
            return;
        };

        let irradiation = daily_irradiation(&series.values, self.samples_per_hour);
        if irradiation < max_kwh {
            return;
        }

        let message = format!(
            "Total irradiation (daily) from \"{}\" is {:.2}. This is higher than the threshold: {}",
            column, irradiation, max_kwh
        );
        self.fail(CheckKind::TotalIrradiation, Severity::Warning, message, None);
    }

    /// Closure test: above the GHI floor, global radiation must match
    /// `DHI + DNI cos(zenith)` within `threshold_pct` percent.
    ///
    /// Gated on the cloudiness of the whole global trace.
    pub fn check_coherence_radiation(
        &mut self,
        ghi: &str,
        dni: &str,
        dhi: &str,
        threshold_pct: f64,
    ) {
        let Some(ghi_series) = self.series_or_flag(CheckKind::CoherenceRadiation, ghi) else {
            return;
        };
        let Some(dni_series) = self.series_or_flag(CheckKind::CoherenceRadiation, dni) else {
            return;
        };
        let Some(dhi_series) = self.series_or_flag(CheckKind::CoherenceRadiation, dhi) else {
            return;
        };

        let keep: Vec<bool> = ghi_series
            .values
            .iter()
            .map(|v| *v > self.thresholds.ghi_floor)
            .collect();
        let ghi_kept = masked(&ghi_series, &keep);
        if ghi_kept.is_empty() {
            return;
        }
        let dni_kept = masked(&dni_series, &keep);
        let dhi_kept = masked(&dhi_series, &keep);

        let positions = solar_positions(&ghi_kept.times, &self.location);
        let mut flagged: Vec<(NaiveDateTime, f64)> = Vec::new();
        for i in 0..ghi_kept.len() {
            let measured = ghi_kept.values[i];
            let model = dhi_kept.values[i] + dni_kept.values[i] * positions[i].zenith.cos();
            let deviation = (measured - model).abs() / measured * 100.0;
            if !(deviation < threshold_pct) {
                flagged.push((ghi_kept.times[i], measured));
            }
        }
        let failed = !flagged.is_empty();

        let transitions =
            count_transitions(&ghi_series.values, self.thresholds.step_threshold);
        if transitions >= self.thresholds.cloud_transitions_max {
            let note = self.suppression_note("Radiation coherence based on GHI", transitions);
            let request = failed.then(|| {
                PlotRequest::new(
                    CheckKind::CoherenceRadiation.as_str(),
                    &self.label,
                    ghi_kept,
                    flagged,
                )
            });
            self.fail(CheckKind::CoherenceRadiation, Severity::Info, note, request);
        } else if failed {
            let instants: Vec<NaiveDateTime> = flagged.iter().map(|(t, _)| *t).collect();
            let message = format!(
                "No coherence between radiations considering a percentage threshold of GHI {}% in {}",
                threshold_pct,
                join_times(&instants)
            );
            let request = PlotRequest::new(
                CheckKind::CoherenceRadiation.as_str(),
                &self.label,
                ghi_kept,
                flagged,
            );
            self.fail(
                CheckKind::CoherenceRadiation,
                Severity::Warning,
                message,
                Some(request),
            );
        }
    }

    /// Above the DNI floor, the column must agree with the same quantity
    /// measured by another logger within `threshold_pct` percent of the
    /// other reading.
    ///
    /// Gated on the cloudiness of this station's own floored trace.
    pub fn check_radiation_other_source(
        &mut self,
        column: &str,
        other: &TimeSeries,
        threshold_pct: f64,
    ) {
        let Some(series) = self.series_or_flag(CheckKind::RadiationOtherSource, column) else {
            return;
        };
        let column_other = format!("{}_other", other.name);

        let (joined, joined_other) = series.align_inner(other);
        let keep: Vec<bool> = joined
            .values
            .iter()
            .map(|v| *v > self.thresholds.dni_floor)
            .collect();
        let primary = masked(&joined, &keep);
        if primary.is_empty() {
            return;
        }
        let secondary = masked(&joined_other, &keep);

        let mut flagged: Vec<(NaiveDateTime, f64)> = Vec::new();
        for i in 0..primary.len() {
            let deviation = (primary.values[i] - secondary.values[i]).abs()
                / secondary.values[i]
                * 100.0;
            if !(deviation < threshold_pct) {
                flagged.push((primary.times[i], primary.values[i]));
            }
        }
        let failed = !flagged.is_empty();

        let gate_basis = series.filter_above(self.thresholds.dni_floor);
        let transitions =
            count_transitions(&gate_basis.values, self.thresholds.step_threshold);

        let title = format!("{}:{}", CheckKind::RadiationOtherSource.as_str(), column);
        if transitions >= self.thresholds.cloud_transitions_max {
            let lead = format!(
                "Comparison of radiation {} and {} from different sources",
                column, column_other
            );
            let note = self.suppression_note(&lead, transitions);
            let request = failed.then(|| {
                PlotRequest::new(&title, &self.label, primary, flagged)
                    .with_companion(secondary)
            });
            self.fail(CheckKind::RadiationOtherSource, Severity::Info, note, request);
        } else if failed {
            let instants: Vec<NaiveDateTime> = flagged.iter().map(|(t, _)| *t).collect();
            let message = format!(
                "No coherence between {} and {} radiation sources considering a percentage threshold of {}% in {}",
                column,
                column_other,
                threshold_pct,
                join_times(&instants)
            );
            let request = PlotRequest::new(&title, &self.label, primary, flagged)
                .with_companion(secondary);
            self.fail(
                CheckKind::RadiationOtherSource,
                Severity::Warning,
                message,
                Some(request),
            );
        }
    }

    /// The day's integrated irradiation must agree with the other logger's
    /// within `threshold_pct` percent, both integrated over the shared
    /// instants. Days below the irradiation floor are skipped outright.
    ///
    /// Gated on the cloudiness of this station's own floored trace.
    pub fn check_total_irradiation_other_source(
        &mut self,
        column: &str,
        other: &TimeSeries,
        threshold_pct: f64,
    ) {
        let Some(series) =
            self.series_or_flag(CheckKind::TotalIrradiationOtherSource, column)
        else {
            return;
        };
        let column_other = format!("{}_other", other.name);

        let (joined, joined_other) = series.align_inner(other);
        let irradiation = daily_irradiation(&joined.values, self.samples_per_hour);
        let irradiation_other =
            daily_irradiation(&joined_other.values, self.samples_per_hour);
        if irradiation < self.thresholds.irradiation_floor_kwh {
            return;
        }

        let deviation = (irradiation - irradiation_other).abs() / irradiation * 100.0;
        let failed = !(deviation < threshold_pct);

        let gate_basis = series.filter_above(self.thresholds.dni_floor);
        let transitions =
            count_transitions(&gate_basis.values, self.thresholds.step_threshold);

        let title = format!(
            "{}:{}",
            CheckKind::TotalIrradiationOtherSource.as_str(),
            column
        );
        if transitions >= self.thresholds.cloud_transitions_max {
            let lead = format!(
                "Comparison of total irradiations {} and {}",
                column, column_other
            );
            let note = self.suppression_note(&lead, transitions);
            let request = failed.then(|| {
                PlotRequest::new(&title, &self.label, joined, Vec::new())
                    .with_companion(joined_other)
            });
            self.fail(
                CheckKind::TotalIrradiationOtherSource,
                Severity::Info,
                note,
                request,
            );
        } else if failed {
            let message = format!(
                "Total irradiation from {} is different to {} in more than {}%. It is {:.1}% while the daily irradiation floor is {:.2} kWh/(m2·day)",
                column,
                column_other,
                threshold_pct,
                deviation,
                self.thresholds.irradiation_floor_kwh
            );
            let request = PlotRequest::new(&title, &self.label, joined, Vec::new())
                .with_companion(joined_other);
            self.fail(
                CheckKind::TotalIrradiationOtherSource,
                Severity::Warning,
                message,
                Some(request),
            );
        }
    }

    /// Both loggers must see a similar number of cloud transitions above
    /// the DNI floor; counts further apart than `max_diff` fail.
    ///
    /// Gated on this station's own count, which is also the compared value:
    /// past `cloud_transitions_max` the day is too broken to compare.
    pub fn check_transitions_other_source(
        &mut self,
        column: &str,
        other: &TimeSeries,
        max_diff: usize,
    ) {
        let Some(series) = self.series_or_flag(CheckKind::TransitionsOtherSource, column)
        else {
            return;
        };
        let column_other = format!("{}_other", other.name);

        let floor = self.thresholds.dni_floor;
        let primary = series.filter_above(floor);
        if primary.is_empty() {
            return;
        }
        let secondary = other.filter_above(floor);

        let step = self.thresholds.step_threshold;
        let transitions = count_transitions(&primary.values, step);
        let transitions_other = count_transitions(&secondary.values, step);
        let failed = transitions.abs_diff(transitions_other) >= max_diff;

        let title = format!("{}:{}", CheckKind::TransitionsOtherSource.as_str(), column);
        if transitions >= self.thresholds.cloud_transitions_max {
            let lead = format!(
                "Comparison of cloud transitions {} and {}",
                column, column_other
            );
            let note = self.suppression_note(&lead, transitions);
            let request = failed.then(|| {
                PlotRequest::new(&title, &self.label, primary, Vec::new())
                    .with_companion(secondary)
            });
            self.fail(CheckKind::TransitionsOtherSource, Severity::Info, note, request);
        } else if failed {
            let message = format!(
                "No coherence of cloudy moments between {} and {} radiation sources with {} and {} respectively. Maximum allowed difference: {}",
                column, column_other, transitions, transitions_other, max_diff
            );
            let request = PlotRequest::new(&title, &self.label, primary, Vec::new())
                .with_companion(secondary);
            self.fail(
                CheckKind::TransitionsOtherSource,
                Severity::Warning,
                message,
                Some(request),
            );
        }
    }

    /// Above the DNI floor, direct radiation must match the weighted sum of
    /// the three isotype cells within `threshold_pct` percent.
    ///
    /// Gated on the cloudiness of the floored DNI trace.
    pub fn check_coherence_isotypes(
        &mut self,
        dni: &str,
        top: &str,
        mid: &str,
        bot: &str,
        threshold_pct: f64,
    ) {
        let Some(dni_series) = self.series_or_flag(CheckKind::CoherenceIsotypes, dni) else {
            return;
        };
        let Some(top_series) = self.series_or_flag(CheckKind::CoherenceIsotypes, top) else {
            return;
        };
        let Some(mid_series) = self.series_or_flag(CheckKind::CoherenceIsotypes, mid) else {
            return;
        };
        let Some(bot_series) = self.series_or_flag(CheckKind::CoherenceIsotypes, bot) else {
            return;
        };

        let keep: Vec<bool> = dni_series
            .values
            .iter()
            .map(|v| *v > self.thresholds.dni_floor)
            .collect();
        let dni_kept = masked(&dni_series, &keep);
        if dni_kept.is_empty() {
            return;
        }
        let top_kept = masked(&top_series, &keep);
        let mid_kept = masked(&mid_series, &keep);
        let bot_kept = masked(&bot_series, &keep);

        let mut flagged: Vec<(NaiveDateTime, f64)> = Vec::new();
        for i in 0..dni_kept.len() {
            let measured = dni_kept.values[i];
            let model = top_kept.values[i] * ISOTYPE_TOP_WEIGHT
                + mid_kept.values[i] * ISOTYPE_MID_WEIGHT
                + bot_kept.values[i] * ISOTYPE_BOT_WEIGHT;
            let deviation = (measured - model).abs() / measured * 100.0;
            if !(deviation < threshold_pct) {
                flagged.push((dni_kept.times[i], measured));
            }
        }
        let failed = !flagged.is_empty();

        let transitions =
            count_transitions(&dni_kept.values, self.thresholds.step_threshold);
        if transitions >= self.thresholds.cloud_transitions_max {
            let note = self.suppression_note("DNI vs isotypes comparison", transitions);
            let request = failed.then(|| {
                PlotRequest::new(
                    CheckKind::CoherenceIsotypes.as_str(),
                    &self.label,
                    dni_kept,
                    flagged,
                )
                .with_companion(top_kept)
                .with_companion(mid_kept)
                .with_companion(bot_kept)
            });
            self.fail(CheckKind::CoherenceIsotypes, Severity::Info, note, request);
        } else if failed {
            let instants: Vec<NaiveDateTime> = flagged.iter().map(|(t, _)| *t).collect();
            let message = format!(
                "No coherence between DNI radiation and isotypes considering a percentage threshold of {}% in {}",
                threshold_pct,
                join_times(&instants)
            );
            let request = PlotRequest::new(
                CheckKind::CoherenceIsotypes.as_str(),
                &self.label,
                dni_kept,
                flagged,
            )
            .with_companion(top_kept)
            .with_companion(mid_kept)
            .with_companion(bot_kept);
            self.fail(
                CheckKind::CoherenceIsotypes,
                Severity::Warning,
                message,
                Some(request),
            );
        }
    }

    fn suppression_note(&self, lead: &str, transitions: usize) -> String {
        format!(
            "{} not checked because the number of cloudy moments={} [with a step threshold of {}] is higher than threshold={}",
            lead,
            transitions,
            self.thresholds.step_threshold,
            self.thresholds.cloud_transitions_max
        )
    }
}

/// Rows of `series` where `keep` is true. The slices run in parallel.
fn masked(series: &TimeSeries, keep: &[bool]) -> TimeSeries {
    debug_assert_eq!(series.len(), keep.len());
    let mut times = Vec::new();
    let mut values = Vec::new();
    for (i, k) in keep.iter().enumerate() {
        if *k {
            times.push(series.times[i]);
            values.push(series.values[i]);
        }
    }
    TimeSeries {
        name: series.name.clone(),
        times,
        values,
    }
}

/// Samples of `series` at the given instants, in series order.
fn values_at(series: &TimeSeries, instants: &[NaiveDateTime]) -> Vec<(NaiveDateTime, f64)> {
    let wanted: HashSet<NaiveDateTime> = instants.iter().copied().collect();
    series
        .times
        .iter()
        .zip(&series.values)
        .filter(|(t, _)| wanted.contains(t))
        .map(|(t, v)| (*t, *v))
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use crate::checks::testkit::{add_column, day_with, findings_of, session_over};
    use crate::config::QcConfig;
    use crate::incident::{CheckKind, Severity};
    use crate::series::{Column, StationDay, TimeSeries};
    use crate::solar::solar_position;

    fn noon_axis(len: usize) -> Vec<NaiveDateTime> {
        let start = NaiveDate::from_ymd_opt(2024, 6, 21)
            .unwrap()
            .and_hms_opt(11, 0, 0)
            .unwrap();
        (0..len)
            .map(|i| start + chrono::Duration::minutes(i as i64))
            .collect()
    }

    /// A late-morning day whose global channel closes exactly against
    /// `DHI + DNI cos(zenith)` under the default site.
    fn closure_day(len: usize) -> StationDay {
        let config = QcConfig::default();
        let times = noon_axis(len);
        let ghi: Vec<f64> = times
            .iter()
            .map(|t| {
                let pos = solar_position(*t, &config.location);
                100.0 + 900.0 * pos.zenith.cos()
            })
            .collect();

        let mut day = StationDay::new("helios", NaiveDate::from_ymd_opt(2024, 6, 21).unwrap());
        day.times = times;
        day.columns.push(Column::new("G(0)", ghi));
        day.columns.push(Column::new("B", vec![900.0; len]));
        day.columns.push(Column::new("D(0)", vec![100.0; len]));
        day
    }

    fn other_series(times: &[NaiveDateTime], value: f64) -> TimeSeries {
        TimeSeries::new("B", times.to_vec(), vec![value; times.len()])
    }

    #[test]
    fn test_closure_model_match_passes() {
        let day = closure_day(30);
        let config = QcConfig::default();
        let (mut session, _dir) = session_over(day, &config);
        session.check_coherence_radiation("G(0)", "B", "D(0)", 20.0);
        assert!(findings_of(&session, CheckKind::CoherenceRadiation).is_empty());
    }

    #[test]
    fn test_closure_deviation_is_flagged_with_instants() {
        let mut day = closure_day(30);
        // doubling the measurement is a 50% relative deviation
        for i in [5, 12, 20] {
            day.columns[0].values[i] *= 2.0;
        }
        let config = QcConfig::default();
        let (mut session, _dir) = session_over(day, &config);
        session.check_coherence_radiation("G(0)", "B", "D(0)", 20.0);

        let entries: Vec<_> = session
            .log()
            .entries()
            .iter()
            .filter(|f| f.check == Some(CheckKind::CoherenceRadiation))
            .collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].severity, Severity::Warning);
        assert!(entries[0].message.starts_with(
            "No coherence between radiations considering a percentage threshold of GHI 20% in "
        ));
        assert!(entries[0].message.contains("11:05:00"));
        assert!(entries[0].message.contains("11:12:00"));
        assert!(entries[0].message.contains("11:20:00"));
    }

    #[test]
    fn test_closure_verdict_suppressed_on_broken_cloud_day() {
        let mut day = closure_day(30);
        // wiggle within tolerance but past the step threshold on every sample
        for (i, v) in day.columns[0].values.iter_mut().enumerate() {
            *v += if i % 2 == 0 { 15.0 } else { -15.0 };
        }
        let config = QcConfig::default();
        let (mut session, _dir) = session_over(day, &config);
        session.check_coherence_radiation("G(0)", "B", "D(0)", 20.0);

        let entries: Vec<_> = session
            .log()
            .entries()
            .iter()
            .filter(|f| f.check == Some(CheckKind::CoherenceRadiation))
            .collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].severity, Severity::Info);
        assert!(entries[0].message.starts_with(
            "Radiation coherence based on GHI not checked because the number of cloudy moments=30"
        ));
        assert!(entries[0]
            .message
            .ends_with("[with a step threshold of 10] is higher than threshold=10"));
    }

    #[test]
    fn test_closure_silent_when_everything_below_floor() {
        let mut day = closure_day(30);
        for v in day.columns[0].values.iter_mut() {
            *v = 100.0;
        }
        let config = QcConfig::default();
        let (mut session, _dir) = session_over(day, &config);
        session.check_coherence_radiation("G(0)", "B", "D(0)", 20.0);
        assert!(findings_of(&session, CheckKind::CoherenceRadiation).is_empty());
    }

    #[test]
    fn test_misalignment_fires_at_valley_count_threshold() {
        let dip = [800.0, 740.0, 680.0, 620.0, 680.0, 740.0, 800.0];
        let mut values = vec![800.0];
        for _ in 0..5 {
            values.extend_from_slice(&dip);
            values.extend_from_slice(&[800.0, 800.0]);
        }
        let day = day_with("B", values);
        let config = QcConfig::default();
        let (mut session, _dir) = session_over(day, &config);
        session.check_tracker_misalignment("B");

        let messages = findings_of(&session, CheckKind::Misalignment);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with(
            "Possible misalignment in testbench direct radiation due to the number of suspicious valleys (5) larger than threshold, 5."
        ));
        assert!(messages[0].contains("List of values: "));
    }

    #[test]
    fn test_misalignment_below_threshold_is_silent() {
        let dip = [800.0, 740.0, 680.0, 620.0, 680.0, 740.0, 800.0];
        let mut values = vec![800.0];
        for _ in 0..4 {
            values.extend_from_slice(&dip);
            values.extend_from_slice(&[800.0, 800.0]);
        }
        let day = day_with("B", values);
        let config = QcConfig::default();
        let (mut session, _dir) = session_over(day, &config);
        session.check_tracker_misalignment("B");
        assert!(findings_of(&session, CheckKind::Misalignment).is_empty());
    }

    #[test]
    fn test_total_irradiation_cap() {
        // 30 minutes at 1000 W/m2 integrate to 0.48 kWh/m2
        let day = day_with("G(0)", vec![1000.0; 30]);
        let config = QcConfig::default();
        let (mut session, _dir) = session_over(day, &config);
        session.check_total_irradiation("G(0)", 12.0);
        assert!(findings_of(&session, CheckKind::TotalIrradiation).is_empty());

        session.check_total_irradiation("G(0)", 0.4);
        let messages = findings_of(&session, CheckKind::TotalIrradiation);
        assert_eq!(messages.len(), 1);
        assert_eq!(
            messages[0],
            "Total irradiation (daily) from \"G(0)\" is 0.48. This is higher than the threshold: 0.4"
        );
    }

    #[test]
    fn test_total_irradiation_nan_day_fails() {
        let mut values = vec![1000.0; 30];
        values[10] = f64::NAN;
        let day = day_with("G(0)", values);
        let config = QcConfig::default();
        let (mut session, _dir) = session_over(day, &config);
        session.check_total_irradiation("G(0)", 12.0);
        assert_eq!(findings_of(&session, CheckKind::TotalIrradiation).len(), 1);
    }

    #[test]
    fn test_other_source_agreement_passes() {
        let day = day_with("B", vec![800.0; 30]);
        let other = other_series(&crate::checks::testkit::minute_axis(30), 800.0);
        let config = QcConfig::default();
        let (mut session, _dir) = session_over(day, &config);
        session.check_radiation_other_source("B", &other, 20.0);
        assert!(findings_of(&session, CheckKind::RadiationOtherSource).is_empty());
    }

    #[test]
    fn test_other_source_deviation_relative_to_other_reading() {
        let day = day_with("B", vec![800.0; 30]);
        // 800 vs 600 is a 33% deviation of the other reading
        let other = other_series(&crate::checks::testkit::minute_axis(30), 600.0);
        let config = QcConfig::default();
        let (mut session, _dir) = session_over(day, &config);
        session.check_radiation_other_source("B", &other, 20.0);

        let messages = findings_of(&session, CheckKind::RadiationOtherSource);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with(
            "No coherence between B and B_other radiation sources considering a percentage threshold of 20% in "
        ));
    }

    #[test]
    fn test_other_source_silent_when_primary_below_floor() {
        let day = day_with("B", vec![500.0; 30]);
        let other = other_series(&crate::checks::testkit::minute_axis(30), 900.0);
        let config = QcConfig::default();
        let (mut session, _dir) = session_over(day, &config);
        session.check_radiation_other_source("B", &other, 20.0);
        assert!(findings_of(&session, CheckKind::RadiationOtherSource).is_empty());
    }

    #[test]
    fn test_total_other_source_deviation() {
        // two hours at 800 W/m2 integrate to 1.59 kWh, over the skip floor
        let day = day_with("B", vec![800.0; 120]);
        let other = other_series(&crate::checks::testkit::minute_axis(120), 400.0);
        let config = QcConfig::default();
        let (mut session, _dir) = session_over(day, &config);
        session.check_total_irradiation_other_source("B", &other, 10.0);

        let messages = findings_of(&session, CheckKind::TotalIrradiationOtherSource);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with(
            "Total irradiation from B is different to B_other in more than 10%. It is 50.0% while the daily irradiation floor is 1.00 kWh/(m2\u{b7}day)"
        ));
    }

    #[test]
    fn test_total_other_source_skips_low_energy_day() {
        // 0.60 kWh stays under the 1 kWh floor, disagreement and all
        let day = day_with("B", vec![300.0; 120]);
        let other = other_series(&crate::checks::testkit::minute_axis(120), 100.0);
        let config = QcConfig::default();
        let (mut session, _dir) = session_over(day, &config);
        session.check_total_irradiation_other_source("B", &other, 10.0);
        assert!(findings_of(&session, CheckKind::TotalIrradiationOtherSource).is_empty());
    }

    #[test]
    fn test_transition_counts_compared() {
        let mut values = Vec::new();
        for i in 0..9 {
            values.push(if i % 2 == 0 { 800.0 } else { 900.0 });
        }
        let day = day_with("B", values);
        let other = other_series(&crate::checks::testkit::minute_axis(9), 850.0);
        let config = QcConfig::default();
        let (mut session, _dir) = session_over(day, &config);
        session.check_transitions_other_source("B", &other, 3);

        let messages = findings_of(&session, CheckKind::TransitionsOtherSource);
        assert_eq!(
            messages,
            vec![
                "No coherence of cloudy moments between B and B_other radiation sources with 9 and 0 respectively. Maximum allowed difference: 3"
                    .to_string()
            ]
        );
    }

    #[test]
    fn test_transition_verdict_suppressed_at_gate_boundary() {
        // one more sample pushes the count to the suppression threshold
        let mut values = Vec::new();
        for i in 0..10 {
            values.push(if i % 2 == 0 { 800.0 } else { 900.0 });
        }
        let day = day_with("B", values);
        let other = other_series(&crate::checks::testkit::minute_axis(10), 850.0);
        let config = QcConfig::default();
        let (mut session, _dir) = session_over(day, &config);
        session.check_transitions_other_source("B", &other, 3);

        let entries: Vec<_> = session
            .log()
            .entries()
            .iter()
            .filter(|f| f.check == Some(CheckKind::TransitionsOtherSource))
            .collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].severity, Severity::Info);
        assert!(entries[0].message.starts_with(
            "Comparison of cloud transitions B and B_other not checked because the number of cloudy moments=10"
        ));
    }

    #[test]
    fn test_isotype_weighted_sum_passes_and_fails() {
        // equal cells weigh out to exactly the DNI reading
        let mut day = day_with("B", vec![800.0; 30]);
        add_column(&mut day, "Top", vec![800.0; 30]);
        add_column(&mut day, "Mid", vec![800.0; 30]);
        add_column(&mut day, "Bot", vec![800.0; 30]);
        let config = QcConfig::default();
        let (mut session, _dir) = session_over(day, &config);
        session.check_coherence_isotypes("B", "Top", "Mid", "Bot", 20.0);
        assert!(findings_of(&session, CheckKind::CoherenceIsotypes).is_empty());

        // a collapsed top cell drags the model 25% under the reading
        let mut day = day_with("B", vec![800.0; 30]);
        add_column(&mut day, "Top", vec![400.0; 30]);
        add_column(&mut day, "Mid", vec![800.0; 30]);
        add_column(&mut day, "Bot", vec![800.0; 30]);
        let (mut session, _dir) = session_over(day, &config);
        session.check_coherence_isotypes("B", "Top", "Mid", "Bot", 20.0);

        let messages = findings_of(&session, CheckKind::CoherenceIsotypes);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with(
            "No coherence between DNI radiation and isotypes considering a percentage threshold of 20% in "
        ));
    }

    #[test]
    fn test_missing_companion_column_is_flagged_not_skipped() {
        let day = day_with("B", vec![800.0; 30]);
        let config = QcConfig::default();
        let (mut session, _dir) = session_over(day, &config);
        session.check_coherence_isotypes("B", "Top", "Mid", "Bot", 20.0);

        let entries: Vec<_> = session
            .log()
            .entries()
            .iter()
            .filter(|f| f.check == Some(CheckKind::CoherenceIsotypes))
            .collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].severity, Severity::Error);
        assert!(entries[0].message.contains("\"Top\" not found"));
    }
}
