//! Per-station check sequences.
//!
//! One battery per supported logger, encoding which channels the station
//! records and which comparisons its instrumentation supports. The helios
//! roof station and the geonica tracker station each carry a radiation
//! suite and compare against the other one's day when it is available; the
//! basic meteo mast gets the structural and bounded-variation set only.
//!
//! Batteries take the thresholds already inside the session; per-channel
//! bounds and window sizes are fixed here, as they describe the hardware
//! rather than the site.

use crate::series::StationDay;

use super::CheckSession;

/// Plausible bounds per helios channel, W/m², m/s, degrees and Celsius.
const HELIOS_RANGES: &[(&str, f64, f64)] = &[
    ("G(0)", 0.0, 1600.0),
    ("G(41)", 0.0, 1600.0),
    ("D(0)", 0.0, 800.0),
    ("B", 0.0, 1200.0),
    ("Wvel", 0.0, 40.0),
    ("Wdir", 0.0, 360.0),
    ("Tamb", -15.0, 45.0),
];

const GEONICA_RANGES: &[(&str, f64, f64)] = &[
    ("B", 0.0, 1200.0),
    ("G(0)", 0.0, 1600.0),
    ("D(0)", 0.0, 800.0),
    ("Top", 0.0, 1200.0),
    ("Mid", 0.0, 1200.0),
    ("Bot", 0.0, 1200.0),
    ("Tamb", -15.0, 45.0),
];

const METEO_RANGES: &[(&str, f64, f64)] = &[
    ("Tamb", -15.0, 45.0),
    ("HR", 0.0, 100.0),
    ("Wvel", 0.0, 40.0),
    ("Wdir", 0.0, 360.0),
    ("Pres", 850.0, 1050.0),
];

/// Full sequence for the helios roof station.
///
/// Pass the geonica day as `sibling` to enable the cross-source radiation
/// comparisons; without one they are skipped.
pub fn helios_battery(session: &mut CheckSession, sibling: Option<&StationDay>) {
    session.check_format();
    session.check_time_index();
    for (column, lo, hi) in HELIOS_RANGES {
        session.check_null(column);
        session.check_range(column, *lo, *hi);
    }

    session.check_abs_change("Wvel", 10, 30.0);
    session.check_differential("Tamb", 5.0);

    session.check_coherence_radiation("G(0)", "B", "D(0)", 20.0);
    session.check_total_irradiation("G(0)", 12.0);

    if let Some(day) = sibling {
        cross_source(session, day);
    }
}

/// Full sequence for the geonica tracker station.
///
/// Pass the helios day as `sibling` to enable the cross-source radiation
/// comparisons; without one they are skipped.
pub fn geonica_battery(session: &mut CheckSession, sibling: Option<&StationDay>) {
    session.check_format();
    session.check_time_index();
    for (column, lo, hi) in GEONICA_RANGES {
        session.check_null(column);
        session.check_range(column, *lo, *hi);
    }

    session.check_differential("Tamb", 5.0);

    session.check_tracker_misalignment("B");
    session.check_coherence_isotypes("B", "Top", "Mid", "Bot", 20.0);

    if let Some(day) = sibling {
        cross_source(session, day);
    }
}

/// Full sequence for the basic meteo mast, which has no radiation channels.
pub fn meteo_battery(session: &mut CheckSession) {
    session.check_format();
    session.check_time_index();
    for (column, lo, hi) in METEO_RANGES {
        session.check_null(column);
        session.check_range(column, *lo, *hi);
    }

    session.check_pct_change("HR", 10, 50.0);
    session.check_abs_change("Wvel", 10, 30.0);
}

/// Compare direct radiation and daily global irradiation against another
/// logger's day. Both stations record `B` and `G(0)`; a sibling file
/// missing one of them just skips that comparison.
fn cross_source(session: &mut CheckSession, sibling: &StationDay) {
    match sibling.series("B") {
        Some(direct) => {
            session.check_radiation_other_source("B", &direct, 20.0);
            session.check_transitions_other_source("B", &direct, 10);
        }
        None => log::debug!(
            "sibling day of '{}' has no B channel, direct comparisons skipped",
            sibling.station
        ),
    }
    match sibling.series("G(0)") {
        Some(global) => {
            session.check_total_irradiation_other_source("G(0)", &global, 10.0);
        }
        None => log::debug!(
            "sibling day of '{}' has no G(0) channel, irradiation comparison skipped",
            sibling.station
        ),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::checks::testkit::{add_column, minute_axis, session_over};
    use crate::config::QcConfig;
    use crate::incident::Severity;
    use crate::series::Column;

    fn full_day(columns: &[(&str, f64)]) -> StationDay {
        let mut day = StationDay::new("full", NaiveDate::from_ymd_opt(2024, 6, 21).unwrap());
        day.times = minute_axis(1440);
        for (name, value) in columns {
            day.columns.push(Column::new(*name, vec![*value; 1440]));
        }
        day
    }

    #[test]
    fn test_meteo_battery_clean_day_stays_informational() {
        let day = full_day(&[
            ("Tamb", 20.0),
            ("HR", 50.0),
            ("Wvel", 5.0),
            ("Wdir", 180.0),
            ("Pres", 950.0),
        ]);
        let config = QcConfig::default();
        let (mut session, _dir) = session_over(day, &config);
        meteo_battery(&mut session);
        assert!(session.log().all_informational());
    }

    #[test]
    fn test_helios_battery_night_day_without_sibling() {
        let day = full_day(&[
            ("G(0)", 0.0),
            ("G(41)", 0.0),
            ("D(0)", 0.0),
            ("B", 0.0),
            ("Wvel", 0.0),
            ("Wdir", 0.0),
            ("Tamb", 10.0),
        ]);
        let config = QcConfig::default();
        let (mut session, _dir) = session_over(day, &config);
        helios_battery(&mut session, None);
        assert!(session.log().all_informational());
    }

    #[test]
    fn test_helios_battery_cross_checks_need_the_sibling() {
        let mut day = full_day(&[
            ("G(0)", 0.0),
            ("G(41)", 0.0),
            ("D(0)", 0.0),
            ("Wvel", 0.0),
            ("Wdir", 0.0),
            ("Tamb", 10.0),
        ]);
        add_column(&mut day, "B", vec![800.0; 1440]);

        let mut sibling = full_day(&[("G(0)", 0.0)]);
        // a steady 33% disagreement on the direct channel
        sibling.columns.push(Column::new("B", vec![600.0; 1440]));

        let config = QcConfig::default();
        let (mut session, _dir) = session_over(day, &config);
        helios_battery(&mut session, Some(&sibling));

        let warnings: Vec<_> = session
            .log()
            .entries()
            .iter()
            .filter(|f| f.severity == Severity::Warning)
            .collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0]
            .message
            .starts_with("No coherence between B and B_other radiation sources"));
    }

    #[test]
    fn test_geonica_battery_quiet_night() {
        let day = full_day(&[
            ("B", 0.0),
            ("G(0)", 0.0),
            ("D(0)", 0.0),
            ("Top", 0.0),
            ("Mid", 0.0),
            ("Bot", 0.0),
            ("Tamb", 12.0),
        ]);
        let config = QcConfig::default();
        let (mut session, _dir) = session_over(day, &config);
        geonica_battery(&mut session, None);
        assert!(session.log().all_informational());
    }
}
