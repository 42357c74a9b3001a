//! Structure and timestamp-axis checks.
//!
//! These run first in every battery: a day with the wrong shape or a broken
//! axis poisons every value-level verdict downstream, so its findings carry
//! ERROR grade while plain data gaps stay WARNING.

use crate::incident::{CheckKind, Severity};
use crate::series::StationDay;

use super::{join_times, CheckSession};

impl CheckSession {
    /// The day must hold exactly 24 hours of rows at the established rate,
    /// and every column must have parsed as numeric.
    pub fn check_format(&mut self) {
        let expected = StationDay::expected_rows(self.samples_per_hour);
        let rows = self.day.n_rows();
        if rows != expected {
            let message = format!("Wrong number of rows: {}. It should be: {}", rows, expected);
            self.fail(CheckKind::Format, Severity::Error, message, None);
        }

        let offenders: Vec<String> = self
            .day
            .columns
            .iter()
            .filter(|c| !c.numeric)
            .map(|c| c.name.clone())
            .collect();
        for name in offenders {
            let message = format!("Column \"{}\" is not numerical", name);
            self.fail(CheckKind::Format, Severity::Error, message, None);
        }
    }

    /// The timestamp axis must be unique, strictly increasing, and fully
    /// parsed. Duplicates alone are a WARNING; a duplicate also breaks
    /// strict ordering, so it trips the monotonic ERROR too.
    pub fn check_time_index(&mut self) {
        let duplicates = self.day.duplicated_times();
        if !duplicates.is_empty() {
            let message = format!("Index not unique. Duplicates: {}", join_times(&duplicates));
            self.fail(CheckKind::TimeIndex, Severity::Warning, message, None);
        }

        if !self.day.is_strictly_increasing() {
            self.fail(
                CheckKind::TimeIndex,
                Severity::Error,
                "Index not monotonic".to_string(),
                None,
            );
        }

        if !self.day.unparsed_instants.is_empty() {
            let message = format!(
                "Index is not all dates. Unparsed: {}",
                self.day.unparsed_instants.join(", ")
            );
            self.fail(CheckKind::TimeIndex, Severity::Error, message, None);
        }
    }

    /// Flag every instant where the column holds no value.
    pub fn check_null(&mut self, column: &str) {
        let Some(series) = self.series_or_flag(CheckKind::Null, column) else {
            return;
        };

        let gaps: Vec<_> = series
            .times
            .iter()
            .zip(&series.values)
            .filter(|(_, v)| v.is_nan())
            .map(|(t, _)| *t)
            .collect();
        if !gaps.is_empty() {
            let message = format!(
                "Column \"{}\" has some NaN values: {}",
                column,
                join_times(&gaps)
            );
            self.fail(CheckKind::Null, Severity::Warning, message, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::checks::testkit::{day_with, findings_of, session_over};
    use crate::config::QcConfig;
    use crate::incident::{CheckKind, Severity};

    #[test]
    fn test_format_passes_on_full_day() {
        let day = day_with("G(0)", vec![500.0; 1440]);
        let config = QcConfig::default();
        let (mut session, _dir) = session_over(day, &config);
        session.check_format();
        assert!(findings_of(&session, CheckKind::Format).is_empty());
    }

    #[test]
    fn test_format_flags_short_day_and_text_column() {
        let mut day = day_with("G(0)", vec![500.0; 30]);
        day.columns[0].numeric = false;
        let config = QcConfig::default();
        let (mut session, _dir) = session_over(day, &config);
        session.check_format();

        let messages = findings_of(&session, CheckKind::Format);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], "Wrong number of rows: 30. It should be: 1440");
        assert_eq!(messages[1], "Column \"G(0)\" is not numerical");
    }

    #[test]
    fn test_time_index_clean_axis_is_silent() {
        let day = day_with("G(0)", vec![500.0; 30]);
        let config = QcConfig::default();
        let (mut session, _dir) = session_over(day, &config);
        session.check_time_index();
        assert!(findings_of(&session, CheckKind::TimeIndex).is_empty());
    }

    #[test]
    fn test_time_index_duplicate_trips_warning_and_monotonic_error() {
        let mut day = day_with("G(0)", vec![500.0; 30]);
        day.times[5] = day.times[4];
        let config = QcConfig::default();
        let (mut session, _dir) = session_over(day, &config);
        session.check_time_index();

        let entries: Vec<_> = session
            .log()
            .entries()
            .iter()
            .filter(|f| f.check == Some(CheckKind::TimeIndex))
            .collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].severity, Severity::Warning);
        assert!(entries[0].message.starts_with("Index not unique. Duplicates: "));
        assert!(entries[0].message.contains("2024-06-21 08:04:00"));
        assert_eq!(entries[1].severity, Severity::Error);
        assert_eq!(entries[1].message, "Index not monotonic");
    }

    #[test]
    fn test_time_index_reports_unparsed_stamps() {
        let mut day = day_with("G(0)", vec![500.0; 30]);
        day.unparsed_instants = vec!["garbage 08:99".to_string()];
        let config = QcConfig::default();
        let (mut session, _dir) = session_over(day, &config);
        session.check_time_index();

        let messages = findings_of(&session, CheckKind::TimeIndex);
        assert_eq!(
            messages,
            vec!["Index is not all dates. Unparsed: garbage 08:99".to_string()]
        );
    }

    #[test]
    fn test_null_lists_the_gap_instants() {
        let mut values = vec![20.0; 30];
        values[3] = f64::NAN;
        values[17] = f64::NAN;
        let day = day_with("Tamb", values);
        let config = QcConfig::default();
        let (mut session, _dir) = session_over(day, &config);
        session.check_null("Tamb");

        let entries: Vec<_> = session
            .log()
            .entries()
            .iter()
            .filter(|f| f.check == Some(CheckKind::Null))
            .collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].severity, Severity::Warning);
        assert!(entries[0]
            .message
            .starts_with("Column \"Tamb\" has some NaN values: "));
        assert!(entries[0].message.contains("2024-06-21 08:03:00"));
        assert!(entries[0].message.contains("2024-06-21 08:17:00"));
    }

    #[test]
    fn test_null_complete_column_is_silent() {
        let day = day_with("Tamb", vec![20.0; 30]);
        let config = QcConfig::default();
        let (mut session, _dir) = session_over(day, &config);
        session.check_null("Tamb");
        assert!(findings_of(&session, CheckKind::Null).is_empty());
    }

    #[test]
    fn test_gap_truncation_past_ten_instants() {
        let mut values = vec![20.0; 40];
        for v in values.iter_mut().take(15) {
            *v = f64::NAN;
        }
        let day = day_with("Tamb", values);
        let config = QcConfig::default();
        let (mut session, _dir) = session_over(day, &config);
        session.check_null("Tamb");

        let messages = findings_of(&session, CheckKind::Null);
        assert!(messages[0].ends_with("... (15 total)"));
    }
}
