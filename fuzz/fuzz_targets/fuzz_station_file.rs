#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Write;

use chrono::NaiveDate;
use meteoqc::loader::{read_station_day, StationKind};

fuzz_target!(|data: &[u8]| {
    // The parser only takes paths, so stage the input as a temporary file
    let mut file = match tempfile::NamedTempFile::new() {
        Ok(f) => f,
        Err(_) => return,
    };
    if file.write_all(data).is_err() {
        return;
    }

    let date = match NaiveDate::from_ymd_opt(2024, 6, 21) {
        Some(d) => d,
        None => return,
    };

    // Arbitrary bytes must either parse into a station day or fail with an
    // error. A panic on malformed input is the bug we are hunting.
    for kind in [StationKind::Helios, StationKind::Geonica, StationKind::Meteo] {
        if let Ok(day) = read_station_day(file.path(), kind, date) {
            // Exercise the derived views that assume well-formed columns
            let _ = day.sampling_rate();
            for name in day.column_names() {
                let _ = day.series(name);
            }
        }
    }
});
