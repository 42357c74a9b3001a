use chrono::{NaiveDate, NaiveDateTime};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use meteoqc::checks::{helios_battery, CheckSession};
use meteoqc::config::{QcConfig, ReportPaths};
use meteoqc::render::NullRenderer;
use meteoqc::report::Reporter;
use meteoqc::series::{Column, StationDay, TimeSeries};
use meteoqc::signal::count_transitions;
use meteoqc::solar::{solar_position, solar_positions, Location};
use meteoqc::valley::{detect_valleys, ValleyParams};

/// Minutely axis of `len` samples starting at midnight of a summer day
fn minute_axis(len: usize) -> Vec<NaiveDateTime> {
    let midnight = NaiveDate::from_ymd_opt(2024, 6, 21)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    (0..len)
        .map(|i| midnight + chrono::Duration::minutes(i as i64))
        .collect()
}

/// Clear-sky helios day whose global trace closes on diffuse plus direct
fn clear_day(times: &[NaiveDateTime]) -> StationDay {
    let location = Location::default();
    let mut global = Vec::with_capacity(times.len());
    let mut diffuse = Vec::with_capacity(times.len());
    let mut direct = Vec::with_capacity(times.len());
    for t in times {
        let cos_zenith = solar_position(*t, &location).zenith.cos();
        if cos_zenith > 0.0 {
            direct.push(900.0);
            diffuse.push(100.0);
            global.push(100.0 + 900.0 * cos_zenith);
        } else {
            direct.push(0.0);
            diffuse.push(0.0);
            global.push(0.0);
        }
    }

    let mut day = StationDay::new("helios", times[0].date());
    day.times = times.to_vec();
    day.columns.push(Column::new("G(0)", global.clone()));
    day.columns.push(Column::new("G(41)", global));
    day.columns.push(Column::new("D(0)", diffuse));
    day.columns.push(Column::new("B", direct));
    day.columns.push(Column::new("Wvel", vec![3.0; times.len()]));
    day.columns.push(Column::new("Wdir", vec![180.0; times.len()]));
    day.columns.push(Column::new("Tamb", vec![21.5; times.len()]));
    day
}

/// Direct-irradiance trace with a shallow tracker valley every hour
fn valley_trace(times: &[NaiveDateTime]) -> TimeSeries {
    let dip = [790.0, 730.0, 670.0, 730.0, 790.0];
    let mut values = vec![850.0; times.len()];
    let mut i = 30;
    while i + dip.len() + 1 < values.len() {
        values[i..i + dip.len()].copy_from_slice(&dip);
        i += 60;
    }
    TimeSeries::new("B", times.to_vec(), values)
}

/// Benchmark the solar position sweep underlying the coherence checks
fn bench_solar_positions(c: &mut Criterion) {
    let mut group = c.benchmark_group("solar_positions");
    let location = Location::default();

    for len in [60, 360, 1440] {
        let times = minute_axis(len);
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}samples", len)),
            &times,
            |b, times| {
                b.iter(|| black_box(solar_positions(black_box(times), &location)));
            },
        );
    }

    group.finish();
}

/// Benchmark the valley scan over a full day of direct irradiance
fn bench_detect_valleys(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect_valleys");
    let params = ValleyParams::default();

    for len in [360, 1440] {
        let series = valley_trace(&minute_axis(len));
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}samples", len)),
            &series,
            |b, series| {
                b.iter(|| black_box(detect_valleys(black_box(series), &params)));
            },
        );
    }

    group.finish();
}

/// Benchmark the cloud-transition count that gates the coherence checks
fn bench_count_transitions(c: &mut Criterion) {
    let values: Vec<f64> = (0..1440)
        .map(|i| if i % 3 == 0 { 400.0 } else { 800.0 })
        .collect();

    c.bench_function("count_transitions/1440samples", |b| {
        b.iter(|| black_box(count_transitions(black_box(&values), 10.0)));
    });
}

/// Benchmark one complete helios battery over a clean station-day
fn bench_helios_battery(c: &mut Criterion) {
    let config = QcConfig::default();
    let day = clear_day(&minute_axis(1440));
    let dir = tempfile::tempdir().unwrap();

    c.bench_function("helios_battery/1440rows", |b| {
        b.iter_batched(
            || {
                let reporter = Reporter::new(ReportPaths {
                    dir: dir.path().to_path_buf(),
                    ..ReportPaths::default()
                });
                CheckSession::from_day(
                    "helios",
                    day.clone(),
                    &config,
                    Box::new(NullRenderer),
                    reporter,
                )
                .unwrap()
            },
            |mut session| {
                helios_battery(&mut session, None);
                black_box(session.log().len());
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_solar_positions,
    bench_detect_valleys,
    bench_count_transitions,
    bench_helios_battery
);
criterion_main!(benches);
