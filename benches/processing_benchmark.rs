use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gridded_fetcher::models::{
    DatasetDescriptor, DatasetFamily, DatedSamples, StationValues, TimeScale,
};
use gridded_fetcher::processors::{ResultAssembler, TemporalAggregator};
use gridded_fetcher::service::Image;
use gridded_fetcher::utils::parse_coordinate;

fn month_of_images(step_hours: i64) -> Vec<Image> {
    let start: DateTime<Utc> = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    let count = 31 * 24 / step_hours;
    (0..count)
        .map(|i| Image::asset("gldas", "Rainf_f_tavg", start + Duration::hours(i * step_hours)))
        .collect()
}

fn station_ids(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("USC{:08}", i)).collect()
}

fn benchmark_temporal_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("temporal_aggregation");

    let datasets = [
        (
            "three_hourly_land_surface",
            3,
            DatasetDescriptor::new("GLDAS", "gldas", "Rainf_f_tavg", TimeScale::ThreeHourly)
                .with_family(DatasetFamily::LandSurface)
                .with_conversion_factor(86_400.0),
        ),
        (
            "hourly_rate",
            1,
            DatasetDescriptor::new("GSMAP", "gsmap", "hourlyPrecipRate", TimeScale::Hourly)
                .with_family(DatasetFamily::RateHourly),
        ),
    ];

    for (label, step, dataset) in datasets.iter() {
        let aggregator = TemporalAggregator::for_dataset(dataset);
        let images = month_of_images(*step);
        group.bench_with_input(BenchmarkId::new("month", label), &images, |b, images| {
            b.iter(|| aggregator.aggregate(black_box(images.clone())))
        });
    }

    group.finish();
}

fn benchmark_result_assembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("result_assembly");

    for station_count in [10, 100, 500].iter() {
        let stations = station_ids(*station_count);
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let samples: Vec<DatedSamples> = (0..366)
            .map(|d| {
                let values: StationValues = stations
                    .iter()
                    .enumerate()
                    .map(|(i, id)| (id.clone(), (d + i) as f64 * 0.1))
                    .collect();
                DatedSamples::new(start + Duration::days(d as i64), values)
            })
            .collect();

        group.bench_with_input(
            BenchmarkId::new("year", station_count),
            &samples,
            |b, samples| {
                b.iter(|| {
                    let mut assembler =
                        ResultAssembler::new(2020, 2020, stations.clone()).unwrap();
                    for dated in samples.iter().cloned() {
                        assembler.write_samples(dated);
                    }
                    black_box(assembler.finish())
                })
            },
        );
    }

    group.finish();
}

fn benchmark_coordinate_parsing(c: &mut Criterion) {
    c.bench_function("parse_coordinate", |b| {
        b.iter(|| {
            let lat = parse_coordinate(black_box("40:02:07")).unwrap();
            let lon = parse_coordinate(black_box("105:16:49W")).unwrap();
            black_box((lat, lon))
        })
    });
}

criterion_group!(
    benches,
    benchmark_temporal_aggregation,
    benchmark_result_assembly,
    benchmark_coordinate_parsing
);
criterion_main!(benches);
