use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use csv::StringRecord;
use std::collections::HashSet;
use std::path::PathBuf;
use transit_weather_etl::models::{TransportEvent, TransportOperator};
use transit_weather_etl::processors::{
    build_region_mapping, normalize, DedupTracker, ReferentialFilter,
};
use transit_weather_etl::readers::RawBatch;

const CANTONS: [&str; 6] = ["ZH", "BE", "LU", "GR", "VS", "TI"];

// Operators repeat heavily in real event exports: a few hundred ids over millions of rows
fn create_operator_rows(rows: usize, distinct: usize) -> Vec<TransportOperator> {
    (0..rows)
        .map(|i| TransportOperator {
            operator_id: format!("85:{}", i % distinct),
            abbreviation: Some("SBB".to_string()),
            name: None,
        })
        .collect()
}

fn create_event_batch(rows: usize) -> RawBatch {
    let headers = StringRecord::from(vec![
        "BETRIEBSTAG",
        "BPUIC",
        "PRODUKT_ID",
        "ANKUNFTSZEIT",
        "ABFAHRTSZEIT",
        "FAELLT_AUS_TF",
    ]);
    let records = (0..rows)
        .map(|i| {
            let bpuic = (8500000 + i % 2000).to_string();
            StringRecord::from(vec![
                "15.01.2024",
                bpuic.as_str(),
                "Zug",
                "15.01.2024 06:58",
                "15.01.2024 07:02",
                "false",
            ])
        })
        .collect();

    RawBatch {
        source: PathBuf::from("bench.csv"),
        index: 0,
        headers,
        records,
    }
}

fn benchmark_dedup_tracker(c: &mut Criterion) {
    let batches: Vec<Vec<TransportOperator>> = (0..10).map(|_| create_operator_rows(10_000, 400)).collect();

    c.bench_function("dedup_tracker_10x10k", |b| {
        b.iter(|| {
            let mut tracker = DedupTracker::new("transportoperator");
            let mut kept = 0;
            for batch in &batches {
                kept += tracker.filter(batch.clone(), |o| o.operator_id.clone()).rows.len();
            }
            black_box(kept)
        })
    });
}

fn benchmark_referential_filter(c: &mut Criterion) {
    let parents: HashSet<i64> = (8500000..8501000).collect();
    let filter = ReferentialFilter::new("transportstation", parents);
    let rows: Vec<i64> = (0..100_000).map(|i| 8500000 + (i % 2000)).collect();

    c.bench_function("referential_filter_100k", |b| {
        b.iter(|| black_box(filter.retain(rows.clone(), |r| *r).orphans))
    });
}

fn benchmark_normalize_events(c: &mut Criterion) {
    let batch = create_event_batch(50_000);

    c.bench_function("normalize_events_50k", |b| {
        b.iter(|| {
            let events: Vec<TransportEvent> = normalize(&batch).unwrap();
            black_box(events.len())
        })
    });
}

fn benchmark_canton_join(c: &mut Criterion) {
    let mut group = c.benchmark_group("canton_join_by_size");

    for &size in &[1_000, 10_000, 50_000] {
        group.bench_with_input(BenchmarkId::new("transport_stations", size), &size, |b, &count| {
            let weather: Vec<(String, Option<String>)> = (0..160)
                .map(|i| (format!("Station {}", i), Some(CANTONS[i % CANTONS.len()].to_string())))
                .collect();
            let transport: Vec<(i64, Option<String>)> = (0..count)
                .map(|i| (8500000 + i as i64, Some(CANTONS[i % CANTONS.len()].to_string())))
                .collect();

            b.iter(|| black_box(build_region_mapping(&weather, &transport).len()))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_dedup_tracker,
    benchmark_referential_filter,
    benchmark_normalize_events,
    benchmark_canton_join
);
criterion_main!(benches);
