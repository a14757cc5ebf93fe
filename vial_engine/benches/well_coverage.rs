//! Well coverage benchmark.
//!
//! Measures the lookups every plunger command performs before it moves:
//! - wells covered by a full 96-channel head on a 384 plate
//! - wells covered by an 8-channel column on a 12-column reservoir
//! - nozzles entering each reservoir well

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use vial_common::nozzle::{NozzleLayout, NozzleMap, PhysicalNozzleGrid};
use vial_engine::well_math;

fn wells_by_column(rows: usize, columns: usize) -> Vec<Vec<String>> {
    (0..columns)
        .map(|c| {
            (0..rows)
                .map(|r| format!("{}{}", char::from(b'A' + r as u8), c + 1))
                .collect()
        })
        .collect()
}

fn bench_dense_96_on_384(c: &mut Criterion) {
    let grid = PhysicalNozzleGrid::for_channels(96).unwrap();
    let map = NozzleMap::full(&grid).unwrap();
    let plate = wells_by_column(16, 24);
    c.bench_function("wells_covered_96_on_384", |b| {
        b.iter(|| well_math::wells_covered(black_box(&map), black_box("B2"), &plate).unwrap())
    });
}

fn bench_column_on_reservoir(c: &mut Criterion) {
    let grid = PhysicalNozzleGrid::for_channels(96).unwrap();
    let map = NozzleMap::from_layout(
        &grid,
        &NozzleLayout::Column {
            primary_nozzle: "A1".to_string(),
        },
    )
    .unwrap();
    let reservoir = wells_by_column(1, 12);
    c.bench_function("wells_covered_column_on_reservoir", |b| {
        b.iter(|| {
            well_math::wells_covered(black_box(&map), black_box("A6"), &reservoir).unwrap()
        })
    });
    c.bench_function("nozzles_per_well_column_on_reservoir", |b| {
        b.iter(|| {
            well_math::nozzles_per_well(black_box(&map), black_box("A6"), &reservoir).unwrap()
        })
    });
}

criterion_group!(benches, bench_dense_96_on_384, bench_column_on_reservoir);
criterion_main!(benches);
