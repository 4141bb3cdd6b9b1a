//! Benchmarks for tile resampling and grid planning.
//!
//! Run with: `cargo bench`
//!
//! These benchmarks measure the critical hot paths:
//! - Resampling one tile out of a multi-raster mosaic
//! - Reprojecting resampling
//! - Tile size search and grid enumeration

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use rastertree::{
    compute_optimal_tile_size, resample_tile, Crs, Envelope, Interpolation, Mosaic,
    MosaicBuilder, OriginLocation, Raster, TileGrid,
};

fn utm() -> Crs {
    Crs::from_epsg(32633).unwrap()
}

/// 2x2 block of 512x512 gradient rasters over `[0, 0, 1024, 1024]`
fn quadrant_mosaic() -> Mosaic {
    let builder = MosaicBuilder::new(utm());
    for (x, y) in [(0.0, 0.0), (512.0, 0.0), (0.0, 512.0), (512.0, 512.0)] {
        let env = Envelope::from_corners(x, y, x + 512.0, y + 512.0, utm());
        let mut raster = Raster::filled(512, 512, env, &[0.0]);
        for row in 0..512 {
            for col in 0..512 {
                let (px, py) = raster.pixel_center(col, row);
                raster.pixel_mut(col, row)[0] = (px + py) as f32;
            }
        }
        builder.add(raster);
    }
    builder.finish()
}

/// Benchmark one 256x256 tile straddling all four rasters
fn bench_resample_tile(c: &mut Criterion) {
    let mosaic = quadrant_mosaic();
    let target = Envelope::from_corners(256.0, 256.0, 768.0, 768.0, utm());

    let mut group = c.benchmark_group("resample_tile");
    for interpolation in [Interpolation::NearestNeighbor, Interpolation::Bilinear] {
        group.bench_with_input(
            BenchmarkId::new("interpolation", format!("{interpolation:?}")),
            &interpolation,
            |b, &interpolation| {
                b.iter(|| {
                    resample_tile(black_box(&mosaic), &target, 256, 256, interpolation, &[0.0]).unwrap()
                });
            },
        );
    }
    group.finish();
}

/// Benchmark resampling into another CRS
fn bench_reprojected_tile(c: &mut Criterion) {
    let builder = MosaicBuilder::new(utm());
    builder.add(Raster::filled(
        512,
        512,
        Envelope::from_corners(500_000.0, 5_700_000.0, 505_120.0, 5_705_120.0, utm()),
        &[1.0],
    ));
    let mosaic = builder.finish();
    let mercator = Crs::from_epsg(3857).unwrap();
    let target = mosaic.envelope().unwrap().reproject(mercator).unwrap();

    c.bench_function("resample_tile_reprojected_256", |b| {
        b.iter(|| {
            resample_tile(black_box(&mosaic), &target, 256, 256, Interpolation::Bilinear, &[0.0]).unwrap()
        });
    });
}

/// Benchmark tile size search and grid enumeration
fn bench_grid(c: &mut Criterion) {
    let envelope = Envelope::from_corners(0.0, 0.0, 150_000.0, 70_000.0, utm());

    c.bench_function("compute_optimal_tile_size", |b| {
        b.iter(|| compute_optimal_tile_size(black_box(150_000), black_box(70_000), &envelope, 1024).unwrap());
    });

    c.bench_function("tile_grid_enumeration", |b| {
        b.iter(|| {
            TileGrid::new(black_box(envelope), 256, 1.0, OriginLocation::Outer)
                .unwrap()
                .tiles()
        });
    });
}

criterion_group!(benches, bench_resample_tile, bench_reprojected_tile, bench_grid);
criterion_main!(benches);
