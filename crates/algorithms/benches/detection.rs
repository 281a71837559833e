//! Benchmarks for the detection pipeline and its heaviest stages

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use clearcut_algorithms::clustering::{cluster_pixels, ClusterParams};
use clearcut_algorithms::detection::DetectionMethod;
use clearcut_algorithms::morphology::{refine_mask, RefineParams};
use clearcut_core::{Band, BinaryMask, ClusterLinking, DetectionConfig, GeoTransform, ImageEpoch, Raster};

fn create_epoch(size: usize, cleared: bool) -> ImageEpoch {
    let transform = GeoTransform::new(0.0, size as f64, 1.0, -1.0);
    let mut epoch = ImageEpoch::new("bench", "2024-01-01", size, size, transform);
    let forest = [0.0, 0.04, 0.36, 0.44];
    let bare = [0.04, 0.18, 0.22, 0.88];
    for (slot, band) in Band::REQUIRED.into_iter().enumerate() {
        let mut r = Raster::new(size, size);
        r.set_transform(transform);
        for row in 0..size {
            for col in 0..size {
                // Patches of clearing on a 64-pixel lattice
                let in_patch = cleared && (row % 64) < 24 && (col % 64) < 24;
                let jitter = ((row * 7 + col * 13) % 17) as f64 * 0.0005;
                let base = if in_patch { bare[slot] } else { forest[slot] };
                r.set(row, col, base + jitter).unwrap();
            }
        }
        epoch.insert(band, r).unwrap();
    }
    epoch
}

fn speckled_mask(size: usize) -> BinaryMask {
    BinaryMask::from_fn(size, size, |r, c| {
        ((r % 64) < 24 && (c % 64) < 24) || (r * 31 + c * 17) % 97 == 0
    })
}

fn bench_detect(c: &mut Criterion) {
    let mut group = c.benchmark_group("detection/consensus");
    group.sample_size(10);
    let config = DetectionConfig::default();
    for size in [256, 512, 1024] {
        let before = create_epoch(size, false);
        let after = create_epoch(size, true);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                DetectionMethod::Consensus
                    .detect(black_box(&before), black_box(&after), &config)
                    .unwrap()
            })
        });
    }
    group.finish();
}

fn bench_refine(c: &mut Criterion) {
    let mut group = c.benchmark_group("detection/refine");
    let params = RefineParams::default();
    for size in [256, 512, 1024] {
        let mask = speckled_mask(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| refine_mask(black_box(&mask), &params).unwrap())
        });
    }
    group.finish();
}

fn bench_cluster(c: &mut Criterion) {
    let mut group = c.benchmark_group("detection/cluster");
    let mask = speckled_mask(1024);
    for (name, linking) in [
        ("raster", ClusterLinking::RasterAdjacency),
        ("distance", ClusterLinking::DistanceBounded),
    ] {
        let params = ClusterParams {
            linking,
            ..ClusterParams::default()
        };
        group.bench_function(name, |b| {
            b.iter(|| cluster_pixels(black_box(&mask), &params).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_detect, bench_refine, bench_cluster);
criterion_main!(benches);
