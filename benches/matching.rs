use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use specmatch::baseline::estimate_baseline;
use specmatch::library::ReferenceLibrary;
use specmatch::resample::resample;
use specmatch::score::{score_all, DEFAULT_RESOLUTION};
use specmatch::spectrum::Spectrum;

/// A realistic Raman-like trace: a few Gaussian bands on a fluorescence
/// ramp with deterministic pseudo-noise.
fn synthetic_spectrum(points: usize, seed: u64) -> Spectrum {
    let bands = [
        (464.0, 30.0, 1.0),
        (1086.0, 20.0, 0.7),
        (1332.0, 15.0, 0.4),
    ];
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
    let x: Vec<f64> = (0..points)
        .map(|i| 150.0 + 2400.0 * i as f64 / points as f64)
        .collect();
    let y: Vec<f64> = x
        .iter()
        .map(|&xi| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let noise = (state >> 40) as f64 / (1u64 << 24) as f64 * 0.01;
            let signal: f64 = bands
                .iter()
                .map(|&(center, width, height)| {
                    height * (-((xi - center) / width).powi(2)).exp()
                })
                .sum();
            0.05 + 2e-4 * xi + signal + noise
        })
        .collect();
    Spectrum::new(x, y).unwrap()
}

/// Benchmark the asymmetric least squares baseline at spectrum lengths
/// from a quick handheld scan to a long research acquisition.
fn bench_baseline(c: &mut Criterion) {
    let mut group = c.benchmark_group("baseline");
    for points in [500, 2000, 8000] {
        let spectrum = synthetic_spectrum(points, 7);
        group.throughput(Throughput::Elements(points as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}pts", points)),
            &spectrum,
            |b, spectrum| {
                b.iter(|| {
                    estimate_baseline(black_box(spectrum.y()), 1e5, 1e-3, 10).unwrap()
                })
            },
        );
    }
    group.finish();
}

/// Benchmark spline resampling onto the default scoring grid.
fn bench_resample(c: &mut Criterion) {
    let mut group = c.benchmark_group("resample");
    for points in [500, 2000] {
        let spectrum = synthetic_spectrum(points, 11);
        group.throughput(Throughput::Elements(points as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}pts", points)),
            &spectrum,
            |b, spectrum| {
                b.iter(|| {
                    resample(
                        black_box(spectrum.x()),
                        black_box(spectrum.y()),
                        200.0,
                        2500.0,
                        DEFAULT_RESOLUTION,
                    )
                    .unwrap()
                })
            },
        );
    }
    group.finish();
}

/// Benchmark batch scoring against libraries of increasing size.
fn bench_score_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("score_all");
    group.sample_size(10);

    let query = synthetic_spectrum(1200, 3);
    for entries in [50, 200, 500] {
        let mut library = ReferenceLibrary::new();
        for i in 0..entries {
            library.insert(
                format!("Mineral{i:04}__780__R{i:06}"),
                synthetic_spectrum(900, i as u64),
            );
        }
        group.throughput(Throughput::Elements(entries as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}entries", entries)),
            &library,
            |b, library| {
                b.iter(|| score_all(black_box(&query), library, DEFAULT_RESOLUTION))
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_baseline, bench_resample, bench_score_all);
criterion_main!(benches);
