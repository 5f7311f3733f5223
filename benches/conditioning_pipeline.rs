use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use emg_speech::augment::Augmentor;
use emg_speech::config::AugmentConfig;
use emg_speech::processing::BandpassFilter;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;

const WINDOW_LENGTHS: &[usize] = &[1000, 3000, 6000];

fn benchmark_bandpass(c: &mut Criterion) {
    let mut group = c.benchmark_group("bandpass");
    let filter = BandpassFilter::new(1000.0, 20.0, 450.0, 4).unwrap();

    for &length in WINDOW_LENGTHS {
        group.throughput(Throughput::Elements(length as u64));
        let signal: Vec<f32> = (0..length).map(|i| (i as f32 * 0.17).sin()).collect();

        group.bench_with_input(
            BenchmarkId::new("filtfilt", length),
            &signal,
            |b, signal| {
                b.iter(|| filter.apply(black_box(signal)).unwrap());
            },
        );
    }
    group.finish();
}

fn benchmark_condition_window(c: &mut Criterion) {
    let mut group = c.benchmark_group("condition_window");
    let filter = BandpassFilter::new(1000.0, 20.0, 450.0, 4).unwrap();

    for &length in WINDOW_LENGTHS {
        group.throughput(Throughput::Elements((4 * length) as u64));
        let window = Array2::from_shape_fn((4, length), |(c, t)| ((t + c) as f32 * 0.11).sin());

        group.bench_with_input(BenchmarkId::new("4ch", length), &window, |b, window| {
            b.iter(|| filter.condition_window(black_box(window)).unwrap());
        });
    }
    group.finish();
}

fn benchmark_augmentation(c: &mut Criterion) {
    let mut group = c.benchmark_group("augmentation");
    let augmentor = Augmentor::new(AugmentConfig {
        transform_probability: 1.0,
        ..AugmentConfig::default()
    })
    .unwrap();

    for &length in WINDOW_LENGTHS {
        group.throughput(Throughput::Elements((4 * length) as u64));
        let window = Array2::from_shape_fn((4, length), |(c, t)| ((t + c) as f32 * 0.07).sin());

        group.bench_with_input(BenchmarkId::new("full_pipeline", length), &window, |b, window| {
            let mut rng = StdRng::seed_from_u64(0);
            b.iter(|| augmentor.apply(black_box(window), &mut rng));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_bandpass,
    benchmark_condition_window,
    benchmark_augmentation
);
criterion_main!(benches);
