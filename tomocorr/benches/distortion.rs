//! Run with: cargo bench -p tomocorr --bench distortion

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tomocorr::{
    BackendPreference, DistortionCorrector, DistortionField, DistortionModel, DistortionParams,
    Preview, ProcessingContext, Volume,
};

fn distortion_benchmarks(c: &mut Criterion) {
    let (slices, height, width) = (8, 256, 320);
    let volume = Volume::from_fn([slices, height, width], |z, y, x| {
        ((z * 31 + y * 13 + x * 5) % 4001) as f32
    });
    let coefficients = vec![1.0, 0.0, 1.5e-6];

    let mut group = c.benchmark_group("distortion_correction");
    group.sample_size(10);
    group.throughput(Throughput::Elements((slices * height * width) as u64));

    let model = DistortionModel::new(160.0, 128.0, coefficients.clone());
    group.bench_function("field", |b| {
        b.iter(|| black_box(DistortionField::build(black_box(&model), height, width)))
    });

    let params = DistortionParams::from_model(160.0, 128.0, coefficients, Preview::default())
        .with_crop(4);

    let cpu = DistortionCorrector::new(ProcessingContext::cpu_only());
    group.bench_function(BenchmarkId::new("correct", "cpu"), |b| {
        b.iter(|| black_box(cpu.correct(volume.clone(), &params)))
    });

    let ctx = ProcessingContext::new();
    if ctx.has_gpu() {
        let gpu = DistortionCorrector::new(ctx);
        let gpu_params = params.clone().with_backend(BackendPreference::Gpu);
        group.bench_function(BenchmarkId::new("correct", "gpu"), |b| {
            b.iter(|| black_box(gpu.correct(volume.clone(), &gpu_params)))
        });
    }

    group.finish();
}

criterion_group!(benches, distortion_benchmarks);
criterion_main!(benches);
