use criterion::{Criterion, criterion_group, criterion_main};
use lamina_engine::{Engine, EngineConfig, Matrix, Rntm, ScalarVal};

fn square_f64(c: &mut Criterion) {
    let engine = Engine::new(EngineConfig { enable_sup: false, ..EngineConfig::default() });
    let mut group = c.benchmark_group("gemm_f64");
    for &n in &[64usize, 128, 256, 512] {
        let a = Matrix::<f64>::from_fn(n, n, |i, j| ((i + j) as f64 * 0.01).sin());
        let b = Matrix::<f64>::from_fn(n, n, |i, j| ((i * 3 + j) as f64 * 0.01).cos());
        let mut out = Matrix::<f64>::zeros(n, n);
        group.bench_function(format!("{n}x{n}"), |bench| {
            bench.iter(|| {
                engine
                    .gemm(
                        ScalarVal::ONE,
                        &a.obj(),
                        &b.obj(),
                        ScalarVal::ZERO,
                        &out.obj_mut(),
                        None,
                        None,
                    )
                    .unwrap();
            });
        });
    }
    group.finish();
}

fn square_f64_threads(c: &mut Criterion) {
    let engine = Engine::new(EngineConfig { enable_sup: false, ..EngineConfig::default() });
    let rntm = Rntm::with_num_threads(4);
    let n = 384;
    let a = Matrix::<f64>::from_fn(n, n, |i, j| ((i + j) as f64 * 0.01).sin());
    let b = Matrix::<f64>::from_fn(n, n, |i, j| ((i * 3 + j) as f64 * 0.01).cos());
    let mut out = Matrix::<f64>::zeros(n, n);
    c.bench_function("gemm_f64_384_nt4", |bench| {
        bench.iter(|| {
            engine
                .gemm(
                    ScalarVal::ONE,
                    &a.obj(),
                    &b.obj(),
                    ScalarVal::ZERO,
                    &out.obj_mut(),
                    None,
                    Some(&rntm),
                )
                .unwrap();
        });
    });
}

criterion_group!(benches, square_f64, square_f64_threads);
criterion_main!(benches);
