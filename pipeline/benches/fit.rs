use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use elastictrack::metrics::Metrics;
use elastictrack::model::{ElasticNet, InferenceModel};
use ndarray::{Array1, Array2};

/// Wine-shaped synthetic data: `n` rows, 11 features, a noisy linear target.
fn synthetic(n: usize) -> (Array2<f64>, Array1<f64>) {
    let x = Array2::from_shape_fn((n, 11), |(i, j)| {
        ((i * 31 + j * 17) % 97) as f64 / 97.0 + j as f64
    });
    let y = Array1::from_shape_fn(n, |i| {
        let row = x.row(i);
        5.0 + 0.3 * row[0] - 0.2 * row[5] + 0.1 * row[10] + ((i % 7) as f64 - 3.0) * 0.05
    });
    (x, y)
}

fn bench_fit(c: &mut Criterion) {
    for size in [100, 1000, 5000].iter() {
        let (x, y) = synthetic(*size);
        c.bench_with_input(BenchmarkId::new("elastic_net_fit", size), size, |b, _| {
            b.iter(|| {
                let model = ElasticNet::new(0.5, 0.5)
                    .fit(black_box(x.view()), black_box(y.view()))
                    .unwrap();
                black_box(model);
            });
        });
    }
}

fn bench_predict(c: &mut Criterion) {
    let (x, y) = synthetic(5000);
    let model = ElasticNet::new(0.5, 0.5).fit(x.view(), y.view()).unwrap();
    c.bench_function("elastic_net_predict_5000", |b| {
        b.iter(|| black_box(model.predict_batch(black_box(x.view())).unwrap()));
    });
}

fn bench_calculate_all(c: &mut Criterion) {
    for size in [100, 1000, 10000, 100000].iter() {
        c.bench_with_input(BenchmarkId::new("calculate_all", size), size, |b, &n| {
            let y_true = Array1::from_shape_fn(n, |i| i as f64 * 0.1);
            let y_pred = Array1::from_shape_fn(n, |i| i as f64 * 0.1 + 0.5);

            b.iter(|| {
                let metrics =
                    Metrics::calculate_all(black_box(y_true.view()), black_box(y_pred.view()));
                black_box(metrics)
            });
        });
    }
}

criterion_group!(benches, bench_fit, bench_predict, bench_calculate_all);
criterion_main!(benches);
