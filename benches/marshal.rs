//! Marshalling benchmarks
//!
//! Measures the cost of building runtime containers and of a full facade
//! call against the recording host.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use plotbridge::runtime::Marshaller;
use plotbridge::{keywords, Plot, RecordingHost, Session, SessionOptions};

fn series(len: usize) -> Vec<f64> {
    (0..len).map(|i| (i as f64 * 0.01).sin()).collect()
}

fn bench_sequences(c: &mut Criterion) {
    let host = RecordingHost::new();
    let session = Session::open(&host, &SessionOptions::default()).unwrap();
    let marshal = Marshaller::new(&session);

    let mut group = c.benchmark_group("sequence");
    for len in [16, 256, 4096].iter() {
        let values = series(*len);
        group.bench_with_input(BenchmarkId::from_parameter(len), &values, |b, values| {
            b.iter(|| black_box(marshal.sequence(values).unwrap()));
        });
    }
    group.finish();
}

fn bench_keywords(c: &mut Criterion) {
    let host = RecordingHost::new();
    let session = Session::open(&host, &SessionOptions::default()).unwrap();
    let marshal = Marshaller::new(&session);
    let options = keywords([("alpha", "0.3"), ("color", "blue"), ("label", "band"), ("zorder", "2")]);
    let table = &[("alpha", plotbridge::runtime::Coercion::Float)];

    c.bench_function("keyword_map", |b| {
        b.iter(|| black_box(marshal.keyword_map(&options, table).unwrap()));
    });
}

fn bench_plot_call(c: &mut Criterion) {
    let host = RecordingHost::new();
    let session = Session::open(&host, &SessionOptions::default()).unwrap();
    let plt = Plot::new(&session);

    let mut group = c.benchmark_group("plot_call");
    for len in [16, 1024].iter() {
        let x = series(*len);
        let y: Vec<f64> = x.iter().map(|v| v * v).collect();
        let options = keywords([("label", "squares")]);
        group.bench_with_input(BenchmarkId::from_parameter(len), len, |b, _| {
            b.iter(|| {
                plt.plot(&x, &y, "r--", &options).unwrap();
                host.clear_calls();
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_sequences, bench_keywords, bench_plot_call);
criterion_main!(benches);
