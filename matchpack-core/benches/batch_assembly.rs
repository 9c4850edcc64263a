use criterion::{Criterion, black_box, criterion_group, criterion_main};
use matchpack_core::{
    BasicPreprocessor, BatchGenerator, PointGenerator, Preprocessor, RawRecord, Task,
};
use std::sync::Arc;

fn corpus(n: usize) -> Vec<RawRecord> {
    (0..n)
        .map(|i| {
            RawRecord::labeled(
                format!("query number {} about topic {}", i % 97, i % 13),
                format!("document {i} discussing topic {} at some length", i % 13),
                (i % 2) as f64,
            )
        })
        .collect()
}

fn bench_preprocess(c: &mut Criterion) {
    let records = corpus(2_000);
    c.bench_function("basic_preprocessor_fit_transform_2k", |b| {
        b.iter(|| {
            let mut pre = BasicPreprocessor::default();
            pre.fit_transform(black_box(&records)).map(|p| p.len())
        })
    });
}

fn bench_point_batches(c: &mut Criterion) {
    let mut pre = BasicPreprocessor::default();
    let pack = Arc::new(pre.fit_transform(&corpus(10_000)).expect("fit_transform"));

    c.bench_function("point_batch_classification_bs64", |b| {
        let mut generator =
            PointGenerator::with_seed(Arc::clone(&pack), Task::default(), 64, true, Some(0))
                .expect("generator");
        b.iter(|| generator.next_batch().map(|batch| batch.features.num_rows()))
    });

    c.bench_function("point_batch_ranking_bs256", |b| {
        let mut generator =
            PointGenerator::with_seed(Arc::clone(&pack), Task::Ranking, 256, true, Some(0))
                .expect("generator");
        b.iter(|| generator.next_batch().map(|batch| batch.features.num_rows()))
    });
}

criterion_group!(benches, bench_preprocess, bench_point_batches);
criterion_main!(benches);
