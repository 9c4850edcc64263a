//! Property-based tests for batch generation using proptest.

use proptest::prelude::*;

use matchpack_core::{
    BatchGenerator, BatchIndexer, Column, ColumnSpec, DataPack, EntityTable, Feature, FeatureKind,
    Labels, PointGenerator, Relation, RelationTable, Stage, Task,
};

/// A pack with `n_left` queries, `n_right` documents, and one relation per label.
fn build_pack(labels: &[u8], n_left: usize, n_right: usize) -> DataPack {
    let mut left = EntityTable::builder(vec![ColumnSpec::new("length_left", FeatureKind::Int)]);
    for i in 0..n_left {
        left.push_row(format!("q{i}"), vec![Feature::Int(i as i64)])
            .unwrap();
    }
    let mut right = EntityTable::builder(vec![ColumnSpec::new("score_right", FeatureKind::Float)]);
    for i in 0..n_right {
        right
            .push_row(format!("d{i}"), vec![Feature::Float(i as f64)])
            .unwrap();
    }
    let relation: RelationTable = labels
        .iter()
        .enumerate()
        .map(|(i, &l)| {
            Relation::labeled(format!("q{}", i % n_left), format!("d{}", i % n_right), l as f64)
        })
        .collect();
    DataPack::new(relation, left.build().unwrap(), right.build().unwrap(), Stage::Train).unwrap()
}

fn id_column(batch_ids: &Column) -> Vec<String> {
    batch_ids.as_texts().unwrap().to_vec()
}

// --- Index coverage ---

proptest! {
    #[test]
    fn batches_cover_every_row_once(
        num_rows in 0usize..200,
        batch_size in 1usize..40,
        shuffle in any::<bool>(),
        seed in any::<u64>(),
    ) {
        let mut indexer = BatchIndexer::new(batch_size, num_rows, shuffle, Some(seed)).unwrap();
        let mut seen = Vec::new();
        for i in 0..indexer.num_batches() {
            let batch = indexer.batch_indices(i).unwrap();
            prop_assert!(!batch.is_empty());
            prop_assert!(batch.len() <= batch_size);
            seen.extend_from_slice(batch);
        }
        prop_assert_eq!(seen.len(), num_rows);
        seen.sort_unstable();
        prop_assert_eq!(seen, (0..num_rows).collect::<Vec<_>>());
    }

    #[test]
    fn unshuffled_order_is_identity(
        num_rows in 1usize..100,
        batch_size in 1usize..20,
    ) {
        let mut a = BatchIndexer::new(batch_size, num_rows, false, None).unwrap();
        let mut flat = Vec::new();
        for _ in 0..a.num_batches() {
            flat.extend(a.next_indices().unwrap());
        }
        prop_assert_eq!(flat, (0..num_rows).collect::<Vec<_>>());
    }
}

// --- Label encodings ---

proptest! {
    #[test]
    fn one_hot_rows_are_valid(
        labels in prop::collection::vec(0u8..5, 1..60),
        batch_size in 1usize..16,
    ) {
        let pack = build_pack(&labels, 3, 4);
        let mut generator = PointGenerator::new(pack, Task::classification(5).unwrap(), batch_size, true).unwrap();
        for batch in generator.epoch() {
            let batch = batch.unwrap();
            let Some(Labels::OneHot(rows)) = batch.labels else {
                return Err(TestCaseError::fail("expected one-hot labels"));
            };
            prop_assert_eq!(rows.len(), batch.features.num_rows());
            for row in rows {
                prop_assert_eq!(row.len(), 5);
                prop_assert!(row.iter().all(|&v| v == 0.0 || v == 1.0));
                prop_assert_eq!(row.iter().sum::<f32>(), 1.0);
            }
        }
    }

    #[test]
    fn ranking_labels_match_relation(
        labels in prop::collection::vec(any::<u8>(), 1..60),
        batch_size in 1usize..16,
        seed in any::<u64>(),
    ) {
        let pack = build_pack(&labels, 4, 3);
        let mut generator = PointGenerator::with_seed(pack, Task::Ranking, batch_size, true, Some(seed)).unwrap();
        for i in 0..generator.len() {
            let indices = generator.indexer_mut().batch_indices(i).unwrap().to_vec();
            let batch = generator.get(i).unwrap();
            let expected: Vec<f32> = indices.iter().map(|&r| labels[r] as f32).collect();
            prop_assert_eq!(batch.labels, Some(Labels::Scalar(expected)));
        }
    }
}

// --- Shuffling ---

proptest! {
    #[test]
    fn shuffle_preserves_served_id_multiset(
        labels in prop::collection::vec(0u8..2, 1..80),
        batch_size in 1usize..12,
        seed in any::<u64>(),
    ) {
        let pack = std::sync::Arc::new(build_pack(&labels, 5, 7));
        let collect = |shuffle: bool| {
            let mut generator = PointGenerator::with_seed(
                std::sync::Arc::clone(&pack), Task::Ranking, batch_size, shuffle, Some(seed),
            ).unwrap();
            let mut ids = Vec::new();
            for batch in generator.epoch() {
                let batch = batch.unwrap();
                let left = id_column(batch.features.get("id_left").unwrap());
                let right = id_column(batch.features.get("id_right").unwrap());
                ids.extend(left.into_iter().zip(right));
            }
            ids.sort();
            ids
        };
        prop_assert_eq!(collect(true), collect(false));
    }

    #[test]
    fn seeded_runs_are_reproducible(
        labels in prop::collection::vec(0u8..2, 1..50),
        batch_size in 1usize..8,
        seed in any::<u64>(),
    ) {
        let pack = std::sync::Arc::new(build_pack(&labels, 2, 3));
        let mut a = PointGenerator::with_seed(std::sync::Arc::clone(&pack), Task::Ranking, batch_size, true, Some(seed)).unwrap();
        let mut b = PointGenerator::with_seed(std::sync::Arc::clone(&pack), Task::Ranking, batch_size, true, Some(seed)).unwrap();
        for _ in 0..(2 * a.len() + 1) {
            prop_assert_eq!(a.next_batch().unwrap(), b.next_batch().unwrap());
        }
    }
}
