//! Batch generators over relation rows.
//!
//! A [`BatchIndexer`] owns the index order of one epoch. It starts idle,
//! draws a (optionally shuffled) permutation of `0..num_rows` on first use,
//! serves contiguous slices of it as batches, and draws a fresh permutation
//! each time it is reset. Concrete generators implement
//! [`BatchGenerator::batch_of_samples`] to turn an index slice into a batch.

pub mod point;

pub use point::{FeatureBatch, Labels, PointBatch, PointGenerator};

use crate::error::PackError;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Lifecycle of a [`BatchIndexer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexerState {
    /// Constructed; no index order drawn yet.
    Idle,
    /// Index order drawn; no batch served from it yet.
    Ready,
    /// At least one batch of the current order has been served.
    Serving,
}

/// Index bookkeeping shared by all generators.
#[derive(Debug, Clone)]
pub struct BatchIndexer {
    batch_size: usize,
    num_rows: usize,
    shuffle: bool,
    seed: Option<u64>,
    epoch: u64,
    index_array: Option<Vec<usize>>,
    cursor: usize,
    serving: bool,
}

impl BatchIndexer {
    pub fn new(
        batch_size: usize,
        num_rows: usize,
        shuffle: bool,
        seed: Option<u64>,
    ) -> Result<Self, PackError> {
        if batch_size == 0 {
            return Err(PackError::config("batch_size must be at least 1"));
        }
        Ok(Self {
            batch_size,
            num_rows,
            shuffle,
            seed,
            epoch: 0,
            index_array: None,
            cursor: 0,
            serving: false,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    /// Number of index orders drawn so far.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Batches per epoch; the last one may be short.
    pub fn num_batches(&self) -> usize {
        self.num_rows.div_ceil(self.batch_size)
    }

    pub fn state(&self) -> IndexerState {
        match (&self.index_array, self.serving) {
            (None, _) => IndexerState::Idle,
            (Some(_), false) => IndexerState::Ready,
            (Some(_), true) => IndexerState::Serving,
        }
    }

    /// Draw a new index order for the next epoch.
    ///
    /// With a seed, the permutation of the n-th draw is derived from
    /// `seed + n`, so the whole sequence of epochs is reproducible.
    pub fn reset(&mut self) {
        let mut index_array: Vec<usize> = (0..self.num_rows).collect();
        if self.shuffle {
            let mut rng = match self.seed {
                Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(self.epoch)),
                None => StdRng::from_entropy(),
            };
            index_array.shuffle(&mut rng);
        }
        tracing::debug!(
            epoch = self.epoch,
            rows = self.num_rows,
            shuffle = self.shuffle,
            "Drew batch index order"
        );
        self.index_array = Some(index_array);
        self.epoch += 1;
        self.cursor = 0;
        self.serving = false;
    }

    /// Relation row indices of batch `index` in the current epoch.
    pub fn batch_indices(&mut self, index: usize) -> Result<&[usize], PackError> {
        let len = self.num_batches();
        if index >= len {
            return Err(PackError::BatchOutOfRange { index, len });
        }
        if self.index_array.is_none() {
            self.reset();
        }
        let start = index * self.batch_size;
        let end = (start + self.batch_size).min(self.num_rows);
        self.serving = true;
        match &self.index_array {
            Some(indices) => Ok(&indices[start..end]),
            None => Err(PackError::integrity("index order missing after reset")),
        }
    }

    /// Indices of the next batch in flow order.
    ///
    /// After the last batch of an epoch the indexer resets and wraps to
    /// batch 0 of a freshly drawn order.
    pub fn next_indices(&mut self) -> Result<Vec<usize>, PackError> {
        let len = self.num_batches();
        if len == 0 {
            return Err(PackError::BatchOutOfRange { index: 0, len });
        }
        if self.index_array.is_none() || self.cursor >= len {
            self.reset();
        }
        let index = self.cursor;
        let indices = self.batch_indices(index)?.to_vec();
        self.cursor = index + 1;
        Ok(indices)
    }
}

/// A generator that serves batches by index over one [`BatchIndexer`].
pub trait BatchGenerator {
    type Batch;

    fn indexer(&self) -> &BatchIndexer;

    fn indexer_mut(&mut self) -> &mut BatchIndexer;

    /// Materialize the batch made of the given relation rows.
    fn batch_of_samples(&self, index_array: &[usize]) -> Result<Self::Batch, PackError>;

    /// Batches per epoch.
    fn len(&self) -> usize {
        self.indexer().num_batches()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Batch `index` of the current epoch.
    fn get(&mut self, index: usize) -> Result<Self::Batch, PackError> {
        let indices = self.indexer_mut().batch_indices(index)?.to_vec();
        self.batch_of_samples(&indices)
    }

    /// Next batch of an endless flow over epochs.
    fn next_batch(&mut self) -> Result<Self::Batch, PackError> {
        let indices = self.indexer_mut().next_indices()?;
        self.batch_of_samples(&indices)
    }

    /// Reset the index order, reshuffling when enabled.
    fn on_epoch_end(&mut self) {
        self.indexer_mut().reset();
    }

    /// Iterate over every batch of the current epoch in order.
    fn epoch(&mut self) -> EpochIter<'_, Self>
    where
        Self: Sized,
    {
        EpochIter {
            generator: self,
            next: 0,
        }
    }
}

/// Iterator over the batches of one epoch; see [`BatchGenerator::epoch`].
pub struct EpochIter<'a, G: BatchGenerator> {
    generator: &'a mut G,
    next: usize,
}

impl<G: BatchGenerator> Iterator for EpochIter<'_, G> {
    type Item = Result<G::Batch, PackError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.generator.len() {
            return None;
        }
        let batch = self.generator.get(self.next);
        self.next += 1;
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.generator.len().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_batch_size_rejected() {
        assert!(matches!(
            BatchIndexer::new(0, 10, false, None),
            Err(PackError::Config(_))
        ));
    }

    #[test]
    fn test_last_batch_is_short() {
        let mut indexer = BatchIndexer::new(4, 10, false, None).unwrap();
        assert_eq!(indexer.num_batches(), 3);
        assert_eq!(indexer.batch_indices(0).unwrap(), &[0, 1, 2, 3]);
        assert_eq!(indexer.batch_indices(2).unwrap(), &[8, 9]);
        assert!(matches!(
            indexer.batch_indices(3),
            Err(PackError::BatchOutOfRange { index: 3, len: 3 })
        ));
    }

    #[test]
    fn test_state_transitions() {
        let mut indexer = BatchIndexer::new(2, 3, true, Some(7)).unwrap();
        assert_eq!(indexer.state(), IndexerState::Idle);
        indexer.reset();
        assert_eq!(indexer.state(), IndexerState::Ready);
        indexer.next_indices().unwrap();
        assert_eq!(indexer.state(), IndexerState::Serving);
        assert_eq!(indexer.epoch(), 1);
    }

    #[test]
    fn test_indexed_access_marks_serving() {
        let mut indexer = BatchIndexer::new(2, 3, false, None).unwrap();
        indexer.batch_indices(1).unwrap();
        assert_eq!(indexer.state(), IndexerState::Serving);
        assert_eq!(indexer.epoch(), 1);

        indexer.reset();
        assert_eq!(indexer.state(), IndexerState::Ready);
        assert!(indexer.batch_indices(2).is_err());
        assert_eq!(indexer.state(), IndexerState::Ready);
    }

    #[test]
    fn test_next_indices_wraps_and_reshuffles() {
        let mut indexer = BatchIndexer::new(3, 7, true, Some(11)).unwrap();
        let mut first_epoch = Vec::new();
        for _ in 0..indexer.num_batches() {
            first_epoch.extend(indexer.next_indices().unwrap());
        }
        assert_eq!(indexer.epoch(), 1);

        let wrapped = indexer.next_indices().unwrap();
        assert_eq!(indexer.epoch(), 2);
        assert_eq!(wrapped.len(), 3);

        let mut sorted = first_epoch.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn test_get_does_not_reshuffle_within_epoch() {
        let mut indexer = BatchIndexer::new(2, 6, true, None).unwrap();
        let a = indexer.batch_indices(1).unwrap().to_vec();
        let b = indexer.batch_indices(1).unwrap().to_vec();
        assert_eq!(a, b);
    }

    #[test]
    fn test_seeded_shuffle_is_reproducible() {
        let mut a = BatchIndexer::new(5, 50, true, Some(3)).unwrap();
        let mut b = BatchIndexer::new(5, 50, true, Some(3)).unwrap();
        assert_eq!(a.batch_indices(0).unwrap(), b.batch_indices(0).unwrap());
        a.reset();
        b.reset();
        assert_eq!(a.batch_indices(4).unwrap(), b.batch_indices(4).unwrap());
    }

    #[test]
    fn test_empty_indexer() {
        let mut indexer = BatchIndexer::new(4, 0, false, None).unwrap();
        assert_eq!(indexer.num_batches(), 0);
        assert!(indexer.next_indices().is_err());
    }
}
