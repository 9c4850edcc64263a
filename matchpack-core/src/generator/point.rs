//! Point-wise generator: one relation row per sample, usable for ranking and classification.

use crate::config::GeneratorConfig;
use crate::data::datapack::{DataPack, FieldSource};
use crate::data::feature::Column;
use crate::data::relation::Stage;
use crate::error::PackError;
use crate::generator::{BatchGenerator, BatchIndexer};
use crate::task::Task;
use serde::Serialize;
use std::sync::Arc;

/// Named, column-aligned batch features in schema order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureBatch {
    fields: Vec<(String, Column)>,
}

impl FeatureBatch {
    pub fn get(&self, name: &str) -> Option<&Column> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, col)| col)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.fields.iter().map(|(n, c)| (n.as_str(), c))
    }

    /// Number of batch rows.
    pub fn num_rows(&self) -> usize {
        self.fields.first().map_or(0, |(_, col)| col.len())
    }

    pub fn num_features(&self) -> usize {
        self.fields.len()
    }
}

/// Encoded labels of one batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "values", rename_all = "snake_case")]
pub enum Labels {
    /// One score per row (ranking).
    Scalar(Vec<f32>),
    /// A `[rows, num_classes]` one-hot matrix (classification).
    OneHot(Vec<Vec<f32>>),
}

impl Labels {
    pub fn len(&self) -> usize {
        match self {
            Labels::Scalar(v) => v.len(),
            Labels::OneHot(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Features plus labels; labels are present only for train-stage packs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointBatch {
    pub features: FeatureBatch,
    pub labels: Option<Labels>,
}

/// Relation labels cast once to the task's representation.
#[derive(Debug, Clone, PartialEq)]
enum EncodedLabels {
    Ranking(Vec<f32>),
    Classes {
        num_classes: usize,
        classes: Vec<usize>,
    },
}

impl EncodedLabels {
    fn cast(pack: &DataPack, task: Task) -> Result<Self, PackError> {
        let mut labels = Vec::with_capacity(pack.len());
        for (row, label) in pack.relation().labels().enumerate() {
            labels.push(label.ok_or(PackError::MissingLabel { row })?);
        }
        match task {
            Task::Ranking => Ok(EncodedLabels::Ranking(
                labels.into_iter().map(|l| l as f32).collect(),
            )),
            Task::Classification { num_classes } => {
                let classes = labels
                    .into_iter()
                    .map(|label| class_index(label, num_classes))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(EncodedLabels::Classes {
                    num_classes,
                    classes,
                })
            }
        }
    }

    fn batch(&self, index_array: &[usize]) -> Labels {
        match self {
            EncodedLabels::Ranking(scores) => {
                Labels::Scalar(index_array.iter().map(|&i| scores[i]).collect())
            }
            EncodedLabels::Classes {
                num_classes,
                classes,
            } => Labels::OneHot(
                index_array
                    .iter()
                    .map(|&i| {
                        let mut row = vec![0.0; *num_classes];
                        row[classes[i]] = 1.0;
                        row
                    })
                    .collect(),
            ),
        }
    }
}

fn class_index(label: f64, num_classes: usize) -> Result<usize, PackError> {
    if label.fract() != 0.0 {
        return Err(PackError::integrity(format!(
            "classification label {label} is not an integer class index"
        )));
    }
    if label < 0.0 || label >= num_classes as f64 {
        return Err(PackError::LabelOutOfRange { label, num_classes });
    }
    Ok(label as usize)
}

/// Generator producing point-wise batches from a shared [`DataPack`].
///
/// Labels are cast when the generator is built, so a bad label fails at
/// construction rather than at some later batch, and the pack itself is
/// never modified. Several generators may share one pack.
#[derive(Debug, Clone)]
pub struct PointGenerator {
    pack: Arc<DataPack>,
    task: Task,
    labels: Option<EncodedLabels>,
    indexer: BatchIndexer,
}

impl PointGenerator {
    pub fn new(
        pack: impl Into<Arc<DataPack>>,
        task: Task,
        batch_size: usize,
        shuffle: bool,
    ) -> Result<Self, PackError> {
        Self::with_seed(pack, task, batch_size, shuffle, None)
    }

    pub fn with_seed(
        pack: impl Into<Arc<DataPack>>,
        task: Task,
        batch_size: usize,
        shuffle: bool,
        seed: Option<u64>,
    ) -> Result<Self, PackError> {
        let pack = pack.into();
        let indexer = BatchIndexer::new(batch_size, pack.len(), shuffle, seed)?;
        let labels = match pack.stage() {
            Stage::Train => Some(EncodedLabels::cast(&pack, task)?),
            Stage::Evaluate | Stage::Predict => None,
        };
        tracing::debug!(
            rows = pack.len(),
            batch_size,
            shuffle,
            task = %task,
            stage = %pack.stage(),
            "PointGenerator ready"
        );
        Ok(Self {
            pack,
            task,
            labels,
            indexer,
        })
    }

    pub fn from_config(
        pack: impl Into<Arc<DataPack>>,
        config: &GeneratorConfig,
    ) -> Result<Self, PackError> {
        Self::with_seed(
            pack,
            config.task.to_task()?,
            config.batch_size,
            config.shuffle,
            config.seed,
        )
    }

    pub fn task(&self) -> Task {
        self.task
    }

    pub fn datapack(&self) -> &Arc<DataPack> {
        &self.pack
    }
}

impl BatchGenerator for PointGenerator {
    type Batch = PointBatch;

    fn indexer(&self) -> &BatchIndexer {
        &self.indexer
    }

    fn indexer_mut(&mut self) -> &mut BatchIndexer {
        &mut self.indexer
    }

    fn batch_of_samples(&self, index_array: &[usize]) -> Result<PointBatch, PackError> {
        let pack = &*self.pack;
        let mut left_pos = Vec::with_capacity(index_array.len());
        let mut right_pos = Vec::with_capacity(index_array.len());
        for &i in index_array {
            let (l, r) = pack.positions(i).ok_or_else(|| {
                PackError::integrity(format!(
                    "relation row {i} out of range for pack of {} rows",
                    pack.len()
                ))
            })?;
            left_pos.push(l);
            right_pos.push(r);
        }

        let mut fields = Vec::with_capacity(pack.schema().len());
        for field in pack.schema() {
            let column = match field.source {
                FieldSource::Left(c) => pack.left().gather(c, &left_pos)?,
                FieldSource::Right(c) => pack.right().gather(c, &right_pos)?,
                FieldSource::IdLeft => Column::Text(
                    index_array
                        .iter()
                        .map(|&i| pack.relation().rows()[i].id_left.clone())
                        .collect(),
                ),
                FieldSource::IdRight => Column::Text(
                    index_array
                        .iter()
                        .map(|&i| pack.relation().rows()[i].id_right.clone())
                        .collect(),
                ),
            };
            fields.push((field.name.clone(), column));
        }

        let labels = self.labels.as_ref().map(|l| l.batch(index_array));
        tracing::trace!(rows = index_array.len(), "Assembled point batch");
        Ok(PointBatch {
            features: FeatureBatch { fields },
            labels,
        })
    }
}
