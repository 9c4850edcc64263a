//! # matchpack-core: paired-text datasets and task-aware batch generation
//!
//! A [`DataPack`] holds two entity tables (queries on the left, candidate
//! documents on the right) and a relation table joining them with labels.
//! A [`Preprocessor`] builds DataPacks from raw text pairs, and a
//! [`PointGenerator`] serves shuffled mini-batches from one, encoding labels
//! for either a ranking or a classification [`Task`].

pub mod config;
pub mod data;
pub mod error;
pub mod generator;
pub mod persistence;
pub mod preprocess;
pub mod task;

// Re-exports
pub use config::{GeneratorConfig, PackConfig, PreprocessConfig, load_config};
pub use data::{
    Column, ColumnSpec, Context, DataPack, EntityTable, Feature, FeatureKind, Relation,
    RelationTable, Stage,
};
pub use error::{PackError, Side};
pub use generator::{BatchGenerator, BatchIndexer, FeatureBatch, Labels, PointBatch, PointGenerator};
pub use preprocess::{BasicPreprocessor, Preprocessor, RawRecord, read_jsonl};
pub use task::{LabelDtype, Task};
