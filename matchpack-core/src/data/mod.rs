//! Dataset storage: entity tables, the relation table, and the DataPack aggregate.

pub mod datapack;
pub mod feature;
pub mod relation;
pub mod table;

pub use datapack::{Context, DataPack, FieldSource, ID_LEFT, ID_RIGHT, SchemaField};
pub use feature::{Column, Feature, FeatureKind};
pub use relation::{Relation, RelationTable, Stage};
pub use table::{ColumnSpec, EntityTable, EntityTableBuilder};
