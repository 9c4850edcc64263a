//! DataPack: one dataset made of a left table, a right table and the relation joining them.

use crate::data::feature::FeatureKind;
use crate::data::relation::{RelationTable, Stage};
use crate::data::table::{EntityTable, TableRecord};
use crate::error::{PackError, Side};
use crate::persistence;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Fitted preprocessing parameters carried alongside a dataset.
pub type Context = BTreeMap<String, serde_json::Value>;

/// Reserved feature names for the relation's id columns.
pub const ID_LEFT: &str = "id_left";
pub const ID_RIGHT: &str = "id_right";

/// Where a batch feature is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// Column position in the left table.
    Left(usize),
    /// Column position in the right table.
    Right(usize),
    IdLeft,
    IdRight,
}

/// One entry of the batch feature schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaField {
    pub name: String,
    pub kind: FeatureKind,
    pub source: FieldSource,
}

/// A complete dataset.
///
/// Construction checks referential integrity: every relation row must point
/// at an existing left and right entity. A pack's length is its relation
/// row count; one entity row may be shared by many relation rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DataPackRecord", into = "DataPackRecord")]
pub struct DataPack {
    left: EntityTable,
    right: EntityTable,
    relation: RelationTable,
    stage: Stage,
    context: Context,
    positions: Vec<(usize, usize)>,
    schema: Vec<SchemaField>,
}

impl DataPack {
    pub const DATA_FILENAME: &'static str = "datapack.json";

    pub fn new(
        relation: RelationTable,
        left: EntityTable,
        right: EntityTable,
        stage: Stage,
    ) -> Result<Self, PackError> {
        let schema = build_schema(&left, &right)?;

        let mut positions = Vec::with_capacity(relation.len());
        for row in relation.rows() {
            let l = left
                .position(&row.id_left)
                .ok_or_else(|| PackError::unknown_id(Side::Left, &row.id_left))?;
            let r = right
                .position(&row.id_right)
                .ok_or_else(|| PackError::unknown_id(Side::Right, &row.id_right))?;
            positions.push((l, r));
        }

        check_labels(&relation, stage)?;

        Ok(Self {
            left,
            right,
            relation,
            stage,
            context: Context::new(),
            positions,
            schema,
        })
    }

    /// Attach fitted preprocessing parameters.
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    /// Re-tag the pack for another stage. Switching to `Train` requires labels.
    pub fn with_stage(mut self, stage: Stage) -> Result<Self, PackError> {
        check_labels(&self.relation, stage)?;
        self.stage = stage;
        Ok(self)
    }

    /// Number of relation rows.
    pub fn len(&self) -> usize {
        self.relation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relation.is_empty()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn left(&self) -> &EntityTable {
        &self.left
    }

    pub fn right(&self) -> &EntityTable {
        &self.right
    }

    pub fn relation(&self) -> &RelationTable {
        &self.relation
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Batch feature schema: left columns, right columns, then the two id columns.
    pub fn schema(&self) -> &[SchemaField] {
        &self.schema
    }

    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.schema.iter().map(|f| f.name.as_str())
    }

    /// Left and right entity row positions of relation row `index`.
    pub fn positions(&self, index: usize) -> Option<(usize, usize)> {
        self.positions.get(index).copied()
    }

    /// Save to `dirpath/datapack.json`. Fails if that file already exists.
    pub fn save(&self, dirpath: &Path) -> Result<PathBuf, PackError> {
        persistence::save_to_dir(dirpath, Self::DATA_FILENAME, self)
    }

    /// Load from `dirpath/datapack.json`, re-running every construction check.
    pub fn load(dirpath: &Path) -> Result<Self, PackError> {
        let record: DataPackRecord = persistence::load_from_dir(dirpath, Self::DATA_FILENAME)?;
        let pack = Self::try_from(record)?;
        tracing::debug!(rows = pack.len(), stage = %pack.stage, "DataPack restored");
        Ok(pack)
    }
}

/// Labels must be finite, and a train-stage relation must be fully labeled.
fn check_labels(relation: &RelationTable, stage: Stage) -> Result<(), PackError> {
    if let Some((row, label)) = relation
        .labels()
        .enumerate()
        .find_map(|(row, label)| label.filter(|l| !l.is_finite()).map(|l| (row, l)))
    {
        return Err(PackError::integrity(format!(
            "relation row {row} has non-finite label {label}"
        )));
    }
    if stage == Stage::Train {
        if let Some(row) = relation.first_unlabeled() {
            return Err(PackError::MissingLabel { row });
        }
    }
    Ok(())
}

fn build_schema(left: &EntityTable, right: &EntityTable) -> Result<Vec<SchemaField>, PackError> {
    let mut schema = Vec::with_capacity(left.columns().len() + right.columns().len() + 2);
    let sides = left
        .columns()
        .iter()
        .enumerate()
        .map(|(i, c)| (c, FieldSource::Left(i)))
        .chain(
            right
                .columns()
                .iter()
                .enumerate()
                .map(|(i, c)| (c, FieldSource::Right(i))),
        );
    for (spec, source) in sides {
        if spec.name == ID_LEFT || spec.name == ID_RIGHT {
            return Err(PackError::config(format!(
                "column name {} is reserved for relation ids",
                spec.name
            )));
        }
        if schema.iter().any(|f: &SchemaField| f.name == spec.name) {
            return Err(PackError::config(format!(
                "column {} appears in both entity tables",
                spec.name
            )));
        }
        schema.push(SchemaField {
            name: spec.name.clone(),
            kind: spec.kind,
            source,
        });
    }
    schema.push(SchemaField {
        name: ID_LEFT.to_string(),
        kind: FeatureKind::Text,
        source: FieldSource::IdLeft,
    });
    schema.push(SchemaField {
        name: ID_RIGHT.to_string(),
        kind: FeatureKind::Text,
        source: FieldSource::IdRight,
    });
    Ok(schema)
}

#[derive(Serialize, Deserialize)]
struct DataPackRecord {
    stage: Stage,
    #[serde(default)]
    context: Context,
    left: TableRecord,
    right: TableRecord,
    relation: RelationTable,
}

impl TryFrom<DataPackRecord> for DataPack {
    type Error = PackError;

    fn try_from(record: DataPackRecord) -> Result<Self, Self::Error> {
        let left = EntityTable::try_from(record.left)?;
        let right = EntityTable::try_from(record.right)?;
        Ok(DataPack::new(record.relation, left, right, record.stage)?.with_context(record.context))
    }
}

impl From<DataPack> for DataPackRecord {
    fn from(pack: DataPack) -> Self {
        DataPackRecord {
            stage: pack.stage,
            context: pack.context,
            left: pack.left.into(),
            right: pack.right.into(),
            relation: pack.relation,
        }
    }
}
