//! Relation table: the ordered (left id, right id, label) rows joining two entity tables.

use crate::error::PackError;
use serde::{Deserialize, Serialize};

/// Dataset usage mode. Only `Train` packs produce labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Train,
    Evaluate,
    Predict,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Train => write!(f, "train"),
            Stage::Evaluate => write!(f, "evaluate"),
            Stage::Predict => write!(f, "predict"),
        }
    }
}

impl std::str::FromStr for Stage {
    type Err = PackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "train" => Ok(Stage::Train),
            "evaluate" => Ok(Stage::Evaluate),
            "predict" => Ok(Stage::Predict),
            other => Err(PackError::config(format!(
                "unknown stage {other:?}: train, evaluate or predict expected"
            ))),
        }
    }
}

/// One relation row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub id_left: String,
    pub id_right: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<f64>,
}

impl Relation {
    pub fn new(id_left: impl Into<String>, id_right: impl Into<String>, label: Option<f64>) -> Self {
        Self {
            id_left: id_left.into(),
            id_right: id_right.into(),
            label,
        }
    }

    pub fn labeled(id_left: impl Into<String>, id_right: impl Into<String>, label: f64) -> Self {
        Self::new(id_left, id_right, Some(label))
    }

    pub fn unlabeled(id_left: impl Into<String>, id_right: impl Into<String>) -> Self {
        Self::new(id_left, id_right, None)
    }
}

/// Ordered list of relation rows. Its length is the dataset's length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationTable {
    rows: Vec<Relation>,
}

impl RelationTable {
    pub fn new(rows: Vec<Relation>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Relation] {
        &self.rows
    }

    pub fn get(&self, index: usize) -> Option<&Relation> {
        self.rows.get(index)
    }

    pub fn labels(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.rows.iter().map(|r| r.label)
    }

    /// Whether every row carries a label.
    pub fn is_fully_labeled(&self) -> bool {
        self.rows.iter().all(|r| r.label.is_some())
    }

    /// First row without a label, if any.
    pub fn first_unlabeled(&self) -> Option<usize> {
        self.rows.iter().position(|r| r.label.is_none())
    }
}

impl FromIterator<Relation> for RelationTable {
    fn from_iter<I: IntoIterator<Item = Relation>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
