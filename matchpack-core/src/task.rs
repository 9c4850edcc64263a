//! Task descriptors: how relation labels are encoded for a model.

use crate::error::PackError;
use serde::{Deserialize, Serialize};

/// Numeric representation a task expects for its labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelDtype {
    Float32,
    Int64,
}

/// The learning task a generator encodes labels for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Task {
    /// One real-valued relevance score per row.
    Ranking,
    /// One-hot encoded class index per row.
    Classification { num_classes: usize },
}

impl Default for Task {
    fn default() -> Self {
        Task::Classification { num_classes: 2 }
    }
}

impl Task {
    pub fn ranking() -> Self {
        Task::Ranking
    }

    pub fn classification(num_classes: usize) -> Result<Self, PackError> {
        if num_classes == 0 {
            return Err(PackError::config(
                "classification requires at least one class",
            ));
        }
        Ok(Task::Classification { num_classes })
    }

    /// Parse a task kind by name. `num_classes` applies to classification only.
    pub fn from_name(name: &str, num_classes: usize) -> Result<Self, PackError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "ranking" => Ok(Task::Ranking),
            "classification" => Task::classification(num_classes),
            _ => Err(PackError::UnsupportedTask(name.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Task::Ranking => "ranking",
            Task::Classification { .. } => "classification",
        }
    }

    pub fn output_dtype(&self) -> LabelDtype {
        match self {
            Task::Ranking => LabelDtype::Float32,
            Task::Classification { .. } => LabelDtype::Int64,
        }
    }

    pub fn num_classes(&self) -> Option<usize> {
        match self {
            Task::Ranking => None,
            Task::Classification { num_classes } => Some(*num_classes),
        }
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Task::Ranking => write!(f, "ranking"),
            Task::Classification { num_classes } => write!(f, "classification({num_classes})"),
        }
    }
}
