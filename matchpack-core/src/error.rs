//! Error types for the matchpack-core crate.

use std::path::PathBuf;
use thiserror::Error;

/// Which entity table an id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

/// Top-level error type for dataset and generator operations.
#[derive(Debug, Error)]
pub enum PackError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0:?} is not a valid task type: `ranking` and `classification` expected")]
    UnsupportedTask(String),

    #[error("Unknown {side} id: {id}")]
    UnknownId { side: Side, id: String },

    #[error("Label {label} is outside the valid class range [0, {num_classes})")]
    LabelOutOfRange { label: f64, num_classes: usize },

    #[error("Relation row {row} has no label but the stage requires one")]
    MissingLabel { row: usize },

    #[error("Integrity error: {0}")]
    Integrity(String),

    #[error("Already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Batch index {index} out of range for generator of length {len}")]
    BatchOutOfRange { index: usize, len: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Config loading error: {0}")]
    Figment(#[from] Box<figment::Error>),
}

impl PackError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::Integrity(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn unknown_id(side: Side, id: impl Into<String>) -> Self {
        Self::UnknownId {
            side,
            id: id.into(),
        }
    }
}
