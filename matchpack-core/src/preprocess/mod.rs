//! Preprocessor contract: turn raw text pairs into a [`DataPack`].

pub mod basic;
pub mod tokenize;

pub use basic::BasicPreprocessor;
pub use tokenize::{Vocabulary, tokenize};

use crate::data::datapack::{Context, DataPack};
use crate::error::PackError;
use crate::persistence;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One raw input pair. `label` is absent for inference-only inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub text_left: String,
    pub text_right: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<f64>,
}

impl RawRecord {
    pub fn new(text_left: impl Into<String>, text_right: impl Into<String>) -> Self {
        Self {
            text_left: text_left.into(),
            text_right: text_right.into(),
            label: None,
        }
    }

    pub fn labeled(text_left: impl Into<String>, text_right: impl Into<String>, label: f64) -> Self {
        Self {
            label: Some(label),
            ..Self::new(text_left, text_right)
        }
    }
}

impl<L: Into<String>, R: Into<String>> From<(L, R)> for RawRecord {
    fn from((left, right): (L, R)) -> Self {
        RawRecord::new(left, right)
    }
}

impl<L: Into<String>, R: Into<String>> From<(L, R, f64)> for RawRecord {
    fn from((left, right, label): (L, R, f64)) -> Self {
        RawRecord::labeled(left, right, label)
    }
}

/// Read raw records from a JSONL file, one object per line.
pub fn read_jsonl(path: &Path) -> Result<Vec<RawRecord>, PackError> {
    let content = std::fs::read_to_string(path)?;
    let mut records = Vec::new();
    for (lineno, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            tracing::warn!(path = %path.display(), line = lineno + 1, "Skipping blank line");
            continue;
        }
        let record: RawRecord = serde_json::from_str(line).map_err(|e| {
            PackError::invalid_input(format!("{}:{}: {e}", path.display(), lineno + 1))
        })?;
        records.push(record);
    }
    tracing::info!(path = %path.display(), records = records.len(), "Read raw records");
    Ok(records)
}

/// A fitted text-pair preprocessor.
///
/// `fit` learns parameters (vocabularies and the like) from a training
/// corpus; `transform` is a pure function of those parameters and its input.
/// Saving persists the fitted state, not any dataset.
pub trait Preprocessor: Sized + Serialize + DeserializeOwned {
    const DATA_FILENAME: &'static str = "preprocessor.json";

    /// Learn parameters from `inputs`.
    fn fit(&mut self, inputs: &[RawRecord]) -> Result<&mut Self, PackError>;

    /// Build a [`DataPack`] from `inputs` with the fitted parameters.
    fn transform(&self, inputs: &[RawRecord]) -> Result<DataPack, PackError>;

    /// Fitted parameters.
    fn context(&self) -> &Context;

    fn fit_transform(&mut self, inputs: &[RawRecord]) -> Result<DataPack, PackError> {
        self.fit(inputs)?.transform(inputs)
    }

    /// Save the fitted state to `dirpath`. Fails if the file already exists.
    fn save(&self, dirpath: &Path) -> Result<PathBuf, PackError> {
        persistence::save_to_dir(dirpath, Self::DATA_FILENAME, self)
    }

    fn load(dirpath: &Path) -> Result<Self, PackError> {
        persistence::load_from_dir(dirpath, Self::DATA_FILENAME)
    }
}
