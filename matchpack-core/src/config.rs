//! Configuration for preprocessing and batch generation.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! workspace config file -> explicit file -> environment.

use crate::error::PackError;
use crate::task::Task;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackConfig {
    /// Batch generator settings.
    #[serde(default)]
    pub generator: GeneratorConfig,
    /// Text preprocessing settings.
    #[serde(default)]
    pub preprocess: PreprocessConfig,
}

/// Batch generator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Relation rows per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Shuffle the row order at every epoch.
    #[serde(default = "default_true")]
    pub shuffle: bool,
    /// Seed for reproducible shuffling.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub task: TaskConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            shuffle: true,
            seed: None,
            task: TaskConfig::default(),
        }
    }
}

fn default_batch_size() -> usize {
    32
}

fn default_true() -> bool {
    true
}

/// Task selection, e.g. `kind = "ranking"` or `kind = "classification"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskConfig {
    #[serde(default = "default_task_kind")]
    pub kind: String,
    /// Only used for classification.
    #[serde(default = "default_num_classes")]
    pub num_classes: usize,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            kind: default_task_kind(),
            num_classes: default_num_classes(),
        }
    }
}

impl TaskConfig {
    pub fn to_task(&self) -> Result<Task, PackError> {
        Task::from_name(&self.kind, self.num_classes)
    }
}

fn default_task_kind() -> String {
    "classification".to_string()
}

fn default_num_classes() -> usize {
    2
}

/// Text preprocessing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Lowercase text before tokenizing.
    #[serde(default = "default_true")]
    pub lowercase: bool,
    /// Minimum corpus frequency for a term to enter the vocabulary.
    #[serde(default = "default_min_frequency")]
    pub min_frequency: usize,
    /// Truncate or pad token sequences to this length.
    #[serde(default)]
    pub fixed_length: Option<usize>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            lowercase: true,
            min_frequency: default_min_frequency(),
            fixed_length: None,
        }
    }
}

fn default_min_frequency() -> usize {
    1
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with `MATCHPACK_`, `__` separates sections)
/// 2. Explicit config file
/// 3. Workspace-local config (`.matchpack/config.toml`)
/// 4. User config (`~/.config/matchpack/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    explicit: Option<&Path>,
) -> Result<PackConfig, PackError> {
    let mut figment = Figment::from(Serialized::defaults(PackConfig::default()));

    if let Some(dirs) = directories::ProjectDirs::from("dev", "matchpack", "matchpack") {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(".matchpack").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(path) = explicit {
        if !path.exists() {
            return Err(PackError::not_found(format!(
                "config file {}",
                path.display()
            )));
        }
        figment = figment.merge(Toml::file(path));
    }

    // MATCHPACK_GENERATOR__BATCH_SIZE, MATCHPACK_GENERATOR__TASK__KIND, ...
    figment = figment.merge(Env::prefixed("MATCHPACK_").split("__"));

    let config: PackConfig = figment.extract().map_err(Box::new)?;
    config.validate()?;
    Ok(config)
}

impl PackConfig {
    pub fn validate(&self) -> Result<(), PackError> {
        if self.generator.batch_size == 0 {
            return Err(PackError::config("generator.batch_size must be at least 1"));
        }
        self.generator.task.to_task()?;
        if self.preprocess.fixed_length == Some(0) {
            return Err(PackError::config(
                "preprocess.fixed_length must be at least 1 when set",
            ));
        }
        Ok(())
    }
}
