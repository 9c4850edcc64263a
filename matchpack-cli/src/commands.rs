//! Subcommand definitions and handlers.

use anyhow::Context as _;
use matchpack_core::{
    BasicPreprocessor, BatchGenerator, Column, DataPack, Labels, PackConfig, PackError, PointBatch,
    PointGenerator, Preprocessor, Task, read_jsonl,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Fit a preprocessor on labeled pairs and save it with the resulting DataPack
    Prepare {
        /// JSONL file of {"text_left", "text_right", "label"} records
        #[arg(short, long)]
        input: PathBuf,
        /// Output directory; receives `preprocessor/` and `datapack/`
        #[arg(short, long)]
        output: PathBuf,
        /// Truncate or pad token sequences to this length
        #[arg(long)]
        fixed_length: Option<usize>,
    },
    /// Transform records with a previously fitted preprocessor
    Transform {
        /// Directory containing a saved preprocessor
        #[arg(short, long)]
        preprocessor: PathBuf,
        /// JSONL file of records (labels optional)
        #[arg(short, long)]
        input: PathBuf,
        /// Directory to save the DataPack into
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print a DataPack's stage, sizes and feature schema
    Inspect {
        /// Directory containing a saved DataPack
        datapack: PathBuf,
    },
    /// Draw one epoch of batches from a DataPack and print a summary per batch
    Batches {
        /// Directory containing a saved DataPack
        datapack: PathBuf,
        #[arg(short, long)]
        batch_size: Option<usize>,
        /// Task kind: ranking or classification
        #[arg(short, long)]
        task: Option<String>,
        #[arg(long)]
        num_classes: Option<usize>,
        /// Keep relation order instead of shuffling
        #[arg(long)]
        no_shuffle: bool,
        #[arg(long)]
        seed: Option<u64>,
        /// Stop after this many batches
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
}

pub fn handle_command(command: Commands, mut config: PackConfig) -> anyhow::Result<()> {
    match command {
        Commands::Prepare {
            input,
            output,
            fixed_length,
        } => {
            if fixed_length.is_some() {
                config.preprocess.fixed_length = fixed_length;
            }
            prepare(&input, &output, config)
        }
        Commands::Transform {
            preprocessor,
            input,
            output,
        } => transform(&preprocessor, &input, &output),
        Commands::Inspect { datapack } => inspect(&datapack),
        Commands::Batches {
            datapack,
            batch_size,
            task,
            num_classes,
            no_shuffle,
            seed,
            limit,
        } => {
            let generator = &mut config.generator;
            if let Some(size) = batch_size {
                generator.batch_size = size;
            }
            if let Some(kind) = task {
                generator.task.kind = kind;
            }
            if let Some(n) = num_classes {
                generator.task.num_classes = n;
            }
            if no_shuffle {
                generator.shuffle = false;
            }
            if seed.is_some() {
                generator.seed = seed;
            }
            config.validate()?;
            batches(&datapack, &config, limit)
        }
    }
}

fn prepare(input: &Path, output: &Path, config: PackConfig) -> anyhow::Result<()> {
    config.validate()?;
    let records = read_jsonl(input).with_context(|| format!("reading {}", input.display()))?;
    let pre_dir = output.join("preprocessor");
    let pack_dir = output.join("datapack");
    for target in [
        pre_dir.join(<BasicPreprocessor as Preprocessor>::DATA_FILENAME),
        pack_dir.join(DataPack::DATA_FILENAME),
    ] {
        if target.exists() {
            return Err(PackError::AlreadyExists(target).into());
        }
    }

    let mut preprocessor = BasicPreprocessor::new(config.preprocess);
    let pack = preprocessor.fit_transform(&records)?;

    let pre_path = preprocessor.save(&pre_dir)?;
    let pack_path = pack.save(&pack_dir)?;
    println!(
        "Prepared {} relations ({} left, {} right, stage {})",
        pack.len(),
        pack.left().len(),
        pack.right().len(),
        pack.stage()
    );
    println!("  preprocessor: {}", pre_path.display());
    println!("  datapack:     {}", pack_path.display());
    Ok(())
}

fn transform(preprocessor: &Path, input: &Path, output: &Path) -> anyhow::Result<()> {
    let preprocessor = BasicPreprocessor::load(preprocessor)?;
    let records = read_jsonl(input).with_context(|| format!("reading {}", input.display()))?;
    let pack = preprocessor.transform(&records)?;
    let path = pack.save(output)?;
    println!(
        "Transformed {} relations (stage {}) into {}",
        pack.len(),
        pack.stage(),
        path.display()
    );
    Ok(())
}

#[derive(Serialize)]
struct FieldSummary<'a> {
    name: &'a str,
    kind: String,
}

#[derive(Serialize)]
struct PackSummary<'a> {
    stage: String,
    relations: usize,
    left: usize,
    right: usize,
    features: Vec<FieldSummary<'a>>,
    context: &'a matchpack_core::Context,
}

fn summarize(pack: &DataPack) -> PackSummary<'_> {
    PackSummary {
        stage: pack.stage().to_string(),
        relations: pack.len(),
        left: pack.left().len(),
        right: pack.right().len(),
        features: pack
            .schema()
            .iter()
            .map(|f| FieldSummary {
                name: &f.name,
                kind: f.kind.to_string(),
            })
            .collect(),
        context: pack.context(),
    }
}

fn inspect(dir: &Path) -> anyhow::Result<()> {
    let pack = DataPack::load(dir)?;
    println!("{}", serde_json::to_string_pretty(&summarize(&pack))?);
    Ok(())
}

#[derive(Serialize)]
struct BatchSummary {
    batch: usize,
    rows: usize,
    first_pair: Option<(String, String)>,
    labels: Option<String>,
}

fn summarize_batch(index: usize, batch: &PointBatch, task: Task) -> BatchSummary {
    let first = |name: &str| match batch.features.get(name) {
        Some(Column::Text(ids)) => ids.first().cloned(),
        _ => None,
    };
    let first_pair = first("id_left").zip(first("id_right"));
    let labels = batch.labels.as_ref().map(|labels| match labels {
        Labels::Scalar(v) => {
            let mean = v.iter().sum::<f32>() / v.len().max(1) as f32;
            format!("{task}: mean score {mean:.3}")
        }
        Labels::OneHot(rows) => {
            let mut counts = vec![0usize; task.num_classes().unwrap_or(0)];
            for row in rows {
                if let Some(class) = row.iter().position(|&v| v == 1.0) {
                    if let Some(c) = counts.get_mut(class) {
                        *c += 1;
                    }
                }
            }
            format!("{task}: class counts {counts:?}")
        }
    });
    BatchSummary {
        batch: index,
        rows: batch.features.num_rows(),
        first_pair,
        labels,
    }
}

fn batches(dir: &Path, config: &PackConfig, limit: Option<usize>) -> anyhow::Result<()> {
    let pack = Arc::new(DataPack::load(dir)?);
    let mut generator = PointGenerator::from_config(pack, &config.generator)?;
    let task = generator.task();
    let total = generator.len();
    tracing::info!(batches = total, task = %task, "Drawing one epoch");

    for (i, batch) in generator.epoch().take(limit.unwrap_or(usize::MAX)).enumerate() {
        let batch = batch?;
        println!(
            "{}",
            serde_json::to_string(&summarize_batch(i, &batch, task))?
        );
    }
    Ok(())
}
