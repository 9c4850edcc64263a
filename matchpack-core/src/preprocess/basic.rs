//! Word-level preprocessor: tokenize, index against a fitted vocabulary, record lengths.

use crate::config::PreprocessConfig;
use crate::data::datapack::{Context, DataPack};
use crate::data::feature::{Feature, FeatureKind};
use crate::data::relation::{Relation, RelationTable, Stage};
use crate::data::table::{ColumnSpec, EntityTable, EntityTableBuilder};
use crate::error::PackError;
use crate::preprocess::tokenize::{Vocabulary, tokenize};
use crate::preprocess::{Preprocessor, RawRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Preprocessor producing `text_*` token columns and `length_*` columns.
///
/// Identical texts on one side map to a single entity row, so relation rows
/// that repeat a query or document share its features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicPreprocessor {
    config: PreprocessConfig,
    vocabulary: Option<Vocabulary>,
    context: Context,
}

impl Default for BasicPreprocessor {
    fn default() -> Self {
        Self::new(PreprocessConfig::default())
    }
}

impl BasicPreprocessor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self {
            config,
            vocabulary: None,
            context: Context::new(),
        }
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    pub fn vocabulary(&self) -> Option<&Vocabulary> {
        self.vocabulary.as_ref()
    }

    pub fn is_fitted(&self) -> bool {
        self.vocabulary.is_some()
    }

    fn encode(&self, vocab: &Vocabulary, text: &str) -> (Vec<u32>, i64) {
        let mut ids = vocab.encode(&tokenize(text, self.config.lowercase));
        match self.config.fixed_length {
            Some(len) => {
                let kept = ids.len().min(len);
                ids.resize(len, Vocabulary::PAD);
                (ids, kept as i64)
            }
            None => {
                let n = ids.len() as i64;
                (ids, n)
            }
        }
    }
}

/// Assigns `<prefix>-<n>` ids to distinct texts in first-seen order.
struct SideBuilder<'a> {
    prefix: &'static str,
    ids: HashMap<&'a str, String>,
    table: EntityTableBuilder,
}

impl<'a> SideBuilder<'a> {
    fn new(prefix: &'static str, side: &str) -> Self {
        Self {
            prefix,
            ids: HashMap::new(),
            table: EntityTable::builder(vec![
                ColumnSpec::new(format!("text_{side}"), FeatureKind::Tokens),
                ColumnSpec::new(format!("length_{side}"), FeatureKind::Int),
            ]),
        }
    }

    fn id_for(
        &mut self,
        text: &'a str,
        encode: impl FnOnce(&str) -> (Vec<u32>, i64),
    ) -> Result<String, PackError> {
        if let Some(id) = self.ids.get(text) {
            return Ok(id.clone());
        }
        let id = format!("{}-{}", self.prefix, self.ids.len());
        let (tokens, length) = encode(text);
        self.table
            .push_row(id.clone(), vec![Feature::Tokens(tokens), Feature::Int(length)])?;
        self.ids.insert(text, id.clone());
        Ok(id)
    }
}

fn stage_of(inputs: &[RawRecord]) -> Result<Stage, PackError> {
    let labeled = inputs.iter().filter(|r| r.label.is_some()).count();
    match labeled {
        0 if !inputs.is_empty() => Ok(Stage::Predict),
        n if n == inputs.len() => Ok(Stage::Train),
        n => Err(PackError::invalid_input(format!(
            "{n} of {} records are labeled; either all or none must carry a label",
            inputs.len()
        ))),
    }
}

impl Preprocessor for BasicPreprocessor {
    fn fit(&mut self, inputs: &[RawRecord]) -> Result<&mut Self, PackError> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for record in inputs {
            for text in [&record.text_left, &record.text_right] {
                for term in tokenize(text, self.config.lowercase) {
                    *counts.entry(term).or_default() += 1;
                }
            }
        }
        let vocab = Vocabulary::from_counts(&counts, self.config.min_frequency);

        self.context.clear();
        self.context
            .insert("vocab_size".into(), serde_json::json!(vocab.size()));
        self.context
            .insert("lowercase".into(), serde_json::json!(self.config.lowercase));
        if let Some(len) = self.config.fixed_length {
            self.context
                .insert("fixed_length".into(), serde_json::json!(len));
        }
        tracing::info!(
            records = inputs.len(),
            distinct_terms = counts.len(),
            vocab_size = vocab.size(),
            "Fitted preprocessor"
        );
        self.vocabulary = Some(vocab);
        Ok(self)
    }

    fn transform(&self, inputs: &[RawRecord]) -> Result<DataPack, PackError> {
        let vocab = self
            .vocabulary
            .as_ref()
            .ok_or_else(|| PackError::invalid_input("transform called before fit"))?;
        let stage = stage_of(inputs)?;

        let mut left = SideBuilder::new("L", "left");
        let mut right = SideBuilder::new("R", "right");
        let mut relation = Vec::with_capacity(inputs.len());
        for record in inputs {
            let id_left = left.id_for(&record.text_left, |t| self.encode(vocab, t))?;
            let id_right = right.id_for(&record.text_right, |t| self.encode(vocab, t))?;
            relation.push(Relation::new(id_left, id_right, record.label));
        }

        let left = left.table.build()?;
        let right = right.table.build()?;
        tracing::info!(
            relations = relation.len(),
            left = left.len(),
            right = right.len(),
            stage = %stage,
            "Transformed records"
        );
        Ok(DataPack::new(RelationTable::new(relation), left, right, stage)?
            .with_context(self.context.clone()))
    }

    fn context(&self) -> &Context {
        &self.context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn corpus() -> Vec<RawRecord> {
        vec![
            ("How are you", "I am fine", 1.0).into(),
            ("How are you", "The weather is nice", 0.0).into(),
            ("What time is it", "It is noon", 1.0).into(),
        ]
    }

    #[test]
    fn test_transform_before_fit_fails() {
        let pre = BasicPreprocessor::default();
        assert!(matches!(
            pre.transform(&corpus()),
            Err(PackError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_fit_transform_shares_entity_rows() {
        let mut pre = BasicPreprocessor::default();
        let pack = pre.fit_transform(&corpus()).unwrap();

        assert_eq!(pack.len(), 3);
        assert_eq!(pack.left().len(), 2);
        assert_eq!(pack.right().len(), 3);
        assert_eq!(pack.stage(), Stage::Train);
        assert_eq!(pack.relation().rows()[1].id_left, "L-0");
        assert_eq!(pack.positions(0).unwrap().0, pack.positions(1).unwrap().0);
        assert_eq!(pack.left().get("L-1", "length_left"), Some(&Feature::Int(4)));
        assert_eq!(pack.context()["vocab_size"], pre.context()["vocab_size"]);
    }

    #[test]
    fn test_unlabeled_records_give_predict_stage() {
        let mut pre = BasicPreprocessor::default();
        pre.fit(&corpus()).unwrap();
        let pack = pre
            .transform(&[RawRecord::new("how are you", "unseen words here")])
            .unwrap();
        assert_eq!(pack.stage(), Stage::Predict);
        let Some(Feature::Tokens(tokens)) = pack.right().get("R-0", "text_right") else {
            panic!("text_right missing");
        };
        assert!(tokens.iter().all(|&t| t == Vocabulary::OOV));
    }

    #[test]
    fn test_mixed_labels_rejected() {
        let mut pre = BasicPreprocessor::default();
        pre.fit(&corpus()).unwrap();
        let mixed = vec![RawRecord::labeled("a", "b", 1.0), RawRecord::new("a", "c")];
        assert!(matches!(
            pre.transform(&mixed),
            Err(PackError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_fixed_length_pads_and_truncates() {
        let mut pre = BasicPreprocessor::new(PreprocessConfig {
            fixed_length: Some(3),
            ..PreprocessConfig::default()
        });
        let pack = pre.fit_transform(&corpus()).unwrap();

        let Some(Feature::Tokens(long)) = pack.right().get("R-1", "text_right") else {
            panic!("text_right missing");
        };
        assert_eq!(long.len(), 3);
        assert_eq!(pack.right().get("R-1", "length_right"), Some(&Feature::Int(3)));

        let Some(Feature::Tokens(short)) = pack.left().get("L-0", "text_left") else {
            panic!("text_left missing");
        };
        assert_eq!(short.len(), 3);
        assert_eq!(pack.right().get("R-2", "length_right"), Some(&Feature::Int(3)));
        assert_eq!(pack.context()["fixed_length"], serde_json::json!(3));
    }

    #[test]
    fn test_fixed_length_padding_uses_pad_index() {
        let mut pre = BasicPreprocessor::new(PreprocessConfig {
            fixed_length: Some(5),
            ..PreprocessConfig::default()
        });
        let pack = pre.fit_transform(&corpus()).unwrap();
        let Some(Feature::Tokens(tokens)) = pack.right().get("R-0", "text_right") else {
            panic!("text_right missing");
        };
        assert_eq!(&tokens[3..], &[Vocabulary::PAD, Vocabulary::PAD]);
        assert_eq!(pack.right().get("R-0", "length_right"), Some(&Feature::Int(3)));
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut pre = BasicPreprocessor::default();
        pre.fit(&corpus()).unwrap();

        pre.save(dir.path()).unwrap();
        let loaded = BasicPreprocessor::load(dir.path()).unwrap();
        assert_eq!(loaded, pre);
        assert!(loaded.is_fitted());

        let err = loaded.save(dir.path()).unwrap_err();
        assert!(matches!(err, PackError::AlreadyExists(_)));
    }
}
