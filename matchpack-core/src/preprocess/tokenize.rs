//! Tokenizer and term vocabulary used by the built-in preprocessor.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Split text into terms on any non-alphanumeric character.
pub fn tokenize(text: &str, lowercase: bool) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| {
            if lowercase {
                t.to_lowercase()
            } else {
                t.to_string()
            }
        })
        .collect()
}

/// Mapping from term to index. Index 0 is padding and 1 is out-of-vocabulary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    term_index: BTreeMap<String, u32>,
}

impl Vocabulary {
    pub const PAD: u32 = 0;
    pub const OOV: u32 = 1;

    /// Build from term frequencies, keeping terms seen at least `min_frequency` times.
    ///
    /// More frequent terms get smaller indices; ties are broken alphabetically.
    pub fn from_counts(counts: &HashMap<String, usize>, min_frequency: usize) -> Self {
        let mut terms: Vec<(&String, usize)> = counts
            .iter()
            .filter(|(_, n)| **n >= min_frequency)
            .map(|(t, n)| (t, *n))
            .collect();
        terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        let term_index = terms
            .into_iter()
            .zip(2u32..)
            .map(|((term, _), idx)| (term.clone(), idx))
            .collect();
        Self { term_index }
    }

    /// Number of indices in use, including padding and OOV.
    pub fn size(&self) -> usize {
        self.term_index.len() + 2
    }

    pub fn index_of(&self, term: &str) -> u32 {
        self.term_index.get(term).copied().unwrap_or(Self::OOV)
    }

    pub fn encode(&self, terms: &[String]) -> Vec<u32> {
        terms.iter().map(|t| self.index_of(t)).collect()
    }
}
