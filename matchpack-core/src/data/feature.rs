//! Feature cell values and the homogeneous columns batches are assembled into.

use crate::error::PackError;
use serde::{Deserialize, Serialize};

/// Kind of value stored in a feature column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Int,
    Float,
    Text,
    Tokens,
    Vector,
}

impl std::fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FeatureKind::Int => "int",
            FeatureKind::Float => "float",
            FeatureKind::Text => "text",
            FeatureKind::Tokens => "tokens",
            FeatureKind::Vector => "vector",
        };
        f.write_str(name)
    }
}

/// A single feature value of one entity row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Feature {
    Int(i64),
    Float(f64),
    Text(String),
    /// Token ids, e.g. a tokenized and indexed text.
    Tokens(Vec<u32>),
    /// Dense real-valued vector, e.g. an embedding or a letter-trigram histogram.
    Vector(Vec<f64>),
}

impl Feature {
    pub fn kind(&self) -> FeatureKind {
        match self {
            Feature::Int(_) => FeatureKind::Int,
            Feature::Float(_) => FeatureKind::Float,
            Feature::Text(_) => FeatureKind::Text,
            Feature::Tokens(_) => FeatureKind::Tokens,
            Feature::Vector(_) => FeatureKind::Vector,
        }
    }
}

impl From<i64> for Feature {
    fn from(v: i64) -> Self {
        Feature::Int(v)
    }
}

impl From<f64> for Feature {
    fn from(v: f64) -> Self {
        Feature::Float(v)
    }
}

impl From<&str> for Feature {
    fn from(v: &str) -> Self {
        Feature::Text(v.to_string())
    }
}

impl From<String> for Feature {
    fn from(v: String) -> Self {
        Feature::Text(v)
    }
}

impl From<Vec<u32>> for Feature {
    fn from(v: Vec<u32>) -> Self {
        Feature::Tokens(v)
    }
}

impl From<Vec<f64>> for Feature {
    fn from(v: Vec<f64>) -> Self {
        Feature::Vector(v)
    }
}

/// A batch column: one value per batch row, all of the same kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "snake_case")]
pub enum Column {
    Int(Vec<i64>),
    Float(Vec<f64>),
    Text(Vec<String>),
    Tokens(Vec<Vec<u32>>),
    Vector(Vec<Vec<f64>>),
}

impl Column {
    pub fn with_capacity(kind: FeatureKind, capacity: usize) -> Self {
        match kind {
            FeatureKind::Int => Column::Int(Vec::with_capacity(capacity)),
            FeatureKind::Float => Column::Float(Vec::with_capacity(capacity)),
            FeatureKind::Text => Column::Text(Vec::with_capacity(capacity)),
            FeatureKind::Tokens => Column::Tokens(Vec::with_capacity(capacity)),
            FeatureKind::Vector => Column::Vector(Vec::with_capacity(capacity)),
        }
    }

    pub fn kind(&self) -> FeatureKind {
        match self {
            Column::Int(_) => FeatureKind::Int,
            Column::Float(_) => FeatureKind::Float,
            Column::Text(_) => FeatureKind::Text,
            Column::Tokens(_) => FeatureKind::Tokens,
            Column::Vector(_) => FeatureKind::Vector,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Int(v) => v.len(),
            Column::Float(v) => v.len(),
            Column::Text(v) => v.len(),
            Column::Tokens(v) => v.len(),
            Column::Vector(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a value; its kind must match the column's.
    pub fn push(&mut self, value: &Feature) -> Result<(), PackError> {
        match (self, value) {
            (Column::Int(col), Feature::Int(v)) => col.push(*v),
            (Column::Float(col), Feature::Float(v)) => col.push(*v),
            (Column::Text(col), Feature::Text(v)) => col.push(v.clone()),
            (Column::Tokens(col), Feature::Tokens(v)) => col.push(v.clone()),
            (Column::Vector(col), Feature::Vector(v)) => col.push(v.clone()),
            (col, value) => {
                return Err(PackError::integrity(format!(
                    "cannot push {} value into {} column",
                    value.kind(),
                    col.kind()
                )));
            }
        }
        Ok(())
    }

    pub fn as_ints(&self) -> Option<&[i64]> {
        match self {
            Column::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_floats(&self) -> Option<&[f64]> {
        match self {
            Column::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_texts(&self) -> Option<&[String]> {
        match self {
            Column::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_tokens(&self) -> Option<&[Vec<u32>]> {
        match self {
            Column::Tokens(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vectors(&self) -> Option<&[Vec<f64>]> {
        match self {
            Column::Vector(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_matching_kind() {
        let mut col = Column::with_capacity(FeatureKind::Tokens, 2);
        col.push(&Feature::Tokens(vec![1, 2])).unwrap();
        col.push(&Feature::Tokens(vec![3])).unwrap();
        assert_eq!(col.len(), 2);
        assert_eq!(col.as_tokens().unwrap()[1], vec![3]);
    }

    #[test]
    fn test_push_mismatched_kind_fails() {
        let mut col = Column::with_capacity(FeatureKind::Int, 1);
        let err = col.push(&Feature::Text("x".into())).unwrap_err();
        assert!(matches!(err, PackError::Integrity(_)));
        assert!(col.is_empty());
    }

    #[test]
    fn test_feature_serde_keeps_kind() {
        let f = Feature::Vector(vec![1.0, 2.0]);
        let json = serde_json::to_string(&f).unwrap();
        assert_eq!(json, r#"{"type":"vector","value":[1.0,2.0]}"#);
        let back: Feature = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind(), FeatureKind::Vector);
    }
}
