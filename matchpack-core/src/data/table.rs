//! Entity tables: id-indexed rows of named feature columns.
//!
//! Values are stored column-major so that gathering one column for a batch
//! walks a single vector. The id index is rebuilt (and re-validated) whenever
//! a table is deserialized.

use crate::data::feature::{Column, Feature, FeatureKind};
use crate::error::PackError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Name and kind of one entity table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: FeatureKind,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, kind: FeatureKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// A table of entities (queries or documents) keyed by unique string ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TableRecord", into = "TableRecord")]
pub struct EntityTable {
    columns: Vec<ColumnSpec>,
    ids: Vec<String>,
    values: Vec<Vec<Feature>>,
    index: HashMap<String, usize>,
}

impl EntityTable {
    pub fn builder(columns: Vec<ColumnSpec>) -> EntityTableBuilder {
        EntityTableBuilder::new(columns)
    }

    /// Number of entity rows.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Row position of `id`, in O(1).
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Feature value of `id` in the named column.
    pub fn get(&self, id: &str, column: &str) -> Option<&Feature> {
        let row = self.position(id)?;
        let col = self.columns.iter().position(|c| c.name == column)?;
        self.values[col].get(row)
    }

    /// The full feature row of `id`, in column order.
    pub fn row(&self, id: &str) -> Option<Vec<&Feature>> {
        let row = self.position(id)?;
        Some(self.values.iter().map(|col| &col[row]).collect())
    }

    /// Gather one column at the given row positions into a batch column.
    pub fn gather(&self, column: usize, positions: &[usize]) -> Result<Column, PackError> {
        let spec = self
            .columns
            .get(column)
            .ok_or_else(|| PackError::integrity(format!("no column at position {column}")))?;
        let values = &self.values[column];
        let mut out = Column::with_capacity(spec.kind, positions.len());
        for &pos in positions {
            let value = values.get(pos).ok_or_else(|| {
                PackError::integrity(format!(
                    "row position {pos} out of range for table of {} rows",
                    values.len()
                ))
            })?;
            out.push(value)?;
        }
        Ok(out)
    }
}

/// Incremental constructor for [`EntityTable`]; every row is validated on push.
#[derive(Debug, Clone)]
pub struct EntityTableBuilder {
    columns: Vec<ColumnSpec>,
    ids: Vec<String>,
    values: Vec<Vec<Feature>>,
    index: HashMap<String, usize>,
    duplicate_column: Option<String>,
}

impl EntityTableBuilder {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        let duplicate_column = columns
            .iter()
            .enumerate()
            .find(|(i, col)| columns[..*i].iter().any(|c| c.name == col.name))
            .map(|(_, col)| col.name.clone());
        let values = columns.iter().map(|_| Vec::new()).collect();
        Self {
            columns,
            ids: Vec::new(),
            values,
            index: HashMap::new(),
            duplicate_column,
        }
    }

    /// Append one entity row. Values are given in column order.
    pub fn push_row(
        &mut self,
        id: impl Into<String>,
        row: Vec<Feature>,
    ) -> Result<&mut Self, PackError> {
        let id = id.into();
        if self.index.contains_key(&id) {
            return Err(PackError::integrity(format!("duplicate entity id: {id}")));
        }
        if row.len() != self.columns.len() {
            return Err(PackError::integrity(format!(
                "row {id} has {} values but the table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        if let Some((spec, value)) = self
            .columns
            .iter()
            .zip(&row)
            .find(|(spec, value)| spec.kind != value.kind())
        {
            return Err(PackError::integrity(format!(
                "row {id} column {} expects {} but got {}",
                spec.name,
                spec.kind,
                value.kind()
            )));
        }

        self.index.insert(id.clone(), self.ids.len());
        self.ids.push(id);
        for (col, value) in self.values.iter_mut().zip(row) {
            col.push(value);
        }
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn build(self) -> Result<EntityTable, PackError> {
        if let Some(name) = self.duplicate_column {
            return Err(PackError::config(format!("duplicate column name: {name}")));
        }
        Ok(EntityTable {
            columns: self.columns,
            ids: self.ids,
            values: self.values,
            index: self.index,
        })
    }
}

/// Serialized form of an [`EntityTable`]; row-major for readability on disk.
#[derive(Serialize, Deserialize)]
pub(crate) struct TableRecord {
    columns: Vec<ColumnSpec>,
    rows: Vec<(String, Vec<Feature>)>,
}

impl TryFrom<TableRecord> for EntityTable {
    type Error = PackError;

    fn try_from(record: TableRecord) -> Result<Self, Self::Error> {
        let mut builder = EntityTableBuilder::new(record.columns);
        for (id, row) in record.rows {
            builder.push_row(id, row)?;
        }
        builder.build()
    }
}

impl From<EntityTable> for TableRecord {
    fn from(table: EntityTable) -> Self {
        let EntityTable {
            columns,
            ids,
            values,
            ..
        } = table;
        let mut rows: Vec<(String, Vec<Feature>)> = ids
            .into_iter()
            .map(|id| (id, Vec::with_capacity(columns.len())))
            .collect();
        for col in values {
            for (row, value) in rows.iter_mut().zip(col) {
                row.1.push(value);
            }
        }
        TableRecord { columns, rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn left_columns() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::new("text_left", FeatureKind::Tokens),
            ColumnSpec::new("length_left", FeatureKind::Int),
        ]
    }

    fn sample_table() -> EntityTable {
        let mut builder = EntityTable::builder(left_columns());
        builder
            .push_row("q0", vec![vec![1u32, 2].into(), 2i64.into()])
            .unwrap()
            .push_row("q1", vec![vec![4u32, 5, 6].into(), 3i64.into()])
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn test_lookup_by_id() {
        let table = sample_table();
        assert_eq!(table.len(), 2);
        assert_eq!(table.position("q1"), Some(1));
        assert_eq!(table.get("q0", "length_left"), Some(&Feature::Int(2)));
        assert!(table.get("q9", "length_left").is_none());
        assert!(table.get("q0", "missing").is_none());
        let row = table.row("q1").unwrap();
        assert_eq!(row[0], &Feature::Tokens(vec![4, 5, 6]));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut builder = EntityTable::builder(left_columns());
        builder
            .push_row("q0", vec![vec![1u32].into(), 1i64.into()])
            .unwrap();
        let err = builder
            .push_row("q0", vec![vec![2u32].into(), 1i64.into()])
            .unwrap_err();
        assert!(matches!(err, PackError::Integrity(_)));
        assert_eq!(builder.len(), 1);
    }

    #[test]
    fn test_inconsistent_columns_rejected() {
        let mut builder = EntityTable::builder(left_columns());
        let arity = builder.push_row("q0", vec![vec![1u32].into()]).unwrap_err();
        assert!(arity.to_string().contains("1 values"));

        let kind = builder
            .push_row("q0", vec![2i64.into(), 1i64.into()])
            .unwrap_err();
        assert!(kind.to_string().contains("expects tokens"));
    }

    #[test]
    fn test_duplicate_column_name_rejected() {
        let builder = EntityTable::builder(vec![
            ColumnSpec::new("a", FeatureKind::Int),
            ColumnSpec::new("a", FeatureKind::Float),
        ]);
        let copy = builder.clone();
        assert!(matches!(builder.build(), Err(PackError::Config(_))));
        let err = copy.build().unwrap_err();
        assert!(err.to_string().contains("duplicate column name: a"));
    }

    #[test]
    fn test_cloned_builder_is_independent() {
        let mut builder = EntityTable::builder(left_columns());
        builder
            .push_row("q0", vec![vec![1u32].into(), 1i64.into()])
            .unwrap();
        let mut fork = builder.clone();
        fork.push_row("q1", vec![vec![2u32].into(), 1i64.into()])
            .unwrap();
        assert_eq!(builder.build().unwrap().len(), 1);
        assert_eq!(fork.build().unwrap().len(), 2);
    }

    #[test]
    fn test_gather_column() {
        let table = sample_table();
        let col = table.gather(1, &[1, 0, 1]).unwrap();
        assert_eq!(col, Column::Int(vec![3, 2, 3]));
        assert!(table.gather(1, &[5]).is_err());
        assert!(table.gather(7, &[0]).is_err());
    }

    #[test]
    fn test_serde_rebuilds_index() {
        let table = sample_table();
        let json = serde_json::to_string(&table).unwrap();
        let back: EntityTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
        assert_eq!(back.position("q1"), Some(1));
    }

    #[test]
    fn test_deserialize_duplicate_ids_fails() {
        let json = r#"{"columns":[{"name":"n","kind":"int"}],
            "rows":[["a",[{"type":"int","value":1}]],["a",[{"type":"int","value":2}]]]}"#;
        assert!(serde_json::from_str::<EntityTable>(json).is_err());
    }
}
