//! Column-oriented tables for targets, truth and object-truth records
//!
//! A [`Table`] is an ordered list of equal-length named columns. Columns are
//! typed (`Int`, `Float`, `Text`) and may carry a null mask, which is how an
//! outer-join stack records rows that never had a value for a column.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TableError {
    #[error("Column {name} has {got} rows, table has {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("Missing column {0}")]
    MissingColumn(String),

    #[error("Column {name} already exists")]
    DuplicateColumn { name: String },

    #[error("Column {name} is {got:?}, expected {expected:?}")]
    TypeMismatch {
        name: String,
        expected: ColumnType,
        got: ColumnType,
    },

    #[error("Row index {index} out of range for table with {nrows} rows")]
    RowOutOfRange { index: usize, nrows: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int,
    Float,
    Text,
}

/// Typed column values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum ColumnData {
    Int(Vec<i64>),
    Float(#[serde(with = "nullable_floats")] Vec<f64>),
    Text(Vec<String>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Int(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> ColumnType {
        match self {
            ColumnData::Int(_) => ColumnType::Int,
            ColumnData::Float(_) => ColumnType::Float,
            ColumnData::Text(_) => ColumnType::Text,
        }
    }

    /// `n` null placeholders of the given type: 0, NaN or the empty string
    pub fn nulls(dtype: ColumnType, n: usize) -> Self {
        match dtype {
            ColumnType::Int => ColumnData::Int(vec![0; n]),
            ColumnType::Float => ColumnData::Float(vec![f64::NAN; n]),
            ColumnType::Text => ColumnData::Text(vec![String::new(); n]),
        }
    }

    fn take(&self, indices: &[usize]) -> Self {
        match self {
            ColumnData::Int(v) => ColumnData::Int(indices.iter().map(|&i| v[i]).collect()),
            ColumnData::Float(v) => ColumnData::Float(indices.iter().map(|&i| v[i]).collect()),
            ColumnData::Text(v) => ColumnData::Text(indices.iter().map(|&i| v[i].clone()).collect()),
        }
    }

    fn append(&mut self, other: &ColumnData) {
        match (self, other) {
            (ColumnData::Int(a), ColumnData::Int(b)) => a.extend_from_slice(b),
            (ColumnData::Float(a), ColumnData::Float(b)) => a.extend_from_slice(b),
            (ColumnData::Text(a), ColumnData::Text(b)) => a.extend_from_slice(b),
            // Callers check dtypes before appending
            _ => unreachable!("append across column types"),
        }
    }
}

impl From<Vec<i64>> for ColumnData {
    fn from(v: Vec<i64>) -> Self {
        ColumnData::Int(v)
    }
}

impl From<Vec<f64>> for ColumnData {
    fn from(v: Vec<f64>) -> Self {
        ColumnData::Float(v)
    }
}

impl From<Vec<String>> for ColumnData {
    fn from(v: Vec<String>) -> Self {
        ColumnData::Text(v)
    }
}

/// A named column with an optional null mask (`true` marks a null)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<Vec<bool>>,
}

impl Column {
    pub fn is_null(&self, row: usize) -> bool {
        self.mask.as_ref().is_some_and(|m| m[row])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
    nrows: usize,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nrows == 0
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Append a column. The first column fixes the row count of an empty table.
    pub fn add_column(
        &mut self,
        name: impl Into<String>,
        data: impl Into<ColumnData>,
    ) -> Result<(), TableError> {
        let name = name.into();
        let data = data.into();
        if self.has_column(&name) {
            return Err(TableError::DuplicateColumn { name });
        }
        if self.columns.is_empty() {
            self.nrows = data.len();
        } else if data.len() != self.nrows {
            return Err(TableError::LengthMismatch {
                name,
                expected: self.nrows,
                got: data.len(),
            });
        }
        self.columns.push(Column {
            name,
            data,
            mask: None,
        });
        Ok(())
    }

    /// Replace a column's values, or append it if absent
    pub fn set_column(
        &mut self,
        name: impl Into<String>,
        data: impl Into<ColumnData>,
    ) -> Result<(), TableError> {
        let name = name.into();
        let data = data.into();
        match self.position(&name) {
            Some(i) => {
                if data.len() != self.nrows {
                    return Err(TableError::LengthMismatch {
                        name,
                        expected: self.nrows,
                        got: data.len(),
                    });
                }
                self.columns[i].data = data;
                self.columns[i].mask = None;
                Ok(())
            }
            None => self.add_column(name, data),
        }
    }

    /// Append every column of `other`, which must have the same row count
    pub fn append_columns(&mut self, other: Table) -> Result<(), TableError> {
        for column in other.columns {
            let name = column.name.clone();
            self.add_column(column.name, column.data)?;
            if let (Some(mask), Some(i)) = (column.mask, self.position(&name)) {
                self.columns[i].mask = Some(mask);
            }
        }
        Ok(())
    }

    pub fn remove_column(&mut self, name: &str) -> Option<Column> {
        self.position(name).map(|i| self.columns.remove(i))
    }

    pub fn column(&self, name: &str) -> Result<&Column, TableError> {
        self.position(name)
            .map(|i| &self.columns[i])
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    fn column_mut(&mut self, name: &str) -> Result<&mut Column, TableError> {
        match self.position(name) {
            Some(i) => Ok(&mut self.columns[i]),
            None => Err(TableError::MissingColumn(name.to_string())),
        }
    }

    pub fn ints(&self, name: &str) -> Result<&[i64], TableError> {
        match &self.column(name)?.data {
            ColumnData::Int(v) => Ok(v),
            other => Err(type_mismatch(name, ColumnType::Int, other.dtype())),
        }
    }

    pub fn floats(&self, name: &str) -> Result<&[f64], TableError> {
        match &self.column(name)?.data {
            ColumnData::Float(v) => Ok(v),
            other => Err(type_mismatch(name, ColumnType::Float, other.dtype())),
        }
    }

    pub fn texts(&self, name: &str) -> Result<&[String], TableError> {
        match &self.column(name)?.data {
            ColumnData::Text(v) => Ok(v),
            other => Err(type_mismatch(name, ColumnType::Text, other.dtype())),
        }
    }

    pub fn ints_mut(&mut self, name: &str) -> Result<&mut [i64], TableError> {
        match &mut self.column_mut(name)?.data {
            ColumnData::Int(v) => Ok(v),
            other => Err(type_mismatch(name, ColumnType::Int, other.dtype())),
        }
    }

    pub fn floats_mut(&mut self, name: &str) -> Result<&mut [f64], TableError> {
        match &mut self.column_mut(name)?.data {
            ColumnData::Float(v) => Ok(v),
            other => Err(type_mismatch(name, ColumnType::Float, other.dtype())),
        }
    }

    pub fn is_null(&self, name: &str, row: usize) -> Result<bool, TableError> {
        if row >= self.nrows {
            return Err(TableError::RowOutOfRange {
                index: row,
                nrows: self.nrows,
            });
        }
        Ok(self.column(name)?.is_null(row))
    }

    /// New table holding rows `indices` in the given order
    pub fn take(&self, indices: &[usize]) -> Result<Table, TableError> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.nrows) {
            return Err(TableError::RowOutOfRange {
                index: bad,
                nrows: self.nrows,
            });
        }
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                data: c.data.take(indices),
                mask: c
                    .mask
                    .as_ref()
                    .map(|m| indices.iter().map(|&i| m[i]).collect()),
            })
            .collect();
        Ok(Table {
            columns,
            nrows: indices.len(),
        })
    }

    /// Stack tables vertically with outer-join semantics.
    ///
    /// The output holds the union of all column names in first-seen order.
    /// Rows coming from a table that lacks a column get the type's null value
    /// and are masked. A name that appears with two different types is a
    /// [`TableError::TypeMismatch`].
    pub fn vstack_outer(tables: &[Table]) -> Result<Table, TableError> {
        let mut schema: Vec<(String, ColumnType)> = Vec::new();
        for table in tables {
            for column in &table.columns {
                match schema.iter().find(|(name, _)| *name == column.name) {
                    Some((_, dtype)) if *dtype != column.data.dtype() => {
                        return Err(type_mismatch(&column.name, *dtype, column.data.dtype()));
                    }
                    Some(_) => {}
                    None => schema.push((column.name.clone(), column.data.dtype())),
                }
            }
        }

        let nrows: usize = tables.iter().map(|t| t.nrows).sum();
        let mut columns = Vec::with_capacity(schema.len());
        for (name, dtype) in schema {
            let mut data = ColumnData::nulls(dtype, 0);
            let mut mask = Vec::with_capacity(nrows);
            for table in tables {
                match table.position(&name) {
                    Some(i) => {
                        let column = &table.columns[i];
                        data.append(&column.data);
                        match &column.mask {
                            Some(m) => mask.extend_from_slice(m),
                            None => mask.extend(std::iter::repeat(false).take(table.nrows)),
                        }
                    }
                    None => {
                        data.append(&ColumnData::nulls(dtype, table.nrows));
                        mask.extend(std::iter::repeat(true).take(table.nrows));
                    }
                }
            }
            let mask = mask.iter().any(|&m| m).then_some(mask);
            columns.push(Column { name, data, mask });
        }

        Ok(Table { columns, nrows })
    }
}

fn type_mismatch(name: &str, expected: ColumnType, got: ColumnType) -> TableError {
    TableError::TypeMismatch {
        name: name.to_string(),
        expected,
        got,
    }
}

/// JSON has no NaN, so null floats travel as `null`
mod nullable_floats {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(|v| v.is_finite().then_some(*v)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let values = Vec::<Option<f64>>::deserialize(deserializer)?;
        Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut t = Table::new();
        t.add_column("ID", vec![1i64, 2, 3]).unwrap();
        t.add_column("Z", vec![0.5, 1.0, 1.5]).unwrap();
        t.add_column("TYPE", vec!["QSO".to_string(), "QSO".into(), "LRG".into()])
            .unwrap();
        t
    }

    #[test]
    fn test_add_column_checks_length() {
        let mut t = sample();
        let err = t.add_column("BAD", vec![1.0, 2.0]).unwrap_err();
        assert_eq!(
            err,
            TableError::LengthMismatch {
                name: "BAD".into(),
                expected: 3,
                got: 2
            }
        );
        assert!(matches!(
            t.add_column("ID", vec![0i64; 3]),
            Err(TableError::DuplicateColumn { .. })
        ));
    }

    #[test]
    fn test_typed_access() {
        let t = sample();
        assert_eq!(t.ints("ID").unwrap(), &[1, 2, 3]);
        assert_eq!(t.texts("TYPE").unwrap()[2], "LRG");
        assert!(matches!(
            t.floats("ID"),
            Err(TableError::TypeMismatch { .. })
        ));
        assert_eq!(
            t.floats("MISSING"),
            Err(TableError::MissingColumn("MISSING".into()))
        );
    }

    #[test]
    fn test_take() {
        let t = sample().take(&[2, 0]).unwrap();
        assert_eq!(t.nrows(), 2);
        assert_eq!(t.ints("ID").unwrap(), &[3, 1]);
        assert!(sample().take(&[3]).is_err());
    }

    #[test]
    fn test_vstack_outer_fills_missing_columns() {
        let a = sample();
        let mut b = Table::new();
        b.add_column("ID", vec![10i64, 11]).unwrap();
        b.add_column("VDISP", vec![150.0, 200.0]).unwrap();

        let stacked = Table::vstack_outer(&[a, b]).unwrap();
        assert_eq!(stacked.nrows(), 5);
        assert_eq!(stacked.column_names(), vec!["ID", "Z", "TYPE", "VDISP"]);
        assert_eq!(stacked.ints("ID").unwrap(), &[1, 2, 3, 10, 11]);

        assert!(!stacked.is_null("Z", 0).unwrap());
        assert!(stacked.is_null("Z", 3).unwrap());
        assert!(stacked.floats("Z").unwrap()[4].is_nan());
        assert!(stacked.is_null("VDISP", 1).unwrap());
        assert_eq!(stacked.floats("VDISP").unwrap()[3], 150.0);
        assert_eq!(stacked.texts("TYPE").unwrap()[3], "");
        assert!(stacked.column("ID").unwrap().mask.is_none());
    }

    #[test]
    fn test_vstack_outer_type_clash() {
        let mut a = Table::new();
        a.add_column("X", vec![1i64]).unwrap();
        let mut b = Table::new();
        b.add_column("X", vec![1.0]).unwrap();
        assert!(matches!(
            Table::vstack_outer(&[a, b]),
            Err(TableError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_vstack_keeps_existing_masks() {
        let mut a = Table::new();
        a.add_column("X", vec![1.0]).unwrap();
        let mut b = Table::new();
        b.add_column("Y", vec![2.0]).unwrap();
        let ab = Table::vstack_outer(&[a, b]).unwrap();
        let again = Table::vstack_outer(&[ab.clone(), ab]).unwrap();
        assert!(again.is_null("X", 1).unwrap());
        assert!(again.is_null("X", 3).unwrap());
        assert!(!again.is_null("X", 2).unwrap());
    }

    #[test]
    fn test_json_preserves_nulls() {
        let mut a = Table::new();
        a.add_column("X", vec![1.0]).unwrap();
        let mut b = Table::new();
        b.add_column("Y", vec![2.0]).unwrap();
        let stacked = Table::vstack_outer(&[a, b]).unwrap();

        let json = serde_json::to_string(&stacked).unwrap();
        let back: Table = serde_json::from_str(&json).unwrap();
        assert_eq!(back.nrows(), 2);
        assert!(back.floats("X").unwrap()[1].is_nan());
        assert!(back.is_null("Y", 0).unwrap());
        assert_eq!(back.floats("Y").unwrap()[1], 2.0);
    }

    #[test]
    fn test_set_column_replaces() {
        let mut t = sample();
        t.set_column("Z", vec![0.0, 0.0, 0.0]).unwrap();
        assert_eq!(t.floats("Z").unwrap(), &[0.0, 0.0, 0.0]);
        t.set_column("NEW", vec![1i64, 1, 1]).unwrap();
        assert_eq!(t.ncols(), 4);
    }
}
