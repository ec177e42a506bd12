//! Row-to-column condensation.
//!
//! Merges an ordered dataset of heterogeneous records into one value list per
//! column. Columns appear in first-seen order (the column name universe) and
//! every list is as long as the dataset: a column missing from record `i`
//! holds `None` at position `i`.

use std::collections::HashMap;

use crate::{kind::Scalar, record::Record};

pub type ColumnValues = Vec<Option<Scalar>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CondensedColumns {
    columns: Vec<(String, ColumnValues)>,
    positions: HashMap<String, usize>,
    rows: usize,
}

impl CondensedColumns {
    /// Number of input records, and the length of every column.
    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column names in first-seen order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&[Option<Scalar>]> {
        self.positions
            .get(name)
            .map(|&idx| self.columns[idx].1.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Option<Scalar>])> {
        self.columns
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn into_columns(self) -> Vec<(String, ColumnValues)> {
        self.columns
    }

    fn push_new_column(&mut self, name: String, values: ColumnValues) {
        self.positions.insert(name.clone(), self.columns.len());
        self.columns.push((name, values));
    }
}

pub fn condense<I>(records: I) -> CondensedColumns
where
    I: IntoIterator<Item = Record>,
{
    let mut condensed = CondensedColumns::default();
    for (idx, record) in records.into_iter().enumerate() {
        for (key, value) in record {
            match condensed.positions.get(&key) {
                Some(&pos) => condensed.columns[pos].1.push(value),
                None => {
                    let mut values = vec![None; idx];
                    values.push(value);
                    condensed.push_new_column(key, values);
                }
            }
        }
        // Columns this record did not mention still need a slot at `idx`.
        for (_, values) in &mut condensed.columns {
            if values.len() == idx {
                values.push(None);
            }
        }
        condensed.rows = idx + 1;
    }
    condensed
}
