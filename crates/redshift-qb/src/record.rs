//! Result rows as ordered column-name-to-value mappings.

use crate::error::{QbError, QbResult};
use crate::value::Value;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::sync::Arc;
use tokio_postgres::Row;

/// One result row.
///
/// Columns keep the order reported by the driver's result description. All
/// records of one result set share the same column list.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Record {
    /// Build a record from a shared column list and matching values.
    ///
    /// Callers guarantee `columns` and `values` have the same length.
    pub(crate) fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        assert_eq!(
            columns.len(),
            values.len(),
            "record has {} columns but {} values",
            columns.len(),
            values.len()
        );
        Self { columns, values }
    }

    /// Build a record from `(column, value)` pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let (columns, values): (Vec<String>, Vec<Value>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self {
            columns: columns.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Value of the named column.
    ///
    /// If the result has duplicate column names the last one wins, matching
    /// how the row would read as a plain map.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .rposition(|c| c == column)
            .map(|idx| &self.values[idx])
    }

    /// Value at a column position.
    pub fn get_index(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    pub fn contains_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Iterate `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Decode every row of a result set.
    pub fn from_rows(rows: &[Row]) -> QbResult<Vec<Record>> {
        let Some(first) = rows.first() else {
            return Ok(Vec::new());
        };
        let columns: Arc<[String]> = first
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        rows.iter()
            .map(|row| {
                let values = (0..columns.len())
                    .map(|idx| {
                        row.try_get::<_, Value>(idx)
                            .map_err(|e| QbError::decode(columns[idx].as_str(), e.to_string()))
                    })
                    .collect::<QbResult<Vec<_>>>()?;
                Ok(Record::new(Arc::clone(&columns), values))
            })
            .collect()
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::iter::Zip<std::vec::IntoIter<String>, std::vec::IntoIter<Value>>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.to_vec().into_iter().zip(self.values)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}
