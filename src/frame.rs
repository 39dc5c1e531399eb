//! In-memory tabular payloads.
//!
//! A [`DataFrame`] is the unit of exchange between dataframe retrievers,
//! the join step, and the serialization boundary: ordered rows over a set
//! of uniquely named columns, with JSON values as cells.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FrameError;

/// An ordered table with named columns and JSON-valued cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFrame {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl DataFrame {
    /// Create a frame from columns and rows.
    ///
    /// Column names must be unique and every row must have exactly one
    /// cell per column.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, FrameError> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(FrameError::DuplicateColumn(column.clone()));
            }
        }
        for row in &rows {
            if row.len() != columns.len() {
                return Err(FrameError::RowWidth {
                    expected: columns.len(),
                    got: row.len(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    /// Build a frame from a JSON array of row-objects.
    ///
    /// Columns are the union of keys across all records, in first-seen
    /// order; a record missing a key gets a null cell.
    pub fn from_records(records: &[Value]) -> Result<Self, FrameError> {
        let mut columns: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for record in records {
            let object = record.as_object().ok_or(FrameError::NotAnObject)?;
            for key in object.keys() {
                if seen.insert(key.clone()) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = records
            .iter()
            .map(|record| {
                let object = record.as_object().expect("validated above");
                columns
                    .iter()
                    .map(|column| object.get(column).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Borrow a row by its dense index.
    pub fn row(&self, index: usize) -> Option<&[Value]> {
        self.rows.get(index).map(|r| r.as_slice())
    }

    /// Serialize to the wire format: an ordered sequence of row-objects,
    /// one per row, each mapping column name to value. Row order equals
    /// table row order, re-indexed densely from zero.
    pub fn to_records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let mut object = serde_json::Map::with_capacity(self.columns.len());
                for (column, cell) in self.columns.iter().zip(row) {
                    object.insert(column.clone(), cell.clone());
                }
                Value::Object(object)
            })
            .collect()
    }

    /// Inner-join two frames on a key column from each side.
    ///
    /// Only rows whose key value appears on both sides survive; unmatched
    /// rows are dropped, never null-padded. Output columns are all left
    /// columns followed by the right columns, minus the right key and any
    /// right column whose name collides with a left column. Output row
    /// order follows the left frame, with right-side matches in their
    /// native order. Rows with a null key never match.
    pub fn inner_join(
        &self,
        other: &DataFrame,
        left_key: &str,
        right_key: &str,
    ) -> Result<DataFrame, FrameError> {
        let left_idx = self
            .column_index(left_key)
            .ok_or_else(|| FrameError::UnknownColumn(left_key.to_string()))?;
        let right_idx = other
            .column_index(right_key)
            .ok_or_else(|| FrameError::UnknownColumn(right_key.to_string()))?;

        // Right columns carried into the output, by position.
        let carried: Vec<usize> = (0..other.columns.len())
            .filter(|&i| i != right_idx && !self.columns.contains(&other.columns[i]))
            .collect();

        let mut columns = self.columns.clone();
        columns.extend(carried.iter().map(|&i| other.columns[i].clone()));

        // Index the right side by key value. Values are hashed through
        // their canonical JSON encoding since Value itself is not Hash.
        let mut by_key: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, row) in other.rows.iter().enumerate() {
            let key = &row[right_idx];
            if key.is_null() {
                continue;
            }
            by_key.entry(key.to_string()).or_default().push(i);
        }

        let mut rows = Vec::new();
        for left_row in &self.rows {
            let key = &left_row[left_idx];
            if key.is_null() {
                continue;
            }
            if let Some(matches) = by_key.get(&key.to_string()) {
                for &right_i in matches {
                    let mut row = left_row.clone();
                    row.extend(carried.iter().map(|&i| other.rows[right_i][i].clone()));
                    rows.push(row);
                }
            }
        }

        Ok(DataFrame { columns, rows })
    }
}
