use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::column::ColumnModel;
use crate::record::Record;
use crate::row::Row;

/// Identity of a grid version: row count plus a content fingerprint.
///
/// Change data computed against one grid may only be joined against a grid
/// with the same version; comparing these two fields detects misalignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridVersion {
    pub rows: u64,
    pub fingerprint: u64,
}

/// A row paired with its stable index in the grid.
#[derive(Debug, Clone, Copy)]
pub struct IndexedRow<'a> {
    pub index: u64,
    pub row: &'a Row,
}

/// A contiguous block of rows for partition-parallel traversal.
#[derive(Debug, Clone, Copy)]
pub struct Partition<'a> {
    pub start: u64,
    pub rows: &'a [Row],
}

impl<'a> Partition<'a> {
    pub fn iter_indexed(&self) -> impl Iterator<Item = IndexedRow<'a>> + '_ {
        let start = self.start;
        self.rows.iter().enumerate().map(move |(i, row)| IndexedRow {
            index: start + i as u64,
            row,
        })
    }
}

/// An immutable, versioned table of rows over a column model.
#[derive(Debug, Clone)]
pub struct Grid {
    columns: ColumnModel,
    rows: Vec<Row>,
    version: GridVersion,
}

impl Grid {
    pub fn new(columns: ColumnModel, rows: Vec<Row>) -> Self {
        let version = GridVersion {
            rows: rows.len() as u64,
            fingerprint: fingerprint(&columns, &rows),
        };
        Grid {
            columns,
            rows,
            version,
        }
    }

    pub fn columns(&self) -> &ColumnModel {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn version(&self) -> GridVersion {
        self.version
    }

    /// A new grid version over the same column model.
    pub fn with_rows(&self, rows: Vec<Row>) -> Grid {
        Grid::new(self.columns.clone(), rows)
    }

    /// Lazy, restartable traversal in stable index order.
    pub fn iter_indexed(&self) -> impl Iterator<Item = IndexedRow<'_>> {
        self.rows.iter().enumerate().map(|(i, row)| IndexedRow {
            index: i as u64,
            row,
        })
    }

    /// Split into at most `count` contiguous partitions covering every row
    /// exactly once, in order.
    pub fn partitions(&self, count: usize) -> Vec<Partition<'_>> {
        let count = count.max(1);
        if self.rows.is_empty() {
            return vec![Partition {
                start: 0,
                rows: &[],
            }];
        }
        let chunk = self.rows.len().div_ceil(count);
        self.rows
            .chunks(chunk)
            .enumerate()
            .map(|(i, rows)| Partition {
                start: (i * chunk) as u64,
                rows,
            })
            .collect()
    }

    /// Record grouping over the full grid: a record starts at row 0 and at
    /// every row with a non-blank cell in the key column. Computed before any
    /// partitioning, so partition boundaries can never split a record.
    pub fn records(&self, key_column: usize) -> Vec<Record> {
        let mut records = Vec::new();
        let mut start = 0u64;
        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 && !row.is_cell_blank(key_column) {
                records.push(Record {
                    start,
                    end: i as u64,
                });
                start = i as u64;
            }
        }
        if !self.rows.is_empty() {
            records.push(Record {
                start,
                end: self.rows.len() as u64,
            });
        }
        records
    }

    /// The rows belonging to a record.
    pub fn record_rows(&self, record: Record) -> &[Row] {
        &self.rows[record.start as usize..record.end as usize]
    }
}

fn fingerprint(columns: &ColumnModel, rows: &[Row]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for column in &columns.columns {
        column.name.hash(&mut hasher);
    }
    for row in rows {
        row.hash(&mut hasher);
    }
    hasher.finish()
}
