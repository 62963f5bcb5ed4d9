use serde::{Deserialize, Serialize};

use crate::recon::ColumnReconConfig;

/// Metadata for a single column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    /// Values in this column are expected to be distinct across rows.
    #[serde(default)]
    pub unique: bool,
    /// Set once a reconciliation run has judged this column's cells.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub recon_config: Option<ColumnReconConfig>,
}

impl ColumnMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        ColumnMetadata {
            name: name.into(),
            unique: false,
            recon_config: None,
        }
    }
}

/// An ordered sequence of columns. Lookup by name is exact-match; a missing
/// name is a recoverable condition, not a fault.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnModel {
    pub columns: Vec<ColumnMetadata>,
}

impl ColumnModel {
    pub fn new(columns: Vec<ColumnMetadata>) -> Self {
        ColumnModel { columns }
    }

    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        ColumnModel {
            columns: names
                .iter()
                .map(|n| ColumnMetadata::new(n.as_ref()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column_name(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(|c| c.name.as_str())
    }
}
