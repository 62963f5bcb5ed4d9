use serde::{Deserialize, Serialize};

/// A maximal run of consecutive rows forming one logical entity: only the
/// first row carries a non-blank value in the designated key column.
///
/// Half-open row range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub start: u64,
    pub end: u64,
}

impl Record {
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    pub fn row_indices(&self) -> impl Iterator<Item = u64> {
        self.start..self.end
    }
}
