//! Row and record predicates.
//!
//! A facet with nothing selected contributes no filter at all (`None` at the
//! facet level), so the conjunction only ever holds real constraints.

use gridworks_model::{Grid, Record, Row};

/// Boolean predicate over a single row.
pub trait RowFilter: Send + Sync {
    fn matches(&self, row_index: u64, row: &Row) -> bool;
}

/// Boolean predicate over a record (a group of consecutive rows).
pub trait RecordFilter: Send + Sync {
    fn matches(&self, record: Record, grid: &Grid) -> bool;
}

/// AND of row filters. Empty conjunction matches everything.
pub struct ConjunctiveRowFilter {
    filters: Vec<Box<dyn RowFilter>>,
}

impl ConjunctiveRowFilter {
    pub fn new(filters: Vec<Box<dyn RowFilter>>) -> Self {
        ConjunctiveRowFilter { filters }
    }
}

impl RowFilter for ConjunctiveRowFilter {
    fn matches(&self, row_index: u64, row: &Row) -> bool {
        self.filters.iter().all(|f| f.matches(row_index, row))
    }
}

/// AND of record filters. Empty conjunction matches everything.
pub struct ConjunctiveRecordFilter {
    filters: Vec<Box<dyn RecordFilter>>,
}

impl ConjunctiveRecordFilter {
    pub fn new(filters: Vec<Box<dyn RecordFilter>>) -> Self {
        ConjunctiveRecordFilter { filters }
    }
}

impl RecordFilter for ConjunctiveRecordFilter {
    fn matches(&self, record: Record, grid: &Grid) -> bool {
        self.filters.iter().all(|f| f.matches(record, grid))
    }
}

/// A record matches when any of its rows matches the row filter. Used for
/// non-inverted facets: "this entity has at least one matching statement".
pub struct AnyRowRecordFilter {
    pub row_filter: Box<dyn RowFilter>,
}

impl RecordFilter for AnyRowRecordFilter {
    fn matches(&self, record: Record, grid: &Grid) -> bool {
        grid.record_rows(record)
            .iter()
            .zip(record.row_indices())
            .any(|(row, i)| self.row_filter.matches(i, row))
    }
}

/// A record matches only when all of its rows match the row filter. Used for
/// inverted facets: the row filter already carries the negation, so requiring
/// every row to pass is what excludes a record containing a single
/// disqualifying row.
pub struct AllRowsRecordFilter {
    pub row_filter: Box<dyn RowFilter>,
}

impl RecordFilter for AllRowsRecordFilter {
    fn matches(&self, record: Record, grid: &Grid) -> bool {
        grid.record_rows(record)
            .iter()
            .zip(record.row_indices())
            .all(|(row, i)| self.row_filter.matches(i, row))
    }
}
