//! Tabular data model.
//!
//! Key invariants:
//! - A `Grid` is immutable once constructed; edits build a new `Grid`
//! - Row iteration yields rows in stable index order, partitioned or not
//! - Record boundaries depend only on key-column blankness, never on
//!   partition boundaries

pub mod cell;
pub mod column;
pub mod grid;
pub mod recon;
pub mod record;
pub mod row;

pub use cell::{Cell, CellValue};
pub use column::{ColumnMetadata, ColumnModel};
pub use grid::{Grid, GridVersion, IndexedRow, Partition};
pub use recon::{ColumnReconConfig, Judgment, Recon, ReconCandidate, ReconFeatures};
pub use record::Record;
pub use row::Row;
