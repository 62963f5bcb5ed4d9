//! File import and export.
//!
//! Delimited text comes in through the `csv` module (delimiter sniffing,
//! Windows-1252 fallback, header row, value typing), fixed-width text
//! through `fixed_width` (explicit or guessed column widths). Both parse
//! into versioned grids. `lines` provides the restartable lazy line
//! sequence the importers share.

pub mod csv;
pub mod error;
pub mod fixed_width;
pub mod lines;

pub use error::ImportError;
pub use lines::{LinePass, LineSequence};
