use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::cell::{Cell, CellValue};

/// A row of cells aligned with the column model, plus user flags.
///
/// A row may hold fewer cells than the column count; missing trailing cells
/// read as blank.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    #[serde(default)]
    pub flagged: bool,
    #[serde(default)]
    pub starred: bool,
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(cells: Vec<Cell>) -> Self {
        Row {
            flagged: false,
            starred: false,
            cells,
        }
    }

    /// The cell at `index`, or None when the row is shorter than the column
    /// model.
    pub fn cell(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    /// The value at `index`; absent cells read as blank.
    pub fn value(&self, index: usize) -> &CellValue {
        static BLANK: CellValue = CellValue::Blank;
        self.cells.get(index).map(|c| &c.value).unwrap_or(&BLANK)
    }

    pub fn is_cell_blank(&self, index: usize) -> bool {
        self.value(index).is_blank()
    }

    /// A row is empty when every cell it holds is blank.
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|c| c.is_blank())
    }

    /// A copy of this row with the cell at `index` replaced, padding with
    /// blanks if the row is shorter.
    pub fn with_cell(&self, index: usize, cell: Cell) -> Row {
        let mut cells = self.cells.clone();
        if cells.len() <= index {
            cells.resize_with(index + 1, Cell::blank);
        }
        cells[index] = cell;
        Row {
            flagged: self.flagged,
            starred: self.starred,
            cells,
        }
    }
}

impl Hash for Row {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.flagged.hash(state);
        self.starred.hash(state);
        self.cells.hash(state);
    }
}
