//! Fixed-width text import.
//!
//! Column widths may be given explicitly or guessed from the data: a
//! character position that is a space on every sampled line is taken as a
//! column boundary. Guessing reads one pass over the file; parsing reads a
//! second, so the whole import never holds the file in memory.

use std::path::Path;

use gridworks_model::{Cell, CellValue, ColumnModel, Grid, Row};

use crate::error::ImportError;
use crate::lines::LineSequence;

const SAMPLE_LINES: usize = 100;
const SAMPLE_BYTES: usize = 64 * 1024;

/// Guess column widths from sample lines.
///
/// Counts, per character position of the first non-empty line, how many
/// lines carry a space there; positions blank on every line are column
/// boundaries, with the boundary space belonging to the column it ends.
/// Width-1 columns are merged into their right neighbor. Needs at least
/// three non-empty lines to commit to a guess.
pub fn guess_column_widths<'a, I>(lines: I) -> Option<Vec<usize>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: Option<Vec<usize>> = None;
    let mut total_bytes = 0usize;
    let mut line_count = 0usize;

    for line in lines {
        if total_bytes >= SAMPLE_BYTES || line_count >= SAMPLE_LINES {
            break;
        }
        total_bytes += line.len() + 1;
        if line.is_empty() {
            continue;
        }
        line_count += 1;

        let chars: Vec<char> = line.chars().collect();
        let counts = counts.get_or_insert_with(|| vec![0usize; chars.len()]);
        for (c, ch) in chars.iter().enumerate().take(counts.len()) {
            if *ch == ' ' {
                counts[c] += 1;
            }
        }
    }

    let counts = counts?;
    if line_count <= 2 {
        return None;
    }

    let mut widths = Vec::new();
    let mut start = 0usize;
    for (c, &count) in counts.iter().enumerate() {
        if count == line_count {
            widths.push(c - start + 1);
            start = c + 1;
        }
    }
    if widths.is_empty() {
        return None;
    }

    // A width-1 column is just a stray boundary; fold it into its neighbor.
    let mut i = widths.len() - 1;
    while i > 0 {
        i -= 1;
        if widths[i] == 1 {
            widths[i + 1] += 1;
            widths.remove(i);
        }
    }

    Some(widths)
}

/// Split one line into cells. Text past the last configured width becomes a
/// residual trailing cell rather than being dropped.
pub fn split_line(line: &str, widths: &[usize]) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    let mut cells = Vec::with_capacity(widths.len());
    let mut start = 0usize;

    for &width in widths {
        if start >= chars.len() {
            cells.push(String::new());
            continue;
        }
        let end = (start + width).min(chars.len());
        cells.push(chars[start..end].iter().collect());
        start = end;
    }

    if start < chars.len() {
        cells.push(chars[start..].iter().collect());
    }
    cells
}

/// Import a fixed-width file. When `widths` is None they are guessed from a
/// sample pass first; parsing is a second, independent pass.
pub fn import(path: &Path, widths: Option<&[usize]>) -> Result<Grid, ImportError> {
    let sequence = LineSequence::new(path);

    let widths: Vec<usize> = match widths {
        Some(w) => w.to_vec(),
        None => {
            let mut sample = Vec::new();
            for line in sequence.iter()?.take(SAMPLE_LINES) {
                sample.push(line?);
            }
            guess_column_widths(sample.iter().map(|s| s.as_str()))
                .ok_or(ImportError::NoAlignment)?
        }
    };

    let mut rows = Vec::new();
    let mut max_cells = 0usize;
    for line in sequence.iter()? {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let cells: Vec<Cell> = split_line(&line, &widths)
            .iter()
            .map(|field| Cell::new(CellValue::from_field(field)))
            .collect();
        max_cells = max_cells.max(cells.len());
        rows.push(Row::new(cells));
    }
    if rows.is_empty() {
        return Err(ImportError::Empty);
    }

    let names: Vec<String> = (1..=max_cells).map(|i| format!("Column {i}")).collect();
    Ok(Grid::new(ColumnModel::from_names(&names), rows))
}
