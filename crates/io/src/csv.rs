// CSV/TSV import/export

use std::io::{Read, Write};
use std::path::Path;

use gridworks_model::{Cell, CellValue, ColumnModel, Grid, Row};

use crate::error::ImportError;

pub fn import(path: &Path) -> Result<Grid, ImportError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    import_from_string(&content, delimiter)
}

pub fn import_with_delimiter(path: &Path, delimiter: u8) -> Result<Grid, ImportError> {
    let content = read_file_as_utf8(path)?;
    import_from_string(&content, delimiter)
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Must produce >1 field on the first line to be viable
        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Score: (number of lines with same field count as line 1) * field_count
        // Higher field count breaks ties
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, ImportError> {
    let mut file = std::fs::File::open(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    // Try UTF-8 first; on failure, recover the buffer from the error
    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            // Fall back to Windows-1252 (common for Excel-exported CSVs)
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

/// Parse delimited content: first record is the header, every field of the
/// remaining records is typed into a cell value.
pub fn import_from_string(content: &str, delimiter: u8) -> Result<Grid, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();
    let header = match records.next() {
        Some(r) => r.map_err(|e| ImportError::Csv(e.to_string()))?,
        None => return Err(ImportError::Empty),
    };
    let columns = ColumnModel::from_names(&header.iter().collect::<Vec<_>>());

    let mut rows = Vec::new();
    for result in records {
        let record = result.map_err(|e| ImportError::Csv(e.to_string()))?;
        let cells = record
            .iter()
            .map(|field| Cell::new(CellValue::from_field(field)))
            .collect();
        rows.push(Row::new(cells));
    }

    Ok(Grid::new(columns, rows))
}

pub fn export(grid: &Grid, path: &Path) -> Result<(), ImportError> {
    let file = std::fs::File::create(path)?;
    write_grid(grid, None, file)
}

/// Write a grid as comma-delimited text: header first, then either every row
/// or just the rows named by `row_indices`, in the given order.
pub fn write_grid<W: Write>(
    grid: &Grid,
    row_indices: Option<&[u64]>,
    writer: W,
) -> Result<(), ImportError> {
    let mut out = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(writer);

    let names: Vec<&str> = grid.columns().columns.iter().map(|c| c.name.as_str()).collect();
    out.write_record(&names)
        .map_err(|e| ImportError::Csv(e.to_string()))?;

    let mut write_row = |row: &Row| -> Result<(), ImportError> {
        let fields: Vec<String> = (0..grid.columns().len())
            .map(|i| row.value(i).display())
            .collect();
        out.write_record(&fields)
            .map_err(|e| ImportError::Csv(e.to_string()))
    };

    match row_indices {
        Some(indices) => {
            for &index in indices {
                if let Some(row) = grid.row(index as usize) {
                    write_row(row)?;
                }
            }
        }
        None => {
            for row in grid.rows() {
                write_row(row)?;
            }
        }
    }

    out.flush()?;
    Ok(())
}
