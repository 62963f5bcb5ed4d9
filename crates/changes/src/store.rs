//! Append-only change-data persistence.
//!
//! Line-oriented format: a JSON header naming the source grid version,
//! then one `row_id <TAB> payload` line per row. Each append is flushed, so
//! a crash mid-run loses at most unflushed batches, never prior progress.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use gridworks_model::GridVersion;

use crate::error::ChangeError;
use crate::serializer::ChangeDataSerializer;

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    version: GridVersion,
}

/// A loaded partial mapping from row index to change value, valid only
/// against the grid version it was computed from.
#[derive(Debug)]
pub struct ChangeData<T> {
    pub version: GridVersion,
    pub data: BTreeMap<u64, T>,
}

impl<T> ChangeData<T> {
    pub fn get(&self, row_id: u64) -> Option<&T> {
        self.data.get(&row_id)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Load from a store file, deserializing every payload.
    pub fn load<S: ChangeDataSerializer<T>>(
        path: &Path,
        serializer: &S,
    ) -> Result<ChangeData<T>, ChangeError> {
        let file = File::open(path)?;
        let mut lines = BufReader::new(file).lines();

        let header_line = lines.next().ok_or(ChangeError::Corrupt {
            line: 1,
            message: "missing header".into(),
        })??;
        let header: Header =
            serde_json::from_str(&header_line).map_err(|e| ChangeError::Corrupt {
                line: 1,
                message: e.to_string(),
            })?;

        let mut data = BTreeMap::new();
        for (i, line) in lines.enumerate() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let line_no = i + 2;
            let (id, payload) = line.split_once('\t').ok_or_else(|| ChangeError::Corrupt {
                line: line_no,
                message: "missing field separator".into(),
            })?;
            let row_id: u64 = id.parse().map_err(|_| ChangeError::Corrupt {
                line: line_no,
                message: format!("bad row id '{id}'"),
            })?;
            data.insert(row_id, serializer.deserialize(payload)?);
        }

        Ok(ChangeData {
            version: header.version,
            data,
        })
    }
}

/// Append-as-you-go writer for one production run.
pub struct ChangeDataWriter {
    out: BufWriter<File>,
}

impl ChangeDataWriter {
    /// Create the store file and write the grid-version header.
    pub fn create(path: &Path, version: GridVersion) -> Result<ChangeDataWriter, ChangeError> {
        let file = File::create(path)?;
        let mut out = BufWriter::new(file);
        let header = serde_json::to_string(&Header { version })
            .map_err(|e| ChangeError::Serialize(e.to_string()))?;
        writeln!(out, "{header}")?;
        out.flush()?;
        Ok(ChangeDataWriter { out })
    }

    /// Append one row's payload and flush. The payload must be a single
    /// line with no embedded field separator; anything else would tear the
    /// record format.
    pub fn append(&mut self, row_id: u64, payload: &str) -> Result<(), ChangeError> {
        if payload.contains('\n') || payload.contains('\r') || payload.contains('\t') {
            return Err(ChangeError::PayloadNotLineSafe(row_id));
        }
        writeln!(self.out, "{row_id}\t{payload}")?;
        self.out.flush()?;
        Ok(())
    }
}
