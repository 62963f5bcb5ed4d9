//! Restartable lazy line sequences.
//!
//! A `LineSequence` names a file; every call to `iter()` opens a fresh
//! handle and yields lines lazily. The handle lives exactly as long as the
//! returned iterator, so an early exit from a pass releases it immediately,
//! and a second pass can always start from the top.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use crate::error::ImportError;

#[derive(Debug, Clone)]
pub struct LineSequence {
    path: PathBuf,
}

impl LineSequence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        LineSequence { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start a pass over the file. The file is opened here, not at
    /// construction, so a sequence can outlive any number of passes.
    pub fn iter(&self) -> Result<LinePass, ImportError> {
        let file = File::open(&self.path)?;
        Ok(LinePass {
            lines: BufReader::new(file).lines(),
        })
    }
}

/// One pass over the lines of a file. Dropping it closes the file.
pub struct LinePass {
    lines: Lines<BufReader<File>>,
}

impl Iterator for LinePass {
    type Item = Result<String, ImportError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.lines.next().map(|r| r.map_err(ImportError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_file(dir: &tempfile::TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("lines.txt");
        let mut f = File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn two_passes_see_the_same_lines() {
        let dir = tempfile::tempdir().unwrap();
        let seq = LineSequence::new(sample_file(&dir, "a\nb\nc\n"));

        let first: Vec<String> = seq.iter().unwrap().map(|l| l.unwrap()).collect();
        let second: Vec<String> = seq.iter().unwrap().map(|l| l.unwrap()).collect();
        assert_eq!(first, vec!["a", "b", "c"]);
        assert_eq!(first, second);
    }

    #[test]
    fn early_exit_does_not_poison_the_next_pass() {
        let dir = tempfile::tempdir().unwrap();
        let seq = LineSequence::new(sample_file(&dir, "a\nb\nc\n"));

        let first_line = seq.iter().unwrap().next().unwrap().unwrap();
        assert_eq!(first_line, "a");
        // the aborted pass dropped its handle; a full pass still works
        assert_eq!(seq.iter().unwrap().count(), 3);
    }

    #[test]
    fn missing_file_errors_on_iter_not_on_new() {
        let seq = LineSequence::new("/nonexistent/nope.txt");
        assert!(seq.iter().is_err());
    }
}
