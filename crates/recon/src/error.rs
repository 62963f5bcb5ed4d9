use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// The configured column does not exist in the grid.
    UnknownColumn(String),
    /// Candidate CSV parse error.
    Csv(String),
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownColumn(name) => write!(f, "no column named {name}"),
            Self::Csv(msg) => write!(f, "candidate CSV error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
