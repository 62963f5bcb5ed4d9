use std::fmt;

#[derive(Debug)]
pub enum ImportError {
    Io(String),
    Csv(String),
    /// The input holds no data rows at all.
    Empty,
    /// No column widths were given and none could be guessed from the sample.
    NoAlignment,
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Csv(msg) => write!(f, "CSV error: {msg}"),
            Self::Empty => write!(f, "input file holds no data"),
            Self::NoAlignment => {
                write!(f, "could not guess column widths from the sample lines")
            }
        }
    }
}

impl std::error::Error for ImportError {}

impl From<std::io::Error> for ImportError {
    fn from(e: std::io::Error) -> Self {
        ImportError::Io(e.to_string())
    }
}
