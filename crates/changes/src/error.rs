use std::fmt;

use gridworks_model::GridVersion;

/// Failure inside a producer call. Transient failures (timeouts, rate
/// limits) are worth retrying; permanent ones (malformed query) are not, and
/// retrying them would busy-loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProducerError {
    Transient(String),
    Permanent(String),
}

impl ProducerError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProducerError::Transient(_))
    }

    pub fn message(&self) -> &str {
        match self {
            ProducerError::Transient(m) | ProducerError::Permanent(m) => m,
        }
    }
}

impl fmt::Display for ProducerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient(m) => write!(f, "transient failure: {m}"),
            Self::Permanent(m) => write!(f, "permanent failure: {m}"),
        }
    }
}

impl std::error::Error for ProducerError {}

#[derive(Debug)]
pub enum ChangeError {
    /// Producer returned a batch of the wrong length; row identities would
    /// mis-align, so the whole run is rejected.
    BatchContract {
        start_row: u64,
        expected: usize,
        got: usize,
    },
    /// Change data was computed against a different grid version.
    GridMismatch {
        expected: GridVersion,
        found: GridVersion,
    },
    /// Serialized payload may not span lines.
    PayloadNotLineSafe(u64),
    /// Malformed store file.
    Corrupt { line: usize, message: String },
    Serialize(String),
    Deserialize(String),
    Io(String),
}

impl fmt::Display for ChangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BatchContract {
                start_row,
                expected,
                got,
            } => write!(
                f,
                "batch starting at row {start_row}: producer returned {got} values for {expected} rows"
            ),
            Self::GridMismatch { expected, found } => write!(
                f,
                "change data was computed against grid {}/{:x}, cannot join against {}/{:x}",
                expected.rows, expected.fingerprint, found.rows, found.fingerprint
            ),
            Self::PayloadNotLineSafe(row) => {
                write!(f, "row {row}: serialized value contains a line break")
            }
            Self::Corrupt { line, message } => {
                write!(f, "change data line {line}: {message}")
            }
            Self::Serialize(m) => write!(f, "serialization error: {m}"),
            Self::Deserialize(m) => write!(f, "deserialization error: {m}"),
            Self::Io(m) => write!(f, "IO error: {m}"),
        }
    }
}

impl std::error::Error for ChangeError {}

impl From<std::io::Error> for ChangeError {
    fn from(e: std::io::Error) -> Self {
        ChangeError::Io(e.to_string())
    }
}
