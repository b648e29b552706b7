//! Error and result types for the correction pipeline.
use std::error::Error;
use std::fmt;

pub type FixerResult<T> = Result<T, FixerError>;

/// Failure tied to one record; the batch runner decides whether a
/// value of this type aborts the run or skips the record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordError {
    /// The designated field/subfield is absent from the record.
    MissingField {
        tag: &'static str,
        code: &'static str,
    },
    /// The identifier value does not have the expected shape.
    MalformedIdentifier(String),
    /// The lookup store has no row for this cross-reference suffix.
    NotFound(String),
    /// One record in a file could not be decoded.
    Parse(String),
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField { tag, code } => {
                write!(f, "Record has no {tag} ${code} value")
            }
            Self::MalformedIdentifier(ref v) => write!(f, "Malformed identifier: {v}"),
            Self::NotFound(ref suffix) => {
                write!(f, "No eScholarship item matches local id ucla:{suffix}")
            }
            Self::Parse(ref m) => write!(f, "Cannot decode record: {m}"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum FixerError {
    /// General error/failure message; fatal to the batch run.
    Message(String),
    /// Per-record failure, subject to the batch runner's policy.
    Record(RecordError),
}

impl Error for FixerError {}

impl fmt::Display for FixerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Message(ref m) => write!(f, "{m}"),
            Self::Record(ref e) => write!(f, "{e}"),
        }
    }
}

impl From<String> for FixerError {
    fn from(msg: String) -> Self {
        FixerError::Message(msg)
    }
}

impl From<&str> for FixerError {
    fn from(msg: &str) -> Self {
        FixerError::Message(msg.to_string())
    }
}

impl From<RecordError> for FixerError {
    fn from(err: RecordError) -> Self {
        FixerError::Record(err)
    }
}
