use thiserror::Error;

use crate::decoder::Candidate;

#[derive(Error, Debug)]
pub enum DeskError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, DeskError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("column {column:?} has {found} cells, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        found: usize,
    },
    #[error("row {row} has {found} fields, expected at most {expected}")]
    RowTooLong {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("column {0:?} already exists")]
    DuplicateColumn(String),
    #[error("column index {index} is out of range for {width} columns")]
    IndexOutOfRange { index: usize, width: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedCandidate {
    pub candidate: Candidate,
    pub reason: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("could not decode or parse input (tried {})", describe_attempts(.attempted))]
    Exhausted { attempted: Vec<RejectedCandidate> },
    #[error("no columns to parse from input")]
    Empty,
    #[error("failed reading input: {0}")]
    Io(String),
}

impl DecodeError {
    pub fn attempted(&self) -> &[RejectedCandidate] {
        match self {
            DecodeError::Exhausted { attempted } => attempted,
            _ => &[],
        }
    }
}

fn describe_attempts(attempted: &[RejectedCandidate]) -> String {
    attempted
        .iter()
        .map(|rejected| format!("{}: {}", rejected.candidate, rejected.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("dataset has no columns")]
    NoColumns,
    #[error("cannot insert column {0:?}, it already exists")]
    DuplicateColumn(String),
    #[error(transparent)]
    Table(#[from] TableError),
}
