use std::fmt;
use thiserror::Error;

/// Pipeline stage that raised an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ingestion,
    Alignment,
    Correlation,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Ingestion => "ingestion",
            Stage::Alignment => "alignment",
            Stage::Correlation => "correlation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Broad classification of a [`DataError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed required data
    Data,
    /// A join or statistic was computed over too few rows
    InsufficientData,
    /// Nothing left after cleaning
    EmptyInput,
    /// File system or serialization failure
    Io,
}

/// Comprehensive error types for pipeline stages
#[derive(Error, Debug)]
pub enum DataError {
    #[error("[{stage}] missing required column '{column}' in {source_name}")]
    MissingColumn {
        stage: Stage,
        column: String,
        source_name: String,
    },

    #[error("[{stage}] unparseable date '{value}' at row {row}")]
    InvalidDate {
        stage: Stage,
        row: usize,
        value: String,
    },

    #[error("[{stage}] invalid {field} value '{value}' at row {row}")]
    InvalidValue {
        stage: Stage,
        row: usize,
        field: String,
        value: String,
    },

    #[error("[{stage}] insufficient data: {reason} (rows: {rows})")]
    InsufficientData {
        stage: Stage,
        rows: usize,
        reason: String,
    },

    #[error("[{stage}] no rows left after cleaning {source_name}")]
    EmptyInput { stage: Stage, source_name: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for pipeline operations
pub type DataResult<T> = Result<T, DataError>;

impl DataError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DataError::MissingColumn { .. }
            | DataError::InvalidDate { .. }
            | DataError::InvalidValue { .. } => ErrorKind::Data,
            DataError::InsufficientData { .. } => ErrorKind::InsufficientData,
            DataError::EmptyInput { .. } => ErrorKind::EmptyInput,
            DataError::Csv(_) | DataError::Serialization(_) | DataError::Io(_) => ErrorKind::Io,
        }
    }

    /// Stage that raised the error, when known
    pub fn stage(&self) -> Option<Stage> {
        match self {
            DataError::MissingColumn { stage, .. }
            | DataError::InvalidDate { stage, .. }
            | DataError::InvalidValue { stage, .. }
            | DataError::InsufficientData { stage, .. }
            | DataError::EmptyInput { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    pub fn missing_column<S: Into<String>>(column: S, source_name: S) -> Self {
        DataError::MissingColumn {
            stage: Stage::Ingestion,
            column: column.into(),
            source_name: source_name.into(),
        }
    }

    pub fn insufficient<S: Into<String>>(stage: Stage, rows: usize, reason: S) -> Self {
        DataError::InsufficientData {
            stage,
            rows,
            reason: reason.into(),
        }
    }

    pub fn empty_input<S: Into<String>>(stage: Stage, source_name: S) -> Self {
        DataError::EmptyInput {
            stage,
            source_name: source_name.into(),
        }
    }
}
