use std::fmt::Display;

use thiserror::Error;

use super::ValueType;

/// The pipeline stage an error was raised in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageKind {
    Read,
    Transform,
    Write,
}

impl Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageKind::Read => write!(f, "read"),
            StageKind::Transform => write!(f, "transform"),
            StageKind::Write => write!(f, "write"),
        }
    }
}

// All errors that can be returned by the pipeline.
#[derive(Clone, Debug, Error)]
pub enum DuctoError {
    #[error("{0}")]
    Unknown(String),

    #[error("Location '{0}' is not found or not readable")]
    NotFound(String),

    #[error("Unsupported format '{0}'")]
    UnsupportedFormat(String),

    // Source value cannot be coerced to the declared column type
    #[error("Value '{value}' in column '{column}' is not a valid {expected}")]
    SchemaMismatch {
        column: String,
        expected: ValueType,
        value: String,
    },

    // Column is not found
    #[error("Column '{0}' not found.")]
    ColumnNotFound(String),

    #[error("Record has no value for partition column '{0}'")]
    MissingPartitionValue(String),

    // A transform op failed, reported with its position in the op list
    #[error("Transform op #{index} failed: {source}")]
    OpApply {
        index: usize,
        #[source]
        source: Box<DuctoError>,
    },

    // A stage failed, wrapped so callers can tell extract/transform/load apart
    #[error("{stage} stage failed: {source}")]
    StageExecution {
        stage: StageKind,
        #[source]
        source: Box<DuctoError>,
    },

    #[error("{0}")]
    ValidationError(String),

    // Row has incorrect number of fields
    #[error("Expecting row with {1} columns, but got {0}")]
    InvalidRowLength(usize, usize),

    // Type cast failed
    #[error("Cannot cast from type {0} to type {1}.")]
    InvalidTypeCast(ValueType, ValueType),

    // Type conversion failed
    #[error("Cannot convert from type {0} to type {1}.")]
    InvalidTypeConversion(ValueType, ValueType),

    // Arguments with given types cannot be applied to the operator, e.g. string + bool
    #[error("Cannot apply '{0}' operation between {1} and {2}.")]
    TypeMismatch(String, ValueType, ValueType),

    // Unary operator got invalid argument type
    #[error("Cannot apply '{0}' operation to {1}.")]
    InvalidOperandType(String, ValueType),

    // Value is not in the expected type
    #[error("Assume value is {1}, but actual type is {0}.")]
    InvalidValueType(ValueType, ValueType),

    // Function has incorrect number of arguments
    #[error("Invalid argument count, expecting {0}, got {1}.")]
    InvalidArgumentCount(usize, usize),

    // Variadic function has invalid number of arguments
    #[error("{0} cannot take {1} arguments.")]
    ArityError(String, usize),

    // String format error
    #[error("String {0} is not a valid {1}.")]
    FormatError(String, ValueType),

    // Unknown function
    #[error("Unknown function {0}.")]
    UnknownFunction(String),

    #[error("{0}")]
    IoError(String),
}

impl DuctoError {
    /// Wrap the error with the stage it was raised in.
    pub fn in_stage(self, stage: StageKind) -> Self {
        DuctoError::StageExecution {
            stage,
            source: Box::new(self),
        }
    }

    /// Wrap the error with the offending op's position in the op list.
    pub fn in_op(self, index: usize) -> Self {
        DuctoError::OpApply {
            index,
            source: Box::new(self),
        }
    }
}

impl From<std::io::Error> for DuctoError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            DuctoError::NotFound(e.to_string())
        } else {
            DuctoError::IoError(e.to_string())
        }
    }
}
