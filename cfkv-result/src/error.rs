use std::{fmt, io};
use thiserror::Error;

/// Unified error type for all cfkv operations.
///
/// Validation errors carry enough context (definition, field, record index)
/// for the caller to identify the offending input without re-running the
/// operation.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error raised by a storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Arrow error while building, slicing or concatenating arrays.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Document or catalog (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid user input or API parameter.
    #[error("Invalid argument: {0}")]
    InvalidArgumentError(String),

    /// Document, record ID or field path not found.
    #[error("Storage key not found")]
    NotFound,

    /// A field group could not be stacked into a single block.
    ///
    /// Raised when member arrays differ in rank, dtype or any non-leading
    /// extent. The group keeps its per-record layout and stays readable
    /// through `get_data` without concatenation.
    #[error("cannot concatenate '{path}': {reason}")]
    Concatenation { path: String, reason: String },

    /// A property definition is malformed, conflicts with an existing one,
    /// or a value has the wrong type for its field.
    #[error("schema error: {0}")]
    Schema(String),

    /// A required property field was absent from the raw attributes.
    #[error("property '{definition}' is missing required field '{field}'")]
    MissingField { definition: String, field: String },

    /// A property value's rank or fixed extents disagree with its definition.
    #[error(
        "field '{field}' of property '{definition}' has shape {actual:?}, expected extent {expected}"
    )]
    ShapeMismatch {
        definition: String,
        field: String,
        expected: String,
        actual: Vec<usize>,
    },

    /// A unit expression could not be resolved.
    #[error("unknown unit '{0}'")]
    UnknownUnit(String),

    /// Wraps a failure of one input record during batch insertion.
    #[error("record {index}: {source}")]
    Record {
        index: usize,
        #[source]
        source: Box<Error>,
    },

    /// Internal error indicating a bug, corrupted blob or unexpected state.
    #[error("An internal operation failed: {0}")]
    Internal(String),
}

impl Error {
    /// Create a schema error from any displayable value.
    #[inline]
    pub fn schema<E: fmt::Display>(err: E) -> Self {
        Error::Schema(err.to_string())
    }

    /// Create a concatenation error for `path`.
    #[inline]
    pub fn concatenation(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Concatenation {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Attach the index of the input record that produced this error.
    #[inline]
    pub fn for_record(self, index: usize) -> Self {
        match self {
            already @ Error::Record { .. } => already,
            other => Error::Record {
                index,
                source: Box::new(other),
            },
        }
    }

    /// Returns the error with any [`Error::Record`] wrapping removed.
    pub fn root(&self) -> &Error {
        match self {
            Error::Record { source, .. } => source.root(),
            other => other,
        }
    }

    /// True when the error rejected a property during instantiation.
    pub fn is_validation(&self) -> bool {
        matches!(
            self.root(),
            Error::Schema(_)
                | Error::MissingField { .. }
                | Error::ShapeMismatch { .. }
                | Error::UnknownUnit(_)
        )
    }

    /// True for a refused concatenation; the group remains usable per record.
    pub fn is_concatenation(&self) -> bool {
        matches!(self.root(), Error::Concatenation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_wrapping_is_not_nested() {
        let err = Error::Schema("bad".into()).for_record(3).for_record(7);
        match &err {
            Error::Record { index, .. } => assert_eq!(*index, 3),
            other => panic!("unexpected {other:?}"),
        }
        assert!(err.is_validation());
        assert!(!err.is_concatenation());
    }

    #[test]
    fn concatenation_message_names_path() {
        let err = Error::concatenation("properties/default/forces", "ragged");
        assert!(err.to_string().contains("properties/default/forces"));
        assert!(err.is_concatenation());
    }
}
