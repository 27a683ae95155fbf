//! Recoverable scanning errors.
//!
//! Mismatches between a record declaration and a query's shape are
//! programming errors and panic at the point they are detected; everything
//! here is a runtime condition the caller is expected to handle.

use std::fmt;

use crate::value::ValueType;

/// An error returned while querying or scanning rows.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A single-record select returned no rows.
    NoRows,
    /// A column value could not be decoded into its field's type.
    Decode {
        column: String,
        expected: ValueType,
        message: String,
    },
    /// A row did not carry one value per receiver.
    ColumnCount { expected: usize, found: usize },
    /// Failure reported by the query executor or row cursor.
    Query(String),
}

impl Error {
    /// Whether this is the distinguished "no rows" condition.
    pub fn is_no_rows(&self) -> bool {
        matches!(self, Error::NoRows)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NoRows => write!(f, "no rows in result set"),
            Error::Decode {
                column,
                expected,
                message,
            } => write!(f, "column '{column}' ({expected}): {message}"),
            Error::ColumnCount { expected, found } => {
                write!(f, "expected {expected} column values, row has {found}")
            }
            Error::Query(msg) => write!(f, "query failed: {msg}"),
        }
    }
}

impl std::error::Error for Error {}
