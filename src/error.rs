//! Error types shared across the crate.
//!
//! Decimal failures live in their own enum so that pure arithmetic callers
//! do not have to match on transport errors they can never see.

use thiserror::Error;

/// Result type for fallible book, cache and dispatch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures raised by [`Precise`](crate::Precise) construction and arithmetic.
///
/// Division by zero is always reported through this type and never as a
/// sentinel value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreciseError {
    #[error("invalid decimal string: {0:?}")]
    Parse(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("value out of range: {0}")]
    OutOfRange(String),
}

/// Crate-level error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Precise(#[from] PreciseError),

    #[error("malformed delta: {0}")]
    MalformedDelta(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("configuration error: {0}")]
    Config(String),
}
