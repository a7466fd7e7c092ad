use thiserror::Error;

pub type DhResult<T> = Result<T, DhError>;

/// Error shared by every stage crate once its own error is flattened.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DhError {
    #[error("{what} is not finite: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("{what} out of range: {value} (expected {expected})")]
    OutOfRange {
        what: &'static str,
        value: f64,
        expected: &'static str,
    },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Invariant violated: {what}")]
    Invariant { what: String },
}
