//! Error taxonomy shared by the quantizer, transform engine and emitter.

use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing archive fields, bad paths or extensions.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Structural mismatch inside a training checkpoint.
    #[error("invalid checkpoint: {0}")]
    InvalidCheckpoint(String),

    /// A transform left the network in a state that breaks its shape or
    /// distance invariants. Always a defect.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// A source index reached the emitter out of range.
    #[error("emission error: {0}")]
    Emission(String),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Pipeline stage the error belongs to.
    pub fn stage(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "input",
            Error::InvalidCheckpoint(_) => "quantize",
            Error::InvariantViolation(_) => "transform",
            Error::Emission(_) => "emit",
            Error::Io(_) => "io",
        }
    }

    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Error::InvariantViolation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(Error::InvalidCheckpoint("x".into()).stage(), "quantize");
        assert_eq!(Error::Emission("x".into()).stage(), "emit");
        let io = Error::from(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert_eq!(io.stage(), "io");
        assert!(io.to_string().contains("gone"));
    }
}
