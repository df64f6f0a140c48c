//! Unified error types for the library

use thiserror::Error;

/// Main error type for the library. Reader failures are reported as
/// [`BitcoinError::Format`] with what was being read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BitcoinError {
    #[error("Field mismatch: cannot {op} elements of F_{lhs} and F_{rhs}")]
    FieldMismatch {
        op: &'static str,
        lhs: String,
        rhs: String,
    },

    #[error("Value {value} not in field range 0 to {modulus}")]
    ValueOutOfRange { value: String, modulus: String },

    #[error("Points {0} and {1} are not on the same curve")]
    CurveMismatch(String, String),

    #[error("({0}, {1}) is not on the curve")]
    PointNotOnCurve(String, String),

    #[error("Malformed signature: {0}")]
    MalformedSignature(&'static str),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Not enough elements on the stack for {op}: need {needed}, have {available}")]
    InsufficientStackItems {
        op: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("Opcode {0} has been disabled")]
    InvalidOpcode(&'static str),

    #[error("Script evaluation failed: {0}")]
    ScriptEvaluationFailed(String),

    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Invalid format: {0}")]
    Format(String),
}

impl BitcoinError {
    /// True when the error means "this spend is invalid" rather than
    /// "this data is corrupt or unavailable".
    pub fn is_invalid_spend(&self) -> bool {
        matches!(
            self,
            BitcoinError::MalformedSignature(_)
                | BitcoinError::InvalidPublicKey(_)
                | BitcoinError::InsufficientStackItems { .. }
                | BitcoinError::InvalidOpcode(_)
                | BitcoinError::ScriptEvaluationFailed(_)
                | BitcoinError::InvalidTransaction(_)
        )
    }
}

impl From<hex::FromHexError> for BitcoinError {
    fn from(e: hex::FromHexError) -> Self {
        BitcoinError::Format(e.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, BitcoinError>;
