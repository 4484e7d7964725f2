use thiserror::Error;

pub type SecurityResult<T> = Result<T, SecurityError>;

#[derive(Debug, Error)]
pub enum SecurityError {
    /// A fixed-size input had the wrong length. Raised before any
    /// cryptographic work is done; inputs are never padded or truncated.
    #[error("invalid {field} length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        field: &'static str,
        expected: &'static str,
        actual: usize,
    },

    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// The recomputed MIC did not match. Plaintext is withheld.
    #[error("authentication failed: MIC mismatch")]
    AuthenticationFailure,

    #[error("entropy source failure: {0}")]
    EntropySourceFailure(String),
}

impl SecurityError {
    pub(crate) fn length(field: &'static str, expected: &'static str, actual: usize) -> Self {
        Self::InvalidLength {
            field,
            expected,
            actual,
        }
    }
}

/// Fails with `InvalidLength` when `data` is empty.
pub(crate) fn require_non_empty(field: &'static str, data: &[u8]) -> SecurityResult<()> {
    if data.is_empty() {
        return Err(SecurityError::length(field, "at least 1", 0));
    }
    Ok(())
}
