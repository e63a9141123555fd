//! Error types for TDP inference.

/// Errors raised at the boundary of every public operation.
#[derive(Debug, thiserror::Error)]
pub enum TdpError {
    /// Malformed shapes, out-of-range probabilities or levels, bad subsets.
    #[error("invalid input: {msg}")]
    InvalidInput {
        /// Human-readable error description.
        msg: String,
    },

    /// Numerical computation error.
    #[error("numerical error: {msg}")]
    NumericalError {
        /// Human-readable error description.
        msg: String,
    },

    /// Configuration error.
    #[error("configuration error: {msg}")]
    ConfigError {
        /// Human-readable error description.
        msg: String,
    },
}

/// Result type for TDP operations.
pub type Result<T> = std::result::Result<T, TdpError>;

impl TdpError {
    /// Create an invalid input error.
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput { msg: msg.into() }
    }

    /// Create a numerical error.
    pub fn numerical<S: Into<String>>(msg: S) -> Self {
        Self::NumericalError { msg: msg.into() }
    }

    /// Create a configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError { msg: msg.into() }
    }

    /// Whether this error stems from caller input rather than configuration.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput { .. })
    }
}
