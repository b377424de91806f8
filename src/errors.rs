// Error taxonomy shared by every analysis variant.

use thiserror::Error;

/// Errors produced by the factor analysis engines.
///
/// Every failure is raised at the call that detects it; there is no retry
/// and no partial result. A `fit` that fails leaves the model in whatever
/// fitted state it had before the call.
#[derive(Debug, Error)]
pub enum FactorError {
    /// An accessor was invoked before `fit`.
    #[error("model is not fitted; call `fit` before requesting derived quantities")]
    NotFitted,

    /// Malformed or incompatible input data.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A configuration that cannot be satisfied for the data at hand,
    /// e.g. requesting more components than `min(n_rows, n_columns)`.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A dense linear algebra routine (SVD, QR) failed.
    #[error("linear algebra backend error: {0}")]
    Backend(String),
}

impl FactorError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        FactorError::Validation(msg.into())
    }

    pub(crate) fn configuration(msg: impl Into<String>) -> Self {
        FactorError::Configuration(msg.into())
    }

    pub(crate) fn backend(err: impl std::fmt::Display) -> Self {
        FactorError::Backend(err.to_string())
    }
}
