//! Errors of the function-call bridge.

use thiserror::Error;

/// Error returned by a remote function, or by the bridge before reaching it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FunctionError {
    /// No function registered under this signature.
    #[error("unknown function: {0}")]
    UnknownFunction(String),
    /// Arguments did not decode into the expected type.
    #[error("decode failed: {0}")]
    DecodeFailed(String),
    /// The guard registered with the function refused the arguments.
    #[error("guard rejected call to {0}")]
    GuardRejected(String),
    /// The function ran and rejected the call.
    #[error("rejected: {0}")]
    Rejected(String),
    /// The function reported failure (`status: 0`).
    #[error("function failed: {0}")]
    Failed(String),
    /// The bridge itself failed (transport, runtime).
    #[error("bridge error: {0}")]
    Bridge(String),
}

impl From<serde_json::Error> for FunctionError {
    fn from(err: serde_json::Error) -> Self {
        FunctionError::DecodeFailed(err.to_string())
    }
}
