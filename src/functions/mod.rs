//! Function-call bridge - server-side functions reached by signature.
//!
//! Callers chain these after a repository write has confirmed, typically to
//! trigger side effects the client cannot perform itself (cascading deletes,
//! notifications). The repository never calls the bridge.
//!
//! ## Example
//!
//! ```ignore
//! use optimistic_repository::functions::{FunctionBridge, FunctionRegistry};
//! use serde_json::json;
//!
//! let functions = FunctionRegistry::new()
//!     .function("deck.cascadeDelete", |ctx| async move {
//!         let ids: Vec<String> = ctx.args()?;
//!         Ok(json!({ "deleted": ids.len() }))
//!     });
//!
//! let ids = handler.delete_documents(["d1", "d2"])?.await?;
//! let response = functions.call_function("deck.cascadeDelete", json!(ids)).await;
//! let data = response.into_result()?;
//! ```

mod context;
mod error;
mod registry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use context::CallContext;
pub use error::FunctionError;
pub use registry::{FunctionCall, FunctionRegistry};

/// Outcome flag of a function call, `1` on success and `0` on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum FunctionStatus {
    Failure,
    Success,
}

impl From<FunctionStatus> for u8 {
    fn from(status: FunctionStatus) -> Self {
        match status {
            FunctionStatus::Failure => 0,
            FunctionStatus::Success => 1,
        }
    }
}

impl TryFrom<u8> for FunctionStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FunctionStatus::Failure),
            1 => Ok(FunctionStatus::Success),
            other => Err(format!("invalid function status {}", other)),
        }
    }
}

/// Wire shape of a function result: `{ "status": 0|1, "data"?, "error"? }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub status: FunctionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FunctionResponse {
    pub fn success(data: Value) -> Self {
        Self {
            status: FunctionStatus::Success,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            status: FunctionStatus::Failure,
            data: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == FunctionStatus::Success
    }

    /// The data of a successful call (`Null` when none was returned), or the
    /// reported error as [`FunctionError::Failed`].
    pub fn into_result(self) -> Result<Value, FunctionError> {
        match self.status {
            FunctionStatus::Success => Ok(self.data.unwrap_or(Value::Null)),
            FunctionStatus::Failure => Err(FunctionError::Failed(
                self.error.unwrap_or_else(|| "unspecified error".to_string()),
            )),
        }
    }
}

impl From<Result<Value, FunctionError>> for FunctionResponse {
    fn from(result: Result<Value, FunctionError>) -> Self {
        match result {
            Ok(data) => FunctionResponse::success(data),
            Err(e) => FunctionResponse::failure(e.to_string()),
        }
    }
}

/// Calls server-side functions by signature.
///
/// Failures are reported in the response, never as a Rust error, matching
/// the wire contract.
#[async_trait]
pub trait FunctionBridge: Send + Sync {
    async fn call_function(&self, signature: &str, args: Value) -> FunctionResponse;
}
