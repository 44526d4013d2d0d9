//! FunctionRegistry - in-process function bridge for tests and development.
//!
//! ## Example
//!
//! ```ignore
//! let functions = FunctionRegistry::new()
//!     .function_guarded(
//!         "user.notify",
//!         |ctx| ctx.has_fields(&["user_id", "message"]),
//!         |ctx| async move { Ok(json!({ "sent": true })) },
//!     );
//!
//! let args = json!({ "user_id": "u1", "message": "hi" });
//! let data = functions.dispatch("user.notify", args).await?;
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, warn};

use super::context::CallContext;
use super::error::FunctionError;
use super::{FunctionBridge, FunctionResponse};

type Guard = Box<dyn Fn(&CallContext) -> bool + Send + Sync>;
type Handle =
    Box<dyn Fn(CallContext) -> BoxFuture<'static, Result<Value, FunctionError>> + Send + Sync>;

struct RegisteredFunction {
    guard: Option<Guard>,
    handle: Handle,
}

/// A recorded call, in the order calls were made.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub signature: String,
    pub args: Value,
}

/// Routes calls to async handlers registered by signature.
///
/// Every call is recorded, including calls to unknown signatures, so tests
/// can assert on what was invoked and in which order.
#[derive(Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, RegisteredFunction>,
    calls: Arc<Mutex<Vec<FunctionCall>>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `signature`.
    pub fn function<F, Fut>(mut self, signature: &str, handler: F) -> Self
    where
        F: Fn(CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, FunctionError>> + Send + 'static,
    {
        self.functions.insert(
            signature.to_string(),
            RegisteredFunction {
                guard: None,
                handle: Box::new(move |ctx| handler(ctx).boxed()),
            },
        );
        self
    }

    /// Register a handler behind a guard. Calls the guard refuses fail with
    /// [`FunctionError::GuardRejected`] without running the handler.
    pub fn function_guarded<G, F, Fut>(mut self, signature: &str, guard: G, handler: F) -> Self
    where
        G: Fn(&CallContext) -> bool + Send + Sync + 'static,
        F: Fn(CallContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, FunctionError>> + Send + 'static,
    {
        self.functions.insert(
            signature.to_string(),
            RegisteredFunction {
                guard: Some(Box::new(guard)),
                handle: Box::new(move |ctx| handler(ctx).boxed()),
            },
        );
        self
    }

    /// Run the handler registered for `signature`.
    pub async fn dispatch(&self, signature: &str, args: Value) -> Result<Value, FunctionError> {
        self.record(signature, &args);

        let function = self
            .functions
            .get(signature)
            .ok_or_else(|| FunctionError::UnknownFunction(signature.to_string()))?;

        let ctx = CallContext::new(signature, args);
        if let Some(guard) = &function.guard {
            if !guard(&ctx) {
                return Err(FunctionError::GuardRejected(signature.to_string()));
            }
        }

        (function.handle)(ctx).await
    }

    /// Registered signatures.
    pub fn functions(&self) -> Vec<&str> {
        self.functions.keys().map(String::as_str).collect()
    }

    /// Every call made so far.
    pub fn calls(&self) -> Vec<FunctionCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn record(&self, signature: &str, args: &Value) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(FunctionCall {
                signature: signature.to_string(),
                args: args.clone(),
            });
        }
    }
}

#[async_trait]
impl FunctionBridge for FunctionRegistry {
    async fn call_function(&self, signature: &str, args: Value) -> FunctionResponse {
        let result = self.dispatch(signature, args).await;
        match &result {
            Ok(_) => debug!(signature, "Function call succeeded"),
            Err(e) => warn!(signature, error = %e, "Function call failed"),
        }
        FunctionResponse::from(result)
    }
}
