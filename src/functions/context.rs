//! Context passed to registered functions.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::FunctionError;

/// One call to a registered function: its signature and raw arguments.
#[derive(Debug, Clone)]
pub struct CallContext {
    signature: String,
    args: Value,
}

impl CallContext {
    pub(crate) fn new(signature: impl Into<String>, args: Value) -> Self {
        Self {
            signature: signature.into(),
            args,
        }
    }

    /// Deserialize the arguments into a typed struct.
    pub fn args<A: DeserializeOwned>(&self) -> Result<A, FunctionError> {
        serde_json::from_value(self.args.clone())
            .map_err(|e| FunctionError::DecodeFailed(e.to_string()))
    }

    pub fn raw_args(&self) -> &Value {
        &self.args
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.args.get(field).is_some()
    }

    /// Check that the arguments contain every field in `fields`.
    pub fn has_fields(&self, fields: &[&str]) -> bool {
        fields.iter().all(|f| self.has_field(f))
    }
}
