//! Operation Context
//!
//! Metadata about the current request, threaded into the ledger and
//! tracker so their log lines can be correlated.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Context for an operation, used for tracing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationContext {
    /// API key ID used for this request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_id: Option<Uuid>,

    /// Acting user from the X-Request-User-Id header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_user_id: Option<Uuid>,

    /// Correlation ID for request tracing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,
}

impl OperationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(mut self, api_key_id: Uuid) -> Self {
        self.api_key_id = Some(api_key_id);
        self
    }

    pub fn with_request_user(mut self, user_id: Uuid) -> Self {
        self.request_user_id = Some(user_id);
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Generate a new correlation ID if not present
    pub fn ensure_correlation_id(&mut self) -> Uuid {
        *self.correlation_id.get_or_insert_with(Uuid::new_v4)
    }
}
