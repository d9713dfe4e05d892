//! The seam between the generic adapter and a subsystem's operation set.
//!
//! Each subsystem plugs its operations into the adapter through one
//! [`OpHandler`] implementation. The same handler backs the embedded tier and
//! whatever the subsystem's worker binary serves, which is what keeps the
//! tiers behaviorally equivalent.

use serde_json::Value;
use thiserror::Error;

use envelope::Request;

/// A computation failure inside an operation handler.
///
/// Carries the structured error code that ends up in the failure response's
/// `result.error` field. Not a fault: the consumer loop treats it as data.
#[derive(Debug, Clone, Error)]
#[error("operation failed: {code}")]
pub struct OpError {
    code: String,
}

impl OpError {
    /// A failure with the given error code.
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }

    /// The structured error code.
    pub fn code(&self) -> &str {
        &self.code
    }
}

/// One subsystem's operation set.
///
/// Implementations must be cheap to call concurrently; any state they carry
/// is their own (see [`crate::store::StoreHandler`] for a stateful example).
pub trait OpHandler: Send + Sync {
    /// Execute one request, returning the op-specific result fields.
    ///
    /// A malformed request or bad payload is an `Err` with a specific code,
    /// never a panic - it must not be able to take down a consumer loop.
    fn execute(&self, request: &Request) -> Result<Value, OpError>;
}
