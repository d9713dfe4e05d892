//! # Strata Wire Envelope
//!
//! The request/response unit exchanged with an execution tier, and the line
//! codec for it. One UTF-8 JSON object per line, newline-terminated, one
//! request/response pair per connection:
//!
//! ```text
//! -> {"op":"aggregate","record":"1000,ABC,55.25,120"}
//! <- {"ok":true,"result":{"notional":6630.0,...},"tier":"Subprocess"}
//! ```
//!
//! The envelope is deliberately tier-agnostic: a linked native module, a
//! spawned worker process, and the in-process fallback all speak exactly this
//! shape, which is what makes the tiers interchangeable. `ok: false` is a
//! normal outcome carrying `{"error": "<code>"}` in `result` - callers treat
//! it as data, never as a fault.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Transport-level error codes carried in failure responses.
pub mod codes {
    /// Dial, write, or read against the worker process failed.
    pub const IPC_ERROR: &str = "ipc_error";
    /// The worker accepted the connection but closed it without a response line.
    pub const IPC_NO_RESPONSE: &str = "ipc_no_response";
    /// The linked native module failed at the call boundary.
    pub const NATIVE_ERROR: &str = "native_error";
    /// The request line did not decode, or the operation is unknown.
    pub const INVALID_REQUEST: &str = "invalid_request";
}

/// Errors from encoding or decoding envelope lines.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// Serialization to a JSON line failed.
    #[error("failed to encode envelope: {0}")]
    Encode(#[source] serde_json::Error),

    /// A received line was not a valid envelope.
    #[error("failed to decode envelope line: {0}")]
    Decode(#[source] serde_json::Error),

    /// A received line was empty after trimming.
    #[error("empty envelope line")]
    Empty,
}

/// The execution strategy an adapter is bound to.
///
/// Exactly one tier is bound per adapter instance, decided once at
/// construction and immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    /// In-process call through a dynamically loaded native module.
    Linked,
    /// Connection-per-call against a supervised worker process on loopback.
    Subprocess,
    /// The local implementation that always exists.
    Embedded,
}

impl Tier {
    /// Wire name of the tier, as stamped into responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Linked => "Linked",
            Tier::Subprocess => "Subprocess",
            Tier::Embedded => "Embedded",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of work handed to an execution tier.
///
/// An operation code plus op-specific fields, flattened into the same JSON
/// object on the wire. The fields are opaque to everything but the executing
/// tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Operation code, e.g. `"aggregate"`.
    pub op: String,

    /// Op-specific payload fields.
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl Request {
    /// Build a request for `op` with no payload fields yet.
    pub fn new(op: impl Into<String>) -> Self {
        Self {
            op: op.into(),
            params: Map::new(),
        }
    }

    /// Attach a payload field.
    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// Look up a payload field.
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }
}

/// The outcome of executing one request on whichever tier was bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Whether the operation succeeded. `false` is a normal, non-fatal outcome.
    pub ok: bool,

    /// Op-specific result fields on success, `{"error": "<code>"}` otherwise.
    pub result: Value,

    /// The tier that produced this response.
    pub tier: Tier,
}

impl Response {
    /// A successful response carrying `result`.
    pub fn success(result: Value, tier: Tier) -> Self {
        Self {
            ok: true,
            result,
            tier,
        }
    }

    /// A failure response carrying a structured error code.
    pub fn failure(code: &str, tier: Tier) -> Self {
        Self {
            ok: false,
            result: serde_json::json!({ "error": code }),
            tier,
        }
    }

    /// The error code of a failure response, if present.
    pub fn error_code(&self) -> Option<&str> {
        self.result.get("error").and_then(Value::as_str)
    }
}

/// Encode a request or response as a single JSON line (no trailing newline;
/// the transport appends it).
pub fn encode<T: Serialize>(message: &T) -> Result<String, EnvelopeError> {
    serde_json::to_string(message).map_err(EnvelopeError::Encode)
}

/// Decode one request line.
pub fn decode_request(line: &str) -> Result<Request, EnvelopeError> {
    decode(line)
}

/// Decode one response line.
pub fn decode_response(line: &str) -> Result<Response, EnvelopeError> {
    decode(line)
}

fn decode<T: for<'de> Deserialize<'de>>(line: &str) -> Result<T, EnvelopeError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(EnvelopeError::Empty);
    }
    serde_json::from_str(line).map_err(EnvelopeError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_response_round_trips() {
        let response = Response::success(
            json!({"ts": 1000, "symbol": "ABC", "notional": 6630.0}),
            Tier::Embedded,
        );
        let line = encode(&response).unwrap();
        assert_eq!(decode_response(&line).unwrap(), response);
    }

    #[test]
    fn failure_response_round_trips_with_nested_error() {
        let response = Response::failure(codes::IPC_NO_RESPONSE, Tier::Subprocess);
        let line = encode(&response).unwrap();
        let decoded = decode_response(&line).unwrap();
        assert_eq!(decoded, response);
        assert!(!decoded.ok);
        assert_eq!(decoded.error_code(), Some(codes::IPC_NO_RESPONSE));
    }

    #[test]
    fn exponent_notation_numbers_survive_decoding() {
        let decoded =
            decode_response(r#"{"ok":true,"result":{"notional":6.63e3},"tier":"Linked"}"#).unwrap();
        assert_eq!(decoded.result["notional"].as_f64(), Some(6630.0));
        assert_eq!(decoded.tier, Tier::Linked);
    }

    #[test]
    fn request_params_flatten_onto_the_wire() {
        let request = Request::new("aggregate").with_param("record", "1000,ABC,55.25,120");
        let line = encode(&request).unwrap();
        assert_eq!(
            line,
            r#"{"op":"aggregate","record":"1000,ABC,55.25,120"}"#
        );
        assert_eq!(decode_request(&line).unwrap(), request);
    }

    #[test]
    fn tier_names_match_the_wire_protocol() {
        for (tier, name) in [
            (Tier::Linked, "\"Linked\""),
            (Tier::Subprocess, "\"Subprocess\""),
            (Tier::Embedded, "\"Embedded\""),
        ] {
            assert_eq!(serde_json::to_string(&tier).unwrap(), name);
        }
    }

    #[test]
    fn garbage_and_empty_lines_are_rejected() {
        assert!(matches!(
            decode_response("not json"),
            Err(EnvelopeError::Decode(_))
        ));
        assert!(matches!(decode_request("   \n"), Err(EnvelopeError::Empty)));
    }
}
