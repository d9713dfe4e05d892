//! Embedded-tier memory operations backed by an instance-owned store.
//!
//! The store belongs to the handler instance and lives exactly as long as the
//! adapter that owns it. Two adapters never observe each other's blocks.
//!
//! Operations: `alloc {size}`, `write {id, data}`, `read {id}`, `free {id}`,
//! `io {kind, data}`. Block payloads cross the envelope base64-encoded.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use parking_lot::Mutex;
use serde_json::{json, Value};

use envelope::{codes, Request};

use crate::handler::{OpError, OpHandler};

/// Error code for a `write` whose payload is not valid base64.
pub const INVALID_BASE64: &str = "invalid_base64";

#[derive(Default)]
struct MemoryStore {
    next_id: u64,
    blocks: HashMap<u64, Vec<u8>>,
}

/// Operation handler over a private in-memory block store.
#[derive(Default)]
pub struct StoreHandler {
    store: Mutex<MemoryStore>,
}

impl StoreHandler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OpHandler for StoreHandler {
    fn execute(&self, request: &Request) -> Result<Value, OpError> {
        match request.op.as_str() {
            "alloc" => {
                let size = require_u64(request, "size")? as usize;
                let mut store = self.store.lock();
                store.next_id += 1;
                let id = store.next_id;
                store.blocks.insert(id, vec![0u8; size]);
                Ok(json!({ "id": id }))
            }
            "write" => {
                let id = require_u64(request, "id")?;
                let data = require_str(request, "data")?;
                let bytes = BASE64
                    .decode(data)
                    .map_err(|_| OpError::new(INVALID_BASE64))?;
                self.store.lock().blocks.insert(id, bytes);
                Ok(json!({}))
            }
            "read" => {
                let id = require_u64(request, "id")?;
                // Unknown ids read as empty rather than erroring.
                let bytes = self
                    .store
                    .lock()
                    .blocks
                    .get(&id)
                    .cloned()
                    .unwrap_or_default();
                Ok(json!({ "data": BASE64.encode(bytes) }))
            }
            "free" => {
                let id = require_u64(request, "id")?;
                self.store.lock().blocks.remove(&id);
                Ok(json!({}))
            }
            "io" => {
                let kind = require_str(request, "kind")?;
                let data = require_str(request, "data")?;
                Ok(json!({ "kind": kind, "len": data.len() }))
            }
            _ => Err(OpError::new(codes::INVALID_REQUEST)),
        }
    }
}

fn require_u64(request: &Request, key: &str) -> Result<u64, OpError> {
    request
        .param(key)
        .and_then(Value::as_u64)
        .ok_or_else(|| OpError::new(codes::INVALID_REQUEST))
}

fn require_str<'r>(request: &'r Request, key: &str) -> Result<&'r str, OpError> {
    request
        .param(key)
        .and_then(Value::as_str)
        .ok_or_else(|| OpError::new(codes::INVALID_REQUEST))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alloc(handler: &StoreHandler, size: u64) -> u64 {
        let result = handler
            .execute(&Request::new("alloc").with_param("size", size))
            .unwrap();
        result["id"].as_u64().unwrap()
    }

    #[test]
    fn alloc_write_read_free_round_trip() {
        let handler = StoreHandler::new();
        let id = alloc(&handler, 16);

        let payload = BASE64.encode(b"block contents");
        handler
            .execute(
                &Request::new("write")
                    .with_param("id", id)
                    .with_param("data", payload.as_str()),
            )
            .unwrap();

        let read = handler
            .execute(&Request::new("read").with_param("id", id))
            .unwrap();
        assert_eq!(read["data"].as_str(), Some(payload.as_str()));

        handler
            .execute(&Request::new("free").with_param("id", id))
            .unwrap();
        let after_free = handler
            .execute(&Request::new("read").with_param("id", id))
            .unwrap();
        assert_eq!(after_free["data"].as_str(), Some(""));
    }

    #[test]
    fn stores_are_isolated_per_instance() {
        let first = StoreHandler::new();
        let second = StoreHandler::new();

        let id = alloc(&first, 8);
        first
            .execute(
                &Request::new("write")
                    .with_param("id", id)
                    .with_param("data", BASE64.encode(b"mine")),
            )
            .unwrap();

        let other = second
            .execute(&Request::new("read").with_param("id", id))
            .unwrap();
        assert_eq!(other["data"].as_str(), Some(""));
    }

    #[test]
    fn malformed_base64_gets_a_specific_code() {
        let handler = StoreHandler::new();
        let id = alloc(&handler, 4);
        let error = handler
            .execute(
                &Request::new("write")
                    .with_param("id", id)
                    .with_param("data", "!!! not base64 !!!"),
            )
            .unwrap_err();
        assert_eq!(error.code(), INVALID_BASE64);
    }

    #[test]
    fn io_reports_kind_and_length() {
        let handler = StoreHandler::new();
        let result = handler
            .execute(
                &Request::new("io")
                    .with_param("kind", "flush")
                    .with_param("data", "abcdef"),
            )
            .unwrap();
        assert_eq!(result["kind"].as_str(), Some("flush"));
        assert_eq!(result["len"].as_u64(), Some(6));
    }

    #[test]
    fn unknown_and_malformed_requests_are_invalid() {
        let handler = StoreHandler::new();
        let error = handler.execute(&Request::new("defrag")).unwrap_err();
        assert_eq!(error.code(), codes::INVALID_REQUEST);

        let error = handler.execute(&Request::new("alloc")).unwrap_err();
        assert_eq!(error.code(), codes::INVALID_REQUEST);
    }
}
