//! The engine's operation set: aggregate one event record.
//!
//! This handler backs the embedded tier and the `engine-worker` binary alike,
//! so the subprocess and embedded tiers compute the same results by
//! construction.

use serde_json::{json, Value};

use adapter::{OpError, OpHandler};
use envelope::{codes, Request};

/// Operation code for record aggregation.
pub const OP_AGGREGATE: &str = "aggregate";

/// Result field the pipeline extracts after each call.
pub const FIELD_NOTIONAL: &str = "notional";

/// Parses a `"<ts>,<symbol>,<price>,<qty>"` record and derives its notional.
pub struct AggregateHandler;

impl OpHandler for AggregateHandler {
    fn execute(&self, request: &Request) -> Result<Value, OpError> {
        match request.op.as_str() {
            OP_AGGREGATE => {
                let record = request
                    .param("record")
                    .and_then(Value::as_str)
                    .ok_or_else(|| OpError::new(codes::INVALID_REQUEST))?;
                Ok(aggregate_record(record))
            }
            _ => Err(OpError::new(codes::INVALID_REQUEST)),
        }
    }
}

/// Missing or malformed fields default to zero rather than failing the event.
fn aggregate_record(record: &str) -> Value {
    let mut fields = record.split(',');
    let ts: u64 = fields.next().and_then(|f| f.trim().parse().ok()).unwrap_or(0);
    let symbol = fields.next().unwrap_or("").to_string();
    let price: f64 = fields.next().and_then(|f| f.trim().parse().ok()).unwrap_or(0.0);
    let qty: u64 = fields.next().and_then(|f| f.trim().parse().ok()).unwrap_or(0);
    let notional = price * qty as f64;
    json!({
        "ts": ts,
        "symbol": symbol,
        "price": price,
        "qty": qty,
        FIELD_NOTIONAL: notional,
    })
}
