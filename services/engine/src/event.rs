//! The market event absorbed by the intake queue.

use std::fmt::Write as _;

/// One tick: a trade observation plus its precomputed wire record.
///
/// `record` is built once at admission (`"<ts>,<symbol>,<price>,<qty>"`) and
/// shipped verbatim inside the outgoing request, so the hot path never
/// re-encodes the event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Event {
    /// Milliseconds since the epoch at observation time.
    pub timestamp_ms: u64,
    /// Instrument symbol, e.g. `"ABC"`.
    pub symbol: String,
    /// Trade price.
    pub price: f64,
    /// Traded quantity.
    pub quantity: u64,
    /// Precomputed request payload.
    pub record: String,
}

impl Event {
    /// Overwrite this event in place, reusing the slot's string capacity.
    pub(crate) fn fill(&mut self, timestamp_ms: u64, symbol: &str, price: f64, quantity: u64) {
        self.timestamp_ms = timestamp_ms;
        self.symbol.clear();
        self.symbol.push_str(symbol);
        self.price = price;
        self.quantity = quantity;
        self.record.clear();
        let _ = write!(
            self.record,
            "{timestamp_ms},{symbol},{price},{quantity}"
        );
    }
}
