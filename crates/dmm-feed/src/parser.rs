//! Feed message parsing.
//!
//! One canonical handler per message type. A malformed price level is
//! skipped (with a warning and a counter bump) while the rest of the message
//! is still applied; a malformed message envelope drops the whole event.
//! Neither ever terminates the consumption loop.

use crate::error::{FeedError, FeedResult};
use crate::messages::{BookLevel, FeedEvent, LevelOp, OrderUpdateEvent};
use dmm_core::{Price, Qty, Side};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Counters for degraded input.
#[derive(Debug, Default)]
pub struct ParserStats {
    /// Individual levels skipped inside otherwise-valid messages.
    pub malformed_levels: AtomicU64,
    /// Whole events dropped.
    pub dropped_events: AtomicU64,
}

impl ParserStats {
    pub fn record_malformed_level(&self) {
        self.malformed_levels.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped_event(&self) {
        self.dropped_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn malformed_levels(&self) -> u64 {
        self.malformed_levels.load(Ordering::Relaxed)
    }

    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Deserialize)]
struct RawSnapshot {
    sequence_id: u64,
    #[serde(default)]
    bids: Vec<Value>,
    #[serde(default)]
    asks: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawDiff {
    prev_sequence_id: u64,
    sequence_id: u64,
    #[serde(default)]
    bids: Vec<Value>,
    #[serde(default)]
    asks: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawVolatility {
    volatility: f64,
    #[serde(default)]
    timestamp: i64,
    #[serde(default)]
    index_name: String,
}

#[derive(Debug, Deserialize)]
struct RawOrderUpdate {
    order_id: String,
    instrument: String,
    side: Side,
    price: Value,
    quantity: Value,
    #[serde(default)]
    filled_quantity: Option<Value>,
    status: String,
    #[serde(default)]
    creation_timestamp: i64,
}

/// Feed message parser.
#[derive(Debug, Default)]
pub struct MessageParser {
    stats: ParserStats,
}

impl MessageParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &ParserStats {
        &self.stats
    }

    /// Parse one raw JSON frame into a typed event.
    ///
    /// Returns `Ok(None)` for message types this engine does not consume.
    pub fn parse(&self, raw: &str) -> FeedResult<Option<FeedEvent>> {
        let value: Value = serde_json::from_str(raw)?;
        let msg_type = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| FeedError::ParseError("missing message type".to_string()))?;

        match msg_type {
            "snapshot" => self.parse_snapshot(&value).map(Some),
            "change" => self.parse_diff(&value).map(Some),
            "volatility" => self.parse_volatility(&value).map(Some),
            "order" => self.parse_order(&value).map(Some),
            other => {
                debug!(msg_type = %other, "ignoring unknown message type");
                Ok(None)
            }
        }
    }

    fn parse_snapshot(&self, value: &Value) -> FeedResult<FeedEvent> {
        let raw: RawSnapshot = serde_json::from_value(value.clone())
            .map_err(|e| FeedError::ParseError(format!("invalid snapshot: {e}")))?;

        let bids = self.parse_levels(&raw.bids, "bid");
        let asks = self.parse_levels(&raw.asks, "ask");

        Ok(FeedEvent::Snapshot {
            sequence_id: raw.sequence_id,
            bids,
            asks,
        })
    }

    fn parse_diff(&self, value: &Value) -> FeedResult<FeedEvent> {
        let raw: RawDiff = serde_json::from_value(value.clone())
            .map_err(|e| FeedError::ParseError(format!("invalid diff: {e}")))?;

        let bid_ops = self.parse_ops(&raw.bids, "bid");
        let ask_ops = self.parse_ops(&raw.asks, "ask");

        Ok(FeedEvent::Diff {
            prev_sequence_id: raw.prev_sequence_id,
            sequence_id: raw.sequence_id,
            bid_ops,
            ask_ops,
        })
    }

    fn parse_volatility(&self, value: &Value) -> FeedResult<FeedEvent> {
        let raw: RawVolatility = serde_json::from_value(value.clone())
            .map_err(|e| FeedError::ParseError(format!("invalid volatility sample: {e}")))?;

        if !raw.volatility.is_finite() {
            return Err(FeedError::InvalidData(format!(
                "non-finite volatility: {}",
                raw.volatility
            )));
        }

        Ok(FeedEvent::Volatility {
            value: raw.volatility,
            timestamp_ms: raw.timestamp,
            index_name: raw.index_name,
        })
    }

    fn parse_order(&self, value: &Value) -> FeedResult<FeedEvent> {
        let raw: RawOrderUpdate = serde_json::from_value(value.clone())
            .map_err(|e| FeedError::ParseError(format!("invalid order update: {e}")))?;

        let status = dmm_core::OrderStatus::from_str(&raw.status)
            .map_err(|e| FeedError::ParseError(e.to_string()))?;
        let price = parse_decimal(&raw.price)
            .ok_or_else(|| FeedError::ParseError(format!("invalid order price: {}", raw.price)))?;
        let quantity = parse_decimal(&raw.quantity).ok_or_else(|| {
            FeedError::ParseError(format!("invalid order quantity: {}", raw.quantity))
        })?;
        let filled_quantity = match &raw.filled_quantity {
            Some(v) => parse_decimal(v).ok_or_else(|| {
                FeedError::ParseError(format!("invalid filled quantity: {v}"))
            })?,
            None => Decimal::ZERO,
        };

        Ok(FeedEvent::OrderUpdate(OrderUpdateEvent {
            order_id: raw.order_id.into(),
            instrument: raw.instrument,
            side: raw.side,
            price: Price::new(price),
            quantity: Qty::new(quantity),
            filled_quantity: Qty::new(filled_quantity),
            status,
            creation_timestamp_ms: raw.creation_timestamp,
        }))
    }

    /// Parse snapshot levels `[price, qty]`, skipping malformed entries.
    fn parse_levels(&self, raw: &[Value], side: &str) -> Vec<BookLevel> {
        let mut levels = Vec::with_capacity(raw.len());
        for entry in raw {
            match self.parse_level(entry) {
                Ok(level) => levels.push(level),
                Err(e) => {
                    self.stats.record_malformed_level();
                    warn!(side, error = %e, "skipping malformed snapshot level");
                }
            }
        }
        levels
    }

    fn parse_level(&self, entry: &Value) -> FeedResult<BookLevel> {
        let arr = entry
            .as_array()
            .ok_or_else(|| FeedError::MalformedLevel("level is not an array".to_string()))?;
        if arr.len() < 2 {
            return Err(FeedError::MalformedLevel("level array too short".to_string()));
        }
        let price = parse_positive_price(&arr[0])?;
        let qty = parse_qty(&arr[1])?;
        Ok(BookLevel::new(price, qty))
    }

    /// Parse diff ops `[action, price, qty]`, skipping malformed entries.
    fn parse_ops(&self, raw: &[Value], side: &str) -> Vec<LevelOp> {
        let mut ops = Vec::with_capacity(raw.len());
        for entry in raw {
            match self.parse_op(entry) {
                Ok(op) => ops.push(op),
                Err(e) => {
                    self.stats.record_malformed_level();
                    warn!(side, error = %e, "skipping malformed diff level");
                }
            }
        }
        ops
    }

    fn parse_op(&self, entry: &Value) -> FeedResult<LevelOp> {
        let arr = entry
            .as_array()
            .ok_or_else(|| FeedError::MalformedLevel("op is not an array".to_string()))?;
        if arr.len() < 3 {
            return Err(FeedError::MalformedLevel("op array too short".to_string()));
        }
        let action = arr[0]
            .as_str()
            .ok_or_else(|| FeedError::MalformedLevel("op action is not a string".to_string()))?;

        match action {
            // The wire distinguishes inserts from amendments; the book does not.
            "new" | "change" => {
                let price = parse_positive_price(&arr[1])?;
                let qty = parse_qty(&arr[2])?;
                Ok(LevelOp::upsert(price, qty))
            }
            "delete" => {
                let price = parse_positive_price(&arr[1])?;
                Ok(LevelOp::delete(price))
            }
            other => Err(FeedError::MalformedLevel(format!("unknown action: {other}"))),
        }
    }
}

/// Decimal from a JSON number or numeric string.
fn parse_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
        }
        Value::String(s) => Decimal::from_str(s).or_else(|_| Decimal::from_scientific(s)).ok(),
        _ => None,
    }
}

fn parse_positive_price(value: &Value) -> FeedResult<Price> {
    let d = parse_decimal(value)
        .ok_or_else(|| FeedError::MalformedLevel(format!("non-numeric price: {value}")))?;
    if d <= Decimal::ZERO {
        return Err(FeedError::MalformedLevel(format!("non-positive price: {d}")));
    }
    Ok(Price::new(d))
}

fn parse_qty(value: &Value) -> FeedResult<Qty> {
    let d = parse_decimal(value)
        .ok_or_else(|| FeedError::MalformedLevel(format!("non-numeric quantity: {value}")))?;
    if d < Decimal::ZERO {
        return Err(FeedError::MalformedLevel(format!("negative quantity: {d}")));
    }
    Ok(Qty::new(d))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::LevelAction;
    use dmm_core::OrderStatus;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_snapshot() {
        let parser = MessageParser::new();
        let raw = r#"{"type":"snapshot","sequence_id":7,
            "bids":[[99.5,10],[99.0,5]],"asks":[["100.5","4"]]}"#;

        let event = parser.parse(raw).unwrap().unwrap();
        match event {
            FeedEvent::Snapshot { sequence_id, bids, asks } => {
                assert_eq!(sequence_id, 7);
                assert_eq!(bids.len(), 2);
                assert_eq!(bids[0].price, Price::new(dec!(99.5)));
                assert_eq!(bids[0].qty, Qty::new(dec!(10)));
                // String-encoded numbers parse too.
                assert_eq!(asks[0].price, Price::new(dec!(100.5)));
            }
            other => panic!("expected Snapshot, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_diff_actions() {
        let parser = MessageParser::new();
        let raw = r#"{"type":"change","prev_sequence_id":7,"sequence_id":8,
            "bids":[["new",99.8,3],["change",99.0,6]],
            "asks":[["delete",100.5,0]]}"#;

        let event = parser.parse(raw).unwrap().unwrap();
        match event {
            FeedEvent::Diff { prev_sequence_id, sequence_id, bid_ops, ask_ops } => {
                assert_eq!(prev_sequence_id, 7);
                assert_eq!(sequence_id, 8);
                assert_eq!(bid_ops.len(), 2);
                assert!(bid_ops.iter().all(|op| op.action == LevelAction::Upsert));
                assert_eq!(ask_ops[0].action, LevelAction::Delete);
                assert_eq!(ask_ops[0].price, Price::new(dec!(100.5)));
            }
            other => panic!("expected Diff, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_level_skipped_rest_kept() {
        let parser = MessageParser::new();
        let raw = r#"{"type":"snapshot","sequence_id":1,
            "bids":[[99.5,10],["oops",5],[98.0,"abc"],[97.5,2]],
            "asks":[[100.5,4]]}"#;

        let event = parser.parse(raw).unwrap().unwrap();
        match event {
            FeedEvent::Snapshot { bids, asks, .. } => {
                assert_eq!(bids.len(), 2);
                assert_eq!(bids[0].price, Price::new(dec!(99.5)));
                assert_eq!(bids[1].price, Price::new(dec!(97.5)));
                assert_eq!(asks.len(), 1);
            }
            other => panic!("expected Snapshot, got {other:?}"),
        }
        assert_eq!(parser.stats().malformed_levels(), 2);
    }

    #[test]
    fn test_negative_price_and_qty_rejected() {
        let parser = MessageParser::new();
        let raw = r#"{"type":"change","prev_sequence_id":1,"sequence_id":2,
            "bids":[["new",-1.0,3],["new",99.0,-4]],"asks":[]}"#;

        let event = parser.parse(raw).unwrap().unwrap();
        match event {
            FeedEvent::Diff { bid_ops, .. } => assert!(bid_ops.is_empty()),
            other => panic!("expected Diff, got {other:?}"),
        }
        assert_eq!(parser.stats().malformed_levels(), 2);
    }

    #[test]
    fn test_parse_volatility() {
        let parser = MessageParser::new();
        let raw = r#"{"type":"volatility","volatility":0.55,
            "timestamp":1724112000000,"index_name":"btc_usd"}"#;

        let event = parser.parse(raw).unwrap().unwrap();
        match event {
            FeedEvent::Volatility { value, timestamp_ms, index_name } => {
                assert!((value - 0.55).abs() < f64::EPSILON);
                assert_eq!(timestamp_ms, 1724112000000);
                assert_eq!(index_name, "btc_usd");
            }
            other => panic!("expected Volatility, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_order_update() {
        let parser = MessageParser::new();
        let raw = r#"{"type":"order","order_id":"ETH-349",
            "instrument":"BTC-PERPETUAL","side":"buy","price":100.5,
            "quantity":10,"filled_quantity":4,"status":"open",
            "creation_timestamp":1724112000000}"#;

        let event = parser.parse(raw).unwrap().unwrap();
        match event {
            FeedEvent::OrderUpdate(update) => {
                assert_eq!(update.order_id.as_str(), "ETH-349");
                assert_eq!(update.side, Side::Buy);
                assert_eq!(update.status, OrderStatus::Open);
                assert_eq!(update.price, Price::new(dec!(100.5)));
                assert_eq!(update.filled_quantity, Qty::new(dec!(4)));
            }
            other => panic!("expected OrderUpdate, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_status_drops_event() {
        let parser = MessageParser::new();
        let raw = r#"{"type":"order","order_id":"x","instrument":"i",
            "side":"buy","price":1,"quantity":1,"status":"untriggered"}"#;
        assert!(parser.parse(raw).is_err());
    }

    #[test]
    fn test_unknown_type_ignored() {
        let parser = MessageParser::new();
        let raw = r#"{"type":"heartbeat"}"#;
        assert!(parser.parse(raw).unwrap().is_none());
    }

    #[test]
    fn test_missing_type_is_error() {
        let parser = MessageParser::new();
        assert!(parser.parse(r#"{"sequence_id":1}"#).is_err());
    }
}
