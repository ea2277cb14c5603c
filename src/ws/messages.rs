//! WebSocket message types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::OrderlyError;

/// Topic names and helpers for building per-symbol topics.
pub mod topics {
    // Public topics
    pub const BBOS: &str = "bbos";
    pub const TICKERS_24H: &str = "24h_tickers";

    // Private topics
    pub const POSITION: &str = "position";
    pub const BALANCE: &str = "balance";
    pub const ORDER: &str = "order";
    pub const TRADE: &str = "trade";
    pub const LIQUIDATION: &str = "liquidation";
    pub const PNL: &str = "pnl";

    /// Trade stream for a symbol.
    pub fn trade(symbol: &str) -> String {
        format!("{symbol}@trade")
    }

    /// Orderbook snapshots for a symbol.
    pub fn orderbook(symbol: &str) -> String {
        format!("{symbol}@orderbook")
    }

    /// 24-hour ticker for a symbol.
    pub fn ticker_24h(symbol: &str) -> String {
        format!("{symbol}@24h_ticker")
    }

    /// Kline stream for a symbol and interval (e.g. `1m`, `5m`, `1h`).
    pub fn kline(symbol: &str, interval: &str) -> String {
        format!("{symbol}@kline_{interval}")
    }
}

/// Subscribe or unsubscribe control message.
#[derive(Debug, Clone, Serialize)]
pub struct SubscribeRequest {
    /// Client identifier echoed back in the acknowledgement.
    pub id: String,
    /// Either `subscribe` or `unsubscribe`.
    pub event: &'static str,
    /// Topic to (un)subscribe.
    pub topic: String,
}

impl SubscribeRequest {
    /// Create a subscribe message.
    pub fn subscribe(id: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            event: "subscribe",
            topic: topic.into(),
        }
    }

    /// Create an unsubscribe message.
    pub fn unsubscribe(id: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            event: "unsubscribe",
            topic: topic.into(),
        }
    }
}

/// One-shot orderbook snapshot request.
///
/// The response arrives as a `request` acknowledgement and is routed to the
/// `{symbol}@orderbook` topic.
#[derive(Debug, Clone, Serialize)]
pub struct OrderbookRequest {
    /// Client identifier echoed back in the acknowledgement.
    pub id: String,
    /// Always `request`.
    pub event: &'static str,
    /// Request parameters.
    pub params: OrderbookRequestParams,
}

/// Parameters of an [`OrderbookRequest`].
#[derive(Debug, Clone, Serialize)]
pub struct OrderbookRequestParams {
    /// Request type, always `orderbook`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Symbol to snapshot.
    pub symbol: String,
}

impl OrderbookRequest {
    /// Create an orderbook snapshot request for a symbol.
    pub fn new(id: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            event: "request",
            params: OrderbookRequestParams {
                kind: "orderbook",
                symbol: symbol.into(),
            },
        }
    }
}

/// Authentication message for private streams.
#[derive(Debug, Clone, Serialize)]
pub struct AuthRequest {
    /// Client identifier echoed back in the acknowledgement.
    pub id: String,
    /// Always `auth`.
    pub event: &'static str,
    /// Authentication parameters.
    pub params: AuthParams,
}

/// Parameters of an [`AuthRequest`].
#[derive(Debug, Clone, Serialize)]
pub struct AuthParams {
    /// Orderly access key with the `ed25519:` prefix.
    pub orderly_key: String,
    /// Base64 Ed25519 signature over the stringified timestamp.
    pub sign: String,
    /// The millisecond timestamp that was signed, as a string.
    pub timestamp: String,
}

impl AuthRequest {
    /// Create an authentication message.
    pub fn new(
        id: impl Into<String>,
        orderly_key: &str,
        sign: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            id: id.into(),
            event: "auth",
            params: AuthParams {
                orderly_key: format!("ed25519:{orderly_key}"),
                sign: sign.into(),
                timestamp: timestamp.to_string(),
            },
        }
    }
}

/// Reply to a server heartbeat.
#[derive(Debug, Clone, Serialize)]
pub struct Pong {
    event: &'static str,
}

impl Pong {
    /// Create a pong message.
    pub fn new() -> Self {
        Self { event: "pong" }
    }
}

impl Default for Pong {
    fn default() -> Self {
        Self::new()
    }
}

/// Acknowledgement of a control message (subscribe, unsubscribe, request, auth).
#[derive(Debug, Clone, Deserialize)]
pub struct ControlAck {
    /// Client identifier from the original request.
    #[serde(default)]
    pub id: Option<String>,
    /// Event that is being acknowledged.
    pub event: String,
    /// Whether the request was accepted.
    #[serde(default)]
    pub success: bool,
    /// Error description when `success` is false.
    #[serde(default, rename = "errorMsg")]
    pub error_msg: Option<String>,
    /// Server timestamp in milliseconds.
    #[serde(default)]
    pub ts: Option<i64>,
    /// Response payload (orderbook snapshots arrive here).
    #[serde(default)]
    pub data: Option<Value>,
}

/// A data frame belonging to a topic stream.
#[derive(Debug, Clone, Deserialize)]
pub struct DataFrame {
    /// Topic the frame belongs to.
    pub topic: String,
    /// Server timestamp in milliseconds.
    #[serde(default)]
    pub ts: Option<i64>,
    /// The payload delivered to the topic queue.
    pub data: Value,
}

/// A classified inbound frame.
#[derive(Debug, Clone)]
pub enum InboundFrame {
    /// Server heartbeat; must be answered with a pong.
    Ping {
        /// Server timestamp in milliseconds.
        ts: Option<i64>,
    },
    /// Echo of our own heartbeat; ignored.
    Pong {
        /// Server timestamp in milliseconds.
        ts: Option<i64>,
    },
    /// Acknowledgement of a control message.
    Ack(ControlAck),
    /// A topic data frame.
    Data(DataFrame),
}

impl InboundFrame {
    /// Parse a raw text frame.
    pub fn parse(text: &str) -> Result<Self, OrderlyError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Classify an already-parsed JSON value.
    ///
    /// Frames with an `event` field are control messages (`ping` and `pong`
    /// are handled specially, everything else is an acknowledgement). Frames
    /// with `topic` and `data` fields are stream data. Anything else is
    /// rejected.
    pub fn from_value(value: Value) -> Result<Self, OrderlyError> {
        match value.get("event").and_then(Value::as_str) {
            Some("ping") => Ok(Self::Ping {
                ts: value.get("ts").and_then(Value::as_i64),
            }),
            Some("pong") => Ok(Self::Pong {
                ts: value.get("ts").and_then(Value::as_i64),
            }),
            Some(_) => Ok(Self::Ack(serde_json::from_value(value)?)),
            None => {
                if value.get("topic").is_some() && value.get("data").is_some() {
                    Ok(Self::Data(serde_json::from_value(value)?))
                } else {
                    Err(OrderlyError::InvalidResponse(format!(
                        "unrecognized frame: {value}"
                    )))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subscribe_request_serialization() {
        let request = SubscribeRequest::subscribe("CLIENT", "PERP_ETH_USDC@trade");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({"id": "CLIENT", "event": "subscribe", "topic": "PERP_ETH_USDC@trade"})
        );
    }

    #[test]
    fn test_unsubscribe_request_serialization() {
        let request = SubscribeRequest::unsubscribe("CLIENT", "bbos");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["event"], "unsubscribe");
        assert_eq!(value["topic"], "bbos");
    }

    #[test]
    fn test_orderbook_request_serialization() {
        let request = OrderbookRequest::new("CLIENT", "PERP_BTC_USDC");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "CLIENT",
                "event": "request",
                "params": {"type": "orderbook", "symbol": "PERP_BTC_USDC"}
            })
        );
    }

    #[test]
    fn test_auth_request_serialization() {
        let request = AuthRequest::new("CLIENT", "mykey", "c2ln", 1700000000000);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["event"], "auth");
        assert_eq!(value["params"]["orderly_key"], "ed25519:mykey");
        assert_eq!(value["params"]["sign"], "c2ln");
        assert_eq!(value["params"]["timestamp"], "1700000000000");
    }

    #[test]
    fn test_pong_serialization() {
        let value = serde_json::to_value(Pong::new()).unwrap();
        assert_eq!(value, json!({"event": "pong"}));
    }

    #[test]
    fn test_classify_ping() {
        let frame = InboundFrame::parse(r#"{"event":"ping","ts":1650000000000}"#).unwrap();
        assert!(matches!(frame, InboundFrame::Ping { ts: Some(1650000000000) }));
    }

    #[test]
    fn test_classify_successful_ack() {
        let frame =
            InboundFrame::parse(r#"{"id":"CLIENT","event":"subscribe","success":true,"ts":1}"#)
                .unwrap();
        match frame {
            InboundFrame::Ack(ack) => {
                assert_eq!(ack.event, "subscribe");
                assert!(ack.success);
                assert_eq!(ack.id.as_deref(), Some("CLIENT"));
            }
            other => panic!("expected ack, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_failed_ack() {
        let frame = InboundFrame::parse(
            r#"{"id":"CLIENT","event":"subscribe","success":false,"errorMsg":"unknown topic"}"#,
        )
        .unwrap();
        match frame {
            InboundFrame::Ack(ack) => {
                assert!(!ack.success);
                assert_eq!(ack.error_msg.as_deref(), Some("unknown topic"));
            }
            other => panic!("expected ack, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_success_defaults_to_failure() {
        let frame = InboundFrame::parse(r#"{"event":"auth"}"#).unwrap();
        match frame {
            InboundFrame::Ack(ack) => assert!(!ack.success),
            other => panic!("expected ack, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_data_frame() {
        let frame = InboundFrame::parse(
            r#"{"topic":"PERP_ETH_USDC@trade","ts":1650000000000,"data":{"price":1800.5}}"#,
        )
        .unwrap();
        match frame {
            InboundFrame::Data(data) => {
                assert_eq!(data.topic, "PERP_ETH_USDC@trade");
                assert_eq!(data.ts, Some(1650000000000));
                assert_eq!(data.data["price"], json!(1800.5));
            }
            other => panic!("expected data frame, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_request_ack_with_payload() {
        let frame = InboundFrame::parse(
            r#"{"id":"CLIENT","event":"request","success":true,"ts":5,"data":{"symbol":"PERP_BTC_USDC","asks":[],"bids":[]}}"#,
        )
        .unwrap();
        match frame {
            InboundFrame::Ack(ack) => {
                assert_eq!(ack.event, "request");
                assert_eq!(ack.ts, Some(5));
                assert_eq!(ack.data.unwrap()["symbol"], "PERP_BTC_USDC");
            }
            other => panic!("expected ack, got {other:?}"),
        }
    }

    #[test]
    fn test_unrecognized_frame_rejected() {
        assert!(InboundFrame::parse(r#"{"foo":"bar"}"#).is_err());
        assert!(InboundFrame::parse("not json at all").is_err());
    }

    #[test]
    fn test_topic_helpers() {
        assert_eq!(topics::trade("PERP_ETH_USDC"), "PERP_ETH_USDC@trade");
        assert_eq!(topics::orderbook("PERP_BTC_USDC"), "PERP_BTC_USDC@orderbook");
        assert_eq!(topics::ticker_24h("PERP_ETH_USDC"), "PERP_ETH_USDC@24h_ticker");
        assert_eq!(topics::kline("PERP_ETH_USDC", "1m"), "PERP_ETH_USDC@kline_1m");
    }
}
