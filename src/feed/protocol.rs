//! Wire protocol for the quote feed
//!
//! Requests are small JSON objects carrying a `req_id`. Responses echo the
//! id either at the top level or inside `echo_req`; live ticks are routed by
//! symbol instead.

use super::{FeedError, Tick};
use serde::Deserialize;
use serde_json::{json, Value};

/// Feed error code returned when a stream is already open for the symbol
pub const ALREADY_SUBSCRIBED: &str = "AlreadySubscribed";

/// `{ "ticks": <symbol>, "subscribe": 1, "req_id": <id> }`
pub fn subscribe_ticks(symbol: &str, req_id: u64) -> String {
    json!({ "ticks": symbol, "subscribe": 1, "req_id": req_id }).to_string()
}

/// Historical ticks ending at the latest quote
pub fn ticks_history(symbol: &str, count: usize, req_id: u64) -> String {
    json!({
        "ticks_history": symbol,
        "adjust_start_time": 1,
        "count": count,
        "end": "latest",
        "style": "ticks",
        "req_id": req_id,
    })
    .to_string()
}

/// Cancel a single feed stream by its feed-assigned id
pub fn forget(subscription_id: &str) -> String {
    json!({ "forget": subscription_id }).to_string()
}

/// Cancel every stream of `kind`
pub fn forget_all(kind: &str) -> String {
    json!({ "forget_all": kind }).to_string()
}

/// A parsed inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    /// Live tick for a subscribed symbol
    Tick {
        symbol: String,
        subscription_id: Option<String>,
        tick: Tick,
    },
    /// Answer to a history request
    History { req_id: Option<u64>, ticks: Vec<Tick> },
    /// Error reply, correlated when the feed echoed the request id
    Error {
        req_id: Option<u64>,
        code: String,
        message: String,
    },
    /// Anything else (forget acks, pings)
    Other {
        msg_type: Option<String>,
        req_id: Option<u64>,
    },
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    msg_type: Option<String>,
    #[serde(default)]
    req_id: Option<u64>,
    #[serde(default)]
    echo_req: Option<Value>,
    #[serde(default)]
    error: Option<ApiError>,
    #[serde(default)]
    tick: Option<TickPayload>,
    #[serde(default)]
    history: Option<HistoryPayload>,
    #[serde(default)]
    subscription: Option<SubscriptionInfo>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct TickPayload {
    symbol: String,
    quote: Value,
    epoch: i64,
}

#[derive(Debug, Deserialize)]
struct HistoryPayload {
    prices: Vec<Value>,
    times: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionInfo {
    id: String,
}

/// Quote text as published: JSON strings verbatim, numbers in their shortest form
fn quote_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn malformed(reason: impl Into<String>) -> FeedError {
    FeedError::MalformedMessage(reason.into())
}

/// Parse one inbound text frame
pub fn parse_message(text: &str) -> Result<FeedMessage, FeedError> {
    let envelope: Envelope =
        serde_json::from_str(text).map_err(|e| malformed(e.to_string()))?;

    let req_id = envelope.req_id.or_else(|| {
        envelope
            .echo_req
            .as_ref()
            .and_then(|echo| echo.get("req_id"))
            .and_then(Value::as_u64)
    });

    if let Some(error) = envelope.error {
        return Ok(FeedMessage::Error {
            req_id,
            code: error.code,
            message: error.message,
        });
    }

    if let Some(payload) = envelope.tick {
        let quote = quote_text(&payload.quote)
            .ok_or_else(|| malformed(format!("tick quote is not a number: {}", payload.quote)))?;
        let tick = Tick::from_quote(&quote, payload.epoch)
            .ok_or_else(|| malformed(format!("unparseable tick quote {quote:?}")))?;
        return Ok(FeedMessage::Tick {
            symbol: payload.symbol,
            subscription_id: envelope.subscription.map(|s| s.id),
            tick,
        });
    }

    if let Some(history) = envelope.history {
        if history.prices.len() != history.times.len() {
            return Err(malformed(format!(
                "history has {} prices but {} times",
                history.prices.len(),
                history.times.len()
            )));
        }
        let ticks = history
            .prices
            .iter()
            .zip(history.times.iter())
            .map(|(price, &epoch)| {
                quote_text(price)
                    .and_then(|quote| Tick::from_quote(&quote, epoch))
                    .ok_or_else(|| malformed(format!("unparseable history price {price}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(FeedMessage::History { req_id, ticks });
    }

    Ok(FeedMessage::Other {
        msg_type: envelope.msg_type,
        req_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_subscribe_request_shape() {
        let v: Value = serde_json::from_str(&subscribe_ticks("R_100", 4)).unwrap();
        assert_eq!(v, json!({ "ticks": "R_100", "subscribe": 1, "req_id": 4 }));
    }

    #[test]
    fn test_history_request_shape() {
        let v: Value = serde_json::from_str(&ticks_history("R_50", 1000, 9)).unwrap();
        assert_eq!(
            v,
            json!({
                "ticks_history": "R_50",
                "adjust_start_time": 1,
                "count": 1000,
                "end": "latest",
                "style": "ticks",
                "req_id": 9
            })
        );
    }

    #[test]
    fn test_forget_requests() {
        assert_eq!(forget_all("ticks"), r#"{"forget_all":"ticks"}"#);
        assert_eq!(forget("abc-123"), r#"{"forget":"abc-123"}"#);
    }

    #[test]
    fn test_parse_tick() {
        let msg = r#"{
            "echo_req": {"ticks": "R_100", "subscribe": 1, "req_id": 3},
            "msg_type": "tick",
            "req_id": 3,
            "subscription": {"id": "f00d"},
            "tick": {"symbol": "R_100", "quote": 7054.231, "epoch": 1704067200}
        }"#;

        match parse_message(msg).unwrap() {
            FeedMessage::Tick {
                symbol,
                subscription_id,
                tick,
            } => {
                assert_eq!(symbol, "R_100");
                assert_eq!(subscription_id.as_deref(), Some("f00d"));
                assert_eq!(tick.price, dec!(7054.231));
                assert_eq!(tick.digit, 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_history_with_echoed_id() {
        let msg = r#"{
            "echo_req": {"ticks_history": "R_100", "req_id": 12},
            "msg_type": "history",
            "history": {"prices": ["100.12", "100.15", "100.10"], "times": [1, 2, 3]}
        }"#;

        match parse_message(msg).unwrap() {
            FeedMessage::History { req_id, ticks } => {
                assert_eq!(req_id, Some(12));
                assert_eq!(ticks.len(), 3);
                assert_eq!(ticks[0].digit, 2);
                assert_eq!(ticks[2].digit, 0);
                assert_eq!(ticks[2].price, dec!(100.10));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_history_length_mismatch() {
        let msg = r#"{"req_id": 1, "history": {"prices": ["1.1"], "times": [1, 2]}}"#;
        assert!(matches!(
            parse_message(msg),
            Err(FeedError::MalformedMessage(_))
        ));
    }

    #[test]
    fn test_parse_error() {
        let msg = r#"{
            "echo_req": {"ticks_history": "XX", "req_id": 5},
            "error": {"code": "InvalidSymbol", "message": "Symbol XX invalid"},
            "msg_type": "history",
            "req_id": 5
        }"#;

        assert_eq!(
            parse_message(msg).unwrap(),
            FeedMessage::Error {
                req_id: Some(5),
                code: "InvalidSymbol".into(),
                message: "Symbol XX invalid".into(),
            }
        );
    }

    #[test]
    fn test_parse_other() {
        let msg = r#"{"msg_type": "forget_all", "forget_all": ["f00d"]}"#;
        assert_eq!(
            parse_message(msg).unwrap(),
            FeedMessage::Other {
                msg_type: Some("forget_all".into()),
                req_id: None,
            }
        );
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(
            parse_message("not json"),
            Err(FeedError::MalformedMessage(_))
        ));
        let bad_quote = r#"{"tick": {"symbol": "R_100", "quote": "n/a", "epoch": 1}}"#;
        assert!(matches!(
            parse_message(bad_quote),
            Err(FeedError::MalformedMessage(_))
        ));
        let bad_shape = r#"{"tick": {"symbol": "R_100"}}"#;
        assert!(parse_message(bad_shape).is_err());
    }
}
