//! Push message decoding.
//!
//! Every inbound frame is a JSON envelope `{ "type": ..., "payload": ... }`.
//! Two tags are understood; anything else is a protocol violation that the
//! transport logs and skips.

use serde::Deserialize;
use serde_json::Value;

use crate::core::record::RecordKey;
use crate::error::ProtocolViolation;

/// Tag of a batch of newly observed records.
pub const TAG_NEW_TX: &str = "new_tx";
/// Tag of a "left the mempool" notification for one transaction id.
pub const TAG_TX_DELETED: &str = "tx_deleted";

/// A decoded push event.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// Raw records, decoded individually by the consumer.
    NewRecords(Vec<Value>),
    /// The record with this key was mined.
    StatusChanged(RecordKey),
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

/// Parses one text frame.
///
/// # Errors
/// `UnknownTag` for an unrecognized `type`, `Malformed` when the frame is not
/// an envelope or its payload does not match the tag.
pub fn parse_message(text: &str) -> Result<FeedEvent, ProtocolViolation> {
    let envelope: Envelope = serde_json::from_str(text).map_err(|e| ProtocolViolation::Malformed(e.to_string()))?;

    match envelope.kind.as_str() {
        TAG_NEW_TX => match envelope.payload {
            Value::Array(items) => Ok(FeedEvent::NewRecords(items)),
            other => Err(ProtocolViolation::Malformed(format!("{} payload must be a list, got {}", TAG_NEW_TX, other))),
        },
        TAG_TX_DELETED => match envelope.payload {
            Value::String(tx_id) if !tx_id.is_empty() => Ok(FeedEvent::StatusChanged(RecordKey::Tx(tx_id))),
            other => Err(ProtocolViolation::Malformed(format!(
                "{} payload must be a transaction id, got {}",
                TAG_TX_DELETED, other
            ))),
        },
        _ => Err(ProtocolViolation::UnknownTag(envelope.kind)),
    }
}
