//! # Records and their wire shape
//!
//! A [`Record`] is one inscription image observed in the mempool. Both the
//! snapshot pull and the push transport deliver records as [`RawRecord`]
//! JSON objects:
//!
//! ```json
//! { "tx_id": "...", "image": "ab12.png", "creation_time": 1700000000,
//!   "data": { "tx_id": "...", "fee_rate": 12.5, "timestamp": 1700000001,
//!             "content_length": 2048, "content_type": "image/png" } }
//! ```
//!
//! Only `image` and `creation_time` are required. Every other field decodes
//! to "absent" when it is missing or has an unexpected type.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::DecodeError;

/// Confirmation state of a record. Only ever moves `Pending -> Confirmed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RecordStatus {
    /// Seen in the mempool, not yet mined.
    #[default]
    Pending,
    /// Reported as removed from the mempool (mined).
    Confirmed,
}

/// Identity used to keep the feed free of duplicates.
///
/// The transaction id is canonical when known. Records observed before their
/// transaction id is available fall back to `(image_path, creation_time)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKey {
    /// Keyed by transaction id.
    Tx(String),
    /// Keyed by the stored asset and its creation time.
    Asset {
        /// Opaque reference to the stored media file.
        image_path: String,
        /// Creation time in seconds.
        creation_time: i64,
    },
}

impl RecordKey {
    /// Shorthand for a transaction-id key, the form status events carry.
    pub fn tx(tx_id: impl Into<String>) -> Self {
        RecordKey::Tx(tx_id.into())
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Tx(id) => write!(f, "{}", id),
            RecordKey::Asset { image_path, creation_time } => write!(f, "{}@{}", image_path, creation_time),
        }
    }
}

/// One observed mempool item.
///
/// All fields are fixed at creation. Only the feed store may advance `status`.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    tx_id: Option<String>,
    image_path: String,
    creation_time: i64,
    content_length: Option<u64>,
    content_type: Option<String>,
    content_hash: Option<String>,
    fee_rate: Option<f64>,
    observed_at: Option<i64>,
    status: RecordStatus,
}

impl Record {
    /// Creates a pending record with only the required identity fields.
    pub fn new(image_path: impl Into<String>, creation_time: i64) -> Self {
        Self {
            tx_id: None,
            image_path: image_path.into(),
            creation_time,
            content_length: None,
            content_type: None,
            content_hash: None,
            fee_rate: None,
            observed_at: None,
            status: RecordStatus::Pending,
        }
    }

    pub fn with_tx_id(mut self, tx_id: impl Into<String>) -> Self {
        self.tx_id = Some(tx_id.into());
        self
    }

    pub fn with_fee_rate(mut self, fee_rate: f64) -> Self {
        self.fee_rate = Some(fee_rate);
        self
    }

    pub fn with_observed_at(mut self, timestamp: i64) -> Self {
        self.observed_at = Some(timestamp);
        self
    }

    pub fn with_content(mut self, content_type: impl Into<String>, content_length: u64) -> Self {
        self.content_type = Some(content_type.into());
        self.content_length = Some(content_length);
        self
    }

    /// The dedup key: transaction id when present, asset identity otherwise.
    pub fn key(&self) -> RecordKey {
        match &self.tx_id {
            Some(id) => RecordKey::Tx(id.clone()),
            None => RecordKey::Asset {
                image_path: self.image_path.clone(),
                creation_time: self.creation_time,
            },
        }
    }

    /// Compares against a key without building one.
    pub fn has_key(&self, key: &RecordKey) -> bool {
        match (key, &self.tx_id) {
            (RecordKey::Tx(id), Some(own)) => id == own,
            (RecordKey::Asset { image_path, creation_time }, None) => {
                *image_path == self.image_path && *creation_time == self.creation_time
            }
            _ => false,
        }
    }

    pub fn tx_id(&self) -> Option<&str> {
        self.tx_id.as_deref()
    }

    pub fn image_path(&self) -> &str {
        &self.image_path
    }

    pub fn creation_time(&self) -> i64 {
        self.creation_time
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn content_hash(&self) -> Option<&str> {
        self.content_hash.as_deref()
    }

    /// Fee rate in sat/vB.
    pub fn fee_rate(&self) -> Option<f64> {
        self.fee_rate
    }

    /// When the server first observed the transaction, in seconds.
    pub fn observed_at(&self) -> Option<i64> {
        self.observed_at
    }

    pub fn status(&self) -> RecordStatus {
        self.status
    }

    /// Moves the record to `Confirmed`. Returns `false` if it already was.
    pub(crate) fn confirm(&mut self) -> bool {
        match self.status {
            RecordStatus::Pending => {
                self.status = RecordStatus::Confirmed;
                true
            }
            RecordStatus::Confirmed => false,
        }
    }
}

/// Wire shape of a record, shared by the snapshot and push payloads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecord {
    /// Legacy copy of the transaction id. `data.tx_id` wins when both exist.
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub tx_id: Option<String>,
    pub image: String,
    #[serde(deserialize_with = "seconds")]
    pub creation_time: i64,
    #[serde(default, deserialize_with = "lenient_data")]
    pub data: RawRecordData,
}

/// Metadata block of a [`RawRecord`]. Unknown keys are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecordData {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub tx_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_f64")]
    pub fee_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub content_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub content_hash: Option<String>,
}

impl From<RawRecord> for Record {
    fn from(raw: RawRecord) -> Self {
        let non_empty = |id: Option<String>| id.filter(|s| !s.is_empty());
        let RawRecordData { tx_id, fee_rate, timestamp, content_length, content_type, content_hash } = raw.data;

        Record {
            tx_id: non_empty(tx_id).or_else(|| non_empty(raw.tx_id)),
            image_path: raw.image,
            creation_time: raw.creation_time,
            content_length,
            content_type,
            content_hash,
            fee_rate: fee_rate.filter(|r| r.is_finite()),
            observed_at: timestamp,
            status: RecordStatus::Pending,
        }
    }
}

impl From<&Record> for RawRecord {
    fn from(record: &Record) -> Self {
        RawRecord {
            tx_id: record.tx_id.clone(),
            image: record.image_path.clone(),
            creation_time: record.creation_time,
            data: RawRecordData {
                tx_id: record.tx_id.clone(),
                fee_rate: record.fee_rate,
                timestamp: record.observed_at,
                content_length: record.content_length,
                content_type: record.content_type.clone(),
                content_hash: record.content_hash.clone(),
            },
        }
    }
}

/// Decodes one raw JSON record.
///
/// # Errors
/// `DecodeError::Malformed` when the value is not an object, or `image` /
/// `creation_time` is missing or mistyped.
pub fn decode_record(value: Value) -> Result<Record, DecodeError> {
    // Derived structs also accept sequences, filling fields by position.
    if !value.is_object() {
        return Err(DecodeError::Malformed(format!("record must be an object, got {}", value)));
    }
    let raw: RawRecord = serde_json::from_value(value)?;
    Ok(Record::from(raw))
}

/// Decodes a batch, dropping (and logging) only the items that fail.
pub fn decode_batch(items: Vec<Value>) -> Vec<Record> {
    let total = items.len();
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match decode_record(item) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("Discarding record {} of {}: {}", index, total, e);
                None
            }
        })
        .collect()
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

// The server serializes Decimal values as strings, so numeric strings count.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn lenient_data<'de, D>(deserializer: D) -> Result<RawRecordData, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(v @ Value::Object(_)) => serde_json::from_value(v).unwrap_or_default(),
        _ => RawRecordData::default(),
    })
}

// File mtimes arrive as floats; whole seconds are enough for ordering.
fn seconds<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .ok_or_else(|| D::Error::custom(format!("creation_time out of range: {}", n))),
        other => Err(D::Error::custom(format!("creation_time must be a number, got {}", other))),
    }
}
