//! Record Module
//!
//! Defines the envelope stored in both cache tiers: the payload, a tagged
//! description of its shape, timestamps and eviction metadata.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Source ==
/// Where the record currently in hand was served from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Source {
    /// In-process memory tier
    #[default]
    Memory,
    /// Durable persistence tier
    Persistence,
    /// Freshly produced by the loader
    Cloud,
}

// == Payload Descriptor ==
/// Shape of a single JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    Null,
    Bool,
    Number,
    String,
    List,
    Map,
}

impl ValueKind {
    /// Classifies a JSON value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::List,
            Value::Object(_) => ValueKind::Map,
        }
    }
}

/// Tagged description of a payload, captured when the record is built.
///
/// Container variants carry the kind of their first element (or map value)
/// so a reader can tell a list of records from a list of scalars without
/// decoding it. Empty containers and `null` carry no element kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayloadKind {
    /// `null` payload
    Empty,
    /// A single non-container value
    Scalar(ValueKind),
    /// A sequence (`Vec`, slice, array, set)
    List { element: Option<ValueKind> },
    /// A keyed container (`HashMap`, `BTreeMap`, struct)
    Map { value: Option<ValueKind> },
}

impl PayloadKind {
    /// Describes an encoded payload.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => PayloadKind::Empty,
            Value::Array(items) => PayloadKind::List {
                element: items.first().map(ValueKind::of),
            },
            Value::Object(entries) => PayloadKind::Map {
                value: entries.values().next().map(ValueKind::of),
            },
            scalar => PayloadKind::Scalar(ValueKind::of(scalar)),
        }
    }

    /// Returns true when `value` still has the shape this descriptor names.
    ///
    /// Only the outer shape is compared; element kinds are informative.
    pub fn describes(&self, value: &Value) -> bool {
        match (self, value) {
            (PayloadKind::Empty, Value::Null) => true,
            (PayloadKind::List { .. }, Value::Array(_)) => true,
            (PayloadKind::Map { .. }, Value::Object(_)) => true,
            (PayloadKind::Scalar(kind), scalar) => *kind == ValueKind::of(scalar),
            _ => false,
        }
    }
}

// == Record ==
/// A cached value plus the metadata the engines need.
///
/// `source` and `size_on_disk_mb` describe the copy in hand and are never
/// persisted. `life_time_ms` is overwritten on every retrieval with the
/// caller's requested life time: `None` never expires, `Some(0)` is always
/// expired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<T> {
    data: T,
    kind: PayloadKind,
    #[serde(skip)]
    source: Source,
    persisted_at_ms: i64,
    life_time_ms: Option<u64>,
    expirable: bool,
    #[serde(skip)]
    size_on_disk_mb: f64,
}

/// Record as held by the tiers: the payload in its encoded form.
pub type StoredRecord = Record<Value>;

impl Record<Value> {
    // == Constructor ==
    /// Creates a record for an encoded payload, stamped with the current time.
    ///
    /// # Arguments
    /// * `data` - The encoded payload
    /// * `life_time_ms` - Life time requested at save time
    /// * `expirable` - Whether the size evictor may remove this record
    pub fn new(data: Value, life_time_ms: Option<u64>, expirable: bool) -> Self {
        Self {
            kind: PayloadKind::of(&data),
            data,
            source: Source::Memory,
            persisted_at_ms: current_timestamp_ms(),
            life_time_ms,
            expirable,
            size_on_disk_mb: 0.0,
        }
    }

    /// Encodes `data` and wraps it in a new record.
    pub fn from_payload<T: Serialize>(
        data: &T,
        life_time_ms: Option<u64>,
        expirable: bool,
    ) -> serde_json::Result<Self> {
        Ok(Self::new(serde_json::to_value(data)?, life_time_ms, expirable))
    }

    /// Decodes the payload into the caller's type, keeping the metadata.
    pub fn decode<T: DeserializeOwned>(&self) -> serde_json::Result<Record<T>> {
        Ok(Record {
            data: serde_json::from_value(self.data.clone())?,
            kind: self.kind,
            source: self.source,
            persisted_at_ms: self.persisted_at_ms,
            life_time_ms: self.life_time_ms,
            expirable: self.expirable,
            size_on_disk_mb: self.size_on_disk_mb,
        })
    }

    /// True when the stored descriptor still matches the payload.
    pub fn is_consistent(&self) -> bool {
        self.kind.describes(&self.data)
    }
}

impl<T> Record<T> {
    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn into_data(self) -> T {
        self.data
    }

    pub fn kind(&self) -> PayloadKind {
        self.kind
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn set_source(&mut self, source: Source) {
        self.source = source;
    }

    /// Wall-clock creation time (Unix milliseconds).
    pub fn persisted_at_ms(&self) -> i64 {
        self.persisted_at_ms
    }

    pub fn life_time_ms(&self) -> Option<u64> {
        self.life_time_ms
    }

    pub fn set_life_time_ms(&mut self, life_time_ms: Option<u64>) {
        self.life_time_ms = life_time_ms;
    }

    pub fn is_expirable(&self) -> bool {
        self.expirable
    }

    /// Size of the persisted file, only known after a persistence read.
    pub fn size_on_disk_mb(&self) -> f64 {
        self.size_on_disk_mb
    }

    pub fn set_size_on_disk_mb(&mut self, size_on_disk_mb: f64) {
        self.size_on_disk_mb = size_on_disk_mb;
    }

    // == Expiry ==
    /// Checks the record against its current life time at `now_ms`.
    ///
    /// Boundary condition: the record is still fresh while exactly
    /// `life_time_ms` has elapsed and expires strictly after it.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        match self.life_time_ms {
            None => false,
            Some(0) => true,
            Some(life) => {
                let life = i64::try_from(life).unwrap_or(i64::MAX);
                now_ms.saturating_sub(self.persisted_at_ms) > life
            }
        }
    }

    /// Checks the record against its current life time right now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Absolute expiry time, defined only for a positive life time.
    pub fn expires_at_ms(&self) -> Option<i64> {
        match self.life_time_ms {
            None | Some(0) => None,
            Some(life) => Some(
                self.persisted_at_ms
                    .saturating_add(i64::try_from(life).unwrap_or(i64::MAX)),
            ),
        }
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}
