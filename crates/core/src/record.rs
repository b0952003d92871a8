//! Record type managed by the buffered store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// A keyed row in a buffered store.
///
/// `inserted_at` is fixed at creation; `updated_at` is bumped on every
/// mutation. A `put` over an existing key keeps the record's `id` and
/// `inserted_at` and replaces its data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unique identifier, stable across updates to the same key.
    pub id: Uuid,
    /// The store key this record lives under.
    pub key: String,
    /// Opaque payload. Usually an object; stored verbatim either way
    /// so that get-after-put returns exactly what was written.
    pub data: JsonValue,
    /// Opaque metadata.
    pub metadata: JsonValue,
    /// Creation time, never changed after the first insert.
    pub inserted_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl Record {
    /// Create a fresh record for `key`.
    pub fn new(key: impl Into<String>, data: JsonValue) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            key: key.into(),
            data,
            metadata: JsonValue::Object(Default::default()),
            inserted_at: now,
            updated_at: now,
        }
    }

    /// Produce the updated form of this record with new data.
    ///
    /// Keeps `id` and `inserted_at`, bumps `updated_at`.
    pub fn updated(&self, data: JsonValue) -> Self {
        Self {
            id: self.id,
            key: self.key.clone(),
            data,
            metadata: self.metadata.clone(),
            inserted_at: self.inserted_at,
            updated_at: Utc::now(),
        }
    }

    /// Look up a top-level field of `data`.
    ///
    /// Returns `None` when `data` is not an object or the field is
    /// absent.
    pub fn field(&self, name: &str) -> Option<&JsonValue> {
        self.data.as_object().and_then(|map| map.get(name))
    }
}
