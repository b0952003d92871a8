//! Event types for the append-only log.
//!
//! An [`Event`] is immutable once appended. Two sequence numbers are
//! assigned at append time and never change:
//!
//! - `event_number`: 1-based position within the event's stream,
//!   strictly increasing with no gaps
//! - `global_position`: 1-based position across the whole log
//!   instance, strictly increasing, unique, and gapless across all
//!   streams
//!
//! Callers never construct an [`Event`] directly; they submit an
//! [`AppendEvent`] and the log fills in identity, numbering, and the
//! commit timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// An immutable entry in the event log.
///
/// ## Invariants
///
/// - Never mutated after append
/// - `event_number` is gapless and strictly increasing within
///   `stream_id`
/// - `global_position` is gapless, unique, and strictly increasing
///   across all streams in one log instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier for this event.
    pub id: Uuid,
    /// The stream this event belongs to.
    pub stream_id: String,
    /// 1-based sequence number within the stream.
    pub event_number: u64,
    /// 1-based sequence number across the entire log instance.
    pub global_position: u64,
    /// Application-defined event type tag.
    pub event_type: String,
    /// Opaque event payload.
    pub data: JsonValue,
    /// Opaque event metadata.
    pub metadata: JsonValue,
    /// Id of the event that caused this one, if any.
    pub causation_id: Option<Uuid>,
    /// Id correlating this event with a wider workflow, if any.
    pub correlation_id: Option<Uuid>,
    /// Commit timestamp assigned by the log.
    pub timestamp: DateTime<Utc>,
}

/// Input form of an event, submitted to `append`.
///
/// The log assigns `id`, `event_number`, `global_position`, and
/// `timestamp` at commit time.
///
/// # Example
///
/// ```
/// use ledger_core::AppendEvent;
/// use serde_json::json;
///
/// let event = AppendEvent::new("agent_started", json!({"agent": "planner"}))
///     .with_metadata(json!({"source": "scheduler"}));
/// assert_eq!(event.event_type, "agent_started");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppendEvent {
    /// Application-defined event type tag.
    pub event_type: String,
    /// Opaque event payload.
    pub data: JsonValue,
    /// Opaque event metadata. Defaults to an empty object.
    pub metadata: JsonValue,
    /// Id of the event that caused this one, if any.
    pub causation_id: Option<Uuid>,
    /// Id correlating this event with a wider workflow, if any.
    pub correlation_id: Option<Uuid>,
}

impl AppendEvent {
    /// Create a new append request with the given type and payload.
    pub fn new(event_type: impl Into<String>, data: JsonValue) -> Self {
        Self {
            event_type: event_type.into(),
            data,
            metadata: JsonValue::Object(Default::default()),
            causation_id: None,
            correlation_id: None,
        }
    }

    /// Attach metadata.
    pub fn with_metadata(mut self, metadata: JsonValue) -> Self {
        self.metadata = metadata;
        self
    }

    /// Attach a causation id.
    pub fn with_causation_id(mut self, id: Uuid) -> Self {
        self.causation_id = Some(id);
        self
    }

    /// Attach a correlation id.
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = Some(id);
        self
    }

    /// Materialize this request into a committed [`Event`].
    ///
    /// Called by the log inside its commit path, after numbering has
    /// been decided under the writer lock.
    pub fn into_event(
        self,
        stream_id: impl Into<String>,
        event_number: u64,
        global_position: u64,
        timestamp: DateTime<Utc>,
    ) -> Event {
        Event {
            id: Uuid::new_v4(),
            stream_id: stream_id.into(),
            event_number,
            global_position,
            event_type: self.event_type,
            data: self.data,
            metadata: self.metadata,
            causation_id: self.causation_id,
            correlation_id: self.correlation_id,
            timestamp,
        }
    }
}
