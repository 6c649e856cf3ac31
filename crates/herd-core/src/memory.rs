use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single remembered value, as stored by every memory backend.
///
/// Entries carry an arbitrary JSON value, an optional metadata map, and an
/// optional absolute expiry time. Backends never return expired entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl MemoryEntry {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            metadata: None,
            created_at: Utc::now(),
            expires_at: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Set the expiry as a duration from now. Sub-second durations round
    /// down; a zero duration expires immediately. A duration too large to
    /// represent as a timestamp means the entry never expires.
    pub fn expires_in(mut self, ttl: std::time::Duration) -> Self {
        self.expires_at = ChronoDuration::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl));
        self
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }

    /// Seconds until expiry, if an expiry is set and still in the future.
    pub fn ttl_secs(&self) -> Option<u64> {
        let at = self.expires_at?;
        let remaining = at - Utc::now();
        (remaining > ChronoDuration::zero()).then(|| remaining.num_seconds().max(1) as u64)
    }
}
