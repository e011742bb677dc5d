use chrono::{DateTime, Utc};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Normalized, backend-agnostic calendar event
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Event {
    /// Backend-native identifier
    pub id: String,
    /// Stable cross-poll join key, `calcode:short_hash(id)`
    pub local_id: String,
    pub summary: String,
    pub description: String,
    pub location: String,
    /// Backend data is untrusted; start <= end is not enforced
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Backend freshness watermark
    pub updated: DateTime<Utc>,
}

impl Event {
    /// Ordering and tie-break tuple shared by the aggregator and the diff
    /// engine; the exact order of components is load-bearing.
    pub fn sort_key(&self) -> (DateTime<Utc>, DateTime<Utc>, &str, &str) {
        (self.start, self.end, &self.summary, &self.local_id)
    }

    /// Calcode prefix of this event's local id
    pub fn calcode(&self) -> &str {
        self.local_id.split(':').next().unwrap_or("")
    }
}

/// Short namespace hash for a calendar backend identity, 8 hex digits
pub fn calcode(backend_identity: &str) -> String {
    let mut hasher = DefaultHasher::new();
    backend_identity.hash(&mut hasher);
    format!("{:08x}", hasher.finish() as u32)
}

/// Stable join key for an event within a calendar namespace
pub fn local_id(calcode: &str, native_id: &str) -> String {
    let mut hasher = DefaultHasher::new();
    native_id.hash(&mut hasher);
    format!("{}:{:016x}", calcode, hasher.finish())
}
