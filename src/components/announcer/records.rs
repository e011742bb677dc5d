use super::transport::DeliveryHandle;
use crate::components::calendar::Event;
use crate::error::BotResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What a stored announcement is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    Digest,
    Alerts,
}

impl Purpose {
    fn as_str(self) -> &'static str {
        match self {
            Purpose::Digest => "digest",
            Purpose::Alerts => "alerts",
        }
    }
}

/// Per-destination announcement memory: what was last said, where, and the
/// window snapshot the next evaluation diffs against
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnouncementRecord {
    /// Period-quantized unix time of the last fresh announcement
    pub eventtime: i64,
    /// Deep-copied window snapshot; never aliases live adapter state
    pub last_events: HashMap<String, Event>,
    pub last_delivery: DeliveryHandle,
    pub last_rendered_text: String,
    pub last_suffix: String,
}

/// All announcement records keyed by (destination, purpose). Owned here,
/// serialized by an external persister; digest records are never pruned,
/// alert records are dropped once the alert clears.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnouncementStore {
    records: HashMap<String, AnnouncementRecord>,
}

impl AnnouncementStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(destination: &str, purpose: Purpose) -> String {
        format!("{}/{}", destination, purpose.as_str())
    }

    pub fn get(&self, destination: &str, purpose: Purpose) -> Option<&AnnouncementRecord> {
        self.records.get(&Self::key(destination, purpose))
    }

    pub fn get_mut(
        &mut self,
        destination: &str,
        purpose: Purpose,
    ) -> Option<&mut AnnouncementRecord> {
        self.records.get_mut(&Self::key(destination, purpose))
    }

    pub fn insert(&mut self, destination: &str, purpose: Purpose, record: AnnouncementRecord) {
        self.records.insert(Self::key(destination, purpose), record);
    }

    pub fn remove(&mut self, destination: &str, purpose: Purpose) -> Option<AnnouncementRecord> {
        self.records.remove(&Self::key(destination, purpose))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Serialize for the external persister
    pub fn to_json(&self) -> BotResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Restore from the external persister
    pub fn from_json(content: &str) -> BotResult<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(eventtime: i64) -> AnnouncementRecord {
        AnnouncementRecord {
            eventtime,
            last_events: HashMap::new(),
            last_delivery: DeliveryHandle { message_id: 42 },
            last_rendered_text: "text".to_string(),
            last_suffix: String::new(),
        }
    }

    #[test]
    fn purposes_are_stored_independently() {
        let mut store = AnnouncementStore::new();
        store.insert("general", Purpose::Digest, record(600));
        store.insert("general", Purpose::Alerts, record(1200));
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("general", Purpose::Digest).unwrap().eventtime, 600);
        assert_eq!(store.get("general", Purpose::Alerts).unwrap().eventtime, 1200);
        store.remove("general", Purpose::Alerts);
        assert!(store.get("general", Purpose::Alerts).is_none());
        assert!(store.get("general", Purpose::Digest).is_some());
    }

    #[test]
    fn store_round_trips_through_json() {
        let mut store = AnnouncementStore::new();
        store.insert("general", Purpose::Digest, record(600));
        let restored = AnnouncementStore::from_json(&store.to_json().unwrap()).unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(
            restored.get("general", Purpose::Digest).unwrap().last_delivery,
            DeliveryHandle { message_id: 42 }
        );
    }
}
