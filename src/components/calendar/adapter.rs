use super::models::Event;
use crate::error::BotResult;
use async_trait::async_trait;
use std::collections::HashMap;

/// Backend-specific sync component normalizing a third-party calendar into
/// the event model. Sync protocols and authentication live behind this trait.
#[async_trait]
pub trait CalendarAdapter: Send + Sync {
    /// Backend identity string; hashed into this calendar's calcode
    fn backend_identity(&self) -> &str;

    /// Refresh the live event set from the backend. Returns true when any
    /// event was added, removed or updated. On error the live set must be
    /// left as it was, never half-updated.
    async fn poll(&mut self) -> BotResult<bool>;

    /// Live events keyed by local id, replaced wholesale per poll
    fn events(&self) -> &HashMap<String, Event>;
}
