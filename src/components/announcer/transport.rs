use crate::components::calendar::Event;
use crate::error::BotResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reference to a delivered message, opaque to the core beyond equality
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryHandle {
    pub message_id: i64,
}

/// Chat transport surface. Formatting markup, rate limits and the wire
/// protocol live behind this trait; calls are fire-and-forget from the
/// announcer's point of view.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_message(&self, destination: &str, text: &str) -> BotResult<DeliveryHandle>;

    /// Send an image with a caption, used when an icon trigger fires
    async fn send_photo(
        &self,
        destination: &str,
        image: &str,
        caption: &str,
    ) -> BotResult<DeliveryHandle>;

    /// Edit a previously delivered message in place
    async fn edit_message(
        &self,
        destination: &str,
        handle: &DeliveryHandle,
        text: &str,
    ) -> BotResult<()>;

    /// Send a message as a reply referencing an earlier delivery
    async fn send_reply(
        &self,
        destination: &str,
        reply_to: &DeliveryHandle,
        text: &str,
    ) -> BotResult<DeliveryHandle>;
}

/// Low-level text rendering delegated outward: event lines, emphasis markup
/// and timezone-aware human time strings are the host application's concern.
pub trait MessageFormatter: Send + Sync {
    /// One digest line for an event
    fn event_line(&self, event: &Event) -> String;

    /// Strikethrough markup for removed/old text
    fn strike(&self, text: &str) -> String;

    /// Bold markup for new text
    fn bold(&self, text: &str) -> String;

    /// Human rendering of a start/end range
    fn time_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> String;

    /// Human rendering of one instant
    fn time(&self, instant: DateTime<Utc>) -> String;

    /// Link a label to a delivered message, for the "Updated" suffix
    fn backlink(&self, destination: &str, handle: &DeliveryHandle, label: &str) -> String;
}

/// Icon/banner selection for new digests, decided outside the core
pub trait IconSource: Send + Sync {
    /// Image to attach to a fresh digest, if a trigger fires for the window
    fn icon_for(&self, destination: &str, window_start: DateTime<Utc>) -> Option<String>;
}
