#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use koostebotti::components::announcer::{ChatTransport, DeliveryHandle, MessageFormatter};
use koostebotti::components::calendar::{calcode, local_id, CalendarAdapter, Event};
use koostebotti::error::{adapter_error, transport_error, BotResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

/// Build a normalized event in a calendar's namespace
pub fn event(cal: &str, native_id: &str, summary: &str, start: i64, end: i64) -> Event {
    Event {
        id: native_id.to_string(),
        local_id: local_id(cal, native_id),
        summary: summary.to_string(),
        description: String::new(),
        location: String::new(),
        start: ts(start),
        end: ts(end),
        updated: ts(0),
    }
}

#[derive(Default)]
struct ControlState {
    pending: Option<Vec<Event>>,
    fail_next: bool,
}

/// Handle for steering a mock backend from a test after the adapter has
/// been boxed into the aggregator
#[derive(Clone, Default)]
pub struct BackendControl(Arc<Mutex<ControlState>>);

impl BackendControl {
    /// Stage a full replacement event set for the next poll
    pub fn stage(&self, events: Vec<Event>) {
        self.0.lock().unwrap().pending = Some(events);
    }

    /// Make the next poll fail without touching the live events
    pub fn fail_next(&self) {
        self.0.lock().unwrap().fail_next = true;
    }
}

/// In-memory calendar backend for tests
pub struct MockAdapter {
    identity: String,
    events: HashMap<String, Event>,
    control: BackendControl,
}

/// Create a mock backend; returns the adapter, its control handle and the
/// calcode the aggregator will assign it
pub fn mock_calendar(identity: &str) -> (MockAdapter, BackendControl, String) {
    let control = BackendControl::default();
    let adapter = MockAdapter {
        identity: identity.to_string(),
        events: HashMap::new(),
        control: control.clone(),
    };
    let code = calcode(identity);
    (adapter, control, code)
}

#[async_trait]
impl CalendarAdapter for MockAdapter {
    fn backend_identity(&self) -> &str {
        &self.identity
    }

    async fn poll(&mut self) -> BotResult<bool> {
        let mut state = self.control.0.lock().unwrap();
        if state.fail_next {
            state.fail_next = false;
            return Err(adapter_error("backend unavailable"));
        }
        match state.pending.take() {
            Some(events) => {
                self.events = events
                    .into_iter()
                    .map(|e| (e.local_id.clone(), e))
                    .collect();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn events(&self) -> &HashMap<String, Event> {
        &self.events
    }
}

/// One recorded transport interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Send {
        destination: String,
        text: String,
    },
    Photo {
        destination: String,
        image: String,
        caption: String,
    },
    Edit {
        destination: String,
        message_id: i64,
        text: String,
    },
    Reply {
        destination: String,
        reply_to: i64,
        text: String,
    },
}

/// Recording chat transport with switchable failure mode
#[derive(Default)]
pub struct MockTransport {
    calls: Mutex<Vec<Call>>,
    next_id: AtomicI64,
    failing: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicI64::new(1),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn record(&self, call: Call) -> BotResult<DeliveryHandle> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(transport_error("transport down"));
        }
        self.calls.lock().unwrap().push(call);
        Ok(DeliveryHandle {
            message_id: self.next_id.fetch_add(1, Ordering::SeqCst),
        })
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn send_message(&self, destination: &str, text: &str) -> BotResult<DeliveryHandle> {
        self.record(Call::Send {
            destination: destination.to_string(),
            text: text.to_string(),
        })
    }

    async fn send_photo(
        &self,
        destination: &str,
        image: &str,
        caption: &str,
    ) -> BotResult<DeliveryHandle> {
        self.record(Call::Photo {
            destination: destination.to_string(),
            image: image.to_string(),
            caption: caption.to_string(),
        })
    }

    async fn edit_message(
        &self,
        destination: &str,
        handle: &DeliveryHandle,
        text: &str,
    ) -> BotResult<()> {
        self.record(Call::Edit {
            destination: destination.to_string(),
            message_id: handle.message_id,
            text: text.to_string(),
        })
        .map(|_| ())
    }

    async fn send_reply(
        &self,
        destination: &str,
        reply_to: &DeliveryHandle,
        text: &str,
    ) -> BotResult<DeliveryHandle> {
        self.record(Call::Reply {
            destination: destination.to_string(),
            reply_to: reply_to.message_id,
            text: text.to_string(),
        })
    }
}

/// HTML-markup formatter standing in for the host application's renderer
pub struct HtmlFormatter;

impl MessageFormatter for HtmlFormatter {
    fn event_line(&self, event: &Event) -> String {
        format!(
            "{} ({})",
            event.summary,
            self.time_range(event.start, event.end)
        )
    }

    fn strike(&self, text: &str) -> String {
        format!("<s>{}</s>", text)
    }

    fn bold(&self, text: &str) -> String {
        format!("<b>{}</b>", text)
    }

    fn time_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> String {
        format!("{} – {}", self.time(start), self.time(end))
    }

    fn time(&self, instant: DateTime<Utc>) -> String {
        instant.format("%Y-%m-%d %H:%M").to_string()
    }

    fn backlink(&self, destination: &str, handle: &DeliveryHandle, label: &str) -> String {
        format!(
            "<a href=\"https://chat.example/{}/{}\">{}</a>",
            destination, handle.message_id, label
        )
    }
}
