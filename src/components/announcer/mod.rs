pub mod diff;
pub mod digest;
pub mod records;
pub mod scheduler;
pub mod transport;

pub use records::{AnnouncementRecord, AnnouncementStore, Purpose};
pub use transport::{ChatTransport, DeliveryHandle, IconSource, MessageFormatter};

use crate::components::calendar::{CalendarAggregator, Event};
use crate::config::DestinationConfig;
use crate::utils::time::{hour_index, local_hour_weekday, quantize_period};
use chrono::{DateTime, Utc};
use diff::{diff_snapshots, render_changes, EventChange};
use digest::{compose_digest, Digest};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Drives the per-destination announcement lifecycle: fresh digests at the
/// configured hour, incremental updates to already-posted ones in between.
/// Owns the aggregator and the persisted announcement records.
pub struct Announcer {
    aggregator: CalendarAggregator,
    destinations: Vec<DestinationConfig>,
    store: AnnouncementStore,
    transport: Arc<dyn ChatTransport>,
    formatter: Arc<dyn MessageFormatter>,
    icons: Option<Arc<dyn IconSource>>,
}

impl Announcer {
    pub fn new(
        aggregator: CalendarAggregator,
        transport: Arc<dyn ChatTransport>,
        formatter: Arc<dyn MessageFormatter>,
    ) -> Self {
        Self {
            aggregator,
            destinations: Vec::new(),
            store: AnnouncementStore::new(),
            transport,
            formatter,
            icons: None,
        }
    }

    pub fn with_icons(mut self, icons: Arc<dyn IconSource>) -> Self {
        self.icons = Some(icons);
        self
    }

    /// Replace the evaluated destination set
    pub fn set_destinations(&mut self, destinations: Vec<DestinationConfig>) {
        self.destinations = destinations;
    }

    pub fn aggregator(&self) -> &CalendarAggregator {
        &self.aggregator
    }

    pub fn aggregator_mut(&mut self) -> &mut CalendarAggregator {
        &mut self.aggregator
    }

    pub fn store(&self) -> &AnnouncementStore {
        &self.store
    }

    /// Restore previously persisted announcement records
    pub fn restore_store(&mut self, store: AnnouncementStore) {
        self.store = store;
    }

    /// Scheduler entry point: poll every calendar, then evaluate each
    /// destination in turn. One destination's failure never blocks the rest.
    pub async fn run_tick(&mut self, now: DateTime<Utc>) {
        self.aggregator.poll().await;
        let destinations = self.destinations.clone();
        for config in &destinations {
            self.evaluate_digest(config, now).await;
        }
    }

    /// One period-quantized evaluation for one destination
    async fn evaluate_digest(&mut self, config: &DestinationConfig, now: DateTime<Utc>) {
        // Missing timezone or hour leaves the destination unarmed, silently
        let (Some(tz), Some(hour)) = (config.timezone, config.hour) else {
            return;
        };
        let period = quantize_period(now);
        let Some((local_hour, weekday)) = local_hour_weekday(period, tz) else {
            return;
        };

        let prior_eventtime = self
            .store
            .get(&config.destination, Purpose::Digest)
            .map(|r| r.eventtime);
        // The hour-index guard blocks double-firing within one hour while
        // still re-arming on a later day
        let send_new = local_hour == hour
            && !config.day_disabled(weekday)
            && prior_eventtime.map_or(true, |t| hour_index(period) > hour_index(t));

        if send_new {
            self.send_new_digest(config, period).await;
        } else if prior_eventtime.is_some() {
            self.update_digest(config, period).await;
        } else {
            debug!("Nothing to announce for {}", config.destination);
        }
    }

    fn compose_for(&self, config: &DestinationConfig, window_start: DateTime<Utc>) -> Digest {
        match &config.calcodes {
            Some(codes) => {
                let view = self.aggregator.view(codes.clone());
                compose_digest(&view, config, window_start, self.formatter.as_ref())
            }
            None => compose_digest(&self.aggregator, config, window_start, self.formatter.as_ref()),
        }
    }

    fn diff_for(
        &self,
        config: &DestinationConfig,
        last: &HashMap<String, Event>,
        current: &HashMap<String, Event>,
        now: DateTime<Utc>,
    ) -> Vec<EventChange> {
        match &config.calcodes {
            Some(codes) => {
                let view = self.aggregator.view(codes.clone());
                diff_snapshots(last, current, &view, now)
            }
            None => diff_snapshots(last, current, &self.aggregator, now),
        }
    }

    /// Fresh digest: deliver, then persist the record. A failed delivery
    /// leaves no record, so the next tick retries naturally.
    async fn send_new_digest(&mut self, config: &DestinationConfig, period: i64) {
        let Some(window_start) = DateTime::from_timestamp(period, 0) else {
            return;
        };
        let digest = self.compose_for(config, window_start);

        let icon = self
            .icons
            .as_ref()
            .and_then(|icons| icons.icon_for(&config.destination, window_start));
        let delivered = match icon {
            Some(image) => {
                self.transport
                    .send_photo(&config.destination, &image, &digest.text)
                    .await
            }
            None => {
                self.transport
                    .send_message(&config.destination, &digest.text)
                    .await
            }
        };

        match delivered {
            Ok(handle) => {
                info!(
                    "Announced digest to {} with {} events",
                    config.destination,
                    digest.events.len()
                );
                self.store.insert(
                    &config.destination,
                    Purpose::Digest,
                    AnnouncementRecord {
                        eventtime: period,
                        last_events: digest.events,
                        last_delivery: handle,
                        last_rendered_text: digest.text,
                        last_suffix: String::new(),
                    },
                );
            }
            Err(e) => error!("Failed to send digest to {}: {}", config.destination, e),
        }
    }

    /// Update evaluation: reply with the diff against the stored snapshot,
    /// and independently edit the primary message when its rendered text or
    /// suffix drifted. The diff compares against the stored snapshot while
    /// the edit always uses live data, so a diff may lag one poll behind a
    /// pure text change.
    async fn update_digest(&mut self, config: &DestinationConfig, period: i64) {
        let Some(window_start) = DateTime::from_timestamp(period, 0) else {
            return;
        };
        let Some(record) = self.store.get(&config.destination, Purpose::Digest).cloned() else {
            return;
        };
        let digest = self.compose_for(config, window_start);

        let mut suffix = record.last_suffix.clone();
        let changes = self.diff_for(config, &record.last_events, &digest.events, window_start);
        if !changes.is_empty() {
            let reply_text = render_changes(&changes, self.formatter.as_ref());
            match self
                .transport
                .send_reply(&config.destination, &record.last_delivery, &reply_text)
                .await
            {
                Ok(reply_handle) => {
                    info!(
                        "Posted {} change(s) for {}",
                        changes.len(),
                        config.destination
                    );
                    let label = format!("Updated {}", self.formatter.time(window_start));
                    suffix = self
                        .formatter
                        .backlink(&config.destination, &reply_handle, &label);
                    // The snapshot commits only after the reply went out
                    if let Some(stored) =
                        self.store.get_mut(&config.destination, Purpose::Digest)
                    {
                        stored.last_events = digest.events.clone();
                    }
                }
                Err(e) => {
                    error!("Failed to reply to {}: {}", config.destination, e);
                }
            }
        }

        if digest.text != record.last_rendered_text || suffix != record.last_suffix {
            let full_text = if suffix.is_empty() {
                digest.text.clone()
            } else {
                format!("{}\n\n{}", digest.text, suffix)
            };
            match self
                .transport
                .edit_message(&config.destination, &record.last_delivery, &full_text)
                .await
            {
                Ok(()) => {
                    if let Some(stored) =
                        self.store.get_mut(&config.destination, Purpose::Digest)
                    {
                        stored.last_rendered_text = digest.text;
                        stored.last_suffix = suffix;
                    }
                }
                Err(e) => {
                    error!("Failed to edit digest in {}: {}", config.destination, e);
                }
            }
        }
    }

    /// Alert announcements: post when an alert first appears, edit while its
    /// text changes, drop the record once alerts clear. Alert fetching
    /// itself lives outside the core.
    pub async fn evaluate_alerts(
        &mut self,
        destination: &str,
        alert_text: Option<&str>,
        now: DateTime<Utc>,
    ) {
        let record = self.store.get(destination, Purpose::Alerts).cloned();
        match (alert_text, record) {
            (Some(text), None) => match self.transport.send_message(destination, text).await {
                Ok(handle) => {
                    info!("Posted alert to {}", destination);
                    self.store.insert(
                        destination,
                        Purpose::Alerts,
                        AnnouncementRecord {
                            eventtime: quantize_period(now),
                            last_events: HashMap::new(),
                            last_delivery: handle,
                            last_rendered_text: text.to_string(),
                            last_suffix: String::new(),
                        },
                    );
                }
                Err(e) => error!("Failed to post alert to {}: {}", destination, e),
            },
            (Some(text), Some(record)) if record.last_rendered_text != text => {
                match self
                    .transport
                    .edit_message(destination, &record.last_delivery, text)
                    .await
                {
                    Ok(()) => {
                        if let Some(stored) = self.store.get_mut(destination, Purpose::Alerts) {
                            stored.last_rendered_text = text.to_string();
                        }
                    }
                    Err(e) => error!("Failed to edit alert in {}: {}", destination, e),
                }
            }
            (Some(_), Some(_)) => {}
            (None, Some(_)) => {
                info!("Alerts cleared for {}", destination);
                self.store.remove(destination, Purpose::Alerts);
            }
            (None, None) => {}
        }
    }
}
