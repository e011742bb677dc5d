use crate::error::BotResult;
use chrono::Weekday;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Default maximum number of events rendered into one digest
pub const DEFAULT_MAX_EVENTS: usize = 10;

/// Default look-ahead window in days
pub const DEFAULT_LOOKAHEAD_DAYS: i64 = 7;

/// Raw per-destination values as the configuration collaborator stores them
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDestinationConfig {
    /// Calcode selection, whitespace or comma separated; empty or "*" selects
    /// every calendar
    #[serde(default)]
    pub calendars: String,
    /// IANA timezone name
    #[serde(default)]
    pub timezone: String,
    #[serde(default)]
    pub max_events: Option<usize>,
    #[serde(default)]
    pub lookahead_days: Option<i64>,
    /// Announcement hour 0-23; unset leaves the destination unarmed
    #[serde(default)]
    pub hour: Option<u32>,
    /// Bit i set = weekday i disabled, Monday=0 .. Saturday=5, Sunday=6
    #[serde(default)]
    pub disabled_days: u8,
    /// Line-delimited rotating preamble list
    #[serde(default)]
    pub preamble: String,
}

/// Validated per-destination configuration
#[derive(Debug, Clone)]
pub struct DestinationConfig {
    pub destination: String,
    /// None selects every calendar
    pub calcodes: Option<HashSet<String>>,
    pub timezone: Option<Tz>,
    pub max_events: usize,
    pub lookahead_days: i64,
    pub hour: Option<u32>,
    pub disabled_days: u8,
    pub preamble: String,
}

impl DestinationConfig {
    /// Validate raw values at the read boundary. An invalid timezone or an
    /// out-of-range hour is dropped with a warning, leaving the destination
    /// unarmed rather than erroring.
    pub fn from_raw(destination: &str, raw: &RawDestinationConfig) -> Self {
        let timezone = match raw.timezone.trim() {
            "" => None,
            name => match name.parse::<Tz>() {
                Ok(tz) => Some(tz),
                Err(_) => {
                    warn!("Unknown timezone {:?} for destination {}", name, destination);
                    None
                }
            },
        };

        let hour = match raw.hour {
            Some(h) if h > 23 => {
                warn!("Announcement hour {} out of range for destination {}", h, destination);
                None
            }
            other => other,
        };

        let selection: HashSet<String> = raw
            .calendars
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();
        let calcodes = if selection.is_empty() || selection.contains("*") {
            None
        } else {
            Some(selection)
        };

        Self {
            destination: destination.to_string(),
            calcodes,
            timezone,
            max_events: raw.max_events.unwrap_or(DEFAULT_MAX_EVENTS),
            lookahead_days: raw.lookahead_days.unwrap_or(DEFAULT_LOOKAHEAD_DAYS),
            hour,
            disabled_days: raw.disabled_days,
            preamble: raw.preamble.clone(),
        }
    }

    /// Whether scheduled announcements can fire for this destination
    pub fn armed(&self) -> bool {
        self.timezone.is_some() && self.hour.is_some()
    }

    /// Check the disabled-day bitmask for a weekday
    pub fn day_disabled(&self, weekday: Weekday) -> bool {
        self.disabled_days & (1u8 << weekday.num_days_from_monday()) != 0
    }
}

/// Load destination configurations from a TOML table keyed by destination id
pub fn load_destinations(content: &str) -> BotResult<Vec<DestinationConfig>> {
    let raw: HashMap<String, RawDestinationConfig> = toml::from_str(content)?;
    let mut configs: Vec<DestinationConfig> = raw
        .iter()
        .map(|(destination, values)| DestinationConfig::from_raw(destination, values))
        .collect();
    configs.sort_by(|a, b| a.destination.cmp(&b.destination));
    Ok(configs)
}
