use super::transport::MessageFormatter;
use crate::components::calendar::{Event, EventSource};
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};

lazy_static! {
    static ref URL_PATTERN: Regex = Regex::new(r"https?://\S+").unwrap();
}

/// One event's difference between two evaluations of the same window
#[derive(Debug, Clone, PartialEq)]
pub enum EventChange {
    Added(Event),
    Removed(Event),
    Modified { event: Event, fields: Vec<FieldChange> },
}

/// Field-level difference on one event
#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange {
    Summary { old: String, new: String },
    Time(TimeChange),
    Location { old: String, new: String },
    Description { old: String, new: String },
}

/// Classified start/end change with both ranges kept for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct TimeChange {
    pub kind: TimeChangeKind,
    pub last: (DateTime<Utc>, DateTime<Utc>),
    pub current: (DateTime<Utc>, DateTime<Utc>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeChangeKind {
    /// Start, end and duration all changed
    Replaced,
    /// Earlier start, same duration
    MovedEarlier,
    /// Later start, same duration
    MovedLater,
    /// Earlier start, same end
    StartsEarlier,
    /// Later start, same end
    StartsLater,
    Shortened,
    Extended,
}

/// Classify a time-range change. The precedence is load-bearing:
/// duration-preserving shifts collapse into one "moved" statement instead of
/// two independent endpoint facts.
pub fn classify_time_change(
    last_start: DateTime<Utc>,
    last_end: DateTime<Utc>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Option<TimeChangeKind> {
    let duration_same = end - start == last_end - last_start;
    if start != last_start && end != last_end && !duration_same {
        Some(TimeChangeKind::Replaced)
    } else if start < last_start {
        Some(if duration_same {
            TimeChangeKind::MovedEarlier
        } else {
            TimeChangeKind::StartsEarlier
        })
    } else if start > last_start {
        Some(if duration_same {
            TimeChangeKind::MovedLater
        } else {
            TimeChangeKind::StartsLater
        })
    } else if end < last_end {
        Some(TimeChangeKind::Shortened)
    } else if end > last_end {
        Some(TimeChangeKind::Extended)
    } else {
        None
    }
}

/// Minimal-highlight comparison of two text fields. URLs are stripped and
/// whitespace collapsed before comparing, so URL-only edits are invisible by
/// design (notification-noise filtering). Returns None when the normalized
/// texts agree; otherwise a display pair with a long common prefix elided
/// down to a 9-character anchor and either side capped at 40 characters.
pub fn quick_diff(left: &str, right: &str) -> Option<(String, String)> {
    let old = normalize(left);
    let new = normalize(right);
    if old == new {
        return None;
    }
    let prefix = old
        .chars()
        .zip(new.chars())
        .take_while(|(a, b)| a == b)
        .count();
    Some((present(&old, prefix), present(&new, prefix)))
}

fn normalize(text: &str) -> String {
    let stripped = URL_PATTERN.replace_all(text, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn present(text: &str, prefix: usize) -> String {
    if text.is_empty() {
        return "(empty)".to_string();
    }
    let mut shown = if prefix > 10 {
        let tail: String = text.chars().skip(prefix - 9).collect();
        format!("…{}", tail)
    } else {
        text.to_string()
    };
    if shown.chars().count() > 40 {
        shown = shown.chars().take(39).collect();
        shown.push('…');
    }
    shown
}

fn before_comma(text: &str) -> &str {
    text.split(',').next().unwrap_or("")
}

fn compare_fields(last: &Event, live: &Event) -> Vec<FieldChange> {
    let mut fields = Vec::new();
    if let Some((old, new)) = quick_diff(&last.summary, &live.summary) {
        fields.push(FieldChange::Summary { old, new });
    }
    if let Some(kind) = classify_time_change(last.start, last.end, live.start, live.end) {
        fields.push(FieldChange::Time(TimeChange {
            kind,
            last: (last.start, last.end),
            current: (live.start, live.end),
        }));
    }
    if let Some((old, new)) = quick_diff(before_comma(&last.location), before_comma(&live.location)) {
        fields.push(FieldChange::Location { old, new });
    }
    if let Some((old, new)) = quick_diff(&last.description, &live.description) {
        fields.push(FieldChange::Description { old, new });
    }
    fields
}

/// Diff two snapshots of the same window. Events present in both are
/// compared against the live (freshest) version from the aggregate rather
/// than the snapshotted copy; events with no differing field are silently
/// omitted, which is what makes repeated evaluation idempotent.
pub fn diff_snapshots(
    last: &HashMap<String, Event>,
    current: &HashMap<String, Event>,
    live: &dyn EventSource,
    now: DateTime<Utc>,
) -> Vec<EventChange> {
    // Union of both snapshots, current's copy preferred for ordering
    let mut seen: HashSet<&str> = HashSet::new();
    let mut union: Vec<&Event> = Vec::new();
    for event in current.values().chain(last.values()) {
        if seen.insert(event.local_id.as_str()) {
            union.push(event);
        }
    }
    union.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    let mut changes = Vec::new();
    for event in union {
        match live.get_event(Some(&event.local_id), now).current {
            None => changes.push(EventChange::Removed(event.clone())),
            Some(live_event) => {
                let Some(prior) = last.get(&event.local_id) else {
                    changes.push(EventChange::Added(live_event));
                    continue;
                };
                let fields = compare_fields(prior, &live_event);
                if !fields.is_empty() {
                    changes.push(EventChange::Modified {
                        event: live_event,
                        fields,
                    });
                }
            }
        }
    }
    changes
}

/// Render a computed diff into reply text, one bullet per changed event
pub fn render_changes(changes: &[EventChange], formatter: &dyn MessageFormatter) -> String {
    let mut lines = Vec::new();
    for change in changes {
        match change {
            EventChange::Added(event) => {
                lines.push(format!("• Added: {}", formatter.event_line(event)));
            }
            EventChange::Removed(event) => {
                lines.push(format!("• Removed: {}", formatter.strike(&event.summary)));
            }
            EventChange::Modified { event, fields } => {
                let mut parts = Vec::new();
                let mut renamed = false;
                for field in fields {
                    match field {
                        FieldChange::Summary { old, new } => {
                            parts.push(format!(
                                "{} → {}",
                                formatter.strike(old),
                                formatter.bold(new)
                            ));
                            renamed = true;
                        }
                        FieldChange::Time(tc) => parts.push(render_time_change(tc, formatter)),
                        FieldChange::Location { old, new } => parts.push(format!(
                            "location {} → {}",
                            formatter.strike(old),
                            formatter.bold(new)
                        )),
                        FieldChange::Description { old, new } => parts.push(format!(
                            "description {} → {}",
                            formatter.strike(old),
                            formatter.bold(new)
                        )),
                    }
                }
                let body = parts.join("; ");
                if renamed {
                    lines.push(format!("• {}", body));
                } else {
                    lines.push(format!("• {}: {}", event.summary, body));
                }
            }
        }
    }
    lines.join("\n")
}

fn render_time_change(tc: &TimeChange, formatter: &dyn MessageFormatter) -> String {
    let (last_start, last_end) = tc.last;
    let (start, end) = tc.current;
    match tc.kind {
        TimeChangeKind::Replaced => format!(
            "now {} (was {})",
            formatter.time_range(start, end),
            formatter.time_range(last_start, last_end)
        ),
        TimeChangeKind::MovedEarlier => format!("moved up to {}", formatter.time(start)),
        TimeChangeKind::MovedLater => format!("moved back to {}", formatter.time(start)),
        TimeChangeKind::StartsEarlier => format!("starts earlier at {}", formatter.time(start)),
        TimeChangeKind::StartsLater => format!("starts later at {}", formatter.time(start)),
        TimeChangeKind::Shortened => format!("shortened, now ends {}", formatter.time(end)),
        TimeChangeKind::Extended => format!("extended, now ends {}", formatter.time(end)),
    }
}
