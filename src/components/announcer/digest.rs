use super::transport::MessageFormatter;
use crate::components::calendar::{Event, EventSource};
use crate::config::DestinationConfig;
use crate::utils::time::epoch_day;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Rendered digest for one destination's window
#[derive(Debug, Clone)]
pub struct Digest {
    pub text: String,
    /// Deep-copied window snapshot keyed by local id; live events mutate in
    /// place, so the copy is captured here and nowhere aliases them
    pub events: HashMap<String, Event>,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
}

/// Render the destination's upcoming window into digest text plus the
/// snapshot the next evaluation will diff against
pub fn compose_digest(
    source: &dyn EventSource,
    config: &DestinationConfig,
    window_start: DateTime<Utc>,
    formatter: &dyn MessageFormatter,
) -> Digest {
    let window_end = window_start + Duration::days(config.lookahead_days);
    let events: Vec<Event> = source
        .overlapping(window_start, window_end)
        .take(config.max_events)
        .cloned()
        .collect();

    let mut text = opener(&config.preamble, window_start, events.len());
    for event in &events {
        text.push('\n');
        text.push_str(&formatter.event_line(event));
    }

    let snapshot = events.into_iter().map(|e| (e.local_id.clone(), e)).collect();
    Digest {
        text,
        events: snapshot,
        window_start,
        window_end,
    }
}

fn count_clause(count: usize) -> &'static str {
    match count {
        0 => "No upcoming events!",
        1 => "There's an event coming up:",
        2 => "There are a couple events coming up:",
        3 => "There are a few events coming up:",
        _ => "There are a bunch of events coming up:",
    }
}

/// Pick today's line from the rotating preamble list
fn select_preamble(preamble: &str, window_start: DateTime<Utc>) -> Option<&str> {
    let lines: Vec<&str> = preamble
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        return None;
    }
    let index = epoch_day(window_start).rem_euclid(lines.len() as i64) as usize;
    Some(lines[index])
}

fn mentions_events(text: &str) -> bool {
    text.to_lowercase().contains("event")
}

fn lowercase_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn opener(preamble_text: &str, window_start: DateTime<Utc>, count: usize) -> String {
    let clause = count_clause(count);
    let Some(preamble) = select_preamble(preamble_text, window_start) else {
        return clause.to_string();
    };

    // A preamble that already labels an event list heads it by itself
    if preamble.ends_with(':') && mentions_events(preamble) {
        return preamble.to_string();
    }

    let framing = if mentions_events(preamble) {
        "Speaking of which,"
    } else {
        "Also,"
    };
    let clause = lowercase_first(clause);
    if preamble.ends_with(['.', '!', '?', '…', ':']) {
        format!("{} {} {}", preamble, framing, clause)
    } else {
        format!("{}. {} {}", preamble, framing, clause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(n: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(n * 86_400, 0).unwrap()
    }

    #[test]
    fn opener_counts_events() {
        assert_eq!(opener("", day(0), 0), "No upcoming events!");
        assert_eq!(opener("", day(0), 1), "There's an event coming up:");
        assert_eq!(opener("", day(0), 2), "There are a couple events coming up:");
        assert_eq!(opener("", day(0), 3), "There are a few events coming up:");
        assert_eq!(
            opener("", day(0), 7),
            "There are a bunch of events coming up:"
        );
    }

    #[test]
    fn label_preamble_stands_alone() {
        assert_eq!(
            opener("This week's events:", day(0), 2),
            "This week's events:"
        );
    }

    #[test]
    fn event_mentioning_preamble_gets_speaking_of_which() {
        assert_eq!(
            opener("What an eventful week!", day(0), 1),
            "What an eventful week! Speaking of which, there's an event coming up:"
        );
    }

    #[test]
    fn plain_preamble_gets_also_framing_and_a_period() {
        assert_eq!(
            opener("Good morning", day(0), 2),
            "Good morning. Also, there are a couple events coming up:"
        );
    }

    #[test]
    fn preamble_rotates_by_window_day() {
        let list = "First line.\nSecond line.\nThird line.";
        assert_eq!(select_preamble(list, day(0)), Some("First line."));
        assert_eq!(select_preamble(list, day(1)), Some("Second line."));
        assert_eq!(select_preamble(list, day(3)), Some("First line."));
        // same day, same line
        assert_eq!(
            select_preamble(list, day(1) + Duration::hours(13)),
            Some("Second line.")
        );
    }

    #[test]
    fn blank_preamble_lines_are_skipped() {
        assert_eq!(select_preamble("\n\n  \n", day(0)), None);
        assert_eq!(select_preamble("Only line.\n\n", day(5)), Some("Only line."));
    }
}
