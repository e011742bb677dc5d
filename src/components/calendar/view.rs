use super::aggregator::CalendarAggregator;
use super::models::Event;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Neighbourhood of one event in the ordered sequence. Boundary positions
/// leave prev/next unset; an unknown id leaves all three unset.
#[derive(Debug, Clone, Default)]
pub struct Neighbours {
    pub prev: Option<Event>,
    pub current: Option<Event>,
    pub next: Option<Event>,
}

/// Read-side query surface shared by the aggregator and its filtered views.
/// Indices always refer to positions in the aggregator's ordered sequence.
pub trait EventSource: Send + Sync {
    /// Index of the first event that has not ended yet, if any
    fn current_index(&self, now: DateTime<Utc>) -> Option<usize>;

    /// Local id of the current event, if any
    fn current_local_id(&self, now: DateTime<Utc>) -> Option<String>;

    /// Look up an event and its sequence neighbours; defaults to the current
    /// event when no id is given
    fn get_event(&self, local_id: Option<&str>, now: DateTime<Utc>) -> Neighbours;

    /// Lazily yield events overlapping the window, front-scanned with an
    /// early exit once starts pass the window end
    fn overlapping(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Box<dyn Iterator<Item = &Event> + '_>;
}

/// Read-only projection of the aggregator over a calendar subset. Never
/// copies the parent's data; skip-scans its ordered sequence instead.
pub struct FilteredView<'a> {
    parent: &'a CalendarAggregator,
    calcodes: HashSet<String>,
}

impl<'a> FilteredView<'a> {
    pub(super) fn new(parent: &'a CalendarAggregator, calcodes: HashSet<String>) -> Self {
        Self { parent, calcodes }
    }

    fn matches(&self, event: &Event) -> bool {
        self.calcodes.contains(event.calcode())
    }
}

impl EventSource for FilteredView<'_> {
    fn current_index(&self, now: DateTime<Utc>) -> Option<usize> {
        let start = self.parent.current_index(now)?;
        self.parent.ordered()[start..]
            .iter()
            .enumerate()
            .find(|(_, event)| self.matches(event) && event.end >= now)
            .map(|(offset, _)| start + offset)
    }

    fn current_local_id(&self, now: DateTime<Utc>) -> Option<String> {
        self.current_index(now)
            .map(|i| self.parent.ordered()[i].local_id.clone())
    }

    fn get_event(&self, local_id: Option<&str>, now: DateTime<Utc>) -> Neighbours {
        let ordered = self.parent.ordered();
        let index = match local_id {
            // An id outside the selected calendars counts as unknown
            Some(id) => match self.parent.index_of(id) {
                Some(i) if self.matches(&ordered[i]) => Some(i),
                _ => None,
            },
            None => self.current_index(now),
        };
        let Some(i) = index else {
            return Neighbours::default();
        };
        Neighbours {
            prev: ordered[..i].iter().rev().find(|e| self.matches(e)).cloned(),
            current: Some(ordered[i].clone()),
            next: ordered[i + 1..].iter().find(|e| self.matches(e)).cloned(),
        }
    }

    fn overlapping(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Box<dyn Iterator<Item = &Event> + '_> {
        Box::new(
            self.parent
                .overlapping(start, end)
                .filter(move |event| self.matches(event)),
        )
    }
}
