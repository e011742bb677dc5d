use super::adapter::CalendarAdapter;
use super::models::{calcode, Event};
use super::view::{EventSource, FilteredView, Neighbours};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

/// One registered backend calendar: the adapter plus its namespace and
/// freshness watermark
pub struct Calendar {
    pub calcode: String,
    adapter: Box<dyn CalendarAdapter>,
    /// Highest `updated` value observed from this backend, monotonic
    pub last_update: DateTime<Utc>,
}

impl Calendar {
    fn new(adapter: Box<dyn CalendarAdapter>) -> Self {
        let calcode = calcode(adapter.backend_identity());
        let mut calendar = Self {
            calcode,
            adapter,
            last_update: DateTime::<Utc>::MIN_UTC,
        };
        calendar.advance_watermark();
        calendar
    }

    /// Live events keyed by local id
    pub fn events(&self) -> &HashMap<String, Event> {
        self.adapter.events()
    }

    /// Poll the backend. A failed poll is transient and counts as no change;
    /// the adapter contract keeps `events` intact in that case.
    async fn poll(&mut self) -> bool {
        match self.adapter.poll().await {
            Ok(changed) => {
                if changed {
                    self.advance_watermark();
                }
                changed
            }
            Err(e) => {
                warn!("Poll failed for calendar {}: {}", self.calcode, e);
                false
            }
        }
    }

    fn advance_watermark(&mut self) {
        if let Some(newest) = self.adapter.events().values().map(|e| e.updated).max() {
            if newest > self.last_update {
                self.last_update = newest;
            }
        }
    }
}

/// Merges every registered calendar into one chronologically ordered
/// sequence with lookup indices. Owned explicitly for the process lifetime
/// and injected where needed; there are no hidden statics.
pub struct CalendarAggregator {
    calendars: HashMap<String, Calendar>,
    /// All events sorted by (start, end, summary, local_id); rebuilt
    /// wholesale on any reported change, never patched
    ordered: Vec<Event>,
    by_local_id: HashMap<String, usize>,
    /// Scan start hint for the current-event cursor; only moves forward for
    /// a fixed event set, so queries never re-scan from the front
    cursor_hint: AtomicUsize,
}

impl Default for CalendarAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl CalendarAggregator {
    pub fn new() -> Self {
        Self {
            calendars: HashMap::new(),
            ordered: Vec::new(),
            by_local_id: HashMap::new(),
            cursor_hint: AtomicUsize::new(0),
        }
    }

    /// Register a backend calendar. Idempotent: a calcode that is already
    /// present keeps its existing calendar and the new adapter is dropped.
    /// Merges the calendar's current events into the aggregate.
    pub fn add(&mut self, adapter: Box<dyn CalendarAdapter>) -> String {
        let code = calcode(adapter.backend_identity());
        if self.calendars.contains_key(&code) {
            return code;
        }
        info!("Registering calendar {}", code);
        self.calendars.insert(code.clone(), Calendar::new(adapter));
        self.rebuild();
        code
    }

    /// Look up a registered calendar by calcode
    pub fn calendar(&self, calcode: &str) -> Option<&Calendar> {
        self.calendars.get(calcode)
    }

    /// All registered calcodes
    pub fn calcodes(&self) -> impl Iterator<Item = &str> {
        self.calendars.keys().map(|s| s.as_str())
    }

    /// Poll every calendar; adapters are independent and polled in
    /// parallel, with the rebuild strictly after all polls complete. A tick
    /// where no backend reports a change leaves the ordered sequence, the
    /// index and the cursor untouched.
    pub async fn poll(&mut self) -> bool {
        let outcomes = join_all(self.calendars.values_mut().map(|c| c.poll())).await;
        let changed = outcomes.into_iter().any(|c| c);
        if changed {
            self.rebuild();
        }
        changed
    }

    fn rebuild(&mut self) {
        let mut ordered: Vec<Event> = self
            .calendars
            .values()
            .flat_map(|c| c.events().values().cloned())
            .collect();
        ordered.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        self.by_local_id = ordered
            .iter()
            .enumerate()
            .map(|(i, e)| (e.local_id.clone(), i))
            .collect();
        self.ordered = ordered;
        self.cursor_hint.store(0, Ordering::Relaxed);
        debug!("Aggregate rebuilt with {} events", self.ordered.len());
    }

    pub(super) fn ordered(&self) -> &[Event] {
        &self.ordered
    }

    pub(super) fn index_of(&self, local_id: &str) -> Option<usize> {
        self.by_local_id.get(local_id).copied()
    }

    /// Scoped read-only projection over a calendar subset
    pub fn view(&self, calcodes: HashSet<String>) -> FilteredView<'_> {
        FilteredView::new(self, calcodes)
    }
}

impl EventSource for CalendarAggregator {
    fn current_index(&self, now: DateTime<Utc>) -> Option<usize> {
        let mut i = self.cursor_hint.load(Ordering::Relaxed);
        while i < self.ordered.len() && self.ordered[i].end < now {
            i += 1;
        }
        // fetch_max keeps the cursor monotonic even under racing readers
        self.cursor_hint.fetch_max(i, Ordering::Relaxed);
        (i < self.ordered.len()).then_some(i)
    }

    fn current_local_id(&self, now: DateTime<Utc>) -> Option<String> {
        self.current_index(now).map(|i| self.ordered[i].local_id.clone())
    }

    fn get_event(&self, local_id: Option<&str>, now: DateTime<Utc>) -> Neighbours {
        let index = match local_id {
            Some(id) => self.index_of(id),
            None => self.current_index(now),
        };
        let Some(i) = index else {
            return Neighbours::default();
        };
        Neighbours {
            prev: (i > 0).then(|| self.ordered[i - 1].clone()),
            current: Some(self.ordered[i].clone()),
            next: self.ordered.get(i + 1).cloned(),
        }
    }

    fn overlapping(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Box<dyn Iterator<Item = &Event> + '_> {
        Box::new(
            self.ordered
                .iter()
                .take_while(move |e| e.start <= end)
                .filter(move |e| e.end >= start),
        )
    }
}
