/// In-memory event store
///
/// Per-category, most-recent-first collections of events with bounded
/// retention. All mutations take the write lock; readers copy what they need
/// under the read lock so analytics never hold the store while computing.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};

use crate::config::StoreConfig;
use crate::domain::{DomainError, Event, EventCategory, EventPayload};
use crate::storage::StoreSnapshot;

#[derive(Debug, Default)]
struct StoreState {
    events: HashMap<EventCategory, VecDeque<Event>>,
    /// Snapshot categories this build does not know, kept verbatim
    foreign: BTreeMap<String, Vec<serde_json::Value>>,
}

/// Outcome of merging a snapshot into the store
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RestoreSummary {
    pub restored: usize,
    pub skipped: usize,
    pub foreign_categories: usize,
}

/// A consistent copy of the events visible to one user, taken under a single lock
///
/// Events in each list are ordered oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct EventSlice {
    pub taken_at: DateTime<Utc>,
    pub interactions: Vec<Event>,
    pub completions: Vec<Event>,
    pub goals: Vec<Event>,
    pub ai_usage: Vec<Event>,
}

impl EventSlice {
    /// Build a slice from loose events (handy for tests and replays)
    pub fn from_events(taken_at: DateTime<Utc>, events: impl IntoIterator<Item = Event>) -> Self {
        let mut slice = Self {
            taken_at,
            interactions: Vec::new(),
            completions: Vec::new(),
            goals: Vec::new(),
            ai_usage: Vec::new(),
        };
        for event in events {
            slice.list_mut(event.category).push(event);
        }
        for category in EventCategory::ALL {
            slice.list_mut(category).sort_by_key(|e| e.timestamp);
        }
        slice
    }

    /// Events of one category
    pub fn of(&self, category: EventCategory) -> &[Event] {
        match category {
            EventCategory::Interaction => &self.interactions,
            EventCategory::TaskCompletion => &self.completions,
            EventCategory::GoalProgress => &self.goals,
            EventCategory::AiUsage => &self.ai_usage,
        }
    }

    fn list_mut(&mut self, category: EventCategory) -> &mut Vec<Event> {
        match category {
            EventCategory::Interaction => &mut self.interactions,
            EventCategory::TaskCompletion => &mut self.completions,
            EventCategory::GoalProgress => &mut self.goals,
            EventCategory::AiUsage => &mut self.ai_usage,
        }
    }

    /// Narrow the slice to events at or after `cutoff`
    pub fn since(&self, cutoff: DateTime<Utc>) -> EventSlice {
        let keep = |events: &[Event]| -> Vec<Event> {
            events.iter().filter(|e| e.timestamp >= cutoff).cloned().collect()
        };
        EventSlice {
            taken_at: self.taken_at,
            interactions: keep(&self.interactions),
            completions: keep(&self.completions),
            goals: keep(&self.goals),
            ai_usage: keep(&self.ai_usage),
        }
    }

    pub fn len(&self) -> usize {
        self.interactions.len() + self.completions.len() + self.goals.len() + self.ai_usage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Append-only, per-category event store with retention compaction
#[derive(Debug)]
pub struct EventStore {
    state: RwLock<StoreState>,
    dirty: AtomicBool,
    retention: Duration,
    max_events: usize,
}

impl EventStore {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            dirty: AtomicBool::new(false),
            retention: config.retention(),
            max_events: config.max_events_per_category,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(|poisoned| {
            tracing::warn!("Event store lock poisoned, recovering data");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(|poisoned| {
            tracing::warn!("Event store lock poisoned, recovering data");
            poisoned.into_inner()
        })
    }

    /// Record a new event
    ///
    /// The store assigns id and timestamp, prepends the event to its
    /// category and compacts that category before releasing the lock.
    pub fn record(
        &self,
        payload: EventPayload,
        user_id: Option<String>,
        session_id: Option<String>,
    ) -> Result<Event, DomainError> {
        // timestamp under the lock so list order matches timestamp order
        let (event, dropped) = {
            let mut state = self.write();
            let event = Event::new(payload, user_id, session_id)?;
            let cutoff = self.cutoff(event.timestamp);
            let events = state.events.entry(event.category).or_default();
            events.push_front(event.clone());
            let dropped = Self::compact_list(events, cutoff, self.max_events);
            (event, dropped)
        };
        let category = event.category;
        self.dirty.store(true, Ordering::Release);

        tracing::debug!(
            event_id = %event.id,
            category = %category,
            user_id = event.user_id.as_deref().unwrap_or("-"),
            dropped,
            "Recorded event"
        );
        Ok(event)
    }

    /// Events of a category visible to `user_id`, not older than `since`
    ///
    /// Returned in store order (most recent first).
    pub fn query(
        &self,
        category: EventCategory,
        user_id: Option<&str>,
        since: Option<DateTime<Utc>>,
    ) -> Vec<Event> {
        let state = self.read();
        state
            .events
            .get(&category)
            .map(|events| {
                events
                    .iter()
                    .filter(|e| since.map_or(true, |cutoff| e.timestamp >= cutoff))
                    .filter(|e| e.is_visible_to(user_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Copy every category for one user under a single read lock
    pub fn slice(&self, user_id: Option<&str>, since: DateTime<Utc>) -> EventSlice {
        let taken_at = Utc::now();
        let mut events = Vec::new();
        {
            let state = self.read();
            for category in EventCategory::ALL {
                if let Some(list) = state.events.get(&category) {
                    events.extend(
                        list.iter()
                            .filter(|e| e.timestamp >= since && e.is_visible_to(user_id))
                            .cloned(),
                    );
                }
            }
        }

        EventSlice::from_events(taken_at, events)
    }

    /// Drop events of one category past retention or beyond the cap
    ///
    /// Returns the number of events removed.
    pub fn compact(&self, category: EventCategory) -> usize {
        let cutoff = self.cutoff(Utc::now());
        let removed = {
            let mut state = self.write();
            match state.events.get_mut(&category) {
                Some(events) => Self::compact_list(events, cutoff, self.max_events),
                None => 0,
            }
        };
        if removed > 0 {
            self.dirty.store(true, Ordering::Release);
            tracing::debug!(category = %category, removed, "Compacted events");
        }
        removed
    }

    /// Compact every category, one lock acquisition per category
    pub fn compact_all(&self) -> usize {
        EventCategory::ALL.iter().map(|c| self.compact(*c)).sum()
    }

    /// Oldest timestamp still inside retention
    fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.retention).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    fn compact_list(events: &mut VecDeque<Event>, cutoff: DateTime<Utc>, cap: usize) -> usize {
        let before = events.len();
        while events.back().map_or(false, |oldest| oldest.timestamp < cutoff) {
            events.pop_back();
        }
        events.truncate(cap);
        before - events.len()
    }

    /// Serialize the full store, including categories this build does not know
    pub fn snapshot(&self) -> Result<StoreSnapshot, serde_json::Error> {
        let state = self.read();
        let mut categories = state.foreign.clone();
        for category in EventCategory::ALL {
            let records = match state.events.get(&category) {
                Some(events) => events
                    .iter()
                    .map(serde_json::to_value)
                    .collect::<Result<Vec<_>, _>>()?,
                None => Vec::new(),
            };
            categories.insert(category.as_str().to_string(), records);
        }
        Ok(StoreSnapshot { categories })
    }

    /// Merge a snapshot into the store
    ///
    /// Additive: events already present (same id) are kept once, unknown
    /// categories are preserved verbatim, undecodable records are skipped.
    pub fn restore(&self, snapshot: StoreSnapshot) -> RestoreSummary {
        let mut summary = RestoreSummary::default();
        let cutoff = self.cutoff(Utc::now());
        let mut state = self.write();

        for (name, records) in snapshot.categories {
            let category = match name.parse::<EventCategory>() {
                Ok(category) => category,
                Err(_) => {
                    summary.foreign_categories += 1;
                    let kept = state.foreign.entry(name).or_default();
                    for record in records {
                        if !kept.contains(&record) {
                            kept.push(record);
                        }
                    }
                    continue;
                }
            };

            let events = state.events.entry(category).or_default();
            let mut seen: HashSet<_> = events.iter().map(|e| e.id.clone()).collect();
            for record in records {
                match serde_json::from_value::<Event>(record) {
                    Ok(event) if event.category == category => {
                        if seen.insert(event.id.clone()) {
                            events.push_back(event);
                            summary.restored += 1;
                        }
                    }
                    Ok(event) => {
                        tracing::warn!(
                            event_id = %event.id,
                            expected = %category,
                            found = %event.category,
                            "Skipping snapshot record filed under the wrong category"
                        );
                        summary.skipped += 1;
                    }
                    Err(e) => {
                        tracing::warn!(category = %category, error = %e, "Skipping undecodable snapshot record");
                        summary.skipped += 1;
                    }
                }
            }

            events.make_contiguous().sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            Self::compact_list(events, cutoff, self.max_events);
        }
        drop(state);

        tracing::info!(
            restored = summary.restored,
            skipped = summary.skipped,
            foreign_categories = summary.foreign_categories,
            "Restored event store from snapshot"
        );
        summary
    }

    /// Number of events held for a category
    pub fn len(&self, category: EventCategory) -> usize {
        self.read().events.get(&category).map_or(0, VecDeque::len)
    }

    pub fn total_len(&self) -> usize {
        self.read().events.values().map(VecDeque::len).sum()
    }

    /// Every user id that appears in the store
    pub fn user_ids(&self) -> BTreeSet<String> {
        self.read()
            .events
            .values()
            .flat_map(|events| events.iter().filter_map(|e| e.user_id.clone()))
            .collect()
    }

    /// Whether anything changed since the last successful flush
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Clear the dirty flag, returning whether it was set
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    /// Set the dirty flag again after a failed flush
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }
}
