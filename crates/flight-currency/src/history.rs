//! Person event history — the append-only input the engine reads.
//!
//! The scheduling subsystem owns the history. The engine only reads it
//! through [`EventHistory`] and never writes back.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::currency::{CurrencyId, PrimitiveCurrency};

/// Identifier of a person (trainee or staff member).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(pub String);

impl PersonId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for PersonId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A dated event in a person's training record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonEventRecord {
    pub person_id: PersonId,
    pub event_code: String,
    pub date: NaiveDate,
}

impl PersonEventRecord {
    pub fn new(person_id: impl Into<String>, event_code: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            person_id: PersonId::new(person_id),
            event_code: event_code.into(),
            date,
        }
    }
}

/// A manually keyed last-event date for one primitive currency.
///
/// Legacy records and paper logbooks arrive this way. Each entry counts as
/// one qualifying event for the named primitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualEntry {
    pub person_id: PersonId,
    pub currency_id: CurrencyId,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Read-only source of per-person event history.
pub trait EventHistory {
    /// Events for `person`, oldest first.
    fn events_for(&self, person: &PersonId) -> Vec<PersonEventRecord>;

    /// Manual last-event entries for `person`.
    fn manual_entries_for(&self, _person: &PersonId) -> Vec<ManualEntry> {
        Vec::new()
    }
}

/// One person's history, fetched once per evaluation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonHistory {
    pub events: Vec<PersonEventRecord>,
    pub manual_entries: Vec<ManualEntry>,
}

impl PersonHistory {
    /// Snapshot a person's records from a provider.
    pub fn load(person: &PersonId, source: &dyn EventHistory) -> Self {
        Self {
            events: source.events_for(person),
            manual_entries: source.manual_entries_for(person),
        }
    }

    /// Dates that qualify for `primitive`, on or before `as_of`.
    ///
    /// Events dated after the evaluation date are ignored so that an
    /// evaluation always describes the state as of that day.
    pub fn matching_dates(&self, primitive: &PrimitiveCurrency, as_of: NaiveDate) -> Vec<NaiveDate> {
        let from_events = self
            .events
            .iter()
            .filter(|e| primitive.matches(&e.event_code))
            .map(|e| e.date);
        let from_manual = self
            .manual_entries
            .iter()
            .filter(|m| m.currency_id == primitive.id)
            .map(|m| m.date);

        from_events
            .chain(from_manual)
            .filter(|d| *d <= as_of)
            .collect()
    }
}

/// Append-only in-memory history, keyed by person.
#[derive(Debug, Clone, Default)]
pub struct InMemoryHistory {
    events: BTreeMap<PersonId, Vec<PersonEventRecord>>,
    manual: BTreeMap<PersonId, Vec<ManualEntry>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from flat record lists.
    pub fn from_records(events: Vec<PersonEventRecord>, manual: Vec<ManualEntry>) -> Self {
        let mut history = Self::new();
        for event in events {
            history.append(event);
        }
        for entry in manual {
            history.append_manual(entry);
        }
        history
    }

    /// Append an event. Existing records are never touched.
    pub fn append(&mut self, event: PersonEventRecord) {
        self.events
            .entry(event.person_id.clone())
            .or_default()
            .push(event);
    }

    /// Append a manual last-event entry.
    pub fn append_manual(&mut self, entry: ManualEntry) {
        self.manual
            .entry(entry.person_id.clone())
            .or_default()
            .push(entry);
    }

    /// Every person with at least one record, in id order.
    pub fn persons(&self) -> Vec<PersonId> {
        let mut persons: Vec<PersonId> = self
            .events
            .keys()
            .chain(self.manual.keys())
            .cloned()
            .collect();
        persons.sort();
        persons.dedup();
        persons
    }

    /// Total number of event records.
    pub fn len(&self) -> usize {
        self.events.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.manual.is_empty()
    }

    /// All events, grouped by person in id order.
    pub fn all_events(&self) -> impl Iterator<Item = &PersonEventRecord> {
        self.events.values().flat_map(|v| v.iter())
    }

    /// All manual entries, grouped by person in id order.
    pub fn all_manual_entries(&self) -> impl Iterator<Item = &ManualEntry> {
        self.manual.values().flat_map(|v| v.iter())
    }
}

impl EventHistory for InMemoryHistory {
    fn events_for(&self, person: &PersonId) -> Vec<PersonEventRecord> {
        let mut events = self.events.get(person).cloned().unwrap_or_default();
        events.sort_by_key(|e| e.date);
        events
    }

    fn manual_entries_for(&self, person: &PersonId) -> Vec<ManualEntry> {
        self.manual.get(person).cloned().unwrap_or_default()
    }
}
