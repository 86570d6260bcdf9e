//! Event tables and their drift correction.
use serde::{Deserialize, Serialize};

/// A statistic of one segment of raw current.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    pub mean: f64,
    pub start: f64,
    pub stdev: f64,
    pub length: f64,
}

impl Event {
    pub fn new(mean: f64, start: f64, stdev: f64, length: f64) -> Self {
        Self {
            mean,
            start,
            stdev,
            length,
        }
    }
}

/// A row of a strand's event table as the basecaller writes it. Only the
/// first four columns take part in the npRead; `move` and `p_model_state`
/// feed the 1D strand map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub mean: f64,
    pub start: f64,
    pub stdev: f64,
    pub length: f64,
    #[serde(default, rename = "move")]
    pub moves: Option<i64>,
    #[serde(default)]
    pub p_model_state: Option<f64>,
}

impl EventRecord {
    pub fn event(&self) -> Event {
        Event::new(self.mean, self.start, self.stdev, self.length)
    }
}

impl std::convert::From<Event> for EventRecord {
    fn from(e: Event) -> Self {
        Self {
            mean: e.mean,
            start: e.start,
            stdev: e.stdev,
            length: e.length,
            moves: None,
            p_model_state: None,
        }
    }
}

/// Events of one strand, as loaded. Means are raw, i.e., not yet
/// corrected for drift.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventTable {
    events: Vec<Event>,
}

impl EventTable {
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }
    pub fn from_records(records: &[EventRecord]) -> Self {
        records.iter().map(EventRecord::event).collect()
    }
    pub fn events(&self) -> &[Event] {
        &self.events
    }
    pub fn len(&self) -> usize {
        self.events.len()
    }
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
    /// Subtract the linear baseline drift from every mean:
    /// `mean - (start - first.start) * drift`.
    /// Consumes the table, so the correction can not be applied twice.
    pub fn correct_drift(self, drift: f64) -> DriftCorrected {
        let mut events = self.events;
        if let Some(origin) = events.first().map(|e| e.start) {
            for event in events.iter_mut() {
                event.mean -= (event.start - origin) * drift;
            }
        }
        DriftCorrected { events, drift }
    }
}

impl std::iter::FromIterator<Event> for EventTable {
    fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Events whose means have been corrected for drift.
#[derive(Debug, Clone, PartialEq)]
pub struct DriftCorrected {
    events: Vec<Event>,
    drift: f64,
}

impl DriftCorrected {
    pub fn events(&self) -> &[Event] {
        &self.events
    }
    pub fn len(&self) -> usize {
        self.events.len()
    }
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
    /// The drift constant that was removed.
    pub fn drift(&self) -> f64 {
        self.drift
    }
}
