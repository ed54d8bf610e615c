//! Append-only event trace.
//!
//! The memory is the single writer. Observers hold a [`TraceReader`] and
//! only ever receive copies of a time range, taken under a read lock, so a
//! snapshot never contains a half-written timepoint.

use std::collections::BTreeMap;
use std::ops::RangeBounds;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::task::Task;
use crate::time::now_iso8601;

/// Origin of a trace event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Task arriving from outside.
    Input,
    /// Result reported to the outside.
    Output,
    /// Operator execution.
    Execution,
    /// Task produced inside the system (inference or operator feedback).
    Added,
    /// Task or concept leaving memory: decayed, neglected, evicted or rejected.
    Removed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Payload {
    Task(Task),
    Signal(Vec<String>),
}

impl Payload {
    pub fn signal<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Payload::Signal(parts.into_iter().map(Into::into).collect())
    }

    pub fn as_task(&self) -> Option<&Task> {
        match self {
            Payload::Task(task) => Some(task),
            Payload::Signal(_) => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TraceEvent {
    pub time: u64,
    pub channel: Channel,
    pub payload: Payload,
}

/// Events grouped by timestamp, in emission order within a timestamp.
pub type Timeline = BTreeMap<u64, Vec<TraceEvent>>;

/// Writer half, owned by the memory.
pub struct Trace {
    timeline: Arc<RwLock<Timeline>>,
    retention: usize,
}

impl Trace {
    /// `retention` bounds the number of timepoints kept; the oldest go first.
    pub fn new(retention: usize) -> Self {
        Self {
            timeline: Arc::new(RwLock::new(BTreeMap::new())),
            retention: retention.max(1),
        }
    }

    pub fn append(&self, event: TraceEvent) {
        let mut timeline = self.timeline.write().unwrap_or_else(PoisonError::into_inner);
        timeline.entry(event.time).or_default().push(event);
        while timeline.len() > self.retention {
            timeline.pop_first();
        }
    }

    pub fn reader(&self) -> TraceReader {
        TraceReader {
            timeline: Arc::clone(&self.timeline),
        }
    }
}

/// Read-only handle for observers on other threads.
#[derive(Clone)]
pub struct TraceReader {
    timeline: Arc<RwLock<Timeline>>,
}

impl TraceReader {
    /// Copy of every timepoint in `range`.
    pub fn snapshot(&self, range: impl RangeBounds<u64>) -> Timeline {
        let timeline = self.timeline.read().unwrap_or_else(PoisonError::into_inner);
        timeline
            .range(range)
            .map(|(time, events)| (*time, events.clone()))
            .collect()
    }

    /// Events in `range`, flattened in time then emission order.
    pub fn events(&self, range: impl RangeBounds<u64>) -> Vec<TraceEvent> {
        self.snapshot(range).into_values().flatten().collect()
    }

    /// Events in `range` on one channel.
    pub fn events_on(&self, range: impl RangeBounds<u64>, channel: Channel) -> Vec<TraceEvent> {
        self.events(range)
            .into_iter()
            .filter(|e| e.channel == channel)
            .collect()
    }

    pub fn latest_time(&self) -> Option<u64> {
        let timeline = self.timeline.read().unwrap_or_else(PoisonError::into_inner);
        timeline.last_key_value().map(|(time, _)| *time)
    }

    /// Total events currently retained.
    pub fn len(&self) -> usize {
        let timeline = self.timeline.read().unwrap_or_else(PoisonError::into_inner);
        timeline.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Serialize)]
struct TraceExport<'a> {
    exported_at: String,
    events: Vec<&'a TraceEvent>,
}

/// Serialize a snapshot as pretty JSON: `{"exported_at": ..., "events": [...]}`.
pub fn export_json(timeline: &Timeline) -> serde_json::Result<String> {
    let export = TraceExport {
        exported_at: now_iso8601(),
        events: timeline.values().flatten().collect(),
    };
    serde_json::to_string_pretty(&export)
}
