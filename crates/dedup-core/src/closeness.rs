//! Temporal filtering and symmetrization of spatial candidates.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Duration, Utc};
use shotdedup_common::{DedupError, DedupResult};
use shotdedup_event_model::{Event, EventId};

use crate::spatial_index::{candidate_pairs, CandidateMap};

/// Largest accepted temporal buffer: one hundred years, in minutes.
const MAX_TEMPORAL_BUFFER_MIN: f64 = 100.0 * 365.25 * 24.0 * 60.0;

/// Undirected edge between two distinct events. Stored with `a < b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Edge {
    a: EventId,
    b: EventId,
}

impl Edge {
    /// Normalized edge, or `None` for a self-loop.
    pub fn new(x: EventId, y: EventId) -> Option<Self> {
        match x.cmp(&y) {
            std::cmp::Ordering::Less => Some(Self { a: x, b: y }),
            std::cmp::Ordering::Greater => Some(Self { a: y, b: x }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn a(&self) -> EventId {
        self.a
    }

    pub fn b(&self) -> EventId {
        self.b
    }
}

/// Keeps spatial candidates that are also close in time.
#[derive(Debug, Clone)]
pub struct ClosenessFilter {
    window: Duration,
}

impl ClosenessFilter {
    /// Filter with a window of `temporal_buffer_min` minutes.
    pub fn new(temporal_buffer_min: f64) -> DedupResult<Self> {
        if !temporal_buffer_min.is_finite()
            || temporal_buffer_min < 0.0
            || temporal_buffer_min > MAX_TEMPORAL_BUFFER_MIN
        {
            return Err(DedupError::invalid_parameter(
                "temporal_buffer",
                temporal_buffer_min,
                "must be a finite non-negative number of minutes (at most 100 years)",
            ));
        }
        let micros = (temporal_buffer_min * 60_000_000.0).round() as i64;
        Ok(Self {
            window: Duration::microseconds(micros),
        })
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Strictly less than the window apart, in either order.
    pub fn is_temporally_close(&self, a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
        a - b < self.window && b - a < self.window
    }

    /// Qualifying undirected edges.
    ///
    /// A pair qualifies when either spatial direction was found and the
    /// temporal test holds, so the result does not depend on which side of
    /// the containment test produced the candidate.
    pub fn filter(&self, events: &[Event], candidates: &CandidateMap) -> DedupResult<BTreeSet<Edge>> {
        let by_id: HashMap<EventId, &Event> = events.iter().map(|e| (e.id, e)).collect();
        let lookup = |id: EventId| {
            by_id
                .get(&id)
                .copied()
                .ok_or(DedupError::UnknownEventId { event_id: id })
        };

        let mut edges = BTreeSet::new();
        let mut rejected = BTreeSet::new();
        for (id, other_id) in candidate_pairs(candidates) {
            let Some(edge) = Edge::new(id, other_id) else {
                continue;
            };
            if edges.contains(&edge) || rejected.contains(&edge) {
                continue;
            }
            let event = lookup(id)?;
            let other = lookup(other_id)?;
            if self.is_temporally_close(event.time, other.time) {
                edges.insert(edge);
            } else {
                rejected.insert(edge);
            }
        }

        tracing::debug!(
            edges = edges.len(),
            rejected_by_time = rejected.len(),
            window_secs = self.window.num_seconds(),
            "closeness_edges_built"
        );
        Ok(edges)
    }
}
