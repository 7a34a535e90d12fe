//! Grid-bucket spatial index for buffered containment queries.
//!
//! Events are bucketed into square cells roughly one buffer radius wide, so
//! every event within `radius` of a point lies in the 3x3 block of cells
//! around it. Containment is still decided by the exact distance test.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use shotdedup_common::{DedupError, DedupResult};
use shotdedup_event_model::{Event, EventId, Point2D};

/// `event_id -> ids of other events whose buffered disc contains it`.
pub type CandidateMap = BTreeMap<EventId, BTreeSet<EventId>>;

/// `(event_id, other_event_id)`: the other event's disc contains the event.
pub type CandidatePair = (EventId, EventId);

/// Oversizing factor for cells. Keeps every point within `radius` inside
/// the 3x3 neighbourhood despite rounding in the cell computation.
const CELL_SLACK: f64 = 1.0 + 1e-6;

/// Lower bound on cell size (meters). Applies to tiny or zero buffers.
const MIN_CELL_SIZE_M: f64 = 1.0;

type Cell = (i64, i64);

/// Spatial index over a borrowed event slice.
#[derive(Debug)]
pub struct GeometricIndex<'a> {
    events: &'a [Event],
    radius: f64,
    cell_size: f64,
    cells: HashMap<Cell, Vec<usize>>,
}

impl<'a> GeometricIndex<'a> {
    /// Bucket `events` for queries with buffer radius `spatial_buffer` (meters).
    pub fn build(events: &'a [Event], spatial_buffer: f64) -> DedupResult<Self> {
        if !spatial_buffer.is_finite() || spatial_buffer < 0.0 {
            return Err(DedupError::invalid_parameter(
                "spatial_buffer",
                spatial_buffer,
                "must be a finite non-negative distance",
            ));
        }

        let cell_size = (spatial_buffer * CELL_SLACK).max(MIN_CELL_SIZE_M);
        let mut index = Self {
            events,
            radius: spatial_buffer,
            cell_size,
            cells: HashMap::new(),
        };

        for (i, event) in events.iter().enumerate() {
            let cell = index.cell_of(&event.location);
            index.cells.entry(cell).or_default().push(i);
        }

        tracing::debug!(
            events = events.len(),
            cells = index.cells.len(),
            cell_size_m = cell_size,
            "spatial_index_built"
        );
        Ok(index)
    }

    /// Float-to-int casts saturate, so out-of-range points share an edge cell.
    fn cell_of(&self, p: &Point2D) -> Cell {
        (
            (p.x / self.cell_size).floor() as i64,
            (p.y / self.cell_size).floor() as i64,
        )
    }

    /// Number of occupied cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Ids of the other events whose buffered disc contains the event at
    /// position `idx` of the indexed slice. Never includes the event itself.
    pub fn containing(&self, idx: usize) -> BTreeSet<EventId> {
        let mut found = BTreeSet::new();
        let Some(event) = self.events.get(idx) else {
            return found;
        };

        let (cx, cy) = self.cell_of(&event.location);
        for dx in -1..=1 {
            for dy in -1..=1 {
                let (Some(x), Some(y)) = (cx.checked_add(dx), cy.checked_add(dy)) else {
                    continue;
                };
                let Some(bucket) = self.cells.get(&(x, y)) else {
                    continue;
                };
                for &j in bucket {
                    if j == idx {
                        continue;
                    }
                    let other = &self.events[j];
                    if event.location.within(&other.location, self.radius) {
                        found.insert(other.id);
                    }
                }
            }
        }
        found
    }

    /// Candidate sets for every indexed event (possibly empty).
    pub fn candidates(&self) -> CandidateMap {
        let map: CandidateMap = (0..self.events.len())
            .map(|i| (self.events[i].id, self.containing(i)))
            .collect();

        tracing::debug!(
            pairs = map.values().map(BTreeSet::len).sum::<usize>(),
            "spatial_candidates_found"
        );
        map
    }
}

/// Flatten a candidate map into directed pairs.
pub fn candidate_pairs(map: &CandidateMap) -> impl Iterator<Item = CandidatePair> + '_ {
    map.iter()
        .flat_map(|(&id, others)| others.iter().map(move |&other| (id, other)))
}
