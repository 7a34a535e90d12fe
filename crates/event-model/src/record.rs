//! Output records of a deduplication run.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::{Event, EventId};
use crate::point::Point2D;

/// Synthetic identifier of a merged group. Always negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(i64);

impl GroupId {
    /// Group id for the `ordinal`-th component of a run: 0 -> -1, 1 -> -2, ...
    pub fn from_ordinal(ordinal: usize) -> Self {
        Self(-(ordinal as i64) - 1)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Aggregate of two or more events judged to be one physical event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedEvent {
    pub group_id: GroupId,

    /// Ids of the merged input events, ascending.
    pub members: Vec<EventId>,

    /// Earliest member time.
    pub event_time: DateTime<Utc>,

    /// Unweighted centroid of member locations.
    pub location: Point2D,

    pub mean_rounds: f64,
    pub total_rounds: f64,
}

/// An event with no qualifying neighbour, carried through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassthroughEvent {
    pub event_id: EventId,
    pub event_time: DateTime<Utc>,
    pub location: Point2D,
    pub rounds: f64,
}

impl From<&Event> for PassthroughEvent {
    fn from(event: &Event) -> Self {
        Self {
            event_id: event.id,
            event_time: event.time,
            location: event.location,
            rounds: event.rounds,
        }
    }
}

/// One record of deduplicated output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DedupRecord {
    Merged(MergedEvent),
    Passthrough(PassthroughEvent),
}

impl DedupRecord {
    pub fn is_merged(&self) -> bool {
        matches!(self, Self::Merged(_))
    }

    pub fn event_time(&self) -> DateTime<Utc> {
        match self {
            Self::Merged(m) => m.event_time,
            Self::Passthrough(p) => p.event_time,
        }
    }

    pub fn location(&self) -> Point2D {
        match self {
            Self::Merged(m) => m.location,
            Self::Passthrough(p) => p.location,
        }
    }

    pub fn mean_rounds(&self) -> f64 {
        match self {
            Self::Merged(m) => m.mean_rounds,
            Self::Passthrough(p) => p.rounds,
        }
    }

    pub fn total_rounds(&self) -> f64 {
        match self {
            Self::Merged(m) => m.total_rounds,
            Self::Passthrough(p) => p.rounds,
        }
    }

    /// Input event ids represented by this record.
    pub fn member_ids(&self) -> &[EventId] {
        match self {
            Self::Merged(m) => &m.members,
            Self::Passthrough(p) => std::slice::from_ref(&p.event_id),
        }
    }

    /// Flat projection for downstream consumers.
    pub fn to_row(&self) -> OutputRow {
        let event_id = match self {
            Self::Merged(m) => m.group_id.get(),
            Self::Passthrough(p) => p.event_id,
        };
        let location = self.location();
        OutputRow {
            event_id,
            event_time: self.event_time(),
            mean_rounds: self.mean_rounds(),
            total_rounds: self.total_rounds(),
            x: location.x,
            y: location.y,
        }
    }
}

/// Flat output row: `event_id` is negative for merged groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRow {
    pub event_id: i64,
    pub event_time: DateTime<Utc>,
    pub mean_rounds: f64,
    pub total_rounds: f64,
    pub x: f64,
    pub y: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_group_ids_are_negative_and_distinct() {
        assert_eq!(GroupId::from_ordinal(0).get(), -1);
        assert_eq!(GroupId::from_ordinal(1).get(), -2);
        assert_ne!(GroupId::from_ordinal(4), GroupId::from_ordinal(5));
    }

    #[test]
    fn test_passthrough_derives_mean_and_total() {
        let time = Utc.with_ymd_and_hms(2018, 6, 1, 0, 0, 0).unwrap();
        let event = Event::new(3, time, Point2D::new(1.0, 2.0), 2.0).unwrap();
        let record = DedupRecord::Passthrough((&event).into());

        assert!(!record.is_merged());
        assert_eq!(record.mean_rounds(), 2.0);
        assert_eq!(record.total_rounds(), 2.0);
        assert_eq!(record.member_ids(), &[3]);

        let row = record.to_row();
        assert_eq!(row.event_id, 3);
        assert_eq!(row.event_time, time);
        assert_eq!((row.x, row.y), (1.0, 2.0));
    }

    #[test]
    fn test_merged_row_uses_group_id() {
        let time = Utc.with_ymd_and_hms(2018, 6, 1, 0, 0, 0).unwrap();
        let record = DedupRecord::Merged(MergedEvent {
            group_id: GroupId::from_ordinal(0),
            members: vec![1, 2],
            event_time: time,
            location: Point2D::new(5.0, 0.0),
            mean_rounds: 2.0,
            total_rounds: 4.0,
        });

        assert!(record.is_merged());
        assert_eq!(record.member_ids(), &[1, 2]);
        let row = record.to_row();
        assert_eq!(row.event_id, -1);
        assert_eq!(row.total_rounds, 4.0);
        assert_eq!(row.mean_rounds, 2.0);
    }

    #[test]
    fn test_record_json_is_tagged() {
        let time = Utc.with_ymd_and_hms(2018, 6, 1, 0, 0, 0).unwrap();
        let record = DedupRecord::Passthrough(PassthroughEvent {
            event_id: 9,
            event_time: time,
            location: Point2D::new(0.0, 0.0),
            rounds: 1.0,
        });
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"kind\":\"passthrough\""));
        assert!(json.contains("\"event_id\":9"));
    }
}
