//! Aggregation of components into merged records.
//!
//! Every input event ends up in exactly one output record: merged into its
//! component's record, or passed through unchanged.

use std::collections::HashMap;

use shotdedup_common::{DedupError, DedupResult};
use shotdedup_event_model::{
    DedupRecord, Event, EventId, GroupId, MergedEvent, PassthroughEvent, Point2D,
};

use crate::components::Component;

/// Merges component members and passes the remaining events through.
pub struct GroupAggregator<'a> {
    events: &'a [Event],
    by_id: HashMap<EventId, &'a Event>,
}

impl<'a> GroupAggregator<'a> {
    pub fn new(events: &'a [Event]) -> Self {
        Self {
            events,
            by_id: events.iter().map(|e| (e.id, e)).collect(),
        }
    }

    /// Passthrough records first (input order), then merged records
    /// (component order).
    pub fn aggregate(&self, components: &[Component]) -> DedupResult<Vec<DedupRecord>> {
        let assignment = self.assign(components)?;

        let mut records: Vec<DedupRecord> = self
            .events
            .iter()
            .filter(|e| !assignment.contains_key(&e.id))
            .map(|e| DedupRecord::Passthrough(PassthroughEvent::from(e)))
            .collect();

        for component in components {
            records.push(DedupRecord::Merged(self.merge(component)?));
        }
        Ok(records)
    }

    /// Map each component member to its group, rejecting inconsistent input.
    fn assign(&self, components: &[Component]) -> DedupResult<HashMap<EventId, GroupId>> {
        let mut assignment = HashMap::new();
        for component in components {
            if component.len() < 2 {
                return Err(DedupError::internal(format!(
                    "group {} has {} member(s); merged groups need at least two",
                    component.group_id,
                    component.len()
                )));
            }
            for &id in &component.members {
                if !self.by_id.contains_key(&id) {
                    return Err(DedupError::UnknownEventId { event_id: id });
                }
                if let Some(previous) = assignment.insert(id, component.group_id) {
                    return Err(DedupError::internal(format!(
                        "event {id} assigned to groups {previous} and {}",
                        component.group_id
                    )));
                }
            }
        }
        Ok(assignment)
    }

    fn merge(&self, component: &Component) -> DedupResult<MergedEvent> {
        let members = component
            .members
            .iter()
            .map(|id| {
                self.by_id
                    .get(id)
                    .copied()
                    .ok_or(DedupError::UnknownEventId { event_id: *id })
            })
            .collect::<DedupResult<Vec<&Event>>>()?;

        let event_time = members
            .iter()
            .map(|e| e.time)
            .min()
            .ok_or_else(|| DedupError::internal(format!("group {} is empty", component.group_id)))?;
        let location = Point2D::centroid(members.iter().map(|e| &e.location))
            .ok_or_else(|| DedupError::internal(format!("group {} is empty", component.group_id)))?;
        let total_rounds: f64 = members.iter().map(|e| e.rounds).sum();
        let mean_rounds = total_rounds / members.len() as f64;

        Ok(MergedEvent {
            group_id: component.group_id,
            members: component.members.clone(),
            event_time,
            location,
            mean_rounds,
            total_rounds,
        })
    }
}
