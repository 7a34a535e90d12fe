//! End-to-end deduplication run.
//!
//! # Stages
//!
//! 1. **Validate** raw rows and reject duplicate ids.
//! 2. **Index** events on a grid and collect buffered-disc containment candidates.
//! 3. **Filter** candidates by the temporal window into undirected edges.
//! 4. **Group** the edge graph into connected components.
//! 5. **Aggregate** components into merged records; pass the rest through.
//!
//! The connectivity pass only starts after the complete edge set exists, and
//! nothing is returned unless every stage succeeds.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shotdedup_common::{DedupDefaults, DedupError, DedupResult};
use shotdedup_event_model::{
    check_events, validate_events, DedupRecord, Event, MergedEvent, OutputRow,
    PassthroughEvent, RawEvent,
};

use crate::aggregate::GroupAggregator;
use crate::closeness::ClosenessFilter;
use crate::components::{Component, ComponentGrouper};
use crate::spatial_index::GeometricIndex;

/// Parameters for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Buffer radius around each event (meters).
    pub spatial_buffer_m: f64,

    /// Time window (minutes). Events must be strictly closer than this.
    pub temporal_buffer_min: f64,

    /// Collect diagnostics and log them at `info`.
    pub diagnostics: bool,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self::from(&DedupDefaults::default())
    }
}

impl From<&DedupDefaults> for DedupConfig {
    fn from(defaults: &DedupDefaults) -> Self {
        Self {
            spatial_buffer_m: defaults.spatial_buffer_m,
            temporal_buffer_min: defaults.temporal_buffer_min,
            diagnostics: defaults.diagnostics,
        }
    }
}

impl DedupConfig {
    pub fn validate(&self) -> DedupResult<()> {
        if !self.spatial_buffer_m.is_finite() || self.spatial_buffer_m < 0.0 {
            return Err(DedupError::invalid_parameter(
                "spatial_buffer",
                self.spatial_buffer_m,
                "must be a finite non-negative distance",
            ));
        }
        ClosenessFilter::new(self.temporal_buffer_min)?;
        Ok(())
    }
}

/// Statistics about one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupDiagnostics {
    /// Events before deduplication.
    pub input_count: usize,

    /// Distinct events close in space and time to at least one other event.
    pub near_duplicate_count: usize,

    /// Component size -> number of components of that size.
    pub component_sizes: BTreeMap<usize, usize>,

    pub merged_count: usize,
    pub passthrough_count: usize,

    /// Records after deduplication.
    pub retained_count: usize,
}

impl DedupDiagnostics {
    fn collect(input_count: usize, components: &[Component], records: &[DedupRecord]) -> Self {
        let mut component_sizes = BTreeMap::new();
        for component in components {
            *component_sizes.entry(component.len()).or_insert(0) += 1;
        }
        let merged_count = records.iter().filter(|r| r.is_merged()).count();
        Self {
            input_count,
            near_duplicate_count: components.iter().map(Component::len).sum(),
            component_sizes,
            merged_count,
            passthrough_count: records.len() - merged_count,
            retained_count: records.len(),
        }
    }

    /// Events removed by merging.
    pub fn removed_count(&self) -> usize {
        self.input_count.saturating_sub(self.retained_count)
    }

    fn log(&self) {
        tracing::info!(input = self.input_count, "events before deduplication");
        tracing::info!(
            near_duplicates = self.near_duplicate_count,
            "events close in space and time to another event"
        );
        for (size, count) in &self.component_sizes {
            tracing::info!(size, count, "connected components of size");
        }
        tracing::info!(
            retained = self.retained_count,
            merged = self.merged_count,
            passthrough = self.passthrough_count,
            "retained events"
        );
    }
}

/// Result of a pipeline run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DedupOutput {
    /// Passthrough records in input order, then merged records by group id.
    pub records: Vec<DedupRecord>,

    /// Present when `DedupConfig::diagnostics` is set.
    pub diagnostics: Option<DedupDiagnostics>,
}

impl DedupOutput {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn merged(&self) -> impl Iterator<Item = &MergedEvent> {
        self.records.iter().filter_map(|r| match r {
            DedupRecord::Merged(m) => Some(m),
            DedupRecord::Passthrough(_) => None,
        })
    }

    pub fn passthrough(&self) -> impl Iterator<Item = &PassthroughEvent> {
        self.records.iter().filter_map(|r| match r {
            DedupRecord::Passthrough(p) => Some(p),
            DedupRecord::Merged(_) => None,
        })
    }

    /// Flat rows for serialization.
    pub fn rows(&self) -> Vec<OutputRow> {
        self.records.iter().map(DedupRecord::to_row).collect()
    }
}

/// The deduplication pipeline.
pub struct DedupPipeline {
    config: DedupConfig,
}

impl DedupPipeline {
    /// Create a new pipeline with the given configuration.
    pub fn new(config: DedupConfig) -> Self {
        Self { config }
    }

    /// Create a pipeline with default configuration (50 m, 2 min).
    pub fn with_defaults() -> Self {
        Self::new(DedupConfig::default())
    }

    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    /// Validate raw rows, then deduplicate them.
    pub fn run(&self, raw: &[RawEvent]) -> DedupResult<DedupOutput> {
        self.config.validate()?;
        let events = validate_events(raw)?;
        self.run_events(&events)
    }

    /// Deduplicate already-typed events. Field rules and id uniqueness are
    /// checked again, since `Event` fields are public.
    pub fn run_events(&self, events: &[Event]) -> DedupResult<DedupOutput> {
        self.config.validate()?;
        check_events(events)?;

        if events.is_empty() {
            tracing::debug!("no events to deduplicate");
            return Ok(DedupOutput {
                records: Vec::new(),
                diagnostics: self.config.diagnostics.then(DedupDiagnostics::default),
            });
        }

        let index = GeometricIndex::build(events, self.config.spatial_buffer_m)?;
        let candidates = index.candidates();

        let filter = ClosenessFilter::new(self.config.temporal_buffer_min)?;
        let edges = filter.filter(events, &candidates)?;

        let components = ComponentGrouper::group(&edges);
        let records = GroupAggregator::new(events).aggregate(&components)?;

        tracing::debug!(
            input = events.len(),
            output = records.len(),
            groups = components.len(),
            "deduplication_complete"
        );

        let diagnostics = self.config.diagnostics.then(|| {
            let diagnostics = DedupDiagnostics::collect(events.len(), &components, &records);
            diagnostics.log();
            diagnostics
        });

        Ok(DedupOutput {
            records,
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shotdedup_common::EventField;

    fn raw(id: i64, time: &str, x: f64, y: f64, rounds: f64) -> RawEvent {
        RawEvent::new(id, time, x, y, rounds)
    }

    #[test]
    fn test_default_config_matches_documented_buffers() {
        let config = DedupConfig::default();
        assert_eq!(config.spatial_buffer_m, 50.0);
        assert_eq!(config.temporal_buffer_min, 2.0);
        assert!(!config.diagnostics);
    }

    #[test]
    fn test_empty_input_is_a_no_op() {
        let pipeline = DedupPipeline::new(DedupConfig {
            diagnostics: true,
            ..Default::default()
        });
        let output = pipeline.run(&[]).unwrap();
        assert!(output.is_empty());
        assert_eq!(output.diagnostics, Some(DedupDiagnostics::default()));
    }

    #[test]
    fn test_malformed_row_fails_whole_run() {
        let mut bad = raw(2, "2018-06-01T00:01:00Z", 10.0, 0.0, 3.0);
        bad.x = None;
        let rows = vec![raw(1, "2018-06-01T00:00:00Z", 0.0, 0.0, 1.0), bad];

        let err = DedupPipeline::with_defaults().run(&rows).unwrap_err();
        match err {
            DedupError::InvalidEvent {
                row,
                event_id,
                field,
                ..
            } => {
                assert_eq!(row, 1);
                assert_eq!(event_id, Some(2));
                assert_eq!(field, EventField::X);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_ids_fail_typed_runs_too() {
        let rows = vec![
            raw(1, "2018-06-01T00:00:00Z", 0.0, 0.0, 1.0),
            raw(1, "2018-06-01T03:00:00Z", 900.0, 0.0, 1.0),
        ];
        let events: Vec<Event> = rows
            .iter()
            .enumerate()
            .map(|(i, r)| r.validate(i).unwrap())
            .collect();
        let err = DedupPipeline::with_defaults()
            .run_events(&events)
            .unwrap_err();
        assert!(matches!(err, DedupError::DuplicateEventId { event_id: 1, .. }));
    }

    #[test]
    fn test_typed_run_rejects_hand_built_events() {
        let ok: Vec<Event> = [
            raw(1, "2018-06-01T00:00:00Z", 0.0, 0.0, 1.0),
            raw(2, "2018-06-01T00:00:10Z", 5.0, 0.0, 3.0),
        ]
        .iter()
        .enumerate()
        .map(|(i, r)| r.validate(i).unwrap())
        .collect();

        let negative_id = Event {
            id: -1,
            location: shotdedup_event_model::Point2D::new(9000.0, 0.0),
            ..ok[0].clone()
        };
        let mut events = ok.clone();
        events.push(negative_id);
        let err = DedupPipeline::with_defaults().run_events(&events).unwrap_err();
        assert_eq!(err.field(), Some(EventField::EventId));

        let negative_rounds = Event {
            id: 3,
            rounds: -3.0,
            location: shotdedup_event_model::Point2D::new(9000.0, 0.0),
            ..ok[0].clone()
        };
        let mut events = ok;
        events.push(negative_rounds);
        let err = DedupPipeline::with_defaults().run_events(&events).unwrap_err();
        assert_eq!(err.field(), Some(EventField::Rounds));
    }

    #[test]
    fn test_far_out_coordinates_fail_validation() {
        let rows = vec![
            raw(1, "2018-06-01T00:00:00Z", 1e300, 0.0, 1.0),
            raw(2, "2018-06-01T00:00:10Z", 1e300, 0.0, 1.0),
        ];
        let err = DedupPipeline::with_defaults().run(&rows).unwrap_err();
        assert!(matches!(
            err,
            DedupError::InvalidEvent {
                row: 0,
                field: EventField::X,
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_parameters_are_rejected() {
        let rows = vec![raw(1, "2018-06-01T00:00:00Z", 0.0, 0.0, 1.0)];
        for config in [
            DedupConfig {
                spatial_buffer_m: -5.0,
                ..Default::default()
            },
            DedupConfig {
                temporal_buffer_min: f64::NAN,
                ..Default::default()
            },
        ] {
            let err = DedupPipeline::new(config).run(&rows).unwrap_err();
            assert!(matches!(err, DedupError::InvalidParameter { .. }));
        }
    }

    #[test]
    fn test_diagnostics_histogram() {
        let rows = vec![
            raw(1, "2018-06-01T00:00:00Z", 0.0, 0.0, 1.0),
            raw(2, "2018-06-01T00:00:30Z", 20.0, 0.0, 1.0),
            raw(3, "2018-06-01T00:01:00Z", 40.0, 0.0, 1.0),
            raw(4, "2018-06-01T05:00:00Z", 0.0, 0.0, 1.0),
            raw(5, "2018-06-01T05:01:00Z", 0.0, 10.0, 1.0),
            raw(6, "2018-06-01T09:00:00Z", 0.0, 0.0, 1.0),
        ];
        let output = DedupPipeline::new(DedupConfig {
            diagnostics: true,
            ..Default::default()
        })
        .run(&rows)
        .unwrap();

        let diagnostics = output.diagnostics.unwrap();
        assert_eq!(diagnostics.input_count, 6);
        assert_eq!(diagnostics.near_duplicate_count, 5);
        assert_eq!(diagnostics.component_sizes, BTreeMap::from([(2, 1), (3, 1)]));
        assert_eq!(diagnostics.merged_count, 2);
        assert_eq!(diagnostics.passthrough_count, 1);
        assert_eq!(diagnostics.retained_count, 3);
        assert_eq!(diagnostics.removed_count(), 3);
    }

    #[test]
    fn test_diagnostics_absent_unless_requested() {
        let rows = vec![raw(1, "2018-06-01T00:00:00Z", 0.0, 0.0, 1.0)];
        let output = DedupPipeline::with_defaults().run(&rows).unwrap();
        assert!(output.diagnostics.is_none());
        assert_eq!(output.passthrough().count(), 1);
        assert_eq!(output.merged().count(), 0);
    }
}
