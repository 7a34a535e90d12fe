//! shotdedup Core: the deduplication engine
//!
//! Collapses duplicate detections of one physical event into a single record:
//! - **Spatial Index:** Grid buckets for buffered-disc containment queries
//! - **Closeness:** Temporal window test and symmetric edge construction
//! - **Components:** Union-find connectivity over the closeness graph
//! - **Aggregation:** Merged records (min time, centroid, rounds) and passthrough
//! - **Pipeline:** Validation, orchestration, and diagnostics
//!
//! This crate is pure computation. No I/O, no global state.
//! All inputs are data; all outputs are data.

pub mod aggregate;
pub mod closeness;
pub mod components;
pub mod pipeline;
pub mod spatial_index;

pub use aggregate::GroupAggregator;
pub use closeness::{ClosenessFilter, Edge};
pub use components::{Component, ComponentGrouper};
pub use pipeline::{DedupConfig, DedupDiagnostics, DedupOutput, DedupPipeline};
pub use spatial_index::{CandidateMap, GeometricIndex};
