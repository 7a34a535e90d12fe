//! shotdedup Event Model
//!
//! Defines the core data contracts for deduplication:
//! - **Events:** Validated detection reports (id, time, planar location, rounds)
//! - **Points:** Planar coordinates in a projected, metric CRS
//! - **Records:** Merged and passthrough output of a deduplication run
//!
//! All coordinates are meters in a fixed planar coordinate system.
//! Reprojection happens upstream.

pub mod event;
pub mod point;
pub mod record;

pub use event::*;
pub use point::*;
pub use record::*;
