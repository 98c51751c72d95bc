//! Flat inner-product vector index and its snapshot persistence.

pub mod index;
pub mod snapshot;

pub use index::FlatIndex;
pub use snapshot::{PipelineState, SnapshotStore};
