//! Compilation of logical applications into physical execution plans.
//!
//! The [`ExecutionPlanner`] turns an
//! [`ApplicationDescriptor`](crate::application::ApplicationDescriptor) into
//! a [`JobGraph`]: streams are classified as inputs, outputs, or
//! intermediates of the application, partition counts are resolved against
//! the owning messaging systems, and the streams feeding every join are
//! checked for partition agreement before anything is deployed.

// Private submodules
mod errors;
mod graph_analyzer;
mod job_graph;
mod partitions;
mod planner;
mod stream_edge;

// Public exports
pub use errors::{MetadataError, PlanningError};
pub use job_graph::{JobGraph, JobNode};
pub use partitions::{
    IntermediateStreamManager, PartitionAssigner, StreamMetadataProvider,
    MAX_INFERRED_PARTITION_COUNT,
};
pub use planner::{ExecutionPlanner, StreamSet};
pub use stream_edge::{EdgeRole, StreamEdge, StreamSpec};
