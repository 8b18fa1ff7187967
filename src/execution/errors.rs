use std::fmt;

/// Error raised by a [`StreamMetadataProvider`](super::StreamMetadataProvider)
/// when stream metadata cannot be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataError(pub String);

impl fmt::Display for MetadataError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for MetadataError {}

/// Error raised while compiling a logical application into a physical plan.
///
/// Every variant is fatal to the planning pass that raised it: no partial or
/// degraded plan is ever returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanningError {
    /// Incompatible scheduling options were enabled together.
    ConfigConflict(String),
    /// The metadata lookup failed or omitted a requested stream.
    PartitionResolution(String),
    /// A resolved stream edge was resolved a second time.
    PartitionAlreadySet { stream: String },
    /// The members of a join group disagree on partition count.
    PartitionMismatch {
        group: String,
        stream: String,
        expected: usize,
        actual: usize,
    },
    /// A join group member has no resolved partition count.
    UnresolvedPartition { group: String, stream: String },
    /// A join group with no member streams.
    EmptyJoinGroup(String),
    /// The graph references streams or operators that do not exist.
    InvalidGraph(String),
}

impl fmt::Display for PlanningError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PlanningError::ConfigConflict(msg) => write!(f, "{}", msg),
            PlanningError::PartitionResolution(msg) => {
                write!(f, "Unable to resolve partition counts: {}", msg)
            }
            PlanningError::PartitionAlreadySet { stream } => write!(
                f,
                "The partition count of stream {} has already been resolved",
                stream
            ),
            PlanningError::PartitionMismatch {
                group,
                stream,
                expected,
                actual,
            } => write!(
                f,
                "Unable to resolve input partitions of stream {} for the join {}. \
                 Expected: {}, Actual: {}",
                stream, group, expected, actual
            ),
            PlanningError::UnresolvedPartition { group, stream } => write!(
                f,
                "Stream {} in the join {} has no resolved partition count",
                stream, group
            ),
            PlanningError::EmptyJoinGroup(group) => {
                write!(f, "The join {} groups no streams", group)
            }
            PlanningError::InvalidGraph(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for PlanningError {}

impl From<MetadataError> for PlanningError {
    fn from(e: MetadataError) -> Self {
        PlanningError::PartitionResolution(e.0)
    }
}
