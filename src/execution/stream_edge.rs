use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::errors::PlanningError;

/// The identity of a physical stream within a messaging system.
///
/// The `id` is the logical name operators refer to; `system` and `stream`
/// address the physical stream. Two specs are equal iff they address the same
/// physical stream, regardless of the logical ids they were declared under.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct StreamSpec {
    id: String,
    system: String,
    stream: String,
}

impl StreamSpec {
    pub fn new(id: &str, system: &str, stream: &str) -> Self {
        Self {
            id: id.to_string(),
            system: system.to_string(),
            stream: stream.to_string(),
        }
    }

    /// The logical id under which the stream was declared.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The messaging system that owns the stream.
    pub fn system(&self) -> &str {
        &self.system
    }

    /// The name of the stream within its system.
    pub fn stream(&self) -> &str {
        &self.stream
    }
}

impl PartialEq for StreamSpec {
    fn eq(&self, other: &StreamSpec) -> bool {
        self.system == other.system && self.stream == other.stream
    }
}

impl Hash for StreamSpec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.system.hash(state);
        self.stream.hash(state);
    }
}

impl fmt::Display for StreamSpec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.system, self.stream)
    }
}

/// The role a stream plays in the physical plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeRole {
    /// Read by the application, owned by an external system.
    Input,
    /// Written by the application, owned by an external system.
    Output,
    /// Both produced and consumed within the application.
    Intermediate,
    /// Feeds out-of-band updates into a table.
    SideInput,
}

impl fmt::Display for EdgeRole {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EdgeRole::Input => write!(f, "input"),
            EdgeRole::Output => write!(f, "output"),
            EdgeRole::Intermediate => write!(f, "intermediate"),
            EdgeRole::SideInput => write!(f, "side-input"),
        }
    }
}

/// A physical stream in the [`JobGraph`](super::JobGraph).
///
/// Wraps a [`StreamSpec`] with the role the stream plays in the plan and a
/// write-once partition count. The count is absent until resolution, set
/// exactly once by the partition resolver or the intermediate-stream
/// assigner, and read-only thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamEdge {
    spec: StreamSpec,
    role: EdgeRole,
    partitions: Option<usize>,
}

impl StreamEdge {
    pub(crate) fn new(spec: StreamSpec, role: EdgeRole) -> Self {
        Self {
            spec,
            role,
            partitions: None,
        }
    }

    pub fn spec(&self) -> &StreamSpec {
        &self.spec
    }

    pub fn role(&self) -> EdgeRole {
        self.role
    }

    /// The resolved partition count, or `None` if the edge is unresolved.
    pub fn partition_count(&self) -> Option<usize> {
        self.partitions
    }

    /// Returns a copy of the edge with its partition count set.
    ///
    /// The count is write-once; resolving an already-resolved edge is an
    /// error rather than a silent overwrite.
    pub(crate) fn with_partition_count(self, partitions: usize) -> Result<Self, PlanningError> {
        if self.partitions.is_some() {
            return Err(PlanningError::PartitionAlreadySet {
                stream: self.spec.id().to_string(),
            });
        }
        Ok(Self {
            partitions: Some(partitions),
            ..self
        })
    }
}

impl PartialEq for StreamEdge {
    // Two edges are equal iff they address the same physical stream.
    fn eq(&self, other: &StreamEdge) -> bool {
        self.spec == other.spec
    }
}

impl Eq for StreamEdge {}

#[cfg(test)]
mod tests {
    use super::*;

    // Tests that equality tracks the physical stream, not the logical id.
    #[test]
    fn test_spec_identity() {
        let a = StreamSpec::new("clicks", "kafka", "ClickEvent");
        let b = StreamSpec::new("clicks-reread", "kafka", "ClickEvent");
        let c = StreamSpec::new("clicks", "eventhub", "ClickEvent");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    // Tests that a partition count can be set exactly once.
    #[test]
    fn test_write_once_partition_count() {
        let edge = StreamEdge::new(
            StreamSpec::new("clicks", "kafka", "ClickEvent"),
            EdgeRole::Input,
        );
        assert_eq!(edge.partition_count(), None);

        let resolved = edge.with_partition_count(8).unwrap();
        assert_eq!(resolved.partition_count(), Some(8));

        match resolved.with_partition_count(16) {
            Err(PlanningError::PartitionAlreadySet { stream }) => assert_eq!(stream, "clicks"),
            other => panic!("expected PartitionAlreadySet, got {:?}", other),
        }
    }
}
