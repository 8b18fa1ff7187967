use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::{
    errors::{MetadataError, PlanningError},
    job_graph::JobGraph,
    planner::StreamSet,
    stream_edge::EdgeRole,
};

/// The maximum partition count inferred for an intermediate stream whose
/// count is not pinned down by a join group.
pub const MAX_INFERRED_PARTITION_COUNT: usize = 256;

/// Trait for the external service that knows how streams are partitioned.
///
/// Implementations must return a count for every requested stream or signal
/// failure; the planner never invents a default count.
pub trait StreamMetadataProvider {
    /// Fetches the partition counts of the named streams within `system` in
    /// one batched lookup.
    fn partition_counts(
        &self,
        system: &str,
        streams: &BTreeSet<String>,
    ) -> Result<HashMap<String, usize>, MetadataError>;
}

/// Resolves the partition counts of the externally owned streams of `graph`.
///
/// Consumes the unresolved graph and returns a new graph whose input,
/// side-input, and output edges carry partition counts. Edges are grouped by
/// owning system and resolved with exactly one batched lookup per system, so
/// the number of external calls is bounded by the number of distinct systems
/// rather than the number of streams.
///
/// Intermediate streams are never resolved here: the framework, not the
/// messaging system, owns their creation, so their counts are assigned by a
/// [`PartitionAssigner`] once the join groups are known.
pub(crate) fn resolve_partition_counts<M: StreamMetadataProvider>(
    graph: JobGraph,
    provider: &M,
) -> Result<JobGraph, PlanningError> {
    // Group the unresolved external edges by owning system. Within a system,
    // map every physical stream name to the logical ids declared for it.
    let mut system_to_streams: BTreeMap<String, BTreeMap<String, Vec<String>>> = BTreeMap::new();
    for (id, edge) in graph.stream_edges().iter() {
        if edge.role() == EdgeRole::Intermediate || edge.partition_count().is_some() {
            continue;
        }
        system_to_streams
            .entry(edge.spec().system().to_string())
            .or_insert_with(BTreeMap::new)
            .entry(edge.spec().stream().to_string())
            .or_insert_with(Vec::new)
            .push(id.clone());
    }

    let mut streams = graph.stream_edges().clone();
    for (system, stream_to_ids) in system_to_streams.iter() {
        let names: BTreeSet<String> = stream_to_ids.keys().cloned().collect();
        let counts = provider.partition_counts(system, &names)?;

        for (name, ids) in stream_to_ids.iter() {
            let partitions = *counts.get(name).ok_or_else(|| {
                PlanningError::PartitionResolution(format!(
                    "The metadata lookup for system {} did not return a partition count \
                     for stream {}",
                    system, name
                ))
            })?;
            tracing::info!(
                "Fetched partition count {} for stream {}.{}",
                partitions,
                system,
                name
            );
            for id in ids.iter() {
                let edge = streams.remove(id).ok_or_else(|| {
                    PlanningError::InvalidGraph(format!("Unknown stream edge {}", id))
                })?;
                streams.insert(id.clone(), edge.with_partition_count(partitions)?);
            }
        }
    }

    Ok(graph.with_stream_edges(streams))
}

/// Trait for the planning step that decides how intermediate streams are
/// partitioned.
///
/// Invoked only when the plan contains intermediate streams, after join
/// grouping, so that joined intermediate streams can be co-partitioned with
/// their partners.
pub trait PartitionAssigner {
    fn assign_partitions(
        &self,
        graph: &mut JobGraph,
        join_groups: &[StreamSet],
    ) -> Result<(), PlanningError>;
}

/// The default intermediate-stream partitioning policy.
///
/// Join groups pin down counts first: an unresolved intermediate stream in a
/// group takes the count of the group's resolved members, iterated until no
/// more assignments are possible so that chained groups converge. Any
/// intermediate stream left over takes the maximum input-stream count of the
/// plan, capped at [`MAX_INFERRED_PARTITION_COUNT`].
#[derive(Debug, Default)]
pub struct IntermediateStreamManager;

impl IntermediateStreamManager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PartitionAssigner for IntermediateStreamManager {
    fn assign_partitions(
        &self,
        graph: &mut JobGraph,
        join_groups: &[StreamSet],
    ) -> Result<(), PlanningError> {
        // Propagate resolved counts within join groups until a fixpoint.
        loop {
            let mut assigned = false;
            for group in join_groups.iter() {
                let group_count = group
                    .stream_ids()
                    .iter()
                    .filter_map(|id| graph.stream_edge(id))
                    .filter_map(|edge| edge.partition_count())
                    .next();
                let group_count = match group_count {
                    Some(count) => count,
                    None => continue,
                };

                let unresolved: Vec<String> = group
                    .stream_ids()
                    .iter()
                    .filter(|id| {
                        graph
                            .stream_edge(id.as_str())
                            .map(|e| {
                                e.role() == EdgeRole::Intermediate
                                    && e.partition_count().is_none()
                            })
                            .unwrap_or(false)
                    })
                    .cloned()
                    .collect();
                for id in unresolved {
                    tracing::debug!(
                        "Assigning {} partitions to intermediate stream {} from join {}",
                        group_count,
                        id,
                        group.id()
                    );
                    graph.set_partition_count(&id, group_count)?;
                    assigned = true;
                }
            }
            if !assigned {
                break;
            }
        }

        // Any intermediate stream not constrained by a join follows the
        // widest input stream of the plan.
        let unconstrained: Vec<String> = graph
            .intermediate_streams()
            .iter()
            .filter(|e| e.partition_count().is_none())
            .map(|e| e.spec().id().to_string())
            .collect();
        if unconstrained.is_empty() {
            return Ok(());
        }

        let max_input = graph
            .input_streams()
            .iter()
            .filter_map(|e| e.partition_count())
            .max()
            .ok_or_else(|| {
                PlanningError::PartitionResolution(format!(
                    "Cannot infer a partition count for intermediate stream {}: the plan \
                     has no resolved input streams",
                    unconstrained[0]
                ))
            })?;
        let inferred = max_input.min(MAX_INFERRED_PARTITION_COUNT);
        for id in unconstrained {
            tracing::debug!(
                "Assigning {} partitions to intermediate stream {}",
                inferred,
                id
            );
            graph.set_partition_count(&id, inferred)?;
        }

        Ok(())
    }
}
