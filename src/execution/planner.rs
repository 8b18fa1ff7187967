use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use crate::{
    application::{ApplicationDescriptor, JoinKind},
    configuration::{ApplicationMode, Configuration},
};

use super::{
    errors::PlanningError,
    graph_analyzer,
    job_graph::JobGraph,
    partitions::{
        resolve_partition_counts, IntermediateStreamManager, PartitionAssigner,
        StreamMetadataProvider,
    },
    stream_edge::StreamSpec,
};

/// A named set of streams whose partition counts must agree.
///
/// One set exists per join operator of the plan, named by the operator's id.
/// Membership is recorded by logical stream id, deduplicated by physical
/// stream identity, and ordered so that validation picks its reference member
/// reproducibly. A set only lives for the planning pass that built it.
#[derive(Debug, Clone)]
pub struct StreamSet {
    id: String,
    stream_ids: BTreeSet<String>,
}

impl StreamSet {
    pub(crate) fn new(id: &str, stream_ids: BTreeSet<String>) -> Self {
        Self {
            id: id.to_string(),
            stream_ids,
        }
    }

    /// The id of the join operator the set belongs to.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The logical ids of the member streams.
    pub fn stream_ids(&self) -> &BTreeSet<String> {
        &self.stream_ids
    }
}

/// Compiles an [`ApplicationDescriptor`] into a physical [`JobGraph`].
///
/// Planning is a single synchronous pass: the logical graph is classified
/// into a job graph, externally owned streams are resolved against the
/// metadata provider, the streams feeding each join are grouped, intermediate
/// streams are partitioned, and every join group is checked for partition
/// agreement. Any failure aborts the pass; no partial plan is ever returned.
pub struct ExecutionPlanner<M: StreamMetadataProvider> {
    config: Configuration,
    metadata_provider: M,
    partition_assigner: Box<dyn PartitionAssigner>,
}

impl<M: StreamMetadataProvider> ExecutionPlanner<M> {
    pub fn new(config: Configuration, metadata_provider: M) -> Self {
        Self {
            config,
            metadata_provider,
            partition_assigner: Box::new(IntermediateStreamManager::new()),
        }
    }

    /// Replaces the intermediate-stream partitioning policy.
    pub fn with_partition_assigner(mut self, assigner: Box<dyn PartitionAssigner>) -> Self {
        self.partition_assigner = assigner;
        self
    }

    /// Plans the execution of `descriptor` under this planner's configuration.
    pub fn plan(&self, descriptor: &ApplicationDescriptor) -> Result<JobGraph, PlanningError> {
        self.validate_config()?;

        // Create the physical job graph from the logical application.
        let graph = self.create_job_graph(descriptor)?;

        // Fetch the partition counts of the externally owned streams.
        let mut graph = resolve_partition_counts(graph, &self.metadata_provider)?;

        // Group the streams participating in joins together into sets.
        let join_groups = group_joined_streams(&graph)?;

        // Set the partition counts of intermediate streams, if any.
        if !graph.intermediate_streams().is_empty() {
            self.partition_assigner
                .assign_partitions(&mut graph, &join_groups)?;
        }

        // Verify that every group of joined streams agrees on partitions.
        for group in join_groups.iter() {
            validate_partitions(&graph, group)?;
        }

        if let Some(filename) = &self.config.graph_filename {
            if let Err(e) = graph.to_graph_viz(filename) {
                tracing::error!("Unable to export the plan to {}: {}", filename, e);
            }
        }

        tracing::debug!(
            "Planned application {} as plan {}",
            descriptor.name(),
            graph.plan_id()
        );
        Ok(graph)
    }

    fn validate_config(&self) -> Result<(), PlanningError> {
        // Host affinity assumes long-lived tasks; batch jobs have none.
        if self.config.mode == ApplicationMode::Batch && self.config.host_affinity {
            return Err(PlanningError::ConfigConflict(
                "Host affinity is not supported in batch mode. \
                 Please configure host-affinity=false."
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Creates the physical graph from the logical application.
    fn create_job_graph(
        &self,
        descriptor: &ApplicationDescriptor,
    ) -> Result<JobGraph, PlanningError> {
        let descriptor = Arc::new(descriptor.clone());
        let mut graph = JobGraph::new(descriptor.clone());

        // Source streams contain both input and intermediate streams; sink
        // streams contain both output and intermediate streams.
        let source_specs = stream_specs(&descriptor, descriptor.input_stream_ids())?;
        let sink_specs = stream_specs(&descriptor, descriptor.output_stream_ids())?;
        let source_set: HashSet<&StreamSpec> = source_specs.iter().collect();
        let sink_set: HashSet<&StreamSpec> = sink_specs.iter().collect();

        // For this phase, the whole logical graph maps onto a single node.
        let node_id = self.config.job_id.clone();
        graph.get_or_create_node(&self.config.job_name, &node_id);

        // A stream both read and written by the application is intermediate;
        // the remaining sources are inputs and the remaining sinks outputs.
        let mut intermediate_ids: HashSet<String> = HashSet::new();
        for spec in source_specs.iter() {
            if sink_set.contains(spec) {
                intermediate_ids.insert(spec.id().to_string());
                graph.add_intermediate_stream(spec.clone(), &node_id, &node_id);
            } else {
                graph.add_input_stream(spec.clone(), &node_id);
            }
        }
        for spec in sink_specs.iter() {
            if !source_set.contains(spec) {
                graph.add_output_stream(spec.clone(), &node_id);
            } else if !intermediate_ids.contains(spec.id()) {
                // The same physical stream declared under a second logical id.
                graph.add_intermediate_stream(spec.clone(), &node_id, &node_id);
            }
        }

        // Attach tables and the streams feeding them.
        for table in descriptor.tables().iter() {
            graph.add_table(table.clone(), &node_id);
            for side_input in table.side_inputs() {
                let spec = descriptor.stream_spec(side_input).ok_or_else(|| {
                    PlanningError::InvalidGraph(format!(
                        "Side input {} of table {} has no stream declaration",
                        side_input,
                        table.id()
                    ))
                })?;
                graph.add_side_input_stream(spec.clone());
            }
        }

        if descriptor.validates_graph() {
            graph.validate()?;
        }

        Ok(graph)
    }
}

fn stream_specs(
    descriptor: &ApplicationDescriptor,
    ids: &[String],
) -> Result<Vec<StreamSpec>, PlanningError> {
    ids.iter()
        .map(|id| {
            descriptor.stream_spec(id).cloned().ok_or_else(|| {
                PlanningError::InvalidGraph(format!("Stream {} has no declaration", id))
            })
        })
        .collect()
}

/// Groups the streams participating in joins together.
///
/// Every join operator yields one [`StreamSet`] holding the streams read by
/// the input operators feeding it. A stream-table join additionally pulls the
/// joined table's side-input streams into its set: the join is only correct
/// if the table is partitioned like the stream side.
pub(crate) fn group_joined_streams(graph: &JobGraph) -> Result<Vec<StreamSet>, PlanningError> {
    let descriptor = graph.descriptor();
    let joins = graph_analyzer::join_to_input_operators(descriptor);

    let mut stream_sets = Vec::with_capacity(joins.len());
    for (join_id, input_operators) in joins.iter() {
        // Map the joined input operators to the streams they read,
        // deduplicated by physical stream identity.
        let mut members: BTreeSet<String> = BTreeSet::new();
        let mut seen: HashSet<StreamSpec> = HashSet::new();
        for operator_id in input_operators.iter() {
            let stream_id = graph_analyzer::input_operator_stream(descriptor, operator_id)
                .ok_or_else(|| {
                    PlanningError::InvalidGraph(format!(
                        "Join {} is fed by {} which is not an input operator",
                        join_id, operator_id
                    ))
                })?;
            let edge = graph.stream_edge(stream_id).ok_or_else(|| {
                PlanningError::InvalidGraph(format!(
                    "Stream {} read by operator {} is not part of the plan",
                    stream_id, operator_id
                ))
            })?;
            if seen.insert(edge.spec().clone()) {
                members.insert(stream_id.to_string());
            }
        }

        // A stream-table join must also agree with the table's side inputs.
        if let Some(JoinKind::StreamTable { table_id }) =
            graph_analyzer::join_kind(descriptor, join_id)
        {
            let table = descriptor.table(table_id).ok_or_else(|| {
                PlanningError::InvalidGraph(format!(
                    "Join {} references table {} which is not declared",
                    join_id, table_id
                ))
            })?;
            for side_input in table.side_inputs() {
                let edge = graph.stream_edge(side_input).ok_or_else(|| {
                    PlanningError::InvalidGraph(format!(
                        "Side input {} of table {} is not part of the plan",
                        side_input, table_id
                    ))
                })?;
                if seen.insert(edge.spec().clone()) {
                    members.insert(side_input.clone());
                }
            }
        }

        stream_sets.push(StreamSet::new(join_id, members));
    }

    Ok(stream_sets)
}

/// Verifies that all members of `group` agree on one partition count.
///
/// Joins route identical keys to identical physical tasks; members with
/// unequal counts would corrupt join results silently at runtime, so any
/// disagreement fails the plan. Members must already be resolved: an
/// unresolved member is a precondition defect, not a mismatch.
pub(crate) fn validate_partitions(
    graph: &JobGraph,
    group: &StreamSet,
) -> Result<(), PlanningError> {
    let mut members = group.stream_ids().iter();
    let reference_id = members
        .next()
        .ok_or_else(|| PlanningError::EmptyJoinGroup(group.id().to_string()))?;
    let reference_partitions = partition_count(graph, group, reference_id)?;

    for stream_id in members {
        let partitions = partition_count(graph, group, stream_id)?;
        if partitions != reference_partitions {
            return Err(PlanningError::PartitionMismatch {
                group: group.id().to_string(),
                stream: reference_id.to_string(),
                expected: reference_partitions,
                actual: partitions,
            });
        }
    }

    Ok(())
}

fn partition_count(
    graph: &JobGraph,
    group: &StreamSet,
    stream_id: &str,
) -> Result<usize, PlanningError> {
    let edge = graph.stream_edge(stream_id).ok_or_else(|| {
        PlanningError::InvalidGraph(format!(
            "Stream {} in the join {} is not part of the plan",
            stream_id,
            group.id()
        ))
    })?;
    edge.partition_count()
        .ok_or_else(|| PlanningError::UnresolvedPartition {
            group: group.id().to_string(),
            stream: stream_id.to_string(),
        })
}
