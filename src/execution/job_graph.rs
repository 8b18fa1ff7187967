use std::{
    collections::HashMap,
    fs::File,
    io::prelude::*,
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::{ApplicationDescriptor, JoinKind, OperatorSpec, TableSpec};

use super::{
    errors::PlanningError,
    stream_edge::{EdgeRole, StreamEdge, StreamSpec},
};

/// One physical unit of deployment within a [`JobGraph`].
///
/// A job node holds the slice of the logical operator graph it executes and
/// the streams and tables attached to it. In the current planning phase the
/// whole logical graph maps onto a single node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobNode {
    name: String,
    id: String,
    input_streams: Vec<String>,
    output_streams: Vec<String>,
    tables: Vec<String>,
}

impl JobNode {
    fn new(name: &str, id: &str) -> Self {
        Self {
            name: name.to_string(),
            id: id.to_string(),
            input_streams: Vec::new(),
            output_streams: Vec::new(),
            tables: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Ids of the streams the node reads, including intermediate streams.
    pub fn input_streams(&self) -> &[String] {
        &self.input_streams
    }

    /// Ids of the streams the node writes, including intermediate streams.
    pub fn output_streams(&self) -> &[String] {
        &self.output_streams
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }
}

/// The physical execution plan compiled from an [`ApplicationDescriptor`].
///
/// The job graph owns every stream edge of the plan, classified by role, the
/// job nodes the logical graph was assigned to, and the tables attached to
/// those nodes. It is built and mutated by a single planning pass and
/// immutable to all other readers once returned.
#[derive(Clone)]
pub struct JobGraph {
    /// Unique id of the planning pass that produced this graph.
    plan_id: Uuid,
    /// Mapping from job id to the node deployed under that id.
    nodes: HashMap<String, JobNode>,
    /// Mapping from logical stream id to the stream's edge in the plan.
    streams: HashMap<String, StreamEdge>,
    /// The tables attached to the plan's nodes.
    tables: Vec<TableSpec>,
    /// The logical application this plan was compiled from.
    descriptor: Arc<ApplicationDescriptor>,
}

impl JobGraph {
    pub(crate) fn new(descriptor: Arc<ApplicationDescriptor>) -> Self {
        Self {
            plan_id: Uuid::new_v4(),
            nodes: HashMap::new(),
            streams: HashMap::new(),
            tables: Vec::new(),
            descriptor,
        }
    }

    pub fn plan_id(&self) -> Uuid {
        self.plan_id
    }

    pub fn descriptor(&self) -> &ApplicationDescriptor {
        &self.descriptor
    }

    /// Retrieves the node deployed under `id`, creating it if absent.
    pub(crate) fn get_or_create_node(&mut self, name: &str, id: &str) -> &mut JobNode {
        self.nodes
            .entry(id.to_string())
            .or_insert_with(|| JobNode::new(name, id))
    }

    /// Attaches an input stream read by the node deployed under `node_id`.
    pub(crate) fn add_input_stream(&mut self, spec: StreamSpec, node_id: &str) {
        let id = spec.id().to_string();
        self.streams
            .entry(id.clone())
            .or_insert_with(|| StreamEdge::new(spec, EdgeRole::Input));
        if let Some(node) = self.nodes.get_mut(node_id) {
            node.input_streams.push(id);
        }
    }

    /// Attaches an output stream written by the node deployed under `node_id`.
    pub(crate) fn add_output_stream(&mut self, spec: StreamSpec, node_id: &str) {
        let id = spec.id().to_string();
        self.streams
            .entry(id.clone())
            .or_insert_with(|| StreamEdge::new(spec, EdgeRole::Output));
        if let Some(node) = self.nodes.get_mut(node_id) {
            node.output_streams.push(id);
        }
    }

    /// Attaches an intermediate stream written by `source_id` and read by
    /// `dest_id` (possibly the same node).
    pub(crate) fn add_intermediate_stream(
        &mut self,
        spec: StreamSpec,
        source_id: &str,
        dest_id: &str,
    ) {
        let id = spec.id().to_string();
        self.streams
            .entry(id.clone())
            .or_insert_with(|| StreamEdge::new(spec, EdgeRole::Intermediate));
        if let Some(source) = self.nodes.get_mut(source_id) {
            source.output_streams.push(id.clone());
        }
        if let Some(dest) = self.nodes.get_mut(dest_id) {
            dest.input_streams.push(id);
        }
    }

    /// Attaches a table to the node deployed under `node_id`.
    pub(crate) fn add_table(&mut self, table: TableSpec, node_id: &str) {
        if let Some(node) = self.nodes.get_mut(node_id) {
            node.tables.push(table.id().to_string());
        }
        if !self.tables.iter().any(|t| t.id() == table.id()) {
            self.tables.push(table);
        }
    }

    /// Adds (or reuses) the edge of a stream feeding a table.
    ///
    /// A stream already present in the plan keeps its existing role; the
    /// side-input role only applies to streams the application neither reads
    /// nor writes directly.
    pub(crate) fn add_side_input_stream(&mut self, spec: StreamSpec) {
        self.streams
            .entry(spec.id().to_string())
            .or_insert_with(|| StreamEdge::new(spec, EdgeRole::SideInput));
    }

    /// Looks up the edge of the stream declared under `id`.
    pub fn stream_edge(&self, id: &str) -> Option<&StreamEdge> {
        self.streams.get(id)
    }

    pub(crate) fn stream_edges(&self) -> &HashMap<String, StreamEdge> {
        &self.streams
    }

    /// Replaces the plan's stream edges, e.g. with resolved copies.
    pub(crate) fn with_stream_edges(mut self, streams: HashMap<String, StreamEdge>) -> Self {
        self.streams = streams;
        self
    }

    /// Sets the partition count of a stream in place.
    ///
    /// Counts are write-once: assigning a second count to the same stream is
    /// an error.
    pub(crate) fn set_partition_count(
        &mut self,
        stream_id: &str,
        partitions: usize,
    ) -> Result<(), PlanningError> {
        let edge = self.streams.remove(stream_id).ok_or_else(|| {
            PlanningError::InvalidGraph(format!(
                "Cannot assign partitions to unknown stream {}",
                stream_id
            ))
        })?;
        let edge = edge.with_partition_count(partitions)?;
        self.streams.insert(stream_id.to_string(), edge);
        Ok(())
    }

    pub fn nodes(&self) -> impl Iterator<Item = &JobNode> {
        self.nodes.values()
    }

    pub fn tables(&self) -> &[TableSpec] {
        &self.tables
    }

    fn edges_with_role(&self, role: EdgeRole) -> Vec<&StreamEdge> {
        self.streams.values().filter(|e| e.role() == role).collect()
    }

    pub fn input_streams(&self) -> Vec<&StreamEdge> {
        self.edges_with_role(EdgeRole::Input)
    }

    pub fn output_streams(&self) -> Vec<&StreamEdge> {
        self.edges_with_role(EdgeRole::Output)
    }

    pub fn intermediate_streams(&self) -> Vec<&StreamEdge> {
        self.edges_with_role(EdgeRole::Intermediate)
    }

    pub fn side_input_streams(&self) -> Vec<&StreamEdge> {
        self.edges_with_role(EdgeRole::SideInput)
    }

    /// Checks the structural well-formedness of the plan.
    ///
    /// Every stream referenced by a node or a logical operator must exist in
    /// the plan, every intermediate stream must be both written and read by
    /// some node, and every stream-table join must refer to a declared table.
    pub fn validate(&self) -> Result<(), PlanningError> {
        for node in self.nodes.values() {
            for stream_id in node.input_streams().iter().chain(node.output_streams()) {
                if !self.streams.contains_key(stream_id) {
                    return Err(PlanningError::InvalidGraph(format!(
                        "Node {} references stream {} which is not part of the plan",
                        node.id(),
                        stream_id
                    )));
                }
            }
            for table_id in node.tables() {
                if !self.tables.iter().any(|t| t.id() == table_id) {
                    return Err(PlanningError::InvalidGraph(format!(
                        "Node {} references table {} which is not part of the plan",
                        node.id(),
                        table_id
                    )));
                }
            }
        }

        for (stream_id, edge) in self.streams.iter() {
            if edge.role() != EdgeRole::Intermediate {
                continue;
            }
            let written = self
                .nodes
                .values()
                .any(|n| n.output_streams().contains(stream_id));
            let read = self
                .nodes
                .values()
                .any(|n| n.input_streams().contains(stream_id));
            if !written || !read {
                return Err(PlanningError::InvalidGraph(format!(
                    "Intermediate stream {} must be both written and read within the plan",
                    stream_id
                )));
            }
        }

        for table in self.tables.iter() {
            for side_input in table.side_inputs() {
                if !self.streams.contains_key(side_input) {
                    return Err(PlanningError::InvalidGraph(format!(
                        "Side input {} of table {} is not part of the plan",
                        side_input,
                        table.id()
                    )));
                }
            }
        }

        let operator_graph = self.descriptor.operator_graph();
        for index in operator_graph.node_indices() {
            match &operator_graph[index] {
                OperatorSpec::Input { id, stream_id } | OperatorSpec::Output { id, stream_id } => {
                    if !self.streams.contains_key(stream_id) {
                        return Err(PlanningError::InvalidGraph(format!(
                            "Operator {} references stream {} which is not part of the plan",
                            id, stream_id
                        )));
                    }
                }
                OperatorSpec::Join {
                    id,
                    kind: JoinKind::StreamTable { table_id },
                } => {
                    if !self.tables.iter().any(|t| t.id() == table_id) {
                        return Err(PlanningError::InvalidGraph(format!(
                            "Join {} references table {} which is not part of the plan",
                            id, table_id
                        )));
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Exports the physical plan to a Graphviz file (*.gv, *.dot).
    pub fn to_graph_viz(&self, filename: &str) -> std::io::Result<()> {
        let mut file = File::create(filename)?;
        writeln!(file, "digraph tributary_plan {{")?;

        writeln!(file, "   // Job nodes")?;
        for node in self.nodes.values() {
            writeln!(
                file,
                "   \"{}\" [shape=box,label=\"{}\\n(Job {})\"];",
                node.id(),
                node.name(),
                node.id(),
            )?;
        }

        writeln!(file, "   // Streams")?;
        for (stream_id, edge) in self.streams.iter() {
            let label = match edge.partition_count() {
                Some(partitions) => format!("{} ({}, {} partitions)", stream_id, edge.role(), partitions),
                None => format!("{} ({})", stream_id, edge.role()),
            };
            match edge.role() {
                EdgeRole::Input => {
                    writeln!(file, "   \"{}\" [shape=ellipse];", edge.spec())?;
                    for node in self
                        .nodes
                        .values()
                        .filter(|n| n.input_streams().contains(stream_id))
                    {
                        writeln!(
                            file,
                            "   \"{}\" -> \"{}\" [label=\"{}\"];",
                            edge.spec(),
                            node.id(),
                            label
                        )?;
                    }
                }
                EdgeRole::SideInput => {
                    // Side inputs point at the nodes holding the tables they feed.
                    writeln!(file, "   \"{}\" [shape=ellipse];", edge.spec())?;
                    for node in self.nodes.values().filter(|n| {
                        n.tables().iter().any(|table_id| {
                            self.tables
                                .iter()
                                .find(|t| t.id() == table_id)
                                .map(|t| t.side_inputs().contains(stream_id))
                                .unwrap_or(false)
                        })
                    }) {
                        writeln!(
                            file,
                            "   \"{}\" -> \"{}\" [label=\"{}\"];",
                            edge.spec(),
                            node.id(),
                            label
                        )?;
                    }
                }
                EdgeRole::Output => {
                    writeln!(file, "   \"{}\" [shape=ellipse];", edge.spec())?;
                    for node in self
                        .nodes
                        .values()
                        .filter(|n| n.output_streams().contains(stream_id))
                    {
                        writeln!(
                            file,
                            "   \"{}\" -> \"{}\" [label=\"{}\"];",
                            node.id(),
                            edge.spec(),
                            label
                        )?;
                    }
                }
                EdgeRole::Intermediate => {
                    for source in self
                        .nodes
                        .values()
                        .filter(|n| n.output_streams().contains(stream_id))
                    {
                        for dest in self
                            .nodes
                            .values()
                            .filter(|n| n.input_streams().contains(stream_id))
                        {
                            writeln!(
                                file,
                                "   \"{}\" -> \"{}\" [label=\"{}\"];",
                                source.id(),
                                dest.id(),
                                label
                            )?;
                        }
                    }
                }
            }
        }

        writeln!(file, "}}")?;
        file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with_node() -> JobGraph {
        let descriptor = Arc::new(ApplicationDescriptor::new("app"));
        let mut graph = JobGraph::new(descriptor);
        graph.get_or_create_node("app", "1");
        graph
    }

    // Tests that an intermediate stream appears in a node's output set and
    // input set after attachment.
    #[test]
    fn test_intermediate_stream_attachment() {
        let mut graph = graph_with_node();
        graph.add_intermediate_stream(
            StreamSpec::new("repartitioned", "kafka", "Repartitioned"),
            "1",
            "1",
        );

        let node = graph.nodes().next().unwrap();
        assert!(node.output_streams().contains(&"repartitioned".to_string()));
        assert!(node.input_streams().contains(&"repartitioned".to_string()));
        assert!(graph.validate().is_ok());
    }

    // Tests that validation rejects a node referencing a stream that was
    // never attached to the plan.
    #[test]
    fn test_validate_dangling_stream_reference() {
        let mut graph = graph_with_node();
        graph
            .nodes
            .get_mut("1")
            .unwrap()
            .input_streams
            .push("phantom".to_string());
        assert!(graph.validate().is_err());
    }

    // Tests that a stream already attached as an input keeps its role when
    // later referenced as a table side input.
    #[test]
    fn test_side_input_reuses_existing_edge() {
        let mut graph = graph_with_node();
        let spec = StreamSpec::new("profiles", "kafka", "ProfileChangelog");
        graph.add_input_stream(spec.clone(), "1");
        graph.add_side_input_stream(spec);
        assert_eq!(
            graph.stream_edge("profiles").unwrap().role(),
            EdgeRole::Input
        );
    }

    // Tests that validation rejects a table whose side input is missing from
    // the plan.
    #[test]
    fn test_validate_missing_side_input() {
        let mut graph = graph_with_node();
        graph.add_table(
            TableSpec::new("profile-table").with_side_inputs(vec!["profiles"]),
            "1",
        );
        assert!(graph.validate().is_err());
    }
}
