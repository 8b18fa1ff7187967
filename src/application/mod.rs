//! The logical description of a Tributary application.
//!
//! An [`ApplicationDescriptor`] declares the streams an application reads and
//! writes, the tables it joins against, and the graph of logical operators
//! connecting them. The descriptor is purely declarative: it is handed to the
//! [`ExecutionPlanner`](crate::execution::ExecutionPlanner), which compiles it
//! into a physical [`JobGraph`](crate::execution::JobGraph).

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};

use crate::execution::{PlanningError, StreamSpec};

// Private submodules
mod operators;
mod tables;

// Public exports
pub use operators::{JoinKind, OperatorSpec};
pub use tables::TableSpec;

/// The logical declaration of an application's dataflow.
#[derive(Debug, Clone, Default)]
pub struct ApplicationDescriptor {
    /// The name of the application.
    name: String,
    /// Ids of the streams the application reads, in declaration order.
    input_stream_ids: Vec<String>,
    /// Ids of the streams the application writes, in declaration order.
    output_stream_ids: Vec<String>,
    /// Every stream the application refers to, keyed by logical id.
    streams: HashMap<String, StreamSpec>,
    /// The tables the application joins against.
    tables: Vec<TableSpec>,
    /// The logical operator graph.
    operators: DiGraph<OperatorSpec, ()>,
    /// Mapping from operator id to its vertex in the operator graph.
    operator_indices: HashMap<String, NodeIndex>,
    /// Whether the planner validates the structural well-formedness of the
    /// plan built from this descriptor. On by default; legacy low-level
    /// applications which declare no logical dataflow opt out explicitly.
    skip_graph_validation: bool,
}

impl ApplicationDescriptor {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declares a stream the application reads.
    ///
    /// A stream declared as both input and output is classified as an
    /// intermediate stream of the application by the planner.
    pub fn add_input_stream(&mut self, spec: StreamSpec) {
        let id = spec.id().to_string();
        self.streams.insert(id.clone(), spec);
        if !self.input_stream_ids.contains(&id) {
            self.input_stream_ids.push(id);
        }
    }

    /// Declares a stream the application writes.
    pub fn add_output_stream(&mut self, spec: StreamSpec) {
        let id = spec.id().to_string();
        self.streams.insert(id.clone(), spec);
        if !self.output_stream_ids.contains(&id) {
            self.output_stream_ids.push(id);
        }
    }

    /// Registers a stream the application refers to without reading or
    /// writing it directly, e.g. a table's side-input stream.
    pub fn register_stream(&mut self, spec: StreamSpec) {
        self.streams.insert(spec.id().to_string(), spec);
    }

    /// Declares a table the application joins against.
    pub fn add_table(&mut self, table: TableSpec) {
        self.tables.push(table);
    }

    /// Adds an operator reading the stream declared under `stream_id`.
    pub fn add_input_operator(&mut self, id: &str, stream_id: &str) -> Result<(), PlanningError> {
        self.add_operator(OperatorSpec::Input {
            id: id.to_string(),
            stream_id: stream_id.to_string(),
        })
    }

    /// Adds a stateless transformation operator.
    pub fn add_transform_operator(&mut self, id: &str) -> Result<(), PlanningError> {
        self.add_operator(OperatorSpec::Transform { id: id.to_string() })
    }

    /// Adds a join operator of the given kind.
    pub fn add_join_operator(&mut self, id: &str, kind: JoinKind) -> Result<(), PlanningError> {
        self.add_operator(OperatorSpec::Join {
            id: id.to_string(),
            kind,
        })
    }

    /// Adds an operator writing the stream declared under `stream_id`.
    pub fn add_output_operator(&mut self, id: &str, stream_id: &str) -> Result<(), PlanningError> {
        self.add_operator(OperatorSpec::Output {
            id: id.to_string(),
            stream_id: stream_id.to_string(),
        })
    }

    fn add_operator(&mut self, spec: OperatorSpec) -> Result<(), PlanningError> {
        let id = spec.id().to_string();
        if self.operator_indices.contains_key(&id) {
            return Err(PlanningError::InvalidGraph(format!(
                "An operator with id {} has already been declared",
                id
            )));
        }
        let index = self.operators.add_node(spec);
        self.operator_indices.insert(id, index);
        Ok(())
    }

    /// Connects the output of operator `from` to the input of operator `to`.
    pub fn connect(&mut self, from: &str, to: &str) -> Result<(), PlanningError> {
        let from_index = *self.operator_indices.get(from).ok_or_else(|| {
            PlanningError::InvalidGraph(format!("Cannot connect unknown operator {}", from))
        })?;
        let to_index = *self.operator_indices.get(to).ok_or_else(|| {
            PlanningError::InvalidGraph(format!("Cannot connect unknown operator {}", to))
        })?;
        self.operators.add_edge(from_index, to_index, ());
        Ok(())
    }

    /// Opts this descriptor out of structural plan validation.
    ///
    /// Only legacy low-level applications which declare no input streams
    /// should opt out; plans built from descriptors with inputs are always
    /// worth validating.
    pub fn skip_graph_validation(mut self) -> Self {
        self.skip_graph_validation = true;
        self
    }

    pub fn validates_graph(&self) -> bool {
        !self.skip_graph_validation
    }

    pub fn input_stream_ids(&self) -> &[String] {
        &self.input_stream_ids
    }

    pub fn output_stream_ids(&self) -> &[String] {
        &self.output_stream_ids
    }

    /// Looks up the declaration of the stream with the given logical id.
    pub fn stream_spec(&self, id: &str) -> Option<&StreamSpec> {
        self.streams.get(id)
    }

    pub fn tables(&self) -> &[TableSpec] {
        &self.tables
    }

    /// Looks up the declaration of the table with the given id.
    pub fn table(&self, id: &str) -> Option<&TableSpec> {
        self.tables.iter().find(|t| t.id() == id)
    }

    pub(crate) fn operator_graph(&self) -> &DiGraph<OperatorSpec, ()> {
        &self.operators
    }

    pub(crate) fn operator_index(&self, id: &str) -> Option<NodeIndex> {
        self.operator_indices.get(id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Tests that declaring the same operator id twice is rejected.
    #[test]
    fn test_duplicate_operator_rejected() {
        let mut app = ApplicationDescriptor::new("app");
        app.add_input_operator("read", "in").unwrap();
        assert!(app.add_transform_operator("read").is_err());
    }

    // Tests that connecting unknown operators is rejected.
    #[test]
    fn test_connect_unknown_operator_rejected() {
        let mut app = ApplicationDescriptor::new("app");
        app.add_input_operator("read", "in").unwrap();
        assert!(app.connect("read", "absent").is_err());
        assert!(app.connect("absent", "read").is_err());
    }

    // Tests that a stream declared as both input and output keeps one entry
    // in each id list.
    #[test]
    fn test_stream_declared_in_both_directions() {
        let mut app = ApplicationDescriptor::new("app");
        let spec = StreamSpec::new("repartitioned", "kafka", "Repartitioned");
        app.add_input_stream(spec.clone());
        app.add_output_stream(spec.clone());
        app.add_input_stream(spec);
        assert_eq!(app.input_stream_ids(), &["repartitioned".to_string()]);
        assert_eq!(app.output_stream_ids(), &["repartitioned".to_string()]);
    }
}
