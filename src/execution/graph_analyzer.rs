use std::collections::{BTreeMap, BTreeSet};

use petgraph::visit::Dfs;

use crate::application::{ApplicationDescriptor, JoinKind, OperatorSpec};

/// Groups the input operators of `descriptor` by the join operators they feed.
///
/// An input operator feeds every join operator reachable from it in the
/// logical operator graph. The grouping is keyed and ordered by join operator
/// id so that downstream error messages are reproducible.
pub(crate) fn join_to_input_operators(
    descriptor: &ApplicationDescriptor,
) -> BTreeMap<String, BTreeSet<String>> {
    let graph = descriptor.operator_graph();
    let mut joins: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for start in graph.node_indices() {
        let input_id = match &graph[start] {
            OperatorSpec::Input { id, .. } => id.clone(),
            _ => continue,
        };

        let mut dfs = Dfs::new(graph, start);
        while let Some(reached) = dfs.next(graph) {
            if let OperatorSpec::Join { id, .. } = &graph[reached] {
                joins
                    .entry(id.clone())
                    .or_insert_with(BTreeSet::new)
                    .insert(input_id.clone());
            }
        }
    }

    joins
}

/// Looks up the stream read by the input operator with the given id.
pub(crate) fn input_operator_stream<'a>(
    descriptor: &'a ApplicationDescriptor,
    operator_id: &str,
) -> Option<&'a str> {
    let graph = descriptor.operator_graph();
    let index = descriptor.operator_index(operator_id)?;
    match &graph[index] {
        OperatorSpec::Input { stream_id, .. } => Some(stream_id),
        _ => None,
    }
}

/// Looks up the kind of the join operator with the given id.
pub(crate) fn join_kind<'a>(
    descriptor: &'a ApplicationDescriptor,
    join_id: &str,
) -> Option<&'a JoinKind> {
    let graph = descriptor.operator_graph();
    let index = descriptor.operator_index(join_id)?;
    match &graph[index] {
        OperatorSpec::Join { kind, .. } => Some(kind),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::StreamSpec;

    fn two_stream_join_app() -> ApplicationDescriptor {
        let mut app = ApplicationDescriptor::new("app");
        app.add_input_stream(StreamSpec::new("left", "kafka", "Left"));
        app.add_input_stream(StreamSpec::new("right", "kafka", "Right"));
        app.add_input_operator("read-left", "left").unwrap();
        app.add_input_operator("read-right", "right").unwrap();
        app.add_join_operator("join-lr", JoinKind::StreamStream)
            .unwrap();
        app.connect("read-left", "join-lr").unwrap();
        app.connect("read-right", "join-lr").unwrap();
        app
    }

    // Tests that both inputs of a two-way join land in the same group.
    #[test]
    fn test_two_inputs_one_join() {
        let joins = join_to_input_operators(&two_stream_join_app());
        assert_eq!(joins.len(), 1);
        let members = &joins["join-lr"];
        assert!(members.contains("read-left"));
        assert!(members.contains("read-right"));
    }

    // Tests that an input operator reaches a join through intervening
    // transform operators.
    #[test]
    fn test_join_reached_through_transform() {
        let mut app = two_stream_join_app();
        app.add_input_stream(StreamSpec::new("third", "kafka", "Third"));
        app.add_input_operator("read-third", "third").unwrap();
        app.add_transform_operator("reshape-third").unwrap();
        app.add_join_operator("join-third", JoinKind::StreamStream)
            .unwrap();
        app.connect("read-third", "reshape-third").unwrap();
        app.connect("reshape-third", "join-third").unwrap();
        app.connect("read-left", "join-third").unwrap();

        let joins = join_to_input_operators(&app);
        assert_eq!(joins.len(), 2);
        let members = &joins["join-third"];
        assert!(members.contains("read-third"));
        assert!(members.contains("read-left"));
    }

    // Tests that a graph without joins produces no groups.
    #[test]
    fn test_no_joins_no_groups() {
        let mut app = ApplicationDescriptor::new("app");
        app.add_input_stream(StreamSpec::new("in", "kafka", "In"));
        app.add_output_stream(StreamSpec::new("out", "kafka", "Out"));
        app.add_input_operator("read", "in").unwrap();
        app.add_output_operator("write", "out").unwrap();
        app.connect("read", "write").unwrap();
        assert!(join_to_input_operators(&app).is_empty());
    }
}
