use serde::{Deserialize, Serialize};

/// The declaration of a table an application joins streams against.
///
/// A table may be populated out-of-band through *side-input* streams. Streams
/// joined against the table must be co-partitioned with those side inputs, so
/// the planner folds them into the join's partition-consistency checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    id: String,
    side_inputs: Vec<String>,
}

impl TableSpec {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            side_inputs: Vec::new(),
        }
    }

    /// Declares the streams which feed out-of-band updates into the table.
    pub fn with_side_inputs(mut self, side_inputs: Vec<&str>) -> Self {
        self.side_inputs = side_inputs.into_iter().map(String::from).collect();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The ids of the streams feeding the table, in declaration order.
    pub fn side_inputs(&self) -> &[String] {
        &self.side_inputs
    }
}
