//! Workflow graph type definitions

use serde::Serialize;

/// Sentinel node every workflow path ends in
pub const END: &str = "__end__";

/// Directed edge: `to` runs after `from`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Whether this edge leads into the end sentinel
    pub fn is_terminal(&self) -> bool {
        self.to == END
    }
}

/// Directed graph over step names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkflowGraph {
    /// Node ids, in the order they were added
    pub nodes: Vec<String>,
    pub edges: Vec<Edge>,
    /// Node with no incoming edge where execution starts
    pub entry: Option<String>,
}

impl WorkflowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, id: impl Into<String>) {
        self.nodes.push(id.into());
    }

    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.edges.push(Edge::new(from, to));
    }

    pub fn set_entry_point(&mut self, id: impl Into<String>) {
        self.entry = Some(id.into());
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n == id)
    }

    pub fn incoming(&self, id: &str) -> impl Iterator<Item = &Edge> {
        let id = id.to_string();
        self.edges.iter().filter(move |e| e.to == id)
    }

    pub fn outgoing(&self, id: &str) -> impl Iterator<Item = &Edge> {
        let id = id.to_string();
        self.edges.iter().filter(move |e| e.from == id)
    }

    /// First successor of a node, if any
    pub fn successor(&self, id: &str) -> Option<&str> {
        self.outgoing(id).next().map(|e| e.to.as_str())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Render the flow as `a -> b -> c`
    pub fn describe(&self) -> String {
        self.nodes.join(" -> ")
    }
}
