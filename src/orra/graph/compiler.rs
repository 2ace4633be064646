//! Workflow compiler - validates the graph and produces an executable plan

use std::collections::HashSet;
use std::sync::Arc;

use super::executor::Plan;
use super::types::{WorkflowGraph, END};
use crate::error::OrraError;
use crate::orra::registry::StepRegistry;
use crate::orra::state::StateSchema;

/// Compiles workflow graphs against a step registry
pub struct Compiler<'a> {
    registry: &'a StepRegistry,
    schema: Arc<StateSchema>,
    debug: bool,
}

impl<'a> Compiler<'a> {
    pub fn new(registry: &'a StepRegistry, schema: Arc<StateSchema>) -> Self {
        Self {
            registry,
            schema,
            debug: false,
        }
    }

    /// Log state transitions when the plan runs
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Validate the graph and resolve its nodes to step bodies
    pub fn compile(&self, graph: &WorkflowGraph) -> Result<Plan, OrraError> {
        let order = validate_graph(graph)?;

        let steps = order
            .iter()
            .map(|id| {
                self.registry
                    .get(id)
                    .cloned()
                    .ok_or_else(|| {
                        OrraError::graph(format!("node '{}' has no registered step", id))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        log::info!(
            "Compiled workflow with {} steps: {}",
            steps.len(),
            graph.describe()
        );

        Ok(Plan::new(steps, self.schema.clone(), self.debug))
    }
}

/// Check that the graph is a simple path from the entry node to [`END`] and
/// return the node ids in execution order.
pub fn validate_graph(graph: &WorkflowGraph) -> Result<Vec<String>, OrraError> {
    if graph.nodes.is_empty() {
        if !graph.edges.is_empty() || graph.entry.is_some() {
            return Err(OrraError::graph("graph has edges but no nodes"));
        }
        return Ok(Vec::new());
    }

    let mut seen = HashSet::new();
    for node in &graph.nodes {
        if node == END {
            return Err(OrraError::graph(format!("'{}' is reserved", END)));
        }
        if !seen.insert(node.as_str()) {
            return Err(OrraError::graph(format!("duplicate node '{}'", node)));
        }
    }

    for edge in &graph.edges {
        if !graph.contains(&edge.from) {
            return Err(OrraError::graph(format!(
                "edge starts at unknown node '{}'",
                edge.from
            )));
        }
        if edge.to != END && !graph.contains(&edge.to) {
            return Err(OrraError::graph(format!(
                "edge leads to unknown node '{}'",
                edge.to
            )));
        }
    }

    let entry = graph
        .entry
        .as_deref()
        .ok_or_else(|| OrraError::graph("graph has no entry point"))?;
    if !graph.contains(entry) {
        return Err(OrraError::graph(format!(
            "entry point '{}' is not a node",
            entry
        )));
    }

    for node in &graph.nodes {
        let expected_in = if node == entry { 0 } else { 1 };
        let incoming = graph.incoming(node).count();
        if incoming != expected_in {
            return Err(OrraError::graph(format!(
                "node '{}' has {} incoming edges, expected {}",
                node, incoming, expected_in
            )));
        }

        let outgoing = graph.outgoing(node).count();
        if outgoing != 1 {
            return Err(OrraError::graph(format!(
                "node '{}' has {} outgoing edges, expected 1",
                node, outgoing
            )));
        }
    }

    // Walk the path; with the degree checks above a revisit means a cycle
    let mut order = Vec::with_capacity(graph.nodes.len());
    let mut visited = HashSet::new();
    let mut current = entry;
    while current != END {
        if !visited.insert(current) {
            return Err(OrraError::graph(format!(
                "cycle detected at node '{}'",
                current
            )));
        }
        order.push(current.to_string());
        current = graph
            .successor(current)
            .ok_or_else(|| OrraError::graph(format!("node '{}' has no successor", current)))?;
    }

    if order.len() != graph.nodes.len() {
        let unreachable: Vec<&str> = graph
            .nodes
            .iter()
            .map(String::as_str)
            .filter(|n| !visited.contains(n))
            .collect();
        return Err(OrraError::graph(format!(
            "nodes not reachable from entry: {:?}",
            unreachable
        )));
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orra::graph::build_graph;
    use crate::orra::state::State;
    use crate::orra::step::Step;

    fn registry(names: &[&str]) -> StepRegistry {
        let mut registry = StepRegistry::new();
        for name in names {
            registry
                .register(Step::direct(*name, Ok::<State, _>))
                .unwrap();
        }
        registry
    }

    fn assert_invalid(graph: &WorkflowGraph, needle: &str) {
        let err = validate_graph(graph).unwrap_err();
        assert!(matches!(err, OrraError::GraphValidation(_)));
        assert!(
            err.to_string().contains(needle),
            "'{}' does not mention '{}'",
            err,
            needle
        );
    }

    #[test]
    fn test_built_graph_validates_in_order() {
        let registry = registry(&["a", "b", "c"]);
        let graph = build_graph(registry.list());

        assert_eq!(validate_graph(&graph).unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_empty_graph_compiles_to_empty_plan() {
        let registry = registry(&[]);
        let plan = Compiler::new(&registry, Arc::new(StateSchema::new()))
            .compile(&build_graph(registry.list()))
            .unwrap();

        assert!(plan.is_empty());
    }

    #[test]
    fn test_missing_entry() {
        let mut graph = WorkflowGraph::new();
        graph.add_node("a");
        graph.add_edge("a", END);

        assert_invalid(&graph, "no entry point");
    }

    #[test]
    fn test_fan_out_rejected() {
        let mut graph = WorkflowGraph::new();
        for id in ["a", "b", "c"] {
            graph.add_node(id);
        }
        graph.set_entry_point("a");
        graph.add_edge("a", "b");
        graph.add_edge("a", "c");
        graph.add_edge("b", END);
        graph.add_edge("c", END);

        assert_invalid(&graph, "node 'a' has 2 outgoing edges");
    }

    #[test]
    fn test_missing_terminal_edge() {
        let mut graph = WorkflowGraph::new();
        graph.add_node("a");
        graph.add_node("b");
        graph.set_entry_point("a");
        graph.add_edge("a", "b");

        assert_invalid(&graph, "node 'b' has 0 outgoing edges");
    }

    #[test]
    fn test_detached_cycle_rejected() {
        // a -> END is a valid path, but b <-> c loop on their own
        let mut graph = WorkflowGraph::new();
        for id in ["a", "b", "c"] {
            graph.add_node(id);
        }
        graph.set_entry_point("a");
        graph.add_edge("a", END);
        graph.add_edge("b", "c");
        graph.add_edge("c", "b");

        assert_invalid(&graph, "not reachable from entry");
    }

    #[test]
    fn test_cycle_through_entry_rejected() {
        let mut graph = WorkflowGraph::new();
        graph.add_node("a");
        graph.add_node("b");
        graph.set_entry_point("a");
        graph.add_edge("a", "b");
        graph.add_edge("b", "a");

        assert_invalid(&graph, "node 'a' has 1 incoming edges, expected 0");
    }

    #[test]
    fn test_unknown_edge_target() {
        let mut graph = WorkflowGraph::new();
        graph.add_node("a");
        graph.set_entry_point("a");
        graph.add_edge("a", "ghost");

        assert_invalid(&graph, "unknown node 'ghost'");
    }

    #[test]
    fn test_unregistered_node_fails_compile() {
        let registry = registry(&["a"]);
        let mut graph = WorkflowGraph::new();
        graph.add_node("b");
        graph.set_entry_point("b");
        graph.add_edge("b", END);

        let result = Compiler::new(&registry, Arc::new(StateSchema::new())).compile(&graph);
        assert!(matches!(result, Err(OrraError::GraphValidation(_))));
    }

    #[test]
    fn test_compile_twice_gives_same_order() {
        let registry = registry(&["x", "y"]);
        let compiler = Compiler::new(&registry, Arc::new(StateSchema::new()));
        let graph = build_graph(registry.list());

        let first = compiler.compile(&graph).unwrap();
        let second = compiler.compile(&graph).unwrap();
        assert_eq!(
            first.step_names().collect::<Vec<_>>(),
            second.step_names().collect::<Vec<_>>()
        );
    }
}
