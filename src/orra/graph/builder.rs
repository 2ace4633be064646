//! Graph building - turns the ordered step list into a linear workflow graph

use super::types::{WorkflowGraph, END};
use crate::orra::step::Step;
use std::sync::Arc;

/// Build the workflow graph for steps in registration order.
///
/// Every step runs after the one registered before it; the first step is the
/// entry point and the last one leads into [`END`]. An empty step list gives
/// an empty graph.
pub fn build_graph(steps: &[Arc<Step>]) -> WorkflowGraph {
    let mut graph = WorkflowGraph::new();

    let mut prev_id: Option<&str> = None;
    for step in steps {
        let id = step.name();
        graph.add_node(id);

        match prev_id {
            Some(prev) => graph.add_edge(prev, id),
            None => graph.set_entry_point(id),
        }

        prev_id = Some(id);
    }

    if let Some(last) = prev_id {
        graph.add_edge(last, END);
    }

    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orra::graph::types::Edge;
    use crate::orra::state::State;

    fn steps(names: &[&str]) -> Vec<Arc<Step>> {
        names
            .iter()
            .map(|name| Arc::new(Step::direct(*name, Ok::<State, _>)))
            .collect()
    }

    #[test]
    fn test_empty_registry() {
        let graph = build_graph(&[]);
        assert!(graph.is_empty());
        assert!(graph.edges.is_empty());
        assert_eq!(graph.entry, None);
    }

    #[test]
    fn test_single_step_links_to_end() {
        let graph = build_graph(&steps(&["only"]));

        assert_eq!(graph.nodes, vec!["only"]);
        assert_eq!(graph.entry.as_deref(), Some("only"));
        assert_eq!(graph.edges, vec![Edge::new("only", END)]);
    }

    #[test]
    fn test_sequential_chain() {
        let graph = build_graph(&steps(&["discover", "research", "draft", "submit"]));

        assert_eq!(graph.entry.as_deref(), Some("discover"));
        assert_eq!(
            graph.edges,
            vec![
                Edge::new("discover", "research"),
                Edge::new("research", "draft"),
                Edge::new("draft", "submit"),
                Edge::new("submit", END),
            ]
        );

        // Simple path: one terminal edge, every other node has one successor
        assert_eq!(graph.edges.iter().filter(|e| e.is_terminal()).count(), 1);
        for node in &graph.nodes {
            assert_eq!(graph.outgoing(node).count(), 1);
        }
    }

    #[test]
    fn test_rebuild_is_identical() {
        let registered = steps(&["a", "b", "c"]);
        assert_eq!(build_graph(&registered), build_graph(&registered));
    }
}
