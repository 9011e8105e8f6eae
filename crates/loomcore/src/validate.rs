use crate::{kinds, FlowGraph, ValidationError};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;
use std::collections::{HashMap, HashSet};

/// Outcome of structural validation. Fatal problems abort the run before
/// any node executes; `warnings` are carried into the run record.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub warnings: Vec<String>,
    /// Node ids reachable from the start node
    pub reachable: HashSet<String>,
}

impl FlowGraph {
    /// Validate graph structure ahead of execution
    pub fn validate(&self) -> Result<ValidationReport, ValidationError> {
        let mut ids = HashSet::new();
        for node in &self.nodes {
            if !ids.insert(node.id.as_str()) {
                return Err(ValidationError::DuplicateNodeId(node.id.clone()));
            }
        }

        let starts: Vec<_> = self
            .nodes
            .iter()
            .filter(|n| n.kind == kinds::START)
            .collect();
        match starts.len() {
            0 => return Err(ValidationError::MissingStart),
            1 => {}
            n => return Err(ValidationError::MultipleStarts(n)),
        }
        let start_id = starts[0].id.clone();

        for edge in &self.edges {
            for endpoint in [&edge.source, &edge.target] {
                if !ids.contains(endpoint.as_str()) {
                    return Err(ValidationError::DanglingEdge {
                        edge: edge.id.clone(),
                        node: endpoint.clone(),
                    });
                }
            }
        }

        // Conditional edges out of one node must carry distinct handles
        let mut handles: HashMap<&str, HashSet<&str>> = HashMap::new();
        for edge in &self.edges {
            if let Some(handle) = &edge.source_handle {
                let seen = handles.entry(edge.source.as_str()).or_default();
                if !seen.insert(handle.as_str()) {
                    return Err(ValidationError::DuplicateHandle {
                        node: edge.source.clone(),
                        handle: handle.clone(),
                    });
                }
            }
        }

        for node in &self.nodes {
            if node.kind != kinds::START && self.incoming(&node.id).is_empty() {
                return Err(ValidationError::OrphanNode(node.id.clone()));
            }
        }

        let (graph, index) = self.build_digraph();
        if toposort(&graph, None).is_err() {
            return Err(ValidationError::CyclicDependency);
        }

        let mut report = ValidationReport::default();

        let mut bfs = Bfs::new(&graph, index[start_id.as_str()]);
        while let Some(idx) = bfs.next(&graph) {
            report.reachable.insert(graph[idx].clone());
        }

        for node in &self.nodes {
            if !report.reachable.contains(&node.id) {
                report
                    .warnings
                    .push(format!("node '{}' is unreachable from start", node.id));
            }
            if node.kind != kinds::END && self.outgoing(&node.id).is_empty() {
                report.warnings.push(format!(
                    "node '{}' has no outgoing edges and is not an end node",
                    node.id
                ));
            }
        }

        Ok(report)
    }

    fn build_digraph(&self) -> (DiGraph<String, ()>, HashMap<&str, NodeIndex>) {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();

        for node in &self.nodes {
            let idx = graph.add_node(node.id.clone());
            index.insert(node.id.as_str(), idx);
        }
        for edge in &self.edges {
            graph.add_edge(index[edge.source.as_str()], index[edge.target.as_str()], ());
        }

        (graph, index)
    }
}
