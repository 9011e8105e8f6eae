use loomcore::{FlowGraph, NodeStatus};

/// Activation state of a resolved edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeState {
    Selected,
    Pruned,
}

/// Resolution of every outgoing edge of one finalized node. The states
/// always cover the full outgoing edge set.
#[derive(Debug, Clone, Default)]
pub struct EdgeActivation {
    pub states: Vec<(String, EdgeState)>,
    pub warning: Option<String>,
}

/// Decide each outgoing edge of `node_id` once the node finalized.
///
/// Unconditional edges follow the node status: selected on success, pruned
/// on failure or skip. Conditional edges follow the handler's branch
/// selection. A missing, empty, or unknown-handle selection on a node that
/// has conditional edges prunes everything (fail-closed) and yields a
/// warning.
pub fn resolve_outgoing(
    graph: &FlowGraph,
    node_id: &str,
    status: NodeStatus,
    branch: Option<&[String]>,
) -> EdgeActivation {
    let outgoing = graph.outgoing(node_id);
    let mut activation = EdgeActivation::default();

    if status != NodeStatus::Success {
        for edge in outgoing {
            activation.states.push((edge.id.clone(), EdgeState::Pruned));
        }
        return activation;
    }

    let has_conditional = outgoing.iter().any(|e| e.is_conditional());
    if has_conditional {
        let known: Vec<&str> = outgoing
            .iter()
            .filter_map(|e| e.source_handle.as_deref())
            .collect();
        let valid = branch
            .map(|sel| !sel.is_empty() && sel.iter().all(|h| known.contains(&h.as_str())))
            .unwrap_or(false);

        if !valid {
            activation.warning = Some(format!("no branch selected at node '{}'", node_id));
            for edge in outgoing {
                activation.states.push((edge.id.clone(), EdgeState::Pruned));
            }
            return activation;
        }
    }

    let selection = branch.unwrap_or(&[]);
    for edge in outgoing {
        let state = match &edge.source_handle {
            Some(handle) if selection.iter().any(|h| h == handle) => EdgeState::Selected,
            Some(_) => EdgeState::Pruned,
            None => EdgeState::Selected,
        };
        activation.states.push((edge.id.clone(), state));
    }

    activation
}
