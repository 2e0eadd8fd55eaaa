//! Graph rewriter (fixed-size splitting).
//!
//! Splits every node whose parent count exceeds `threshold` into
//! consecutive `chunk_size` slices, each becoming a Partial node, plus one
//! Fusion node (reusing the original id) that consumes all the Partials in
//! emission order. Nodes at or below `threshold` pass through unchanged as
//! Normal.
//!
//! Pure function: takes a [`Dag`], returns a fresh one. Never mutates its
//! input.

use crate::dag::{Dag, Node, NodeKind};
use crate::error::DagError;
use crate::ids::NodeId;

/// Split-trigger in-degree and Partial fan-in bound for [`rewrite`].
#[derive(Copy, Clone, Debug)]
pub struct RewriteParams {
    pub threshold: usize,
    pub chunk_size: usize,
}

impl Default for RewriteParams {
    /// `threshold = 5`, `chunk_size = 5` — the fixed-chunk defaults.
    fn default() -> Self {
        Self {
            threshold: 5,
            chunk_size: 5,
        }
    }
}

/// Rewrite `dag` under `params`, producing a new [`Dag`] with every
/// high-in-degree node split into Partial + Fusion nodes.
///
/// Emission order: for each input node (in the input's iteration order),
/// its Partials (if any) are emitted first, then its Fusion/Normal node.
pub fn rewrite(dag: &Dag, params: RewriteParams) -> Result<Dag, DagError> {
    let mut out = Vec::with_capacity(dag.len());

    for node in dag.iter() {
        if node.parents.len() <= params.threshold {
            out.push(Node::new(
                node.id.clone(),
                NodeKind::Normal,
                node.parents.clone(),
                node.level,
                node.parents.len() as u32 + 1,
            ));
            continue;
        }

        let mut partial_ids = Vec::new();
        for (k, chunk) in node.parents.chunks(params.chunk_size).enumerate() {
            let pid = NodeId::partial(&node.id, k);
            out.push(Node::new(
                pid.clone(),
                NodeKind::Partial,
                chunk.to_vec(),
                node.level,
                chunk.len() as u32,
            ));
            partial_ids.push(pid);
        }

        out.push(Node::new(
            node.id.clone(),
            NodeKind::Fusion,
            partial_ids,
            node.level + 1,
            2,
        ));
    }

    Dag::from_nodes(out)
}
