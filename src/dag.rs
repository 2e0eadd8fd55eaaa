//! DAG data model: node kinds, the in-memory `Dag`, and the JSON record
//! shapes for the raw and rewritten external formats.
//!
//! The raw format accepts two field spellings for the same data (the
//! reference generators disagreed with each other over time): `id`/
//! `row_index` and `parents`/`dependency_nodes`. Both are normalized to the
//! canonical in-memory shape at the boundary — nothing downstream of
//! [`RawRecord::into_node`] ever sees the legacy names.

use serde::{Deserialize, Serialize};

use crate::error::DagError;
use crate::ids::{Mec, NodeId};

/// The kind of a node, assigned by the rewriter.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeKind {
    /// Passed through unchanged; `|parents| <= threshold`.
    Normal,
    /// Produced by splitting a high-in-degree node; carries at most
    /// `chunk_size` parents and feeds exactly one Fusion node.
    Partial,
    /// Produced by splitting a high-in-degree node; consumes all Partials
    /// emitted for the same original id.
    Fusion,
}

/// A single DAG node, after rewriting (or pass-through from the raw input
/// if `rewrite` is never run on it — the in-memory shape is the same
/// either way).
#[derive(Clone, Debug)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub parents: Vec<NodeId>,
    pub level: u32,
    pub cost: u32,
    /// Populated by the MEC compiler; `None` until then.
    pub mec: Option<Mec>,
}

impl Node {
    pub fn new(id: NodeId, kind: NodeKind, parents: Vec<NodeId>, level: u32, cost: u32) -> Self {
        Self {
            id,
            kind,
            parents,
            level,
            cost,
            mec: None,
        }
    }
}

/// An acyclic set of nodes where every parent id resolves to another node
/// in the set, in a topological order compatible with `level`.
///
/// Iteration order is insertion order throughout, which is what makes the
/// scheduler's "stable iteration order over the DAG" requirement concrete.
#[derive(Clone, Debug, Default)]
pub struct Dag {
    nodes: Vec<Node>,
}

impl Dag {
    /// Validate and wrap a list of nodes already in rewriter output order.
    ///
    /// Checks: no duplicate ids, every parent resolves within the set, and
    /// `parent.level <= child.level` for every edge (the sort key the
    /// compiler relies on).
    pub fn from_nodes(nodes: Vec<Node>) -> Result<Self, DagError> {
        let mut seen = std::collections::HashSet::with_capacity(nodes.len());
        for n in &nodes {
            if !seen.insert(n.id.clone()) {
                return Err(DagError::DuplicateId(n.id.clone()));
            }
        }
        let levels: std::collections::HashMap<&NodeId, u32> =
            nodes.iter().map(|n| (&n.id, n.level)).collect();
        for n in &nodes {
            for p in &n.parents {
                let parent_level = *levels.get(p).ok_or_else(|| DagError::DanglingParent {
                    child: n.id.clone(),
                    parent: p.clone(),
                })?;
                if parent_level > n.level {
                    return Err(DagError::LevelNotMonotone {
                        child: n.id.clone(),
                        child_level: n.level,
                        parent: p.clone(),
                        parent_level,
                    });
                }
            }
        }
        Ok(Self { nodes })
    }

    /// Iterate nodes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Iterate nodes in ascending `level` order (stable: ties keep
    /// insertion order), the order the MEC compiler processes in.
    pub fn iter_by_level(&self) -> impl Iterator<Item = &Node> {
        let mut idx: Vec<usize> = (0..self.nodes.len()).collect();
        idx.sort_by_key(|&i| self.nodes[i].level);
        idx.into_iter().map(move |i| &self.nodes[i])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }
}

// ---------------------------------------------------------------------
// Raw DAG input (JSON)
// ---------------------------------------------------------------------

/// One record of the raw DAG input format. Accepts both the current and
/// legacy field spellings; every field is optional at the serde layer so
/// [`RawRecord::into_node`] can produce a precise [`DagError`] instead of a
/// generic deserialization failure.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RawRecord {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default, rename = "row_index")]
    pub row_index: Option<serde_json::Value>,
    #[serde(default)]
    pub parents: Option<Vec<serde_json::Value>>,
    #[serde(default, rename = "dependency_nodes")]
    pub dependency_nodes: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub level: Option<u32>,
    #[serde(default)]
    pub is_super: Option<bool>,
    #[serde(default)]
    pub cost: Option<u32>,
}

fn value_to_node_id(v: &serde_json::Value) -> NodeId {
    match v {
        serde_json::Value::String(s) => NodeId::new(s.as_str()),
        other => NodeId::new(other.to_string()),
    }
}

impl RawRecord {
    /// Normalize the dual-spelling raw record into a `Normal`-kind node
    /// (raw input has no notion of Partial/Fusion; those are rewriter
    /// output only). `level` defaults to 0 when absent, matching the
    /// synthetic generators which always emit it but treat it as
    /// informational for root-only DAGs.
    pub fn into_node(self) -> Result<Node, DagError> {
        let id = self
            .id
            .as_ref()
            .or(self.row_index.as_ref())
            .map(value_to_node_id)
            .ok_or(DagError::MissingField("id"))?;
        let parents: Vec<NodeId> = self
            .parents
            .or(self.dependency_nodes)
            .ok_or(DagError::MissingField("parents"))?
            .iter()
            .map(value_to_node_id)
            .collect();
        let level = self.level.unwrap_or(0);
        let cost = self.cost.unwrap_or(parents.len() as u32 + 1);
        Ok(Node::new(id, NodeKind::Normal, parents, level, cost))
    }
}

/// Load a raw DAG (list of [`RawRecord`]) and normalize it into a [`Dag`].
///
/// Levels are taken as given; the raw generators guarantee
/// `parent.level <= child.level` by construction, and [`Dag::from_nodes`]
/// re-validates it here rather than trusting the input blindly.
pub fn raw_records_to_dag(records: Vec<RawRecord>) -> Result<Dag, DagError> {
    let nodes = records
        .into_iter()
        .map(RawRecord::into_node)
        .collect::<Result<Vec<_>, _>>()?;
    Dag::from_nodes(nodes)
}

// ---------------------------------------------------------------------
// Rewritten DAG (JSON)
// ---------------------------------------------------------------------

/// One record of the rewritten DAG format (stable ids, explicit `type`).
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RewrittenRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub parents: Vec<String>,
    pub level: u32,
    pub cost: u32,
}

impl From<&Node> for RewrittenRecord {
    fn from(n: &Node) -> Self {
        Self {
            id: n.id.as_str().to_string(),
            kind: n.kind,
            parents: n.parents.iter().map(|p| p.as_str().to_string()).collect(),
            level: n.level,
            cost: n.cost,
        }
    }
}

impl RewrittenRecord {
    pub fn into_node(self) -> Node {
        Node::new(
            NodeId::new(self.id),
            self.kind,
            self.parents.into_iter().map(NodeId::new).collect(),
            self.level,
            self.cost,
        )
    }
}

/// Serialize a [`Dag`] to the rewritten-DAG record list, in insertion order.
pub fn dag_to_rewritten_records(dag: &Dag) -> Vec<RewrittenRecord> {
    dag.iter().map(RewrittenRecord::from).collect()
}

/// Parse a rewritten-DAG record list back into a validated [`Dag`].
pub fn rewritten_records_to_dag(records: Vec<RewrittenRecord>) -> Result<Dag, DagError> {
    let nodes = records.into_iter().map(RewrittenRecord::into_node).collect();
    Dag::from_nodes(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_record_accepts_either_spelling() {
        let modern: RawRecord = serde_json::from_str(
            r#"{"id": 1, "parents": [0], "level": 1}"#,
        )
        .unwrap();
        let legacy: RawRecord = serde_json::from_str(
            r#"{"row_index": 1, "dependency_nodes": [0], "level": 1}"#,
        )
        .unwrap();

        let n1 = modern.into_node().unwrap();
        let n2 = legacy.into_node().unwrap();
        assert_eq!(n1.id, n2.id);
        assert_eq!(n1.parents, n2.parents);
    }

    #[test]
    fn dangling_parent_is_rejected() {
        let a = Node::new(NodeId::new("a"), NodeKind::Normal, vec![NodeId::new("ghost")], 0, 1);
        let err = Dag::from_nodes(vec![a]).unwrap_err();
        assert!(matches!(err, DagError::DanglingParent { .. }));
    }

    #[test]
    fn level_must_be_monotone_across_edges() {
        let root = Node::new(NodeId::new("r"), NodeKind::Normal, vec![], 5, 1);
        let child = Node::new(NodeId::new("c"), NodeKind::Normal, vec![NodeId::new("r")], 0, 1);
        let err = Dag::from_nodes(vec![root, child]).unwrap_err();
        assert!(matches!(err, DagError::LevelNotMonotone { .. }));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let a = Node::new(NodeId::new("x"), NodeKind::Normal, vec![], 0, 1);
        let b = Node::new(NodeId::new("x"), NodeKind::Normal, vec![], 0, 1);
        let err = Dag::from_nodes(vec![a, b]).unwrap_err();
        assert!(matches!(err, DagError::DuplicateId(_)));
    }

    #[test]
    fn iter_by_level_is_stable_within_a_level() {
        let a = Node::new(NodeId::new("a"), NodeKind::Normal, vec![], 1, 1);
        let b = Node::new(NodeId::new("b"), NodeKind::Normal, vec![], 0, 1);
        let c = Node::new(NodeId::new("c"), NodeKind::Normal, vec![], 0, 1);
        let dag = Dag::from_nodes(vec![a, b, c]).unwrap();
        let order: Vec<&str> = dag.iter_by_level().map(|n| n.id.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }
}
