//! Resource-aware MEC compiler.
//!
//! Computes a minimum execution cycle for every node, honouring (a) in-order
//! edge accumulation on a single PE per node and (b) a single-NFU scoreboard
//! that serialises Fusion start times. Processing order is ascending
//! `level`; within a level, whatever stable order the DAG provides (ties
//! broken by insertion order, per [`Dag::iter_by_level`]).
//!
//! The NFU scoreboard (`nfu_next_free_time`) is the only state carried
//! across nodes — everything else is a pure per-node computation over
//! already-resolved parent MECs.

use std::collections::HashMap;

use crate::dag::{Dag, NodeKind};
use crate::error::CompileError;
use crate::ids::{Mec, NodeId};

/// Flat node-id → MEC map, plus the largest MEC assigned.
pub struct MecMap {
    map: HashMap<NodeId, Mec>,
    pub max_mec: Mec,
}

impl MecMap {
    pub fn get(&self, id: &NodeId) -> Option<Mec> {
        self.map.get(id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &Mec)> {
        self.map.iter()
    }

    pub fn into_inner(self) -> HashMap<NodeId, Mec> {
        self.map
    }

    pub fn from_map(map: HashMap<NodeId, Mec>) -> Self {
        let max_mec = map.values().copied().max().unwrap_or(Mec(0));
        Self { map, max_mec }
    }
}

/// Simulate a single PE consuming `arrivals` (already sorted ascending) one
/// edge per cycle, each edge taking one cycle and not starting before its
/// arrival. Returns the cycle at which the last edge finishes (0 if no
/// parents).
fn simulate_pe_accumulation(sorted_arrivals: &[u32]) -> u32 {
    let mut t = 0u32;
    for &a in sorted_arrivals {
        t = a.max(t) + 1;
    }
    t
}

/// Compile MECs for every node in `dag`, processing in ascending `level`.
pub fn compile(dag: &Dag) -> Result<MecMap, CompileError> {
    let mut map: HashMap<NodeId, Mec> = HashMap::with_capacity(dag.len());
    let mut max_mec = Mec(0);
    let mut nfu_next_free_time: u32 = 0;

    for node in dag.iter_by_level() {
        let mut parent_mecs: Vec<u32> = Vec::with_capacity(node.parents.len());
        for p in &node.parents {
            let pm = map
                .get(p)
                .ok_or_else(|| CompileError::OutOfOrder(node.id.clone(), p.clone()))?;
            parent_mecs.push(pm.as_u32());
        }

        let mec = match node.kind {
            NodeKind::Fusion => {
                let data_ready = parent_mecs.iter().copied().max().unwrap_or(0);
                let start = data_ready.max(nfu_next_free_time);
                nfu_next_free_time = start + 1;
                start + 2
            }
            NodeKind::Normal | NodeKind::Partial => {
                if parent_mecs.is_empty() {
                    1
                } else {
                    parent_mecs.sort_unstable();
                    let t = simulate_pe_accumulation(&parent_mecs);
                    match node.kind {
                        NodeKind::Normal => t + 1,
                        _ => t,
                    }
                }
            }
        };

        let mec = Mec(mec);
        if mec > max_mec {
            max_mec = mec;
        }
        map.insert(node.id.clone(), mec);
    }

    Ok(MecMap { map, max_mec })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::Node;

    fn chain() -> Dag {
        // 0 -> 1 -> 2, each with the previous as sole parent.
        let n0 = Node::new(NodeId::new("0"), NodeKind::Normal, vec![], 0, 1);
        let n1 = Node::new(NodeId::new("1"), NodeKind::Normal, vec![NodeId::new("0")], 1, 2);
        let n2 = Node::new(NodeId::new("2"), NodeKind::Normal, vec![NodeId::new("1")], 2, 2);
        Dag::from_nodes(vec![n0, n1, n2]).unwrap()
    }

    #[test]
    fn s1_single_chain_mecs() {
        let dag = chain();
        let mecs = compile(&dag).unwrap();
        assert_eq!(mecs.get(&NodeId::new("0")).unwrap(), Mec(1));
        assert_eq!(mecs.get(&NodeId::new("1")).unwrap(), Mec(3));
        assert_eq!(mecs.get(&NodeId::new("2")).unwrap(), Mec(5));
        assert_eq!(mecs.max_mec, Mec(5));
    }

    #[test]
    fn s2_fan_in_split_mecs() {
        // 12 roots at level 0, 3 Partials (5,5,2) at level 1, one Fusion at level 2.
        let mut nodes: Vec<Node> = (0..12)
            .map(|i| Node::new(NodeId::new(format!("r{i}")), NodeKind::Normal, vec![], 0, 1))
            .collect();
        let root_ids: Vec<NodeId> = nodes.iter().map(|n| n.id.clone()).collect();
        nodes.push(Node::new(
            NodeId::new("P_big_0"),
            NodeKind::Partial,
            root_ids[0..5].to_vec(),
            1,
            5,
        ));
        nodes.push(Node::new(
            NodeId::new("P_big_1"),
            NodeKind::Partial,
            root_ids[5..10].to_vec(),
            1,
            5,
        ));
        nodes.push(Node::new(
            NodeId::new("P_big_2"),
            NodeKind::Partial,
            root_ids[10..12].to_vec(),
            1,
            2,
        ));
        nodes.push(Node::new(
            NodeId::new("big"),
            NodeKind::Fusion,
            vec![NodeId::new("P_big_0"), NodeId::new("P_big_1"), NodeId::new("P_big_2")],
            2,
            2,
        ));
        let dag = Dag::from_nodes(nodes).unwrap();
        let mecs = compile(&dag).unwrap();

        assert_eq!(mecs.get(&NodeId::new("P_big_0")).unwrap(), Mec(6));
        assert_eq!(mecs.get(&NodeId::new("P_big_1")).unwrap(), Mec(6));
        assert_eq!(mecs.get(&NodeId::new("P_big_2")).unwrap(), Mec(3));
        assert_eq!(mecs.get(&NodeId::new("big")).unwrap(), Mec(8));
    }

    #[test]
    fn s3_two_competing_fusions_are_serialised() {
        // Two Fusion nodes at the same level whose single Partial parent
        // shares the same MEC; the scoreboard must stagger their starts.
        let p1 = Node::new(NodeId::new("P_a_0"), NodeKind::Partial, vec![], 0, 0);
        let p2 = Node::new(NodeId::new("P_b_0"), NodeKind::Partial, vec![], 0, 0);
        let fa = Node::new(NodeId::new("a"), NodeKind::Fusion, vec![NodeId::new("P_a_0")], 1, 2);
        let fb = Node::new(NodeId::new("b"), NodeKind::Fusion, vec![NodeId::new("P_b_0")], 1, 2);
        let dag = Dag::from_nodes(vec![p1, p2, fa, fb]).unwrap();

        let mecs = compile(&dag).unwrap();
        let ma = mecs.get(&NodeId::new("a")).unwrap();
        let mb = mecs.get(&NodeId::new("b")).unwrap();
        assert_ne!(ma, mb);
        assert!((ma.as_u32() as i64 - mb.as_u32() as i64).abs() >= 1);
    }

    #[test]
    fn mec_monotone_across_every_edge() {
        let dag = chain();
        let mecs = compile(&dag).unwrap();
        for node in dag.iter() {
            let child_mec = mecs.get(&node.id).unwrap();
            for p in &node.parents {
                let parent_mec = mecs.get(p).unwrap();
                assert!(child_mec.as_u32() >= parent_mec.as_u32() + 1);
            }
        }
    }
}
