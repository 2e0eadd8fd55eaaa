//! LC/PC-driven heterogeneous scheduler.
//!
//! Two nested clocks drive the simulation: the **logical cycle** (LC), on
//! which MEC deadlines, slack, and edge-batch releases are expressed, and
//! the **physical cycle** (PC), on which PE/NFU tasks are actually issued
//! and retired. Each LC performs a fixed boundary step (batch edge release,
//! deadline promotion, slack promotion) followed by a bounded run of PC
//! ticks until the mandatory queue drains.
//!
//! The scheduler is a pure state machine once its inputs (DAG + MEC map)
//! validate: given a stable iteration order it is fully deterministic, and
//! no operation here ever touches wall-clock time or performs I/O.

use std::collections::{HashMap, HashSet};

use crate::dag::{Dag, NodeKind};
use crate::error::ScheduleError;
use crate::ids::{Lc, Mec, NodeId, Pc};
use crate::mec::MecMap;
use crate::trace::{Op, Trace, TraceLine};

/// Tunables for a scheduler run. `nfu_limit` is accepted for interface
/// completeness (§6) but only `1` is supported by the current scoreboard.
#[derive(Copy, Clone, Debug)]
pub struct ScheduleParams {
    pub pe_limit: u32,
    pub nfu_limit: u32,
    pub max_lc_limit: u64,
}

impl Default for ScheduleParams {
    fn default() -> Self {
        Self {
            pe_limit: 10,
            nfu_limit: 1,
            max_lc_limit: 5000,
        }
    }
}

/// Result of a completed scheduler run (every node finished before
/// `max_lc_limit` tripped). A run that times out never produces one of
/// these — it returns [`ScheduleError::Timeout`] instead, which carries the
/// same partial `trace`/`finished`/`total` data for the caller to recover.
#[derive(Debug)]
pub struct ScheduleOutcome {
    pub total_pc: Pc,
    pub trace: Trace,
    pub finished: usize,
    pub total: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum TaskKind {
    Edge { src: NodeId },
    Update,
    Fusion,
}

#[derive(Clone, Debug)]
struct Task {
    kind: TaskKind,
    target: NodeId,
    slack: i64,
    mec: Mec,
}

struct PeEvent {
    kind: TaskKind,
    target: NodeId,
    finish_time: Pc,
}

struct NfuEvent {
    target: NodeId,
    finish_time: Pc,
}

struct NodeInfo {
    kind: NodeKind,
    mec: Mec,
}

/// Run the heterogeneous scheduler over an already-rewritten `dag` using
/// precomputed `mecs`. Returns the cycle trace and total physical cycle
/// count on success; see [`ScheduleError::Timeout`] for the §7 Timeout
/// policy ("emit warning, return partial trace with a timeout marker").
pub fn schedule(dag: &Dag, mecs: &MecMap, params: ScheduleParams) -> Result<ScheduleOutcome, ScheduleError> {
    if params.pe_limit == 0 {
        return Err(ScheduleError::ZeroPeLimit);
    }
    if params.nfu_limit != 1 {
        return Err(ScheduleError::UnsupportedNfuLimit(params.nfu_limit));
    }

    let total = dag.len();

    let mut node_info: HashMap<NodeId, NodeInfo> = HashMap::with_capacity(total);
    let mut adj_list: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    let mut remaining_edges: HashMap<NodeId, usize> = HashMap::new();
    let mut remaining_fusion_parents: HashMap<NodeId, usize> = HashMap::new();
    // Insertion order, kept separately: a `HashMap`'s own iteration order is
    // randomized per process, which would make deadline promotion (and
    // hence the whole trace) non-reproducible across runs of the binary.
    let node_order: Vec<NodeId> = dag.iter().map(|n| n.id.clone()).collect();

    for node in dag.iter() {
        let mec = match mecs.get(&node.id) {
            Some(m) => m,
            None => {
                tracing::warn!(node = %node.id, "MissingMec: treating as +infinity");
                Mec(u32::MAX)
            }
        };
        node_info.insert(node.id.clone(), NodeInfo { kind: node.kind, mec });
        for p in &node.parents {
            adj_list.entry(p.clone()).or_default().push(node.id.clone());
        }
        match node.kind {
            NodeKind::Fusion => {
                remaining_fusion_parents.insert(node.id.clone(), node.parents.len());
            }
            NodeKind::Normal | NodeKind::Partial => {
                remaining_edges.insert(node.id.clone(), node.parents.len());
            }
        }
    }

    let mut current_lc = Lc(0);
    let mut pc = Pc(0);
    let mut finished_nodes: HashSet<NodeId> = HashSet::with_capacity(total);
    let mut nodes_finished_last_lc: Vec<NodeId> = Vec::new();

    let mut optional_queue: Vec<Task> = Vec::new();
    let mut mandatory_queue: Vec<Task> = Vec::new();

    let mut pe_events: Vec<PeEvent> = Vec::new();
    let mut nfu_events: Vec<NfuEvent> = Vec::new();
    let mut nfu_busy_timer: u32 = 0;

    let mut trace = Trace::default();

    while finished_nodes.len() < total {
        if current_lc.as_u64() > params.max_lc_limit {
            tracing::warn!(
                current_lc = current_lc.as_u64(),
                max_lc_limit = params.max_lc_limit,
                finished = finished_nodes.len(),
                total,
                "scheduler timeout"
            );
            trace.timed_out = true;
            return Err(ScheduleError::Timeout {
                current_lc,
                max_lc_limit: params.max_lc_limit,
                finished: finished_nodes.len(),
                total,
                total_pc: pc,
                trace,
            });
        }
        current_lc = current_lc.next();
        let mut nodes_finished_this_lc: Vec<NodeId> = Vec::new();

        // --- step 1: batch edge release, from nodes completed last LC -----
        for src in nodes_finished_last_lc.drain(..) {
            if let Some(children) = adj_list.get(&src) {
                for child in children {
                    if node_info[child].kind == NodeKind::Fusion {
                        continue;
                    }
                    let child_mec = node_info[child].mec;
                    optional_queue.push(Task {
                        kind: TaskKind::Edge { src: src.clone() },
                        target: child.clone(),
                        slack: 0,
                        mec: child_mec,
                    });
                }
            }
        }

        // --- step 2: deadline promotion ------------------------------------
        // Iterate `node_order` (DAG insertion order), not `node_info`
        // directly: a `HashMap`'s iteration order depends on its
        // process-random hasher seed, and when two-or-more nodes become
        // deadline-ready in the same LC they all tie at `slack = i64::MIN`,
        // so encounter order here is what breaks the tie at the mandatory
        // sort below. Using the map's own order would make `total_pc`
        // non-reproducible across runs.
        for id in &node_order {
            let info = &node_info[id];
            if finished_nodes.contains(id) {
                continue;
            }
            if info.mec.as_lc() > current_lc {
                continue;
            }
            let is_ready = match info.kind {
                NodeKind::Fusion => remaining_fusion_parents.get(id).copied().unwrap_or(0) == 0,
                NodeKind::Normal => remaining_edges.get(id).copied().unwrap_or(0) == 0,
                NodeKind::Partial => false,
            };
            if !is_ready {
                continue;
            }
            let task_kind = if info.kind == NodeKind::Fusion {
                TaskKind::Fusion
            } else {
                TaskKind::Update
            };
            let in_q = mandatory_queue
                .iter()
                .any(|t| &t.target == id && matches!(t.kind, TaskKind::Update | TaskKind::Fusion));
            let in_run = pe_events
                .iter()
                .any(|e| &e.target == id && matches!(e.kind, TaskKind::Update))
                || nfu_events.iter().any(|e| &e.target == id);
            if !in_q && !in_run {
                mandatory_queue.push(Task {
                    kind: task_kind,
                    target: id.clone(),
                    slack: i64::MIN,
                    mec: info.mec,
                });
            }
        }

        // --- step 3: slack promotion, grouped by target --------------------
        let mut by_target: HashMap<NodeId, Vec<Task>> = HashMap::new();
        let mut target_order: Vec<NodeId> = Vec::new();
        for task in optional_queue.drain(..) {
            if !by_target.contains_key(&task.target) {
                target_order.push(task.target.clone());
            }
            by_target.entry(task.target.clone()).or_default().push(task);
        }

        for tid in &target_order {
            let mut tasks = by_target.remove(tid).unwrap();
            let mec = node_info[tid].mec;
            let rem = remaining_edges.get(tid).copied().unwrap_or(0) as i64;
            let slack = mec.as_u32() as i64 - current_lc.as_u64() as i64 - rem;
            for t in tasks.iter_mut() {
                t.slack = slack;
            }
            if slack <= 0 {
                let promoted = tasks.remove(0);
                mandatory_queue.push(promoted);
            }
            optional_queue.extend(tasks);
        }

        // --- PC inner loop: run until the mandatory queue drains -----------
        let mut first_pass = true;
        while first_pass || !mandatory_queue.is_empty() {
            first_pass = false;
            pc = pc.plus(1);

            let mut still_pe = Vec::with_capacity(pe_events.len());
            for event in pe_events.drain(..) {
                if event.finish_time <= pc {
                    complete_edge_or_update(
                        &event.kind,
                        &event.target,
                        &node_info,
                        &adj_list,
                        &mut remaining_edges,
                        &mut remaining_fusion_parents,
                        &mut finished_nodes,
                    );
                } else {
                    still_pe.push(event);
                }
            }
            pe_events = still_pe;

            let mut still_nfu = Vec::with_capacity(nfu_events.len());
            for event in nfu_events.drain(..) {
                if event.finish_time <= pc {
                    mark_finished_physically(&event.target, &adj_list, &node_info, &mut remaining_fusion_parents, &mut finished_nodes);
                } else {
                    still_nfu.push(event);
                }
            }
            nfu_events = still_nfu;

            if nfu_busy_timer > 0 {
                nfu_busy_timer -= 1;
            }

            let mut dispatched_ops: Vec<Op> = Vec::new();
            let mut locked_targets: HashSet<NodeId> = pe_events.iter().map(|e| e.target.clone()).collect();

            // Issue: mandatory queue first, ascending slack (stable tie-break).
            mandatory_queue.sort_by_key(|t| t.slack);
            let mut still_mandatory = Vec::with_capacity(mandatory_queue.len());
            for task in mandatory_queue.drain(..) {
                let dispatched = try_dispatch(
                    &task,
                    &mut locked_targets,
                    params.pe_limit,
                    &mut pe_events,
                    &mut nfu_events,
                    &mut nfu_busy_timer,
                    pc,
                    &mut dispatched_ops,
                    &mut nodes_finished_this_lc,
                );
                if !dispatched {
                    still_mandatory.push(task);
                }
            }
            mandatory_queue = still_mandatory;

            // Issue: optional queue next, ascending (slack, mec).
            optional_queue.sort_by_key(|t| (t.slack, t.mec.as_u32()));
            let mut still_optional = Vec::with_capacity(optional_queue.len());
            for task in optional_queue.drain(..) {
                if (pe_events.len() as u32) < params.pe_limit {
                    let dispatched = try_dispatch(
                        &task,
                        &mut locked_targets,
                        params.pe_limit,
                        &mut pe_events,
                        &mut nfu_events,
                        &mut nfu_busy_timer,
                        pc,
                        &mut dispatched_ops,
                        &mut nodes_finished_this_lc,
                    );
                    if !dispatched {
                        still_optional.push(task);
                    }
                } else {
                    still_optional.push(task);
                }
            }
            optional_queue = still_optional;

            if !dispatched_ops.is_empty() {
                trace.lines.push(TraceLine {
                    lc: current_lc,
                    pc,
                    ops: dispatched_ops,
                });
            }

            if mandatory_queue.is_empty() {
                break;
            }
        }

        nodes_finished_last_lc = nodes_finished_this_lc;
    }

    Ok(ScheduleOutcome {
        total_pc: pc,
        trace,
        finished: finished_nodes.len(),
        total,
    })
}

#[allow(clippy::too_many_arguments)]
fn try_dispatch(
    task: &Task,
    locked_targets: &mut HashSet<NodeId>,
    pe_limit: u32,
    pe_events: &mut Vec<PeEvent>,
    nfu_events: &mut Vec<NfuEvent>,
    nfu_busy_timer: &mut u32,
    pc: Pc,
    dispatched_ops: &mut Vec<Op>,
    nodes_finished_this_lc: &mut Vec<NodeId>,
) -> bool {
    if locked_targets.contains(&task.target) {
        return false;
    }

    match &task.kind {
        TaskKind::Fusion => {
            if *nfu_busy_timer == 0 {
                *nfu_busy_timer = 1;
                nfu_events.push(NfuEvent {
                    target: task.target.clone(),
                    finish_time: pc.plus(2),
                });
                dispatched_ops.push(Op::Fusion(task.target.clone()));
                nodes_finished_this_lc.push(task.target.clone());
                true
            } else {
                false
            }
        }
        TaskKind::Edge { src } => {
            if (pe_events.len() as u32) < pe_limit {
                pe_events.push(PeEvent {
                    kind: task.kind.clone(),
                    target: task.target.clone(),
                    finish_time: pc.plus(1),
                });
                locked_targets.insert(task.target.clone());
                dispatched_ops.push(Op::Edge { src: src.clone(), dst: task.target.clone() });
                true
            } else {
                false
            }
        }
        TaskKind::Update => {
            if (pe_events.len() as u32) < pe_limit {
                pe_events.push(PeEvent {
                    kind: task.kind.clone(),
                    target: task.target.clone(),
                    finish_time: pc.plus(1),
                });
                locked_targets.insert(task.target.clone());
                dispatched_ops.push(Op::Update(task.target.clone()));
                nodes_finished_this_lc.push(task.target.clone());
                true
            } else {
                false
            }
        }
    }
}

fn complete_edge_or_update(
    kind: &TaskKind,
    target: &NodeId,
    node_info: &HashMap<NodeId, NodeInfo>,
    adj_list: &HashMap<NodeId, Vec<NodeId>>,
    remaining_edges: &mut HashMap<NodeId, usize>,
    remaining_fusion_parents: &mut HashMap<NodeId, usize>,
    finished_nodes: &mut HashSet<NodeId>,
) {
    match kind {
        TaskKind::Edge { .. } => {
            if let Some(count) = remaining_edges.get_mut(target) {
                *count = count.saturating_sub(1);
                let reached_zero = *count == 0;
                if node_info[target].kind == NodeKind::Partial && reached_zero {
                    mark_finished_physically(target, adj_list, node_info, remaining_fusion_parents, finished_nodes);
                }
            }
        }
        TaskKind::Update => {
            mark_finished_physically(target, adj_list, node_info, remaining_fusion_parents, finished_nodes);
        }
        TaskKind::Fusion => {
            // Fusion completion is retired through `nfu_events`, never `pe_events`.
        }
    }
}

fn mark_finished_physically(
    id: &NodeId,
    adj_list: &HashMap<NodeId, Vec<NodeId>>,
    node_info: &HashMap<NodeId, NodeInfo>,
    remaining_fusion_parents: &mut HashMap<NodeId, usize>,
    finished_nodes: &mut HashSet<NodeId>,
) {
    finished_nodes.insert(id.clone());
    if let Some(children) = adj_list.get(id) {
        for child in children {
            if node_info[child].kind == NodeKind::Fusion {
                if let Some(count) = remaining_fusion_parents.get_mut(child) {
                    *count = count.saturating_sub(1);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::Node;
    use crate::mec::compile;

    fn chain() -> Dag {
        let n0 = Node::new(NodeId::new("0"), NodeKind::Normal, vec![], 0, 1);
        let n1 = Node::new(NodeId::new("1"), NodeKind::Normal, vec![NodeId::new("0")], 1, 2);
        let n2 = Node::new(NodeId::new("2"), NodeKind::Normal, vec![NodeId::new("1")], 2, 2);
        Dag::from_nodes(vec![n0, n1, n2]).unwrap()
    }

    #[test]
    fn s1_single_chain_total_cycles() {
        let dag = chain();
        let mecs = compile(&dag).unwrap();
        let outcome = schedule(
            &dag,
            &mecs,
            ScheduleParams { pe_limit: 10, nfu_limit: 1, max_lc_limit: 5000 },
        )
        .unwrap();
        assert_eq!(outcome.total_pc, Pc(5));
        assert_eq!(outcome.finished, outcome.total);
    }

    #[test]
    fn scheduler_completeness_on_chain() {
        let dag = chain();
        let mecs = compile(&dag).unwrap();
        let outcome = schedule(&dag, &mecs, ScheduleParams::default()).unwrap();
        assert_eq!(outcome.finished, dag.len());
        assert!(!outcome.trace.timed_out);
    }

    #[test]
    fn s4_pe_saturation_width_20_independent_layer() {
        let mut nodes: Vec<Node> = (0..20)
            .map(|i| Node::new(NodeId::new(format!("r{i}")), NodeKind::Normal, vec![], 0, 1))
            .collect();
        let root_ids: Vec<NodeId> = nodes.iter().map(|n| n.id.clone()).collect();
        nodes.push(Node::new(NodeId::new("sink"), NodeKind::Normal, root_ids, 1, 21));
        let dag = Dag::from_nodes(nodes).unwrap();
        let mecs = compile(&dag).unwrap();
        let outcome = schedule(
            &dag,
            &mecs,
            ScheduleParams { pe_limit: 10, nfu_limit: 1, max_lc_limit: 5000 },
        )
        .unwrap();
        assert!(!outcome.trace.timed_out);
        assert_eq!(outcome.finished, dag.len());
    }

    #[test]
    fn determinism_across_runs() {
        let dag = chain();
        let mecs = compile(&dag).unwrap();
        let a = schedule(&dag, &mecs, ScheduleParams::default()).unwrap();
        let b = schedule(&dag, &mecs, ScheduleParams::default()).unwrap();
        assert_eq!(a.total_pc, b.total_pc);
        assert_eq!(a.trace.lines.len(), b.trace.lines.len());
        for (la, lb) in a.trace.lines.iter().zip(b.trace.lines.iter()) {
            assert_eq!(la.to_string(), lb.to_string());
        }
    }

    #[test]
    fn zero_pe_limit_is_rejected() {
        let dag = chain();
        let mecs = compile(&dag).unwrap();
        let err = schedule(
            &dag,
            &mecs,
            ScheduleParams { pe_limit: 0, nfu_limit: 1, max_lc_limit: 5000 },
        )
        .unwrap_err();
        assert!(matches!(err, ScheduleError::ZeroPeLimit));
    }

    #[test]
    fn nfu_limit_other_than_one_is_rejected() {
        let dag = chain();
        let mecs = compile(&dag).unwrap();
        let err = schedule(
            &dag,
            &mecs,
            ScheduleParams { pe_limit: 10, nfu_limit: 2, max_lc_limit: 5000 },
        )
        .unwrap_err();
        assert!(matches!(err, ScheduleError::UnsupportedNfuLimit(2)));
    }

    #[test]
    fn timeout_produces_partial_trace_marker() {
        // A MEC map with no entry for the only node forces `MissingMec`
        // (treated as +infinity), which never becomes a deadline-promotion
        // candidate and drives the LC counter past a tiny `max_lc_limit`.
        let n0 = Node::new(NodeId::new("0"), NodeKind::Normal, vec![], 0, 1);
        let dag = Dag::from_nodes(vec![n0]).unwrap();
        let empty_mecs = MecMap::from_map(HashMap::new());
        let err = schedule(
            &dag,
            &empty_mecs,
            ScheduleParams { pe_limit: 1, nfu_limit: 1, max_lc_limit: 3 },
        )
        .unwrap_err();
        match err {
            ScheduleError::Timeout { finished, total, trace, .. } => {
                assert!(trace.timed_out);
                assert!(finished < total);
            }
            other => panic!("expected ScheduleError::Timeout, got {other:?}"),
        }
    }

    #[test]
    fn fusion_as_parent_of_normal_releases_edges_next_lc() {
        // Partial -> Fusion -> Normal: an allowed, if unusual, shape per
        // the open question on fusion-as-parent in DESIGN.md.
        let p = Node::new(NodeId::new("P_f_0"), NodeKind::Partial, vec![], 0, 0);
        let f = Node::new(NodeId::new("f"), NodeKind::Fusion, vec![NodeId::new("P_f_0")], 1, 2);
        let normal = Node::new(NodeId::new("n"), NodeKind::Normal, vec![NodeId::new("f")], 2, 2);
        let dag = Dag::from_nodes(vec![p, f, normal]).unwrap();
        let mecs = compile(&dag).unwrap();
        let outcome = schedule(&dag, &mecs, ScheduleParams::default()).unwrap();
        assert!(!outcome.trace.timed_out);
        assert_eq!(outcome.finished, dag.len());
    }
}
