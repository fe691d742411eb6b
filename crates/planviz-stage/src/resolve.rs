//! Stage resolution for nodes that no physical operator mapped to.
//!
//! A node borrows its stage from its neighbourhood: the stages reachable
//! upstream and downstream through other unassigned nodes.

use std::collections::HashSet;

use tracing::{debug, info};

use planviz_core::id::{StageId, Uid};
use planviz_core::node::{OperatorNode, Phase};
use planviz_core::plan::Plan;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveReport {
    pub resolved: usize,
    pub unresolved: usize,
    pub passes: usize,
}

#[derive(Clone, Copy)]
enum Direction {
    Up,
    Down,
}

impl Direction {
    fn neighbours(self, node: &OperatorNode) -> &[Uid] {
        match self {
            Direction::Up => &node.predecessors,
            Direction::Down => &node.successors,
        }
    }
}

/// Assign every resolvable unassigned node, stamping `phase`. Passes repeat
/// until nothing changes, so nodes whose neighbours were only resolved in
/// an earlier pass still get a stage.
pub fn resolve_unknown(plan: &mut Plan, phase: Phase) -> ResolveReport {
    let mut report = ResolveReport::default();
    loop {
        report.passes += 1;
        let pending: Vec<Uid> = plan.unassigned().map(|n| n.uid.clone()).collect();
        let mut changed = 0;
        for uid in &pending {
            if let Some(stage) = resolve_node(plan, uid) {
                debug!(uid = %uid, stage = %stage, "resolved from neighbours");
                if let Some(node) = plan.get_mut(uid) {
                    node.set_stage(stage, phase);
                    changed += 1;
                }
            }
        }
        report.resolved += changed;
        if changed == 0 {
            report.unresolved = pending.len();
            break;
        }
    }
    if report.resolved > 0 || report.unresolved > 0 {
        info!(?report, "unknown node resolution");
    }
    report
}

/// Stage for one node, or `None` when no neighbour path reaches a stage.
pub fn resolve_node(plan: &Plan, uid: &Uid) -> Option<StageId> {
    let node = plan.get(uid)?;
    let up = scopes(plan, node, Direction::Up);
    let down = scopes(plan, node, Direction::Down);
    if let Some(s) = up.iter().find(|s| down.contains(s)) {
        return Some(s.clone());
    }
    if down.len() == 1 {
        return down.into_iter().next();
    }
    up.into_iter().next().or_else(|| down.into_iter().next())
}

/// Stage ids of the first assigned nodes met walking `dir` from `node`,
/// in depth-first discovery order. The walk does not pass assigned nodes.
fn scopes(plan: &Plan, node: &OperatorNode, dir: Direction) -> Vec<StageId> {
    let mut out: Vec<StageId> = Vec::new();
    let mut visited: HashSet<&Uid> = HashSet::new();
    let mut stack: Vec<&Uid> = dir.neighbours(node).iter().rev().collect();
    while let Some(uid) = stack.pop() {
        if !visited.insert(uid) {
            continue;
        }
        let Some(next) = plan.get(uid) else {
            continue;
        };
        match next.stage_id() {
            Some(stage) => {
                if !out.contains(stage) {
                    out.push(stage.clone());
                }
            }
            None => stack.extend(dir.neighbours(next).iter().rev()),
        }
    }
    out
}
