//! Stitch per-stage fragments into one graph.
//!
//! Each fragment only knows its own edges; the stage graph says which
//! stages feed which. Stitching connects the out-boundary of an upstream
//! stage to the in-boundary of the downstream one. It only ever adds
//! edges (plus at most one store node per terminal union), and every edge
//! is deduplicated, so running it twice changes nothing.

use serde::Serialize;
use tracing::{debug, error, trace};

use planviz_core::dag::{StageGraph, TezPlan, TezVertex};
use planviz_core::error::Result;
use planviz_core::id::{StageId, Uid, UidCounter};
use planviz_core::node::Phase;
use planviz_core::plan::Plan;
use planviz_planner::physical::{translate_operator, StageContext};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StitchReport {
    pub edges_added: usize,
    pub synthetic_stores: usize,
}

/// Source and sink uids of one task's fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskBoundary {
    pub task_id: String,
    pub phase: Phase,
    pub sources: Vec<Uid>,
    pub sinks: Vec<Uid>,
}

fn in_stage(plan: &Plan, uid: &Uid, stage: &StageId) -> bool {
    plan.get(uid)
        .is_some_and(|n| !n.synthetic && n.stage_id() == Some(stage))
}

/// Nodes of `stage` with no successor in `stage`, uid order.
pub fn out_boundary(plan: &Plan, stage: &StageId) -> Vec<Uid> {
    plan.nodes_in_stage(stage)
        .filter(|n| !n.synthetic)
        .filter(|n| !n.successors.iter().any(|s| in_stage(plan, s, stage)))
        .map(|n| n.uid.clone())
        .collect()
}

/// Nodes of `stage` with no predecessor in `stage`, uid order.
pub fn in_boundary(plan: &Plan, stage: &StageId) -> Vec<Uid> {
    plan.nodes_in_stage(stage)
        .filter(|n| !n.synthetic)
        .filter(|n| !n.predecessors.iter().any(|p| in_stage(plan, p, stage)))
        .map(|n| n.uid.clone())
        .collect()
}

/// Connect every `from` to every `to`; returns how many edges were new.
fn connect_all(plan: &mut Plan, from: &[Uid], to: &[Uid]) -> Result<usize> {
    let mut added = 0;
    for f in from {
        for t in to {
            let exists = plan.get(f).is_some_and(|n| n.successors.contains(t));
            if !exists {
                plan.connect(f, t)?;
                trace!(from = %f, to = %t, "stitched");
                added += 1;
            }
        }
    }
    Ok(added)
}

/// Connect the out-boundary of `from` to the in-boundary of `to`.
pub fn connect_stages(plan: &mut Plan, from: &StageId, to: &StageId) -> Result<usize> {
    let outs = out_boundary(plan, from);
    let ins = in_boundary(plan, to);
    connect_all(plan, &outs, &ins)
}

/// Inter-stage stitching along every edge of the stage graph.
pub fn stitch_stages(plan: &mut Plan, graph: &StageGraph) -> Result<StitchReport> {
    let mut report = StitchReport::default();
    for (u, v) in graph.edges() {
        report.edges_added += connect_stages(plan, u, v)?;
    }
    debug!(?report, "stitched stage graph");
    Ok(report)
}

/// Task order inside a stage: map, then combine, then reduce.
fn phase_rank(phase: Phase) -> u8 {
    match phase {
        Phase::Mapper => 0,
        Phase::Combiner => 1,
        Phase::Reducer => 2,
        Phase::Vertex | Phase::Unknown => 3,
    }
}

/// Stitch the tasks of one stage internally, in phase order: the sinks of
/// each phase's task feed the sources of the next (map -> combine ->
/// reduce). When a phase has several tasks only the first listed one is
/// chained; the others get no internal edge.
pub fn stitch_tasks(plan: &mut Plan, stage: &StageId, tasks: &[TaskBoundary]) -> Result<usize> {
    let mut chain: Vec<&TaskBoundary> = Vec::with_capacity(tasks.len());
    for task in tasks {
        match chain.iter().find(|t| t.phase == task.phase) {
            Some(first) => error!(
                stage = %stage,
                phase = %task.phase,
                first = %first.task_id,
                ignored = %task.task_id,
                "ambiguous duplicate task phase; using the first task"
            ),
            None => chain.push(task),
        }
    }
    chain.sort_by_key(|t| phase_rank(t.phase));

    let mut added = 0;
    for pair in chain.windows(2) {
        added += connect_all(plan, &pair[0].sinks, &pair[1].sources)?;
    }
    Ok(added)
}

/// Tez stitching with vertex-group (union) handling.
///
/// Groups carry no nodes. An edge into a group continues to the group's
/// first real successor; a group with no successor ends in its store,
/// which is materialized once inside the upstream vertex.
pub fn stitch_tez(
    plan: &mut Plan,
    tez: &TezPlan,
    counter: &mut UidCounter,
    placeholder_alias: &str,
) -> Result<StitchReport> {
    let graph = tez.stage_graph();
    let mut report = StitchReport::default();
    for (u, v) in graph.edges() {
        if tez.vertex(u).is_some_and(TezVertex::is_vertex_group) {
            continue;
        }
        match follow_groups(tez, &graph, v) {
            Target::Vertex(w) => {
                report.edges_added += connect_stages(plan, u, &w)?;
            }
            Target::TerminalGroup(g) => {
                let (added, created) = attach_union_store(plan, tez, u, &g, counter, placeholder_alias)?;
                report.edges_added += added;
                report.synthetic_stores += usize::from(created);
            }
            Target::Missing => {
                debug!(from = %u, to = %v, "edge leads nowhere; skipped");
            }
        }
    }
    debug!(?report, "stitched tez plan");
    Ok(report)
}

enum Target {
    Vertex(StageId),
    TerminalGroup(StageId),
    Missing,
}

fn follow_groups(tez: &TezPlan, graph: &StageGraph, start: &StageId) -> Target {
    let mut current = start.clone();
    // Bounded by the vertex count so a malformed cycle of groups terminates.
    for _ in 0..=tez.vertices.len() {
        match tez.vertex(&current) {
            Some(v) if v.is_vertex_group() => match graph.successors(&current).first() {
                Some(next) => current = (*next).clone(),
                None => return Target::TerminalGroup(current),
            },
            Some(_) => return Target::Vertex(current),
            None => return Target::Missing,
        }
    }
    Target::Missing
}

/// Returns (edges added, whether a new node was created).
fn attach_union_store(
    plan: &mut Plan,
    tez: &TezPlan,
    upstream: &StageId,
    group: &StageId,
    counter: &mut UidCounter,
    placeholder_alias: &str,
) -> Result<(usize, bool)> {
    let Some(store) = tez
        .vertex(group)
        .and_then(|v| v.vertex_group.as_ref())
        .and_then(|g| g.store.as_ref())
    else {
        debug!(group = %group, "terminal vertex group without store");
        return Ok((0, false));
    };
    let location = store.file_spec().map(|f| f.file_name.clone());

    let feeders: Vec<Uid> = out_boundary(plan, upstream)
        .into_iter()
        .filter(|uid| plan.get(uid).is_some_and(|n| n.operator != store.name))
        .collect();

    let existing = plan
        .nodes_in_stage(upstream)
        .find(|n| {
            n.synthetic
                && n.operator == store.name
                && n.detail.storage().map(|s| &s.location) == location.as_ref()
        })
        .map(|n| n.uid.clone());

    if let Some(uid) = existing {
        return Ok((connect_all(plan, &feeders, &[uid])?, false));
    }
    if feeders.is_empty() {
        return Ok((0, false));
    }

    counter.advance_past(plan);
    let uid = counter.next_uid();
    let ctx = StageContext {
        stage: upstream,
        phase: Phase::Vertex,
        placeholder_alias,
    };
    let mut node = translate_operator(uid.clone(), store, ctx);
    node.synthetic = true;
    plan.insert(node);
    debug!(uid = %uid, vertex = %upstream, group = %group, "materialized union store");
    Ok((connect_all(plan, &feeders, &[uid])?, true))
}
