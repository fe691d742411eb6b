//! Direct stage assignment: walk each stage's physical plans and stamp the
//! logical nodes they were compiled from.
//!
//! Store and load operators are matched by storage only (location +
//! function). Every other operator tries identity (the engine's physical ->
//! logical map) and then source location. Operators that match nothing are
//! logged and counted, never fatal.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info};

use planviz_core::config::TranslateConfig;
use planviz_core::dag::{MapReducePlan, PhysicalKind, PhysicalOperator, PhysicalPlan, StagedPlan, TezPlan};
use planviz_core::id::{OpKey, StageId, Uid};
use planviz_core::node::{LocationKey, OperatorDetail, Phase};
use planviz_core::plan::Plan;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssignmentReport {
    /// Physical operators that stamped at least one node.
    pub assigned: usize,
    pub by_storage: usize,
    pub by_identity: usize,
    pub by_location: usize,
    /// Physical operators no node could be found for.
    pub misses: usize,
}

/// `location -> [(function, uid)]`, plan order.
type StorageIndex = HashMap<String, Vec<(String, Uid)>>;

pub struct StageAssigner<'a> {
    plan: &'a mut Plan,
    physical_index: &'a HashMap<OpKey, Uid>,
    location_index: HashMap<LocationKey, Uid>,
    stores: StorageIndex,
    loads: StorageIndex,
    location_fallback: bool,
    report: AssignmentReport,
}

impl<'a> StageAssigner<'a> {
    pub fn new(
        plan: &'a mut Plan,
        physical_index: &'a HashMap<OpKey, Uid>,
        location_fallback: bool,
    ) -> Self {
        let mut location_index = HashMap::new();
        let mut stores = StorageIndex::new();
        let mut loads = StorageIndex::new();
        for node in plan.iter() {
            if !node.location.is_empty() {
                location_index
                    .entry(node.location.key())
                    .or_insert_with(|| node.uid.clone());
            }
            let index = match &node.detail {
                OperatorDetail::Store(_) => &mut stores,
                OperatorDetail::Load(_) => &mut loads,
                _ => continue,
            };
            if let Some(s) = node.detail.storage() {
                index
                    .entry(s.location.clone())
                    .or_default()
                    .push((s.function.clone(), node.uid.clone()));
            }
        }
        Self {
            plan,
            physical_index,
            location_index,
            stores,
            loads,
            location_fallback,
            report: AssignmentReport::default(),
        }
    }

    /// Scan one physical plan, unwrapping containers depth-first.
    pub fn assign_plan(&mut self, pp: &PhysicalPlan, stage: &StageId, phase: Phase) {
        let mut work: Vec<&PhysicalOperator> = pp.operators.iter().rev().collect();
        while let Some(op) = work.pop() {
            let nested: Vec<&PhysicalOperator> = match &op.kind {
                PhysicalKind::LocalRearrange { plans }
                | PhysicalKind::PreCombinerLocalRearrange { plans }
                | PhysicalKind::Split { plans }
                | PhysicalKind::Demux { plans } => {
                    plans.iter().flat_map(|p| p.operators.iter()).collect()
                }
                PhysicalKind::JoinPackage { for_each } => vec![for_each.as_ref()],
                PhysicalKind::MultiQueryPackage { packages } => packages.iter().collect(),
                _ => {
                    self.assign_operator(op, stage, phase);
                    continue;
                }
            };
            work.extend(nested.into_iter().rev());
        }
    }

    fn assign_operator(&mut self, op: &PhysicalOperator, stage: &StageId, phase: Phase) {
        if matches!(op.kind, PhysicalKind::Store { .. } | PhysicalKind::Load { .. }) {
            match self.storage_match(op) {
                Some(uid) => {
                    self.stamp(&uid, stage, phase);
                    self.report.by_storage += 1;
                    self.report.assigned += 1;
                }
                None => {
                    debug!(op = %op.key, name = %op.name, stage = %stage, "no node for storage operator");
                    self.report.misses += 1;
                }
            }
            return;
        }

        if let Some(uid) = self.physical_index.get(&op.key).cloned() {
            self.stamp(&uid, stage, phase);
            debug!(op = %op.key, uid = %uid, "assigned by identity");
            self.report.by_identity += 1;
            self.report.assigned += 1;
            return;
        }

        if self.location_fallback && self.assign_by_location(op, stage, phase) {
            self.report.by_location += 1;
            self.report.assigned += 1;
            return;
        }

        debug!(op = %op.key, name = %op.name, stage = %stage, "no node for physical operator");
        self.report.misses += 1;
    }

    fn storage_match(&self, op: &PhysicalOperator) -> Option<Uid> {
        let (index, file) = match &op.kind {
            PhysicalKind::Store { file } => (&self.stores, file),
            PhysicalKind::Load { file } => (&self.loads, file),
            _ => return None,
        };
        index
            .get(&file.file_name)?
            .iter()
            .find(|(function, _)| file.func_name.ends_with(function.as_str()))
            .map(|(_, uid)| uid.clone())
    }

    /// Only fills unassigned nodes. Joins and groups found this way always
    /// run on the reduce side.
    fn assign_by_location(&mut self, op: &PhysicalOperator, stage: &StageId, phase: Phase) -> bool {
        let mut did_assign = false;
        for loc in &op.original_locations {
            let Some(uid) = self.location_index.get(&loc.key()).cloned() else {
                continue;
            };
            let Some(node) = self.plan.get_mut(&uid) else {
                continue;
            };
            if node.is_assigned() {
                continue;
            }
            let phase = if node.is_join_or_group() {
                Phase::Reducer
            } else {
                phase
            };
            node.set_stage(stage.clone(), phase);
            debug!(op = %op.key, uid = %uid, "assigned by location");
            did_assign = true;
        }
        did_assign
    }

    fn stamp(&mut self, uid: &Uid, stage: &StageId, phase: Phase) {
        if let Some(node) = self.plan.get_mut(uid) {
            node.set_stage(stage.clone(), phase);
        }
    }

    pub fn finish(self) -> AssignmentReport {
        self.report
    }
}

/// Per job: map plan as MAPPER, reduce plan as REDUCER, combine plan as
/// COMBINER.
pub fn assign_mapreduce(
    plan: &mut Plan,
    physical_index: &HashMap<OpKey, Uid>,
    mr: &MapReducePlan,
    cfg: &TranslateConfig,
) -> AssignmentReport {
    let mut assigner = StageAssigner::new(plan, physical_index, cfg.location_fallback);
    for job in &mr.jobs {
        assigner.assign_plan(&job.map_plan, &job.id, Phase::Mapper);
        assigner.assign_plan(&job.reduce_plan, &job.id, Phase::Reducer);
        assigner.assign_plan(&job.combine_plan, &job.id, Phase::Combiner);
    }
    let report = assigner.finish();
    info!(?report, jobs = mr.jobs.len(), "mapreduce stage assignment");
    report
}

/// Per non-group vertex, everything as VERTEX.
pub fn assign_tez(
    plan: &mut Plan,
    physical_index: &HashMap<OpKey, Uid>,
    tez: &TezPlan,
    cfg: &TranslateConfig,
) -> AssignmentReport {
    let mut assigner = StageAssigner::new(plan, physical_index, cfg.location_fallback);
    for vertex in tez.vertices.iter().filter(|v| !v.is_vertex_group()) {
        assigner.assign_plan(&vertex.plan, &vertex.id, Phase::Vertex);
    }
    let report = assigner.finish();
    info!(?report, vertices = tez.vertices.len(), "tez stage assignment");
    report
}

/// Per stage task, with the task's own phase.
pub fn assign_staged(
    plan: &mut Plan,
    physical_index: &HashMap<OpKey, Uid>,
    staged: &StagedPlan,
    cfg: &TranslateConfig,
) -> AssignmentReport {
    let mut assigner = StageAssigner::new(plan, physical_index, cfg.location_fallback);
    for stage in &staged.stages {
        for task in &stage.tasks {
            assigner.assign_plan(&task.plan, &stage.id, task.phase);
        }
    }
    let report = assigner.finish();
    info!(?report, stages = staged.stages.len(), "staged stage assignment");
    report
}
