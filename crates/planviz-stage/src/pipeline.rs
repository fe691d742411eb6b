//! End-to-end builders: plan inputs in, verified operator graph out.
//!
//! Two views exist per run. The logical view keeps one node per logical
//! operator and stamps stages onto it. The physical view drops that and
//! rebuilds the graph from the stage plans themselves, stitched along the
//! stage graph.

use tracing::info;

use planviz_core::config::TranslateConfig;
use planviz_core::dag::{LogicalPlan, MapReducePlan, StagedPlan, TezPlan};
use planviz_core::error::Result;
use planviz_core::id::UidCounter;
use planviz_core::manifest::PlanPackage;
use planviz_core::node::Phase;
use planviz_core::plan::Plan;
use planviz_planner::dsl::yaml::{Execution, PlanDocument};
use planviz_planner::logical::translate_logical;
use planviz_planner::physical::{translate_physical, StageContext};

use crate::assign::{assign_mapreduce, assign_staged, assign_tez, AssignmentReport};
use crate::resolve::{resolve_unknown, ResolveReport};
use crate::stitch::{stitch_stages, stitch_tasks, stitch_tez, StitchReport, TaskBoundary};
use crate::verify::check_structure;

#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub plan: Plan,
    pub counter: UidCounter,
    pub assignment: Option<AssignmentReport>,
    pub resolution: Option<ResolveReport>,
    pub stitching: Option<StitchReport>,
}

impl BuildOutcome {
    fn new(plan: Plan, counter: UidCounter) -> Self {
        Self {
            plan,
            counter,
            assignment: None,
            resolution: None,
            stitching: None,
        }
    }
}

fn finish_logical(
    mut plan: Plan,
    counter: UidCounter,
    assignment: AssignmentReport,
    phase: Phase,
    cfg: &TranslateConfig,
) -> Result<BuildOutcome> {
    let resolution = cfg
        .resolve_unknown
        .then(|| resolve_unknown(&mut plan, phase));
    check_structure(&plan)?;
    info!(
        nodes = plan.len(),
        stages = plan.stage_ids().len(),
        unassigned = plan.unassigned().count(),
        "built logical view"
    );
    Ok(BuildOutcome {
        resolution,
        assignment: Some(assignment),
        ..BuildOutcome::new(plan, counter)
    })
}

/// Logical view of a MapReduce run. Unresolved nodes get `UNKNOWN`.
pub fn build_mapreduce_plan(
    lp: &LogicalPlan,
    mr: &MapReducePlan,
    cfg: &TranslateConfig,
) -> Result<BuildOutcome> {
    let t = translate_logical(lp)?;
    let mut plan = t.plan;
    let report = assign_mapreduce(&mut plan, &t.physical_index, mr, cfg);
    finish_logical(plan, t.counter, report, Phase::Unknown, cfg)
}

/// Logical view of a Tez run. Unresolved nodes get `VERTEX`.
pub fn build_tez_plan(lp: &LogicalPlan, tez: &TezPlan, cfg: &TranslateConfig) -> Result<BuildOutcome> {
    let t = translate_logical(lp)?;
    let mut plan = t.plan;
    let report = assign_tez(&mut plan, &t.physical_index, tez, cfg);
    finish_logical(plan, t.counter, report, Phase::Vertex, cfg)
}

/// Logical view of a generic staged run.
pub fn build_staged_plan(
    lp: &LogicalPlan,
    staged: &StagedPlan,
    cfg: &TranslateConfig,
) -> Result<BuildOutcome> {
    let t = translate_logical(lp)?;
    let mut plan = t.plan;
    let report = assign_staged(&mut plan, &t.physical_index, staged, cfg);
    finish_logical(plan, t.counter, report, Phase::Unknown, cfg)
}

pub fn build_logical_view(
    lp: &LogicalPlan,
    execution: &Execution,
    cfg: &TranslateConfig,
) -> Result<BuildOutcome> {
    match execution {
        Execution::MapReduce(mr) => build_mapreduce_plan(lp, mr, cfg),
        Execution::Tez(tez) => build_tez_plan(lp, tez, cfg),
        Execution::Staged(staged) => build_staged_plan(lp, staged, cfg),
    }
}

/// Physical view from stage-with-tasks plans: one fragment per task, tasks
/// chained in phase order inside each stage, then stages stitched along
/// their edges.
pub fn build_staged_physical(staged: &StagedPlan, cfg: &TranslateConfig) -> Result<BuildOutcome> {
    let mut counter = UidCounter::new();
    let mut plan = Plan::new();
    let mut report = StitchReport::default();
    let mut per_stage = Vec::with_capacity(staged.stages.len());

    for stage in &staged.stages {
        let mut tasks = Vec::with_capacity(stage.tasks.len());
        for task in &stage.tasks {
            let ctx = StageContext {
                stage: &stage.id,
                phase: task.phase,
                placeholder_alias: &cfg.placeholder_alias,
            };
            let fragment = translate_physical(&task.plan, &mut counter, ctx)?;
            tasks.push(TaskBoundary {
                task_id: task.id.clone(),
                phase: task.phase,
                sources: fragment.sources,
                sinks: fragment.sinks,
            });
            plan.merge(fragment.plan)?;
        }
        per_stage.push((&stage.id, tasks));
    }
    for (stage, tasks) in &per_stage {
        report.edges_added += stitch_tasks(&mut plan, stage, tasks)?;
    }
    let across = stitch_stages(&mut plan, &staged.stage_graph())?;
    report.edges_added += across.edges_added;

    check_structure(&plan)?;
    info!(nodes = plan.len(), ?report, "built staged physical view");
    Ok(BuildOutcome {
        stitching: Some(report),
        ..BuildOutcome::new(plan, counter)
    })
}

/// Physical view of a Tez run: vertex fragments stitched along the Tez DAG
/// with vertex groups collapsed.
pub fn build_tez_physical(tez: &TezPlan, cfg: &TranslateConfig) -> Result<BuildOutcome> {
    let mut counter = UidCounter::new();
    let mut plan = Plan::new();
    for vertex in tez.vertices.iter().filter(|v| !v.is_vertex_group()) {
        let ctx = StageContext {
            stage: &vertex.id,
            phase: Phase::Vertex,
            placeholder_alias: &cfg.placeholder_alias,
        };
        plan.merge(translate_physical(&vertex.plan, &mut counter, ctx)?.plan)?;
    }
    let report = stitch_tez(&mut plan, tez, &mut counter, &cfg.placeholder_alias)?;
    check_structure(&plan)?;
    info!(nodes = plan.len(), ?report, "built tez physical view");
    Ok(BuildOutcome {
        stitching: Some(report),
        ..BuildOutcome::new(plan, counter)
    })
}

pub fn build_physical_view(execution: &Execution, cfg: &TranslateConfig) -> Result<BuildOutcome> {
    match execution {
        Execution::MapReduce(mr) => {
            build_staged_physical(&mr.to_staged(cfg.include_combine_plan), cfg)
        }
        Execution::Tez(tez) => build_tez_physical(tez, cfg),
        Execution::Staged(staged) => build_staged_physical(staged, cfg),
    }
}

/// Package the logical view of `doc` (plus its unoptimized plan, when
/// present) for a visualization backend.
pub fn build_package(doc: &PlanDocument, cfg: &TranslateConfig) -> Result<PlanPackage> {
    cfg.validate()?;
    let optimized = build_logical_view(&doc.logical, &doc.execution, cfg)?;
    let mut package = PlanPackage::new(optimized.plan, cfg)?;
    if let Some(unoptimized) = &doc.unoptimized {
        let t = translate_logical(unoptimized)?;
        check_structure(&t.plan)?;
        package = package.with_unoptimized(t.plan)?;
    }
    if let Some(script) = &doc.script {
        package = package.with_script(script.clone());
    }
    Ok(package)
}

#[cfg(test)]
mod tests {
    use super::*;
    use planviz_core::dag::{
        FileSpec, LogicalKind, LogicalOperator, MapReduceJob, PhysicalKind, PhysicalOperator,
        PhysicalPlan,
    };
    use planviz_core::id::{StageId, Uid};

    const STORAGE: &str = "org.apache.pig.builtin.PigStorage";

    fn logical() -> LogicalPlan {
        let mut lp = LogicalPlan {
            operators: vec![
                LogicalOperator::new(
                    1,
                    LogicalKind::Load {
                        file: FileSpec::new("/in", STORAGE),
                    },
                )
                .with_alias("a"),
                LogicalOperator::new(
                    2,
                    LogicalKind::Other {
                        name: "LOForEach".into(),
                    },
                )
                .with_alias("b"),
                LogicalOperator::new(
                    3,
                    LogicalKind::Store {
                        file: FileSpec::new("/out", STORAGE),
                    },
                )
                .with_alias("b"),
            ],
            edges: vec![],
        };
        lp.connect(1, 2);
        lp.connect(2, 3);
        lp
    }

    fn mr() -> MapReducePlan {
        let load = PhysicalOperator::new(
            10,
            "POLoad",
            PhysicalKind::Load {
                file: FileSpec::new("/in", STORAGE),
            },
        );
        let store = PhysicalOperator::new(
            11,
            "POStore",
            PhysicalKind::Store {
                file: FileSpec::new("/out", STORAGE),
            },
        );
        MapReducePlan {
            jobs: vec![MapReduceJob {
                id: StageId::new("scope-1"),
                map_plan: PhysicalPlan::linear(vec![load]),
                reduce_plan: PhysicalPlan::linear(vec![store]),
                combine_plan: PhysicalPlan::default(),
            }],
            edges: vec![],
        }
    }

    #[test]
    fn mapreduce_logical_view_is_fully_assigned() {
        let out = build_mapreduce_plan(&logical(), &mr(), &TranslateConfig::default()).unwrap();
        let stage = |u: u64| out.plan.get(&Uid::from(u)).unwrap().stage.clone().unwrap();
        assert_eq!(stage(1).phase, Phase::Mapper);
        assert_eq!(stage(3).phase, Phase::Reducer);
        // The foreach has no physical counterpart and is resolved from neighbours.
        assert_eq!(stage(2).stage_id, StageId::new("scope-1"));
        assert_eq!(stage(2).phase, Phase::Unknown);
        assert_eq!(out.assignment.unwrap().by_storage, 2);
    }

    #[test]
    fn resolution_can_be_switched_off() {
        let cfg = TranslateConfig {
            resolve_unknown: false,
            ..TranslateConfig::default()
        };
        let out = build_mapreduce_plan(&logical(), &mr(), &cfg).unwrap();
        assert!(out.resolution.is_none());
        assert_eq!(out.plan.unassigned().count(), 1);
    }

    #[test]
    fn mapreduce_physical_view_links_map_to_reduce() {
        let exec = Execution::MapReduce(mr());
        let out = build_physical_view(&exec, &TranslateConfig::default()).unwrap();
        assert_eq!(out.plan.len(), 2);
        assert_eq!(
            out.plan.get(&Uid::from(1)).unwrap().successors,
            vec![Uid::from(2)]
        );
        assert_eq!(out.stitching.unwrap().edges_added, 1);
    }
}
