//! Physical views of generic staged plans and Tez DAGs.

mod plan_fixtures;

use planviz_core::config::{TranslateConfig, DEFAULT_PLACEHOLDER_ALIAS};
use planviz_core::dag::{
    FileSpec, LogicalKind, LogicalOperator, LogicalPlan, PhysicalPlan, Stage, StagedPlan, Task,
    TezPlan, TezVertex, VertexGroup,
};
use planviz_core::id::{StageId, Uid};
use planviz_core::node::{OperatorDetail, Phase};
use planviz_planner::Execution;
use planviz_stage::stitch::{stitch_tez, StitchReport};
use planviz_stage::verify::check_structure;
use planviz_stage::{build_logical_view, build_physical_view};
use plan_fixtures::*;

fn task(id: &str, phase: Phase, plan: PhysicalPlan) -> Task {
    Task {
        id: id.into(),
        phase,
        plan,
    }
}

fn reduce_listed_first() -> Stage {
    Stage {
        id: StageId::new("st-1"),
        tasks: vec![
            task(
                "st-1-r",
                Phase::Reducer,
                PhysicalPlan::linear(vec![p_other(20, "POPackage"), p_other(21, "POForEach")]),
            ),
            task(
                "st-1-m",
                Phase::Mapper,
                PhysicalPlan::linear(vec![p_load(10, "/in", STORAGE), p_other(11, "POLocalRearrange")]),
            ),
        ],
    }
}

#[test]
fn test_two_task_stage_links_map_into_reduce() {
    let staged = StagedPlan {
        stages: vec![reduce_listed_first()],
        edges: vec![],
    };
    let out = build_physical_view(&Execution::Staged(staged), &TranslateConfig::default())
        .expect("build");
    // reduce task got uids 1-2, map task 3-4
    assert_eq!(stage_of(&out.plan, 1), Some(("st-1".into(), Phase::Reducer)));
    assert_eq!(out.plan.get(&Uid::from(4)).unwrap().successors, uids(&[1]));
    assert_eq!(out.stitching.unwrap().edges_added, 1);
    check_structure(&out.plan).expect("structure");
}

#[test]
fn test_equal_task_phases_stay_unlinked() {
    let staged = StagedPlan {
        stages: vec![Stage {
            id: StageId::new("st-1"),
            tasks: vec![
                task("a", Phase::Mapper, PhysicalPlan::linear(vec![p_other(1, "POForEach")])),
                task("b", Phase::Mapper, PhysicalPlan::linear(vec![p_other(2, "POFilter")])),
            ],
        }],
        edges: vec![],
    };
    let out = build_physical_view(&Execution::Staged(staged), &TranslateConfig::default())
        .expect("build");
    assert!(out.plan.get(&Uid::from(1)).unwrap().successors.is_empty());
    assert!(out.plan.get(&Uid::from(2)).unwrap().predecessors.is_empty());
    assert_eq!(out.stitching.unwrap().edges_added, 0);
}

#[test]
fn test_stage_edges_continue_from_reduce_sinks() {
    let staged = StagedPlan {
        stages: vec![
            reduce_listed_first(),
            Stage {
                id: StageId::new("st-2"),
                tasks: vec![task(
                    "st-2-m",
                    Phase::Mapper,
                    PhysicalPlan::linear(vec![p_load(30, "/tmp/x", INTERSTORAGE)]),
                )],
            },
        ],
        edges: vec![(StageId::new("st-1"), StageId::new("st-2"))],
    };
    let out = build_physical_view(&Execution::Staged(staged), &TranslateConfig::default())
        .expect("build");
    assert_eq!(out.plan.get(&Uid::from(2)).unwrap().successors, uids(&[5]));
    assert_eq!(out.plan.get(&Uid::from(5)).unwrap().predecessors, uids(&[2]));
    assert_eq!(out.stitching.unwrap().edges_added, 2);
}

fn union_tez(store: bool, successor: bool) -> TezPlan {
    let group = TezVertex {
        id: StageId::new("scope-9"),
        plan: PhysicalPlan::default(),
        vertex_group: Some(VertexGroup {
            store: store.then(|| p_store(99, "/out", STORAGE)),
        }),
    };
    let mut vertices = vec![
        TezVertex {
            id: StageId::new("scope-1"),
            plan: PhysicalPlan::linear(vec![p_load(10, "/a", STORAGE)]),
            vertex_group: None,
        },
        TezVertex {
            id: StageId::new("scope-2"),
            plan: PhysicalPlan::linear(vec![p_load(20, "/b", STORAGE)]),
            vertex_group: None,
        },
        group,
    ];
    let mut edges = vec![
        (StageId::new("scope-1"), StageId::new("scope-9")),
        (StageId::new("scope-2"), StageId::new("scope-9")),
    ];
    if successor {
        vertices.push(TezVertex {
            id: StageId::new("scope-3"),
            plan: PhysicalPlan::linear(vec![p_other(30, "POForEach")]),
            vertex_group: None,
        });
        edges.push((StageId::new("scope-9"), StageId::new("scope-3")));
    }
    TezPlan { vertices, edges }
}

#[test]
fn test_tez_union_store_is_collapsed_into_each_input_vertex() {
    let tez = union_tez(true, false);
    let mut out = build_physical_view(&Execution::Tez(tez.clone()), &TranslateConfig::default())
        .expect("build");
    assert_eq!(out.plan.len(), 4);
    assert_eq!(
        out.stitching.unwrap(),
        StitchReport {
            edges_added: 2,
            synthetic_stores: 2
        }
    );
    for (load, store, vertex) in [(1, 3, "scope-1"), (2, 4, "scope-2")] {
        let node = out.plan.get(&Uid::from(store)).unwrap();
        assert_eq!(node.predecessors, uids(&[load]));
        assert_eq!(node.stage_id(), Some(&StageId::new(vertex)));
        assert_eq!(node.alias.as_deref(), Some(DEFAULT_PLACEHOLDER_ALIAS));
        assert_eq!(node.detail.storage().map(|s| s.location.as_str()), Some("/out"));
    }
    assert!(out.plan.stage_ids().iter().all(|s| s.as_str() != "scope-9"));

    let snapshot = out.plan.clone();
    let rerun = stitch_tez(&mut out.plan, &tez, &mut out.counter, DEFAULT_PLACEHOLDER_ALIAS)
        .expect("rerun");
    assert_eq!(rerun, StitchReport::default());
    assert_eq!(out.plan, snapshot);
}

#[test]
fn test_tez_group_with_successor_is_bypassed() {
    let out = build_physical_view(&Execution::Tez(union_tez(true, true)), &TranslateConfig::default())
        .expect("build");
    assert_eq!(out.plan.len(), 3);
    assert_eq!(out.plan.get(&Uid::from(3)).unwrap().predecessors, uids(&[1, 2]));
    assert_eq!(out.stitching.unwrap().synthetic_stores, 0);
}

#[test]
fn test_tez_terminal_group_without_store_adds_nothing() {
    let out = build_physical_view(&Execution::Tez(union_tez(false, false)), &TranslateConfig::default())
        .expect("build");
    assert_eq!(out.plan.len(), 2);
    assert_eq!(out.stitching.unwrap(), StitchReport::default());
}

#[test]
fn test_tez_logical_union_resolves_into_first_input_vertex() {
    let mut lp = LogicalPlan {
        operators: vec![
            LogicalOperator::new(1, load("/a")).with_alias("a"),
            LogicalOperator::new(2, load("/b")).with_alias("b"),
            LogicalOperator::new(
                3,
                LogicalKind::Other {
                    name: "LOUnion".into(),
                },
            )
            .with_alias("u"),
            LogicalOperator::new(
                4,
                LogicalKind::Store {
                    file: FileSpec::new("/out", STORAGE),
                },
            )
            .with_alias("u"),
        ],
        edges: vec![],
    };
    lp.connect(1, 3);
    lp.connect(2, 3);
    lp.connect(3, 4);

    let out = build_logical_view(&lp, &Execution::Tez(union_tez(true, false)), &TranslateConfig::default())
        .expect("build");
    assert_eq!(stage_of(&out.plan, 1), Some(("scope-1".into(), Phase::Vertex)));
    assert_eq!(stage_of(&out.plan, 2), Some(("scope-2".into(), Phase::Vertex)));
    assert_eq!(stage_of(&out.plan, 3), Some(("scope-1".into(), Phase::Vertex)));
    assert_eq!(stage_of(&out.plan, 4), Some(("scope-1".into(), Phase::Vertex)));
    assert!(matches!(
        out.plan.get(&Uid::from(4)).unwrap().detail,
        OperatorDetail::Store(_)
    ));
}
