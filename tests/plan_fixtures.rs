//! Shared plan fixtures for the integration tests.
#![allow(dead_code)]

use planviz_core::dag::{
    FileSpec, LogicalKind, LogicalOperator, LogicalPlan, MapReduceJob, MapReducePlan, PhysicalKind,
    PhysicalOperator, PhysicalPlan,
};
use planviz_core::expr::{BinaryOp, Expr};
use planviz_core::id::{StageId, Uid};
use planviz_core::node::{Location, Phase};
use planviz_core::plan::Plan;

pub const STORAGE: &str = "org.apache.pig.builtin.PigStorage";
pub const INTERSTORAGE: &str = "org.apache.pig.impl.io.InterStorage";

pub fn load(path: &str) -> LogicalKind {
    LogicalKind::Load {
        file: FileSpec::new(path, STORAGE),
    }
}

pub fn p_load(key: u64, path: &str, func: &str) -> PhysicalOperator {
    PhysicalOperator::new(
        key,
        "POLoad",
        PhysicalKind::Load {
            file: FileSpec::new(path, func),
        },
    )
}

pub fn p_store(key: u64, path: &str, func: &str) -> PhysicalOperator {
    PhysicalOperator::new(
        key,
        "POStore",
        PhysicalKind::Store {
            file: FileSpec::new(path, func),
        },
    )
}

pub fn p_other(key: u64, name: &str) -> PhysicalOperator {
    PhysicalOperator::new(key, name, PhysicalKind::Other)
}

pub fn foreach_location() -> Location {
    Location::new("etl.pig", 4)
}

/// `raw = load; f = filter; g = group; c = foreach; store c`
pub fn etl_logical() -> LogicalPlan {
    let mut lp = LogicalPlan {
        operators: vec![
            LogicalOperator::new(1, load("/data/raw"))
                .with_alias("raw")
                .with_schema("(name:chararray,age:int)")
                .with_physical([100]),
            LogicalOperator::new(
                2,
                LogicalKind::Filter {
                    predicate: Expr::Binary {
                        op: BinaryOp::GreaterThan,
                        lhs: Box::new(Expr::Project {
                            alias: Some("age".into()),
                            column: 1,
                        }),
                        rhs: Box::new(Expr::Constant {
                            value: Some("18".into()),
                        }),
                    },
                },
            )
            .with_alias("f")
            .with_physical([101]),
            LogicalOperator::new(
                3,
                LogicalKind::Cogroup {
                    strategy: "REGULAR".into(),
                    inner: vec![true],
                    expressions: vec![],
                },
            )
            .with_alias("g")
            .with_physical([202]),
            LogicalOperator::new(
                4,
                LogicalKind::Other {
                    name: "LOForEach".into(),
                },
            )
            .with_alias("c")
            .with_location(foreach_location()),
            LogicalOperator::new(
                5,
                LogicalKind::Store {
                    file: FileSpec::new("/data/out", STORAGE),
                },
            )
            .with_alias("c"),
        ],
        edges: vec![],
    };
    for i in 1..5 {
        lp.connect(i, i + 1);
    }
    lp
}

/// Three chained jobs joined through temporary files.
pub fn etl_mapreduce() -> MapReducePlan {
    let job1 = MapReduceJob {
        id: StageId::new("scope-1"),
        map_plan: PhysicalPlan::linear(vec![
            p_load(100, "/data/raw", STORAGE),
            p_other(101, "POFilter"),
            p_store(102, "/tmp/temp-1", INTERSTORAGE),
        ]),
        ..MapReduceJob::default()
    };
    let job2 = MapReduceJob {
        id: StageId::new("scope-2"),
        map_plan: PhysicalPlan::linear(vec![
            p_load(200, "/tmp/temp-1", INTERSTORAGE),
            PhysicalOperator::new(
                201,
                "POLocalRearrange",
                PhysicalKind::LocalRearrange {
                    plans: vec![PhysicalPlan::new(vec![p_other(210, "POProject")])],
                },
            ),
        ]),
        reduce_plan: PhysicalPlan::linear(vec![
            p_other(202, "POPackage"),
            p_other(203, "POForEach").with_location(foreach_location()),
            p_store(204, "/tmp/temp-2", INTERSTORAGE),
        ]),
        ..MapReduceJob::default()
    };
    let job3 = MapReduceJob {
        id: StageId::new("scope-3"),
        map_plan: PhysicalPlan::linear(vec![
            p_load(300, "/tmp/temp-2", INTERSTORAGE),
            p_store(301, "/data/out", STORAGE),
        ]),
        ..MapReduceJob::default()
    };
    MapReducePlan {
        jobs: vec![job1, job2, job3],
        edges: vec![
            (StageId::new("scope-1"), StageId::new("scope-2")),
            (StageId::new("scope-2"), StageId::new("scope-3")),
        ],
    }
}

pub fn stage_of(plan: &Plan, uid: u64) -> Option<(String, Phase)> {
    plan.get(&Uid::from(uid))
        .and_then(|n| n.stage.as_ref())
        .map(|s| (s.stage_id.to_string(), s.phase))
}

pub fn uids(xs: &[u64]) -> Vec<Uid> {
    xs.iter().map(|x| Uid::from(*x)).collect()
}
