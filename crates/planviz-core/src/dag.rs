//! Input plan shapes handed over by the execution engine.
//!
//! The engine produces a logical plan (what the script asked for) and, per
//! execution mode, a graph of stages (MapReduce jobs, Tez vertices, or
//! generic stages with tasks), each holding a physical plan. These types
//! only describe those plans; nothing here mutates them.

use std::collections::HashMap;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::expr::Expr;
use crate::id::{LogicalKey, OpKey, StageId};
use crate::node::{Location, Phase};

/// Storage location plus the fully-qualified load/store function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSpec {
    pub file_name: String,
    pub func_name: String,
}

impl FileSpec {
    pub fn new(file_name: impl Into<String>, func_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            func_name: func_name.into(),
        }
    }

    /// Last dot-separated segment of the function name.
    pub fn short_func_name(&self) -> &str {
        self.func_name.rsplit('.').next().unwrap_or(&self.func_name)
    }
}

/// Ordered adjacency over any key type, derived from an edge list.
#[derive(Debug, Clone)]
pub struct Adjacency<K> {
    succ: HashMap<K, Vec<K>>,
    pred: HashMap<K, Vec<K>>,
}

impl<K: Copy + Eq + Hash> Adjacency<K> {
    pub fn from_edges<'a>(edges: impl IntoIterator<Item = &'a (K, K)>) -> Self
    where
        K: 'a,
    {
        let mut succ: HashMap<K, Vec<K>> = HashMap::new();
        let mut pred: HashMap<K, Vec<K>> = HashMap::new();
        for (u, v) in edges {
            succ.entry(*u).or_default().push(*v);
            pred.entry(*v).or_default().push(*u);
        }
        Self { succ, pred }
    }

    pub fn successors(&self, k: K) -> &[K] {
        self.succ.get(&k).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn predecessors(&self, k: K) -> &[K] {
        self.pred.get(&k).map(Vec::as_slice).unwrap_or(&[])
    }
}

// ---------------------------------------------------------------------------
// Logical plan
// ---------------------------------------------------------------------------

/// Key expressions for one input of a join or cogroup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputKeys {
    /// Position of the input among the operator's predecessors.
    pub input: usize,
    pub exprs: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum LogicalKind {
    Load {
        file: FileSpec,
    },
    Store {
        file: FileSpec,
    },
    Join {
        strategy: String,
        /// One flag per input; `true` means the input is inner.
        inner: Vec<bool>,
        #[serde(default)]
        expressions: Vec<InputKeys>,
    },
    Cogroup {
        strategy: String,
        inner: Vec<bool>,
        #[serde(default)]
        expressions: Vec<InputKeys>,
    },
    Filter {
        predicate: Expr,
    },
    SplitOutput {
        predicate: Expr,
    },
    Limit {
        limit: i64,
    },
    Other {
        name: String,
    },
}

impl LogicalKind {
    /// Operator name shown to consumers.
    pub fn operator_name(&self) -> &str {
        match self {
            LogicalKind::Load { .. } => "LOLoad",
            LogicalKind::Store { .. } => "LOStore",
            LogicalKind::Join { .. } => "LOJoin",
            LogicalKind::Cogroup { .. } => "LOCogroup",
            LogicalKind::Filter { .. } => "LOFilter",
            LogicalKind::SplitOutput { .. } => "LOSplitOutput",
            LogicalKind::Limit { .. } => "LOLimit",
            LogicalKind::Other { name } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalOperator {
    pub key: LogicalKey,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(flatten)]
    pub kind: LogicalKind,
    #[serde(default)]
    pub location: Location,
    /// Output schema text, if the engine computed one.
    #[serde(default)]
    pub schema: Option<String>,
    /// Physical operators compiled from this logical operator.
    #[serde(default)]
    pub physical: Vec<OpKey>,
}

impl LogicalOperator {
    pub fn new(key: u64, kind: LogicalKind) -> Self {
        Self {
            key: LogicalKey::new(key),
            alias: None,
            kind,
            location: Location::default(),
            schema: None,
            physical: vec![],
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_physical(mut self, ops: impl IntoIterator<Item = u64>) -> Self {
        self.physical.extend(ops.into_iter().map(OpKey::new));
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogicalPlan {
    pub operators: Vec<LogicalOperator>,
    #[serde(default)]
    pub edges: Vec<(LogicalKey, LogicalKey)>,
}

impl LogicalPlan {
    pub fn operator(&self, key: LogicalKey) -> Option<&LogicalOperator> {
        self.operators.iter().find(|o| o.key == key)
    }

    pub fn adjacency(&self) -> Adjacency<LogicalKey> {
        Adjacency::from_edges(&self.edges)
    }

    pub fn connect(&mut self, from: u64, to: u64) {
        self.edges.push((LogicalKey::new(from), LogicalKey::new(to)));
    }
}

// ---------------------------------------------------------------------------
// Physical plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum PhysicalKind {
    Store {
        file: FileSpec,
    },
    Load {
        file: FileSpec,
    },
    LocalRearrange {
        plans: Vec<PhysicalPlan>,
    },
    PreCombinerLocalRearrange {
        plans: Vec<PhysicalPlan>,
    },
    Split {
        plans: Vec<PhysicalPlan>,
    },
    Demux {
        plans: Vec<PhysicalPlan>,
    },
    JoinPackage {
        for_each: Box<PhysicalOperator>,
    },
    MultiQueryPackage {
        packages: Vec<PhysicalOperator>,
    },
    ForEach {
        input_plans: Vec<PhysicalPlan>,
    },
    UserFunc {
        class_name: String,
    },
    #[default]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalOperator {
    pub key: OpKey,
    /// Class-like operator name, e.g. `POForEach`.
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    /// Engine type name of the produced value (`tuple`, `bag`, `int`, ...).
    #[serde(default)]
    pub result_type: Option<String>,
    #[serde(default)]
    pub original_locations: Vec<Location>,
    #[serde(flatten)]
    pub kind: PhysicalKind,
}

impl PhysicalOperator {
    pub fn new(key: u64, name: impl Into<String>, kind: PhysicalKind) -> Self {
        Self {
            key: OpKey::new(key),
            name: name.into(),
            alias: None,
            result_type: None,
            original_locations: vec![],
            kind,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_result_type(mut self, ty: impl Into<String>) -> Self {
        self.result_type = Some(ty.into());
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.original_locations.push(location);
        self
    }

    /// Storage spec for store/load operators.
    pub fn file_spec(&self) -> Option<&FileSpec> {
        match &self.kind {
            PhysicalKind::Store { file } | PhysicalKind::Load { file } => Some(file),
            _ => None,
        }
    }

    /// Containers wrap nested operators and are never mapped themselves.
    pub fn is_container(&self) -> bool {
        matches!(
            self.kind,
            PhysicalKind::LocalRearrange { .. }
                | PhysicalKind::PreCombinerLocalRearrange { .. }
                | PhysicalKind::Split { .. }
                | PhysicalKind::Demux { .. }
                | PhysicalKind::JoinPackage { .. }
                | PhysicalKind::MultiQueryPackage { .. }
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicalPlan {
    #[serde(default)]
    pub operators: Vec<PhysicalOperator>,
    #[serde(default)]
    pub edges: Vec<(OpKey, OpKey)>,
}

impl PhysicalPlan {
    pub fn new(operators: Vec<PhysicalOperator>) -> Self {
        Self {
            operators,
            edges: vec![],
        }
    }

    /// Chain the operators in their listed order (op0 -> op1 -> ...).
    pub fn linear(operators: Vec<PhysicalOperator>) -> Self {
        let edges = operators
            .windows(2)
            .map(|w| (w[0].key, w[1].key))
            .collect();
        Self { operators, edges }
    }

    pub fn connect(&mut self, from: u64, to: u64) {
        self.edges.push((OpKey::new(from), OpKey::new(to)));
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    pub fn adjacency(&self) -> Adjacency<OpKey> {
        Adjacency::from_edges(&self.edges)
    }

    /// Operators with no incoming edge, in plan order.
    pub fn roots(&self) -> Vec<&PhysicalOperator> {
        let adj = self.adjacency();
        self.operators
            .iter()
            .filter(|o| adj.predecessors(o.key).is_empty())
            .collect()
    }

    /// Operators with no outgoing edge, in plan order.
    pub fn leaves(&self) -> Vec<&PhysicalOperator> {
        let adj = self.adjacency();
        self.operators
            .iter()
            .filter(|o| adj.successors(o.key).is_empty())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Stage graphs
// ---------------------------------------------------------------------------

/// Dependency DAG over stage ids, separate from the operator DAG.
#[derive(Debug, Clone, Default)]
pub struct StageGraph {
    stages: Vec<StageId>,
    edges: Vec<(StageId, StageId)>,
}

impl StageGraph {
    pub fn new(stages: Vec<StageId>, edges: Vec<(StageId, StageId)>) -> Self {
        Self { stages, edges }
    }

    pub fn stages(&self) -> &[StageId] {
        &self.stages
    }

    pub fn edges(&self) -> &[(StageId, StageId)] {
        &self.edges
    }

    pub fn successors(&self, id: &StageId) -> Vec<&StageId> {
        self.edges
            .iter()
            .filter(|(u, _)| u == id)
            .map(|(_, v)| v)
            .collect()
    }

    pub fn predecessors(&self, id: &StageId) -> Vec<&StageId> {
        self.edges
            .iter()
            .filter(|(_, v)| v == id)
            .map(|(u, _)| u)
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapReduceJob {
    pub id: StageId,
    #[serde(default)]
    pub map_plan: PhysicalPlan,
    #[serde(default)]
    pub reduce_plan: PhysicalPlan,
    #[serde(default)]
    pub combine_plan: PhysicalPlan,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapReducePlan {
    pub jobs: Vec<MapReduceJob>,
    #[serde(default)]
    pub edges: Vec<(StageId, StageId)>,
}

impl MapReducePlan {
    pub fn stage_graph(&self) -> StageGraph {
        StageGraph::new(
            self.jobs.iter().map(|j| j.id.clone()).collect(),
            self.edges.clone(),
        )
    }

    /// View each job as a stage whose tasks are its non-empty phase plans.
    /// The combine plan is included only when asked for.
    pub fn to_staged(&self, include_combine: bool) -> StagedPlan {
        let stages = self
            .jobs
            .iter()
            .map(|job| {
                let mut tasks = vec![];
                let phases = [
                    (Phase::Mapper, &job.map_plan, "map"),
                    (Phase::Combiner, &job.combine_plan, "combine"),
                    (Phase::Reducer, &job.reduce_plan, "reduce"),
                ];
                for (phase, plan, suffix) in phases {
                    if plan.is_empty() || (phase == Phase::Combiner && !include_combine) {
                        continue;
                    }
                    tasks.push(Task {
                        id: format!("{}-{}", job.id, suffix),
                        phase,
                        plan: plan.clone(),
                    });
                }
                Stage {
                    id: job.id.clone(),
                    tasks,
                }
            })
            .collect();
        StagedPlan {
            stages,
            edges: self.edges.clone(),
        }
    }
}

/// Union of several vertices' outputs. Has no operators of its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VertexGroup {
    /// Store performed right after the union, when nothing follows it.
    #[serde(default)]
    pub store: Option<PhysicalOperator>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TezVertex {
    pub id: StageId,
    #[serde(default)]
    pub plan: PhysicalPlan,
    #[serde(default)]
    pub vertex_group: Option<VertexGroup>,
}

impl TezVertex {
    pub fn is_vertex_group(&self) -> bool {
        self.vertex_group.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TezPlan {
    pub vertices: Vec<TezVertex>,
    #[serde(default)]
    pub edges: Vec<(StageId, StageId)>,
}

impl TezPlan {
    pub fn vertex(&self, id: &StageId) -> Option<&TezVertex> {
        self.vertices.iter().find(|v| &v.id == id)
    }

    pub fn stage_graph(&self) -> StageGraph {
        StageGraph::new(
            self.vertices.iter().map(|v| v.id.clone()).collect(),
            self.edges.clone(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub phase: Phase,
    #[serde(default)]
    pub plan: PhysicalPlan,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub id: StageId,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// Generic stages-with-tasks shape (one map and one reduce task per stage
/// at most, in practice).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StagedPlan {
    pub stages: Vec<Stage>,
    #[serde(default)]
    pub edges: Vec<(StageId, StageId)>,
}

impl StagedPlan {
    pub fn stage_graph(&self) -> StageGraph {
        StageGraph::new(
            self.stages.iter().map(|s| s.id.clone()).collect(),
            self.edges.clone(),
        )
    }
}
