//! Convenient re-exports for downstream crates.

pub use crate::config::TranslateConfig;
pub use crate::dag::{
    FileSpec, LogicalKind, LogicalOperator, LogicalPlan, MapReduceJob, MapReducePlan,
    PhysicalKind, PhysicalOperator, PhysicalPlan, Stage, StageGraph, StagedPlan, Task, TezPlan,
    TezVertex, VertexGroup,
};
pub use crate::error::{Error, Result};
pub use crate::expr::{BinaryOp, Expr};
pub use crate::id::{LogicalKey, OpKey, StageId, Uid, UidCounter};
pub use crate::manifest::{PackageId, PlanPackage, RunStatus};
pub use crate::node::{
    JoinInfo, Location, LocationKey, OperatorDetail, OperatorNode, Phase, StageAssignment,
    StorageInfo,
};
pub use crate::plan::Plan;
pub use crate::schema::SchemaElement;
