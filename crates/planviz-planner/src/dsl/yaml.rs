//! YAML/JSON plan documents: everything one translation needs, in one file.
//!
//! Example:
//! ```yaml
//! config: { job_name: "nightly", include_combine_plan: false }
//! script: "a = load '/in'; store a into '/out';"
//! logical:
//!   operators:
//!     - { key: 1, alias: a, kind: load,
//!         file: { file_name: "/in", func_name: "org.apache.pig.builtin.PigStorage" },
//!         physical: [100] }
//!     - { key: 2, alias: a, kind: store,
//!         file: { file_name: "/out", func_name: "org.apache.pig.builtin.PigStorage" },
//!         physical: [101] }
//!   edges: [[1, 2]]
//! execution:
//!   mode: map_reduce
//!   jobs:
//!     - id: scope-1
//!       map_plan:
//!         operators:
//!           - { key: 100, name: POLoad, kind: load,
//!               file: { file_name: "/in", func_name: "org.apache.pig.builtin.PigStorage" } }
//!           - { key: 101, name: POStore, kind: store,
//!               file: { file_name: "/out", func_name: "org.apache.pig.builtin.PigStorage" } }
//!         edges: [[100, 101]]
//! ```

use serde::{Deserialize, Serialize};

use planviz_core::config::TranslateConfig;
use planviz_core::dag::{LogicalPlan, MapReducePlan, StageGraph, StagedPlan, TezPlan};

/// Partial config carried by a document; only set fields override.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    pub location_fallback: Option<bool>,
    pub resolve_unknown: Option<bool>,
    pub include_combine_plan: Option<bool>,
    pub placeholder_alias: Option<String>,
    pub job_name: Option<String>,
    pub user_name: Option<String>,
}

impl DocumentConfig {
    pub fn apply_to(&self, cfg: &mut TranslateConfig) {
        if let Some(v) = self.location_fallback {
            cfg.location_fallback = v;
        }
        if let Some(v) = self.resolve_unknown {
            cfg.resolve_unknown = v;
        }
        if let Some(v) = self.include_combine_plan {
            cfg.include_combine_plan = v;
        }
        if let Some(alias) = &self.placeholder_alias {
            cfg.placeholder_alias = alias.clone();
        }
        if let Some(job) = &self.job_name {
            cfg.job_name = job.clone();
        }
        if let Some(user) = &self.user_name {
            cfg.user_name = Some(user.clone());
        }
    }
}

/// Execution-mode specific stage graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum Execution {
    MapReduce(MapReducePlan),
    Tez(TezPlan),
    Staged(StagedPlan),
}

impl Execution {
    pub fn mode(&self) -> &'static str {
        match self {
            Execution::MapReduce(_) => "map_reduce",
            Execution::Tez(_) => "tez",
            Execution::Staged(_) => "staged",
        }
    }

    pub fn stage_graph(&self) -> StageGraph {
        match self {
            Execution::MapReduce(p) => p.stage_graph(),
            Execution::Tez(p) => p.stage_graph(),
            Execution::Staged(p) => p.stage_graph(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDocument {
    #[serde(default)]
    pub config: Option<DocumentConfig>,
    #[serde(default)]
    pub script: Option<String>,
    /// Optimized logical plan.
    pub logical: LogicalPlan,
    #[serde(default)]
    pub unoptimized: Option<LogicalPlan>,
    pub execution: Execution,
}

impl PlanDocument {
    pub fn config(&self) -> DocumentConfig {
        self.config.clone().unwrap_or_default()
    }
}

pub fn parse_yaml_document(yaml_src: &str) -> Result<PlanDocument, serde_yaml::Error> {
    serde_yaml::from_str(yaml_src)
}

pub fn parse_json_document(json_src: &str) -> Result<PlanDocument, serde_json::Error> {
    serde_json::from_str(json_src)
}
