//! Plan package: everything a visualization backend receives for one run.
//!
//! Bundles the optimized and unoptimized plans with the script text and run
//! metadata, plus blake3 fingerprints so consumers can tell whether a
//! re-sent package actually changed.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::TranslateConfig;
use crate::error::Result;
use crate::hash::Hash256;
use crate::plan::Plan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageId(pub Uuid);

impl PackageId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for PackageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanPackage {
    pub id: PackageId,
    pub user_name: Option<String>,
    pub job_name: String,
    pub status: RunStatus,
    #[serde(default)]
    pub script: Option<String>,
    pub optimized: Plan,
    pub unoptimized: Option<Plan>,
    pub optimized_fingerprint: Hash256,
    pub unoptimized_fingerprint: Option<Hash256>,
    /// Crate version that produced the package.
    pub producer_version: String,
}

impl PlanPackage {
    pub fn new(optimized: Plan, cfg: &TranslateConfig) -> Result<Self> {
        let optimized_fingerprint = optimized.fingerprint()?;
        Ok(Self {
            id: PackageId::new_v4(),
            user_name: cfg.user_name.clone(),
            job_name: cfg.job_name.clone(),
            status: RunStatus::Running,
            script: None,
            optimized,
            unoptimized: None,
            optimized_fingerprint,
            unoptimized_fingerprint: None,
            producer_version: crate::VERSION.to_string(),
        })
    }

    pub fn with_unoptimized(mut self, plan: Plan) -> Result<Self> {
        self.unoptimized_fingerprint = Some(plan.fingerprint()?);
        self.unoptimized = Some(plan);
        Ok(self)
    }

    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.script = Some(script.into());
        self
    }

    pub fn finish(mut self, status: RunStatus) -> Self {
        self.status = status;
        self
    }
}
