//! Structural checks over a finished plan.
//!
//! Cheap enough to run after every build; the pipeline calls
//! [`check_structure`] before handing a plan out.

use planviz_core::error::{Error, Result};
use planviz_core::plan::Plan;

/// Every uid named by an edge list must exist in the plan.
pub fn check_no_dangling(plan: &Plan) -> Result<()> {
    for node in plan.iter() {
        for other in node.successors.iter().chain(&node.predecessors) {
            if !plan.contains(other) {
                return Err(Error::DanglingEdge {
                    node: node.uid.clone(),
                    missing: other.clone(),
                });
            }
        }
    }
    Ok(())
}

/// `b` in `a.successors` iff `a` in `b.predecessors`.
pub fn check_symmetric(plan: &Plan) -> Result<()> {
    for node in plan.iter() {
        for s in &node.successors {
            let mirrored = plan
                .get(s)
                .is_some_and(|n| n.predecessors.contains(&node.uid));
            if !mirrored {
                return Err(Error::Invariant(format!(
                    "edge {} -> {s} has no mirrored predecessor",
                    node.uid
                )));
            }
        }
        for p in &node.predecessors {
            let mirrored = plan
                .get(p)
                .is_some_and(|n| n.successors.contains(&node.uid));
            if !mirrored {
                return Err(Error::Invariant(format!(
                    "edge {p} -> {} has no mirrored successor",
                    node.uid
                )));
            }
        }
    }
    Ok(())
}

pub fn check_structure(plan: &Plan) -> Result<()> {
    check_no_dangling(plan)?;
    check_symmetric(plan)
}
