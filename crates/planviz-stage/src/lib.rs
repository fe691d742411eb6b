#![forbid(unsafe_code)]
//! planviz-stage: stage assignment and graph stitching.
//!
//! Responsibilities:
//! - Stamp logical nodes with the stage/phase their physical operators run in.
//! - Resolve nodes without a physical counterpart from their neighbours.
//! - Stitch per-stage fragments into one graph (physical views).
//! - Verify the result is structurally sound before it leaves the crate.
//!
//! **No I/O, no global state.** Counters are threaded by the caller.

pub mod assign;
pub mod pipeline;
pub mod resolve;
pub mod stitch;
pub mod verify;

pub use assign::{assign_mapreduce, assign_staged, assign_tez, AssignmentReport, StageAssigner};
pub use pipeline::{
    build_logical_view, build_mapreduce_plan, build_package, build_physical_view,
    build_staged_plan, build_tez_plan, BuildOutcome,
};
pub use resolve::{resolve_unknown, ResolveReport};
pub use stitch::{stitch_stages, stitch_tasks, stitch_tez, StitchReport, TaskBoundary};
pub use verify::check_structure;
