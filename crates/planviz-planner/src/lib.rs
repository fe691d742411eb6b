#![forbid(unsafe_code)]
//! planviz-planner: engine plans -> normalized operator graph.
//!
//! - `logical`: logical plan translation (uids, details, reverse maps)
//! - `render`: expression trees to text
//! - `physical`: per-stage physical plans to stamped fragments
//! - `dsl::yaml`: plan documents bundling all inputs for one run
//!
//! Stage assignment and stitching live in `planviz-stage`.

pub mod dsl;
pub mod logical;
pub mod physical;
pub mod render;

pub use dsl::yaml::{parse_json_document, parse_yaml_document, DocumentConfig, Execution, PlanDocument};
pub use logical::{translate_logical, translate_logical_with, LogicalTranslation};
pub use physical::{translate_operator, translate_physical, Fragment, StageContext};
pub use render::render_expr;
