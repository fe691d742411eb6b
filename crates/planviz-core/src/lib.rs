#![forbid(unsafe_code)]
//! planviz-core: shared data model for plan translation.
//!
//! - `node` / `plan`: the normalized operator DAG (`OperatorNode`, `Plan`)
//! - `dag`: input plan shapes (logical plan, MapReduce / Tez / staged graphs)
//! - `id`: uids, stage ids, operator keys, and the explicit uid counter
//! - `schema` / `expr`: schema text and expression trees
//! - `config`, `hash`, `manifest`: translation knobs, fingerprints, packages
//!
//! No I/O and no global state here; every translation threads its own counter.

pub mod config;
pub mod dag;
pub mod error;
pub mod expr;
pub mod hash;
pub mod id;
pub mod manifest;
pub mod node;
pub mod plan;
pub mod prelude;
pub mod schema;

/// Crate version recorded in plan packages.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use error::{Error, Result};
