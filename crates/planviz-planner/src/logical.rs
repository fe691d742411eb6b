//! Logical plan -> normalized operator DAG.
//!
//! Every logical operator becomes one node with a fresh uid (plan order,
//! counting from 1). Alongside the plan the translation returns the reverse
//! map from logical keys to uids and the physical index used later by
//! stage assignment.

use std::collections::HashMap;

use tracing::{debug, error};

use planviz_core::dag::{Adjacency, InputKeys, LogicalKind, LogicalOperator, LogicalPlan};
use planviz_core::error::{Error, Result};
use planviz_core::id::{LogicalKey, OpKey, Uid, UidCounter};
use planviz_core::node::{JoinInfo, OperatorDetail, OperatorNode, StorageInfo};
use planviz_core::plan::Plan;

use crate::render::render_expr;

#[derive(Debug, Clone)]
pub struct LogicalTranslation {
    pub plan: Plan,
    pub reverse: HashMap<LogicalKey, Uid>,
    /// Physical operator -> node of the logical operator it was compiled from.
    pub physical_index: HashMap<OpKey, Uid>,
    /// Counter positioned after the last uid handed out.
    pub counter: UidCounter,
}

pub fn translate_logical(lp: &LogicalPlan) -> Result<LogicalTranslation> {
    translate_logical_with(lp, UidCounter::new())
}

/// Translate with an existing counter (used when a second plan must not
/// reuse the first plan's uids).
pub fn translate_logical_with(
    lp: &LogicalPlan,
    mut counter: UidCounter,
) -> Result<LogicalTranslation> {
    let mut reverse = HashMap::with_capacity(lp.operators.len());
    for op in &lp.operators {
        if reverse.insert(op.key, counter.next_uid()).is_some() {
            return Err(Error::Upstream(format!(
                "logical operator {} listed twice",
                op.key
            )));
        }
    }
    for (u, v) in &lp.edges {
        for k in [u, v] {
            if !reverse.contains_key(k) {
                return Err(Error::Upstream(format!(
                    "edge {u} -> {v} references unknown operator {k}"
                )));
            }
        }
    }

    let adj = lp.adjacency();
    let mut plan = Plan::new();
    let mut physical_index = HashMap::new();

    for op in &lp.operators {
        let uid = reverse[&op.key].clone();
        let mut node = OperatorNode::new(uid.clone(), op.kind.operator_name())
            .with_location(op.location.clone());
        node.alias = op.alias.clone();
        if let Some(schema) = &op.schema {
            node.set_schema_text(schema);
        }
        node.detail = match detail_for(op, lp, &adj) {
            Ok(detail) => detail,
            Err(e) => {
                error!(uid = %uid, error = %e, "keeping generic fields only");
                OperatorDetail::Plain
            }
        };
        for p in adj.predecessors(op.key) {
            node.add_predecessor(&reverse[p]);
        }
        for s in adj.successors(op.key) {
            node.add_successor(&reverse[s]);
        }
        for key in &op.physical {
            physical_index.entry(*key).or_insert_with(|| uid.clone());
        }
        plan.insert(node);
    }

    debug!(nodes = plan.len(), "translated logical plan");
    Ok(LogicalTranslation {
        plan,
        reverse,
        physical_index,
        counter,
    })
}

/// One arm per operator kind.
fn detail_for(
    op: &LogicalOperator,
    lp: &LogicalPlan,
    adj: &Adjacency<LogicalKey>,
) -> Result<OperatorDetail> {
    Ok(match &op.kind {
        LogicalKind::Load { file } => OperatorDetail::Load(StorageInfo {
            location: file.file_name.clone(),
            function: file.short_func_name().to_string(),
        }),
        LogicalKind::Store { file } => OperatorDetail::Store(StorageInfo {
            location: file.file_name.clone(),
            function: file.short_func_name().to_string(),
        }),
        LogicalKind::Join {
            strategy,
            inner,
            expressions,
        } => OperatorDetail::Join(JoinInfo {
            strategy: strategy.clone(),
            kind: join_kind(inner).to_string(),
            expressions: render_keys(op, expressions, lp, adj)?,
        }),
        LogicalKind::Cogroup {
            strategy,
            inner,
            expressions,
        } => OperatorDetail::Cogroup(JoinInfo {
            strategy: strategy.clone(),
            kind: cogroup_kind(inner).to_string(),
            expressions: render_keys(op, expressions, lp, adj)?,
        }),
        LogicalKind::Filter { predicate } => OperatorDetail::Filter {
            expression: render_expr(predicate),
        },
        LogicalKind::SplitOutput { predicate } => OperatorDetail::SplitOutput {
            expression: render_expr(predicate),
        },
        LogicalKind::Limit { limit } => OperatorDetail::Limit { row_limit: *limit },
        LogicalKind::Other { .. } => OperatorDetail::Plain,
    })
}

pub fn join_kind(inner: &[bool]) -> &'static str {
    if inner.iter().all(|i| *i) {
        "INNER"
    } else if inner.iter().all(|i| !*i) {
        "FULL OUTER"
    } else if inner.first() == Some(&true) {
        "LEFT OUTER"
    } else {
        "RIGHT OUTER"
    }
}

pub fn cogroup_kind(inner: &[bool]) -> &'static str {
    if inner.iter().any(|i| !*i) {
        "OUTER"
    } else {
        "INNER"
    }
}

fn render_keys(
    op: &LogicalOperator,
    keys: &[InputKeys],
    lp: &LogicalPlan,
    adj: &Adjacency<LogicalKey>,
) -> Result<std::collections::BTreeMap<String, Vec<String>>> {
    let inputs = adj.predecessors(op.key);
    let mut out = std::collections::BTreeMap::new();
    for k in keys {
        let pred = inputs.get(k.input).ok_or_else(|| {
            Error::Upstream(format!(
                "{} has no input #{} ({} inputs)",
                op.key,
                k.input,
                inputs.len()
            ))
        })?;
        let alias = lp
            .operator(*pred)
            .and_then(|p| p.alias.clone())
            .unwrap_or_else(|| format!("${}", k.input));
        out.insert(alias, k.exprs.iter().map(render_expr).collect());
    }
    Ok(out)
}
