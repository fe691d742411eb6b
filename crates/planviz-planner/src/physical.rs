//! One stage's physical plan -> plan fragment.
//!
//! Used for physical views (Tez vertices, staged tasks) where the graph is
//! rebuilt from physical operators instead of logical ones. Every node of
//! a fragment is stamped with the stage it came from.

use std::collections::{HashMap, HashSet};

use planviz_core::dag::{PhysicalKind, PhysicalOperator, PhysicalPlan};
use planviz_core::error::{Error, Result};
use planviz_core::id::{OpKey, StageId, Uid, UidCounter};
use planviz_core::node::{Location, OperatorDetail, OperatorNode, Phase, StorageInfo};
use planviz_core::plan::Plan;

/// Translated sub-plan plus its boundary uids, both in plan order.
#[derive(Debug, Clone, Default)]
pub struct Fragment {
    pub plan: Plan,
    pub sources: Vec<Uid>,
    pub sinks: Vec<Uid>,
}

/// Where fragment nodes land and how unnamed operators are labelled.
#[derive(Debug, Clone, Copy)]
pub struct StageContext<'a> {
    pub stage: &'a StageId,
    pub phase: Phase,
    pub placeholder_alias: &'a str,
}

pub fn translate_physical(
    pp: &PhysicalPlan,
    counter: &mut UidCounter,
    ctx: StageContext<'_>,
) -> Result<Fragment> {
    let mut local: HashMap<OpKey, Uid> = HashMap::with_capacity(pp.operators.len());
    for op in &pp.operators {
        if local.contains_key(&op.key) {
            return Err(Error::Upstream(format!("physical operator {} listed twice", op.key)));
        }
        local.insert(op.key, counter.next_uid());
    }
    let lookup = |k: &OpKey| {
        local
            .get(k)
            .cloned()
            .ok_or_else(|| Error::Upstream(format!("physical edge references unknown {k}")))
    };

    let adj = pp.adjacency();
    let mut fragment = Fragment::default();
    for op in &pp.operators {
        let uid = lookup(&op.key)?;
        let mut node = translate_operator(uid.clone(), op, ctx);
        for p in adj.predecessors(op.key) {
            node.add_predecessor(&lookup(p)?);
        }
        for s in adj.successors(op.key) {
            node.add_successor(&lookup(s)?);
        }
        if node.predecessors.is_empty() {
            fragment.sources.push(uid.clone());
        }
        if node.successors.is_empty() {
            fragment.sinks.push(uid);
        }
        fragment.plan.insert(node);
    }
    Ok(fragment)
}

/// Build a single node for `op` without any edges.
pub fn translate_operator(uid: Uid, op: &PhysicalOperator, ctx: StageContext<'_>) -> OperatorNode {
    let mut node = OperatorNode::new(uid, op.name.clone())
        .with_alias(
            op.alias
                .clone()
                .unwrap_or_else(|| ctx.placeholder_alias.to_string()),
        )
        .with_location(Location::default());
    node.detail = match &op.kind {
        PhysicalKind::Store { file } => OperatorDetail::Store(StorageInfo {
            location: file.file_name.clone(),
            function: file.short_func_name().to_string(),
        }),
        PhysicalKind::Load { file } => OperatorDetail::Load(StorageInfo {
            location: file.file_name.clone(),
            function: file.short_func_name().to_string(),
        }),
        _ => OperatorDetail::Plain,
    };
    if let PhysicalKind::ForEach { input_plans } = &op.kind {
        node.set_raw_schema_string(foreach_schema(input_plans));
    }
    node.set_stage(ctx.stage.clone(), ctx.phase);
    node
}

/// `(alias:type,alias:type)` from the first leaf of each inner plan.
pub fn foreach_schema(inner_plans: &[PhysicalPlan]) -> String {
    let mut seen: HashSet<String> = HashSet::new();
    let fields: Vec<String> = inner_plans
        .iter()
        .map(|p| inner_plan_field(p, &mut seen))
        .collect();
    format!("({})", fields.join(","))
}

fn inner_plan_field(plan: &PhysicalPlan, seen: &mut HashSet<String>) -> String {
    let Some(leaf) = plan.leaves().into_iter().next() else {
        return String::new();
    };
    let raw = match &leaf.kind {
        PhysicalKind::UserFunc { class_name } => class_name.as_str(),
        _ => leaf.name.as_str(),
    };
    let base = raw.replace(['.', '$'], "_");
    let mut alias = base.clone();
    let mut i = 0;
    while !seen.insert(alias.clone()) {
        alias = format!("{base}{i}");
        i += 1;
    }
    format!("{alias}:{}", type_string(leaf.result_type.as_deref()))
}

fn type_string(ty: Option<&str>) -> String {
    match ty {
        Some("tuple") => "tuple()".to_string(),
        Some("bag") => "bag{}".to_string(),
        Some(other) => other.to_string(),
        None => "bytearray".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use planviz_core::dag::FileSpec;

    fn ctx(stage: &StageId) -> StageContext<'_> {
        StageContext {
            stage,
            phase: Phase::Vertex,
            placeholder_alias: "{tez-inserted-op}",
        }
    }

    fn leaf(key: u64, name: &str, ty: &str) -> PhysicalPlan {
        PhysicalPlan::new(vec![
            PhysicalOperator::new(key, name, PhysicalKind::Other).with_result_type(ty)
        ])
    }

    #[test]
    fn fragment_uids_continue_the_counter_and_carry_stage() {
        let pp = PhysicalPlan::linear(vec![
            PhysicalOperator::new(
                1,
                "POLoad",
                PhysicalKind::Load {
                    file: FileSpec::new("/in", "org.apache.pig.builtin.PigStorage"),
                },
            ),
            PhysicalOperator::new(2, "POFilter", PhysicalKind::Other).with_alias("f"),
            PhysicalOperator::new(3, "POStore", PhysicalKind::Other),
        ]);
        let stage = StageId::new("scope-7");
        let mut counter = UidCounter::starting_at(10);
        let f = translate_physical(&pp, &mut counter, ctx(&stage)).unwrap();
        assert_eq!(f.sources, vec![Uid::from(10)]);
        assert_eq!(f.sinks, vec![Uid::from(12)]);
        assert_eq!(counter.peek(), 13);
        let load = f.plan.get(&Uid::from(10)).unwrap();
        assert_eq!(load.alias.as_deref(), Some("{tez-inserted-op}"));
        assert_eq!(load.stage_id(), Some(&stage));
        assert!(matches!(load.detail, OperatorDetail::Load(_)));
        assert_eq!(f.plan.get(&Uid::from(11)).unwrap().alias.as_deref(), Some("f"));
        assert_eq!(
            f.plan.get(&Uid::from(11)).unwrap().predecessors,
            vec![Uid::from(10)]
        );
    }

    #[test]
    fn foreach_schema_dedupes_and_maps_types() {
        let udf = PhysicalPlan::new(vec![PhysicalOperator::new(
            9,
            "POUserFunc",
            PhysicalKind::UserFunc {
                class_name: "com.acme.Outer$Inner".into(),
            },
        )
        .with_result_type("chararray")]);
        let plans = vec![
            leaf(1, "POProject", "int"),
            leaf(2, "POProject", "tuple"),
            leaf(3, "POProject", "bag"),
            udf,
        ];
        assert_eq!(
            foreach_schema(&plans),
            "(POProject:int,POProject0:tuple(),POProject1:bag{},com_acme_Outer_Inner:chararray)"
        );
    }

    #[test]
    fn foreach_schema_is_stored_verbatim() {
        let op = PhysicalOperator::new(
            4,
            "POForEach",
            PhysicalKind::ForEach {
                input_plans: vec![leaf(1, "POProject", "int")],
            },
        );
        let stage = StageId::new("s");
        let node = translate_operator(Uid::from(1), &op, ctx(&stage));
        assert_eq!(node.schema_string.as_deref(), Some("(POProject:int)"));
        assert!(node.schema.is_empty());
    }

    #[test]
    fn repeated_operator_key_is_upstream_error() {
        let pp = PhysicalPlan::new(vec![
            PhysicalOperator::new(1, "POLoad", PhysicalKind::Other),
            PhysicalOperator::new(1, "POFilter", PhysicalKind::Other),
        ]);
        let stage = StageId::new("s");
        let mut counter = UidCounter::new();
        let err = translate_physical(&pp, &mut counter, ctx(&stage)).unwrap_err();
        assert!(matches!(err, Error::Upstream(ref m) if m.contains("listed twice")));
    }

    #[test]
    fn unknown_edge_is_upstream_error() {
        let mut pp = PhysicalPlan::new(vec![PhysicalOperator::new(1, "POLoad", PhysicalKind::Other)]);
        pp.connect(1, 5);
        let stage = StageId::new("s");
        let err = translate_physical(&pp, &mut UidCounter::new(), ctx(&stage)).unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
    }
}
