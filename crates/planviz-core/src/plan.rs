//! The normalized operator DAG handed to consumers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::hash::{hash_serde, Hash256};
use crate::id::{StageId, Uid};
use crate::node::OperatorNode;

/// Ordered `uid -> node` map. Iteration follows uid order, which equals
/// allocation order for counter-issued uids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Plan {
    nodes: BTreeMap<Uid, OperatorNode>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node under its own uid, replacing any previous node.
    pub fn insert(&mut self, node: OperatorNode) -> Option<OperatorNode> {
        self.nodes.insert(node.uid.clone(), node)
    }

    pub fn get(&self, uid: &Uid) -> Option<&OperatorNode> {
        self.nodes.get(uid)
    }

    pub fn get_mut(&mut self, uid: &Uid) -> Option<&mut OperatorNode> {
        self.nodes.get_mut(uid)
    }

    pub fn contains(&self, uid: &Uid) -> bool {
        self.nodes.contains_key(uid)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Move every node of `fragment` into this plan. Fragments are expected
    /// to come from the same uid counter, so keys never collide; a collision
    /// is reported rather than silently overwritten.
    pub fn merge(&mut self, fragment: Plan) -> Result<()> {
        for (uid, node) in fragment.nodes {
            if self.nodes.contains_key(&uid) {
                return Err(Error::Invariant(format!(
                    "uid {uid} already present while merging fragment"
                )));
            }
            self.nodes.insert(uid, node);
        }
        Ok(())
    }

    /// Add `from -> to` to both endpoints. Re-adding an existing edge is a
    /// no-op. Both nodes must already exist.
    pub fn connect(&mut self, from: &Uid, to: &Uid) -> Result<()> {
        if !self.nodes.contains_key(to) {
            return Err(Error::DanglingEdge {
                node: from.clone(),
                missing: to.clone(),
            });
        }
        let src = self.nodes.get_mut(from).ok_or_else(|| Error::DanglingEdge {
            node: to.clone(),
            missing: from.clone(),
        })?;
        src.add_successor(to);
        if let Some(dst) = self.nodes.get_mut(to) {
            dst.add_predecessor(from);
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperatorNode> {
        self.nodes.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut OperatorNode> {
        self.nodes.values_mut()
    }

    pub fn uids(&self) -> impl Iterator<Item = &Uid> {
        self.nodes.keys()
    }

    /// Nodes assigned to `stage`, in uid order.
    pub fn nodes_in_stage<'a>(
        &'a self,
        stage: &'a StageId,
    ) -> impl Iterator<Item = &'a OperatorNode> + 'a {
        self.nodes
            .values()
            .filter(move |n| n.stage_id() == Some(stage))
    }

    /// Distinct stage ids in order of first appearance.
    pub fn stage_ids(&self) -> Vec<StageId> {
        let mut out: Vec<StageId> = Vec::new();
        for id in self.nodes.values().filter_map(|n| n.stage_id()) {
            if !out.contains(id) {
                out.push(id.clone());
            }
        }
        out
    }

    pub fn unassigned(&self) -> impl Iterator<Item = &OperatorNode> {
        self.nodes.values().filter(|n| !n.is_assigned())
    }

    /// Stable blake3 digest over the serialized plan.
    pub fn fingerprint(&self) -> Result<Hash256> {
        hash_serde(self)
    }
}

impl FromIterator<OperatorNode> for Plan {
    fn from_iter<I: IntoIterator<Item = OperatorNode>>(iter: I) -> Self {
        let mut plan = Plan::new();
        for node in iter {
            plan.insert(node);
        }
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Phase;

    fn plan_of(n: u64) -> Plan {
        (1..=n)
            .map(|i| OperatorNode::new(Uid::from(i), "LOForEach"))
            .collect()
    }

    #[test]
    fn connect_is_mirrored_and_deduplicated() {
        let mut plan = plan_of(2);
        let (a, b) = (Uid::from(1), Uid::from(2));
        plan.connect(&a, &b).unwrap();
        plan.connect(&a, &b).unwrap();
        assert_eq!(plan.get(&a).unwrap().successors, vec![b.clone()]);
        assert_eq!(plan.get(&b).unwrap().predecessors, vec![a]);
    }

    #[test]
    fn connect_to_missing_node_is_dangling() {
        let mut plan = plan_of(1);
        let err = plan.connect(&Uid::from(1), &Uid::from(9)).unwrap_err();
        assert!(matches!(err, Error::DanglingEdge { .. }));
    }

    #[test]
    fn iteration_follows_numeric_uid_order() {
        let plan = plan_of(12);
        let uids: Vec<_> = plan.uids().map(|u| u.as_str().to_string()).collect();
        assert_eq!(uids[1], "2");
        assert_eq!(uids[11], "12");
    }

    #[test]
    fn merge_rejects_colliding_uids() {
        let mut plan = plan_of(2);
        assert!(plan.merge(plan_of(1)).is_err());
        let extra: Plan = std::iter::once(OperatorNode::new(Uid::from(3), "LOStore")).collect();
        plan.merge(extra).unwrap();
        assert_eq!(plan.len(), 3);
    }

    #[test]
    fn stage_queries() {
        let mut plan = plan_of(3);
        plan.get_mut(&Uid::from(1)).unwrap().set_stage("s2", Phase::Mapper);
        plan.get_mut(&Uid::from(2)).unwrap().set_stage("s1", Phase::Mapper);
        plan.get_mut(&Uid::from(3)).unwrap().set_stage("s2", Phase::Reducer);
        assert_eq!(plan.stage_ids(), vec![StageId::new("s2"), StageId::new("s1")]);
        let s2 = StageId::new("s2");
        assert_eq!(plan.nodes_in_stage(&s2).count(), 2);
        assert_eq!(plan.unassigned().count(), 0);
    }

    #[test]
    fn fingerprint_changes_with_content() {
        let mut plan = plan_of(2);
        let before = plan.fingerprint().unwrap();
        plan.get_mut(&Uid::from(1)).unwrap().set_stage("s", Phase::Mapper);
        assert_ne!(before, plan.fingerprint().unwrap());
    }
}
