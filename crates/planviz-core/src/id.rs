//! Strongly-typed identifiers used across the translator.
//!
//! Downstream crates (planner, stage) should *not* pass raw integers or bare
//! strings around for operator, node, or stage identity.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

macro_rules! new_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(v: u64) -> Self {
                Self(v)
            }
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

// Identity of an operator in the engine's physical plan.
new_id!(OpKey);
// Identity of an operator in the engine's logical plan.
new_id!(LogicalKey);

/// Stage (job / vertex) identifier as reported by the execution engine,
/// e.g. `scope-42`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageId(String);

impl StageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for StageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Node identifier inside a [`Plan`](crate::plan::Plan).
///
/// Uids are normally stringified counter values, but upstream id schemes may
/// supply arbitrary strings. Ordering is numeric when both sides are numbers
/// so that plan iteration follows allocation order ("2" < "10").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(String);

impl Uid {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value of the uid, if it is a counter-issued id.
    pub fn numeric(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl Ord for Uid {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for Uid {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for Uid {
    fn from(v: u64) -> Self {
        Self(v.to_string())
    }
}

impl From<&str> for Uid {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Monotonic uid allocator for one translation run.
///
/// Every fresh plan starts at 1. The counter is passed by `&mut` through the
/// translators; there is no process-wide counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UidCounter {
    next: u64,
}

impl Default for UidCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl UidCounter {
    pub const fn new() -> Self {
        Self { next: 1 }
    }

    pub const fn starting_at(next: u64) -> Self {
        Self { next }
    }

    /// Value the next call to [`UidCounter::next_uid`] will hand out.
    pub const fn peek(&self) -> u64 {
        self.next
    }

    pub fn next_uid(&mut self) -> Uid {
        let uid = Uid::from(self.next);
        self.next += 1;
        uid
    }

    /// Move the counter past every numeric uid already present in `plan`.
    /// Never moves backwards.
    pub fn advance_past(&mut self, plan: &crate::plan::Plan) {
        let max = plan.uids().filter_map(Uid::numeric).max().unwrap_or(0);
        self.next = self.next.max(max.saturating_add(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uid_orders_numerically() {
        let mut uids = vec![Uid::from(10), Uid::from(2), Uid::from("x"), Uid::from(1)];
        uids.sort();
        let rendered: Vec<_> = uids.iter().map(|u| u.as_str()).collect();
        assert_eq!(rendered, vec!["1", "2", "10", "x"]);
    }

    #[test]
    fn counter_starts_at_one_and_advances() {
        let mut c = UidCounter::new();
        assert_eq!(c.next_uid().as_str(), "1");
        assert_eq!(c.next_uid().as_str(), "2");
        assert_eq!(c.peek(), 3);
    }

    #[test]
    fn advance_past_saturates_at_the_largest_uid() {
        let plan: crate::plan::Plan =
            std::iter::once(crate::node::OperatorNode::new(Uid::from(u64::MAX), "POStore")).collect();
        let mut c = UidCounter::new();
        c.advance_past(&plan);
        assert_eq!(c.peek(), u64::MAX);
    }
}
