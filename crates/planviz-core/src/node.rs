//! Output node model: one normalized operator in the visualized DAG.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::id::{StageId, Uid};
use crate::schema::{normalize_schema_text, parse_schema, SchemaElement};

/// Execution phase inside a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Mapper,
    Reducer,
    Combiner,
    Vertex,
    Unknown,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Mapper => "MAPPER",
            Phase::Reducer => "REDUCER",
            Phase::Combiner => "COMBINER",
            Phase::Vertex => "VERTEX",
            Phase::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StageAssignment {
    pub stage_id: StageId,
    pub phase: Phase,
}

impl StageAssignment {
    pub fn new(stage_id: impl Into<StageId>, phase: Phase) -> Self {
        Self {
            stage_id: stage_id.into(),
            phase,
        }
    }
}

/// Source position of an operator in the user's script.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub line: u32,
    /// Enclosing macro names, outermost first.
    #[serde(default)]
    pub macros: Vec<String>,
}

impl Location {
    pub fn new(filename: impl Into<String>, line: u32) -> Self {
        Self {
            filename: Some(filename.into()),
            line,
            macros: vec![],
        }
    }

    pub fn with_macro(mut self, name: impl Into<String>) -> Self {
        self.macros.push(name.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.filename.is_none() && self.line == 0 && self.macros.is_empty()
    }

    pub fn key(&self) -> LocationKey {
        LocationKey {
            filename: self.filename.clone(),
            line: self.line,
            macros: self.macros.clone(),
        }
    }
}

/// Hashable join key derived from a [`Location`]; only used as a fallback.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationKey {
    pub filename: Option<String>,
    pub line: u32,
    pub macros: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageInfo {
    pub location: String,
    /// Short class name of the load/store function.
    pub function: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinInfo {
    pub strategy: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Input alias -> rendered key expressions.
    pub expressions: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum OperatorDetail {
    #[default]
    Plain,
    Load(StorageInfo),
    Store(StorageInfo),
    Join(JoinInfo),
    Cogroup(JoinInfo),
    Filter { expression: String },
    SplitOutput { expression: String },
    Limit { row_limit: i64 },
}

impl OperatorDetail {
    pub fn storage(&self) -> Option<&StorageInfo> {
        match self {
            OperatorDetail::Load(s) | OperatorDetail::Store(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorNode {
    pub uid: Uid,
    pub alias: Option<String>,
    pub operator: String,
    #[serde(default)]
    pub detail: OperatorDetail,
    #[serde(default)]
    pub location: Location,
    pub schema_string: Option<String>,
    #[serde(default)]
    pub schema: Vec<SchemaElement>,
    #[serde(default)]
    pub predecessors: Vec<Uid>,
    #[serde(default)]
    pub successors: Vec<Uid>,
    pub stage: Option<StageAssignment>,
    /// Inserted while stitching; has no operator of its own in any stage plan.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub synthetic: bool,
}

impl OperatorNode {
    pub fn new(uid: Uid, operator: impl Into<String>) -> Self {
        Self {
            uid,
            alias: None,
            operator: operator.into(),
            detail: OperatorDetail::Plain,
            location: Location::default(),
            schema_string: None,
            schema: vec![],
            predecessors: vec![],
            successors: vec![],
            stage: None,
            synthetic: false,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_detail(mut self, detail: OperatorDetail) -> Self {
        self.detail = detail;
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn set_stage(&mut self, stage_id: impl Into<StageId>, phase: Phase) {
        self.stage = Some(StageAssignment::new(stage_id, phase));
    }

    pub fn is_assigned(&self) -> bool {
        self.stage.is_some()
    }

    /// Join or (co)group, by detail or by operator name. The name check
    /// covers nodes whose detail could not be filled.
    pub fn is_join_or_group(&self) -> bool {
        matches!(self.detail, OperatorDetail::Join(_) | OperatorDetail::Cogroup(_))
            || ["LOJoin", "LOCogroup", "LOGroup"]
                .iter()
                .any(|name| self.operator.eq_ignore_ascii_case(name))
    }

    pub fn stage_id(&self) -> Option<&StageId> {
        self.stage.as_ref().map(|s| &s.stage_id)
    }

    /// Store normalized schema text and its parsed form. A parse failure is
    /// logged and leaves the structured schema empty.
    pub fn set_schema_text(&mut self, text: &str) {
        let normalized = normalize_schema_text(text);
        self.schema = match parse_schema(&normalized) {
            Ok(elements) => elements,
            Err(e) => {
                warn!(uid = %self.uid, error = %e, "could not parse schema text");
                vec![]
            }
        };
        self.schema_string = Some(normalized);
    }

    /// Store schema text exactly as given. No normalization, no parse.
    pub fn set_raw_schema_string(&mut self, text: impl Into<String>) {
        self.schema_string = Some(text.into());
    }

    pub fn add_successor(&mut self, uid: &Uid) {
        if !self.successors.contains(uid) {
            self.successors.push(uid.clone());
        }
    }

    pub fn add_predecessor(&mut self, uid: &Uid) {
        if !self.predecessors.contains(uid) {
            self.predecessors.push(uid.clone());
        }
    }
}
