//! Expression trees attached to logical operators (filter predicates,
//! join/group keys). Pure data; rendering lives in `planviz-planner`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Multiply,
    Divide,
    Add,
    Subtract,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
    Equal,
    NotEqual,
    And,
    Or,
}

impl BinaryOp {
    /// Infix text, padded with spaces.
    pub fn symbol(self) -> &'static str {
        use BinaryOp::*;
        match self {
            Multiply => " * ",
            Divide => " / ",
            Add => " + ",
            Subtract => " - ",
            GreaterThan => " > ",
            GreaterThanEqual => " >= ",
            LessThan => " < ",
            LessThanEqual => " <= ",
            Equal => " == ",
            NotEqual => " != ",
            And => " and ",
            Or => " or ",
        }
    }

    /// Binding strength; higher binds tighter.
    pub fn precedence(self) -> u8 {
        use BinaryOp::*;
        match self {
            Multiply | Divide => 7,
            Add | Subtract => 6,
            GreaterThan | GreaterThanEqual | LessThan | LessThanEqual => 5,
            Equal | NotEqual => 4,
            And => 2,
            Or => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "expr")]
pub enum Expr {
    /// Literal; `None` when the engine built the constant without a value.
    Constant { value: Option<String> },
    /// Column reference by position, with the field alias when known.
    Project {
        #[serde(default)]
        alias: Option<String>,
        column: usize,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    BinCond {
        condition: Box<Expr>,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    UserFunc {
        class_name: String,
        #[serde(default)]
        args: Vec<Expr>,
    },
    MapLookup { map: Box<Expr>, key: String },
    Cast { operand: Box<Expr> },
    /// Any other named operator (`Not`, `IsNull`, `Negative`, ...).
    Call {
        name: String,
        #[serde(default)]
        args: Vec<Expr>,
    },
    /// Leaf without a textual form other than its alias.
    Opaque {
        #[serde(default)]
        alias: Option<String>,
    },
}

impl Expr {
    pub fn constant(v: impl Into<String>) -> Self {
        Expr::Constant {
            value: Some(v.into()),
        }
    }

    pub fn column(alias: impl Into<String>, column: usize) -> Self {
        Expr::Project {
            alias: Some(alias.into()),
            column,
        }
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Direct operands, in order.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Constant { .. } | Expr::Project { .. } | Expr::Opaque { .. } => vec![],
            Expr::Binary { lhs, rhs, .. } => vec![lhs.as_ref(), rhs.as_ref()],
            Expr::BinCond {
                condition,
                lhs,
                rhs,
            } => vec![condition.as_ref(), lhs.as_ref(), rhs.as_ref()],
            Expr::UserFunc { args, .. } | Expr::Call { args, .. } => args.iter().collect(),
            Expr::MapLookup { map, .. } => vec![map.as_ref()],
            Expr::Cast { operand } => vec![operand.as_ref()],
        }
    }
}
