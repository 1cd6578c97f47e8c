//! Syntax tree of assertion expressions.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    /// Elementwise logical and (`&`).
    BitAnd,
    /// Elementwise logical or (`|`).
    BitOr,
    /// Short-circuit `and`, yielding an operand.
    And,
    /// Short-circuit `or`, yielding an operand.
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CmpOp {
    pub fn apply(self, a: f64, b: f64) -> bool {
        match self {
            CmpOp::Lt => a < b,
            CmpOp::Le => a <= b,
            CmpOp::Gt => a > b,
            CmpOp::Ge => a >= b,
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Bool(bool),
    /// A registered symbol; `slot` is its position in the argument list.
    Symbol { name: String, slot: usize },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    Call { func: String, args: Vec<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Comparison chain `a < b <= c`, true when every link holds.
    Compare {
        first: Box<Expr>,
        rest: Vec<(CmpOp, Expr)>,
    },
}

impl Expr {
    /// Visit this node and all descendants, parents first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expr)) {
        visit(self);
        match self {
            Expr::Number(_) | Expr::Bool(_) | Expr::Symbol { .. } => {}
            Expr::Index { target, index } => {
                target.walk(visit);
                index.walk(visit);
            }
            Expr::Call { args, .. } => {
                for a in args {
                    a.walk(visit);
                }
            }
            Expr::Unary { operand, .. } => operand.walk(visit),
            Expr::Binary { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            Expr::Compare { first, rest } => {
                first.walk(visit);
                for (_, e) in rest {
                    e.walk(visit);
                }
            }
        }
    }

    /// Mutable counterpart of [`walk`](Self::walk).
    pub fn walk_mut(&mut self, visit: &mut impl FnMut(&mut Expr)) {
        visit(self);
        match self {
            Expr::Number(_) | Expr::Bool(_) | Expr::Symbol { .. } => {}
            Expr::Index { target, index } => {
                target.walk_mut(visit);
                index.walk_mut(visit);
            }
            Expr::Call { args, .. } => {
                for a in args {
                    a.walk_mut(visit);
                }
            }
            Expr::Unary { operand, .. } => operand.walk_mut(visit),
            Expr::Binary { left, right, .. } => {
                left.walk_mut(visit);
                right.walk_mut(visit);
            }
            Expr::Compare { first, rest } => {
                first.walk_mut(visit);
                for (_, e) in rest {
                    e.walk_mut(visit);
                }
            }
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        };
        f.write_str(s)
    }
}
