//! Tree-walking interpreter for assertion expressions.
//!
//! Values are numbers, booleans or numeric vectors. Arithmetic broadcasts a
//! scalar over a vector and combines equal-length vectors elementwise.
//! Booleans take part in arithmetic as 0 and 1.

use std::fmt;

use simx_core::{Sample, Value};

use crate::ast::{BinaryOp, CmpOp, Expr, UnaryOp};
use crate::error::{AssertError, Result};

/// Functions callable from assertion expressions.
pub const FUNCTIONS: &[&str] = &[
    "abs", "sin", "cos", "tan", "asin", "acos", "atan", "atan2", "sqrt", "exp", "log", "log10",
    "pow", "floor", "ceil", "min", "max", "dot", "norm",
];

pub fn is_function(name: &str) -> bool {
    FUNCTIONS.contains(&name)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Val {
    Num(f64),
    Bool(bool),
    Vector(Vec<f64>),
}

impl Val {
    pub fn truthy(&self) -> Result<bool> {
        match self {
            Val::Bool(b) => Ok(*b),
            Val::Num(n) => Ok(*n != 0.0),
            Val::Vector(v) if v.len() == 1 => Ok(v[0] != 0.0),
            Val::Vector(v) => Err(AssertError::Ambiguous(v.len())),
        }
    }

    pub fn as_num(&self) -> Result<f64> {
        match self {
            Val::Num(n) => Ok(*n),
            Val::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Val::Vector(v) if v.len() == 1 => Ok(v[0]),
            Val::Vector(v) => Err(AssertError::Type(format!(
                "expected a scalar, found a vector of length {}",
                v.len()
            ))),
        }
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Val::Bool(_))
    }

    /// Convert a recorded sample. Strings have no numeric value.
    pub fn from_sample(sample: &Sample) -> Result<Self> {
        fn num(v: &Value) -> Result<f64> {
            v.as_f64()
                .ok_or_else(|| AssertError::Type(format!("{v} is not numeric")))
        }
        match sample {
            Sample::Scalar(Value::Boolean(b)) => Ok(Val::Bool(*b)),
            Sample::Scalar(v) => num(v).map(Val::Num),
            Sample::Vector(vs) => vs.iter().map(num).collect::<Result<_>>().map(Val::Vector),
        }
    }
}

impl From<f64> for Val {
    fn from(v: f64) -> Self {
        Val::Num(v)
    }
}

impl From<bool> for Val {
    fn from(v: bool) -> Self {
        Val::Bool(v)
    }
}

impl From<Vec<f64>> for Val {
    fn from(v: Vec<f64>) -> Self {
        Val::Vector(v)
    }
}

impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Val::Num(n) => write!(f, "{n}"),
            Val::Bool(true) => write!(f, "True"),
            Val::Bool(false) => write!(f, "False"),
            Val::Vector(v) => write!(f, "{v:?}"),
        }
    }
}

/// Evaluate `expr` with symbol values `args`, indexed by symbol slot.
pub fn evaluate(expr: &Expr, args: &[Val]) -> Result<Val> {
    match expr {
        Expr::Number(n) => Ok(Val::Num(*n)),
        Expr::Bool(b) => Ok(Val::Bool(*b)),
        Expr::Symbol { name, slot } => args
            .get(*slot)
            .cloned()
            .ok_or_else(|| AssertError::UnknownSymbol(name.clone())),
        Expr::Index { target, index } => {
            let Val::Vector(v) = evaluate(target, args)? else {
                return Err(AssertError::Type("only vectors can be indexed".into()));
            };
            let i = evaluate(index, args)?.as_num()?;
            if i.fract() != 0.0 {
                return Err(AssertError::Type(format!("index {i} is not an integer")));
            }
            let i = i as i64;
            let pos = if i < 0 { i + v.len() as i64 } else { i };
            usize::try_from(pos)
                .ok()
                .and_then(|p| v.get(p))
                .map(|x| Val::Num(*x))
                .ok_or(AssertError::IndexOutOfRange { index: i, len: v.len() })
        }
        Expr::Call { func, args: call_args } => {
            let values = call_args
                .iter()
                .map(|a| evaluate(a, args))
                .collect::<Result<Vec<_>>>()?;
            call(func, values)
        }
        Expr::Unary { op, operand } => {
            let v = evaluate(operand, args)?;
            match op {
                UnaryOp::Not => Ok(Val::Bool(!v.truthy()?)),
                UnaryOp::Neg => map(&v, |x| -x),
            }
        }
        Expr::Binary { op: BinaryOp::And, left, right } => {
            let l = evaluate(left, args)?;
            if l.truthy()? {
                evaluate(right, args)
            } else {
                Ok(l)
            }
        }
        Expr::Binary { op: BinaryOp::Or, left, right } => {
            let l = evaluate(left, args)?;
            if l.truthy()? {
                Ok(l)
            } else {
                evaluate(right, args)
            }
        }
        Expr::Binary { op, left, right } => {
            let l = evaluate(left, args)?;
            let r = evaluate(right, args)?;
            binary(*op, &l, &r)
        }
        Expr::Compare { first, rest } => {
            let mut left = evaluate(first, args)?;
            for (op, right) in rest {
                let right = evaluate(right, args)?;
                if !compare(*op, &left, &right)? {
                    return Ok(Val::Bool(false));
                }
                left = right;
            }
            Ok(Val::Bool(true))
        }
    }
}

fn binary(op: BinaryOp, l: &Val, r: &Val) -> Result<Val> {
    match op {
        BinaryOp::Add => broadcast(l, r, |a, b| Ok(a + b)),
        BinaryOp::Sub => broadcast(l, r, |a, b| Ok(a - b)),
        BinaryOp::Mul => broadcast(l, r, |a, b| Ok(a * b)),
        BinaryOp::Div => broadcast(l, r, |a, b| {
            if b == 0.0 {
                Err(AssertError::DivisionByZero)
            } else {
                Ok(a / b)
            }
        }),
        BinaryOp::Mod => broadcast(l, r, |a, b| {
            if b == 0.0 {
                return Err(AssertError::DivisionByZero);
            }
            let m = a % b;
            Ok(if m != 0.0 && (m < 0.0) != (b < 0.0) { m + b } else { m })
        }),
        BinaryOp::Pow => broadcast(l, r, |a, b| Ok(a.powf(b))),
        BinaryOp::BitAnd => Ok(Val::Bool(l.truthy()? & r.truthy()?)),
        BinaryOp::BitOr => Ok(Val::Bool(l.truthy()? | r.truthy()?)),
        BinaryOp::And | BinaryOp::Or => Err(AssertError::Type(format!(
            "'{op}' needs lazy evaluation"
        ))),
    }
}

fn compare(op: CmpOp, l: &Val, r: &Val) -> Result<bool> {
    if matches!(l, Val::Vector(v) if v.len() != 1) || matches!(r, Val::Vector(v) if v.len() != 1) {
        return Err(AssertError::Type(
            "vectors cannot be compared; index them or reduce with norm/min/max".into(),
        ));
    }
    Ok(op.apply(l.as_num()?, r.as_num()?))
}

fn map(v: &Val, f: impl Fn(f64) -> f64) -> Result<Val> {
    match v {
        Val::Vector(xs) => Ok(Val::Vector(xs.iter().map(|x| f(*x)).collect())),
        other => Ok(Val::Num(f(other.as_num()?))),
    }
}

fn broadcast(l: &Val, r: &Val, f: impl Fn(f64, f64) -> Result<f64>) -> Result<Val> {
    match (l, r) {
        (Val::Vector(a), Val::Vector(b)) => {
            if a.len() != b.len() {
                return Err(AssertError::Type(format!(
                    "vector lengths {} and {} differ",
                    a.len(),
                    b.len()
                )));
            }
            a.iter()
                .zip(b)
                .map(|(x, y)| f(*x, *y))
                .collect::<Result<_>>()
                .map(Val::Vector)
        }
        (Val::Vector(a), s) => {
            let y = s.as_num()?;
            a.iter().map(|x| f(*x, y)).collect::<Result<_>>().map(Val::Vector)
        }
        (s, Val::Vector(b)) => {
            let x = s.as_num()?;
            b.iter().map(|y| f(x, *y)).collect::<Result<_>>().map(Val::Vector)
        }
        (a, b) => f(a.as_num()?, b.as_num()?).map(Val::Num),
    }
}

fn arity(func: &str, expected: &'static str, args: &[Val], ok: bool) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(AssertError::Arity {
            func: func.to_string(),
            expected,
            found: args.len(),
        })
    }
}

fn call(func: &str, args: Vec<Val>) -> Result<Val> {
    let unary: Option<fn(f64) -> f64> = match func {
        "abs" => Some(f64::abs),
        "sin" => Some(f64::sin),
        "cos" => Some(f64::cos),
        "tan" => Some(f64::tan),
        "asin" => Some(f64::asin),
        "acos" => Some(f64::acos),
        "atan" => Some(f64::atan),
        "sqrt" => Some(f64::sqrt),
        "exp" => Some(f64::exp),
        "log10" => Some(f64::log10),
        "floor" => Some(f64::floor),
        "ceil" => Some(f64::ceil),
        _ => None,
    };
    if let Some(f) = unary {
        arity(func, "1", &args, args.len() == 1)?;
        return map(&args[0], f);
    }

    match func {
        "log" => {
            arity(func, "1 or 2", &args, matches!(args.len(), 1 | 2))?;
            match args.get(1) {
                None => map(&args[0], f64::ln),
                Some(base) => broadcast(&args[0], base, |x, b| Ok(x.log(b))),
            }
        }
        "atan2" | "pow" => {
            arity(func, "2", &args, args.len() == 2)?;
            if func == "pow" {
                broadcast(&args[0], &args[1], |a, b| Ok(a.powf(b)))
            } else {
                broadcast(&args[0], &args[1], |y, x| Ok(y.atan2(x)))
            }
        }
        "min" | "max" => {
            arity(func, "at least 1", &args, !args.is_empty())?;
            let items: Vec<f64> = match args.as_slice() {
                [Val::Vector(v)] => v.clone(),
                _ => args.iter().map(Val::as_num).collect::<Result<_>>()?,
            };
            let pick = if func == "min" { f64::min } else { f64::max };
            items
                .into_iter()
                .reduce(pick)
                .map(Val::Num)
                .ok_or_else(|| AssertError::Type(format!("{func}() of an empty vector")))
        }
        "dot" => {
            arity(func, "2", &args, args.len() == 2)?;
            match (&args[0], &args[1]) {
                (Val::Vector(a), Val::Vector(b)) => {
                    if a.len() != b.len() {
                        return Err(AssertError::Type(format!(
                            "dot() of vectors with lengths {} and {}",
                            a.len(),
                            b.len()
                        )));
                    }
                    Ok(Val::Num(a.iter().zip(b).map(|(x, y)| x * y).sum()))
                }
                (a, b) => broadcast(a, b, |x, y| Ok(x * y)),
            }
        }
        "norm" => {
            arity(func, "1", &args, args.len() == 1)?;
            match &args[0] {
                Val::Vector(v) => Ok(Val::Num(v.iter().map(|x| x * x).sum::<f64>().sqrt())),
                other => Ok(Val::Num(other.as_num()?.abs())),
            }
        }
        other => Err(AssertError::UnknownFunction(other.to_string())),
    }
}
