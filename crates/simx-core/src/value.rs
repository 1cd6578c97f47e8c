//! Typed scalar values and recorded samples.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Element type of a model variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarType {
    Real,
    Integer,
    Boolean,
    String,
}

impl VarType {
    /// Parse an FMI type tag (`Real`, `Integer`, `Boolean`, `String`, `Enumeration`).
    ///
    /// Enumerations are exchanged as integers.
    pub fn from_fmi(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "real" | "float" | "float64" => Some(VarType::Real),
            "integer" | "int" | "enumeration" => Some(VarType::Integer),
            "boolean" | "bool" => Some(VarType::Boolean),
            "string" => Some(VarType::String),
            _ => None,
        }
    }

    /// Convert a value to this element type.
    pub fn cast(self, value: &Value) -> Result<Value> {
        let fail = || CoreError::Conversion {
            value: value.to_string(),
            target: self.name(),
        };
        match self {
            VarType::Real => match value {
                Value::Real(v) => Ok(Value::Real(*v)),
                Value::Integer(v) => Ok(Value::Real(*v as f64)),
                Value::Boolean(v) => Ok(Value::Real(if *v { 1.0 } else { 0.0 })),
                Value::String(s) => s.trim().parse().map(Value::Real).map_err(|_| fail()),
            },
            VarType::Integer => match value {
                Value::Integer(v) => Ok(Value::Integer(*v)),
                Value::Real(v) if v.is_finite() => Ok(Value::Integer(v.trunc() as i64)),
                Value::Real(_) => Err(fail()),
                Value::Boolean(v) => Ok(Value::Integer(i64::from(*v))),
                Value::String(s) => s.trim().parse().map(Value::Integer).map_err(|_| fail()),
            },
            VarType::Boolean => match value {
                Value::Boolean(v) => Ok(Value::Boolean(*v)),
                Value::Integer(v) => Ok(Value::Boolean(*v != 0)),
                Value::Real(v) => Ok(Value::Boolean(*v != 0.0)),
                Value::String(s) => Ok(Value::Boolean(s.to_ascii_lowercase().contains("true"))),
            },
            VarType::String => Ok(Value::String(match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })),
        }
    }

    /// The zero value of this type.
    pub fn zero(self) -> Value {
        match self {
            VarType::Real => Value::Real(0.0),
            VarType::Integer => Value::Integer(0),
            VarType::Boolean => Value::Boolean(false),
            VarType::String => Value::String(String::new()),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            VarType::Real => "real",
            VarType::Integer => "integer",
            VarType::Boolean => "boolean",
            VarType::String => "string",
        }
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single value exchanged with a model variable.
///
/// Deserialization tries the variants in declaration order, so JSON `true`
/// becomes a boolean, `3` an integer and `3.0` a real.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Real(f64),
    String(String),
}

impl Value {
    /// Numeric view of the value. Booleans map to 0/1, strings have none.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Real(v) => Some(*v),
            Value::Integer(v) => Some(*v as f64),
            Value::Boolean(v) => Some(if *v { 1.0 } else { 0.0 }),
            Value::String(_) => None,
        }
    }

    /// Convert a JSON atom. Arrays, objects and null have no scalar value.
    pub fn from_json(json: &serde_json::Value) -> Option<Value> {
        match json {
            serde_json::Value::Bool(b) => Some(Value::Boolean(*b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Value::Integer(i)),
                None => n.as_f64().map(Value::Real),
            },
            serde_json::Value::String(s) => Some(Value::String(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Integer(v) => write!(f, "{v}"),
            Value::Real(v) => write!(f, "{v:?}"),
            Value::String(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

/// A recorded observation: a bare scalar or a vector of element values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Sample {
    Scalar(Value),
    Vector(Vec<Value>),
}

impl Sample {
    /// Build a sample from the values returned by a get action.
    /// Single-element results are stored bare.
    pub fn from_values(mut values: Vec<Value>) -> Self {
        if values.len() == 1 {
            Sample::Scalar(values.remove(0))
        } else {
            Sample::Vector(values)
        }
    }

    /// Element `index`; a scalar only has element 0.
    pub fn element(&self, index: usize) -> Option<&Value> {
        match self {
            Sample::Scalar(v) if index == 0 => Some(v),
            Sample::Scalar(_) => None,
            Sample::Vector(vs) => vs.get(index),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Sample::Scalar(_) => 1,
            Sample::Vector(vs) => vs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sample::Scalar(v) => write!(f, "{v}"),
            Sample::Vector(vs) => {
                let parts: Vec<_> = vs.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmi_type_tags() {
        assert_eq!(VarType::from_fmi("Real"), Some(VarType::Real));
        assert_eq!(VarType::from_fmi("Enumeration"), Some(VarType::Integer));
        assert_eq!(VarType::from_fmi("Matrix"), None);
    }

    #[test]
    fn cast_to_element_type() {
        assert_eq!(VarType::Real.cast(&Value::Integer(1)).unwrap(), Value::Real(1.0));
        assert_eq!(VarType::Integer.cast(&Value::Real(1.9)).unwrap(), Value::Integer(1));
        assert_eq!(
            VarType::Boolean.cast(&Value::from("fmi2True")).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            VarType::String.cast(&Value::Real(1.0)).unwrap(),
            Value::String("1.0".into())
        );
        assert!(VarType::Real.cast(&Value::from("abc")).is_err());
    }

    #[test]
    fn untagged_json_keeps_kinds() {
        let values: Vec<Value> = serde_json::from_str("[true, 3, 3.0, \"x\"]").unwrap();
        assert_eq!(
            values,
            vec![
                Value::Boolean(true),
                Value::Integer(3),
                Value::Real(3.0),
                Value::String("x".into())
            ]
        );
        assert_eq!(serde_json::to_string(&Value::Real(3.0)).unwrap(), "3.0");
    }

    #[test]
    fn samples_store_single_values_bare() {
        assert_eq!(
            Sample::from_values(vec![Value::Real(9.81)]),
            Sample::Scalar(Value::Real(9.81))
        );
        let v = Sample::from_values(vec![Value::Real(1.0), Value::Real(2.0)]);
        assert_eq!(v.len(), 2);
        assert_eq!(v.element(1), Some(&Value::Real(2.0)));
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(serde_json::from_str::<Sample>(&json).unwrap(), v);
    }
}
