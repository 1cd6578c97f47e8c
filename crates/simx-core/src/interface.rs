//! The contract between the case machinery and a co-simulation backend.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::fmi::{self, Causality, Initial, Variability};
use crate::value::{Value, VarType};

/// Model description data of one variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableInfo {
    pub reference: u32,
    #[serde(rename = "type")]
    pub var_type: VarType,
    pub causality: Causality,
    pub variability: Variability,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<Initial>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<Value>,
}

/// Variables of a model, keyed by name in model description order.
pub type VariableMap = IndexMap<String, VariableInfo>;

/// Kind of action requested on a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Get,
    Set,
    /// Periodic or continuous get.
    Step,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Get => write!(f, "get"),
            ActionKind::Set => write!(f, "set"),
            ActionKind::Step => write!(f, "step"),
        }
    }
}

/// A co-simulation backend.
///
/// Component instances are addressed by name. Times passed to
/// [`run_until`](SystemInterface::run_until) are engine ticks; times passed to
/// [`allowed_action`](SystemInterface::allowed_action) are user time units.
pub trait SystemInterface {
    /// Resolve a component pattern (`*` wildcards) to `(model, instances)`.
    ///
    /// All returned instances share the model of the first match.
    fn match_components(&self, pattern: &str) -> Result<(String, Vec<String>)>;

    /// The variables of the model behind a component instance.
    fn variables(&self, component: &str) -> Result<&VariableMap>;

    /// Variables of `component` whose name starts with `prefix`, as `(name, reference)`.
    ///
    /// A name is accepted when the rest after the prefix is empty or starts
    /// with `[` or `.`, so `x` matches `x[0]` and `x.y` but not `x2`.
    fn match_variables(&self, component: &str, prefix: &str) -> Result<Vec<(String, u32)>> {
        let mut accepted: Option<&VariableInfo> = None;
        let mut matched = Vec::new();
        for (name, info) in self.variables(component)? {
            let Some(rest) = name.strip_prefix(prefix) else {
                continue;
            };
            if !(rest.is_empty() || rest.starts_with('[') || rest.starts_with('.')) {
                continue;
            }
            match accepted {
                None => accepted = Some(info),
                Some(first) => check_consistent(name, prefix, first, info)?,
            }
            matched.push((name.clone(), info.reference));
        }
        if matched.is_empty() {
            return Err(CoreError::NoVariableMatch {
                component: component.to_string(),
                pattern: prefix.to_string(),
            });
        }
        Ok(matched)
    }

    /// Check an action on the named variables of `component` at `time`.
    ///
    /// All variables must share type, causality and variability. Gets are
    /// always allowed; sets follow [`fmi::check_set`].
    fn allowed_action(
        &self,
        kind: ActionKind,
        component: &str,
        names: &[String],
        time: f64,
    ) -> Result<()> {
        let variables = self.variables(component)?;
        let mut first: Option<&VariableInfo> = None;
        for name in names {
            let info = variables
                .get(name)
                .ok_or_else(|| CoreError::VariableNotFound {
                    component: component.to_string(),
                    name: name.clone(),
                })?;
            match first {
                Some(proto) => {
                    if let Err(CoreError::InconsistentVariable { property, .. }) =
                        check_consistent(name, name, proto, info)
                    {
                        return Err(CoreError::Illegal(format!(
                            "variable {name} of {component} differs in {property} from {}",
                            names[0]
                        )));
                    }
                }
                None => {
                    first = Some(info);
                    if kind == ActionKind::Set {
                        fmi::check_set(name, info.causality, info.variability, info.initial, time)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Instantiate and initialize the simulation.
    fn init_simulator(&mut self) -> bool;

    /// Advance the simulation to `ticks`. `false` when the backend refuses.
    fn run_until(&mut self, ticks: i64) -> bool;

    /// Write values before the simulation leaves initialization.
    fn set_initial(
        &mut self,
        component: &str,
        var_type: VarType,
        refs: &[u32],
        values: &[Value],
    ) -> bool;

    /// Write values at a communication point.
    fn set_variable_value(
        &mut self,
        component: &str,
        var_type: VarType,
        refs: &[u32],
        values: &[Value],
    ) -> bool;

    /// Read the current values of `refs`.
    fn get_variable_value(
        &mut self,
        component: &str,
        var_type: VarType,
        refs: &[u32],
    ) -> Result<Vec<Value>>;

    /// Base step size declared by the system structure, if any.
    fn default_step_size(&self) -> Option<f64> {
        None
    }

    /// Start time declared by the system structure, if any.
    fn start_time(&self) -> Option<f64> {
        None
    }
}

fn check_consistent(
    name: &str,
    pattern: &str,
    proto: &VariableInfo,
    info: &VariableInfo,
) -> Result<()> {
    let property = if info.var_type != proto.var_type {
        "type"
    } else if info.causality != proto.causality {
        "causality"
    } else if info.variability != proto.variability {
        "variability"
    } else {
        return Ok(());
    };
    Err(CoreError::InconsistentVariable {
        name: name.to_string(),
        pattern: pattern.to_string(),
        property,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OneModel {
        variables: VariableMap,
    }

    fn info(reference: u32, var_type: VarType, causality: Causality) -> VariableInfo {
        VariableInfo {
            reference,
            var_type,
            causality,
            variability: Variability::Continuous,
            initial: None,
            start: None,
        }
    }

    impl OneModel {
        fn new() -> Self {
            let mut variables = VariableMap::new();
            variables.insert("x[0]".into(), info(0, VarType::Real, Causality::Output));
            variables.insert("x[1]".into(), info(1, VarType::Real, Causality::Output));
            variables.insert("x2".into(), info(2, VarType::Real, Causality::Output));
            variables.insert("u".into(), info(3, VarType::Real, Causality::Input));
            variables.insert("mixed.a".into(), info(4, VarType::Real, Causality::Input));
            variables.insert("mixed.b".into(), info(5, VarType::Integer, Causality::Input));
            Self { variables }
        }
    }

    impl SystemInterface for OneModel {
        fn match_components(&self, _pattern: &str) -> Result<(String, Vec<String>)> {
            Ok(("M".into(), vec!["m".into()]))
        }
        fn variables(&self, _component: &str) -> Result<&VariableMap> {
            Ok(&self.variables)
        }
        fn init_simulator(&mut self) -> bool {
            true
        }
        fn run_until(&mut self, _ticks: i64) -> bool {
            true
        }
        fn set_initial(&mut self, _: &str, _: VarType, _: &[u32], _: &[Value]) -> bool {
            true
        }
        fn set_variable_value(&mut self, _: &str, _: VarType, _: &[u32], _: &[Value]) -> bool {
            true
        }
        fn get_variable_value(&mut self, _: &str, _: VarType, refs: &[u32]) -> Result<Vec<Value>> {
            Ok(refs.iter().map(|_| Value::Real(0.0)).collect())
        }
    }

    #[test]
    fn prefix_match_respects_separators() {
        let sys = OneModel::new();
        let matched = sys.match_variables("m", "x").unwrap();
        assert_eq!(matched, vec![("x[0]".to_string(), 0), ("x[1]".to_string(), 1)]);
        assert_eq!(sys.match_variables("m", "x2").unwrap().len(), 1);
        assert!(matches!(
            sys.match_variables("m", "y"),
            Err(CoreError::NoVariableMatch { .. })
        ));
    }

    #[test]
    fn prefix_match_rejects_mixed_types() {
        let sys = OneModel::new();
        let err = sys.match_variables("m", "mixed").unwrap_err();
        assert!(matches!(err, CoreError::InconsistentVariable { property: "type", .. }));
    }

    #[test]
    fn legality_by_time() {
        let sys = OneModel::new();
        let u = vec!["u".to_string()];
        let x = vec!["x[0]".to_string(), "x[1]".to_string()];
        assert!(sys.allowed_action(ActionKind::Set, "m", &u, 1.0).is_ok());
        assert!(sys.allowed_action(ActionKind::Get, "m", &x, 1.0).is_ok());
        assert!(matches!(
            sys.allowed_action(ActionKind::Set, "m", &x, 1.0),
            Err(CoreError::Illegal(_))
        ));
    }
}
