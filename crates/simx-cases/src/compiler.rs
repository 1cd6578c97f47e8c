//! Compilation of case spec fragments into time-indexed actions.

use tracing::debug;

use simx_assert::{AssertionEngine, Temporal};
use simx_core::{ActionKind, CaseVariable, SystemInterface, TimeScale, Value, VariableRegistry};

use crate::action::{Action, ActionTime, GetAction, SetAction};
use crate::case::Case;
use crate::document::CaseSpec;
use crate::error::{CaseError, Result};
use crate::keyspec::{is_result_marker, parse_action_key, split_at_sign, When};

/// Spec keys that set case timing instead of producing actions.
pub const SPECIAL_KEYS: &[&str] = &["startTime", "stopTime", "stepSize"];

/// Compiles spec fragments against the registry and the system's legality rules.
pub struct CaseCompiler<'a> {
    registry: &'a VariableRegistry,
    system: &'a dyn SystemInterface,
    engine: &'a mut AssertionEngine,
    scale: TimeScale,
}

impl<'a> CaseCompiler<'a> {
    pub fn new(
        registry: &'a VariableRegistry,
        system: &'a dyn SystemInterface,
        engine: &'a mut AssertionEngine,
        scale: TimeScale,
    ) -> Self {
        Self {
            registry,
            system,
            engine,
            scale,
        }
    }

    /// Apply `spec`, then `results`, then `assert` of a case entry to `case`.
    pub fn compile(&mut self, case: &mut Case, spec: &CaseSpec) -> Result<()> {
        for (key, value) in &spec.spec {
            self.spec_item(case, key, Some(value))?;
        }
        for key in &spec.results {
            self.spec_item(case, key, None)?;
        }
        for (key, value) in &spec.assert {
            self.assertion(case, key, value)?;
        }
        debug!(
            case = %case.name,
            set_times = case.set_actions.len(),
            get_times = case.get_actions.len(),
            assertions = case.asserts.len(),
            "case compiled"
        );
        Ok(())
    }

    /// Compile one `alias[range]@time` entry. `value` is `None` for pure recordings.
    pub fn spec_item(&mut self, case: &mut Case, key: &str, value: Option<&serde_json::Value>) -> Result<()> {
        let key = key.trim();
        if SPECIAL_KEYS.contains(&key) {
            return set_special(case, key, value);
        }

        let value = value.filter(|v| !is_result_marker(v));
        let parsed = parse_action_key(key, value.is_some()).map_err(|detail| CaseError::UnknownAction {
            case: case.name.clone(),
            key: key.to_string(),
            detail,
        })?;
        let (variable, indices) = self.registry.range_of(parsed.variable)?;
        let values = match value {
            Some(v) => cast_values(case, key, variable, &indices, v)?,
            None => Vec::new(),
        };

        let special = case.special;
        let check_time = match parsed.when {
            When::Start => 0.0,
            When::Stop => special.stop_time,
            When::At(t) => t,
            When::EveryStep | When::Every(_) => special.start_time,
        };
        let names: Vec<String> = indices.iter().map(|i| variable.names[*i].clone()).collect();
        let representative = variable.instances.first().map(String::as_str).unwrap_or_default();
        self.system
            .allowed_action(parsed.kind, representative, &names, check_time)
            .map_err(|source| CaseError::Legality {
                case: case.name.clone(),
                key: key.to_string(),
                source,
            })?;

        let times = match parsed.when {
            When::Start => vec![ActionTime::At(0)],
            When::Stop => vec![ActionTime::At(self.scale.to_ticks(special.stop_time))],
            When::At(t) => vec![ActionTime::At(self.scale.to_ticks(t))],
            When::EveryStep => vec![ActionTime::Continuous],
            When::Every(dt) => {
                let step = self.scale.to_ticks(dt);
                if step <= 0 {
                    return Err(CaseError::Init(format!(
                        "case '{}', key '{key}': step interval {dt} is below the clock resolution",
                        case.name
                    )));
                }
                let start = self.scale.to_ticks(special.start_time);
                let stop = self.scale.to_ticks(special.stop_time);
                (start..=stop).step_by(step as usize).map(ActionTime::At).collect()
            }
        };

        let refs: Vec<u32> = indices.iter().map(|i| variable.refs[*i]).collect();
        for component in &variable.instances {
            for time in &times {
                let action = match parsed.kind {
                    ActionKind::Set => Action::Set(SetAction {
                        alias: variable.alias.clone(),
                        component: component.clone(),
                        refs: refs.clone(),
                        values: values.clone(),
                    }),
                    ActionKind::Get | ActionKind::Step => Action::Get(GetAction {
                        alias: variable.alias.clone(),
                        component: component.clone(),
                        refs: variable.refs.clone(),
                    }),
                };
                case.add_action(*time, action, &variable.refs)?;
            }
        }
        debug!(
            case = %case.name,
            key,
            kind = %parsed.kind,
            times = times.len(),
            instances = variable.instances.len(),
            "spec item compiled"
        );
        Ok(())
    }

    /// Compile an `assert` entry: `key@temporal` → `[expression, description]`.
    pub fn assertion(&mut self, case: &mut Case, key: &str, value: &serde_json::Value) -> Result<()> {
        let (name, at) = split_at_sign(key).map_err(|detail| CaseError::UnknownAction {
            case: case.name.clone(),
            key: key.to_string(),
            detail,
        })?;
        let temporal: Temporal = at.unwrap_or_default().parse()?;
        let parts = value
            .as_array()
            .and_then(|items| items.iter().map(serde_json::Value::as_str).collect::<Option<Vec<_>>>());
        let (expression, description) = match parts.as_deref() {
            Some([expression]) => (*expression, None),
            Some([expression, description]) => (*expression, Some(*description)),
            _ => {
                return Err(CaseError::Init(format!(
                    "case '{}': assertion '{key}' must be [expression, description]",
                    case.name
                )))
            }
        };
        if let Ok(existing) = self.engine.get(name) {
            if existing.expression != expression || existing.temporal != temporal {
                return Err(CaseError::Init(format!(
                    "case '{}': assertion '{name}' is already defined as '{}'@{}",
                    case.name, existing.expression, existing.temporal
                )));
            }
        }
        self.engine.expr(name, expression)?;
        self.engine.set_temporal(name, temporal)?;
        if let Some(description) = description {
            self.engine.set_description(name, description)?;
        }
        case.add_assertion(name);
        Ok(())
    }
}

fn set_special(case: &mut Case, key: &str, value: Option<&serde_json::Value>) -> Result<()> {
    let v = value
        .and_then(serde_json::Value::as_f64)
        .ok_or_else(|| CaseError::Init(format!("case '{}': {key} must be a number", case.name)))?;
    match key {
        "startTime" => case.special.start_time = v,
        "stopTime" => case.special.stop_time = v,
        _ if v > 0.0 => case.special.step_size = v,
        _ => {
            return Err(CaseError::Init(format!(
                "case '{}': stepSize must be positive, found {v}",
                case.name
            )))
        }
    }
    Ok(())
}

/// Turn a JSON value or list into one typed value per addressed element.
fn cast_values(
    case: &Case,
    key: &str,
    variable: &CaseVariable,
    indices: &[usize],
    value: &serde_json::Value,
) -> Result<Vec<Value>> {
    let items: Vec<&serde_json::Value> = match value {
        serde_json::Value::Array(items) => items.iter().collect(),
        single => vec![single],
    };
    if items.len() != indices.len() {
        return Err(CaseError::Init(format!(
            "case '{}', key '{key}': {} value(s) for {} element(s)",
            case.name,
            items.len(),
            indices.len()
        )));
    }
    items
        .into_iter()
        .map(|item| {
            let v = Value::from_json(item).ok_or_else(|| {
                CaseError::Init(format!("case '{}', key '{key}': {item} is not a value", case.name))
            })?;
            Ok(variable.var_type.cast(&v)?)
        })
        .collect()
}
