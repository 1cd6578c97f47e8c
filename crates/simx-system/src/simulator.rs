//! Sample-and-hold simulation of a [`SystemStructure`].
//!
//! Every variable holds its last written value (initially its start value).
//! Advancing the clock copies connected values from source to destination;
//! `independent` variables report the current time in seconds.

use std::collections::HashMap;
use std::path::Path;

use regex::Regex;
use tracing::{debug, warn};

use simx_core::{
    Causality, CoreError, SystemInterface, Value, VarType, VariableInfo, VariableMap,
};

use crate::error::Result;
use crate::structure::SystemStructure;

const TICKS_PER_SECOND: f64 = 1e9;

/// Reference [`SystemInterface`] backend.
#[derive(Debug, Clone)]
pub struct StructureSystem {
    structure: SystemStructure,
    values: HashMap<(String, u32), Value>,
    ticks: i64,
    initialized: bool,
}

impl StructureSystem {
    pub fn new(structure: SystemStructure) -> Result<Self> {
        structure.validate()?;
        Ok(Self {
            structure,
            values: HashMap::new(),
            ticks: 0,
            initialized: false,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::new(SystemStructure::load(path)?)
    }

    pub fn structure(&self) -> &SystemStructure {
        &self.structure
    }

    /// Current engine time in ticks.
    pub fn ticks(&self) -> i64 {
        self.ticks
    }

    fn variable_by_ref(&self, component: &str, reference: u32) -> Option<&VariableInfo> {
        let (_, vars) = self.structure.model_of(component)?;
        vars.values().find(|v| v.reference == reference)
    }

    fn write(&mut self, component: &str, var_type: VarType, refs: &[u32], values: &[Value]) -> bool {
        if refs.len() != values.len() {
            warn!(component, refs = refs.len(), values = values.len(), "set with mismatched lengths");
            return false;
        }
        for (r, v) in refs.iter().zip(values) {
            if self.variable_by_ref(component, *r).is_none() {
                warn!(component, reference = r, "set of unknown variable");
                return false;
            }
            match var_type.cast(v) {
                Ok(v) => {
                    self.values.insert((component.to_string(), *r), v);
                }
                Err(e) => {
                    warn!(component, reference = r, error = %e, "set with unconvertible value");
                    return false;
                }
            }
        }
        true
    }

    fn read(&self, component: &str, info: &VariableInfo) -> Value {
        if info.causality == Causality::Independent {
            return Value::Real(self.ticks as f64 / TICKS_PER_SECOND);
        }
        if let Some(v) = self.values.get(&(component.to_string(), info.reference)) {
            return v.clone();
        }
        info.start
            .as_ref()
            .and_then(|s| info.var_type.cast(s).ok())
            .unwrap_or_else(|| info.var_type.zero())
    }

    fn propagate(&mut self) {
        let mut updates = Vec::new();
        for c in &self.structure.connections {
            let source = self
                .structure
                .model_of(&c.from.component)
                .and_then(|(_, vars)| vars.get(&c.from.variable));
            let target = self
                .structure
                .model_of(&c.to.component)
                .and_then(|(_, vars)| vars.get(&c.to.variable));
            if let (Some(source), Some(target)) = (source, target) {
                let value = self.read(&c.from.component, source);
                if let Ok(value) = target.var_type.cast(&value) {
                    updates.push(((c.to.component.clone(), target.reference), value));
                }
            }
        }
        self.values.extend(updates);
    }
}

/// Anchored regex for a component pattern where `*` matches any text.
fn wildcard(pattern: &str) -> std::result::Result<Regex, regex::Error> {
    let body: Vec<String> = pattern.split('*').map(regex::escape).collect();
    Regex::new(&format!("^{}$", body.join(".*")))
}

impl SystemInterface for StructureSystem {
    fn match_components(&self, pattern: &str) -> simx_core::Result<(String, Vec<String>)> {
        let re = wildcard(pattern).map_err(|_| CoreError::NoComponentMatch(pattern.to_string()))?;
        let mut model: Option<&str> = None;
        let mut instances = Vec::new();
        for (name, component) in &self.structure.components {
            if !re.is_match(name) {
                continue;
            }
            let m = *model.get_or_insert(component.model.as_str());
            if m == component.model {
                instances.push(name.clone());
            }
        }
        match model {
            Some(m) => Ok((m.to_string(), instances)),
            None => Err(CoreError::NoComponentMatch(pattern.to_string())),
        }
    }

    fn variables(&self, component: &str) -> simx_core::Result<&VariableMap> {
        self.structure
            .model_of(component)
            .map(|(_, vars)| vars)
            .ok_or_else(|| CoreError::ComponentNotFound(component.to_string()))
    }

    fn init_simulator(&mut self) -> bool {
        self.values.clear();
        self.ticks = self
            .structure
            .start_time
            .map_or(0, |t| (t * TICKS_PER_SECOND).round() as i64);
        self.initialized = true;
        self.propagate();
        debug!(components = self.structure.components.len(), "simulator initialized");
        true
    }

    fn run_until(&mut self, ticks: i64) -> bool {
        if !self.initialized {
            warn!("run_until before init_simulator");
            return false;
        }
        if ticks < self.ticks {
            warn!(from = self.ticks, to = ticks, "cannot run backwards");
            return false;
        }
        if let Some(stop) = self.structure.stop_time {
            if ticks > (stop * TICKS_PER_SECOND).round() as i64 {
                warn!(to = ticks, stop, "simulation refuses to advance past its stop time");
                return false;
            }
        }
        self.ticks = ticks;
        self.propagate();
        true
    }

    fn set_initial(&mut self, component: &str, var_type: VarType, refs: &[u32], values: &[Value]) -> bool {
        let ok = self.write(component, var_type, refs, values);
        if ok {
            self.propagate();
        }
        ok
    }

    fn set_variable_value(
        &mut self,
        component: &str,
        var_type: VarType,
        refs: &[u32],
        values: &[Value],
    ) -> bool {
        self.write(component, var_type, refs, values)
    }

    fn get_variable_value(
        &mut self,
        component: &str,
        var_type: VarType,
        refs: &[u32],
    ) -> simx_core::Result<Vec<Value>> {
        refs.iter()
            .map(|r| {
                let info = self.variable_by_ref(component, *r).ok_or_else(|| {
                    CoreError::VariableNotFound {
                        component: component.to_string(),
                        name: format!("#{r}"),
                    }
                })?;
                var_type.cast(&self.read(component, info))
            })
            .collect()
    }

    fn default_step_size(&self) -> Option<f64> {
        self.structure.base_step_size
    }

    fn start_time(&self) -> Option<f64> {
        self.structure.start_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn system() -> StructureSystem {
        let structure: SystemStructure = serde_json::from_str(
            r#"{
            "baseStepSize": 0.5,
            "stopTime": 3.0,
            "models": {
                "Ball": { "variables": {
                    "h": { "reference": 1, "type": "real", "causality": "output", "variability": "continuous", "start": 1.0 },
                    "time": { "reference": 0, "type": "real", "causality": "independent", "variability": "continuous" }
                } },
                "Meter": { "variables": {
                    "u": { "reference": 0, "type": "real", "causality": "input", "variability": "continuous" }
                } }
            },
            "components": {
                "ball1": { "model": "Ball" },
                "meter": { "model": "Meter" },
                "ball2": { "model": "Ball" }
            },
            "connections": [["ball1.h", "meter.u"]]
        }"#,
        )
        .unwrap();
        StructureSystem::new(structure).unwrap()
    }

    #[test]
    fn wildcard_is_anchored() {
        let sys = system();
        let (model, instances) = sys.match_components("ball*").unwrap();
        assert_eq!(model, "Ball");
        assert_eq!(instances, vec!["ball1", "ball2"]);
        assert_eq!(sys.match_components("*").unwrap().1, vec!["ball1", "ball2"]);
        assert!(sys.match_components("all").is_err());
        assert!(sys.match_components("b.ll1").is_err());
    }

    #[test]
    fn values_hold_and_propagate() {
        let mut sys = system();
        assert!(sys.init_simulator());
        assert_eq!(sys.get_variable_value("meter", VarType::Real, &[0]).unwrap(), vec![Value::Real(1.0)]);

        assert!(sys.set_variable_value("ball1", VarType::Real, &[1], &[Value::Integer(5)]));
        assert_eq!(sys.get_variable_value("meter", VarType::Real, &[0]).unwrap(), vec![Value::Real(1.0)]);
        assert!(sys.run_until(500_000_000));
        assert_eq!(sys.get_variable_value("meter", VarType::Real, &[0]).unwrap(), vec![Value::Real(5.0)]);
        assert_eq!(
            sys.get_variable_value("ball2", VarType::Real, &[0, 1]).unwrap(),
            vec![Value::Real(0.5), Value::Real(1.0)]
        );
    }

    #[test]
    fn refuses_to_run_past_stop_or_backwards() {
        let mut sys = system();
        assert!(!sys.run_until(1));
        sys.init_simulator();
        assert!(sys.run_until(3_000_000_000));
        assert!(!sys.run_until(2_000_000_000));
        assert!(!sys.run_until(3_500_000_000));
        assert!(!sys.set_variable_value("meter", VarType::Real, &[9], &[Value::Real(0.0)]));
    }
}
