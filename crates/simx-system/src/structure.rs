//! The system structure document: models, component instances and connections.
//!
//! ```json
//! {
//!   "baseStepSize": 0.01,
//!   "models": {
//!     "Ball": { "variables": {
//!       "h": { "reference": 1, "type": "real", "causality": "output",
//!              "variability": "continuous", "start": 1.0 }
//!     } }
//!   },
//!   "components": { "bb": { "model": "Ball" } },
//!   "connections": [["bb.h", "meter.u"]]
//! }
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use simx_core::VariableMap;

use crate::error::{Result, SystemError};

/// A co-simulation system built from component models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStructure {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_step_size: Option<f64>,
    /// Time beyond which the simulation refuses to advance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_time: Option<f64>,
    pub models: IndexMap<String, Model>,
    pub components: IndexMap<String, Component>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    #[serde(default)]
    pub variables: VariableMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub model: String,
}

/// One end of a connection: `component.variable`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub component: String,
    pub variable: String,
}

impl Endpoint {
    fn parse(text: &str) -> std::result::Result<Self, String> {
        match text.split_once('.') {
            Some((component, variable)) if !component.is_empty() && !variable.is_empty() => {
                Ok(Self {
                    component: component.to_string(),
                    variable: variable.to_string(),
                })
            }
            _ => Err(format!("connection endpoint '{text}' is not component.variable")),
        }
    }
}

/// A value link from an output of one component to a variable of another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "[String; 2]", into = "[String; 2]")]
pub struct Connection {
    pub from: Endpoint,
    pub to: Endpoint,
}

impl TryFrom<[String; 2]> for Connection {
    type Error = String;

    fn try_from([from, to]: [String; 2]) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            from: Endpoint::parse(&from)?,
            to: Endpoint::parse(&to)?,
        })
    }
}

impl From<Connection> for [String; 2] {
    fn from(c: Connection) -> Self {
        [
            format!("{}.{}", c.from.component, c.from.variable),
            format!("{}.{}", c.to.component, c.to.variable),
        ]
    }
}

impl SystemStructure {
    /// Read a structure file. `.toml` files are TOML, everything else JSON.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SystemError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path)?;
        let structure: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&text)?,
            _ => serde_json::from_str(&text)?,
        };
        structure.validate()?;
        Ok(structure)
    }

    /// Check that components name known models and connections known variables.
    pub fn validate(&self) -> Result<()> {
        for (name, component) in &self.components {
            if !self.models.contains_key(&component.model) {
                return Err(SystemError::Validation {
                    detail: format!("component '{name}' uses unknown model '{}'", component.model),
                });
            }
        }
        for connection in &self.connections {
            for end in [&connection.from, &connection.to] {
                let known = self
                    .model_variables(&end.component)
                    .is_some_and(|vars| vars.contains_key(&end.variable));
                if !known {
                    return Err(SystemError::Validation {
                        detail: format!(
                            "connection endpoint {}.{} does not exist",
                            end.component, end.variable
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Model name and variables of a component instance.
    pub fn model_of(&self, component: &str) -> Option<(&str, &VariableMap)> {
        let model = &self.components.get(component)?.model;
        let vars = &self.models.get(model)?.variables;
        Some((model.as_str(), vars))
    }

    fn model_variables(&self, component: &str) -> Option<&VariableMap> {
        self.model_of(component).map(|(_, vars)| vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STRUCTURE: &str = r#"{
        "baseStepSize": 0.1,
        "models": {
            "Source": { "variables": {
                "y": { "reference": 0, "type": "real", "causality": "output", "variability": "continuous" }
            } },
            "Sink": { "variables": {
                "u": { "reference": 0, "type": "real", "causality": "input", "variability": "continuous" }
            } }
        },
        "components": { "src": { "model": "Source" }, "dst": { "model": "Sink" } },
        "connections": [["src.y", "dst.u"]]
    }"#;

    #[test]
    fn parse_and_validate() {
        let s: SystemStructure = serde_json::from_str(STRUCTURE).unwrap();
        s.validate().unwrap();
        assert_eq!(s.base_step_size, Some(0.1));
        assert_eq!(s.connections[0].from.component, "src");
        assert_eq!(s.connections[0].to.variable, "u");
        assert_eq!(s.model_of("dst").map(|(m, _)| m), Some("Sink"));
    }

    #[test]
    fn dangling_connection_is_rejected() {
        let mut s: SystemStructure = serde_json::from_str(STRUCTURE).unwrap();
        s.connections[0].to.variable = "v".into();
        assert!(matches!(s.validate(), Err(SystemError::Validation { .. })));
    }

    #[test]
    fn load_toml_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("system.toml");
        std::fs::write(
            &path,
            r#"
startTime = 0.0

[models.Gain.variables.k]
reference = 3
type = "real"
causality = "parameter"
variability = "fixed"
start = 2.0

[components.gain]
model = "Gain"
"#,
        )
        .unwrap();
        let s = SystemStructure::load(&path).unwrap();
        assert_eq!(s.start_time, Some(0.0));
        assert_eq!(s.models["Gain"].variables["k"].reference, 3);
        assert!(matches!(
            SystemStructure::load(&dir.path().join("missing.json")),
            Err(SystemError::NotFound { .. })
        ));
    }
}
