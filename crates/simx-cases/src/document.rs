//! The cases document as read from disk.
//!
//! ```json
//! {
//!   "header": {
//!     "name": "BouncingBall",
//!     "modelFile": "system.json",
//!     "timeUnit": "second",
//!     "variables": { "g": ["bb", "g", "Gravity"], "h": ["bb", "h"] }
//!   },
//!   "base": { "spec": { "stopTime": 3, "stepSize": 0.01, "h": 1.0 } },
//!   "drop": { "parent": "base", "spec": { "h": 2.0 }, "assert": { "1@F": ["h < 0.1", "comes to rest"] } }
//! }
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use simx_core::VariableDecl;

use crate::error::{CaseError, Result};

fn default_model_file() -> String {
    "system.json".to_string()
}

fn default_time_unit() -> String {
    "sec".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// System structure file, relative to the cases document.
    #[serde(default = "default_model_file")]
    pub model_file: String,
    /// Backend name. Empty selects the reference backend.
    #[serde(default)]
    pub simulator: String,
    #[serde(default = "default_time_unit")]
    pub time_unit: String,
    #[serde(default)]
    pub variables: IndexMap<String, VariableDecl>,
}

/// One named case entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseSpec {
    /// Parent case; `base` when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub description: String,
    /// `alias[range]@time` keys with optional values.
    #[serde(default)]
    pub spec: IndexMap<String, serde_json::Value>,
    /// `key@temporal` → `[expression, description]`.
    #[serde(default)]
    pub assert: IndexMap<String, serde_json::Value>,
    /// Variables to record, in spec key syntax without values.
    #[serde(default)]
    pub results: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CasesDocument {
    pub header: Header,
    /// Every other top-level entry is a case, in document order.
    #[serde(flatten)]
    pub cases: IndexMap<String, CaseSpec>,
}

impl CasesDocument {
    /// Read a cases file. `.toml` files are TOML, everything else JSON.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CaseError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(toml::from_str(&text)?),
            _ => Ok(serde_json::from_str(&text)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cases_keep_document_order() {
        let doc: CasesDocument = serde_json::from_str(
            r#"{
                "header": { "name": "t", "variables": { "x": ["c*", "x", "position"] } },
                "base": { "spec": { "stopTime": 1, "x@step": null } },
                "zeta": { "spec": {} },
                "alpha": { "parent": "zeta", "results": ["x"] }
            }"#,
        )
        .unwrap();
        assert_eq!(doc.header.model_file, "system.json");
        assert_eq!(doc.header.time_unit, "sec");
        assert_eq!(doc.header.variables["x"].description.as_deref(), Some("position"));
        let names: Vec<&str> = doc.cases.keys().map(String::as_str).collect();
        assert_eq!(names, ["base", "zeta", "alpha"]);
        assert_eq!(doc.cases["alpha"].parent.as_deref(), Some("zeta"));
        assert!(doc.cases["base"].spec["x@step"].is_null());
    }

    #[test]
    fn load_toml_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cases.toml");
        std::fs::write(
            &path,
            r#"
[header]
name = "toml cases"
timeUnit = "ms"

[header.variables]
h = ["bb", "h"]

[base]
results = ["h@step"]

[base.spec]
stopTime = 10
h = 1.5
"#,
        )
        .unwrap();
        let doc = CasesDocument::load(&path).unwrap();
        assert_eq!(doc.header.time_unit, "ms");
        assert_eq!(doc.cases["base"].spec["h"], serde_json::json!(1.5));
        assert_eq!(doc.cases["base"].results, ["h@step"]);
    }

    #[test]
    fn missing_file() {
        let err = CasesDocument::load(Path::new("/nonexistent/cases.json")).unwrap_err();
        assert!(matches!(err, CaseError::NotFound { .. }));
    }
}
