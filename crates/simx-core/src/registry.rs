//! Case variables: user-facing aliases for native model variables.
//!
//! An alias binds a component pattern and a variable-name prefix. It resolves
//! to every matching instance of one model and to the ordered variables of that
//! model whose names carry the prefix. Specs address aliases, optionally with an
//! element range: `x`, `x[1]`, `x[0,2]`, `x[1..]`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::fmi::{Causality, Initial, Variability};
use crate::interface::SystemInterface;
use crate::value::{Value, VarType};

/// Declaration of an alias in the `variables` section of a cases document:
/// `[componentPattern, variablePattern]` or `[componentPattern, variablePattern, description]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct VariableDecl {
    pub components: String,
    pub variables: String,
    pub description: Option<String>,
}

impl TryFrom<Vec<String>> for VariableDecl {
    type Error = String;

    fn try_from(mut parts: Vec<String>) -> std::result::Result<Self, Self::Error> {
        if !(2..=3).contains(&parts.len()) {
            return Err(format!(
                "expected [components, variables] or [components, variables, description], found {} entries",
                parts.len()
            ));
        }
        let description = if parts.len() == 3 { parts.pop() } else { None };
        let variables = parts.pop().unwrap_or_default();
        let components = parts.pop().unwrap_or_default();
        Ok(Self {
            components,
            variables,
            description,
        })
    }
}

impl From<VariableDecl> for Vec<String> {
    fn from(decl: VariableDecl) -> Self {
        let mut parts = vec![decl.components, decl.variables];
        parts.extend(decl.description);
        parts
    }
}

/// A resolved alias.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseVariable {
    pub alias: String,
    pub model: String,
    pub instances: Vec<String>,
    pub names: Vec<String>,
    pub refs: Vec<u32>,
    #[serde(rename = "type")]
    pub var_type: VarType,
    pub causality: Causality,
    pub variability: Variability,
    pub initial: Option<Initial>,
    /// Start values, one per reference. Empty unless every variable declares one.
    pub start: Vec<Value>,
    pub description: Option<String>,
}

impl CaseVariable {
    /// Number of elements (references) addressed by the alias.
    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    /// Parse the text inside `[...]` into element indices.
    ///
    /// An empty text addresses the whole variable. Otherwise the text is a
    /// comma list of indices and `a..b` / `a...b` ranges; a missing range
    /// bound is 0 or the length, and the upper bound is exclusive.
    pub fn indices(&self, range: &str) -> Result<Vec<usize>> {
        let len = self.len();
        let range = range.trim();
        if range.is_empty() {
            return Ok((0..len).collect());
        }
        let invalid = |reason: String| CoreError::InvalidRange {
            alias: self.alias.clone(),
            range: range.to_string(),
            reason,
        };
        let parse = |text: &str, missing: usize| -> Result<usize> {
            let text = text.trim();
            if text.is_empty() {
                return Ok(missing);
            }
            text.parse()
                .map_err(|_| invalid(format!("'{text}' is not an index")))
        };

        let mut indices = Vec::new();
        for part in range.split(',') {
            match part.split_once("..") {
                None => {
                    let idx = parse(part, usize::MAX)?;
                    if idx >= len {
                        return Err(invalid(format!("index {idx} out of range 0..{len}")));
                    }
                    indices.push(idx);
                }
                Some((lo, hi)) => {
                    let hi = hi.strip_prefix('.').unwrap_or(hi);
                    let lo = parse(lo, 0)?;
                    let hi = parse(hi, len)?;
                    if lo > hi || hi > len {
                        return Err(invalid(format!("{lo}..{hi} not within 0..{len}")));
                    }
                    indices.extend(lo..hi);
                }
            }
        }
        if indices.is_empty() {
            return Err(invalid("no element addressed".to_string()));
        }
        Ok(indices)
    }
}

/// All case variables of a cases document, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct VariableRegistry {
    variables: IndexMap<String, CaseVariable>,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve every declaration against the system.
    pub fn build(
        decls: &IndexMap<String, VariableDecl>,
        system: &dyn SystemInterface,
    ) -> Result<Self> {
        let mut registry = Self::new();
        for (alias, decl) in decls {
            registry.register(alias, decl, system)?;
        }
        Ok(registry)
    }

    /// Resolve one declaration and add it under `alias`.
    pub fn register(
        &mut self,
        alias: &str,
        decl: &VariableDecl,
        system: &dyn SystemInterface,
    ) -> Result<&CaseVariable> {
        if self.variables.contains_key(alias) {
            return Err(CoreError::DuplicateAlias(alias.to_string()));
        }
        let (model, instances) = system.match_components(&decl.components)?;
        let Some(first) = instances.first() else {
            return Err(CoreError::NoComponentMatch(decl.components.clone()));
        };
        let matched = system.match_variables(first, &decl.variables)?;
        let model_vars = system.variables(first)?;

        let mut names = Vec::with_capacity(matched.len());
        let mut refs = Vec::with_capacity(matched.len());
        let mut starts = Vec::with_capacity(matched.len());
        let mut proto = None;
        for (name, reference) in matched {
            let info = model_vars
                .get(&name)
                .ok_or_else(|| CoreError::VariableNotFound {
                    component: first.clone(),
                    name: name.clone(),
                })?;
            let proto = *proto.get_or_insert(info);
            for (property, same) in [
                ("type", info.var_type == proto.var_type),
                ("causality", info.causality == proto.causality),
                ("variability", info.variability == proto.variability),
            ] {
                if !same {
                    return Err(CoreError::InconsistentVariable {
                        name,
                        pattern: decl.variables.clone(),
                        property,
                    });
                }
            }
            if let Some(start) = &info.start {
                starts.push(info.var_type.cast(start)?);
            }
            names.push(name);
            refs.push(reference);
        }
        let proto = proto.ok_or_else(|| CoreError::NoVariableMatch {
            component: first.clone(),
            pattern: decl.variables.clone(),
        })?;
        if !starts.is_empty() && starts.len() != refs.len() {
            debug!(alias, declared = starts.len(), refs = refs.len(), "partial start values ignored");
            starts.clear();
        }

        let variable = CaseVariable {
            alias: alias.to_string(),
            model,
            instances,
            names,
            refs,
            var_type: proto.var_type,
            causality: proto.causality,
            variability: proto.variability,
            initial: proto.initial,
            start: starts,
            description: decl.description.clone(),
        };
        debug!(
            alias,
            model = %variable.model,
            instances = variable.instances.len(),
            elements = variable.len(),
            "registered case variable"
        );
        self.variables.insert(alias.to_string(), variable);
        Ok(&self.variables[alias])
    }

    pub fn get(&self, alias: &str) -> Result<&CaseVariable> {
        self.variables
            .get(alias)
            .ok_or_else(|| CoreError::UnknownAlias(alias.to_string()))
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.variables.contains_key(alias)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CaseVariable> {
        self.variables.values()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Split `alias[range]` and resolve it to the variable and addressed indices.
    pub fn range_of(&self, key: &str) -> Result<(&CaseVariable, Vec<usize>)> {
        let (alias, range) = match key.split_once('[') {
            Some((alias, rest)) => (alias.trim(), rest.trim_end().trim_end_matches(']')),
            None => (key.trim(), ""),
        };
        let variable = self.get(alias)?;
        Ok((variable, variable.indices(range)?))
    }

    /// Start values of every alias whose variables all declare one.
    pub fn starts(&self) -> IndexMap<String, Vec<Value>> {
        self.variables
            .iter()
            .filter(|(_, v)| !v.start.is_empty())
            .map(|(alias, v)| (alias.clone(), v.start.clone()))
            .collect()
    }

    /// Find the alias of native variables `names` on `component`.
    ///
    /// Returns the alias and `None` when the names cover the whole variable,
    /// or the matched element indices when they cover only part of it.
    pub fn case_variable(
        &self,
        component: &str,
        names: &[&str],
    ) -> Option<(&str, Option<Vec<usize>>)> {
        for variable in self.variables.values() {
            if !variable.instances.iter().any(|i| i == component) {
                continue;
            }
            let hits: Vec<usize> = variable
                .names
                .iter()
                .enumerate()
                .filter(|(_, n)| names.contains(&n.as_str()))
                .map(|(i, _)| i)
                .collect();
            if hits.is_empty() {
                continue;
            }
            let whole = hits.len() == variable.len();
            return Some((variable.alias.as_str(), (!whole).then_some(hits)));
        }
        None
    }
}
