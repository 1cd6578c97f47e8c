//! Cases and the case tree.
//!
//! Cases live in an arena indexed by [`CaseId`]. The root is always `base`.
//! A child starts from a copy of its parent's timing and action tables and
//! then applies its own spec on top, so changes never leak upward.

use std::fmt::Write;

use simx_core::Result as CoreResult;

use crate::action::{Action, ActionTable, ActionTime, GetAction, SetAction};
use crate::error::{CaseError, Result};

/// Names that cannot be used for cases.
pub const RESERVED_NAMES: &[&str] = &["results", "header"];

pub const BASE: &str = "base";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CaseId(usize);

impl CaseId {
    pub const ROOT: CaseId = CaseId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// Simulation timing of a case, in user time units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Special {
    pub start_time: f64,
    pub stop_time: f64,
    pub step_size: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub name: String,
    pub description: String,
    parent: Option<CaseId>,
    children: Vec<CaseId>,
    pub special: Special,
    pub set_actions: ActionTable<SetAction>,
    pub get_actions: ActionTable<GetAction>,
    /// Keys of the assertions checked for this case.
    pub asserts: Vec<String>,
}

impl Case {
    /// The root case with no actions.
    pub fn base(description: impl Into<String>, special: Special) -> Self {
        Self {
            name: BASE.to_string(),
            description: description.into(),
            parent: None,
            children: Vec::new(),
            special,
            set_actions: ActionTable::new(),
            get_actions: ActionTable::new(),
            asserts: Vec::new(),
        }
    }

    /// A new case inheriting copies of `parent`'s timing and actions.
    ///
    /// Assertions are not inherited.
    pub fn child_of(parent: &Case, parent_id: CaseId, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parent: Some(parent_id),
            children: Vec::new(),
            special: parent.special,
            set_actions: parent.set_actions.clone(),
            get_actions: parent.get_actions.clone(),
            asserts: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<CaseId> {
        self.parent
    }

    pub fn children(&self) -> &[CaseId] {
        &self.children
    }

    /// Register an action. `all_refs` is the reference tuple of the case
    /// variable, used to order merged set actions.
    pub fn add_action(&mut self, time: ActionTime, action: Action, all_refs: &[u32]) -> CoreResult<()> {
        match action {
            Action::Set(set) => self.set_actions.add(time, set, all_refs),
            Action::Get(get) => {
                self.get_actions.add(time, get);
                Ok(())
            }
        }
    }

    pub fn add_assertion(&mut self, key: &str) {
        if !self.asserts.iter().any(|k| k == key) {
            self.asserts.push(key.to_string());
        }
    }
}

/// All cases of a cases document.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseTree {
    cases: Vec<Case>,
}

impl CaseTree {
    pub fn new(base: Case) -> Self {
        Self { cases: vec![base] }
    }

    pub fn root(&self) -> &Case {
        &self.cases[0]
    }

    pub fn get(&self, id: CaseId) -> &Case {
        &self.cases[id.0]
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Add `case` below its parent and return its id.
    pub fn insert(&mut self, case: Case) -> Result<CaseId> {
        if RESERVED_NAMES.contains(&case.name.as_str()) {
            return Err(CaseError::Init(format!(
                "'{}' is reserved and cannot be a case name",
                case.name
            )));
        }
        if self.cases.iter().any(|c| c.name == case.name) {
            return Err(CaseError::Init(format!("duplicate case name '{}'", case.name)));
        }
        let parent = case
            .parent
            .ok_or_else(|| CaseError::Init(format!("case '{}' has no parent", case.name)))?;
        let id = CaseId(self.cases.len());
        self.cases
            .get_mut(parent.0)
            .ok_or_else(|| CaseError::Init(format!("parent of case '{}' does not exist", case.name)))?
            .children
            .push(id);
        self.cases.push(case);
        Ok(id)
    }

    /// Depth-first search for `name` in the whole tree.
    pub fn by_name(&self, name: &str) -> Result<CaseId> {
        if RESERVED_NAMES.contains(&name) {
            return Err(CaseError::Init(format!("'{name}' is reserved and cannot be a case name")));
        }
        self.find_in(CaseId::ROOT, name)
            .ok_or_else(|| CaseError::CaseNotFound(name.to_string()))
    }

    /// Depth-first search for `name` in the sub-tree of `from`, `from` included.
    pub fn find_in(&self, from: CaseId, name: &str) -> Option<CaseId> {
        if self.get(from).name == name {
            return Some(from);
        }
        self.get(from)
            .children
            .iter()
            .find_map(|child| self.find_in(*child, name))
    }

    /// The cases from the root down to `id`, root first.
    pub fn path(&self, id: CaseId) -> Vec<CaseId> {
        let mut path = vec![id];
        let mut current = id;
        while let Some(parent) = self.get(current).parent {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }

    /// `id` and all its descendants, depth first.
    pub fn list(&self, id: CaseId) -> Vec<CaseId> {
        let mut out = vec![id];
        for child in &self.get(id).children {
            out.extend(self.list(*child));
        }
        out
    }

    /// Names of [`list`](Self::list).
    pub fn list_names(&self, id: CaseId) -> Vec<&str> {
        self.list(id).into_iter().map(|c| self.get(c).name.as_str()).collect()
    }

    /// The sub-tree of `id` as indented names, two spaces per level.
    pub fn info(&self, id: CaseId) -> String {
        let mut out = String::new();
        self.info_into(id, 0, &mut out);
        out
    }

    fn info_into(&self, id: CaseId, level: usize, out: &mut String) {
        let case = self.get(id);
        let _ = writeln!(out, "{}{}", "  ".repeat(level), case.name);
        for child in &case.children {
            self.info_into(*child, level + 1, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simx_core::Value;

    fn special() -> Special {
        Special {
            start_time: 0.0,
            stop_time: 2.0,
            step_size: 0.5,
        }
    }

    fn tree() -> CaseTree {
        // base ── a ── c
        //     └── b
        let mut tree = CaseTree::new(Case::base("root", special()));
        let a = Case::child_of(tree.root(), CaseId::ROOT, "a", "");
        let a = tree.insert(a).unwrap();
        let b = Case::child_of(tree.root(), CaseId::ROOT, "b", "");
        tree.insert(b).unwrap();
        let c = Case::child_of(tree.get(a), a, "c", "");
        tree.insert(c).unwrap();
        tree
    }

    #[test]
    fn search_and_paths() {
        let tree = tree();
        let c = tree.by_name("c").unwrap();
        let a = tree.by_name("a").unwrap();
        let names: Vec<&str> = tree.path(c).into_iter().map(|i| tree.get(i).name.as_str()).collect();
        assert_eq!(names, ["base", "a", "c"]);
        assert_eq!(tree.find_in(a, "c"), Some(c));
        assert_eq!(tree.find_in(a, "b"), None);
        assert_eq!(tree.list_names(CaseId::ROOT), ["base", "a", "c", "b"]);
        assert_eq!(tree.info(CaseId::ROOT), "base\n  a\n    c\n  b\n");
        assert!(matches!(tree.by_name("zz"), Err(CaseError::CaseNotFound(_))));
        assert!(matches!(tree.by_name("header"), Err(CaseError::Init(_))));
    }

    #[test]
    fn reserved_and_duplicate_names_are_rejected() {
        let mut tree = tree();
        let results = Case::child_of(tree.root(), CaseId::ROOT, "results", "");
        assert!(matches!(tree.insert(results), Err(CaseError::Init(_))));
        let dup = Case::child_of(tree.root(), CaseId::ROOT, "a", "");
        assert!(matches!(tree.insert(dup), Err(CaseError::Init(_))));
    }

    #[test]
    fn child_owns_a_copy_of_parent_tables() {
        let mut parent = Case::base("", special());
        let set = SetAction {
            alias: "x".into(),
            component: "c".into(),
            refs: vec![0],
            values: vec![Value::Real(1.0)],
        };
        parent
            .add_action(ActionTime::At(0), Action::Set(set.clone()), &[0])
            .unwrap();
        let mut child = Case::child_of(&parent, CaseId::ROOT, "child", "");
        child.special.stop_time = 5.0;
        child
            .add_action(
                ActionTime::At(0),
                Action::Set(SetAction {
                    values: vec![Value::Real(2.0)],
                    ..set
                }),
                &[0],
            )
            .unwrap();
        assert_eq!(parent.special.stop_time, 2.0);
        assert_eq!(parent.set_actions.at(ActionTime::At(0))[0].values, [Value::Real(1.0)]);
        assert_eq!(child.set_actions.at(ActionTime::At(0))[0].values, [Value::Real(2.0)]);
    }
}
