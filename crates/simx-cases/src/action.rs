//! Set and get actions and the time-indexed tables that hold them.

use std::collections::BTreeMap;
use std::fmt;

use simx_core::{merge_ref_values, ActionKind, Result, Value};

/// Key of an action table: engine ticks, or every communication point.
///
/// `Continuous` orders before every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActionTime {
    Continuous,
    At(i64),
}

impl fmt::Display for ActionTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionTime::Continuous => write!(f, "step"),
            ActionTime::At(ticks) => write!(f, "{ticks}"),
        }
    }
}

/// Write `values` to the `refs` of one instance of a case variable.
#[derive(Debug, Clone, PartialEq)]
pub struct SetAction {
    pub alias: String,
    pub component: String,
    pub refs: Vec<u32>,
    pub values: Vec<Value>,
}

/// Read all `refs` of one instance of a case variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetAction {
    pub alias: String,
    pub component: String,
    pub refs: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Set(SetAction),
    Get(GetAction),
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Set(_) => ActionKind::Set,
            Action::Get(_) => ActionKind::Get,
        }
    }

    pub fn alias(&self) -> &str {
        match self {
            Action::Set(a) => &a.alias,
            Action::Get(a) => &a.alias,
        }
    }

    pub fn component(&self) -> &str {
        match self {
            Action::Set(a) => &a.component,
            Action::Get(a) => &a.component,
        }
    }
}

/// Actions grouped by time, ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionTable<A> {
    entries: BTreeMap<ActionTime, Vec<A>>,
}

impl<A> Default for ActionTable<A> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<A> ActionTable<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(&self, time: ActionTime) -> &[A] {
        self.entries.get(&time).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All entries, the continuous one first.
    pub fn iter(&self) -> impl Iterator<Item = (ActionTime, &[A])> {
        self.entries.iter().map(|(t, a)| (*t, a.as_slice()))
    }

    /// Entries at concrete tick times, ascending.
    pub fn timed(&self) -> Vec<(i64, &[A])> {
        self.entries
            .iter()
            .filter_map(|(t, a)| match t {
                ActionTime::At(ticks) => Some((*ticks, a.as_slice())),
                ActionTime::Continuous => None,
            })
            .collect()
    }

    /// Number of action times.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of actions over all times.
    pub fn count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

impl ActionTable<SetAction> {
    /// Add a set action, merging with an existing one for the same time,
    /// alias and component.
    ///
    /// `all_refs` is the reference tuple of the case variable; merged refs
    /// keep its order and overlapping refs take the new value.
    pub fn add(&mut self, time: ActionTime, action: SetAction, all_refs: &[u32]) -> Result<()> {
        let actions = self.entries.entry(time).or_default();
        match actions
            .iter_mut()
            .find(|a| a.alias == action.alias && a.component == action.component)
        {
            Some(existing) => {
                let (refs, values) = merge_ref_values(
                    all_refs,
                    &existing.refs,
                    &existing.values,
                    &action.refs,
                    &action.values,
                )?;
                existing.refs = refs;
                existing.values = values;
            }
            None => actions.push(action),
        }
        Ok(())
    }
}

impl ActionTable<GetAction> {
    /// Add a get action unless the same alias and component is already read at `time`.
    pub fn add(&mut self, time: ActionTime, action: GetAction) {
        let actions = self.entries.entry(time).or_default();
        if !actions
            .iter()
            .any(|a| a.alias == action.alias && a.component == action.component)
        {
            actions.push(action);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(component: &str, refs: &[u32], values: &[f64]) -> SetAction {
        SetAction {
            alias: "x".into(),
            component: component.into(),
            refs: refs.to_vec(),
            values: values.iter().map(|v| Value::Real(*v)).collect(),
        }
    }

    #[test]
    fn continuous_sorts_first() {
        let mut table: ActionTable<GetAction> = ActionTable::new();
        let get = GetAction {
            alias: "x".into(),
            component: "c".into(),
            refs: vec![0],
        };
        table.add(ActionTime::At(5), get.clone());
        table.add(ActionTime::At(-1), get.clone());
        table.add(ActionTime::Continuous, get.clone());
        let times: Vec<ActionTime> = table.iter().map(|(t, _)| t).collect();
        assert_eq!(
            times,
            [ActionTime::Continuous, ActionTime::At(-1), ActionTime::At(5)]
        );
        assert_eq!(table.timed().len(), 2);
    }

    #[test]
    fn get_actions_are_deduplicated() {
        let mut table: ActionTable<GetAction> = ActionTable::new();
        let get = GetAction {
            alias: "x".into(),
            component: "c".into(),
            refs: vec![0, 1],
        };
        table.add(ActionTime::At(0), get.clone());
        table.add(ActionTime::At(0), get.clone());
        table.add(
            ActionTime::At(0),
            GetAction {
                component: "d".into(),
                ..get
            },
        );
        assert_eq!(table.count(), 2);
    }

    #[test]
    fn set_actions_merge_per_component() {
        let all = [10, 11, 12];
        let mut table: ActionTable<SetAction> = ActionTable::new();
        table.add(ActionTime::At(0), set("c", &[10], &[1.0]), &all).unwrap();
        table.add(ActionTime::At(0), set("c", &[12], &[3.0]), &all).unwrap();
        table.add(ActionTime::At(0), set("c", &[10, 11], &[9.0, 2.0]), &all).unwrap();
        table.add(ActionTime::At(0), set("d", &[11], &[5.0]), &all).unwrap();
        let actions = table.at(ActionTime::At(0));
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0], set("c", &[10, 11, 12], &[9.0, 2.0, 3.0]));
        assert_eq!(actions[1], set("d", &[11], &[5.0]));
        assert!(table.at(ActionTime::At(1)).is_empty());
    }
}
