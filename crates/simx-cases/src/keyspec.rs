//! Parsing of `alias[range]@time` spec keys.

use simx_core::ActionKind;

/// When a spec entry acts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum When {
    /// A set action at time 0.
    Start,
    /// A get action at the case's stop time.
    Stop,
    /// An explicit time in user units.
    At(f64),
    /// `@step`: at every communication point.
    EveryStep,
    /// `@step<interval>`: every `interval` user time units from start to stop.
    Every(f64),
}

/// A decoded spec key.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionKey<'a> {
    /// `alias` or `alias[range]`.
    pub variable: &'a str,
    pub kind: ActionKind,
    pub when: When,
}

/// Spec values meaning "record this variable" instead of a value to set.
pub fn is_result_marker(value: &serde_json::Value) -> bool {
    value.is_null() || matches!(value.as_str(), Some("result" | "res"))
}

/// Split a key on its first `@`. The part before `@` must not be empty.
pub fn split_at_sign(key: &str) -> Result<(&str, Option<&str>), String> {
    let (pre, at) = match key.split_once('@') {
        Some((pre, at)) => (pre.trim(), Some(at.trim())),
        None => (key.trim(), None),
    };
    if pre.is_empty() {
        return Err("missing variable before '@'".to_string());
    }
    Ok((pre, at))
}

/// Decode a spec key. `has_value` tells whether the entry supplies values.
///
/// - no `@`: set at start with a value, get at stop without
/// - `@<time>`: set with a value, get without
/// - `@step` / `@step<interval>`: periodic get; values are not allowed
pub fn parse_action_key(key: &str, has_value: bool) -> Result<ActionKey<'_>, String> {
    let (variable, at) = split_at_sign(key)?;
    let kind_for_value = if has_value {
        ActionKind::Set
    } else {
        ActionKind::Get
    };
    let Some(at) = at.filter(|at| !at.is_empty()) else {
        let when = if has_value { When::Start } else { When::Stop };
        return Ok(ActionKey {
            variable,
            kind: kind_for_value,
            when,
        });
    };
    if let Ok(time) = at.parse::<f64>() {
        return Ok(ActionKey {
            variable,
            kind: kind_for_value,
            when: When::At(time),
        });
    }
    let Some(interval) = at.strip_prefix("step") else {
        return Err(format!("'@{at}' is neither a time nor 'step'"));
    };
    if has_value {
        return Err("periodic actions cannot set values".to_string());
    }
    let interval = interval.trim();
    let when = if interval.is_empty() {
        When::EveryStep
    } else {
        match interval.parse::<f64>() {
            Ok(dt) if dt > 0.0 => When::Every(dt),
            _ => return Err(format!("invalid step interval '{interval}'")),
        }
    };
    Ok(ActionKey {
        variable,
        kind: ActionKind::Step,
        when,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(variable: &str, kind: ActionKind, when: When) -> ActionKey<'_> {
        ActionKey {
            variable,
            kind,
            when,
        }
    }

    #[test]
    fn time_specs() {
        assert_eq!(
            parse_action_key("v@1.0", true).unwrap(),
            key("v", ActionKind::Set, When::At(1.0))
        );
        assert_eq!(
            parse_action_key("v@1.0", false).unwrap(),
            key("v", ActionKind::Get, When::At(1.0))
        );
        assert_eq!(
            parse_action_key("v", false).unwrap(),
            key("v", ActionKind::Get, When::Stop)
        );
        assert_eq!(
            parse_action_key("v[1,2]", true).unwrap(),
            key("v[1,2]", ActionKind::Set, When::Start)
        );
        assert_eq!(
            parse_action_key("v@-1", true).unwrap(),
            key("v", ActionKind::Set, When::At(-1.0))
        );
    }

    #[test]
    fn step_specs() {
        assert_eq!(
            parse_action_key("v@step", false).unwrap(),
            key("v", ActionKind::Step, When::EveryStep)
        );
        assert_eq!(
            parse_action_key("v@step 0.5", false).unwrap(),
            key("v", ActionKind::Step, When::Every(0.5))
        );
        assert!(parse_action_key("v@step", true).is_err());
        assert!(parse_action_key("v@stepx", false).is_err());
        assert!(parse_action_key("v@step0", false).is_err());
    }

    #[test]
    fn malformed_keys() {
        assert!(parse_action_key("@1.0", true).is_err());
        assert!(parse_action_key("v@later", true).is_err());
    }

    #[test]
    fn result_markers() {
        assert!(is_result_marker(&serde_json::Value::Null));
        assert!(is_result_marker(&serde_json::json!("res")));
        assert!(!is_result_marker(&serde_json::json!(1.0)));
    }
}
