//! Temporal quantifiers: how a predicate series turns into one verdict.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{AssertError, Result};
use crate::eval::Val;

/// When an assertion must hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub enum Temporal {
    /// `@A`: true at some sample; reports the first.
    #[default]
    Always,
    /// `@F`: true from some sample through the end.
    Finally,
    /// `@T<t>` or `@<t>`: the predicate value interpolated at `t`.
    Time(f64),
}

impl Temporal {
    /// The time argument of [`Temporal::Time`].
    pub fn time(&self) -> Option<f64> {
        match self {
            Temporal::Time(t) => Some(*t),
            _ => None,
        }
    }
}

impl fmt::Display for Temporal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Temporal::Always => write!(f, "A"),
            Temporal::Finally => write!(f, "F"),
            Temporal::Time(t) => write!(f, "T{t}"),
        }
    }
}

impl FromStr for Temporal {
    type Err = AssertError;

    /// Parse the text after `@` of an assertion key. Empty text means `A`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Temporal::Always);
        }
        if let Ok(t) = s.parse::<f64>() {
            return Ok(Temporal::Time(t));
        }
        let bad = || AssertError::Temporal(s.to_string());
        let (letter, rest) = s.split_at(1);
        let rest = rest.trim();
        match letter {
            "A" | "a" if rest.is_empty() => Ok(Temporal::Always),
            "F" | "f" if rest.is_empty() => Ok(Temporal::Finally),
            "T" | "t" => rest.parse().map(Temporal::Time).map_err(|_| bad()),
            _ => Err(bad()),
        }
    }
}

/// Result of evaluating a series under a quantifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// The sample time the verdict refers to.
    pub time: f64,
    /// Boolean for `A`/`F`; the interpolated value for `T`.
    pub value: Val,
}

impl Outcome {
    pub fn passed(&self) -> bool {
        self.value.truthy().unwrap_or(false)
    }
}

/// First sample at which the predicate holds, else the last sample with `false`.
pub fn always(series: &[(f64, bool)]) -> Option<(f64, bool)> {
    let (last, _) = series.last()?;
    Some(
        series
            .iter()
            .find(|(_, v)| *v)
            .map_or((*last, false), |(t, _)| (*t, true)),
    )
}

/// Start of the final run of samples where the predicate holds.
///
/// Each relapse to false resets the start. The verdict is true when the
/// series ends with at least one true sample.
pub fn finally(series: &[(f64, bool)]) -> Option<(f64, bool)> {
    let (last, _) = series.last()?;
    let mut since: Option<f64> = None;
    for (t, v) in series {
        match (v, since) {
            (true, None) => since = Some(*t),
            (false, Some(_)) => since = None,
            _ => {}
        }
    }
    Some(since.map_or((*last, false), |t| (t, true)))
}

/// Linear interpolation of `series` at `t0`, clamped to the end values.
pub fn interpolate(series: &[(f64, f64)], t0: f64) -> Option<f64> {
    let (first_t, first_v) = *series.first()?;
    let (last_t, last_v) = *series.last()?;
    if t0 <= first_t {
        return Some(first_v);
    }
    if t0 >= last_t {
        return Some(last_v);
    }
    let i = series.partition_point(|(t, _)| *t <= t0);
    let (t1, v1) = series[i - 1];
    let (t2, v2) = series[i];
    if t2 == t1 {
        return Some(v1);
    }
    Some(v1 + (v2 - v1) * (t0 - t1) / (t2 - t1))
}

/// Evaluate a predicate series under `temporal`.
///
/// For `A` and `F` every value is taken by truthiness. For `T` the values are
/// interpolated numerically; when all of them are booleans the result is the
/// boolean `interpolated != 0`.
pub fn evaluate(key: &str, temporal: Temporal, series: &[(f64, Val)]) -> Result<Outcome> {
    let no_data = || AssertError::NoData(key.to_string());
    match temporal {
        Temporal::Always | Temporal::Finally => {
            let bools = series
                .iter()
                .map(|(t, v)| Ok((*t, v.truthy()?)))
                .collect::<Result<Vec<_>>>()?;
            let quantify = if temporal == Temporal::Always { always } else { finally };
            let (time, value) = quantify(&bools).ok_or_else(no_data)?;
            Ok(Outcome {
                time,
                value: Val::Bool(value),
            })
        }
        Temporal::Time(t0) => {
            let nums = series
                .iter()
                .map(|(t, v)| Ok((*t, v.as_num()?)))
                .collect::<Result<Vec<_>>>()?;
            let x = interpolate(&nums, t0).ok_or_else(no_data)?;
            let value = if series.iter().all(|(_, v)| v.is_bool()) {
                Val::Bool(x != 0.0)
            } else {
                Val::Num(x)
            };
            Ok(Outcome { time: t0, value })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(f: impl Fn(f64) -> bool) -> Vec<(f64, bool)> {
        (0..100).map(|i| i as f64 / 10.0).map(|t| (t, f(t))).collect()
    }

    #[test]
    fn parse_specs() {
        assert_eq!("".parse::<Temporal>().unwrap(), Temporal::Always);
        assert_eq!("A".parse::<Temporal>().unwrap(), Temporal::Always);
        assert_eq!("F".parse::<Temporal>().unwrap(), Temporal::Finally);
        assert_eq!("T9.85".parse::<Temporal>().unwrap(), Temporal::Time(9.85));
        assert_eq!("2.5".parse::<Temporal>().unwrap(), Temporal::Time(2.5));
        assert!("T".parse::<Temporal>().is_err());
        assert!("Ax".parse::<Temporal>().is_err());
        assert!("step".parse::<Temporal>().is_err());
    }

    #[test]
    fn always_reports_first_true() {
        assert_eq!(always(&series(|t| t > 8.0)), Some((8.1, true)));
        assert_eq!(always(&series(|_| false)), Some((9.9, false)));
        assert_eq!(always(&[]), None);
    }

    #[test]
    fn finally_resets_on_relapse() {
        assert_eq!(finally(&series(|t| t > 8.0)), Some((8.1, true)));
        assert_eq!(finally(&series(|t| t > 8.0 && t < 9.85)), Some((9.9, false)));
        assert_eq!(finally(&series(|t| t > 3.0 && t < 5.0 || t > 8.0)), Some((8.1, true)));
        assert_eq!(finally(&series(|t| t > 9.85)), Some((9.9, true)));
    }

    #[test]
    fn interpolation_is_linear_and_clamped() {
        let s = vec![(0.0, 0.0), (1.0, 10.0), (2.0, 30.0)];
        assert_eq!(interpolate(&s, 0.5), Some(5.0));
        assert_eq!(interpolate(&s, 1.0), Some(10.0));
        assert_eq!(interpolate(&s, 1.5), Some(20.0));
        assert_eq!(interpolate(&s, -1.0), Some(0.0));
        assert_eq!(interpolate(&s, 5.0), Some(30.0));
        assert_eq!(interpolate(&[], 5.0), None);
    }

    #[test]
    fn time_quantifier_keeps_booleans() {
        let s = vec![(0.0, Val::Bool(false)), (1.0, Val::Bool(true))];
        let o = evaluate("k", Temporal::Time(0.75), &s).unwrap();
        assert_eq!(o, Outcome { time: 0.75, value: Val::Bool(true) });
        let s = vec![(0.0, Val::Num(1.0)), (1.0, Val::Num(3.0))];
        let o = evaluate("k", Temporal::Time(0.25), &s).unwrap();
        assert_eq!(o.value, Val::Num(1.5));
        assert!(matches!(evaluate("k", Temporal::Finally, &[]), Err(AssertError::NoData(_))));
    }
}
