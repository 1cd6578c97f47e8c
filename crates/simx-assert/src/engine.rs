//! Registry of compiled assertions and their evaluation against results.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use simx_core::VariableRegistry;
use simx_results::{Field, Results};

use crate::ast::Expr;
use crate::error::{AssertError, Result};
use crate::eval::{evaluate, is_function, Val};
use crate::parser::parse;
use crate::temporal::{self, Outcome, Temporal};

/// The symbol bound to the sample time.
pub const TIME_SYMBOL: &str = "t";

/// Where the values of a symbol are recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolTarget {
    pub instance: String,
    pub alias: String,
    /// Number of elements of the case variable.
    pub len: usize,
}

/// Outcome of [`AssertionEngine::do_assert`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub passed: bool,
    pub details: Option<String>,
    pub case: String,
}

/// A compiled assertion.
#[derive(Debug, Clone)]
pub struct Assertion {
    pub key: String,
    pub expression: String,
    ast: Expr,
    /// Symbols used, in registration order. Argument slot `i` binds `symbols[i]`.
    pub symbols: Vec<String>,
    pub functions: Vec<String>,
    pub temporal: Temporal,
    pub description: Option<String>,
    pub verdict: Option<Verdict>,
}

impl Assertion {
    pub fn uses_time(&self) -> bool {
        self.symbols.first().is_some_and(|s| s == TIME_SYMBOL)
    }
}

/// One row of evaluation input: the time and the values of the non-time symbols.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub time: f64,
    pub values: Vec<Val>,
}

/// Report line for an evaluated assertion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssertionResult {
    pub key: String,
    pub expression: String,
    pub temporal: String,
    pub description: Option<String>,
    pub case: String,
    pub passed: bool,
    pub details: Option<String>,
}

impl fmt::Display for AssertionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.passed { "PASSED" } else { "FAILED" };
        write!(
            f,
            "{status} {}@{} [{}]: {}",
            self.key, self.temporal, self.case, self.expression
        )?;
        if let Some(details) = &self.details {
            write!(f, " {details}")?;
        }
        if let Some(description) = &self.description {
            write!(f, " ({description})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct AssertionEngine {
    symbols: IndexMap<String, Option<SymbolTarget>>,
    assertions: IndexMap<String, Assertion>,
}

impl Default for AssertionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AssertionEngine {
    /// An engine knowing only the time symbol.
    pub fn new() -> Self {
        let mut symbols = IndexMap::new();
        symbols.insert(TIME_SYMBOL.to_string(), None);
        Self {
            symbols,
            assertions: IndexMap::new(),
        }
    }

    /// Register `<instance>_<alias>` for every instance of every case
    /// variable, and the bare alias when it has a single instance.
    pub fn register_vars(&mut self, registry: &VariableRegistry) {
        for variable in registry.iter() {
            for instance in &variable.instances {
                self.register_symbol(
                    format!("{instance}_{}", variable.alias),
                    instance,
                    &variable.alias,
                    variable.len(),
                );
            }
            if let [instance] = variable.instances.as_slice() {
                self.register_symbol(variable.alias.clone(), instance, &variable.alias, variable.len());
            }
        }
        debug!(symbols = self.symbols.len(), "assertion symbols registered");
    }

    pub fn register_symbol(&mut self, name: String, instance: &str, alias: &str, len: usize) {
        self.symbols.insert(
            name,
            Some(SymbolTarget {
                instance: instance.to_string(),
                alias: alias.to_string(),
                len,
            }),
        );
    }

    /// Recording location of `symbol`; `None` for the time symbol.
    pub fn info(&self, symbol: &str) -> Result<Option<&SymbolTarget>> {
        self.symbols
            .get(symbol)
            .map(Option::as_ref)
            .ok_or_else(|| AssertError::UnknownSymbol(symbol.to_string()))
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.symbols.keys().map(String::as_str)
    }

    /// Compile `text` and store it under `key`.
    ///
    /// Recompiling an existing key keeps its temporal spec and description.
    pub fn expr(&mut self, key: &str, text: &str) -> Result<&Assertion> {
        let mut ast = parse(text)?;

        let mut names = Vec::new();
        let mut functions: Vec<String> = Vec::new();
        ast.walk(&mut |e| match e {
            Expr::Symbol { name, .. } => names.push(name.clone()),
            Expr::Call { func, .. } if !functions.contains(func) => functions.push(func.clone()),
            _ => {}
        });
        if let Some(func) = functions.iter().find(|f| !is_function(f)) {
            return Err(AssertError::UnknownFunction(func.clone()));
        }
        let mut order = Vec::with_capacity(names.len());
        for name in &names {
            let index = self
                .symbols
                .get_index_of(name)
                .ok_or_else(|| AssertError::UnknownSymbol(name.clone()))?;
            order.push(index);
        }
        order.sort_unstable();
        order.dedup();
        let symbols: Vec<String> = order
            .into_iter()
            .filter_map(|i| self.symbols.get_index(i).map(|(name, _)| name.clone()))
            .collect();

        ast.walk_mut(&mut |e: &mut Expr| {
            if let Expr::Symbol { name, slot } = e {
                if let Some(i) = symbols.iter().position(|s| s == name) {
                    *slot = i;
                }
            }
        });

        let (temporal, description) = self
            .assertions
            .get(key)
            .map(|a| (a.temporal, a.description.clone()))
            .unwrap_or_default();
        debug!(key, expression = text, ?symbols, "assertion compiled");
        let assertion = Assertion {
            key: key.to_string(),
            expression: text.to_string(),
            ast,
            symbols,
            functions,
            temporal,
            description,
            verdict: None,
        };
        self.assertions.insert(key.to_string(), assertion);
        self.get(key)
    }

    pub fn get(&self, key: &str) -> Result<&Assertion> {
        self.assertions
            .get(key)
            .ok_or_else(|| AssertError::UnknownKey(key.to_string()))
    }

    fn get_mut(&mut self, key: &str) -> Result<&mut Assertion> {
        self.assertions
            .get_mut(key)
            .ok_or_else(|| AssertError::UnknownKey(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.assertions.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.assertions.keys().map(String::as_str)
    }

    pub fn temporal(&self, key: &str) -> Result<Temporal> {
        Ok(self.get(key)?.temporal)
    }

    pub fn set_temporal(&mut self, key: &str, temporal: Temporal) -> Result<()> {
        self.get_mut(key)?.temporal = temporal;
        Ok(())
    }

    pub fn description(&self, key: &str) -> Result<Option<&str>> {
        Ok(self.get(key)?.description.as_deref())
    }

    pub fn set_description(&mut self, key: &str, description: impl Into<String>) -> Result<()> {
        self.get_mut(key)?.description = Some(description.into());
        Ok(())
    }

    /// Evaluate `key` once with one value per symbol, in symbol order.
    pub fn eval_single(&self, key: &str, args: &[Val]) -> Result<Val> {
        let assertion = self.get(key)?;
        if args.len() != assertion.symbols.len() {
            return Err(AssertError::Arguments {
                key: key.to_string(),
                expected: assertion.symbols.len(),
                found: args.len(),
            });
        }
        evaluate(&assertion.ast, args)
    }

    /// Evaluate `key` at every observation, returning `(time, value)` pairs.
    pub fn eval_each(&self, key: &str, rows: &[Observation]) -> Result<Vec<(f64, Val)>> {
        let assertion = self.get(key)?;
        let with_time = assertion.uses_time();
        let mut out = Vec::with_capacity(rows.len());
        let mut args = Vec::with_capacity(assertion.symbols.len());
        for row in rows {
            args.clear();
            if with_time {
                args.push(Val::Num(row.time));
            }
            args.extend(row.values.iter().cloned());
            out.push((row.time, self.eval_single(key, &args)?));
        }
        Ok(out)
    }

    /// Evaluate `key` over a series under its temporal spec.
    pub fn eval_series(&self, key: &str, rows: &[Observation]) -> Result<Outcome> {
        let temporal = self.get(key)?.temporal;
        let series = self.eval_each(key, rows)?;
        temporal::evaluate(key, temporal, &series)
    }

    /// Evaluate `key` against `results` and store the verdict.
    pub fn do_assert(&mut self, key: &str, results: &Results, case: &str) -> Result<bool> {
        let assertion = self.get(key)?;
        let mut fields = Vec::new();
        for symbol in &assertion.symbols {
            if let Some(target) = self.info(symbol)? {
                fields.push(Field::new(&target.instance, &target.alias));
            }
        }
        let rows = results
            .retrieve(&fields)?
            .into_iter()
            .map(|row| {
                let values = row
                    .values
                    .iter()
                    .map(Val::from_sample)
                    .collect::<Result<Vec<_>>>()?;
                Ok(Observation {
                    time: row.time,
                    values,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let outcome = self.eval_series(key, &rows)?;
        let passed = outcome.passed();
        let details = match assertion.temporal {
            Temporal::Always => None,
            Temporal::Finally => Some(format!("@{}", outcome.time)),
            Temporal::Time(t) => Some(format!("@{t} (interpolated)")),
        };
        info!(key, case, passed, "assertion evaluated");
        self.get_mut(key)?.verdict = Some(Verdict {
            passed,
            details,
            case: case.to_string(),
        });
        Ok(passed)
    }

    /// Evaluate every key of a case, returning `[passed, total]`.
    pub fn do_assert_case(&mut self, case: &str, keys: &[String], results: &Results) -> Result<[usize; 2]> {
        let mut passed = 0;
        for key in keys {
            if self.do_assert(key, results, case)? {
                passed += 1;
            }
        }
        Ok([passed, keys.len()])
    }

    /// Report lines of evaluated assertions, for `keys` or for all of them.
    pub fn report(&self, keys: Option<&[String]>) -> Vec<AssertionResult> {
        let selected: Vec<&Assertion> = match keys {
            Some(keys) => keys.iter().filter_map(|k| self.assertions.get(k)).collect(),
            None => self.assertions.values().collect(),
        };
        selected
            .into_iter()
            .filter_map(|a| {
                let verdict = a.verdict.as_ref()?;
                Some(AssertionResult {
                    key: a.key.clone(),
                    expression: a.expression.clone(),
                    temporal: a.temporal.to_string(),
                    description: a.description.clone(),
                    case: verdict.case.clone(),
                    passed: verdict.passed,
                    details: verdict.details.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use simx_core::Value;
    use simx_results::ResultsHeader;

    fn engine() -> AssertionEngine {
        let mut engine = AssertionEngine::new();
        engine.register_symbol("x".into(), "bb", "x", 1);
        engine.register_symbol("bb_pos".into(), "bb", "pos", 3);
        engine
    }

    fn results() -> Results {
        let mut results = Results::new(ResultsHeader {
            case: "base".into(),
            cases: "test".into(),
            file: "test.json".into(),
            date_time: Utc::now(),
            cases_date: None,
            time_unit: "sec".into(),
            time_factor: 1e9,
        });
        for i in 0..100 {
            let t = i as f64 / 10.0;
            results.add(t, "bb", "x", vec![Value::Real(2.0)]);
            results.add(t, "bb", "pos", vec![Value::Real(t), Value::Real(0.0), Value::Real(1.0)]);
        }
        results
    }

    #[test]
    fn symbols_follow_registration_order() {
        let mut e = engine();
        let a = e.expr("k", "norm(bb_pos) > x * t").unwrap();
        assert_eq!(a.symbols, vec!["t", "x", "bb_pos"]);
        assert_eq!(a.functions, vec!["norm"]);
        assert!(a.uses_time());
        assert!(matches!(e.expr("k", "y > 1"), Err(AssertError::UnknownSymbol(s)) if s == "y"));
        assert!(matches!(e.expr("k", "exit(x)"), Err(AssertError::UnknownFunction(_))));
    }

    #[test]
    fn recompiling_keeps_temporal_and_description() {
        let mut e = engine();
        e.expr("k", "x > 1").unwrap();
        e.set_temporal("k", Temporal::Finally).unwrap();
        e.set_description("k", "x stays large").unwrap();
        e.expr("k", "x > 0").unwrap();
        assert_eq!(e.temporal("k").unwrap(), Temporal::Finally);
        assert_eq!(e.description("k").unwrap(), Some("x stays large"));
    }

    #[test]
    fn eval_single_checks_argument_count() {
        let mut e = engine();
        e.expr("k", "x * t").unwrap();
        assert_eq!(e.eval_single("k", &[Val::Num(2.0), Val::Num(3.0)]).unwrap(), Val::Num(6.0));
        assert!(matches!(
            e.eval_single("k", &[Val::Num(2.0)]),
            Err(AssertError::Arguments { expected: 2, found: 1, .. })
        ));
    }

    #[test]
    fn series_strips_time_when_unused() {
        let mut e = engine();
        e.expr("k", "x > 1").unwrap();
        let rows = vec![
            Observation { time: 0.0, values: vec![Val::Num(0.0)] },
            Observation { time: 1.0, values: vec![Val::Num(2.0)] },
        ];
        let outcome = e.eval_series("k", &rows).unwrap();
        assert_eq!(outcome.time, 1.0);
        assert!(outcome.passed());
        let each = e.eval_each("k", &rows).unwrap();
        assert_eq!(each, vec![(0.0, Val::Bool(false)), (1.0, Val::Bool(true))]);
    }

    #[test]
    fn assert_always_and_finally_on_results() {
        let mut e = engine();
        let results = results();
        e.expr("late", "t > 8").unwrap();
        assert!(e.do_assert("late", &results, "base").unwrap());
        let report = e.report(None);
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].details, None);

        e.set_temporal("late", Temporal::Finally).unwrap();
        assert!(e.do_assert("late", &results, "base").unwrap());
        assert_eq!(e.report(None)[0].details.as_deref(), Some("@8.1"));

        e.expr("never", "bb_pos[0] > 100").unwrap();
        e.set_temporal("never", Temporal::Finally).unwrap();
        assert!(!e.do_assert("never", &results, "base").unwrap());
        assert_eq!(
            e.get("never").unwrap().verdict.as_ref().and_then(|v| v.details.clone()),
            Some("@9.9".to_string())
        );
    }

    #[test]
    fn assert_at_time_interpolates() {
        let mut e = engine();
        let results = results();
        e.expr("prod", "x * t").unwrap();
        e.set_temporal("prod", Temporal::Time(9.85)).unwrap();
        let rows: Vec<Observation> = (98..100)
            .map(|i| Observation {
                time: i as f64 / 10.0,
                values: vec![Val::Num(2.0)],
            })
            .collect();
        let outcome = e.eval_series("prod", &rows).unwrap();
        let Val::Num(v) = outcome.value else {
            panic!("expected a number");
        };
        assert!((v - (2.0 * 9.8 + 2.0 * 9.9) / 2.0).abs() < 1e-9);

        assert!(e.do_assert("prod", &results, "base").unwrap());
        assert_eq!(
            e.report(Some(&["prod".to_string()]))[0].details.as_deref(),
            Some("@9.85 (interpolated)")
        );
        assert_eq!(
            e.do_assert_case("base", &["prod".to_string()], &results).unwrap(),
            [1, 1]
        );
    }

    #[test]
    fn unevaluated_assertions_are_not_reported() {
        let mut e = engine();
        e.expr("k", "x > 1").unwrap();
        assert!(e.report(None).is_empty());
        assert!(matches!(e.do_assert("missing", &results(), "base"), Err(AssertError::UnknownKey(_))));
    }
}
