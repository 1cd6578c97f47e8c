//! Results of one case run, indexed by time, component and case variable.
//!
//! A run streams get-action observations into [`Results::add`]. Afterwards the
//! data can be joined on time with [`Results::retrieve`], summarized with
//! [`Results::inspect`] and saved as JSON for later offline use.

pub mod error;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use simx_core::{CaseVariable, Sample, Stamp, Value, VariableRegistry};

pub use error::{Result, ResultsError};

/// Recorded values at one time: component → case variable → sample.
pub type Record = IndexMap<String, IndexMap<String, Sample>>;

/// Provenance of a results set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsHeader {
    /// Name of the case that produced the results.
    pub case: String,
    /// Name of the cases document.
    pub cases: String,
    /// Path of the cases document.
    pub file: String,
    pub date_time: DateTime<Utc>,
    /// Modification time of the cases document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cases_date: Option<DateTime<Utc>>,
    pub time_unit: String,
    pub time_factor: f64,
}

/// One requested column of [`Results::retrieve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub component: String,
    pub variable: String,
    pub element: Option<usize>,
}

impl Field {
    pub fn new(component: impl Into<String>, variable: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            variable: variable.into(),
            element: None,
        }
    }

    pub fn element(mut self, index: usize) -> Self {
        self.element = Some(index);
        self
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.component, self.variable)?;
        if let Some(el) = self.element {
            write!(f, "[{el}]")?;
        }
        Ok(())
    }
}

impl FromStr for Field {
    type Err = ResultsError;

    /// Parse `component.variable` or `component.variable[element]`.
    fn from_str(s: &str) -> Result<Self> {
        let bad = || ResultsError::Field(s.to_string());
        let (component, variable) = s.split_once('.').ok_or_else(bad)?;
        let (variable, element) = match variable.split_once('[') {
            Some((var, rest)) => {
                let idx = rest.strip_suffix(']').ok_or_else(bad)?;
                (var, Some(idx.trim().parse().map_err(|_| bad())?))
            }
            None => (variable, None),
        };
        if component.is_empty() || variable.is_empty() {
            return Err(bad());
        }
        Ok(Self {
            component: component.to_string(),
            variable: variable.to_string(),
            element,
        })
    }
}

/// A joined row of [`Results::retrieve`].
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub time: f64,
    pub values: Vec<Sample>,
}

/// Per `component.variable` summary returned by [`Results::inspect`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Inspection {
    pub len: usize,
    pub range: [f64; 2],
    pub info: CaseVariable,
}

/// Recorded results of one case run.
#[derive(Debug, Clone, PartialEq)]
pub struct Results {
    header: ResultsHeader,
    data: BTreeMap<Stamp, Record>,
}

impl Results {
    pub fn new(header: ResultsHeader) -> Self {
        Self {
            header,
            data: BTreeMap::new(),
        }
    }

    pub fn header(&self) -> &ResultsHeader {
        &self.header
    }

    /// Record the values of `variable` on `component` at `time`.
    /// A single value is stored bare; several as a vector.
    pub fn add(&mut self, time: f64, component: &str, variable: &str, values: Vec<Value>) {
        self.add_sample(time, component, variable, Sample::from_values(values));
    }

    pub fn add_sample(&mut self, time: f64, component: &str, variable: &str, sample: Sample) {
        self.data
            .entry(Stamp(time))
            .or_default()
            .entry(component.to_string())
            .or_default()
            .insert(variable.to_string(), sample);
    }

    pub fn get(&self, time: f64, component: &str, variable: &str) -> Option<&Sample> {
        self.data.get(&Stamp(time))?.get(component)?.get(variable)
    }

    /// Recorded times in ascending order.
    pub fn times(&self) -> impl Iterator<Item = f64> + '_ {
        self.data.keys().map(|s| s.value())
    }

    pub fn records(&self) -> impl Iterator<Item = (f64, &Record)> {
        self.data.iter().map(|(s, r)| (s.value(), r))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Join `fields` on time: one row per time at which every field is recorded.
    pub fn retrieve(&self, fields: &[Field]) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        'times: for (stamp, record) in &self.data {
            let mut values = Vec::with_capacity(fields.len());
            for field in fields {
                let Some(sample) = record
                    .get(&field.component)
                    .and_then(|vars| vars.get(&field.variable))
                else {
                    continue 'times;
                };
                let value = match field.element {
                    None => sample.clone(),
                    Some(index) => {
                        let element = sample.element(index).ok_or_else(|| ResultsError::Element {
                            field: field.to_string(),
                            index,
                            time: stamp.value(),
                        })?;
                        Sample::Scalar(element.clone())
                    }
                };
                values.push(value);
            }
            rows.push(Row {
                time: stamp.value(),
                values,
            });
        }
        Ok(rows)
    }

    /// [`retrieve`](Self::retrieve) with fields given as `component.variable[element]` text.
    pub fn retrieve_str(&self, fields: &[&str]) -> Result<Vec<Row>> {
        let fields = fields
            .iter()
            .map(|f| f.parse())
            .collect::<Result<Vec<Field>>>()?;
        self.retrieve(&fields)
    }

    /// Summarize the recorded data per `component.variable`, optionally
    /// restricted to one component and/or one case variable.
    pub fn inspect(
        &self,
        registry: &VariableRegistry,
        component: Option<&str>,
        variable: Option<&str>,
    ) -> Result<IndexMap<String, Inspection>> {
        let mut summary: IndexMap<String, Inspection> = IndexMap::new();
        for (stamp, record) in &self.data {
            let time = stamp.value();
            for (comp, vars) in record {
                if component.is_some_and(|c| c != comp.as_str()) {
                    continue;
                }
                for var in vars.keys() {
                    if variable.is_some_and(|v| v != var.as_str()) {
                        continue;
                    }
                    let ident = format!("{comp}.{var}");
                    if let Some(entry) = summary.get_mut(&ident) {
                        entry.len += 1;
                        entry.range[1] = time;
                    } else {
                        let info = registry.get(var)?.clone();
                        summary.insert(
                            ident,
                            Inspection {
                                len: 1,
                                range: [time, time],
                                info,
                            },
                        );
                    }
                }
            }
        }
        Ok(summary)
    }

    /// JSON document: the header followed by one entry per time.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let mut doc = serde_json::Map::new();
        doc.insert("header".into(), serde_json::to_value(&self.header)?);
        for (stamp, record) in &self.data {
            doc.insert(stamp.to_string(), serde_json::to_value(record)?);
        }
        Ok(serde_json::Value::Object(doc))
    }

    pub fn from_json(doc: serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(doc) = doc else {
            return Err(ResultsError::Format {
                detail: "top level is not an object".into(),
            });
        };
        let mut header = None;
        let mut data = BTreeMap::new();
        for (key, value) in doc {
            if key == "header" {
                header = Some(serde_json::from_value(value)?);
                continue;
            }
            let stamp: Stamp = key.parse().map_err(|_| ResultsError::Format {
                detail: format!("'{key}' is neither 'header' nor a time"),
            })?;
            data.insert(stamp, serde_json::from_value(value)?);
        }
        let header = header.ok_or_else(|| ResultsError::Format {
            detail: "missing header".into(),
        })?;
        Ok(Self { header, data })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(&self.to_json()?)?;
        std::fs::write(path, text)?;
        debug!(path = %path.display(), times = self.data.len(), "results saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> ResultsHeader {
        ResultsHeader {
            case: "base".into(),
            cases: "BouncingBall".into(),
            file: "bb.cases".into(),
            date_time: Utc::now(),
            cases_date: None,
            time_unit: "sec".into(),
            time_factor: 1e9,
        }
    }

    fn sample_results() -> Results {
        let mut res = Results::new(header());
        res.add(0.0, "bb", "h", vec![Value::Real(1.0)]);
        res.add(0.0, "bb", "x", vec![Value::Real(0.0), Value::Real(1.0)]);
        res.add(0.1, "bb", "h", vec![Value::Real(0.9)]);
        res.add(0.2, "bb", "h", vec![Value::Real(0.8)]);
        res.add(0.2, "bb", "x", vec![Value::Real(0.2), Value::Real(0.8)]);
        res
    }

    #[test]
    fn add_stores_scalars_bare() {
        let res = sample_results();
        assert_eq!(res.get(0.0, "bb", "h"), Some(&Sample::Scalar(Value::Real(1.0))));
        assert!(matches!(res.get(0.2, "bb", "x"), Some(Sample::Vector(v)) if v.len() == 2));
        assert_eq!(res.times().collect::<Vec<_>>(), vec![0.0, 0.1, 0.2]);
    }

    #[test]
    fn retrieve_is_an_inner_join() {
        let res = sample_results();
        let rows = res
            .retrieve(&[Field::new("bb", "h"), Field::new("bb", "x").element(1)])
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].time, 0.2);
        assert_eq!(
            rows[1].values,
            vec![Sample::Scalar(Value::Real(0.8)), Sample::Scalar(Value::Real(0.8))]
        );
        assert_eq!(res.retrieve_str(&["bb.h"]).unwrap().len(), 3);
        assert!(res.retrieve(&[Field::new("bb", "x").element(5)]).is_err());
    }

    #[test]
    fn field_syntax() {
        let f: Field = "bb.x[2]".parse().unwrap();
        assert_eq!(f, Field::new("bb", "x").element(2));
        assert_eq!(f.to_string(), "bb.x[2]");
        assert!("bb".parse::<Field>().is_err());
        assert!("bb.x[a]".parse::<Field>().is_err());
    }

    #[test]
    fn json_keys_are_header_then_times() {
        let doc = sample_results().to_json().unwrap();
        let keys: Vec<_> = doc.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["header", "0.0", "0.1", "0.2"]);
        assert_eq!(doc["header"]["timeFactor"], serde_json::json!(1e9));
        assert_eq!(doc["0.1"]["bb"]["h"], serde_json::json!(0.9));
    }

    #[test]
    fn save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("base.json");
        let res = sample_results();
        res.save(&path).unwrap();
        let loaded = Results::load(&path).unwrap();
        assert_eq!(loaded, res);
        assert_eq!(
            loaded.retrieve_str(&["bb.h", "bb.x"]).unwrap(),
            res.retrieve_str(&["bb.h", "bb.x"]).unwrap()
        );
    }

    #[test]
    fn malformed_files_are_rejected() {
        assert!(matches!(
            Results::from_json(serde_json::json!([1, 2])),
            Err(ResultsError::Format { .. })
        ));
        assert!(matches!(
            Results::from_json(serde_json::json!({"0.0": {}})),
            Err(ResultsError::Format { .. })
        ));
        let mut doc = sample_results().to_json().unwrap();
        doc["later"] = serde_json::json!({});
        assert!(Results::from_json(doc).is_err());
    }
}
