//! The root aggregate of one cases document.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tracing::info;

use simx_assert::AssertionEngine;
use simx_core::{SystemInterface, TimeScale, VariableRegistry};
use simx_results::{Results, ResultsHeader};
use simx_system::StructureSystem;

use crate::case::{Case, CaseId, CaseTree, Special, BASE};
use crate::compiler::CaseCompiler;
use crate::document::{CaseSpec, CasesDocument, Header};
use crate::error::{CaseError, Result};
use crate::schedule::{Executor, RunOutcome};

/// Where to save the results of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Dump {
    /// Keep results in memory only.
    Skip,
    /// `<case>.json` next to the cases document.
    #[default]
    Default,
    /// A file name; relative names are placed next to the cases document and
    /// get a `.json` extension when they have none.
    To(PathBuf),
}

impl Dump {
    pub fn path(&self, case: &str, dir: &Path) -> Option<PathBuf> {
        match self {
            Dump::Skip => None,
            Dump::Default => Some(dir.join(format!("{case}.json"))),
            Dump::To(file) => {
                let mut path = if file.is_absolute() {
                    file.clone()
                } else {
                    dir.join(file)
                };
                if path.extension().is_none() {
                    path.set_extension("json");
                }
                Some(path)
            }
        }
    }
}

/// Outcome of running one case.
#[derive(Debug, Clone)]
pub struct CaseRun {
    pub case: String,
    pub outcome: RunOutcome,
    pub results: Results,
    /// `[passed, total]` when assertions were evaluated.
    pub assertions: Option<[usize; 2]>,
    /// File the results were saved to.
    pub dumped: Option<PathBuf>,
}

/// A loaded cases document: registry, case tree, assertions and the system they run on.
pub struct Cases {
    name: String,
    description: String,
    file: PathBuf,
    model_file: String,
    time_unit: String,
    scale: TimeScale,
    registry: VariableRegistry,
    system: Box<dyn SystemInterface>,
    tree: CaseTree,
    engine: AssertionEngine,
}

impl Cases {
    /// Load a cases document and the system structure it names.
    pub fn load(path: &Path) -> Result<Self> {
        let document = CasesDocument::load(path)?;
        let system = open_system(&document.header, path)?;
        Self::new(document, path, system)
    }

    /// Build all cases of `document` against `system`.
    pub fn new(document: CasesDocument, file: impl Into<PathBuf>, system: Box<dyn SystemInterface>) -> Result<Self> {
        let file = file.into();
        let CasesDocument { header, cases } = document;
        let scale = TimeScale::from_unit(&header.time_unit);
        let registry = VariableRegistry::build(&header.variables, system.as_ref())?;
        let mut engine = AssertionEngine::new();
        engine.register_vars(&registry);
        let tree = build_tree(&cases, &registry, system.as_ref(), &mut engine, scale)?;
        info!(
            name = %header.name,
            file = %file.display(),
            variables = registry.len(),
            cases = tree.len(),
            "cases loaded"
        );
        Ok(Self {
            name: header.name,
            description: header.description,
            file,
            model_file: header.model_file,
            time_unit: header.time_unit,
            scale,
            registry,
            system,
            tree,
            engine,
        })
    }

    /// Open the cases document that produced a results file, together with the results.
    ///
    /// The recorded cases path is tried as given, then by file name next to the results file.
    pub fn results_from_file(path: &Path) -> Result<(Self, Results)> {
        let results = Results::load(path)?;
        let recorded = PathBuf::from(&results.header().file);
        let cases_file = if recorded.is_absolute() || recorded.exists() {
            recorded
        } else {
            let dir = path.parent().unwrap_or(Path::new(""));
            dir.join(recorded.file_name().unwrap_or(recorded.as_os_str()))
        };
        let cases = Self::load(&cases_file)?;
        cases.tree.by_name(&results.header().case)?;
        Ok((cases, results))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn scale(&self) -> TimeScale {
        self.scale
    }

    pub fn registry(&self) -> &VariableRegistry {
        &self.registry
    }

    pub fn tree(&self) -> &CaseTree {
        &self.tree
    }

    pub fn engine(&self) -> &AssertionEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut AssertionEngine {
        &mut self.engine
    }

    pub fn case_by_name(&self, name: &str) -> Result<&Case> {
        Ok(self.tree.get(self.tree.by_name(name)?))
    }

    /// Header line, model file and the indented case tree.
    pub fn info(&self) -> String {
        let name = if self.name.is_empty() { "noName" } else { &self.name };
        format!(
            "Cases {name}. {}\nSystem spec '{}'.\n{}",
            self.description,
            self.model_file,
            self.tree.info(CaseId::ROOT)
        )
    }

    /// Run the named case, and with `run_subs` its whole sub-tree depth first.
    pub fn run_case(&mut self, name: &str, dump: &Dump, run_subs: bool, run_assertions: bool) -> Result<Vec<CaseRun>> {
        let id = self.tree.by_name(name)?;
        let ids = if run_subs { self.tree.list(id) } else { vec![id] };
        ids.into_iter()
            .map(|id| self.run_one(id, dump, run_assertions))
            .collect()
    }

    fn run_one(&mut self, id: CaseId, dump: &Dump, run_assertions: bool) -> Result<CaseRun> {
        let case = self.tree.get(id);
        let mut results = Results::new(self.results_header(&case.name));
        let outcome = Executor::new(self.system.as_mut(), &self.registry, self.scale).run(case, &mut results)?;

        let dir = self.file.parent().unwrap_or(Path::new(""));
        let dumped = dump.path(&case.name, dir);
        if let Some(path) = &dumped {
            results.save(path)?;
        }
        let assertions = if run_assertions {
            Some(self.engine.do_assert_case(&case.name, &case.asserts, &results)?)
        } else {
            None
        };
        Ok(CaseRun {
            case: case.name.clone(),
            outcome,
            results,
            assertions,
            dumped,
        })
    }

    fn results_header(&self, case: &str) -> ResultsHeader {
        let cases_date = std::fs::metadata(&self.file)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);
        ResultsHeader {
            case: case.to_string(),
            cases: self.name.clone(),
            file: self.file.display().to_string(),
            date_time: Utc::now(),
            cases_date,
            time_unit: self.time_unit.clone(),
            time_factor: self.scale.factor(),
        }
    }
}

fn open_system(header: &Header, file: &Path) -> Result<Box<dyn SystemInterface>> {
    let path = file.parent().unwrap_or(Path::new("")).join(&header.model_file);
    match header.simulator.as_str() {
        "" | "reference" => Ok(Box::new(StructureSystem::load(&path)?)),
        other => Err(CaseError::Init(format!("unknown simulator '{other}'"))),
    }
}

/// Build `base` and then every other case in document order.
///
/// A parent must appear before its children.
fn build_tree(
    cases: &IndexMap<String, CaseSpec>,
    registry: &VariableRegistry,
    system: &dyn SystemInterface,
    engine: &mut AssertionEngine,
    scale: TimeScale,
) -> Result<CaseTree> {
    let base_spec = cases
        .get(BASE)
        .ok_or_else(|| CaseError::Init("main section 'base' is required".into()))?;
    let number = |key: &str| base_spec.spec.get(key).and_then(serde_json::Value::as_f64);
    let stop_time = number("stopTime")
        .ok_or_else(|| CaseError::Init("'stopTime' must be given in the spec of 'base'".into()))?;
    let start_time = number("startTime").or_else(|| system.start_time()).unwrap_or(0.0);
    let step_size = number("stepSize")
        .or_else(|| system.default_step_size())
        .ok_or_else(|| {
            CaseError::Init("'stepSize' must be given in 'base' or by the system structure".into())
        })?;

    let mut compiler = CaseCompiler::new(registry, system, engine, scale);
    let mut base = Case::base(
        &base_spec.description,
        Special {
            start_time,
            stop_time,
            step_size,
        },
    );
    compiler.compile(&mut base, base_spec)?;
    let mut tree = CaseTree::new(base);

    for (name, spec) in cases {
        if name == BASE {
            continue;
        }
        let parent_name = spec.parent.as_deref().unwrap_or(BASE);
        let parent = tree.by_name(parent_name).map_err(|_| {
            CaseError::Init(format!(
                "parent '{parent_name}' of case '{name}' must be defined before it"
            ))
        })?;
        let mut case = Case::child_of(tree.get(parent), parent, name.as_str(), spec.description.as_str());
        compiler.compile(&mut case, spec)?;
        tree.insert(case)?;
    }
    Ok(tree)
}
