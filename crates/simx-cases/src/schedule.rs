//! Execution of a compiled case against a system interface.
//!
//! One run walks the engine clock from start to stop in fixed steps. At each
//! step, due set actions are applied before the system advances and due get
//! actions are read after it arrived.

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use simx_core::{merge_ref_values, SystemInterface, TimeScale, Value, VariableRegistry};
use simx_results::Results;

use crate::action::{Action, ActionTime, GetAction, SetAction};
use crate::case::Case;
use crate::error::{CaseError, Result};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunOutcome {
    /// The clock reached the stop time.
    Completed,
    /// The system refused to advance to `at` (user time units).
    Aborted { at: f64 },
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed)
    }
}

pub struct Executor<'a> {
    system: &'a mut dyn SystemInterface,
    registry: &'a VariableRegistry,
    scale: TimeScale,
}

impl<'a> Executor<'a> {
    pub fn new(system: &'a mut dyn SystemInterface, registry: &'a VariableRegistry, scale: TimeScale) -> Self {
        Self {
            system,
            registry,
            scale,
        }
    }

    /// Run `case`, recording every get action into `results`.
    pub fn run(&mut self, case: &Case, results: &mut Results) -> Result<RunOutcome> {
        let tstart = self.scale.to_ticks(case.special.start_time);
        let tstop = self.scale.to_ticks(case.special.stop_time);
        let tstep = self.scale.to_ticks(case.special.step_size);
        if tstep <= 0 {
            return Err(CaseError::Init(format!(
                "case '{}': step size {} is below the clock resolution",
                case.name, case.special.step_size
            )));
        }

        info!(case = %case.name, start = case.special.start_time, stop = case.special.stop_time, "run started");
        if !self.system.init_simulator() {
            warn!(case = %case.name, "simulator initialization failed");
            return Ok(RunOutcome::Aborted {
                at: case.special.start_time,
            });
        }

        let sets = case.set_actions.timed();
        let gets = case.get_actions.timed();
        let continuous = case.get_actions.at(ActionTime::Continuous);

        let initial = sets.partition_point(|(t, _)| *t <= tstart);
        self.record_starts(case, &sets[..initial], tstart, results)?;

        let (mut next_set, mut next_get) = (0, 0);
        let mut time = tstart;
        let outcome = loop {
            while let Some((t, actions)) = sets.get(next_set).filter(|(t, _)| *t <= time) {
                debug!(ticks = *t, count = actions.len(), "applying set actions");
                for action in actions.iter() {
                    self.execute(&Action::Set(action.clone()), time <= tstart)?;
                }
                next_set += 1;
            }

            time += tstep;
            if time > tstop {
                break RunOutcome::Completed;
            }
            if !self.system.run_until(time) {
                let at = self.scale.to_time(time);
                warn!(case = %case.name, at, "simulation stopped before the stop time");
                break RunOutcome::Aborted { at };
            }

            while let Some((_, actions)) = gets.get(next_get).filter(|(t, _)| *t <= time) {
                for action in actions.iter() {
                    self.record(action, time, results)?;
                }
                next_get += 1;
            }
            for action in continuous {
                self.record(action, time, results)?;
            }
        };
        info!(case = %case.name, ?outcome, records = results.len(), "run finished");
        Ok(outcome)
    }

    /// Dispatch one action. Returns the values read by a get action.
    pub fn execute(&mut self, action: &Action, initial: bool) -> Result<Option<Vec<Value>>> {
        let var_type = self.registry.get(action.alias())?.var_type;
        match action {
            Action::Set(set) => {
                let ok = if initial {
                    self.system.set_initial(&set.component, var_type, &set.refs, &set.values)
                } else {
                    self.system
                        .set_variable_value(&set.component, var_type, &set.refs, &set.values)
                };
                if !ok {
                    warn!(alias = %set.alias, component = %set.component, "set action rejected by the system");
                }
                Ok(None)
            }
            Action::Get(get) => Ok(Some(self.system.get_variable_value(&get.component, var_type, &get.refs)?)),
        }
    }

    fn record(&mut self, action: &GetAction, time: i64, results: &mut Results) -> Result<()> {
        if let Some(values) = self.execute(&Action::Get(action.clone()), false)? {
            results.add(self.scale.to_time(time), &action.component, &action.alias, values);
        }
        Ok(())
    }

    /// Record the start value of every case variable that declares one,
    /// with every set batch at or before start folded in, later batches winning.
    fn record_starts(
        &self,
        case: &Case,
        initial_sets: &[(i64, &[SetAction])],
        tstart: i64,
        results: &mut Results,
    ) -> Result<()> {
        let mut starts: IndexMap<(String, String), Vec<Value>> = IndexMap::new();
        for (alias, values) in self.registry.starts() {
            for component in &self.registry.get(&alias)?.instances {
                starts.insert((component.clone(), alias.clone()), values.clone());
            }
        }
        for set in initial_sets.iter().flat_map(|(_, batch)| batch.iter()) {
            let key = (set.component.clone(), set.alias.clone());
            let Some(current) = starts.get_mut(&key) else {
                continue;
            };
            let refs = &self.registry.get(&set.alias)?.refs;
            let (_, merged) = merge_ref_values(refs, refs, current, &set.refs, &set.values)?;
            *current = merged;
        }
        let at = self.scale.to_time(tstart);
        for ((component, alias), values) in starts {
            results.add(at, &component, &alias, values);
        }
        debug!(case = %case.name, "start values recorded");
        Ok(())
    }
}
