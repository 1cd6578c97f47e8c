//! `simx <cases> --run/--Run CASE`: execute cases and report assertion verdicts.

use anyhow::{Context, Result};
use simx_cases::{Cases, Dump, RunOutcome};

/// Run `name` (and with `run_subs` its sub-tree), one case at a time so that
/// each case's assertion report is printed before the next case runs.
pub fn run(cases: &mut Cases, name: &str, run_subs: bool, dump: &Dump, assert: bool) -> Result<()> {
    let id = cases.tree().by_name(name)?;
    let names: Vec<String> = if run_subs {
        cases.tree().list_names(id).into_iter().map(String::from).collect()
    } else {
        vec![name.to_string()]
    };

    let (mut passed, mut total) = (0, 0);
    for case in &names {
        let runs = cases
            .run_case(case, dump, false, assert)
            .with_context(|| format!("running case '{case}'"))?;
        for run in runs {
            match run.outcome {
                RunOutcome::Completed => {
                    println!("{}: completed, {} time points", run.case, run.results.len())
                }
                RunOutcome::Aborted { at } => {
                    println!("{}: stopped at {at} before the stop time", run.case)
                }
            }
            if let Some(path) = &run.dumped {
                println!("  results saved to {}", path.display());
            }
            if let Some([p, t]) = run.assertions {
                passed += p;
                total += t;
                let keys = cases.case_by_name(&run.case)?.asserts.clone();
                for line in cases.engine().report(Some(&keys)) {
                    println!("  {line}");
                }
            }
        }
    }
    if assert && names.len() > 1 {
        println!("{passed} of {total} assertions passed in {} cases", names.len());
    }
    Ok(())
}
