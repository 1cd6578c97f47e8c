//! `simx --inspect RESULTS`: summary or selected columns of a saved results file.

use std::path::Path;

use anyhow::{Context, Result};
use simx_cases::Cases;

pub fn run(path: &Path, fields: &[String], json: bool) -> Result<()> {
    let (cases, results) = Cases::results_from_file(path)
        .with_context(|| format!("opening results {}", path.display()))?;
    let header = results.header();

    if !fields.is_empty() {
        let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
        let rows = results.retrieve_str(&fields)?;
        println!("time\t{}", fields.join("\t"));
        for row in rows {
            let values: Vec<String> = row.values.iter().map(ToString::to_string).collect();
            println!("{}\t{}", row.time, values.join("\t"));
        }
        return Ok(());
    }

    let summary = results.inspect(cases.registry(), None, None)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    println!(
        "Results of case '{}' from {} ({}), {} time points",
        header.case,
        header.cases,
        header.date_time.to_rfc3339(),
        results.len()
    );
    for (ident, inspection) in &summary {
        println!(
            "  {ident:<20} {:>6} samples in [{}, {}] {}",
            inspection.len, inspection.range[0], inspection.range[1], header.time_unit
        );
    }
    Ok(())
}
