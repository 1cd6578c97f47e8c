//! `simx <cases> --info`: the case tree, case variables and assertions.

use simx_cases::Cases;

pub fn run(cases: &Cases) {
    print!("{}", cases.info());

    println!();
    println!("Variables:");
    for v in cases.registry().iter() {
        println!(
            "  {:<12} {} [{}] {} x {} ({}, {})",
            v.alias,
            v.model,
            v.instances.join(", "),
            v.len(),
            v.var_type,
            v.causality,
            v.variability,
        );
        if let Some(description) = &v.description {
            println!("  {:<12} {description}", "");
        }
    }

    let engine = cases.engine();
    if engine.keys().next().is_none() {
        return;
    }
    println!();
    println!("Assertions:");
    for key in engine.keys() {
        let Ok(assertion) = engine.get(key) else {
            continue;
        };
        print!("  {key}@{}: {}", assertion.temporal, assertion.expression);
        match &assertion.description {
            Some(description) => println!(" ({description})"),
            None => println!(),
        }
    }
}
