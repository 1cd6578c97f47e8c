//! simx CLI: inspect, run and assert co-simulation test cases.

mod commands;

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{ArgAction, Parser};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use simx_cases::{Cases, Dump};

#[derive(Parser, Debug)]
#[command(name = "simx", version, about = "Run co-simulation test cases")]
struct Cli {
    /// Cases document (JSON, or TOML by extension)
    #[arg(required_unless_present = "inspect")]
    cases: Option<PathBuf>,

    /// Print the cases, their variables and assertions
    #[arg(long)]
    info: bool,

    /// Run a single case
    #[arg(long, value_name = "CASE")]
    run: Option<String>,

    /// Run a case and all its sub-cases
    #[arg(long = "Run", value_name = "CASE", conflicts_with = "run")]
    run_all: Option<String>,

    /// Evaluate the assertions of every case that is run
    #[arg(long)]
    assert: bool,

    /// Keep results in memory instead of saving them
    #[arg(long, conflicts_with = "dump")]
    no_dump: bool,

    /// Save results to FILE instead of `<case>.json`
    #[arg(long, value_name = "FILE")]
    dump: Option<PathBuf>,

    /// Summarize a saved results file
    #[arg(long, value_name = "RESULTS", conflicts_with_all = ["run", "run_all"])]
    inspect: Option<PathBuf>,

    /// With --inspect: print the joined rows of these `component.variable[element]` fields
    #[arg(long = "field", value_name = "FIELD", requires = "inspect")]
    fields: Vec<String>,

    /// With --inspect: print the summary as JSON
    #[arg(long, requires = "inspect")]
    json: bool,

    /// More log output (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(results) = &cli.inspect {
        return commands::inspect::run(results, &cli.fields, cli.json);
    }

    let path = cli.cases.context("no cases file given")?;
    let mut cases =
        Cases::load(&path).with_context(|| format!("loading cases {}", path.display()))?;

    let target = match (cli.run, cli.run_all) {
        (Some(name), _) => Some((name, false)),
        (None, Some(name)) => Some((name, true)),
        (None, None) => None,
    };
    if cli.info || target.is_none() {
        commands::info::run(&cases);
    }

    if let Some((name, run_subs)) = target {
        let dump = match cli.dump {
            _ if cli.no_dump => Dump::Skip,
            Some(file) => Dump::To(file),
            None => Dump::Default,
        };
        commands::run::run(&mut cases, &name, run_subs, &dump, cli.assert)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn arguments_are_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_flags() {
        let cli = Cli::try_parse_from(["simx", "cases.json", "--Run", "base", "--assert", "-vv"])
            .expect("valid arguments");
        assert_eq!(cli.run_all.as_deref(), Some("base"));
        assert!(cli.run.is_none());
        assert!(cli.assert);
        assert_eq!(cli.verbose, 2);

        assert!(Cli::try_parse_from(["simx", "c.json", "--run", "a", "--Run", "b"]).is_err());
        assert!(Cli::try_parse_from(["simx", "c.json", "--no-dump", "--dump", "x"]).is_err());
        assert!(Cli::try_parse_from(["simx"]).is_err());
    }

    #[test]
    fn inspect_needs_no_cases_file() {
        let cli = Cli::try_parse_from(["simx", "--inspect", "base.json", "--field", "bb.h"])
            .expect("valid arguments");
        assert!(cli.cases.is_none());
        assert_eq!(cli.fields, ["bb.h"]);
        assert!(Cli::try_parse_from(["simx", "c.json", "--field", "bb.h"]).is_err());
    }
}
