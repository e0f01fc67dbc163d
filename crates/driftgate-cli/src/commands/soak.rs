use std::fs;
use std::path::Path;
use std::process::ExitCode;

use driftgate_core::{NumericTable, Result, SoakConfig, parse_rules, run_soak};

use super::write_report;

pub fn run(
    runs: usize,
    seed: u64,
    input: Option<&Path>,
    rules_path: Option<&Path>,
    sample_rows: usize,
    output_dir: &Path,
) -> Result<ExitCode> {
    let rules_source = match rules_path {
        Some(p) if p.exists() => fs::read_to_string(p)?,
        _ => String::new(),
    };
    let rules = parse_rules(&rules_source);

    let table = match input {
        Some(p) => Some(NumericTable::from_path(p)?),
        None => None,
    };

    let outcome = run_soak(
        SoakConfig { runs, seed, sample_rows },
        table.as_ref(),
        &rules,
        &rules_source,
    );
    println!(
        "soak: {}/{} OK (seed {}), {} anomal(ies)",
        outcome.summary.ok_runs,
        outcome.summary.runs,
        outcome.summary.seed,
        outcome.summary.anomalies.len()
    );

    write_report(output_dir, "soak_report.json", &outcome.summary)?;
    write_report(output_dir, "soak_records.json", &outcome.records)?;
    Ok(ExitCode::SUCCESS)
}
