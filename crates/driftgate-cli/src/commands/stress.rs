use std::path::Path;
use std::process::ExitCode;

use driftgate_core::{
    LedgerEntry, NumericTable, Result, StressConfig, StressMark, fingerprint, ledger,
    read_target_bytes, run_stress,
};

use super::{fingerprint::drift_against_mark, write_report};

#[allow(clippy::too_many_arguments)]
pub fn run(
    target: &Path,
    runs: usize,
    noise: f64,
    seed: u64,
    fingerprint_csv: Option<&Path>,
    baseline_mark: Option<&Path>,
    alpha: f64,
    ledger_path: Option<&Path>,
    output_dir: &Path,
) -> Result<ExitCode> {
    let base = read_target_bytes(target)?;
    log::info!("stress target {} ({} base bytes)", target.display(), base.len());

    let outcome = run_stress(&base, StressConfig { runs, noise, seed });
    println!(
        "stress: {} run(s), mean entropy {} bits, var {}",
        outcome.summary.count,
        outcome.summary.mean_entropy_bits,
        outcome.summary.var_entropy_bits
    );

    let mut mark = StressMark::new(target, &outcome, runs);
    if let Some(csv) = fingerprint_csv {
        if csv.exists() {
            let table = NumericTable::from_path(csv)?;
            let fp = fingerprint(&table);
            let signals = drift_against_mark(&table, &fp, baseline_mark, alpha)?;
            mark = mark.with_fingerprint(fp, signals, csv.display().to_string());
        } else {
            log::warn!("fingerprint table {} not found", csv.display());
        }
    }

    write_report(output_dir, "stress_mark.json", &mark)?;
    write_report(output_dir, "stress_records.json", &outcome.records)?;

    if let Some(path) = ledger_path {
        let entry = LedgerEntry {
            base_sha256: outcome.base_sha256.clone(),
            fingerprint_path: Some(output_dir.join("stress_mark.json").display().to_string()),
            flag_drift: mark
                .drift_signals
                .as_ref()
                .map(|s| s.flag_drift)
                .unwrap_or(false),
            source_path: mark.fingerprint_source.clone(),
        };
        let history = ledger::append(path, entry)?;
        println!("ledger: {} entr(ies) at {}", history.len(), path.display());
    }

    Ok(ExitCode::SUCCESS)
}
