use std::path::{Path, PathBuf};
use std::process::ExitCode;

use driftgate_core::{
    DriftSignals, Fingerprint, FingerprintReport, NumericTable, Result, compose_drift, fingerprint,
};

use super::{read_json, write_report};

/// Baseline pulled out of a previous mark report: the stored fingerprint
/// and, when recorded, the table it was computed from.
pub fn load_baseline(mark_path: &Path) -> Result<(Option<Fingerprint>, Option<PathBuf>)> {
    let mark = read_json(mark_path)?;
    let fp = mark
        .get("fingerprint")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok());
    let source = mark
        .get("fingerprint_source")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    Ok((fp, source))
}

/// Drift signals for `current` against a baseline mark, when one resolves.
pub fn drift_against_mark(
    current_table: &NumericTable,
    current_fp: &Fingerprint,
    baseline_mark: Option<&Path>,
    alpha: f64,
) -> Result<DriftSignals> {
    let Some(mark_path) = baseline_mark else {
        return Ok(DriftSignals::none());
    };
    if !mark_path.exists() {
        log::warn!("baseline mark {} not found; skipping drift", mark_path.display());
        return Ok(DriftSignals::none());
    }
    let (base_fp, base_source) = load_baseline(mark_path)?;
    let Some(base_fp) = base_fp else {
        log::warn!("baseline mark {} carries no fingerprint", mark_path.display());
        return Ok(DriftSignals::none());
    };
    let base_table = match base_source {
        Some(ref p) if p.exists() => Some(NumericTable::from_path(p)?),
        _ => None,
    };
    Ok(compose_drift(
        &base_fp,
        current_fp,
        base_table.as_ref(),
        Some(current_table),
        alpha,
    ))
}

pub fn run(
    input: &Path,
    baseline_mark: Option<&Path>,
    alpha: f64,
    output_dir: &Path,
) -> Result<ExitCode> {
    let table = NumericTable::from_path(input)?;
    let fp = fingerprint(&table);
    let drift_signals = drift_against_mark(&table, &fp, baseline_mark, alpha)?;

    println!(
        "fingerprint: {} column(s), {} row(s), missing_rate {}",
        fp.columns.len(),
        fp.rows,
        fp.missing_rate
    );
    if drift_signals.flag_drift {
        println!("drift flagged ({} check(s))", drift_signals.checks.len());
    }

    let report = FingerprintReport {
        fingerprint: fp,
        drift_signals,
    };
    write_report(output_dir, "fingerprint.json", &report)?;
    Ok(ExitCode::SUCCESS)
}
