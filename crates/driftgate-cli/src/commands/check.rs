use std::path::Path;
use std::process::ExitCode;

use driftgate_core::{
    Decision, EntropySummary, IntegrityConfig, NumericTable, Result, ScoreMode, SoakSummary,
    Weights, assess, fingerprint,
};

use super::{read_json, write_report};

fn load_soak(path: Option<&Path>) -> Result<Option<SoakSummary>> {
    let Some(path) = path else { return Ok(None) };
    if !path.exists() {
        log::warn!("soak report {} not found", path.display());
        return Ok(None);
    }
    Ok(serde_json::from_value(read_json(path)?).ok())
}

fn load_stress(path: Option<&Path>) -> Result<Option<EntropySummary>> {
    let Some(path) = path else { return Ok(None) };
    if !path.exists() {
        log::warn!("stress mark {} not found", path.display());
        return Ok(None);
    }
    let mark = read_json(path)?;
    Ok(mark
        .get("summary")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok()))
}

#[allow(clippy::too_many_arguments)]
pub fn run(
    soak_report: Option<&Path>,
    stress_mark: Option<&Path>,
    baseline_csv: Option<&Path>,
    current_csv: Option<&Path>,
    threshold: f64,
    weights: &str,
    mode: &str,
    soak_target: f64,
    stress_var_limit: f64,
    drift_z_limit: f64,
    output_dir: &Path,
) -> Result<ExitCode> {
    let cfg = IntegrityConfig {
        threshold,
        weights: weights.parse::<Weights>()?,
        score_mode: mode.parse::<ScoreMode>()?,
        soak_target,
        stress_var_limit,
        drift_z_limit,
    };

    let soak = load_soak(soak_report)?;
    let stress = load_stress(stress_mark)?;
    let baseline = match baseline_csv {
        Some(p) if p.exists() => Some(fingerprint(&NumericTable::from_path(p)?)),
        _ => None,
    };
    let current = match current_csv {
        Some(p) if p.exists() => Some(fingerprint(&NumericTable::from_path(p)?)),
        _ => None,
    };

    let report = assess(
        soak.as_ref(),
        stress.as_ref(),
        baseline.as_ref(),
        current.as_ref(),
        &cfg,
    );

    println!(
        "integrity: v_soak={} v_drift={} v_stress={} score={} (threshold {}) -> {:?}",
        report.violations.v_soak,
        report.violations.v_drift,
        report.violations.v_stress,
        report.incoherence_score,
        report.threshold,
        report.decision
    );
    write_report(output_dir, "integrity_report.json", &report)?;

    match report.decision {
        Decision::Ok => Ok(ExitCode::SUCCESS),
        Decision::Block => Ok(ExitCode::from(3)),
    }
}
