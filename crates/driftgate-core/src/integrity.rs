//! Incoherence scoring: one auditable number for "block this batch".
//!
//! Folds the soak, stress, and drift outcomes into three normalized
//! violations (each ≥ 0), weights them, and compares the weighted sum to a
//! threshold. Weighting and score-mode strings come from configuration and
//! fail fast when malformed.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GateError, Result};
use crate::fingerprint::Fingerprint;
use crate::soak::SoakSummary;
use crate::stats::round12;
use crate::stress::EntropySummary;

/// Which soak score feeds the soak violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMode {
    P01,
    P05,
    P50,
    Mean,
    Min,
    /// Use `failed_runs / runs` directly.
    FailedRatio,
    /// p05 when trials exist, failed-runs ratio otherwise.
    Auto,
}

impl FromStr for ScoreMode {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "p01" => Ok(Self::P01),
            "p05" | "p10" => Ok(Self::P05),
            "p50" | "median" => Ok(Self::P50),
            "mean" | "mean_score" => Ok(Self::Mean),
            "min" | "min_score" => Ok(Self::Min),
            "failed_ratio" => Ok(Self::FailedRatio),
            "auto" => Ok(Self::Auto),
            other => Err(GateError::Config(format!("unknown score mode {other:?}"))),
        }
    }
}

/// Violation weights, parsed from `"w_soak,w_drift,w_stress"`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Weights {
    pub w_soak: f64,
    pub w_drift: f64,
    pub w_stress: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            w_soak: 0.3,
            w_drift: 0.4,
            w_stress: 0.3,
        }
    }
}

impl FromStr for Weights {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(GateError::Config(format!(
                "weights must be \"w_soak,w_drift,w_stress\", got {s:?}"
            )));
        }
        let parse = |p: &str| -> Result<f64> {
            p.parse::<f64>()
                .map_err(|_| GateError::Config(format!("invalid weight {p:?}")))
        };
        Ok(Self {
            w_soak: parse(parts[0])?,
            w_drift: parse(parts[1])?,
            w_stress: parse(parts[2])?,
        })
    }
}

/// Integrity check configuration.
#[derive(Debug, Clone, Copy)]
pub struct IntegrityConfig {
    /// Block when the weighted score exceeds this.
    pub threshold: f64,
    pub weights: Weights,
    pub score_mode: ScoreMode,
    /// Soak score target; scores below it violate proportionally.
    pub soak_target: f64,
    /// Entropy-variance ceiling for the stress violation.
    pub stress_var_limit: f64,
    /// Mean-shift z ceiling for the drift violation.
    pub drift_z_limit: f64,
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            threshold: 0.25,
            weights: Weights::default(),
            score_mode: ScoreMode::P05,
            soak_target: 0.10,
            stress_var_limit: 0.01,
            drift_z_limit: 3.0,
        }
    }
}

/// Gate decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Ok,
    Block,
}

/// Normalized violations, all ≥ 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violations {
    pub v_soak: f64,
    pub v_drift: f64,
    pub v_stress: f64,
}

/// Full integrity report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub threshold: f64,
    pub weights: Weights,
    pub violations: Violations,
    pub incoherence_score: f64,
    pub decision: Decision,
    /// Soak score actually used, with the mode that produced it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soak_score: Option<f64>,
    pub soak_mode: ScoreMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drift_zmax: Option<f64>,
}

fn safe_div(num: f64, den: f64) -> f64 {
    if den == 0.0 { 0.0 } else { num / den }
}

/// Pick the soak score for a mode. Returns `None` when the summary lacks a
/// usable value, in which case the failed-runs ratio applies.
fn pick_soak_score(summary: &SoakSummary, mode: ScoreMode) -> Option<(f64, ScoreMode)> {
    match mode {
        ScoreMode::P01 => Some((summary.p01, mode)),
        ScoreMode::P05 => Some((summary.p05, mode)),
        ScoreMode::P50 => Some((summary.p50, mode)),
        ScoreMode::Mean => Some((summary.mean_score, mode)),
        ScoreMode::Min => Some((summary.min_score, mode)),
        ScoreMode::FailedRatio => None,
        ScoreMode::Auto => {
            if summary.runs > 0 {
                Some((summary.p05, ScoreMode::P05))
            } else {
                None
            }
        }
    }
}

/// Largest mean-shift z across columns shared by both fingerprints, scaled
/// by the baseline std. Columns with zero baseline std are skipped.
pub fn drift_mean_zmax(baseline: &Fingerprint, current: &Fingerprint) -> f64 {
    let mut zmax = 0.0f64;
    for (col, base) in &baseline.columns {
        let Some(cur) = current.columns.get(col) else {
            continue;
        };
        if base.std <= 0.0 {
            continue;
        }
        let z = (cur.mean - base.mean).abs() / base.std;
        if z.is_finite() {
            zmax = zmax.max(z);
        }
    }
    zmax
}

/// Assess integrity from whatever outcomes are available. Missing inputs
/// contribute a zero violation.
pub fn assess(
    soak: Option<&SoakSummary>,
    stress: Option<&EntropySummary>,
    baseline: Option<&Fingerprint>,
    current: Option<&Fingerprint>,
    cfg: &IntegrityConfig,
) -> IntegrityReport {
    let mut soak_score = None;
    let mut soak_mode = cfg.score_mode;
    let v_soak = match soak {
        None => 0.0,
        Some(summary) => match pick_soak_score(summary, cfg.score_mode) {
            Some((score, mode)) => {
                soak_score = Some(round12(score));
                soak_mode = mode;
                (safe_div(cfg.soak_target - score, cfg.soak_target)).max(0.0)
            }
            None => {
                soak_mode = ScoreMode::FailedRatio;
                if summary.runs > 0 {
                    summary.failed_runs as f64 / summary.runs as f64
                } else {
                    0.0
                }
            }
        },
    };

    let v_stress = match stress {
        None => 0.0,
        Some(summary) => {
            (safe_div(
                summary.var_entropy_bits - cfg.stress_var_limit,
                cfg.stress_var_limit,
            ))
            .max(0.0)
        }
    };

    let mut drift_zmax_value = None;
    let v_drift = match (baseline, current) {
        (Some(base), Some(cur)) => {
            let zmax = drift_mean_zmax(base, cur);
            drift_zmax_value = Some(round12(zmax));
            (safe_div(zmax - cfg.drift_z_limit, cfg.drift_z_limit)).max(0.0)
        }
        _ => 0.0,
    };

    let score = cfg.weights.w_soak * v_soak
        + cfg.weights.w_drift * v_drift
        + cfg.weights.w_stress * v_stress;

    IntegrityReport {
        threshold: cfg.threshold,
        weights: cfg.weights,
        violations: Violations {
            v_soak: round12(v_soak),
            v_drift: round12(v_drift),
            v_stress: round12(v_stress),
        },
        incoherence_score: round12(score),
        decision: if score > cfg.threshold {
            Decision::Block
        } else {
            Decision::Ok
        },
        soak_score,
        soak_mode,
        drift_zmax: drift_zmax_value,
    }
}
