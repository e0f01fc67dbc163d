//! Deterministic mass-soak runner.
//!
//! Runs `runs` trials off a single seeded generator. Each trial draws a
//! uniform score in `[0, 1)` and passes when it clears the failure floor.
//! In data-aware mode a trial additionally samples a random contiguous row
//! window from the table, builds the per-window statistics environment, and
//! evaluates the rule set against it; violations are collected as
//! anomalies.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::fingerprint::column_stats;
use crate::rules::{Env, Rule, RuleViolation, Value, evaluate_rules};
use crate::stats::{quantile, round12, sorted_copy};
use crate::stress::{derive_seed, sha256_hex};
use crate::table::NumericTable;

/// Scores below this floor fail a trial.
pub const FAIL_FLOOR: f64 = 0.01;

/// Anomalies kept in the summary.
const ANOMALY_CAP: usize = 1000;

/// Soak configuration.
#[derive(Debug, Clone, Copy)]
pub struct SoakConfig {
    pub runs: usize,
    /// Seed; 0 derives a seed from the rule-file source text.
    pub seed: u64,
    /// Rows per data-aware sample window.
    pub sample_rows: usize,
}

impl Default for SoakConfig {
    fn default() -> Self {
        Self {
            runs: 100,
            seed: 0,
            sample_rows: 50,
        }
    }
}

/// One soak trial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoakRecord {
    pub run_index: usize,
    pub passed: bool,
    pub score: f64,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub violations: Vec<RuleViolation>,
}

/// Rule violations observed in one trial's sample window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoakAnomaly {
    pub run_index: usize,
    pub window_start: usize,
    pub window_end: usize,
    pub violations: Vec<RuleViolation>,
}

/// Aggregate soak outcome. Score quantiles feed the integrity scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoakSummary {
    pub runs: usize,
    pub ok_runs: usize,
    pub failed_runs: usize,
    pub seed: u64,
    pub min_score: f64,
    pub mean_score: f64,
    pub p01: f64,
    pub p05: f64,
    pub p50: f64,
    pub max_score: f64,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub anomalies: Vec<SoakAnomaly>,
}

/// Full soak output: per-trial records plus the summary.
#[derive(Debug, Clone, Serialize)]
pub struct SoakOutcome {
    pub records: Vec<SoakRecord>,
    pub summary: SoakSummary,
}

/// Per-window statistics environment for rule evaluation: `count`,
/// `missing_rate`, and `mean_/std_/min_/max_/median_/mad_<col>` keys.
pub fn window_env(table: &NumericTable, start: usize, end: usize) -> Env {
    let mut env = Env::new();
    env.insert("count".to_string(), Value::Num((end - start) as f64));
    env.insert("missing_rate".to_string(), Value::Num(0.0));
    for (name, values) in &table.columns {
        let slice = &values[start.min(values.len())..end.min(values.len())];
        let stats = column_stats(slice);
        env.insert(format!("mean_{name}"), Value::Num(stats.mean));
        env.insert(format!("std_{name}"), Value::Num(stats.std));
        env.insert(format!("min_{name}"), Value::Num(stats.min));
        env.insert(format!("max_{name}"), Value::Num(stats.max));
        env.insert(format!("median_{name}"), Value::Num(stats.median));
        env.insert(format!("mad_{name}"), Value::Num(stats.mad));
    }
    env
}

/// Run the soak. The generator is seeded once (from `cfg.seed`, or from the
/// rule source text when the seed is 0) and advanced sequentially across
/// all trials, data-aware sampling included.
pub fn run_soak(
    cfg: SoakConfig,
    table: Option<&NumericTable>,
    rules: &[Rule],
    rules_source: &str,
) -> SoakOutcome {
    let seed = if cfg.seed == 0 {
        derive_seed(&sha256_hex(rules_source.as_bytes()))
    } else {
        cfg.seed
    };
    let mut rng = StdRng::seed_from_u64(seed);

    let mut records = Vec::with_capacity(cfg.runs);
    let mut anomalies = Vec::new();
    let mut scores = Vec::with_capacity(cfg.runs);
    let mut ok_runs = 0usize;

    for run_index in 0..cfg.runs {
        let score = rng.random::<f64>();
        let passed = score >= FAIL_FLOOR;
        scores.push(score);
        if passed {
            ok_runs += 1;
        }

        let mut violations = Vec::new();
        if let Some(table) = table {
            let length = table.min_len();
            let sample_rows = cfg.sample_rows.max(2).min(length);
            if sample_rows >= 2 {
                let last_start = (length - sample_rows) + 1;
                let start = rng.random_range(0..last_start.max(1));
                let end = start + sample_rows;
                let env = window_env(table, start, end);
                violations = evaluate_rules(rules, &env);
                if !violations.is_empty() && anomalies.len() < ANOMALY_CAP {
                    anomalies.push(SoakAnomaly {
                        run_index,
                        window_start: start,
                        window_end: end,
                        violations: violations.clone(),
                    });
                }
            }
        }

        records.push(SoakRecord {
            run_index,
            passed,
            score: round12(score),
            violations,
        });
    }

    let sorted = sorted_copy(&scores);
    let mean = crate::stats::mean(&scores);
    let summary = SoakSummary {
        runs: cfg.runs,
        ok_runs,
        failed_runs: cfg.runs - ok_runs,
        seed,
        min_score: round12(sorted.first().copied().unwrap_or(0.0)),
        mean_score: round12(mean),
        p01: round12(quantile(&sorted, 0.01)),
        p05: round12(quantile(&sorted, 0.05)),
        p50: round12(quantile(&sorted, 0.5)),
        max_score: round12(sorted.last().copied().unwrap_or(0.0)),
        anomalies,
    };

    SoakOutcome { records, summary }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::parse_rules;

    #[test]
    fn test_soak_deterministic_for_same_seed() {
        let cfg = SoakConfig { runs: 50, seed: 11, sample_rows: 5 };
        let a = run_soak(cfg, None, &[], "");
        let b = run_soak(cfg, None, &[], "");
        let sa: Vec<f64> = a.records.iter().map(|r| r.score).collect();
        let sb: Vec<f64> = b.records.iter().map(|r| r.score).collect();
        assert_eq!(sa, sb);
        assert_eq!(a.summary.ok_runs, b.summary.ok_runs);
    }

    #[test]
    fn test_soak_zero_seed_derived_from_rules_text() {
        let out = run_soak(SoakConfig { runs: 1, seed: 0, sample_rows: 5 }, None, &[], "r: 1 < 2\n");
        assert_eq!(
            out.summary.seed,
            derive_seed(&sha256_hex(b"r: 1 < 2\n"))
        );
    }

    #[test]
    fn test_soak_counts_add_up() {
        let out = run_soak(SoakConfig { runs: 200, seed: 3, sample_rows: 5 }, None, &[], "");
        assert_eq!(out.summary.runs, 200);
        assert_eq!(out.summary.ok_runs + out.summary.failed_runs, 200);
        assert_eq!(out.records.len(), 200);
        assert!(out.summary.min_score <= out.summary.p05);
        assert!(out.summary.p05 <= out.summary.p50);
        assert!(out.summary.p50 <= out.summary.max_score);
    }

    #[test]
    fn test_data_aware_rule_violations_recorded() {
        let rows: String = (0..20).map(|i| format!("{i}\n")).collect();
        let table = NumericTable::parse_str(&format!("x\n{rows}")).unwrap();
        let rules = parse_rules("never_negative: min_x >= 0\nimpossible: mean_x > 1000\n");
        let cfg = SoakConfig { runs: 10, seed: 5, sample_rows: 4 };
        let out = run_soak(cfg, Some(&table), &rules, "");
        // `impossible` violates in every window; `never_negative` never does.
        assert_eq!(out.summary.anomalies.len(), 10);
        for anomaly in &out.summary.anomalies {
            assert_eq!(anomaly.violations.len(), 1);
            assert_eq!(anomaly.violations[0].rule, "impossible");
            assert!(anomaly.window_end - anomaly.window_start == 4);
        }
    }

    #[test]
    fn test_window_env_keys() {
        let table = NumericTable::parse_str("a,b\n1,5\n2,6\n3,7\n4,8\n").unwrap();
        let env = window_env(&table, 0, 4);
        assert_eq!(env["count"], Value::Num(4.0));
        assert_eq!(env["mean_a"], Value::Num(2.5));
        assert_eq!(env["min_b"], Value::Num(5.0));
        assert_eq!(env["max_b"], Value::Num(8.0));
        assert!(env.contains_key("median_a"));
        assert!(env.contains_key("mad_b"));
        assert!(env.contains_key("std_a"));
        assert!(env.contains_key("missing_rate"));
    }

    #[test]
    fn test_sample_rows_clamped_to_table() {
        let table = NumericTable::parse_str("x\n1\n2\n3\n").unwrap();
        let cfg = SoakConfig { runs: 5, seed: 2, sample_rows: 100 };
        let out = run_soak(cfg, Some(&table), &parse_rules("ok: count >= 2\n"), "");
        assert!(out.summary.anomalies.is_empty());
        for r in &out.records {
            assert!(r.violations.is_empty());
        }
    }
}
