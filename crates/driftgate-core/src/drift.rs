//! Two-sample distribution comparison and drift signal composition.
//!
//! The comparator is a Kolmogorov–Smirnov-lite test: an exact merge-walk
//! two-sample statistic with the classical asymptotic p-value series. The
//! composer folds per-column fingerprint deltas and KS results into a single
//! boolean drift flag for gating.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fingerprint::Fingerprint;
use crate::stats::{round12, sorted_copy};
use crate::table::NumericTable;

/// Default significance level for KS-based drift flagging.
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Absolute mean-delta limit above which drift is flagged. Applied
/// identically to every column regardless of scale or units.
pub const MEAN_DELTA_LIMIT: f64 = 0.05;

/// Two-sample KS result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct KsResult {
    #[serde(rename = "D")]
    pub d: f64,
    pub p_value: f64,
}

/// Two-sample Kolmogorov–Smirnov statistic with asymptotic p-value.
///
/// Either sample empty is a defined degenerate case: `D = 0, p = 1`.
pub fn ks_two_sample(x: &[f64], y: &[f64]) -> KsResult {
    if x.is_empty() || y.is_empty() {
        return KsResult { d: 0.0, p_value: 1.0 };
    }
    let x = sorted_copy(x);
    let y = sorted_copy(y);
    let nx = x.len();
    let ny = y.len();

    let mut i = 0usize;
    let mut j = 0usize;
    let mut cdf_x = 0.0;
    let mut cdf_y = 0.0;
    let mut d = 0.0f64;
    while i < nx && j < ny {
        if x[i] <= y[j] {
            i += 1;
            cdf_x = i as f64 / nx as f64;
        } else {
            j += 1;
            cdf_y = j as f64 / ny as f64;
        }
        d = d.max((cdf_x - cdf_y).abs());
    }

    let en = ((nx * ny) as f64 / (nx + ny) as f64).sqrt();
    let lambda = (en + 0.12 + 0.11 / en) * d;
    let mut s = 0.0f64;
    for k in 1..=100u32 {
        let sign = if k % 2 == 1 { 1.0 } else { -1.0 };
        let kk = (k * k) as f64;
        s += sign * (-2.0 * kk * lambda * lambda).exp();
    }
    let p = (2.0 * s).clamp(0.0, 1.0);

    KsResult {
        d: round12(d),
        p_value: round12(p),
    }
}

/// Composite drift verdict over two fingerprints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriftSignals {
    pub flag_drift: bool,
    /// Named numeric checks: `delta_mean_<col>`, `delta_median_<col>`,
    /// `delta_mad_<col>`, and when raw samples were available
    /// `ks_D_<col>` / `ks_pvalue_<col>`.
    pub checks: BTreeMap<String, f64>,
}

impl DriftSignals {
    /// Empty, unflagged signals — the no-baseline case.
    pub fn none() -> Self {
        Self {
            flag_drift: false,
            checks: BTreeMap::new(),
        }
    }
}

/// Fingerprint plus drift signals, the shape reports carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintReport {
    pub fingerprint: Fingerprint,
    pub drift_signals: DriftSignals,
}

/// Compare `current` against `baseline`.
///
/// Every column present in both fingerprints contributes mean/median/MAD
/// deltas (current minus baseline). When both raw tables are supplied, each
/// shared raw column additionally gets a KS test. The drift flag trips on
/// any KS `p < alpha` or any absolute mean delta above
/// [`MEAN_DELTA_LIMIT`].
pub fn compose_drift(
    baseline: &Fingerprint,
    current: &Fingerprint,
    baseline_table: Option<&NumericTable>,
    current_table: Option<&NumericTable>,
    alpha: f64,
) -> DriftSignals {
    let mut signals = DriftSignals::none();

    for (col, cur) in &current.columns {
        let Some(base) = baseline.columns.get(col) else {
            continue;
        };
        signals
            .checks
            .insert(format!("delta_mean_{col}"), round12(cur.mean - base.mean));
        signals.checks.insert(
            format!("delta_median_{col}"),
            round12(cur.median - base.median),
        );
        signals
            .checks
            .insert(format!("delta_mad_{col}"), round12(cur.mad - base.mad));
    }

    if let (Some(base_t), Some(cur_t)) = (baseline_table, current_table) {
        for (col, base_vals) in &base_t.columns {
            let Some(cur_vals) = cur_t.columns.get(col) else {
                continue;
            };
            let ks = ks_two_sample(base_vals, cur_vals);
            signals.checks.insert(format!("ks_D_{col}"), ks.d);
            signals.checks.insert(format!("ks_pvalue_{col}"), ks.p_value);
            if ks.p_value < alpha {
                signals.flag_drift = true;
            }
        }
    }

    for (name, value) in &signals.checks {
        if name.starts_with("delta_mean_") && value.abs() > MEAN_DELTA_LIMIT {
            signals.flag_drift = true;
        }
    }

    signals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::fingerprint;
    use crate::table::NumericTable;

    fn table(text: &str) -> NumericTable {
        NumericTable::parse_str(text).unwrap()
    }

    #[test]
    fn test_ks_identical_samples() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let r = ks_two_sample(&x, &x.clone());
        assert_eq!(r.d, 0.0);
        assert_eq!(r.p_value, 1.0);
    }

    #[test]
    fn test_ks_disjoint_samples() {
        let x: Vec<f64> = (0..50).map(|i| i as f64).collect();
        let y: Vec<f64> = (0..50).map(|i| 1000.0 + i as f64).collect();
        let r = ks_two_sample(&x, &y);
        assert_eq!(r.d, 1.0);
        assert!(r.p_value < 1e-6, "p should be near zero, got {}", r.p_value);
    }

    #[test]
    fn test_ks_empty_sample_degenerate() {
        let r = ks_two_sample(&[], &[1.0, 2.0]);
        assert_eq!(r.d, 0.0);
        assert_eq!(r.p_value, 1.0);
    }

    #[test]
    fn test_mean_shift_flags_drift_without_ks() {
        // Baseline mean 10.0, current mean 10.06: |delta| > 0.05 trips the
        // flag even with no raw samples supplied.
        let base = table("v\n9.9\n10.0\n10.1\n");
        let cur = table("v\n9.96\n10.06\n10.16\n");
        let signals = compose_drift(
            &fingerprint(&base),
            &fingerprint(&cur),
            None,
            None,
            DEFAULT_ALPHA,
        );
        let dm = signals.checks["delta_mean_v"];
        assert!((dm - 0.06).abs() < 1e-9, "delta_mean_v = {dm}");
        assert!(signals.flag_drift);
    }

    #[test]
    fn test_small_mean_shift_does_not_flag() {
        let base = table("v\n1.00\n2.00\n3.00\n");
        let cur = table("v\n1.01\n2.01\n3.01\n");
        let signals = compose_drift(
            &fingerprint(&base),
            &fingerprint(&cur),
            None,
            None,
            DEFAULT_ALPHA,
        );
        assert!(!signals.flag_drift);
        assert!(signals.checks.contains_key("delta_median_v"));
        assert!(signals.checks.contains_key("delta_mad_v"));
    }

    #[test]
    fn test_ks_pvalue_flags_drift() {
        let base_rows: String = (0..60).map(|i| format!("{}\n", i as f64 * 0.001)).collect();
        let cur_rows: String = (0..60).map(|i| format!("{}\n", 50.0 + i as f64 * 0.001)).collect();
        let base = table(&format!("v\n{base_rows}"));
        let cur = table(&format!("v\n{cur_rows}"));
        let signals = compose_drift(
            &fingerprint(&base),
            &fingerprint(&cur),
            Some(&base),
            Some(&cur),
            DEFAULT_ALPHA,
        );
        assert!(signals.flag_drift);
        assert_eq!(signals.checks["ks_D_v"], 1.0);
    }

    #[test]
    fn test_columns_only_in_one_fingerprint_skipped() {
        let base = table("a,b\n1,2\n2,3\n");
        let cur = table("a,c\n1,9\n2,8\n");
        let signals = compose_drift(
            &fingerprint(&base),
            &fingerprint(&cur),
            None,
            None,
            DEFAULT_ALPHA,
        );
        assert!(signals.checks.contains_key("delta_mean_a"));
        assert!(!signals.checks.keys().any(|k| k.ends_with("_b")));
        assert!(!signals.checks.keys().any(|k| k.ends_with("_c")));
    }
}
