//! Dataset fingerprinting.
//!
//! A fingerprint is the per-column summary a later run is compared against:
//! count, mean, population std, min/max, median, the 5%/95% quantiles, and
//! the median absolute deviation, plus missing-cell accounting over the
//! declared header width.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::stats::{mad, mean, population_variance, quantile, round12, sorted_copy};
use crate::table::NumericTable;

/// Summary statistics for one retained numeric column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnStats {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub q05: f64,
    pub q95: f64,
    pub mad: f64,
}

/// Whole-dataset fingerprint.
///
/// `missing_rate` divides by `rows × declared_columns` — the full header
/// width, including columns later dropped as non-numeric. Downstream drift
/// decisions depend on this exact denominator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fingerprint {
    pub rows: usize,
    pub missing_cells: usize,
    pub missing_rate: f64,
    pub columns: BTreeMap<String, ColumnStats>,
}

/// Summary statistics over one column's values.
pub fn column_stats(values: &[f64]) -> ColumnStats {
    let sorted = sorted_copy(values);
    let m = mean(values);
    let var = population_variance(values, m);
    let med = quantile(&sorted, 0.5);
    ColumnStats {
        count: values.len(),
        mean: round12(m),
        std: round12(var.sqrt()),
        min: round12(sorted.first().copied().unwrap_or(0.0)),
        max: round12(sorted.last().copied().unwrap_or(0.0)),
        median: round12(med),
        q05: round12(quantile(&sorted, 0.05)),
        q95: round12(quantile(&sorted, 0.95)),
        mad: round12(mad(values, med)),
    }
}

/// Fingerprint every retained column of the table.
pub fn fingerprint(table: &NumericTable) -> Fingerprint {
    let denominator = (table.rows * table.declared_columns).max(1);
    let columns = table
        .columns
        .iter()
        .map(|(name, values)| (name.clone(), column_stats(values)))
        .collect();
    Fingerprint {
        rows: table.rows,
        missing_cells: table.missing_cells,
        missing_rate: round12(table.missing_cells as f64 / denominator as f64),
        columns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_stats_small() {
        let s = column_stats(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(s.count, 5);
        assert_eq!(s.mean, 3.0);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 5.0);
        assert_eq!(s.median, 3.0);
        assert_eq!(s.mad, 1.0);
        assert!((s.std - 2.0f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_quantiles_interpolate() {
        let s = column_stats(&[0.0, 10.0]);
        assert_eq!(s.q05, 0.5);
        assert_eq!(s.q95, 9.5);
    }

    #[test]
    fn test_missing_rate_uses_declared_columns() {
        // Header declares 3 columns; "label" is dropped as non-numeric but
        // still counts in the missing-rate denominator.
        let t = NumericTable::parse_str("a,b,label\n1,,x\n2,5,y\n3,6,\n4,7,z\n").unwrap();
        let fp = fingerprint(&t);
        assert_eq!(fp.rows, 4);
        assert_eq!(fp.missing_cells, 2);
        assert_eq!(fp.missing_rate, round12(2.0 / 12.0));
        assert_eq!(fp.columns.len(), 2);
    }

    #[test]
    fn test_fingerprint_column_keys_sorted() {
        let t = NumericTable::parse_str("z,a\n1,2\n3,4\n").unwrap();
        let fp = fingerprint(&t);
        let keys: Vec<&String> = fp.columns.keys().collect();
        assert_eq!(keys, vec!["a", "z"]);
    }

    #[test]
    fn test_fingerprint_serializes_round_trip() {
        let t = NumericTable::parse_str("a,b\n1,2\n2,4\n3,6\n").unwrap();
        let fp = fingerprint(&t);
        let json = serde_json::to_string(&fp).unwrap();
        let back: Fingerprint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fp);
    }
}
