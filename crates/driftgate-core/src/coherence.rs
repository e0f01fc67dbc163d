//! Correlation-coherence graphs with windowed rupture detection and lagged
//! causal-edge discovery.
//!
//! A coherence graph connects every pair of columns whose absolute Pearson
//! correlation clears a threshold. Sliding the graph over the row axis and
//! differencing per-window edge counts flags structural ruptures; scanning
//! shifted copies of each ordered column pair surfaces directed lagged
//! edges.

use serde::Serialize;

use crate::stats::{pearson, round12};
use crate::table::NumericTable;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Undirected correlation edge. `a < b` lexicographically, always.
#[derive(Debug, Clone, Serialize)]
pub struct Edge {
    pub a: String,
    pub b: String,
    pub corr: f64,
}

/// Thresholded pairwise-correlation graph over the table's columns.
#[derive(Debug, Clone, Serialize)]
pub struct CoherenceGraph {
    pub nodes: Vec<String>,
    pub edges: Vec<Edge>,
    pub threshold: f64,
}

/// One window of the rupture scan, with its full edge set.
#[derive(Debug, Clone, Serialize)]
pub struct WindowSlice {
    pub start: usize,
    pub end: usize,
    pub edge_count: usize,
    pub edges: Vec<Edge>,
}

/// Per-window edge count kept in reports for audit.
#[derive(Debug, Clone, Serialize)]
pub struct WindowTrace {
    pub start: usize,
    pub end: usize,
    pub edge_count: usize,
}

/// Windowed rupture scan output.
#[derive(Debug, Clone, Serialize)]
pub struct RuptureScan {
    pub window: usize,
    pub step: usize,
    pub delta_edges_threshold: usize,
    /// Window starts where the edge-count delta met the threshold,
    /// deduplicated and ascending.
    pub rupture_points: Vec<usize>,
    pub per_window: Vec<WindowTrace>,
}

/// Directed lagged-correlation edge.
#[derive(Debug, Clone, Serialize)]
pub struct CausalEdge {
    pub from: String,
    pub to: String,
    pub lag: usize,
    pub corr: f64,
}

/// Lagged causal scan output.
#[derive(Debug, Clone, Serialize)]
pub struct CausalScan {
    pub max_lag: usize,
    pub edges: Vec<CausalEdge>,
}

/// Full graph report: the coherence graph plus conditionally-present
/// rupture and causal sub-blocks.
#[derive(Debug, Clone, Serialize)]
pub struct GraphReport {
    pub nodes: Vec<String>,
    pub edges: Vec<Edge>,
    pub threshold: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_ruptures: Option<RuptureScan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub causal_edges: Option<CausalScan>,
}

impl GraphReport {
    /// Assemble a report from a graph and its optional sub-blocks.
    pub fn new(
        graph: CoherenceGraph,
        local_ruptures: Option<RuptureScan>,
        causal_edges: Option<CausalScan>,
    ) -> Self {
        Self {
            nodes: graph.nodes,
            edges: graph.edges,
            threshold: graph.threshold,
            local_ruptures,
            causal_edges,
        }
    }
}

// ---------------------------------------------------------------------------
// Graph construction
// ---------------------------------------------------------------------------

/// Edges between all column pairs of `cols` restricted to rows
/// `start..end`, thresholded on absolute correlation.
fn edges_in_range(
    names: &[&str],
    table: &NumericTable,
    threshold: f64,
    start: usize,
    end: usize,
) -> Vec<Edge> {
    let mut edges = Vec::new();
    for i in 0..names.len() {
        for j in (i + 1)..names.len() {
            let x = &table.columns[names[i]];
            let y = &table.columns[names[j]];
            let x = &x[start.min(x.len())..end.min(x.len())];
            let y = &y[start.min(y.len())..end.min(y.len())];
            let raw = pearson(x, y);
            if raw.abs() >= threshold {
                edges.push(Edge {
                    a: names[i].to_string(),
                    b: names[j].to_string(),
                    corr: round12(raw),
                });
            }
        }
    }
    edges
}

/// Build the coherence graph over full columns.
pub fn build_graph(table: &NumericTable, threshold: f64) -> CoherenceGraph {
    let names = table.names();
    let edges = edges_in_range(&names, table, threshold, 0, usize::MAX);
    CoherenceGraph {
        nodes: names.into_iter().map(str::to_string).collect(),
        edges,
        threshold,
    }
}

// ---------------------------------------------------------------------------
// Windowed rupture detection
// ---------------------------------------------------------------------------

/// Rebuild the graph per row window.
///
/// `window < 2` defaults to `min(50, len)`; `step < 1` defaults to the
/// window. Windows start at `0, step, 2·step, …`; at least one window is
/// produced even when the window exceeds the data, and each window's `end`
/// is clamped to the common column length.
pub fn windowed_edges(
    table: &NumericTable,
    threshold: f64,
    window: usize,
    step: usize,
) -> Vec<WindowSlice> {
    let names = table.names();
    let length = table.min_len();
    let mut out = Vec::new();
    if length < 2 {
        return out;
    }

    let window = if window < 2 { 50.min(length) } else { window };
    let step = if step < 1 { window } else { step };

    let last_start = (length + 1).saturating_sub(window).max(1);
    let mut start = 0usize;
    while start < last_start {
        let end = start + window;
        let edges = edges_in_range(&names, table, threshold, start, end);
        out.push(WindowSlice {
            start,
            end: end.min(length),
            edge_count: edges.len(),
            edges,
        });
        start += step;
    }
    out
}

/// Flag window starts whose edge-count delta against the previous window
/// meets `delta_threshold`. Output is deduplicated and sorted ascending.
pub fn detect_ruptures(per_window: &[WindowSlice], delta_threshold: usize) -> Vec<usize> {
    let mut points = Vec::new();
    let Some(first) = per_window.first() else {
        return points;
    };
    let mut prev = first.edge_count;
    for w in &per_window[1..] {
        let delta = w.edge_count.abs_diff(prev);
        if delta >= delta_threshold {
            points.push(w.start);
        }
        prev = w.edge_count;
    }
    points.sort_unstable();
    points.dedup();
    points
}

/// Run the full windowed scan and package it for reports.
pub fn scan_ruptures(
    table: &NumericTable,
    threshold: f64,
    window: usize,
    step: usize,
    delta_threshold: usize,
) -> RuptureScan {
    let per_window = windowed_edges(table, threshold, window, step);
    let rupture_points = detect_ruptures(&per_window, delta_threshold);
    RuptureScan {
        window,
        step,
        delta_edges_threshold: delta_threshold,
        rupture_points,
        per_window: per_window
            .into_iter()
            .map(|w| WindowTrace {
                start: w.start,
                end: w.end,
                edge_count: w.edge_count,
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Lagged causal edges
// ---------------------------------------------------------------------------

/// Directed lagged-correlation edges for every ordered column pair.
///
/// For each pair `(src, dst)` the lag in `1..=max_lag` with the largest
/// absolute correlation between `src[..len-lag]` and `dst[lag..]` wins;
/// ties keep the lowest lag. An edge is emitted when the winning absolute
/// correlation clears the threshold. Fewer than three common rows yields no
/// edges.
pub fn lagged_causal_edges(
    table: &NumericTable,
    threshold: f64,
    max_lag: usize,
) -> Vec<CausalEdge> {
    let names = table.names();
    let length = table.min_len();
    let mut edges = Vec::new();
    if length < 3 {
        return edges;
    }
    let max_lag = max_lag.max(1);

    for &src in &names {
        for &dst in &names {
            if src == dst {
                continue;
            }
            let sx = &table.columns[src];
            let sy = &table.columns[dst];
            let mut best = 0.0f64;
            let mut best_lag = 1usize;
            for lag in 1..=max_lag {
                if lag >= length {
                    break;
                }
                let x = &sx[..(length - lag).min(sx.len())];
                let y = &sy[lag.min(sy.len())..length.min(sy.len())];
                let r = pearson(x, y);
                if r.abs() > best.abs() {
                    best = r;
                    best_lag = lag;
                }
            }
            if best.abs() >= threshold {
                edges.push(CausalEdge {
                    from: src.to_string(),
                    to: dst.to_string(),
                    lag: best_lag,
                    corr: round12(best),
                });
            }
        }
    }
    edges
}

/// Run the causal scan and package it for reports.
pub fn scan_causal(table: &NumericTable, threshold: f64, max_lag: usize) -> CausalScan {
    CausalScan {
        max_lag: max_lag.max(1),
        edges: lagged_causal_edges(table, threshold, max_lag),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(text: &str) -> NumericTable {
        NumericTable::parse_str(text).unwrap()
    }

    #[test]
    fn test_perfect_correlation_edge() {
        let t = table("A,B\n1,2\n2,4\n3,6\n4,8\n5,10\n");
        let g = build_graph(&t, 0.5);
        assert_eq!(g.edges.len(), 1);
        assert_eq!(g.edges[0].a, "A");
        assert_eq!(g.edges[0].b, "B");
        assert!((g.edges[0].corr - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_self_edges_one_per_pair() {
        let t = table("a,b,c\n1,2,3\n2,3,1\n3,1,2\n4,4,4\n");
        let g = build_graph(&t, 0.0);
        for e in &g.edges {
            assert_ne!(e.a, e.b);
            assert!(e.a < e.b, "edge not ordered: {} {}", e.a, e.b);
        }
        // n*(n-1)/2 pairs at threshold 0, at most one edge each.
        assert!(g.edges.len() <= 3);
        let mut pairs: Vec<(String, String)> =
            g.edges.iter().map(|e| (e.a.clone(), e.b.clone())).collect();
        pairs.sort();
        pairs.dedup();
        assert_eq!(pairs.len(), g.edges.len());
    }

    #[test]
    fn test_zero_variance_column_never_edges() {
        let t = table("flat,ramp\n5,1\n5,2\n5,3\n5,4\n");
        let g = build_graph(&t, 0.1);
        assert!(g.edges.is_empty());
    }

    #[test]
    fn test_windowed_defaults_and_clamping() {
        let rows: String = (0..10).map(|i| format!("{i},{}\n", i * 2)).collect();
        let t = table(&format!("x,y\n{rows}"));
        // window < 2 defaults to min(50, len) = 10: a single window.
        let w = windowed_edges(&t, 0.5, 0, 0);
        assert_eq!(w.len(), 1);
        assert_eq!(w[0].start, 0);
        assert_eq!(w[0].end, 10);
        assert_eq!(w[0].edge_count, 1);
    }

    #[test]
    fn test_window_larger_than_data_still_scans_once() {
        let t = table("x,y\n1,2\n2,4\n3,6\n");
        let w = windowed_edges(&t, 0.5, 100, 10);
        assert_eq!(w.len(), 1);
        assert_eq!(w[0].end, 3);
    }

    #[test]
    fn test_window_steps() {
        let rows: String = (0..12).map(|i| format!("{i},{}\n", 12 - i)).collect();
        let t = table(&format!("x,y\n{rows}"));
        let w = windowed_edges(&t, 0.0, 4, 4);
        let starts: Vec<usize> = w.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![0, 4, 8]);
    }

    #[test]
    fn test_constant_edge_counts_no_ruptures() {
        let rows: String = (0..40).map(|i| format!("{i},{}\n", i * 3)).collect();
        let t = table(&format!("x,y\n{rows}"));
        let w = windowed_edges(&t, 0.5, 10, 10);
        assert!(w.len() > 1);
        let counts: Vec<usize> = w.iter().map(|s| s.edge_count).collect();
        assert!(counts.windows(2).all(|p| p[0] == p[1]));
        assert!(detect_ruptures(&w, 1).is_empty());
    }

    #[test]
    fn test_rupture_detected_on_regime_change() {
        // Correlated for 20 rows, then y flattens: the pairwise edge drops.
        let mut rows = String::new();
        for i in 0..20 {
            rows.push_str(&format!("{i},{}\n", i * 2));
        }
        for i in 20..40 {
            rows.push_str(&format!("{i},7\n"));
        }
        let t = table(&format!("x,y\n{rows}"));
        let scan = scan_ruptures(&t, 0.5, 10, 10, 1);
        assert!(!scan.rupture_points.is_empty());
        assert!(scan.rupture_points.iter().all(|&p| p >= 10));
    }

    #[test]
    fn test_causal_lag_one() {
        // B[t] = A[t-1]: a perfect lag-1 directed edge A -> B.
        let mut rows = String::new();
        for t in 0..10 {
            rows.push_str(&format!("{},{}\n", t + 1, t));
        }
        let t = table(&format!("A,B\n{rows}"));
        let edges = lagged_causal_edges(&t, 0.9, 3);
        let ab = edges
            .iter()
            .find(|e| e.from == "A" && e.to == "B")
            .expect("A->B edge");
        assert_eq!(ab.lag, 1);
        assert!((ab.corr - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_causal_requires_three_rows() {
        let t = table("A,B\n1,2\n2,3\n");
        assert!(lagged_causal_edges(&t, 0.0, 3).is_empty());
    }

    #[test]
    fn test_causal_tie_keeps_lowest_lag() {
        // A strictly-greater comparison never replaces an equal best.
        let t = table("A,B\n1,1\n2,2\n3,3\n4,4\n5,5\n6,6\n");
        let edges = lagged_causal_edges(&t, 0.9, 3);
        for e in edges {
            assert_eq!(e.lag, 1, "{} -> {} picked lag {}", e.from, e.to, e.lag);
        }
    }

    #[test]
    fn test_graph_report_optional_blocks_absent() {
        let t = table("x,y\n1,2\n2,4\n3,6\n");
        let report = GraphReport::new(build_graph(&t, 0.5), None, None);
        let json = serde_json::to_string(&report).unwrap();
        assert!(!json.contains("local_ruptures"));
        assert!(!json.contains("causal_edges"));
    }

    #[test]
    fn test_graph_report_optional_blocks_present() {
        let t = table("x,y\n1,2\n2,4\n3,6\n4,8\n");
        let report = GraphReport::new(
            build_graph(&t, 0.5),
            Some(scan_ruptures(&t, 0.5, 2, 2, 1)),
            Some(scan_causal(&t, 0.5, 2)),
        );
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("local_ruptures"));
        assert!(json.contains("causal_edges"));
    }
}
