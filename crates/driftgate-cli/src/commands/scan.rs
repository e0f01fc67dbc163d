use std::path::Path;
use std::process::ExitCode;

use driftgate_core::{GraphReport, NumericTable, Result, build_graph, scan_causal, scan_ruptures};

use super::write_report;

#[allow(clippy::too_many_arguments)]
pub fn run(
    input: &Path,
    thresholds: &[f64],
    local_ruptures: bool,
    window: usize,
    step: usize,
    delta_edges: usize,
    causal: bool,
    max_lag: usize,
    output_dir: &Path,
) -> Result<ExitCode> {
    let table = NumericTable::from_path(input)?;
    log::info!(
        "scanning {} ({} numeric columns, {} rows)",
        input.display(),
        table.columns.len(),
        table.rows
    );

    for &threshold in thresholds {
        let graph = build_graph(&table, threshold);
        let ruptures = local_ruptures
            .then(|| scan_ruptures(&table, threshold, window, step, delta_edges));
        let causal_scan = causal.then(|| scan_causal(&table, threshold, max_lag));
        let report = GraphReport::new(graph, ruptures, causal_scan);

        println!(
            "threshold {threshold:.2}: {} edge(s){}",
            report.edges.len(),
            report
                .local_ruptures
                .as_ref()
                .map(|r| format!(", {} rupture(s)", r.rupture_points.len()))
                .unwrap_or_default()
        );
        write_report(
            output_dir,
            &format!("scan_report_thr_{threshold:.2}.json"),
            &report,
        )?;
    }
    Ok(ExitCode::SUCCESS)
}
