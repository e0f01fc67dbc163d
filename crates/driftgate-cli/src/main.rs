//! CLI for driftgate — a statistical drift and integrity gate for data
//! pipelines.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "driftgate")]
#[command(about = "driftgate — statistical drift and integrity gate for data pipelines")]
#[command(version = driftgate_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build coherence graphs over a dataset, one report per threshold.
    Scan {
        /// Input table (comma-delimited, header-tagged)
        #[arg(long)]
        input: PathBuf,

        /// Correlation thresholds, one report each
        #[arg(long, num_args = 1.., default_values_t = [0.25, 0.5, 0.7, 0.8])]
        thresholds: Vec<f64>,

        /// Include the windowed rupture scan
        #[arg(long)]
        local_ruptures: bool,

        /// Rupture window size (rows)
        #[arg(long, default_value_t = 100)]
        window: usize,

        /// Rupture window step (rows)
        #[arg(long, default_value_t = 100)]
        step: usize,

        /// Edge-count delta that flags a rupture
        #[arg(long, default_value_t = 1)]
        delta_edges: usize,

        /// Include directed lagged causal edges
        #[arg(long)]
        causal: bool,

        /// Maximum lag scanned for causal edges
        #[arg(long, default_value_t = 3)]
        max_lag: usize,

        #[arg(long, default_value = "out/scan")]
        output_dir: PathBuf,
    },

    /// Fingerprint a dataset and compare it against a baseline mark.
    Fingerprint {
        /// Input table to fingerprint
        #[arg(long)]
        input: PathBuf,

        /// Baseline mark JSON (from a previous stress/fingerprint run)
        #[arg(long)]
        baseline_mark: Option<PathBuf>,

        /// KS significance level
        #[arg(long, default_value_t = 0.05)]
        alpha: f64,

        #[arg(long, default_value = "out/fingerprint")]
        output_dir: PathBuf,
    },

    /// Bit-flip stress test over a file or directory target.
    Stress {
        /// Target file or directory
        #[arg(long)]
        target: PathBuf,

        /// Number of trials
        #[arg(long, default_value_t = 200)]
        runs: usize,

        /// Per-byte bit-flip probability
        #[arg(long, default_value_t = 0.05)]
        noise: f64,

        /// RNG seed; 0 derives one from the target content
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Also fingerprint this table and embed it in the mark
        #[arg(long)]
        fingerprint_csv: Option<PathBuf>,

        /// Baseline mark for drift comparison of the fingerprint
        #[arg(long)]
        baseline_mark: Option<PathBuf>,

        /// KS significance level
        #[arg(long, default_value_t = 0.05)]
        alpha: f64,

        /// Append the outcome to this ledger file
        #[arg(long)]
        ledger: Option<PathBuf>,

        #[arg(long, default_value = "out/stress")]
        output_dir: PathBuf,
    },

    /// Deterministic mass-soak with optional data-aware rule checks.
    Soak {
        /// Number of trials
        #[arg(long, default_value_t = 100)]
        runs: usize,

        /// RNG seed; 0 derives one from the rules file
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Table for data-aware window checks
        #[arg(long)]
        input: Option<PathBuf>,

        /// Rule file (`name: expression` lines)
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Rows per sampled window
        #[arg(long, default_value_t = 50)]
        sample_rows: usize,

        #[arg(long, default_value = "out/soak")]
        output_dir: PathBuf,
    },

    /// Fold soak/stress/drift outcomes into one Block/Ok decision.
    Check {
        /// Soak report JSON (from `driftgate soak`)
        #[arg(long)]
        soak_report: Option<PathBuf>,

        /// Stress mark JSON (from `driftgate stress`)
        #[arg(long)]
        stress_mark: Option<PathBuf>,

        /// Baseline table for mean-shift drift
        #[arg(long)]
        baseline_csv: Option<PathBuf>,

        /// Current table for mean-shift drift
        #[arg(long)]
        current_csv: Option<PathBuf>,

        /// Block when the weighted score exceeds this
        #[arg(long, default_value_t = 0.25)]
        threshold: f64,

        /// Violation weights as "w_soak,w_drift,w_stress"
        #[arg(long, default_value = "0.3,0.4,0.3")]
        weights: String,

        /// Soak score mode: p01|p05|p50|mean|min|failed_ratio|auto
        #[arg(long, default_value = "p05")]
        mode: String,

        /// Soak score target
        #[arg(long, default_value_t = 0.10)]
        soak_target: f64,

        /// Entropy-variance ceiling for the stress violation
        #[arg(long, default_value_t = 0.01)]
        stress_var_limit: f64,

        /// Mean-shift z ceiling for the drift violation
        #[arg(long, default_value_t = 3.0)]
        drift_z_limit: f64,

        #[arg(long, default_value = "out/check")]
        output_dir: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Scan {
            input,
            thresholds,
            local_ruptures,
            window,
            step,
            delta_edges,
            causal,
            max_lag,
            output_dir,
        } => commands::scan::run(
            &input,
            &thresholds,
            local_ruptures,
            window,
            step,
            delta_edges,
            causal,
            max_lag,
            &output_dir,
        ),
        Commands::Fingerprint {
            input,
            baseline_mark,
            alpha,
            output_dir,
        } => commands::fingerprint::run(&input, baseline_mark.as_deref(), alpha, &output_dir),
        Commands::Stress {
            target,
            runs,
            noise,
            seed,
            fingerprint_csv,
            baseline_mark,
            alpha,
            ledger,
            output_dir,
        } => commands::stress::run(
            &target,
            runs,
            noise,
            seed,
            fingerprint_csv.as_deref(),
            baseline_mark.as_deref(),
            alpha,
            ledger.as_deref(),
            &output_dir,
        ),
        Commands::Soak {
            runs,
            seed,
            input,
            rules,
            sample_rows,
            output_dir,
        } => commands::soak::run(
            runs,
            seed,
            input.as_deref(),
            rules.as_deref(),
            sample_rows,
            &output_dir,
        ),
        Commands::Check {
            soak_report,
            stress_mark,
            baseline_csv,
            current_csv,
            threshold,
            weights,
            mode,
            soak_target,
            stress_var_limit,
            drift_z_limit,
            output_dir,
        } => commands::check::run(
            soak_report.as_deref(),
            stress_mark.as_deref(),
            baseline_csv.as_deref(),
            current_csv.as_deref(),
            threshold,
            &weights,
            &mode,
            soak_target,
            stress_var_limit,
            drift_z_limit,
            &output_dir,
        ),
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}
