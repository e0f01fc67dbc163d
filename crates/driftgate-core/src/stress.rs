//! Stochastic integrity stress testing.
//!
//! A seeded bit-flip Monte Carlo over target bytes: each trial perturbs the
//! base content, hashes the mutant, and measures Shannon entropy over the
//! digest's byte histogram. The entropy measured is that of the *hash
//! output* — the avalanche/randomness quality of the hash under bounded
//! input perturbation, not entropy of the input itself.
//!
//! Reproducibility contract: one generator, seeded once, advanced
//! sequentially across all trials. The stream is explicit at every call
//! site and must never be advanced concurrently for the same seed.

use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::drift::DriftSignals;
use crate::error::{GateError, Result};
use crate::fingerprint::Fingerprint;
use crate::stats::round12;

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// Lowercase hex SHA-256 of a byte slice.
pub fn sha256_hex(data: &[u8]) -> String {
    hex_encode(&Sha256::digest(data))
}

/// Seed derived from the first 8 hex digits of a digest.
pub fn derive_seed(hex_digest: &str) -> u64 {
    u64::from_str_radix(&hex_digest[..8.min(hex_digest.len())], 16).unwrap_or(0)
}

/// Canonical base bytes for a stress target.
///
/// A file contributes its raw bytes. A directory contributes the UTF-8
/// encoding of `rel_path:sha256` lines for every file beneath it, sorted by
/// relative path and newline-joined, making the content independent of
/// enumeration order. Anything else is an input error.
pub fn read_target_bytes(target: &Path) -> Result<Vec<u8>> {
    if target.is_file() {
        return Ok(fs::read(target)?);
    }
    if target.is_dir() {
        let mut items: Vec<(String, String)> = Vec::new();
        for entry in walkdir::WalkDir::new(target) {
            let entry = entry.map_err(|e| GateError::Input(format!("unreadable target: {e}")))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(target)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace('\\', "/");
            let bytes = fs::read(entry.path())?;
            items.push((rel, sha256_hex(&bytes)));
        }
        items.sort();
        let blob = items
            .iter()
            .map(|(rel, hash)| format!("{rel}:{hash}"))
            .collect::<Vec<_>>()
            .join("\n");
        return Ok(blob.into_bytes());
    }
    Err(GateError::Input(format!(
        "target is neither a file nor a directory: {}",
        target.display()
    )))
}

/// Flip bits in a copy of `data`: each byte independently flips one
/// uniformly-chosen bit with probability `prob`, drawing from the shared
/// sequential generator.
pub fn flip_bits(data: &[u8], rng: &mut impl Rng, prob: f64) -> Vec<u8> {
    if prob <= 0.0 {
        return data.to_vec();
    }
    let mut out = data.to_vec();
    for byte in out.iter_mut() {
        if rng.random::<f64>() < prob {
            let bit = 1u8 << rng.random_range(0..8);
            *byte ^= bit;
        }
    }
    out
}

/// Shannon entropy in bits over the 256-symbol byte histogram.
pub fn shannon_entropy_bits(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut counts = [0u64; 256];
    for &b in data {
        counts[b as usize] += 1;
    }
    let n = data.len() as f64;
    let mut h = 0.0;
    for &c in &counts {
        if c > 0 {
            let p = c as f64 / n;
            h -= p * p.log2();
        }
    }
    h
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// One stress trial.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StressRecord {
    pub run_index: usize,
    pub sha256: String,
    pub entropy_bits: f64,
}

/// Population statistics of digest entropy across all trials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntropySummary {
    pub count: usize,
    pub mean_entropy_bits: f64,
    pub var_entropy_bits: f64,
    pub min_entropy_bits: f64,
    pub max_entropy_bits: f64,
}

impl EntropySummary {
    /// Population mean/var/min/max of the per-trial entropies.
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                count: 0,
                mean_entropy_bits: 0.0,
                var_entropy_bits: 0.0,
                min_entropy_bits: 0.0,
                max_entropy_bits: 0.0,
            };
        }
        let mean = crate::stats::mean(values);
        let var = crate::stats::population_variance(values, mean);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self {
            count: values.len(),
            mean_entropy_bits: round12(mean),
            var_entropy_bits: round12(var),
            min_entropy_bits: round12(min),
            max_entropy_bits: round12(max),
        }
    }
}

/// Stress tester configuration.
#[derive(Debug, Clone, Copy)]
pub struct StressConfig {
    pub runs: usize,
    /// Per-byte flip probability.
    pub noise: f64,
    /// Seed; 0 derives a seed from the base content hash.
    pub seed: u64,
}

/// Full outcome of a stress run.
#[derive(Debug, Clone, Serialize)]
pub struct StressOutcome {
    pub base_sha256: String,
    pub seed: u64,
    pub noise: f64,
    pub records: Vec<StressRecord>,
    pub summary: EntropySummary,
}

/// The persisted "mark" report for a stress run.
#[derive(Debug, Clone, Serialize)]
pub struct StressMark {
    pub target: String,
    pub base_sha256: String,
    pub seed: u64,
    pub noise: f64,
    pub runs: usize,
    pub summary: EntropySummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<Fingerprint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drift_signals: Option<DriftSignals>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint_source: Option<String>,
}

/// Run the bit-flip Monte Carlo over `base`.
///
/// The generator is seeded exactly once (from `cfg.seed`, or from the base
/// hash when the seed is 0) and threaded through every trial in sequence.
pub fn run_stress(base: &[u8], cfg: StressConfig) -> StressOutcome {
    let base_sha256 = sha256_hex(base);
    let seed = if cfg.seed == 0 {
        derive_seed(&base_sha256)
    } else {
        cfg.seed
    };
    let mut rng = StdRng::seed_from_u64(seed);

    let mut records = Vec::with_capacity(cfg.runs);
    let mut entropies = Vec::with_capacity(cfg.runs);
    for run_index in 0..cfg.runs {
        let mutated = flip_bits(base, &mut rng, cfg.noise);
        let digest = Sha256::digest(&mutated);
        let entropy = round12(shannon_entropy_bits(&digest));
        let hex = hex_encode(&digest);
        entropies.push(entropy);
        records.push(StressRecord {
            run_index,
            sha256: hex,
            entropy_bits: entropy,
        });
    }

    StressOutcome {
        base_sha256,
        seed,
        noise: cfg.noise,
        summary: EntropySummary::from_values(&entropies),
        records,
    }
}

impl StressMark {
    /// Assemble the mark report for a completed run.
    pub fn new(target: &Path, outcome: &StressOutcome, runs: usize) -> Self {
        Self {
            target: target.display().to_string(),
            base_sha256: outcome.base_sha256.clone(),
            seed: outcome.seed,
            noise: outcome.noise,
            runs,
            summary: outcome.summary.clone(),
            fingerprint: None,
            drift_signals: None,
            fingerprint_source: None,
        }
    }

    /// Attach the optional fingerprint/drift block.
    pub fn with_fingerprint(
        mut self,
        fingerprint: Fingerprint,
        drift_signals: DriftSignals,
        source: String,
    ) -> Self {
        self.fingerprint = Some(fingerprint);
        self.drift_signals = Some(drift_signals);
        self.fingerprint_source = Some(source);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_derive_seed_from_prefix() {
        assert_eq!(derive_seed("deadbeef00"), 0xdeadbeef);
        assert_eq!(derive_seed("00000001"), 1);
    }

    #[test]
    fn test_flip_bits_zero_noise_identity() {
        let mut rng = StdRng::seed_from_u64(7);
        let data = vec![1u8, 2, 3, 4];
        assert_eq!(flip_bits(&data, &mut rng, 0.0), data);
    }

    #[test]
    fn test_flip_bits_full_noise_flips_every_byte() {
        let mut rng = StdRng::seed_from_u64(7);
        let data = vec![0u8; 64];
        let out = flip_bits(&data, &mut rng, 1.0);
        assert!(out.iter().all(|&b| b != 0));
        assert!(out.iter().all(|&b| b.count_ones() == 1));
    }

    #[test]
    fn test_shannon_entropy_extremes() {
        assert_eq!(shannon_entropy_bits(&[]), 0.0);
        assert_eq!(shannon_entropy_bits(&[42u8; 100]), 0.0);
        let all: Vec<u8> = (0..=255).collect();
        assert!((shannon_entropy_bits(&all) - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_stress_deterministic_for_same_seed() {
        let base = b"driftgate stress determinism fixture".to_vec();
        let cfg = StressConfig { runs: 20, noise: 0.1, seed: 42 };
        let a = run_stress(&base, cfg);
        let b = run_stress(&base, cfg);
        let hashes_a: Vec<&str> = a.records.iter().map(|r| r.sha256.as_str()).collect();
        let hashes_b: Vec<&str> = b.records.iter().map(|r| r.sha256.as_str()).collect();
        assert_eq!(hashes_a, hashes_b);
        assert_eq!(a.summary, b.summary);
    }

    #[test]
    fn test_stress_zero_seed_derived_from_base_hash() {
        let base = b"some target".to_vec();
        let cfg = StressConfig { runs: 1, noise: 0.0, seed: 0 };
        let out = run_stress(&base, cfg);
        assert_eq!(out.seed, derive_seed(&out.base_sha256));
        assert_ne!(out.seed, 0);
    }

    #[test]
    fn test_stress_records_indexed_in_order() {
        let out = run_stress(b"abc", StressConfig { runs: 5, noise: 0.5, seed: 9 });
        let idx: Vec<usize> = out.records.iter().map(|r| r.run_index).collect();
        assert_eq!(idx, vec![0, 1, 2, 3, 4]);
        assert_eq!(out.summary.count, 5);
    }

    #[test]
    fn test_entropy_summary_population_stats() {
        let s = EntropySummary::from_values(&[1.0, 2.0, 3.0]);
        assert_eq!(s.count, 3);
        assert_eq!(s.mean_entropy_bits, 2.0);
        assert!((s.var_entropy_bits - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(s.min_entropy_bits, 1.0);
        assert_eq!(s.max_entropy_bits, 3.0);
    }

    #[test]
    fn test_directory_target_sorted_by_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("b.txt"), b"bee").unwrap();
        fs::write(dir.path().join("a.txt"), b"ay").unwrap();
        fs::write(dir.path().join("sub").join("c.txt"), b"sea").unwrap();

        let blob = read_target_bytes(dir.path()).unwrap();
        let text = String::from_utf8(blob).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("a.txt:"));
        assert!(lines[1].starts_with("b.txt:"));
        assert!(lines[2].starts_with("sub/c.txt:"));
        assert_eq!(lines[0], format!("a.txt:{}", sha256_hex(b"ay")));
    }

    #[test]
    fn test_missing_target_is_input_error() {
        let err = read_target_bytes(Path::new("/nonexistent/driftgate-target")).unwrap_err();
        assert!(matches!(err, GateError::Input(_)));
    }

    #[test]
    fn test_mark_optional_blocks_absent() {
        let out = run_stress(b"abc", StressConfig { runs: 2, noise: 0.1, seed: 1 });
        let mark = StressMark::new(Path::new("abc.bin"), &out, 2);
        let json = serde_json::to_string(&mark).unwrap();
        assert!(!json.contains("fingerprint"));
        assert!(!json.contains("drift_signals"));
        assert!(json.contains("base_sha256"));
    }
}
