pub mod check;
pub mod fingerprint;
pub mod scan;
pub mod soak;
pub mod stress;

use std::fs;
use std::path::Path;

use driftgate_core::Result;
use serde_json::Value;

/// Pretty-print a report to `<dir>/<name>`, creating the directory.
pub fn write_report<T: serde::Serialize>(dir: &Path, name: &str, report: &T) -> Result<()> {
    fs::create_dir_all(dir)?;
    let path = dir.join(name);
    fs::write(&path, serde_json::to_string_pretty(report)?)?;
    println!("report: {}", path.display());
    Ok(())
}

/// Load a JSON file as a generic value.
pub fn read_json(path: &Path) -> Result<Value> {
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}
