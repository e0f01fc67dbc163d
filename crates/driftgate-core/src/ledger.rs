//! Append-only fingerprint ledger.
//!
//! The ledger is the only entity with cross-invocation identity: a JSON
//! list of entries owned by the caller-supplied path. A missing, unreadable,
//! or malformed file is recovered to an empty history — a documented policy,
//! not an error — and the recovery branch is a named variant so the behavior
//! stays auditable. No locking: at most one concurrent writer is an
//! operational requirement on the caller.

use std::fs;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One appended ledger record. Field order is alphabetical so the pretty
/// serialization is key-sorted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    pub base_sha256: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint_path: Option<String>,
    pub flag_drift: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
}

/// Where the prior history came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistorySource {
    /// File existed and parsed as a list of entries.
    Loaded,
    /// File did not exist yet.
    Fresh,
    /// File was unreadable or not a list of entries; history reset.
    Recovered,
}

/// Read the persisted history, recovering to empty on corruption.
pub fn load_history(path: &Path) -> (Vec<LedgerEntry>, HistorySource) {
    if !path.exists() {
        return (Vec::new(), HistorySource::Fresh);
    }
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            warn!("ledger {path:?} unreadable ({e}); starting empty history");
            return (Vec::new(), HistorySource::Recovered);
        }
    };
    match serde_json::from_str::<Vec<LedgerEntry>>(&text) {
        Ok(entries) => (entries, HistorySource::Loaded),
        Err(e) => {
            warn!("ledger {path:?} invalid ({e}); starting empty history");
            (Vec::new(), HistorySource::Recovered)
        }
    }
}

/// Append one entry and rewrite the full list. Returns the new history.
pub fn append(path: &Path, entry: LedgerEntry) -> Result<Vec<LedgerEntry>> {
    let (mut entries, _source) = load_history(path);
    entries.push(entry);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(&entries)?;
    fs::write(path, json)?;
    Ok(entries)
}
