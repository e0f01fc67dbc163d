//! Numeric table loader.
//!
//! Parses a comma-delimited, header-tagged text table into column-oriented
//! `f64` sequences. Cells that are empty (or whitespace-only) count as
//! missing; non-numeric cells are discarded without being missing. Columns
//! that end up with fewer than two parsed values are dropped entirely.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::debug;

use crate::error::{GateError, Result};

/// Column-oriented numeric view of a delimited table.
///
/// Only columns with more than one parsed value are retained. The declared
/// header width and raw row count are kept for missing-rate accounting even
/// when header columns were dropped as non-numeric.
#[derive(Debug, Clone)]
pub struct NumericTable {
    /// Retained numeric columns, keyed by header name (sorted).
    pub columns: BTreeMap<String, Vec<f64>>,
    /// Number of columns declared by the header row, dropped ones included.
    pub declared_columns: usize,
    /// Number of data rows read.
    pub rows: usize,
    /// Cells that were empty or absent.
    pub missing_cells: usize,
}

impl NumericTable {
    /// Parse a table from text. Fails when the header row is absent or no
    /// column retains at least two numeric values.
    pub fn parse_str(text: &str) -> Result<Self> {
        let mut lines = text.lines().skip_while(|l| l.trim().is_empty());
        let header_line = lines
            .next()
            .ok_or_else(|| GateError::Input("table has no header row".into()))?;

        let header: Vec<String> = header_line
            .split(',')
            .map(|h| h.trim().to_string())
            .collect();
        let declared_columns = header.len();

        let mut raw: Vec<Vec<f64>> = vec![Vec::new(); declared_columns];
        let mut rows = 0usize;
        let mut missing_cells = 0usize;

        for line in lines {
            if line.is_empty() {
                continue;
            }
            rows += 1;
            let mut cells = line.split(',');
            for col in raw.iter_mut() {
                match cells.next() {
                    None => missing_cells += 1,
                    Some(cell) => {
                        let s = cell.trim();
                        if s.is_empty() {
                            missing_cells += 1;
                        } else if let Ok(v) = s.parse::<f64>() {
                            col.push(v);
                        }
                    }
                }
            }
        }

        let mut columns = BTreeMap::new();
        for (name, values) in header.into_iter().zip(raw) {
            if values.len() > 1 {
                columns.insert(name, values);
            } else {
                debug!("dropping column {name:?}: {} numeric value(s)", values.len());
            }
        }

        if columns.is_empty() {
            return Err(GateError::Input("no usable numeric column".into()));
        }

        Ok(Self {
            columns,
            declared_columns,
            rows,
            missing_cells,
        })
    }

    /// Load a table from a file path.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse_str(&text)
    }

    /// Column names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    /// Length of the shortest retained column.
    pub fn min_len(&self) -> usize {
        self.columns.values().map(Vec::len).min().unwrap_or(0)
    }
}
