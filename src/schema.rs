//! Derived, read-only view over a Dataset: column names, numeric subset and
//! per-column metadata.

use crate::data::{ColumnKind, Dataset};
use crate::stats;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericStats {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub sd: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    pub kind: ColumnKind,
    pub missing: usize,
    pub missing_pct: f64,
    pub stats: Option<NumericStats>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Schema {
    pub row_count: usize,
    pub all_columns: Vec<String>,
    /// Numeric column names, falling back to `all_columns` when none are numeric
    pub numeric_columns: Vec<String>,
    pub columns: Vec<ColumnSummary>,
}

impl Schema {
    pub fn column_count(&self) -> usize {
        self.all_columns.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.all_columns.iter().any(|c| c == name)
    }

    /// True only for columns that actually hold numbers, regardless of the fallback
    pub fn is_numeric(&self, name: &str) -> bool {
        self.columns
            .iter()
            .any(|c| c.name == name && c.kind == ColumnKind::Numeric)
    }

    pub fn summary(&self, name: &str) -> Option<&ColumnSummary> {
        self.columns.iter().find(|c| c.name == name)
    }
}

pub fn inspect(dataset: &Dataset) -> Schema {
    let rows = dataset.row_count();
    let all_columns = dataset.names();

    let mut numeric_columns: Vec<String> = dataset
        .columns()
        .iter()
        .filter(|c| c.is_numeric())
        .map(|c| c.name.clone())
        .collect();
    if numeric_columns.is_empty() {
        numeric_columns = all_columns.clone();
    }

    let columns = dataset
        .columns()
        .iter()
        .map(|col| {
            let missing = col.missing_count();
            let missing_pct = if rows == 0 { 0.0 } else { missing as f64 * 100.0 / rows as f64 };
            let stats = col.as_numeric().map(|values| {
                let present: Vec<f64> = values.iter().flatten().copied().collect();
                NumericStats {
                    min: stats::min(&present),
                    max: stats::max(&present),
                    mean: stats::mean(&present),
                    median: stats::median(&present),
                    sd: stats::sample_sd(&present),
                }
            });
            ColumnSummary {
                name: col.name.clone(),
                kind: col.kind(),
                missing,
                missing_pct,
                stats,
            }
        })
        .collect();

    Schema {
        row_count: rows,
        all_columns,
        numeric_columns,
        columns,
    }
}
