//! Error types for the dashboard pipeline
//!
//! Every error here is recovered at the component boundary that detects it:
//! load failures become session notices, selection and render failures become
//! an [`ErrorChart`](crate::ir::ErrorChart). None of them end the session.

use thiserror::Error;

/// Failures while obtaining a dataset
#[derive(Error, Debug)]
pub enum LoadError {
    /// Connection failure or non-2xx response
    #[error("network error: {0}")]
    Network(String),

    /// The fetch did not complete within the configured timeout
    #[error("network error: request timed out after {0}s")]
    Timeout(u64),

    /// Malformed CSV content
    #[error("CSV parse error: {0}")]
    Parse(String),
}

impl LoadError {
    /// Timeouts are surfaced to users as network failures
    pub fn is_network(&self) -> bool {
        matches!(self, LoadError::Network(_) | LoadError::Timeout(_))
    }
}

impl From<csv::Error> for LoadError {
    fn from(err: csv::Error) -> Self {
        LoadError::Parse(err.to_string())
    }
}

/// Invalid or incomplete user selections
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectionError {
    #[error("missing required selection: {0}")]
    MissingField(&'static str),

    #[error("column '{0}' is not in the current dataset")]
    UnknownColumn(String),

    #[error("confidence level {0} is outside 0.80..=0.99")]
    InvalidCiLevel(f64),

    #[error("unknown chart type '{0}'")]
    UnknownChartType(String),

    #[error("unknown selection field '{0}'")]
    UnknownField(String),

    #[error("invalid value for '{field}': {value}")]
    InvalidValue { field: String, value: String },
}

/// Failures while building a chart description
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("not enough data: {0}")]
    InsufficientData(String),

    #[error("column '{column}' must be {expected}")]
    UnsupportedType { column: String, expected: &'static str },

    #[error("{0} is not available in this runtime")]
    CapabilityUnavailable(&'static str),

    #[error("column '{0}' not found")]
    ColumnNotFound(String),
}

/// Anything the chart dispatcher can reject
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChartError {
    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Render(#[from] RenderError),
}
