use crate::data::Datum;
use crate::error::{ChartError, RenderError, SelectionError};
use crate::forest::ForestRow;
use crate::selection::{BarPosition, ChartKind};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

// =============================================================================
// Resolved chart descriptions
// =============================================================================

/// A renderable chart, built fresh for every render request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChartSpec {
    Bar(BarChart),
    Scatter(XyChart),
    Line(XyChart),
    Box(BoxChart),
    Histogram(HistogramChart),
    Heatmap(HeatmapChart),
    Forest(ForestChart),
}

impl ChartSpec {
    pub fn kind(&self) -> ChartKind {
        match self {
            ChartSpec::Bar(_) => ChartKind::Bar,
            ChartSpec::Scatter(_) => ChartKind::Scatter,
            ChartSpec::Line(_) => ChartKind::Line,
            ChartSpec::Box(_) => ChartKind::Box,
            ChartSpec::Histogram(_) => ChartKind::Histogram,
            ChartSpec::Heatmap(_) => ChartKind::Heatmap,
            ChartSpec::Forest(_) => ChartKind::Forest,
        }
    }
}

/// Row counts per x category, one series per group (or a single "count" series)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarChart {
    pub x_label: String,
    pub group_label: Option<String>,
    pub categories: Vec<String>,
    pub series: Vec<BarSeries>,
    pub position: BarPosition,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    pub key: String,
    /// Index matches `BarChart::categories`
    pub counts: Vec<f64>,
}

/// Shared by scatter and line charts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct XyChart {
    pub x_label: String,
    pub y_label: String,
    pub color_label: Option<String>,
    pub series: Vec<Series>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub key: String,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub x: Datum,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxChart {
    pub x_label: String,
    pub y_label: String,
    pub group_label: Option<String>,
    pub categories: Vec<String>,
    pub groups: Vec<String>,
    pub boxes: Vec<BoxStats>,
}

/// Tukey box: whiskers reach the furthest points within 1.5 IQR
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxStats {
    pub category: String,
    pub group: Option<String>,
    pub n: usize,
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramChart {
    pub x_label: String,
    pub bin_width: f64,
    pub bins: Vec<Bin>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Pairwise Pearson correlations; `None` where undefined
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapChart {
    pub columns: Vec<String>,
    pub matrix: Vec<Vec<Option<f64>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForestChart {
    pub variable: String,
    pub group_label: Option<String>,
    pub ci_level: f64,
    pub show_ci: bool,
    pub rows: Vec<ForestRow>,
}

// =============================================================================
// Failure placeholder
// =============================================================================

/// Shown in place of a chart when the dispatcher rejects a request
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorChart {
    pub error: ChartError,
}

impl ErrorChart {
    pub fn message(&self) -> String {
        self.error.to_string()
    }

    /// Capability gaps get a static explanatory placeholder rather than an error
    pub fn is_placeholder(&self) -> bool {
        matches!(self.error, ChartError::Render(RenderError::CapabilityUnavailable(_)))
    }

    pub fn reason(&self) -> &'static str {
        match &self.error {
            ChartError::Selection(SelectionError::MissingField(_)) => "missing_required_field",
            ChartError::Selection(_) => "invalid_selection",
            ChartError::Render(RenderError::InsufficientData(_)) => "insufficient_data",
            ChartError::Render(RenderError::UnsupportedType { .. }) => "unsupported_type",
            ChartError::Render(RenderError::CapabilityUnavailable(_)) => "capability_unavailable",
            ChartError::Render(RenderError::ColumnNotFound(_)) => "column_not_found",
        }
    }
}

impl Serialize for ErrorChart {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ErrorChart", 3)?;
        state.serialize_field("kind", "error")?;
        state.serialize_field("reason", self.reason())?;
        state.serialize_field("message", &self.message())?;
        state.end()
    }
}

/// Outcome of a render request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Chart {
    Ready(ChartSpec),
    Failed(ErrorChart),
}

impl Chart {
    pub fn spec(&self) -> Option<&ChartSpec> {
        match self {
            Chart::Ready(spec) => Some(spec),
            Chart::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorChart> {
        match self {
            Chart::Ready(_) => None,
            Chart::Failed(err) => Some(err),
        }
    }
}
