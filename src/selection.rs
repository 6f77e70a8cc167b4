use crate::error::SelectionError;
use crate::loader::{DataSource, SourceKind};
use crate::schema::Schema;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

pub const CI_LEVEL_RANGE: std::ops::RangeInclusive<f64> = 0.80..=0.99;

/// Sentinel accepted for "no grouping"
pub const NO_GROUP: &str = "None";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Bar,
    Scatter,
    Line,
    Box,
    Histogram,
    Heatmap,
    Forest,
}

impl ChartKind {
    pub const ALL: [ChartKind; 7] = [
        ChartKind::Bar,
        ChartKind::Scatter,
        ChartKind::Line,
        ChartKind::Box,
        ChartKind::Histogram,
        ChartKind::Heatmap,
        ChartKind::Forest,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Scatter => "scatter",
            ChartKind::Line => "line",
            ChartKind::Box => "box",
            ChartKind::Histogram => "histogram",
            ChartKind::Heatmap => "heatmap",
            ChartKind::Forest => "forest",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChartKind {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChartKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| SelectionError::UnknownChartType(s.to_string()))
    }
}

/// Layout of grouped bars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BarPosition {
    #[default]
    Dodge,
    Stack,
}

impl FromStr for BarPosition {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dodge" => Ok(BarPosition::Dodge),
            "stack" => Ok(BarPosition::Stack),
            _ => Err(SelectionError::InvalidValue { field: "position".into(), value: s.into() }),
        }
    }
}

/// User-chosen chart parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    pub source: Option<SourceKind>,
    pub source_param: Option<String>,
    pub x: Option<String>,
    pub y: Option<String>,
    /// `None` means no grouping
    pub group: Option<String>,
    pub forest: Option<String>,
    pub chart: ChartKind,
    pub show_ci: bool,
    pub ci_level: f64,
    pub position: BarPosition,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            source: None,
            source_param: None,
            x: None,
            y: None,
            group: None,
            forest: None,
            chart: ChartKind::Bar,
            show_ci: true,
            ci_level: 0.95,
            position: BarPosition::Dodge,
        }
    }
}

impl Selection {
    /// Regenerate column defaults after a schema change. Chart type, CI
    /// settings and bar position are left as the user set them.
    pub fn reset_defaults(&mut self, schema: &Schema) {
        self.x = schema.all_columns.first().cloned();
        self.y = schema.numeric_columns.first().cloned();
        self.group = None;
        self.forest = schema.numeric_columns.first().cloned();
        debug!(x = ?self.x, y = ?self.y, forest = ?self.forest, "selection defaults reset");
    }

    pub fn set_source(&mut self, source: &DataSource) {
        self.source = Some(source.kind());
        self.source_param = source.param();
    }

    pub fn set_x(&mut self, schema: &Schema, name: &str) -> Result<(), SelectionError> {
        self.x = Some(known_column(schema, name)?);
        Ok(())
    }

    pub fn set_y(&mut self, schema: &Schema, name: &str) -> Result<(), SelectionError> {
        self.y = Some(known_column(schema, name)?);
        Ok(())
    }

    /// Accepts a column name or `"None"` to clear grouping
    pub fn set_group(&mut self, schema: &Schema, name: &str) -> Result<(), SelectionError> {
        self.group = if name == NO_GROUP { None } else { Some(known_column(schema, name)?) };
        Ok(())
    }

    pub fn set_forest(&mut self, schema: &Schema, name: &str) -> Result<(), SelectionError> {
        self.forest = Some(known_column(schema, name)?);
        Ok(())
    }

    pub fn set_chart(&mut self, chart: ChartKind) {
        self.chart = chart;
    }

    pub fn set_ci_level(&mut self, level: f64) -> Result<(), SelectionError> {
        if !CI_LEVEL_RANGE.contains(&level) {
            return Err(SelectionError::InvalidCiLevel(level));
        }
        self.ci_level = level;
        Ok(())
    }

    /// Apply a single named edit, as delivered by the shell
    pub fn apply(&mut self, schema: &Schema, field: &str, value: &str) -> Result<(), SelectionError> {
        match field {
            "x" => self.set_x(schema, value),
            "y" => self.set_y(schema, value),
            "group" => self.set_group(schema, value),
            "forest" => self.set_forest(schema, value),
            "chart" => {
                self.set_chart(value.parse()?);
                Ok(())
            }
            "ci" => {
                let level = value.parse::<f64>().map_err(|_| invalid("ci", value))?;
                self.set_ci_level(level)
            }
            "show_ci" => {
                self.show_ci = value.parse::<bool>().map_err(|_| invalid("show_ci", value))?;
                Ok(())
            }
            "position" => {
                self.position = value.parse()?;
                Ok(())
            }
            other => Err(SelectionError::UnknownField(other.to_string())),
        }
    }
}

fn known_column(schema: &Schema, name: &str) -> Result<String, SelectionError> {
    if schema.contains(name) {
        Ok(name.to_string())
    } else {
        Err(SelectionError::UnknownColumn(name.to_string()))
    }
}

fn invalid(field: &str, value: &str) -> SelectionError {
    SelectionError::InvalidValue { field: field.to_string(), value: value.to_string() }
}
