//! Chart dispatcher: turns a dataset snapshot and a selection into a
//! renderable [`ChartSpec`], or an [`ErrorChart`] when the request cannot be
//! satisfied. Never fails outright; the dashboard stays interactive.

use crate::config::{Capabilities, DashboardConfig, MissingGroups};
use crate::data::{Column, Dataset, Datum};
use crate::error::{ChartError, RenderError, SelectionError};
use crate::forest;
use crate::ir::{
    BarChart, BarSeries, Bin, BoxChart, BoxStats, Chart, ChartSpec, ErrorChart, ForestChart,
    HeatmapChart, HistogramChart, Point, Series, XyChart,
};
use crate::selection::{BarPosition, ChartKind, Selection};
use crate::stats;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Settings the dispatcher needs besides the selection itself
#[derive(Debug, Clone, Copy)]
pub struct DispatchOptions {
    pub capabilities: Capabilities,
    pub histogram_bins: usize,
    pub missing_groups: MissingGroups,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            capabilities: Capabilities::default(),
            histogram_bins: 30,
            missing_groups: MissingGroups::Exclude,
        }
    }
}

impl From<&DashboardConfig> for DispatchOptions {
    fn from(config: &DashboardConfig) -> Self {
        Self {
            capabilities: config.capabilities(),
            histogram_bins: config.histogram_bins.max(1),
            missing_groups: config.missing_groups,
        }
    }
}

/// Build the chart for the current selection, converting any failure into an ErrorChart
pub fn render(dataset: &Dataset, selection: &Selection, options: &DispatchOptions) -> Chart {
    match build_chart(dataset, selection, options) {
        Ok(spec) => {
            debug!(chart = %spec.kind(), "chart built");
            Chart::Ready(spec)
        }
        Err(error) => {
            warn!(chart = %selection.chart, %error, "chart request rejected");
            Chart::Failed(ErrorChart { error })
        }
    }
}

pub fn build_chart(
    dataset: &Dataset,
    selection: &Selection,
    options: &DispatchOptions,
) -> Result<ChartSpec, ChartError> {
    if selection.chart == ChartKind::Forest && !options.capabilities.forest_plot {
        return Err(RenderError::CapabilityUnavailable("forest plot rendering").into());
    }
    if dataset.row_count() == 0 {
        return Err(RenderError::InsufficientData("the dataset has no rows".to_string()).into());
    }

    match selection.chart {
        ChartKind::Bar => bar_chart(dataset, selection),
        ChartKind::Scatter => scatter_chart(dataset, selection),
        ChartKind::Line => line_chart(dataset, selection),
        ChartKind::Box => box_chart(dataset, selection),
        ChartKind::Histogram => histogram_chart(dataset, selection, options.histogram_bins),
        ChartKind::Heatmap => heatmap_chart(dataset),
        ChartKind::Forest => forest_chart(dataset, selection, options.missing_groups),
    }
}

// =============================================================================
// Per-kind builders
// =============================================================================

fn bar_chart(dataset: &Dataset, selection: &Selection) -> Result<ChartSpec, ChartError> {
    let x = column(dataset, require("x", &selection.x)?)?;
    let group = group_column(dataset, selection)?;
    debug!(x = %x.name, group = ?group.map(|g| &g.name), "bar: counting rows");
    Ok(ChartSpec::Bar(count_chart(x, group, selection.position)))
}

fn scatter_chart(dataset: &Dataset, selection: &Selection) -> Result<ChartSpec, ChartError> {
    let x = column(dataset, require("x", &selection.x)?)?;
    let y = numeric_column(dataset, require("y", &selection.y)?)?;
    let group = group_column(dataset, selection)?;

    let series = split_series(x, y, group, |points| points);
    Ok(ChartSpec::Scatter(XyChart {
        x_label: x.name.clone(),
        y_label: y.name.clone(),
        color_label: group.map(|g| g.name.clone()),
        series,
    }))
}

/// Without grouping, points are sorted by x (stable, so ties keep row order).
/// With grouping, each group's points stay in row order.
fn line_chart(dataset: &Dataset, selection: &Selection) -> Result<ChartSpec, ChartError> {
    let x = column(dataset, require("x", &selection.x)?)?;
    let y = numeric_column(dataset, require("y", &selection.y)?)?;
    let group = group_column(dataset, selection)?;

    let series = match group {
        Some(_) => split_series(x, y, group, |points| points),
        None => split_series(x, y, None, |mut points| {
            points.sort_by(|a, b| compare_datum(&a.x, &b.x));
            points
        }),
    };

    Ok(ChartSpec::Line(XyChart {
        x_label: x.name.clone(),
        y_label: y.name.clone(),
        color_label: group.map(|g| g.name.clone()),
        series,
    }))
}

fn box_chart(dataset: &Dataset, selection: &Selection) -> Result<ChartSpec, ChartError> {
    let x = column(dataset, require("x", &selection.x)?)?;
    let y = numeric_column(dataset, require("y", &selection.y)?)?;
    let group = group_column(dataset, selection)?;

    let rows: Vec<usize> = (0..dataset.row_count()).collect();
    let categories = category_order(x, &rows);
    let groups = match group {
        Some(g) => present_labels(g, &rows),
        None => Vec::new(),
    };

    // (category, group) -> values, in row order
    let mut cells: HashMap<(String, Option<String>), Vec<f64>> = HashMap::new();
    for row in rows {
        let (Some(cat), Some(value)) = (x.label(row), y.number(row)) else { continue };
        let key = match group {
            Some(g) => match g.label(row) {
                Some(label) => Some(label),
                None => continue,
            },
            None => None,
        };
        cells.entry((cat, key)).or_default().push(value);
    }

    let group_keys: Vec<Option<String>> = if group.is_some() {
        groups.iter().cloned().map(Some).collect()
    } else {
        vec![None]
    };

    let mut boxes = Vec::new();
    for cat in &categories {
        for key in &group_keys {
            if let Some(values) = cells.get(&(cat.clone(), key.clone())) {
                boxes.push(box_stats(cat.clone(), key.clone(), values));
            }
        }
    }

    if boxes.is_empty() {
        return Err(RenderError::InsufficientData(format!("no values in '{}'", y.name)).into());
    }

    Ok(ChartSpec::Box(BoxChart {
        x_label: x.name.clone(),
        y_label: y.name.clone(),
        group_label: group.map(|g| g.name.clone()),
        categories,
        groups,
        boxes,
    }))
}

/// Numeric x: equal-width bins over the observed range. Otherwise a plain count chart.
fn histogram_chart(
    dataset: &Dataset,
    selection: &Selection,
    bin_count: usize,
) -> Result<ChartSpec, ChartError> {
    let x = column(dataset, require("x", &selection.x)?)?;
    let Some(values) = x.as_numeric() else {
        debug!(x = %x.name, "histogram: non-numeric x, counting categories");
        return Ok(ChartSpec::Bar(count_chart(x, None, BarPosition::Dodge)));
    };

    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let (Some(min), Some(max)) = (stats::min(&present), stats::max(&present)) else {
        return Err(RenderError::InsufficientData(format!("'{}' has no values", x.name)).into());
    };

    let bins = if min == max {
        vec![Bin { start: min - 0.5, end: min + 0.5, count: present.len() }]
    } else {
        let width = (max - min) / bin_count as f64;
        let mut counts = vec![0usize; bin_count];
        for v in &present {
            let idx = (((v - min) / width).floor() as usize).min(bin_count - 1);
            counts[idx] += 1;
        }
        counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| Bin {
                start: min + i as f64 * width,
                end: min + (i + 1) as f64 * width,
                count,
            })
            .collect()
    };

    let bin_width = bins.first().map(|b| b.end - b.start).unwrap_or(1.0);
    Ok(ChartSpec::Histogram(HistogramChart {
        x_label: x.name.clone(),
        bin_width,
        bins,
    }))
}

/// Pairwise Pearson correlation using rows complete in both columns of each pair
fn heatmap_chart(dataset: &Dataset) -> Result<ChartSpec, ChartError> {
    let numeric: Vec<&Column> = dataset.columns().iter().filter(|c| c.is_numeric()).collect();
    if numeric.len() < 2 {
        return Err(RenderError::InsufficientData(format!(
            "a correlation heatmap needs at least two numeric columns, found {}",
            numeric.len()
        ))
        .into());
    }

    let matrix = numeric
        .iter()
        .map(|a| {
            numeric
                .iter()
                .map(|b| {
                    let (xs, ys): (Vec<f64>, Vec<f64>) = (0..dataset.row_count())
                        .filter_map(|r| Some((a.number(r)?, b.number(r)?)))
                        .unzip();
                    stats::pearson(&xs, &ys)
                })
                .collect()
        })
        .collect();

    Ok(ChartSpec::Heatmap(HeatmapChart {
        columns: numeric.iter().map(|c| c.name.clone()).collect(),
        matrix,
    }))
}

fn forest_chart(
    dataset: &Dataset,
    selection: &Selection,
    missing_groups: MissingGroups,
) -> Result<ChartSpec, ChartError> {
    let variable = require("forest", &selection.forest)?;
    let rows = forest::aggregate(
        dataset,
        variable,
        selection.group.as_deref(),
        selection.ci_level,
        missing_groups,
    )?;
    debug!(variable, groups = rows.len(), level = selection.ci_level, "forest: aggregated");

    Ok(ChartSpec::Forest(ForestChart {
        variable: variable.to_string(),
        group_label: selection.group.clone(),
        ci_level: selection.ci_level,
        show_ci: selection.show_ci,
        rows,
    }))
}

// =============================================================================
// Helpers
// =============================================================================

fn require<'a>(field: &'static str, value: &'a Option<String>) -> Result<&'a str, SelectionError> {
    value.as_deref().ok_or(SelectionError::MissingField(field))
}

fn column<'a>(dataset: &'a Dataset, name: &str) -> Result<&'a Column, RenderError> {
    dataset
        .column(name)
        .ok_or_else(|| RenderError::ColumnNotFound(name.to_string()))
}

fn numeric_column<'a>(dataset: &'a Dataset, name: &str) -> Result<&'a Column, RenderError> {
    let col = column(dataset, name)?;
    if !col.is_numeric() {
        return Err(RenderError::UnsupportedType { column: name.to_string(), expected: "numeric" });
    }
    Ok(col)
}

fn group_column<'a>(dataset: &'a Dataset, selection: &Selection) -> Result<Option<&'a Column>, RenderError> {
    selection.group.as_deref().map(|g| column(dataset, g)).transpose()
}

/// Numbers before labels; numbers ascending, labels lexicographic
fn compare_datum(a: &Datum, b: &Datum) -> Ordering {
    match (a, b) {
        (Datum::Number(x), Datum::Number(y)) => x.total_cmp(y),
        (Datum::Label(x), Datum::Label(y)) => x.cmp(y),
        (Datum::Number(_), Datum::Label(_)) => Ordering::Less,
        (Datum::Label(_), Datum::Number(_)) => Ordering::Greater,
    }
}

/// Distinct non-missing labels in first-appearance order
fn present_labels(col: &Column, rows: &[usize]) -> Vec<String> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter_map(|&r| col.label(r))
        .filter(|label| seen.insert(label.clone()))
        .collect()
}

/// Category axis order: ascending for numeric columns, first appearance otherwise
fn category_order(col: &Column, rows: &[usize]) -> Vec<String> {
    if col.is_numeric() {
        let mut values: Vec<f64> = rows.iter().filter_map(|&r| col.number(r)).collect();
        values.sort_by(f64::total_cmp);
        values.dedup();
        values.into_iter().map(crate::data::format_number).collect()
    } else {
        present_labels(col, rows)
    }
}

/// Build xy series, one per group (first appearance) or a single one keyed by y.
/// Rows missing x, y or the group value are skipped.
fn split_series(
    x: &Column,
    y: &Column,
    group: Option<&Column>,
    finish: impl Fn(Vec<Point>) -> Vec<Point>,
) -> Vec<Series> {
    let point = |row: usize| Some(Point { x: x.datum(row)?, y: y.number(row)? });

    match group {
        None => {
            let points = (0..x.len()).filter_map(&point).collect();
            vec![Series { key: y.name.clone(), points: finish(points) }]
        }
        Some(g) => g
            .partition()
            .into_iter()
            .filter_map(|(key, rows)| {
                let key = key?;
                let points = rows.into_iter().filter_map(&point).collect();
                Some(Series { key, points: finish(points) })
            })
            .collect(),
    }
}

fn count_chart(x: &Column, group: Option<&Column>, position: BarPosition) -> BarChart {
    let rows: Vec<usize> = (0..x.len()).collect();
    let categories = category_order(x, &rows);
    let cat_index: HashMap<&str, usize> = categories
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect();

    let series = match group {
        None => {
            let mut counts = vec![0.0; categories.len()];
            for row in &rows {
                if let Some(&i) = x.label(*row).as_deref().and_then(|l| cat_index.get(l)) {
                    counts[i] += 1.0;
                }
            }
            vec![BarSeries { key: "count".to_string(), counts }]
        }
        Some(g) => g
            .partition()
            .into_iter()
            .filter_map(|(key, rows)| {
                let key = key?;
                let mut counts = vec![0.0; categories.len()];
                for row in rows {
                    if let Some(&i) = x.label(row).as_deref().and_then(|l| cat_index.get(l)) {
                        counts[i] += 1.0;
                    }
                }
                Some(BarSeries { key, counts })
            })
            .collect(),
    };

    BarChart {
        x_label: x.name.clone(),
        group_label: group.map(|g| g.name.clone()),
        categories,
        series,
        position,
    }
}

fn box_stats(category: String, group: Option<String>, values: &[f64]) -> BoxStats {
    let ys = stats::sorted(values);
    let q1 = stats::percentile(&ys, 0.25);
    let median = stats::percentile(&ys, 0.50);
    let q3 = stats::percentile(&ys, 0.75);
    let iqr = q3 - q1;

    let lower_fence = q1 - 1.5 * iqr;
    let upper_fence = q3 + 1.5 * iqr;

    // Whiskers: furthest data within the fences
    let lower_whisker = ys.iter().copied().find(|&v| v >= lower_fence).unwrap_or(q1);
    let upper_whisker = ys.iter().rev().copied().find(|&v| v <= upper_fence).unwrap_or(q3);
    let outliers = ys
        .iter()
        .copied()
        .filter(|&v| v < lower_fence || v > upper_fence)
        .collect();

    BoxStats {
        category,
        group,
        n: ys.len(),
        lower_whisker,
        q1,
        median,
        q3,
        upper_whisker,
        outliers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::parse_csv;
    use crate::loader::sample_dataset;

    fn selection(chart: ChartKind, x: &str, y: Option<&str>, group: Option<&str>) -> Selection {
        Selection {
            chart,
            x: Some(x.to_string()),
            y: y.map(String::from),
            group: group.map(String::from),
            ..Default::default()
        }
    }

    fn build(ds: &Dataset, sel: &Selection) -> Result<ChartSpec, ChartError> {
        build_chart(ds, sel, &DispatchOptions::default())
    }

    fn line_data() -> Dataset {
        parse_csv(b"t,v,g\n3,30,a\n1,10,b\n2,20,a\n1,11,a\n").unwrap()
    }

    #[test]
    fn test_bar_counts_by_category() {
        let ds = parse_csv(b"k\nb\na\nb\nb\n").unwrap();
        let ChartSpec::Bar(bar) = build(&ds, &selection(ChartKind::Bar, "k", None, None)).unwrap() else {
            panic!("expected bar chart");
        };
        assert_eq!(bar.categories, vec!["b", "a"]);
        assert_eq!(bar.series[0].counts, vec![3.0, 1.0]);
    }

    #[test]
    fn test_bar_grouped_series() {
        let ds = parse_csv(b"k,g\nx,p\ny,q\nx,q\n").unwrap();
        let mut sel = selection(ChartKind::Bar, "k", None, Some("g"));
        sel.position = BarPosition::Stack;
        let ChartSpec::Bar(bar) = build(&ds, &sel).unwrap() else { panic!("expected bar chart") };
        assert_eq!(bar.series.len(), 2);
        assert_eq!(bar.series[0].key, "p");
        assert_eq!(bar.series[0].counts, vec![1.0, 0.0]);
        assert_eq!(bar.series[1].counts, vec![1.0, 1.0]);
        assert_eq!(bar.position, BarPosition::Stack);
    }

    #[test]
    fn test_line_sorted_without_group() {
        let ds = line_data();
        let ChartSpec::Line(line) = build(&ds, &selection(ChartKind::Line, "t", Some("v"), None)).unwrap() else {
            panic!("expected line chart");
        };
        let ys: Vec<f64> = line.series[0].points.iter().map(|p| p.y).collect();
        // ties on t=1 keep row order: 10 before 11
        assert_eq!(ys, vec![10.0, 11.0, 20.0, 30.0]);
    }

    #[test]
    fn test_line_grouped_keeps_row_order() {
        let ds = line_data();
        let ChartSpec::Line(line) = build(&ds, &selection(ChartKind::Line, "t", Some("v"), Some("g"))).unwrap() else {
            panic!("expected line chart");
        };
        assert_eq!(line.series[0].key, "a");
        let ys: Vec<f64> = line.series[0].points.iter().map(|p| p.y).collect();
        assert_eq!(ys, vec![30.0, 20.0, 11.0]);
        assert_eq!(line.series[1].key, "b");
    }

    #[test]
    fn test_scatter_requires_y() {
        let ds = line_data();
        let err = build(&ds, &selection(ChartKind::Scatter, "t", None, None)).unwrap_err();
        assert_eq!(err, ChartError::Selection(SelectionError::MissingField("y")));
    }

    #[test]
    fn test_scatter_rejects_text_y() {
        let ds = line_data();
        let err = build(&ds, &selection(ChartKind::Scatter, "t", Some("g"), None)).unwrap_err();
        assert!(matches!(err, ChartError::Render(RenderError::UnsupportedType { .. })));
    }

    #[test]
    fn test_scatter_colors_by_group() {
        let ds = line_data();
        let ChartSpec::Scatter(sc) = build(&ds, &selection(ChartKind::Scatter, "t", Some("v"), Some("g"))).unwrap() else {
            panic!("expected scatter chart");
        };
        assert_eq!(sc.color_label.as_deref(), Some("g"));
        assert_eq!(sc.series.iter().map(|s| s.points.len()).sum::<usize>(), 4);
    }

    #[test]
    fn test_box_stats() {
        let ds = parse_csv(b"c,v\na,1\na,2\na,3\na,4\na,100\nb,5\n").unwrap();
        let ChartSpec::Box(bx) = build(&ds, &selection(ChartKind::Box, "c", Some("v"), None)).unwrap() else {
            panic!("expected box chart");
        };
        assert_eq!(bx.categories, vec!["a", "b"]);
        let a = &bx.boxes[0];
        assert_eq!(a.median, 3.0);
        assert_eq!(a.q1, 2.0);
        assert_eq!(a.q3, 4.0);
        assert_eq!(a.upper_whisker, 4.0);
        assert_eq!(a.outliers, vec![100.0]);
        assert_eq!(bx.boxes[1].n, 1);
    }

    #[test]
    fn test_histogram_numeric_bins() {
        let ds = sample_dataset(42);
        let ChartSpec::Histogram(h) = build(&ds, &selection(ChartKind::Histogram, "Sales", None, None)).unwrap() else {
            panic!("expected histogram");
        };
        assert_eq!(h.bins.len(), 30);
        assert_eq!(h.bins.iter().map(|b| b.count).sum::<usize>(), 200);
        let min = ds.column("Sales").unwrap().as_numeric().unwrap().iter().flatten().copied().fold(f64::INFINITY, f64::min);
        assert_eq!(h.bins[0].start, min);
    }

    #[test]
    fn test_histogram_categorical_falls_back_to_counts() {
        let ds = sample_dataset(42);
        let spec = build(&ds, &selection(ChartKind::Histogram, "Region", None, None)).unwrap();
        let ChartSpec::Bar(bar) = spec else { panic!("expected count chart") };
        assert_eq!(bar.categories, vec!["North", "South", "East", "West"]);
        assert_eq!(bar.series[0].counts, vec![50.0; 4]);
    }

    #[test]
    fn test_heatmap_needs_two_numeric_columns() {
        let ds = parse_csv(b"a,b\n1,x\n2,y\n").unwrap();
        let chart = render(&ds, &selection(ChartKind::Heatmap, "a", None, None), &DispatchOptions::default());
        let err = chart.error().expect("expected an error chart");
        assert!(matches!(err.error, ChartError::Render(RenderError::InsufficientData(_))));
    }

    #[test]
    fn test_heatmap_pairwise_complete() {
        let ds = parse_csv(b"a,b,c\n1,2,\n2,4,1\n3,6,5\n4,,2\n").unwrap();
        let ChartSpec::Heatmap(h) = build(&ds, &selection(ChartKind::Heatmap, "a", None, None)).unwrap() else {
            panic!("expected heatmap");
        };
        assert_eq!(h.columns, vec!["a", "b", "c"]);
        assert!((h.matrix[0][1].unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(h.matrix[0][1], h.matrix[1][0]);
        // b,c complete only on rows 2 and 3
        assert!((h.matrix[1][2].unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_forest_requires_capability() {
        let ds = sample_dataset(42);
        let mut sel = selection(ChartKind::Forest, "Region", None, None);
        sel.forest = Some("Sales".into());
        let options = DispatchOptions {
            capabilities: Capabilities { forest_plot: false },
            ..Default::default()
        };
        let chart = render(&ds, &sel, &options);
        assert!(chart.error().unwrap().is_placeholder());
    }

    #[test]
    fn test_forest_requires_variable() {
        let ds = sample_dataset(42);
        let err = build(&ds, &selection(ChartKind::Forest, "Region", None, None)).unwrap_err();
        assert_eq!(err, ChartError::Selection(SelectionError::MissingField("forest")));
    }

    #[test]
    fn test_vanished_column_becomes_error_chart() {
        let ds = line_data();
        let chart = render(&ds, &selection(ChartKind::Bar, "gone", None, None), &DispatchOptions::default());
        assert_eq!(chart.error().unwrap().reason(), "column_not_found");
    }

    #[test]
    fn test_empty_dataset_is_insufficient() {
        let ds = parse_csv(b"a,b\n").unwrap();
        let err = build(&ds, &selection(ChartKind::Bar, "a", None, None)).unwrap_err();
        assert!(matches!(err, ChartError::Render(RenderError::InsufficientData(_))));
    }
}
