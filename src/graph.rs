use crate::data::Datum;
use crate::ir::{
    BarChart, BoxChart, Chart, ChartSpec, ErrorChart, ForestChart, HeatmapChart, HistogramChart,
    Series, XyChart,
};
use crate::selection::BarPosition;
use crate::{OutputFormat, RenderOptions};
use anyhow::{Context, Result};
use image::ImageEncoder;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::ops::Range;

/// Series colors, cycled by series index
const PALETTE: [RGBColor; 8] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
];

const FONT: &str = "sans-serif";
const MISSING_CELL: RGBColor = RGBColor(220, 220, 220);

/// Upper bound on bitmap area (100 megapixels)
const MAX_PIXELS: usize = 100_000_000;

fn palette(idx: usize) -> RGBColor {
    PALETTE[idx % PALETTE.len()]
}

/// Draw a chart outcome (spec or error placeholder) and encode it
pub fn render_chart(chart: &Chart, options: &RenderOptions) -> Result<Vec<u8>> {
    if options.width == 0 || options.height == 0 {
        anyhow::bail!("Image size must be non-zero (got {}x{})", options.width, options.height);
    }
    let size = (options.width, options.height);

    match options.format {
        OutputFormat::Png => {
            let len = (options.width as usize)
                .checked_mul(options.height as usize)
                .filter(|&pixels| pixels <= MAX_PIXELS)
                .and_then(|pixels| pixels.checked_mul(3))
                .ok_or_else(|| {
                    anyhow::anyhow!("Image size {}x{} is too large", options.width, options.height)
                })?;
            let mut buffer = vec![0u8; len];
            {
                let root = BitMapBackend::with_buffer(&mut buffer, size).into_drawing_area();
                draw_chart(&root, chart)?;
                root.present().context("Failed to present drawing")?;
            }
            encode_png(&buffer, options.width, options.height)
        }
        OutputFormat::Svg => {
            let mut svg = String::new();
            {
                let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
                draw_chart(&root, chart)?;
                root.present().context("Failed to present drawing")?;
            }
            Ok(svg.into_bytes())
        }
    }
}

fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let mut png_bytes = Vec::new();
    image::codecs::png::PngEncoder::new(&mut png_bytes)
        .write_image(buffer, width, height, image::ColorType::Rgb8)
        .context("Failed to encode PNG")?;
    Ok(png_bytes)
}

fn draw_chart<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, chart: &Chart) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).context("Failed to fill background")?;

    match chart {
        Chart::Ready(ChartSpec::Bar(bar)) => draw_bar(root, bar),
        Chart::Ready(ChartSpec::Scatter(xy)) => draw_xy(root, xy, false),
        Chart::Ready(ChartSpec::Line(xy)) => draw_xy(root, xy, true),
        Chart::Ready(ChartSpec::Box(bx)) => draw_box(root, bx),
        Chart::Ready(ChartSpec::Histogram(hist)) => draw_histogram(root, hist),
        Chart::Ready(ChartSpec::Heatmap(heat)) => draw_heatmap(root, heat),
        Chart::Ready(ChartSpec::Forest(forest)) => draw_forest(root, forest),
        Chart::Failed(err) => draw_error(root, err),
    }
}

/// Pad a data range by 5%, widening degenerate ranges
fn padded_range(values: impl IntoIterator<Item = f64>) -> Range<f64> {
    let (min, max) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));

    if !min.is_finite() {
        0.0..1.0
    } else if min == max {
        (min - 1.0)..(max + 1.0)
    } else {
        let padding = (max - min) * 0.05;
        (min - padding)..(max + padding)
    }
}

/// Count axes start at zero
fn count_range(max: f64) -> Range<f64> {
    if max > 0.0 {
        0.0..(max * 1.05)
    } else {
        0.0..1.0
    }
}

fn category_label(categories: &[String], x: f64) -> String {
    if x < 0.0 {
        return String::new();
    }
    categories.get(x as usize).cloned().unwrap_or_default()
}

fn draw_bar<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, bar: &BarChart) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let num_categories = bar.categories.len();
    let num_series = bar.series.len().max(1);

    let y_max = match bar.position {
        BarPosition::Stack => (0..num_categories)
            .map(|i| bar.series.iter().filter_map(|s| s.counts.get(i)).sum::<f64>())
            .fold(0.0, f64::max),
        BarPosition::Dodge => bar
            .series
            .iter()
            .flat_map(|s| s.counts.iter().copied())
            .fold(0.0, f64::max),
    };

    let caption = match &bar.group_label {
        Some(group) => format!("Count of {} by {}", bar.x_label, group),
        None => format!("Count of {}", bar.x_label),
    };

    let mut chart = ChartBuilder::on(root)
        .margin(10)
        .caption(caption, (FONT, 20))
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..(num_categories.max(1) as f64), count_range(y_max))
        .context("Failed to build chart")?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(num_categories)
        .x_label_formatter(&|x| category_label(&bar.categories, *x))
        .x_desc(bar.x_label.as_str())
        .y_desc("count")
        .draw()
        .context("Failed to draw mesh")?;

    let mut baseline = vec![0.0; num_categories];

    for (series_idx, series) in bar.series.iter().enumerate() {
        let color = palette(series_idx);
        let rects: Vec<Rectangle<(f64, f64)>> = series
            .counts
            .iter()
            .enumerate()
            .map(|(cat_idx, &count)| {
                let corners = match bar.position {
                    BarPosition::Dodge => {
                        let bar_width = 0.8 / num_series as f64;
                        let offset = (series_idx as f64 - (num_series as f64 - 1.0) / 2.0) * bar_width;
                        let x_center = cat_idx as f64 + 0.5 + offset;
                        [(x_center - bar_width / 2.0, 0.0), (x_center + bar_width / 2.0, count)]
                    }
                    BarPosition::Stack => {
                        let x_center = cat_idx as f64 + 0.5;
                        let bottom = baseline[cat_idx];
                        baseline[cat_idx] += count;
                        [(x_center - 0.4, bottom), (x_center + 0.4, bottom + count)]
                    }
                };
                Rectangle::new(corners, color.filled())
            })
            .collect();

        let anno = chart.draw_series(rects).context("Failed to draw bars")?;
        if bar.group_label.is_some() {
            anno.label(series.key.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }
    }

    if bar.group_label.is_some() {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .context("Failed to draw legend")?;
    }

    Ok(())
}

/// Horizontal placement of scatter/line points
enum XAxis {
    Numeric,
    /// Text x values, placed at category centers in first-appearance order
    Labels(Vec<String>),
}

impl XAxis {
    fn for_series(series: &[Series]) -> Self {
        let numeric = series
            .iter()
            .flat_map(|s| &s.points)
            .all(|p| matches!(p.x, Datum::Number(_)));
        if numeric {
            return XAxis::Numeric;
        }

        let mut labels: Vec<String> = Vec::new();
        for point in series.iter().flat_map(|s| &s.points) {
            let label = point.x.as_label();
            if !labels.contains(&label) {
                labels.push(label);
            }
        }
        XAxis::Labels(labels)
    }

    fn position(&self, x: &Datum) -> f64 {
        match (self, x) {
            (XAxis::Numeric, Datum::Number(v)) => *v,
            (XAxis::Labels(labels), datum) => {
                let label = datum.as_label();
                labels.iter().position(|l| *l == label).unwrap_or(0) as f64 + 0.5
            }
            (XAxis::Numeric, Datum::Label(_)) => f64::NAN,
        }
    }
}

fn draw_xy<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, xy: &XyChart, lines: bool) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let axis = XAxis::for_series(&xy.series);
    let x_range = match &axis {
        XAxis::Numeric => padded_range(xy.series.iter().flat_map(|s| &s.points).map(|p| axis.position(&p.x))),
        XAxis::Labels(labels) => 0.0..(labels.len().max(1) as f64),
    };
    let y_range = padded_range(xy.series.iter().flat_map(|s| &s.points).map(|p| p.y));

    let mut chart = ChartBuilder::on(root)
        .margin(10)
        .caption(format!("{} vs {}", xy.y_label, xy.x_label), (FONT, 20))
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_range, y_range)
        .context("Failed to build chart")?;

    let label_formatter = |x: &f64| match &axis {
        XAxis::Labels(labels) => category_label(labels, *x),
        XAxis::Numeric => String::new(),
    };
    let mut mesh = chart.configure_mesh();
    mesh.x_desc(xy.x_label.as_str()).y_desc(xy.y_label.as_str());
    if let XAxis::Labels(labels) = &axis {
        mesh.disable_x_mesh()
            .x_labels(labels.len())
            .x_label_formatter(&label_formatter);
    }
    mesh.draw().context("Failed to draw mesh")?;

    for (idx, series) in xy.series.iter().enumerate() {
        let color = palette(idx);
        let points: Vec<(f64, f64)> = series
            .points
            .iter()
            .map(|p| (axis.position(&p.x), p.y))
            .collect();

        let anno = if lines {
            chart
                .draw_series(LineSeries::new(points.clone(), color.stroke_width(2)))
                .context("Failed to draw line series")?;
            chart
                .draw_series(points.iter().map(|&(x, y)| Circle::new((x, y), 2, color.filled())))
                .context("Failed to draw line markers")?
        } else {
            chart
                .draw_series(points.iter().map(|&(x, y)| Circle::new((x, y), 3, color.mix(0.7).filled())))
                .context("Failed to draw point series")?
        };

        if xy.color_label.is_some() {
            anno.label(series.key.as_str())
                .legend(move |(x, y)| Circle::new((x + 5, y), 4, color.filled()));
        }
    }

    if xy.color_label.is_some() {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .context("Failed to draw legend")?;
    }

    Ok(())
}

fn draw_box<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, bx: &BoxChart) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let num_categories = bx.categories.len();
    let num_groups = bx.groups.len().max(1);

    let y_range = padded_range(bx.boxes.iter().flat_map(|b| {
        std::iter::once(b.lower_whisker)
            .chain(std::iter::once(b.upper_whisker))
            .chain(b.outliers.iter().copied())
    }));

    let mut chart = ChartBuilder::on(root)
        .margin(10)
        .caption(format!("{} by {}", bx.y_label, bx.x_label), (FONT, 20))
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..(num_categories.max(1) as f64), y_range)
        .context("Failed to build chart")?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(num_categories)
        .x_label_formatter(&|x| category_label(&bx.categories, *x))
        .x_desc(bx.x_label.as_str())
        .y_desc(bx.y_label.as_str())
        .draw()
        .context("Failed to draw mesh")?;

    let box_width = 0.6 / num_groups as f64;

    for stats in &bx.boxes {
        let cat_idx = bx.categories.iter().position(|c| *c == stats.category).unwrap_or(0);
        let group_idx = stats
            .group
            .as_ref()
            .and_then(|g| bx.groups.iter().position(|k| k == g))
            .unwrap_or(0);
        let color = palette(group_idx);

        let offset = (group_idx as f64 - (num_groups as f64 - 1.0) / 2.0) * box_width;
        let cx = cat_idx as f64 + 0.5 + offset;
        let (left, right) = (cx - box_width * 0.45, cx + box_width * 0.45);

        chart
            .draw_series([
                Rectangle::new([(left, stats.q1), (right, stats.q3)], color.mix(0.3).filled()),
                Rectangle::new([(left, stats.q1), (right, stats.q3)], color.stroke_width(1)),
            ])
            .context("Failed to draw box")?;

        let segments = vec![
            vec![(left, stats.median), (right, stats.median)],
            vec![(cx, stats.q3), (cx, stats.upper_whisker)],
            vec![(cx, stats.q1), (cx, stats.lower_whisker)],
            vec![(cx - box_width * 0.2, stats.upper_whisker), (cx + box_width * 0.2, stats.upper_whisker)],
            vec![(cx - box_width * 0.2, stats.lower_whisker), (cx + box_width * 0.2, stats.lower_whisker)],
        ];
        chart
            .draw_series(segments.into_iter().map(|s| PathElement::new(s, color.stroke_width(2))))
            .context("Failed to draw whiskers")?;

        chart
            .draw_series(stats.outliers.iter().map(|&y| Circle::new((cx, y), 3, color.stroke_width(1))))
            .context("Failed to draw outliers")?;
    }

    if bx.group_label.is_some() {
        for (idx, group) in bx.groups.iter().enumerate() {
            let color = palette(idx);
            chart
                .draw_series(std::iter::empty::<Circle<(f64, f64), i32>>())
                .context("Failed to register legend")?
                .label(group.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .context("Failed to draw legend")?;
    }

    Ok(())
}

fn draw_histogram<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, hist: &HistogramChart) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let x_range = match (hist.bins.first(), hist.bins.last()) {
        (Some(first), Some(last)) => first.start..last.end,
        _ => 0.0..1.0,
    };
    let y_max = hist.bins.iter().map(|b| b.count as f64).fold(0.0, f64::max);

    let mut chart = ChartBuilder::on(root)
        .margin(10)
        .caption(format!("Distribution of {}", hist.x_label), (FONT, 20))
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_range, count_range(y_max))
        .context("Failed to build chart")?;

    chart
        .configure_mesh()
        .x_desc(hist.x_label.as_str())
        .y_desc("count")
        .draw()
        .context("Failed to draw mesh")?;

    let color = palette(0);
    chart
        .draw_series(hist.bins.iter().map(|b| {
            Rectangle::new([(b.start, 0.0), (b.end, b.count as f64)], color.mix(0.8).filled())
        }))
        .context("Failed to draw bins")?;
    chart
        .draw_series(hist.bins.iter().map(|b| {
            Rectangle::new([(b.start, 0.0), (b.end, b.count as f64)], WHITE.stroke_width(1))
        }))
        .context("Failed to draw bin borders")?;

    Ok(())
}

/// Diverging blue-white-red scale over [-1, 1]
fn correlation_color(r: Option<f64>) -> RGBColor {
    let Some(r) = r else {
        return MISSING_CELL;
    };
    let t = r.clamp(-1.0, 1.0).abs();
    let end = if r >= 0.0 { PALETTE[3] } else { PALETTE[0] };
    let mix = |c: u8| (255.0 + (c as f64 - 255.0) * t).round() as u8;
    RGBColor(mix(end.0), mix(end.1), mix(end.2))
}

fn draw_heatmap<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, heat: &HeatmapChart) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let n = heat.columns.len();
    // Row 0 is drawn at the top
    let row_label = |y: f64| {
        if y < 0.0 || y as usize >= n {
            String::new()
        } else {
            heat.columns[n - 1 - y as usize].clone()
        }
    };

    let mut chart = ChartBuilder::on(root)
        .margin(10)
        .caption("Correlation matrix", (FONT, 20))
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d(0.0..(n as f64), 0.0..(n as f64))
        .context("Failed to build chart")?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(n)
        .y_labels(n)
        .x_label_formatter(&|x| category_label(&heat.columns, *x))
        .y_label_formatter(&|y| row_label(*y))
        .draw()
        .context("Failed to draw mesh")?;

    let cells: Vec<(usize, usize, Option<f64>)> = heat
        .matrix
        .iter()
        .enumerate()
        .flat_map(|(i, row)| row.iter().enumerate().map(move |(j, r)| (i, j, *r)))
        .collect();

    chart
        .draw_series(cells.iter().map(|&(i, j, r)| {
            let y = (n - 1 - i) as f64;
            Rectangle::new([(j as f64, y), (j as f64 + 1.0, y + 1.0)], correlation_color(r).filled())
        }))
        .context("Failed to draw cells")?;

    let style = (FONT, 14)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center));
    chart
        .draw_series(cells.iter().map(|&(i, j, r)| {
            let y = (n - 1 - i) as f64 + 0.5;
            let text = r.map(|r| format!("{:.2}", r)).unwrap_or_else(|| "NA".to_string());
            Text::new(text, (j as f64 + 0.5, y), style.clone())
        }))
        .context("Failed to draw cell labels")?;

    Ok(())
}

fn draw_forest<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, forest: &ForestChart) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let n = forest.rows.len();
    let x_range = padded_range(forest.rows.iter().flat_map(|r| {
        let bounds = if forest.show_ci { [r.ci_lower, r.ci_upper] } else { [None, None] };
        std::iter::once(r.mean).chain(bounds).flatten()
    }));

    let row_label = |y: f64| {
        if y < 0.0 || y as usize >= n {
            return String::new();
        }
        let row = &forest.rows[n - 1 - y as usize];
        format!("{} (n={})", row.group, row.n)
    };

    let caption = match &forest.group_label {
        Some(group) => format!("Mean {} by {}", forest.variable, group),
        None => format!("Mean {}", forest.variable),
    };
    let x_desc = if forest.show_ci {
        format!("{} ({:.0}% CI)", forest.variable, forest.ci_level * 100.0)
    } else {
        forest.variable.clone()
    };

    let mut chart = ChartBuilder::on(root)
        .margin(10)
        .caption(caption, (FONT, 20))
        .x_label_area_size(40)
        .y_label_area_size(120)
        .build_cartesian_2d(x_range, 0.0..(n.max(1) as f64))
        .context("Failed to build chart")?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(n)
        .y_label_formatter(&|y| row_label(*y))
        .x_desc(x_desc)
        .draw()
        .context("Failed to draw mesh")?;

    let color = palette(0);
    for (idx, row) in forest.rows.iter().enumerate() {
        let y = (n - 1 - idx) as f64 + 0.5;

        if forest.show_ci {
            if let (Some(lo), Some(hi)) = (row.ci_lower, row.ci_upper) {
                chart
                    .draw_series([
                        PathElement::new(vec![(lo, y), (hi, y)], BLACK.stroke_width(2)),
                        PathElement::new(vec![(lo, y - 0.1), (lo, y + 0.1)], BLACK.stroke_width(2)),
                        PathElement::new(vec![(hi, y - 0.1), (hi, y + 0.1)], BLACK.stroke_width(2)),
                    ])
                    .context("Failed to draw interval")?;
            }
        }

        if let Some(mean) = row.mean {
            chart
                .draw_series(std::iter::once(Circle::new((mean, y), 6, color.filled())))
                .context("Failed to draw estimate")?;
        }
    }

    Ok(())
}

/// Placeholder in place of a chart: capability gaps in grey, errors in red
fn draw_error<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, err: &ErrorChart) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let (width, height) = root.dim_in_pixel();
    let center = (width as i32 / 2, height as i32 / 2);

    let (title, color) = if err.is_placeholder() {
        ("Not available in this build", RGBColor(110, 110, 110))
    } else {
        ("Cannot draw this chart", RED)
    };

    let anchor = Pos::new(HPos::Center, VPos::Center);
    root.draw(&Text::new(
        title,
        (center.0, center.1 - 16),
        (FONT, 22).into_font().color(&color).pos(anchor),
    ))
    .context("Failed to draw placeholder title")?;
    root.draw(&Text::new(
        err.message(),
        (center.0, center.1 + 16),
        (FONT, 16).into_font().color(&BLACK).pos(anchor),
    ))
    .context("Failed to draw placeholder message")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use crate::ir::{BarSeries, Bin};

    const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

    fn options(format: OutputFormat) -> RenderOptions {
        RenderOptions { width: 320, height: 240, format }
    }

    #[test]
    fn test_padded_range() {
        assert_eq!(padded_range(vec![]), 0.0..1.0);
        assert_eq!(padded_range(vec![2.0, 2.0]), 1.0..3.0);
        let r = padded_range(vec![0.0, 10.0]);
        assert!((r.start + 0.5).abs() < 1e-12 && (r.end - 10.5).abs() < 1e-12);
    }

    #[test]
    fn test_correlation_color_endpoints() {
        assert_eq!(correlation_color(Some(0.0)), WHITE);
        assert_eq!(correlation_color(Some(1.0)), PALETTE[3]);
        assert_eq!(correlation_color(Some(-1.0)), PALETTE[0]);
        assert_eq!(correlation_color(None), MISSING_CELL);
    }

    #[test]
    fn test_category_label_bounds() {
        let cats = vec!["a".to_string(), "b".to_string()];
        assert_eq!(category_label(&cats, 0.5), "a");
        assert_eq!(category_label(&cats, 1.2), "b");
        assert_eq!(category_label(&cats, 2.0), "");
        assert_eq!(category_label(&cats, -0.5), "");
    }

    #[test]
    fn test_render_histogram_png() {
        let chart = Chart::Ready(ChartSpec::Histogram(HistogramChart {
            x_label: "v".into(),
            bin_width: 1.0,
            bins: vec![Bin { start: 0.0, end: 1.0, count: 3 }, Bin { start: 1.0, end: 2.0, count: 1 }],
        }));
        let bytes = render_chart(&chart, &options(OutputFormat::Png)).unwrap();
        assert_eq!(&bytes[..8], &PNG_SIGNATURE);
    }

    #[test]
    fn test_render_stacked_bar_svg() {
        let chart = Chart::Ready(ChartSpec::Bar(BarChart {
            x_label: "x".into(),
            group_label: Some("g".into()),
            categories: vec!["a".into(), "b".into()],
            series: vec![
                BarSeries { key: "p".into(), counts: vec![1.0, 2.0] },
                BarSeries { key: "q".into(), counts: vec![3.0, 0.0] },
            ],
            position: BarPosition::Stack,
        }));
        let bytes = render_chart(&chart, &options(OutputFormat::Svg)).unwrap();
        let svg = String::from_utf8(bytes).unwrap();
        assert!(svg.starts_with("<svg"));
    }

    #[test]
    fn test_render_error_placeholder() {
        let chart = Chart::Failed(ErrorChart {
            error: RenderError::InsufficientData("no rows".into()).into(),
        });
        let bytes = render_chart(&chart, &options(OutputFormat::Png)).unwrap();
        assert_eq!(&bytes[..8], &PNG_SIGNATURE);
    }

    #[test]
    fn test_zero_size_is_rejected() {
        let chart = Chart::Failed(ErrorChart {
            error: RenderError::InsufficientData("no rows".into()).into(),
        });
        let opts = RenderOptions { width: 0, height: 10, format: OutputFormat::Png };
        assert!(render_chart(&chart, &opts).is_err());
    }

    #[test]
    fn test_oversized_bitmap_is_rejected() {
        let chart = Chart::Failed(ErrorChart {
            error: RenderError::InsufficientData("no rows".into()).into(),
        });
        let opts = RenderOptions { width: 70_000, height: 70_000, format: OutputFormat::Png };
        let err = render_chart(&chart, &opts).unwrap_err();
        assert!(err.to_string().contains("too large"));

        let opts = RenderOptions { width: u32::MAX, height: u32::MAX, format: OutputFormat::Png };
        assert!(render_chart(&chart, &opts).is_err());
    }
}
