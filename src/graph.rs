use crate::ir::{Axis, ChartSpec, ChartType, Series, SeriesKind};
use crate::sunburst::{branch_totals, SunburstTree};
use crate::transform::to_number;
use crate::{OutputFormat, RenderOptions};
use anyhow::{Context, Result};
use image::ImageEncoder;
use plotters::chart::SeriesAnno;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::collections::HashMap;
use std::f64::consts::{PI, TAU};
use std::ops::Range;

/// Fraction of a category slot covered by bars
const BAR_SPAN: f64 = 0.8;

/// Render a chart to PNG or SVG bytes
pub fn render_chart(spec: &ChartSpec, options: &RenderOptions) -> Result<Vec<u8>> {
    let (width, height) = (options.width, options.height);
    if width == 0 || height == 0 {
        anyhow::bail!("Image size must be positive (got {}x{})", width, height);
    }

    match options.format {
        OutputFormat::Png => {
            let mut buffer = vec![0u8; width as usize * height as usize * 3];
            {
                let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
                draw_chart(&root, spec)?;
                root.present().context("Failed to present drawing")?;
            }
            encode_png(&buffer, width, height)
        }
        OutputFormat::Svg => {
            let mut svg = String::new();
            {
                let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
                draw_chart(&root, spec)?;
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

fn draw_chart<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, spec: &ChartSpec) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).context("Failed to fill background")?;
    match spec.chart_type {
        ChartType::Pie => draw_pie(root, spec),
        ChartType::Sunburst => draw_sunburst(root, spec),
        _ => draw_cartesian(root, spec),
    }
}

// =============================================================================
// Cartesian charts: bar, line, scatter, combo
// =============================================================================

fn draw_cartesian<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, spec: &ChartSpec) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let numeric_x = spec.chart_type == ChartType::Scatter;
    let cats = categories(&spec.series);
    let cat_index: HashMap<&str, usize> = cats.iter().enumerate().map(|(i, c)| (c.as_str(), i)).collect();

    let x_range = if numeric_x {
        let xs: Vec<f64> = spec
            .series
            .iter()
            .flat_map(|s| s.x.iter().flatten().map(to_number))
            .collect();
        padded_range(&xs, false)
    } else {
        -0.5..(cats.len().max(1) as f64 - 0.5)
    };

    let (primary, secondary): (Vec<&Series>, Vec<&Series>) =
        spec.series.iter().partition(|s| s.axis == Axis::Primary);
    let bars: Vec<&Series> = primary.iter().copied().filter(|s| s.kind == SeriesKind::Bar).collect();
    let bar_values = bar_matrix(&bars, &cat_index);

    let mut y_values: Vec<f64> = primary
        .iter()
        .filter(|s| s.kind != SeriesKind::Bar)
        .flat_map(|s| s.y.iter().flatten().copied())
        .collect();
    if spec.layout.stacked {
        y_values.extend(stack_extents(&bar_values));
    } else {
        y_values.extend(bar_values.iter().flatten().copied());
    }
    let y_range = padded_range(&y_values, !bars.is_empty());
    let y2_range = if secondary.is_empty() {
        y_range.clone()
    } else {
        let values: Vec<f64> = secondary.iter().flat_map(|s| s.y.iter().flatten().copied()).collect();
        padded_range(&values, false)
    };

    let mut builder = ChartBuilder::on(root);
    builder
        .margin(10)
        .caption(&spec.layout.title, ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(50);
    if !secondary.is_empty() {
        builder.right_y_label_area_size(50);
    }
    let mut chart = builder
        .build_cartesian_2d(x_range.clone(), y_range)
        .context("Failed to build chart")?
        .set_secondary_coord(x_range, y2_range);

    let formatter = |x: &f64| category_label(&cats, *x);
    let mut mesh = chart.configure_mesh();
    if !numeric_x {
        mesh.x_labels(cats.len().max(1)).x_label_formatter(&formatter);
    }
    mesh.draw().context("Failed to draw mesh")?;
    if !secondary.is_empty() {
        chart
            .configure_secondary_axes()
            .draw()
            .context("Failed to draw secondary axis")?;
    }

    // Bars: side by side, or stacked with positives up and negatives down
    let mut pos_base = vec![0.0; cats.len()];
    let mut neg_base = vec![0.0; cats.len()];
    let slot = BAR_SPAN / bars.len().max(1) as f64;
    for (si, series) in bars.iter().enumerate() {
        let color = parse_color(&series.color);
        let rects: Vec<Rectangle<(f64, f64)>> = bar_values[si]
            .iter()
            .enumerate()
            .map(|(ci, &v)| {
                let center = ci as f64;
                let (x0, x1, y0) = if spec.layout.stacked {
                    let base = if v >= 0.0 { &mut pos_base[ci] } else { &mut neg_base[ci] };
                    let y0 = *base;
                    *base += v;
                    (center - BAR_SPAN / 2.0, center + BAR_SPAN / 2.0, y0)
                } else {
                    let left = center - BAR_SPAN / 2.0 + si as f64 * slot;
                    (left, left + slot, 0.0)
                };
                Rectangle::new([(x0, y0), (x1, y0 + v)], color.filled())
            })
            .collect();
        let anno = chart.draw_series(rects).context("Failed to draw bars")?;
        add_legend(anno, series, color);
    }

    for series in spec.series.iter().filter(|s| s.kind != SeriesKind::Bar) {
        let color = parse_color(&series.color);
        let points = if numeric_x {
            numeric_points(series)
        } else {
            category_points(series, &cat_index)
        };
        match (series.kind, series.axis) {
            (SeriesKind::Scatter, _) => {
                let anno = chart
                    .draw_series(points.iter().map(|&p| Circle::new(p, 4, color.filled())))
                    .context("Failed to draw points")?;
                add_legend(anno, series, color);
            }
            (SeriesKind::Line, Axis::Primary) => {
                chart
                    .draw_series(points.iter().map(|&p| Circle::new(p, 3, color.filled())))
                    .context("Failed to draw markers")?;
                let anno = chart
                    .draw_series(LineSeries::new(points, color.stroke_width(2)))
                    .context("Failed to draw line")?;
                add_legend(anno, series, color);
            }
            (SeriesKind::Line, Axis::Secondary) => {
                chart
                    .draw_secondary_series(points.iter().map(|&p| Circle::new(p, 3, color.filled())))
                    .context("Failed to draw markers")?;
                let anno = chart
                    .draw_secondary_series(LineSeries::new(points, color.stroke_width(2)))
                    .context("Failed to draw line")?;
                add_legend(anno, series, color);
            }
            _ => {}
        }
    }

    if spec.layout.show_legend && spec.series.iter().any(|s| s.name.is_some()) {
        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .context("Failed to draw legend")?;
    }

    Ok(())
}

fn add_legend<DB: DrawingBackend>(anno: &mut SeriesAnno<'_, DB>, series: &Series, color: RGBColor) {
    if let Some(name) = &series.name {
        anno.label(name.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }
}

/// Distinct x values across all series, in first-seen order
fn categories(series: &[Series]) -> Vec<String> {
    let mut seen = HashMap::new();
    let mut cats = Vec::new();
    for value in series.iter().flat_map(|s| s.x.iter().flatten()) {
        let label = value.to_string();
        if !seen.contains_key(&label) {
            seen.insert(label.clone(), cats.len());
            cats.push(label);
        }
    }
    cats
}

fn category_label(cats: &[String], x: f64) -> String {
    let idx = x.round();
    if (x - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    cats.get(idx as usize).cloned().unwrap_or_default()
}

fn category_points(series: &Series, index: &HashMap<&str, usize>) -> Vec<(f64, f64)> {
    let (Some(xs), Some(ys)) = (&series.x, &series.y) else {
        return Vec::new();
    };
    xs.iter()
        .zip(ys)
        .filter_map(|(x, &y)| index.get(x.to_string().as_str()).map(|&i| (i as f64, y)))
        .collect()
}

fn numeric_points(series: &Series) -> Vec<(f64, f64)> {
    let (Some(xs), Some(ys)) = (&series.x, &series.y) else {
        return Vec::new();
    };
    xs.iter().map(to_number).zip(ys.iter().copied()).collect()
}

/// Bar heights per series and category; repeated x values add up
fn bar_matrix(bars: &[&Series], index: &HashMap<&str, usize>) -> Vec<Vec<f64>> {
    bars.iter()
        .map(|series| {
            let mut row = vec![0.0; index.len()];
            for (ci, y) in category_points(series, index) {
                row[ci as usize] += y;
            }
            row
        })
        .collect()
}

/// Per-category top and bottom of the stacked bars
fn stack_extents(matrix: &[Vec<f64>]) -> Vec<f64> {
    let width = matrix.first().map_or(0, Vec::len);
    (0..width)
        .flat_map(|ci| {
            let pos: f64 = matrix.iter().map(|r| r[ci].max(0.0)).sum();
            let neg: f64 = matrix.iter().map(|r| r[ci].min(0.0)).sum();
            [pos, neg]
        })
        .collect()
}

/// Data range with 5% padding; a flat range is widened by 1 either way
fn padded_range(values: &[f64], include_zero: bool) -> Range<f64> {
    let mut min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let mut max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || !max.is_finite() {
        return 0.0..1.0;
    }
    if include_zero {
        min = min.min(0.0);
        max = max.max(0.0);
    }
    if min == max {
        (min - 1.0)..(max + 1.0)
    } else {
        let padding = (max - min) * 0.05;
        let lo = if include_zero && min == 0.0 { 0.0 } else { min - padding };
        lo..(max + padding)
    }
}

// =============================================================================
// Radial charts: pie, sunburst
// =============================================================================

fn draw_pie<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, spec: &ChartSpec) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let area = root
        .titled(&spec.layout.title, ("sans-serif", 20))
        .context("Failed to draw title")?;
    let Some(series) = spec.series.first() else {
        return Ok(());
    };
    let values = series.values.as_deref().unwrap_or_default();
    let labels = series.labels.as_deref().unwrap_or_default();
    let total: f64 = values.iter().filter(|v| **v > 0.0).sum();

    let (w, h) = area.dim_in_pixel();
    let center = (w as i32 / 2, h as i32 / 2);
    let radius = w.min(h) as f64 * 0.4;

    for (i, (start, end)) in pie_angles(values).into_iter().enumerate() {
        if end <= start {
            continue;
        }
        let color = parse_color(slice_color(series, i));
        area.draw(&Polygon::new(sector_points(center, 0.0, radius, start, end), color.filled()))
            .context("Failed to draw slice")?;

        let label = labels.get(i).map(String::as_str).unwrap_or("");
        let share = values[i] / total * 100.0;
        let text = format!("{} ({:.1}%)", label, share);
        draw_label(&area, text, polar(center, radius * 0.65, (start + end) / 2.0))?;
    }
    Ok(())
}

fn draw_sunburst<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, spec: &ChartSpec) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let area = root
        .titled(&spec.layout.title, ("sans-serif", 20))
        .context("Failed to draw title")?;
    let Some(series) = spec.series.first() else {
        return Ok(());
    };
    let tree = series_tree(series);
    let arcs = sunburst_arcs(&tree);
    let depth = arcs.iter().map(|a| a.depth).max().unwrap_or(0) + 1;

    let (w, h) = area.dim_in_pixel();
    let center = (w as i32 / 2, h as i32 / 2);
    let ring = w.min(h) as f64 * 0.45 / depth as f64;
    let colorway: &[String] = if spec.layout.colorway.is_empty() {
        &series.colors
    } else {
        &spec.layout.colorway
    };

    for arc in &arcs {
        let base = match colorway {
            [] => parse_color(&series.color),
            colors => parse_color(&colors[arc.root % colors.len()]),
        };
        let color = lighten(base, (arc.depth as f64 * 0.2).min(0.6));
        let inner = ring * arc.depth as f64;
        let outer = inner + ring;
        area.draw(&Polygon::new(sector_points(center, inner, outer, arc.start, arc.end), color.filled()))
            .context("Failed to draw sector")?;
        area.draw(&PathElement::new(
            sector_points(center, inner, outer, arc.start, arc.end),
            WHITE.stroke_width(1),
        ))
        .context("Failed to draw sector border")?;

        if arc.end - arc.start > 0.15 {
            let label = tree.labels[arc.node].clone();
            draw_label(&area, label, polar(center, inner + ring / 2.0, (arc.start + arc.end) / 2.0))?;
        }
    }
    Ok(())
}

fn draw_label<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, text: String, at: (i32, i32)) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let style = ("sans-serif", 14)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center));
    area.draw(&Text::new(text, at, style))
        .context("Failed to draw label")?;
    Ok(())
}

fn slice_color(series: &Series, i: usize) -> &str {
    if series.colors.is_empty() {
        &series.color
    } else {
        &series.colors[i % series.colors.len()]
    }
}

/// Start and end angle of every slice, clockwise from 12 o'clock.
/// Non-positive values get an empty slice.
fn pie_angles(values: &[f64]) -> Vec<(f64, f64)> {
    let total: f64 = values.iter().filter(|v| **v > 0.0).sum();
    if total <= 0.0 {
        return Vec::new();
    }
    let mut angle = 0.0;
    values
        .iter()
        .map(|v| {
            let start = angle;
            angle += v.max(0.0) / total * TAU;
            (start, angle)
        })
        .collect()
}

/// One placed sunburst node
#[derive(Debug, Clone, PartialEq)]
struct SunArc {
    node: usize,
    /// Ordinal of the top-level ancestor, used to pick the colour
    root: usize,
    depth: usize,
    start: f64,
    end: f64,
}

fn series_tree(series: &Series) -> SunburstTree {
    let labels = series.labels.clone().unwrap_or_default();
    SunburstTree {
        ids: series.ids.clone().unwrap_or_else(|| labels.clone()),
        labels,
        parents: series.parents.clone().unwrap_or_default(),
        values: series.values.clone(),
    }
}

/// Lay the tree out radially: top-level nodes share the full circle by
/// total, and each child takes its share of the parent's angle.
/// Nodes unreachable from a top-level node are not drawn.
fn sunburst_arcs(tree: &SunburstTree) -> Vec<SunArc> {
    let totals = branch_totals(tree);
    let n = tree.ids.len();
    let position: HashMap<&str, usize> = tree.ids.iter().enumerate().map(|(i, id)| (id.as_str(), i)).collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut roots = Vec::new();
    for (i, parent) in tree.parents.iter().enumerate().take(n) {
        match position.get(parent.as_str()) {
            Some(&p) if p != i && !parent.is_empty() => children[p].push(i),
            _ => roots.push(i),
        }
    }

    let mut arcs = Vec::new();
    let root_total: f64 = roots.iter().map(|&r| totals[r]).sum();
    if root_total <= 0.0 {
        return arcs;
    }

    let mut visited = vec![false; n];
    let mut stack = Vec::new();
    let mut angle = 0.0;
    for (ordinal, &r) in roots.iter().enumerate() {
        let span = totals[r] / root_total * TAU;
        stack.push(SunArc { node: r, root: ordinal, depth: 0, start: angle, end: angle + span });
        angle += span;
    }

    while let Some(arc) = stack.pop() {
        if std::mem::replace(&mut visited[arc.node], true) {
            continue;
        }
        let kids = &children[arc.node];
        let kid_sum: f64 = kids.iter().map(|&c| totals[c]).sum();
        let scale = totals[arc.node].max(kid_sum);
        if scale > 0.0 {
            let mut a = arc.start;
            for &c in kids {
                let span = (arc.end - arc.start) * totals[c] / scale;
                stack.push(SunArc { node: c, root: arc.root, depth: arc.depth + 1, start: a, end: a + span });
                a += span;
            }
        }
        arcs.push(arc);
    }
    arcs
}

fn polar(center: (i32, i32), r: f64, angle: f64) -> (i32, i32) {
    (
        center.0 + (r * angle.sin()).round() as i32,
        center.1 - (r * angle.cos()).round() as i32,
    )
}

/// Outline of an annular sector; an inner radius of 0 gives a pie slice
fn sector_points(center: (i32, i32), inner: f64, outer: f64, start: f64, end: f64) -> Vec<(i32, i32)> {
    let steps = ((end - start) / (PI / 90.0)).ceil().max(1.0) as usize;
    let step = (end - start) / steps as f64;
    let mut points: Vec<(i32, i32)> = (0..=steps).map(|k| polar(center, outer, start + step * k as f64)).collect();
    if inner <= 0.0 {
        points.push(center);
    } else {
        points.extend((0..=steps).rev().map(|k| polar(center, inner, start + step * k as f64)));
    }
    points
}

fn lighten(color: RGBColor, amount: f64) -> RGBColor {
    let mix = |c: u8| (c as f64 + (255.0 - c as f64) * amount).round() as u8;
    RGBColor(mix(color.0), mix(color.1), mix(color.2))
}

/// Parse `#rrggbb`, `#rgb` or a basic colour name; anything else is blue
pub fn parse_color(color: &str) -> RGBColor {
    let color = color.trim();
    if let Some(hex) = color.strip_prefix('#').filter(|h| h.is_ascii()) {
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        let parsed = match hex.len() {
            6 => channel(&hex[0..2]).zip(channel(&hex[2..4])).zip(channel(&hex[4..6])),
            3 => channel(&hex[0..1])
                .zip(channel(&hex[1..2]))
                .zip(channel(&hex[2..3]))
                .map(|((r, g), b)| ((r * 17, g * 17), b * 17)),
            _ => None,
        };
        if let Some(((r, g), b)) = parsed {
            return RGBColor(r, g, b);
        }
    }
    match color.to_ascii_lowercase().as_str() {
        "red" => RED,
        "green" => GREEN,
        "blue" => BLUE,
        "black" => BLACK,
        "yellow" => YELLOW,
        "cyan" => CYAN,
        "magenta" => MAGENTA,
        "white" => WHITE,
        "orange" => RGBColor(255, 165, 0),
        "purple" => RGBColor(128, 0, 128),
        "gray" | "grey" => RGBColor(128, 128, 128),
        _ => BLUE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;

    fn series(kind: SeriesKind, x: &[&str], y: &[f64]) -> Series {
        let mut s = Series::new(kind, "#000000".to_string());
        s.x = Some(x.iter().map(|v| Value::from(*v)).collect());
        s.y = Some(y.to_vec());
        s
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("#60a5fa"), RGBColor(0x60, 0xa5, 0xfa));
        assert_eq!(parse_color("#fff"), RGBColor(255, 255, 255));
        assert_eq!(parse_color("Red"), RED);
        assert_eq!(parse_color("#zzzzzz"), BLUE);
        assert_eq!(parse_color("chartreuse"), BLUE);
    }

    #[test]
    fn test_parse_color_multibyte_falls_back() {
        assert_eq!(parse_color("#\u{e9}a"), BLUE);
        assert_eq!(parse_color("#a\u{e9}\u{e9}a"), BLUE);
        assert_eq!(parse_color("#\u{e9}\u{e9}\u{e9}"), BLUE);
    }

    #[test]
    fn test_render_svg_with_multibyte_color() {
        let mut s = series(SeriesKind::Bar, &["a", "b"], &[1.0, 2.0]);
        s.color = "#\u{e9}a".to_string();
        let spec = ChartSpec {
            chart_type: ChartType::Bar,
            series: vec![s],
            layout: crate::ir::Layout::new(""),
        };
        let options = RenderOptions {
            width: 200,
            height: 100,
            format: OutputFormat::Svg,
        };
        // may still fail without system fonts, but must not panic
        let _ = render_chart(&spec, &options);
    }

    #[test]
    fn test_categories_first_seen_across_series() {
        let a = series(SeriesKind::Bar, &["Jan", "Feb"], &[1.0, 2.0]);
        let b = series(SeriesKind::Bar, &["Mar", "Jan"], &[3.0, 4.0]);
        assert_eq!(categories(&[a, b]), vec!["Jan", "Feb", "Mar"]);
    }

    #[test]
    fn test_category_label_only_on_integers() {
        let cats = vec!["a".to_string(), "b".to_string()];
        assert_eq!(category_label(&cats, 1.0), "b");
        assert_eq!(category_label(&cats, 0.5), "");
        assert_eq!(category_label(&cats, 2.0), "");
        assert_eq!(category_label(&cats, -1.0), "");
    }

    #[test]
    fn test_bar_matrix_sums_repeated_categories() {
        let s = series(SeriesKind::Bar, &["a", "b", "a"], &[1.0, 2.0, 3.0]);
        let index: HashMap<&str, usize> = [("a", 0), ("b", 1)].into_iter().collect();
        assert_eq!(bar_matrix(&[&s], &index), vec![vec![4.0, 2.0]]);
    }

    #[test]
    fn test_stack_extents() {
        let matrix = vec![vec![1.0, -2.0], vec![3.0, 1.0]];
        assert_eq!(stack_extents(&matrix), vec![4.0, 0.0, 1.0, -2.0]);
    }

    #[test]
    fn test_padded_range() {
        assert_eq!(padded_range(&[], false), 0.0..1.0);
        assert_eq!(padded_range(&[5.0, 5.0], false), 4.0..6.0);
        let r = padded_range(&[10.0, 20.0], true);
        assert_eq!(r.start, 0.0);
        assert_eq!(r.end, 21.0);
    }

    #[test]
    fn test_pie_angles() {
        let angles = pie_angles(&[1.0, -3.0, 3.0]);
        assert_eq!(angles.len(), 3);
        assert!((angles[0].1 - TAU / 4.0).abs() < 1e-9);
        assert_eq!(angles[1].0, angles[1].1);
        assert!((angles[2].1 - TAU).abs() < 1e-9);
        assert!(pie_angles(&[0.0, 0.0]).is_empty());
    }

    #[test]
    fn test_sunburst_arcs_nest_inside_parents() {
        let tree = SunburstTree {
            ids: vec!["EU".into(), "EU / FR".into(), "EU / DE".into(), "US".into()],
            labels: vec!["EU".into(), "FR".into(), "DE".into(), "US".into()],
            parents: vec!["".into(), "EU".into(), "EU".into(), "".into()],
            values: Some(vec![0.0, 2.0, 1.0, 1.0]),
        };
        let mut arcs = sunburst_arcs(&tree);
        arcs.sort_by_key(|a| a.node);
        assert_eq!(arcs.len(), 4);

        let eu = &arcs[0];
        assert_eq!(eu.depth, 0);
        assert!((eu.end - eu.start - TAU * 0.75).abs() < 1e-9);
        let fr = &arcs[1];
        assert_eq!(fr.depth, 1);
        assert_eq!(fr.root, eu.root);
        assert!((fr.end - fr.start - TAU * 0.5).abs() < 1e-9);
        assert!(fr.start >= eu.start && arcs[2].end <= eu.end + 1e-9);
        assert_ne!(arcs[3].root, eu.root);
    }

    #[test]
    fn test_sunburst_arcs_ignore_cycles() {
        let tree = SunburstTree {
            ids: vec!["a".into(), "b".into(), "root".into()],
            labels: vec!["a".into(), "b".into(), "root".into()],
            parents: vec!["b".into(), "a".into(), "".into()],
            values: None,
        };
        let arcs = sunburst_arcs(&tree);
        assert_eq!(arcs.len(), 1);
        assert_eq!(arcs[0].node, 2);
    }

    #[test]
    fn test_sector_points_close_on_center() {
        let pts = sector_points((100, 100), 0.0, 50.0, 0.0, PI / 2.0);
        assert_eq!(pts.first(), Some(&(100, 50)));
        assert_eq!(pts.last(), Some(&(100, 100)));
        let ring = sector_points((0, 0), 10.0, 20.0, 0.0, PI);
        assert_eq!(ring.len() % 2, 0);
    }

    #[test]
    fn test_lighten() {
        assert_eq!(lighten(RGBColor(0, 0, 0), 0.5), RGBColor(128, 128, 128));
        assert_eq!(lighten(RGBColor(10, 20, 30), 0.0), RGBColor(10, 20, 30));
    }

    #[test]
    fn test_zero_size_is_rejected() {
        let spec = ChartSpec {
            chart_type: ChartType::Bar,
            series: vec![],
            layout: crate::ir::Layout::new(""),
        };
        let options = RenderOptions {
            width: 0,
            ..Default::default()
        };
        assert!(render_chart(&spec, &options).is_err());
    }
}
