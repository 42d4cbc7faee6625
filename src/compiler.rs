use crate::config::ChartConfig;
use crate::data::{cell, RowSet, Value};
use crate::ir::{Axis, BranchValues, ChartSpec, ChartType, Layout, Series, SeriesKind};
use crate::palette::Palette;
use crate::resolve::{Column, ResolvedMapping, SunburstMapping, XyMapping};
use crate::sunburst::{build_from_labels, build_from_path, SunburstTree};
use crate::transform::{count_by, group_by, to_number};

/// Presentation choices that are not column mappings
#[derive(Debug, Clone)]
pub struct ChartStyle {
    pub title: String,
    pub palette: Palette,
    pub stacked: bool,
    pub bar_name: String,
    pub line_name: String,
}

impl ChartStyle {
    pub fn new(title: impl Into<String>, palette: Palette) -> Self {
        Self {
            title: title.into(),
            palette,
            stacked: false,
            bar_name: "Bar".to_string(),
            line_name: "Line".to_string(),
        }
    }

    /// Read the style of a configured chart; `fallback` is used when the
    /// chart names no colours.
    pub fn from_config(config: &ChartConfig, fallback: Palette) -> Self {
        let opts = &config.chart;
        let mut style = Self::new(
            config.display_title(),
            Palette::from_colors(opts.options.colors.as_deref(), fallback),
        );
        style.stacked = opts.stacked.unwrap_or(false);
        if let Some(name) = opts.bar_name.as_ref().filter(|n| !n.is_empty()) {
            style.bar_name = name.clone();
        }
        if let Some(name) = opts.line_name.as_ref().filter(|n| !n.is_empty()) {
            style.line_name = name.clone();
        }
        style
    }
}

impl ResolvedMapping {
    pub fn chart_type(&self) -> ChartType {
        match self {
            ResolvedMapping::Bar(_) => ChartType::Bar,
            ResolvedMapping::Line(_) => ChartType::Line,
            ResolvedMapping::Scatter(_) => ChartType::Scatter,
            ResolvedMapping::Pie { .. } => ChartType::Pie,
            ResolvedMapping::Combo { .. } => ChartType::Combo,
            ResolvedMapping::Sunburst(_) => ChartType::Sunburst,
        }
    }
}

/// Build the chart specification for a resolved mapping over `rows`
pub fn compile_chart(mapping: &ResolvedMapping, rows: &RowSet, style: &ChartStyle) -> ChartSpec {
    let mut layout = Layout::new(style.title.clone());
    let palette = &style.palette;

    let series = match mapping {
        ResolvedMapping::Bar(xy) => {
            layout.stacked = style.stacked;
            xy_series(SeriesKind::Bar, xy, rows, palette)
        }
        ResolvedMapping::Line(xy) => xy_series(SeriesKind::Line, xy, rows, palette),
        ResolvedMapping::Scatter(xy) => xy_series(SeriesKind::Scatter, xy, rows, palette),
        ResolvedMapping::Pie { label, value } => {
            layout.show_legend = false;
            vec![pie_series(label, value.as_ref(), rows, palette)]
        }
        ResolvedMapping::Combo { x, bar, line } => {
            layout.secondary_axis = true;
            combo_series(x, bar, line, rows, style)
        }
        ResolvedMapping::Sunburst(sb) => {
            let series = sunburst_series(sb, rows, palette);
            if series.values.is_some() {
                layout.branch_values = Some(BranchValues::Total);
            }
            layout.colorway = palette.colors().to_vec();
            vec![series]
        }
    };

    ChartSpec {
        chart_type: mapping.chart_type(),
        series,
        layout,
    }
}

/// Bar, line and scatter: one series, or one per group value.
/// Scatter coerces x to numbers; bar and line keep x categorical.
fn xy_series(kind: SeriesKind, xy: &XyMapping, rows: &RowSet, palette: &Palette) -> Vec<Series> {
    let numeric_x = kind == SeriesKind::Scatter;
    let build = |subset: &[&[Value]], name: Option<String>, color: &str| {
        let mut series = Series::new(kind, color.to_string());
        series.name = name;
        series.x = Some(
            subset
                .iter()
                .map(|r| {
                    let v = cell(r, xy.x.index);
                    if numeric_x {
                        Value::Number(to_number(v))
                    } else {
                        v.clone()
                    }
                })
                .collect(),
        );
        series.y = Some(subset.iter().map(|r| to_number(cell(r, xy.y.index))).collect());
        series
    };

    match &xy.group {
        Some(group) => group_by(&rows.rows, group.index)
            .into_iter()
            .enumerate()
            .map(|(i, g)| build(g.rows.as_slice(), Some(g.key.to_string()), palette.color(i)))
            .collect(),
        None => {
            let all: Vec<&[Value]> = rows.rows.iter().map(Vec::as_slice).collect();
            vec![build(&all, None, palette.color(0))]
        }
    }
}

/// Row-aligned slices with a value column, otherwise counts per label
fn pie_series(label: &Column, value: Option<&Column>, rows: &RowSet, palette: &Palette) -> Series {
    let (labels, values): (Vec<String>, Vec<f64>) = match value {
        Some(value) => (
            rows.rows.iter().map(|r| cell(r, label.index).to_string()).collect(),
            rows.rows.iter().map(|r| to_number(cell(r, value.index))).collect(),
        ),
        None => count_by(&rows.rows, label.index)
            .into_iter()
            .map(|(k, n)| (k.to_string(), n as f64))
            .unzip(),
    };

    let mut series = Series::new(SeriesKind::Pie, palette.color(0).to_string());
    series.labels = Some(labels);
    series.values = Some(values);
    series.colors = palette.colors().to_vec();
    series
}

/// Bars on the primary axis, a line on the secondary one
fn combo_series(x: &Column, bar: &Column, line: &Column, rows: &RowSet, style: &ChartStyle) -> Vec<Series> {
    let xs: Vec<Value> = rows.rows.iter().map(|r| cell(r, x.index).clone()).collect();

    let mut bars = Series::new(SeriesKind::Bar, style.palette.color(0).to_string());
    bars.name = Some(style.bar_name.clone());
    bars.x = Some(xs.clone());
    bars.y = Some(rows.rows.iter().map(|r| to_number(cell(r, bar.index))).collect());

    let mut trend = Series::new(SeriesKind::Line, style.palette.color(1).to_string());
    trend.name = Some(style.line_name.clone());
    trend.x = Some(xs);
    trend.y = Some(rows.rows.iter().map(|r| to_number(cell(r, line.index))).collect());
    trend.axis = Axis::Secondary;

    vec![bars, trend]
}

fn sunburst_series(mapping: &SunburstMapping, rows: &RowSet, palette: &Palette) -> Series {
    let (tree, synthetic_ids) = match mapping {
        SunburstMapping::Path { path, value } => {
            let cols: Vec<Option<usize>> = path.iter().map(|c| c.index).collect();
            let nodes = build_from_path(&rows.rows, &cols, value.as_ref().map(|v| v.index));
            (SunburstTree::from(nodes), true)
        }
        SunburstMapping::Labels { labels, parents, value } => (
            build_from_labels(
                &rows.rows,
                labels.index,
                parents.index,
                value.as_ref().map(|v| v.index),
            ),
            false,
        ),
    };

    let mut series = Series::new(SeriesKind::Sunburst, palette.color(0).to_string());
    series.ids = synthetic_ids.then_some(tree.ids);
    series.labels = Some(tree.labels);
    series.parents = Some(tree.parents);
    series.values = tree.values;
    series.colors = palette.colors().to_vec();
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChartOptions, Mapping, StyleOptions};
    use crate::resolve::resolve_mapping;

    fn make_data() -> RowSet {
        RowSet::from_csv_str(
            "month,region,sales,profit\n\
             Jan,EU,10,1\n\
             Jan,US,20,2\n\
             Feb,EU,15,3\n\
             Feb,US,n/a,4\n",
        )
        .unwrap()
    }

    fn compile(chart_type: ChartType, mapping: Mapping, rows: &RowSet) -> ChartSpec {
        let resolved = resolve_mapping(chart_type, &mapping, &rows.headers).unwrap();
        compile_chart(&resolved, rows, &ChartStyle::new("Test", Palette::playground()))
    }

    fn col(name: &str) -> Option<String> {
        Some(name.to_string())
    }

    #[test]
    fn test_bar_single_series() {
        let data = make_data();
        let spec = compile(
            ChartType::Bar,
            Mapping { x: col("month"), y: col("sales"), ..Default::default() },
            &data,
        );
        assert_eq!(spec.chart_type, ChartType::Bar);
        assert_eq!(spec.series.len(), 1);
        let s = &spec.series[0];
        assert_eq!(s.color, "#60a5fa");
        assert!(s.name.is_none());
        assert_eq!(s.y.as_ref().unwrap(), &vec![10.0, 20.0, 15.0, 0.0]);
        assert_eq!(s.x.as_ref().unwrap()[0], Value::from("Jan"));
    }

    #[test]
    fn test_grouped_line_series_follow_first_seen_order() {
        let data = make_data();
        let spec = compile(
            ChartType::Line,
            Mapping { x: col("month"), y: col("profit"), group: col("region"), ..Default::default() },
            &data,
        );
        assert_eq!(spec.series.len(), 2);
        assert_eq!(spec.series[0].name.as_deref(), Some("EU"));
        assert_eq!(spec.series[0].color, "#60a5fa");
        assert_eq!(spec.series[0].y.as_ref().unwrap(), &vec![1.0, 3.0]);
        assert_eq!(spec.series[1].name.as_deref(), Some("US"));
        assert_eq!(spec.series[1].color, "#34d399");
        assert_eq!(spec.series[1].kind, SeriesKind::Line);
    }

    #[test]
    fn test_group_colors_wrap_around_palette() {
        let rows = RowSet::from_csv_str("x,y,g\n1,1,a\n1,1,b\n1,1,c\n").unwrap();
        let mapping = Mapping { x: col("x"), y: col("y"), group: col("g"), ..Default::default() };
        let resolved = resolve_mapping(ChartType::Bar, &mapping, &rows.headers).unwrap();
        let custom = vec!["red".to_string(), "blue".to_string()];
        let palette = Palette::from_colors(Some(custom.as_slice()), Palette::dashboard());
        let spec = compile_chart(&resolved, &rows, &ChartStyle::new("", palette));
        let colors: Vec<&str> = spec.series.iter().map(|s| s.color.as_str()).collect();
        assert_eq!(colors, vec!["red", "blue", "red"]);
    }

    #[test]
    fn test_scatter_coerces_x() {
        let rows = RowSet::from_csv_str("h,w\n1.5,60\nabc,70\n").unwrap();
        let spec = compile(ChartType::Scatter, Mapping { x: col("h"), y: col("w"), ..Default::default() }, &rows);
        assert_eq!(
            spec.series[0].x.as_ref().unwrap(),
            &vec![Value::Number(1.5), Value::Number(0.0)]
        );
        assert_eq!(spec.series[0].kind, SeriesKind::Scatter);
    }

    #[test]
    fn test_stacked_only_affects_bar() {
        let data = make_data();
        let mapping = Mapping { x: col("month"), y: col("sales"), ..Default::default() };
        let mut style = ChartStyle::new("", Palette::playground());
        style.stacked = true;

        let bar = resolve_mapping(ChartType::Bar, &mapping, &data.headers).unwrap();
        assert!(compile_chart(&bar, &data, &style).layout.stacked);
        let line = resolve_mapping(ChartType::Line, &mapping, &data.headers).unwrap();
        assert!(!compile_chart(&line, &data, &style).layout.stacked);
    }

    #[test]
    fn test_pie_counts_without_value() {
        let rows = RowSet::from_csv_str("k\na\na\nb\n").unwrap();
        let spec = compile(ChartType::Pie, Mapping { label: col("k"), ..Default::default() }, &rows);
        let s = &spec.series[0];
        assert_eq!(s.labels.as_ref().unwrap(), &vec!["a".to_string(), "b".to_string()]);
        assert_eq!(s.values.as_ref().unwrap(), &vec![2.0, 1.0]);
        assert!(!spec.layout.show_legend);
        assert_eq!(s.colors.len(), 6);
    }

    #[test]
    fn test_pie_row_aligned_with_value() {
        let data = make_data();
        let spec = compile(ChartType::Pie, Mapping { x: col("region"), y: col("profit"), ..Default::default() }, &data);
        let s = &spec.series[0];
        assert_eq!(s.labels.as_ref().unwrap().len(), 4);
        assert_eq!(s.values.as_ref().unwrap(), &vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_combo_two_series_second_on_secondary_axis() {
        let rows = RowSet::from_csv_str("x,y1,y2\n1,10,5\n2,20,15\n").unwrap();
        let spec = compile(
            ChartType::Combo,
            Mapping { x: col("x"), bar: col("y1"), line: col("y2"), ..Default::default() },
            &rows,
        );
        assert_eq!(spec.series.len(), 2);
        assert_eq!(spec.series[0].kind, SeriesKind::Bar);
        assert_eq!(spec.series[0].axis, Axis::Primary);
        assert_eq!(spec.series[0].y.as_ref().unwrap(), &vec![10.0, 20.0]);
        assert_eq!(spec.series[1].kind, SeriesKind::Line);
        assert_eq!(spec.series[1].axis, Axis::Secondary);
        assert_eq!(spec.series[1].y.as_ref().unwrap(), &vec![5.0, 15.0]);
        assert_eq!(spec.series[1].name.as_deref(), Some("Line"));
        assert!(spec.layout.secondary_axis);
    }

    #[test]
    fn test_sunburst_path_series() {
        let rows = RowSet::from_csv_str("R,C\nEU,FR\nEU,DE\nEU,FR\n").unwrap();
        let spec = compile(
            ChartType::Sunburst,
            Mapping { path: Some(vec!["R".to_string(), "C".to_string()]), ..Default::default() },
            &rows,
        );
        let s = &spec.series[0];
        assert_eq!(s.ids.as_ref().unwrap(), &vec!["EU", "EU / FR", "EU / DE"]);
        assert_eq!(s.parents.as_ref().unwrap(), &vec!["", "EU", "EU"]);
        assert_eq!(s.values.as_ref().unwrap(), &vec![0.0, 2.0, 1.0]);
        assert_eq!(spec.layout.branch_values, Some(BranchValues::Total));
        assert_eq!(spec.layout.colorway.len(), 6);
    }

    #[test]
    fn test_sunburst_labels_without_values() {
        let rows = RowSet::from_csv_str("node,parent\nroot,\nleaf,root\n").unwrap();
        let spec = compile(
            ChartType::Sunburst,
            Mapping { labels: col("node"), parents: col("parent"), ..Default::default() },
            &rows,
        );
        let s = &spec.series[0];
        assert!(s.ids.is_none());
        assert!(s.values.is_none());
        assert!(spec.layout.branch_values.is_none());
    }

    #[test]
    fn test_style_from_config() {
        let config = ChartConfig {
            id: Some("kpi".to_string()),
            chart: ChartOptions {
                stacked: Some(true),
                bar_name: Some("Revenue".to_string()),
                options: StyleOptions { colors: Some(vec![]) },
                ..Default::default()
            },
            ..Default::default()
        };
        let style = ChartStyle::from_config(&config, Palette::dashboard());
        assert_eq!(style.title, "kpi");
        assert!(style.stacked);
        assert_eq!(style.bar_name, "Revenue");
        assert_eq!(style.line_name, "Line");
        assert_eq!(style.palette.len(), 8);
    }
}
