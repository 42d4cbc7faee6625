use crate::config::ChartConfig;
use crate::data::{cell, RowSet};
use crate::ir::{Axis, ChartSpec, Series, SeriesKind};
use anyhow::{Context, Result};
use serde_json::{json, Map, Value as JsonValue};

/// Rows kept in a JSON export next to the chart config
pub const SAMPLE_ROWS: usize = 20;

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";
const GRID_COLOR: &str = "rgba(255,255,255,.12)";
const TRANSPARENT: &str = "rgba(0,0,0,0)";

/// Header plus one line per row; fields holding a comma, quote or newline
/// are quoted. Nulls are written as empty fields.
pub fn to_csv(rows: &RowSet) -> Result<String> {
    if rows.headers.is_empty() {
        return Ok(String::new());
    }
    let mut wtr = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());
    wtr.write_record(&rows.headers)
        .context("Failed to write CSV header")?;
    for row in &rows.rows {
        let fields = (0..rows.headers.len()).map(|i| cell(row, Some(i)).to_string());
        wtr.write_record(fields).context("Failed to write CSV row")?;
    }
    let bytes = wtr.into_inner().context("Failed to flush CSV output")?;
    let mut text = String::from_utf8(bytes).context("CSV output is not UTF-8")?;
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

/// `{chart, sample}`: the chart config and the first rows it was built from
pub fn json_sample(config: &ChartConfig, rows: &RowSet) -> Result<String> {
    let doc = json!({
        "chart": config,
        "sample": rows.to_json(Some(SAMPLE_ROWS)),
    });
    serde_json::to_string_pretty(&doc).context("Failed to serialize JSON export")
}

/// The chart as a Plotly figure, `{data, layout}`
pub fn plotly_figure(spec: &ChartSpec) -> JsonValue {
    json!({
        "data": spec.series.iter().map(plotly_trace).collect::<Vec<_>>(),
        "layout": plotly_layout(spec),
    })
}

fn plotly_trace(series: &Series) -> JsonValue {
    let mut trace = Map::new();
    let mut put = |key: &str, value: JsonValue| {
        trace.insert(key.to_string(), value);
    };

    match series.kind {
        SeriesKind::Bar => {
            put("type", json!("bar"));
            put("marker", json!({ "color": series.color }));
        }
        SeriesKind::Line => {
            put("type", json!("scatter"));
            put("mode", json!("lines+markers"));
            put("line", json!({ "shape": "spline", "color": series.color }));
            put("marker", json!({ "size": 6 }));
        }
        SeriesKind::Scatter => {
            put("type", json!("scatter"));
            put("mode", json!("markers"));
            put("marker", json!({ "size": 8, "color": series.color }));
        }
        SeriesKind::Pie => {
            put("type", json!("pie"));
            put("textinfo", json!("label+percent"));
            put("marker", json!({ "colors": series.colors }));
        }
        SeriesKind::Sunburst => {
            put("type", json!("sunburst"));
            put("marker", json!({ "colors": series.colors }));
            if series.values.is_some() {
                put("branchvalues", json!("total"));
            }
        }
    }

    if let Some(name) = &series.name {
        put("name", json!(name));
    }
    if let Some(x) = &series.x {
        put("x", json!(x));
    }
    if let Some(y) = &series.y {
        put("y", json!(y));
    }
    if let Some(ids) = &series.ids {
        put("ids", json!(ids));
    }
    if let Some(labels) = &series.labels {
        put("labels", json!(labels));
    }
    if let Some(parents) = &series.parents {
        put("parents", json!(parents));
    }
    if let Some(values) = &series.values {
        put("values", json!(values));
    }
    if series.axis == Axis::Secondary {
        put("yaxis", json!("y2"));
    }

    JsonValue::Object(trace)
}

fn plotly_layout(spec: &ChartSpec) -> JsonValue {
    let layout = &spec.layout;
    let mut out = Map::new();
    out.insert("title".to_string(), json!({ "text": layout.title, "font": { "size": 18 } }));
    out.insert("margin".to_string(), json!({ "l": 40, "r": 30, "t": 40, "b": 40 }));
    out.insert("paper_bgcolor".to_string(), json!(TRANSPARENT));
    out.insert("plot_bgcolor".to_string(), json!(TRANSPARENT));
    out.insert("xaxis".to_string(), json!({ "gridcolor": GRID_COLOR }));
    out.insert("yaxis".to_string(), json!({ "gridcolor": GRID_COLOR }));

    if layout.stacked {
        out.insert("barmode".to_string(), json!("stack"));
    }
    if !layout.show_legend {
        out.insert("showlegend".to_string(), json!(false));
    }
    if layout.secondary_axis {
        out.insert("yaxis2".to_string(), json!({ "overlaying": "y", "side": "right" }));
    }
    if !layout.colorway.is_empty() {
        out.insert("sunburstcolorway".to_string(), json!(layout.colorway));
        out.insert("extendsunburstcolors".to_string(), json!(true));
    }
    JsonValue::Object(out)
}

/// Standalone HTML that draws the chart with Plotly from the CDN
pub fn embed_snippet(spec: &ChartSpec) -> String {
    let figure = plotly_figure(spec);
    format!(
        "<div id=\"myChart\"></div>\n<script src=\"{}\"></script>\n<script>Plotly.newPlot('myChart', {}, {});</script>",
        PLOTLY_CDN,
        script_json(&figure["data"]),
        script_json(&figure["layout"]),
    )
}

/// JSON that cannot close the surrounding script element
fn script_json(value: &JsonValue) -> String {
    value.to_string().replace("</", "<\\/")
}
