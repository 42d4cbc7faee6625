use crate::data::Value;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Chart types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Line,
    Scatter,
    Pie,
    Combo,
    Sunburst,
}

impl ChartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Bar => "bar",
            ChartType::Line => "line",
            ChartType::Scatter => "scatter",
            ChartType::Pie => "pie",
            ChartType::Combo => "combo",
            ChartType::Sunburst => "sunburst",
        }
    }
}

impl FromStr for ChartType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bar" => Ok(ChartType::Bar),
            "line" => Ok(ChartType::Line),
            "scatter" => Ok(ChartType::Scatter),
            "pie" => Ok(ChartType::Pie),
            "combo" => Ok(ChartType::Combo),
            "sunburst" => Ok(ChartType::Sunburst),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Chart specification
// =============================================================================

/// Render-agnostic description of one chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub series: Vec<Series>,
    pub layout: Layout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    Bar,
    /// Lines with markers, spline-smoothed
    Line,
    /// Markers only
    Scatter,
    Pie,
    Sunburst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    #[default]
    Primary,
    Secondary,
}

/// One plotted data series.
///
/// Cartesian series fill `x`/`y`; pie and sunburst series fill
/// `labels`/`values` (and `parents`/`ids` for sunburst).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub kind: SeriesKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parents: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<f64>>,
    pub color: String,
    /// Per-slice colours for pie and sunburst
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub colors: Vec<String>,
    pub axis: Axis,
}

impl Series {
    pub fn new(kind: SeriesKind, color: String) -> Self {
        Self {
            kind,
            name: None,
            x: None,
            y: None,
            ids: None,
            labels: None,
            parents: None,
            values: None,
            color,
            colors: Vec::new(),
            axis: Axis::Primary,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchValues {
    /// A parent's size is the total of its descendants
    Total,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub title: String,
    pub stacked: bool,
    /// A second y-axis on the right, overlaying the primary one
    pub secondary_axis: bool,
    pub show_legend: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_values: Option<BranchValues>,
    /// Colourway used for hierarchical charts
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub colorway: Vec<String>,
}

impl Layout {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            stacked: false,
            secondary_axis: false,
            show_legend: true,
            branch_values: None,
            colorway: Vec::new(),
        }
    }
}
