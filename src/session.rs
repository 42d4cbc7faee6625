//! Playground session: the loaded rows, the user's palette and the current
//! chart selection, plus the conversions from a selection to a chart.

use crate::compiler::{compile_chart, ChartStyle};
use crate::config::{ChartConfig, ChartOptions, Dashboard, Mapping, SourceDescriptor, StyleOptions};
use crate::data::{RowSet, Value};
use crate::error::{ChartError, SourceError};
use crate::ir::{ChartSpec, ChartType};
use crate::palette::Palette;
use crate::resolve::resolve_mapping;
use crate::transform::parse_number;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use std::sync::OnceLock;
use tracing::debug;

/// Inline rows carried by an exported config
pub const EXPORT_ROW_LIMIT: usize = 2000;
pub const EXPORT_ID: &str = "my-chart";
pub const EXPORT_TITLE: &str = "My Generated Chart";
pub const PREVIEW_TITLE: &str = "Preview";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SunburstMode {
    #[default]
    Path,
    #[serde(other)]
    Labels,
}

/// What the user picked in the playground. Empty strings mean "(none)".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Selection {
    pub chart_type: String,
    #[serde(deserialize_with = "deserialize_flag")]
    pub stacked: bool,
    pub x_col: String,
    pub y_col: String,
    pub group_col: String,
    pub y2_col: String,
    pub sb_mode: SunburstMode,
    pub path_cols: Vec<String>,
    pub sb_value_col: String,
    pub sb_labels_col: String,
    pub sb_parents_col: String,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            chart_type: ChartType::Bar.as_str().to_string(),
            stacked: false,
            x_col: String::new(),
            y_col: String::new(),
            group_col: String::new(),
            y2_col: String::new(),
            sb_mode: SunburstMode::Path,
            path_cols: Vec::new(),
            sb_value_col: String::new(),
            sb_labels_col: String::new(),
            sb_parents_col: String::new(),
        }
    }
}

/// Saved sessions store the flag either as a boolean or as "true"/"false"
fn deserialize_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }
    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Text(s) => s == "true",
    })
}

impl Selection {
    /// Translate the selection into the roles of its chart type
    pub fn mapping(&self) -> Mapping {
        let mut mapping = Mapping::default();
        match self.chart_type.as_str() {
            "bar" | "line" | "scatter" => {
                mapping.x = picked(&self.x_col);
                mapping.y = picked(&self.y_col);
                mapping.group = picked(&self.group_col);
            }
            "pie" => {
                mapping.label = picked(&self.x_col);
                mapping.value = picked(&self.y_col);
            }
            "combo" => {
                mapping.x = picked(&self.x_col);
                mapping.bar = picked(&self.y_col);
                mapping.line = picked(&self.y2_col);
            }
            "sunburst" => match self.sb_mode {
                SunburstMode::Path => {
                    mapping.path = Some(self.path_cols.clone());
                    mapping.value = picked(&self.sb_value_col);
                }
                SunburstMode::Labels => {
                    mapping.labels = picked(&self.sb_labels_col);
                    mapping.parents = picked(&self.sb_parents_col);
                    mapping.values = picked(&self.sb_value_col);
                }
            },
            _ => {}
        }
        mapping
    }
}

fn picked(col: &str) -> Option<String> {
    (!col.is_empty()).then(|| col.to_string())
}

#[derive(Debug, Serialize, Deserialize)]
struct SavedSession {
    #[serde(default)]
    rows: JsonValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    colors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ui: Option<JsonValue>,
}

#[derive(Debug, Clone)]
pub struct Session {
    rows: RowSet,
    palette: Palette,
    pub selection: Selection,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            rows: RowSet::default(),
            palette: Palette::playground(),
            selection: Selection::default(),
        }
    }

    pub fn rows(&self) -> &RowSet {
        &self.rows
    }

    pub fn columns(&self) -> &[String] {
        &self.rows.headers
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn set_color(&mut self, index: usize, color: impl Into<String>) {
        self.palette.set(index, color);
    }

    pub fn set_palette(&mut self, palette: Palette) {
        self.palette = palette;
    }

    /// Replace the loaded rows and re-guess the column roles
    pub fn set_rows(&mut self, rows: RowSet) {
        debug!(rows = rows.len(), columns = rows.headers.len(), "session rows replaced");
        self.rows = rows;
        self.suggest_mappings();
    }

    /// Guess column roles from header names and column contents
    pub fn suggest_mappings(&mut self) {
        let cols = &self.rows.headers;
        if cols.is_empty() {
            return;
        }
        let numeric: Vec<&String> = cols
            .iter()
            .enumerate()
            .filter(|(i, _)| is_numeric_column(&self.rows, *i))
            .map(|(_, c)| c)
            .collect();
        let first_match = |re: &Regex| cols.iter().find(|c| re.is_match(c)).cloned();
        let patterns = patterns();

        let sel = &mut self.selection;
        sel.x_col = first_match(&patterns.label).unwrap_or_else(|| cols[0].clone());
        sel.y_col = numeric.first().map(|c| c.to_string()).unwrap_or_else(|| cols[0].clone());
        sel.y2_col = numeric.get(1).map(|c| c.to_string()).unwrap_or_default();
        sel.group_col = first_match(&patterns.group).unwrap_or_default();
        sel.sb_labels_col = first_match(&patterns.node).unwrap_or_default();
        sel.sb_parents_col = first_match(&patterns.parent).unwrap_or_default();
        sel.sb_value_col = numeric.first().map(|c| c.to_string()).unwrap_or_default();
    }

    pub fn mapping(&self) -> Mapping {
        self.selection.mapping()
    }

    fn chart_type(&self) -> Result<ChartType, ChartError> {
        self.selection
            .chart_type
            .parse()
            .map_err(ChartError::UnsupportedChartType)
    }

    /// Build the preview chart for the current selection
    pub fn build(&self) -> Result<ChartSpec, ChartError> {
        let chart_type = self.chart_type()?;
        let mapping = resolve_mapping(chart_type, &self.mapping(), &self.rows.headers)?;
        let mut style = ChartStyle::new(PREVIEW_TITLE, self.palette.clone());
        style.stacked = self.selection.stacked;
        Ok(compile_chart(&mapping, &self.rows, &style))
    }

    /// The selection as a self-contained chart config with inline rows
    pub fn to_config(&self) -> ChartConfig {
        ChartConfig {
            id: Some(EXPORT_ID.to_string()),
            title: Some(EXPORT_TITLE.to_string()),
            source: Some(SourceDescriptor::inline(self.rows.to_json(Some(EXPORT_ROW_LIMIT)))),
            mapping: self.mapping(),
            chart: ChartOptions {
                kind: Some(self.selection.chart_type.clone()),
                stacked: Some(self.selection.stacked),
                bar_name: None,
                line_name: None,
                options: StyleOptions {
                    colors: Some(self.palette.colors().to_vec()),
                },
            },
        }
    }

    pub fn to_dashboard(&self) -> Dashboard {
        Dashboard {
            charts: vec![self.to_config()],
        }
    }

    /// Serialize as `{rows, colors, ui}`
    pub fn save(&self) -> serde_json::Result<String> {
        let saved = SavedSession {
            rows: self.rows.to_json(None),
            colors: Some(self.palette.colors().to_vec()),
            ui: Some(serde_json::to_value(&self.selection)?),
        };
        serde_json::to_string_pretty(&saved)
    }

    /// Restore a saved session.
    ///
    /// Rows are loaded first so mappings are re-guessed; saved colours and
    /// saved UI fields then override the guesses key by key.
    pub fn load(text: &str) -> Result<Self, SourceError> {
        let saved: SavedSession =
            serde_json::from_str(text).map_err(|e| SourceError::Parse(e.to_string()))?;

        let mut session = Session::new();
        let rows = match &saved.rows {
            JsonValue::Null => RowSet::default(),
            rows => RowSet::from_json(rows)?,
        };
        session.set_rows(rows);

        if let Some(colors) = saved.colors {
            let palette = Palette::from_colors(Some(colors.as_slice()), session.palette.clone());
            session.set_palette(palette);
        }
        if let Some(JsonValue::Object(ui)) = saved.ui {
            let mut merged = serde_json::to_value(&session.selection)
                .map_err(|e| SourceError::Parse(e.to_string()))?;
            if let JsonValue::Object(current) = &mut merged {
                current.extend(ui);
            }
            session.selection =
                serde_json::from_value(merged).map_err(|e| SourceError::Parse(e.to_string()))?;
        }
        Ok(session)
    }
}

struct Patterns {
    label: Regex,
    group: Regex,
    node: Regex,
    parent: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let re = |p: &str| Regex::new(&format!("(?i){}", p)).expect("valid column pattern");
        Patterns {
            label: re("country|name|label|category|type|month|date|region|city"),
            group: re("group|gender|region|species|type|tier|team"),
            node: re("label|node|name"),
            parent: re("parent|super|root"),
        }
    })
}

/// More than 70% of the non-empty cells read as numbers
fn is_numeric_column(rows: &RowSet, col: usize) -> bool {
    let mut filled = 0usize;
    let mut numeric = 0usize;
    for row in &rows.rows {
        match row.get(col) {
            None | Some(Value::Null) => continue,
            Some(Value::String(s)) if s.is_empty() => continue,
            Some(v) => {
                filled += 1;
                if parse_number(v).is_some() {
                    numeric += 1;
                }
            }
        }
    }
    filled > 0 && numeric as f64 / filled as f64 > 0.7
}
