use crate::compiler::{compile_chart, ChartStyle};
use crate::config::{ChartConfig, Dashboard};
use crate::data::RowSet;
use crate::error::ChartError;
use crate::ir::{ChartSpec, ChartType};
use crate::palette::Palette;
use crate::resolve::resolve_mapping;
use crate::source::{resolve_source, Fetch};
use tracing::{info, warn};

/// The result of building one dashboard chart
#[derive(Debug)]
pub struct ChartOutcome<'a> {
    pub config: &'a ChartConfig,
    /// Rows the chart was built from; empty when the source failed
    pub rows: RowSet,
    pub result: Result<ChartSpec, ChartError>,
}

impl ChartOutcome<'_> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Build a chart spec from a config and already-loaded rows.
///
/// Unknown chart types and unmappable roles are reported as errors; the
/// palette falls back to the dashboard colours.
pub fn build_chart(config: &ChartConfig, rows: &RowSet) -> Result<ChartSpec, ChartError> {
    let tag = config.chart.type_tag();
    let chart_type: ChartType = tag
        .parse()
        .map_err(ChartError::UnsupportedChartType)?;
    let mapping = resolve_mapping(chart_type, &config.mapping, &rows.headers)?;
    let style = ChartStyle::from_config(config, Palette::dashboard());
    Ok(compile_chart(&mapping, rows, &style))
}

/// Load one chart's source and build it.
pub fn render_chart<'a>(config: &'a ChartConfig, fetcher: &dyn Fetch) -> ChartOutcome<'a> {
    let (rows, result) = match resolve_source(config.source.as_ref(), fetcher) {
        Ok(rows) => {
            let result = build_chart(config, &rows);
            (rows, result)
        }
        Err(e) => (RowSet::default(), Err(ChartError::from(e))),
    };

    match &result {
        Ok(spec) => info!(
            chart = config.file_stem(),
            kind = %spec.chart_type,
            series = spec.series.len(),
            rows = rows.len(),
            "built chart"
        ),
        Err(e) => warn!(chart = config.file_stem(), error = %e, "chart failed"),
    }

    ChartOutcome { config, rows, result }
}

/// Build every chart of a dashboard in document order.
///
/// Each chart is evaluated on its own: a failing source or mapping only
/// affects that chart's outcome.
pub fn render_dashboard<'a>(dashboard: &'a Dashboard, fetcher: &dyn Fetch) -> Vec<ChartOutcome<'a>> {
    dashboard
        .charts
        .iter()
        .map(|config| render_chart(config, fetcher))
        .collect()
}
