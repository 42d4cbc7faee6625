use thiserror::Error;

/// Everything that can stop a single chart from being built.
///
/// A dashboard keeps one of these per failed chart; the remaining charts
/// are still built.
#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    #[error("Unsupported chart type: {0}")]
    UnsupportedChartType(String),
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Missing source")]
    Missing,

    #[error("Unsupported source type '{0}'")]
    UnknownType(String),

    #[error("Source of type '{kind}' requires '{field}'")]
    MissingField { kind: String, field: &'static str },

    #[error("Failed to fetch '{location}': {reason}")]
    Fetch { location: String, reason: String },

    #[error("Failed to parse data: {0}")]
    Parse(String),
}

#[derive(Error, Debug)]
pub enum MappingError {
    #[error("{chart} chart requires {}", format_roles(.roles))]
    MissingRoles {
        chart: &'static str,
        roles: Vec<&'static str>,
    },

    #[error("Column '{column}' mapped to '{role}' not found")]
    UnknownColumn { role: &'static str, column: String },

    #[error("Sunburst requires mapping.path (at least two columns) or mapping.labels and mapping.parents")]
    Sunburst,
}

fn format_roles(roles: &[&'static str]) -> String {
    roles
        .iter()
        .map(|r| format!("mapping.{}", r))
        .collect::<Vec<_>>()
        .join(", ")
}
