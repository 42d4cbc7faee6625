use crate::config::Mapping;
use crate::data::find_column;
use crate::error::MappingError;
use crate::ir::ChartType;

/// A mapped column: the header name it resolved to and its position.
///
/// `index` is None only when there were no columns to resolve against.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub index: Option<usize>,
}

/// Mapping validated for one chart type
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedMapping {
    Bar(XyMapping),
    Line(XyMapping),
    Scatter(XyMapping),
    Pie {
        label: Column,
        value: Option<Column>,
    },
    Combo {
        x: Column,
        bar: Column,
        line: Column,
    },
    Sunburst(SunburstMapping),
}

#[derive(Debug, Clone, PartialEq)]
pub struct XyMapping {
    pub x: Column,
    pub y: Column,
    pub group: Option<Column>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SunburstMapping {
    Path {
        path: Vec<Column>,
        value: Option<Column>,
    },
    Labels {
        labels: Column,
        parents: Column,
        value: Option<Column>,
    },
}

/// Check that the roles a chart type needs are mapped and that every mapped
/// column exists in `columns`.
pub fn resolve_mapping(
    chart_type: ChartType,
    mapping: &Mapping,
    columns: &[String],
) -> Result<ResolvedMapping, MappingError> {
    let resolver = Resolver { columns };
    let chart = chart_type.as_str();

    match chart_type {
        ChartType::Bar | ChartType::Line | ChartType::Scatter => {
            let (x, y) = match (role(&mapping.x), role(&mapping.y)) {
                (Some(x), Some(y)) => (x, y),
                (x, y) => return Err(missing(chart, &[("x", x), ("y", y)])),
            };
            let xy = XyMapping {
                x: resolver.column("x", x)?,
                y: resolver.column("y", y)?,
                group: resolver.optional("group", role(&mapping.group))?,
            };
            Ok(match chart_type {
                ChartType::Bar => ResolvedMapping::Bar(xy),
                ChartType::Line => ResolvedMapping::Line(xy),
                _ => ResolvedMapping::Scatter(xy),
            })
        }
        ChartType::Pie => {
            let label = role(&mapping.label)
                .or(role(&mapping.x))
                .ok_or_else(|| missing(chart, &[("label", None)]))?;
            Ok(ResolvedMapping::Pie {
                label: resolver.column("label", label)?,
                value: resolver.optional("value", role(&mapping.value).or(role(&mapping.y)))?,
            })
        }
        ChartType::Combo => {
            let x = role(&mapping.x);
            let bar = role(&mapping.bar).or(role(&mapping.y));
            let line = role(&mapping.line).or(role(&mapping.y2));
            let (x, bar, line) = match (x, bar, line) {
                (Some(x), Some(bar), Some(line)) => (x, bar, line),
                (x, bar, line) => {
                    return Err(missing(chart, &[("x", x), ("bar", bar), ("line", line)]))
                }
            };
            Ok(ResolvedMapping::Combo {
                x: resolver.column("x", x)?,
                bar: resolver.column("bar", bar)?,
                line: resolver.column("line", line)?,
            })
        }
        ChartType::Sunburst => resolve_sunburst(mapping, &resolver).map(ResolvedMapping::Sunburst),
    }
}

fn resolve_sunburst(mapping: &Mapping, resolver: &Resolver) -> Result<SunburstMapping, MappingError> {
    let path: Vec<&str> = mapping
        .path
        .iter()
        .flatten()
        .map(String::as_str)
        .filter(|c| !c.is_empty())
        .collect();

    if path.len() >= 2 {
        let path = path
            .into_iter()
            .map(|c| resolver.column("path", c))
            .collect::<Result<Vec<_>, _>>()?;
        let value = role(&mapping.value).or(role(&mapping.values));
        return Ok(SunburstMapping::Path {
            path,
            value: resolver.optional("value", value)?,
        });
    }

    match (role(&mapping.labels), role(&mapping.parents)) {
        (Some(labels), Some(parents)) => {
            let value = role(&mapping.values).or(role(&mapping.value));
            Ok(SunburstMapping::Labels {
                labels: resolver.column("labels", labels)?,
                parents: resolver.column("parents", parents)?,
                value: resolver.optional("values", value)?,
            })
        }
        _ => Err(MappingError::Sunburst),
    }
}

/// A mapped role, treating an empty column name as unmapped
fn role(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn missing(chart: &'static str, roles: &[(&'static str, Option<&str>)]) -> MappingError {
    MappingError::MissingRoles {
        chart,
        roles: roles
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(name, _)| *name)
            .collect(),
    }
}

struct Resolver<'a> {
    columns: &'a [String],
}

impl Resolver<'_> {
    fn column(&self, role: &'static str, name: &str) -> Result<Column, MappingError> {
        if self.columns.is_empty() {
            return Ok(Column {
                name: name.to_string(),
                index: None,
            });
        }
        let index = find_column(self.columns, name).ok_or_else(|| MappingError::UnknownColumn {
            role,
            column: name.to_string(),
        })?;
        Ok(Column {
            name: self.columns[index].clone(),
            index: Some(index),
        })
    }

    fn optional(&self, role: &'static str, name: Option<&str>) -> Result<Option<Column>, MappingError> {
        name.map(|n| self.column(role, n)).transpose()
    }
}
