use crate::config::SourceDescriptor;
use crate::data::RowSet;
use crate::error::SourceError;
use crate::range::slice_rows;
use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info};

/// Transport that turns a location (URL or file path) into text
pub trait Fetch {
    fn fetch_text(&self, location: &str) -> Result<String, SourceError>;
}

/// Fetches `http(s)://` locations over the network and reads everything
/// else from disk, relative to `base_dir` when one is set.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    pub base_dir: Option<PathBuf>,
    pub timeout: Duration,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self {
            base_dir: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl HttpFetcher {
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
            ..Default::default()
        }
    }

    #[cfg(feature = "http")]
    fn fetch_remote(&self, url: &str) -> Result<String, SourceError> {
        let fail = |reason: String| SourceError::Fetch {
            location: url.to_string(),
            reason,
        };
        let response = ureq::get(url)
            .timeout(self.timeout)
            .call()
            .map_err(|e| fail(e.to_string()))?;
        response.into_string().map_err(|e| fail(e.to_string()))
    }

    #[cfg(not(feature = "http"))]
    fn fetch_remote(&self, url: &str) -> Result<String, SourceError> {
        Err(SourceError::Fetch {
            location: url.to_string(),
            reason: "built without the 'http' feature".to_string(),
        })
    }
}

impl Fetch for HttpFetcher {
    fn fetch_text(&self, location: &str) -> Result<String, SourceError> {
        if is_remote(location) {
            return self.fetch_remote(location);
        }
        let path = match &self.base_dir {
            Some(dir) => dir.join(location),
            None => PathBuf::from(location),
        };
        std::fs::read_to_string(&path).map_err(|e| SourceError::Fetch {
            location: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

fn is_remote(location: &str) -> bool {
    let lower = location.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Load the rows a source descriptor points at.
///
/// A `range` on the source is applied client-side unless it was already
/// requested from the sheet export.
pub fn resolve_source(
    source: Option<&SourceDescriptor>,
    fetcher: &dyn Fetch,
) -> Result<RowSet, SourceError> {
    let source = source.ok_or(SourceError::Missing)?;
    info!(kind = %source.kind, "resolving source");

    let mut range_applied = false;
    let rows = match source.kind.as_str() {
        "inline" => {
            let rows = source.rows.as_ref().filter(|r| r.is_array()).ok_or_else(|| {
                SourceError::MissingField {
                    kind: source.kind.clone(),
                    field: "rows",
                }
            })?;
            RowSet::from_json(rows)?
        }
        "csv" => {
            let path = required(source, "path", &source.path)?;
            load_csv(path, fetcher)?
        }
        "url" => {
            let url = required(source, "url", &source.url)?;
            load_csv(url, fetcher)?
        }
        "google_sheet" | "google_form" => {
            let link = source
                .url
                .as_deref()
                .or(source.sheet_url.as_deref())
                .filter(|s| !s.is_empty())
                .ok_or_else(|| SourceError::MissingField {
                    kind: source.kind.clone(),
                    field: "url",
                })?;
            let export = google_csv_url(
                link,
                source.sheet.as_deref(),
                source.range.as_deref(),
                source.query.as_deref(),
            );
            range_applied = export.range_applied;
            load_csv(&export.url, fetcher)?
        }
        other => return Err(SourceError::UnknownType(other.to_string())),
    };

    match source.range.as_deref().filter(|r| !r.is_empty()) {
        Some(range) if !range_applied => Ok(slice_rows(&rows, range)),
        _ => Ok(rows),
    }
}

fn required<'a>(
    source: &SourceDescriptor,
    field: &'static str,
    value: &'a Option<String>,
) -> Result<&'a str, SourceError> {
    value
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| SourceError::MissingField {
            kind: source.kind.clone(),
            field,
        })
}

fn load_csv(location: &str, fetcher: &dyn Fetch) -> Result<RowSet, SourceError> {
    let text = fetcher.fetch_text(location)?;
    let rows = RowSet::from_csv_str(&text)?;
    debug!(location, rows = rows.len(), "parsed csv");
    Ok(rows)
}

/// A derived CSV export location
#[derive(Debug, Clone, PartialEq)]
pub struct SheetExport {
    pub url: String,
    /// The cell range was included in the export request
    pub range_applied: bool,
}

/// Derive a CSV export URL from a Google Sheets link.
///
/// Links that are not Sheets links (or carry no document id) are returned
/// unchanged and treated as direct CSV URLs. Export variant priority:
/// sheet+range, then the link's `gid`, then sheet name, then the first tab.
pub fn google_csv_url(
    link: &str,
    sheet: Option<&str>,
    range: Option<&str>,
    query: Option<&str>,
) -> SheetExport {
    let passthrough = || SheetExport {
        url: link.to_string(),
        range_applied: false,
    };

    let Some(parts) = UrlParts::split(link) else {
        return passthrough();
    };
    if !parts.host.contains("docs.google.com") {
        return passthrough();
    }
    let Some(id) = document_id(parts.path) else {
        return passthrough();
    };

    let sheet = sheet.filter(|s| !s.is_empty());
    let range = range.filter(|s| !s.is_empty());
    let gid = param(parts.query, "gid").or_else(|| param(parts.fragment, "gid"));

    let mut url = format!("https://docs.google.com/spreadsheets/d/{}/gviz/tq?tqx=out:csv", id);
    let mut range_applied = false;
    match (sheet, range, gid) {
        (Some(sheet), Some(range), _) => {
            url.push_str(&format!(
                "&sheet={}&range={}",
                urlencoding::encode(sheet),
                urlencoding::encode(range)
            ));
            range_applied = true;
        }
        (_, _, Some(gid)) => url.push_str(&format!("&gid={}", gid)),
        (Some(sheet), None, None) => url.push_str(&format!("&sheet={}", urlencoding::encode(sheet))),
        (None, _, None) => {}
    }
    if let Some(tq) = query.filter(|q| !q.is_empty()) {
        url.push_str(&format!("&tq={}", urlencoding::encode(tq)));
    }

    SheetExport { url, range_applied }
}

struct UrlParts<'a> {
    host: &'a str,
    path: &'a str,
    query: &'a str,
    fragment: &'a str,
}

impl<'a> UrlParts<'a> {
    fn split(link: &'a str) -> Option<Self> {
        let (scheme, rest) = link.trim().split_once("://")?;
        if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c)) {
            return None;
        }
        let (rest, fragment) = rest.split_once('#').unwrap_or((rest, ""));
        let (rest, query) = rest.split_once('?').unwrap_or((rest, ""));
        let (authority, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, ""),
        };
        // drop credentials and port
        let host = authority.rsplit('@').next().unwrap_or(authority);
        let host = host.split(':').next().unwrap_or(host);
        if host.is_empty() {
            return None;
        }
        Some(Self {
            host,
            path,
            query,
            fragment,
        })
    }
}

fn document_id(path: &str) -> Option<&str> {
    static DOC_ID: OnceLock<Regex> = OnceLock::new();
    let re = DOC_ID.get_or_init(|| Regex::new(r"/d/([a-zA-Z0-9_-]+)").expect("valid document id pattern"));
    re.captures(path).and_then(|c| c.get(1)).map(|m| m.as_str())
}

fn param<'a>(pairs: &'a str, name: &str) -> Option<&'a str> {
    pairs
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, v)| *k == name && !v.is_empty())
        .map(|(_, v)| v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;
    use serde_json::json;
    use std::collections::HashMap;

    /// In-memory transport keyed by location
    struct MapFetcher(HashMap<String, String>);

    impl Fetch for MapFetcher {
        fn fetch_text(&self, location: &str) -> Result<String, SourceError> {
            self.0.get(location).cloned().ok_or_else(|| SourceError::Fetch {
                location: location.to_string(),
                reason: "not found".to_string(),
            })
        }
    }

    fn fetcher(entries: &[(&str, &str)]) -> MapFetcher {
        MapFetcher(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_google_url_gid_from_fragment() {
        let export = google_csv_url("https://docs.google.com/spreadsheets/d/ABC123/edit#gid=99", None, None, None);
        assert_eq!(
            export.url,
            "https://docs.google.com/spreadsheets/d/ABC123/gviz/tq?tqx=out:csv&gid=99"
        );
    }

    #[test]
    fn test_google_url_priority() {
        let link = "https://docs.google.com/spreadsheets/d/ABC/edit?gid=7";
        let both = google_csv_url(link, Some("Q1 Sales"), Some("A1:C9"), None);
        assert_eq!(
            both.url,
            "https://docs.google.com/spreadsheets/d/ABC/gviz/tq?tqx=out:csv&sheet=Q1%20Sales&range=A1%3AC9"
        );
        assert!(both.range_applied);

        let gid = google_csv_url(link, Some("Q1"), None, None);
        assert!(gid.url.ends_with("&gid=7"));
        assert!(!gid.range_applied);

        let by_name = google_csv_url("https://docs.google.com/spreadsheets/d/ABC/edit", Some("Q1"), Some("A1:B2"), None)
            .url;
        assert!(by_name.ends_with("&sheet=Q1&range=A1%3AB2"));

        let name_only = google_csv_url("https://docs.google.com/spreadsheets/d/ABC/edit", Some("Q1"), None, None);
        assert!(name_only.url.ends_with("tqx=out:csv&sheet=Q1"));

        let plain = google_csv_url("https://docs.google.com/spreadsheets/d/ABC/edit", None, Some("A1:B2"), None);
        assert!(plain.url.ends_with("tqx=out:csv"));
        assert!(!plain.range_applied);
    }

    #[test]
    fn test_google_url_query() {
        let export = google_csv_url(
            "https://docs.google.com/spreadsheets/d/ABC/edit",
            None,
            None,
            Some("select A, B"),
        );
        assert!(export.url.ends_with("tqx=out:csv&tq=select%20A%2C%20B"));
    }

    #[test]
    fn test_google_url_passthrough() {
        let other = "https://example.com/data.csv";
        assert_eq!(google_csv_url(other, None, None, None).url, other);
        let no_id = "https://docs.google.com/spreadsheets/u/0/";
        assert_eq!(google_csv_url(no_id, None, None, None).url, no_id);
        assert_eq!(google_csv_url("not a url", None, None, None).url, "not a url");
    }

    #[test]
    fn test_resolve_inline() {
        let source = SourceDescriptor::inline(json!([{"k": "a"}, {"k": "b"}]));
        let rows = resolve_source(Some(&source), &fetcher(&[])).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.rows[1][0], Value::from("b"));
    }

    #[test]
    fn test_resolve_csv_with_client_side_range() {
        let source = SourceDescriptor {
            kind: "csv".to_string(),
            path: Some("data.csv".to_string()),
            range: Some("B2:B3".to_string()),
            ..Default::default()
        };
        let f = fetcher(&[("data.csv", "a,b\n1,2\n3,4\n5,6\n")]);
        let rows = resolve_source(Some(&source), &f).unwrap();
        assert_eq!(rows.headers, vec!["b"]);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_resolve_google_sheet_uses_export_url() {
        let source = SourceDescriptor {
            kind: "google_form".to_string(),
            sheet_url: Some("https://docs.google.com/spreadsheets/d/XYZ/edit?gid=3".to_string()),
            ..Default::default()
        };
        let f = fetcher(&[(
            "https://docs.google.com/spreadsheets/d/XYZ/gviz/tq?tqx=out:csv&gid=3",
            "answer\nyes\n",
        )]);
        let rows = resolve_source(Some(&source), &f).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_resolve_sheet_range_not_sliced_twice() {
        let source = SourceDescriptor {
            kind: "google_sheet".to_string(),
            url: Some("https://docs.google.com/spreadsheets/d/XYZ/edit".to_string()),
            sheet: Some("Q1".to_string()),
            range: Some("B2:B2".to_string()),
            ..Default::default()
        };
        // the export already holds just the requested cells
        let f = fetcher(&[(
            "https://docs.google.com/spreadsheets/d/XYZ/gviz/tq?tqx=out:csv&sheet=Q1&range=B2%3AB2",
            "a,b\n1,2\n3,4\n",
        )]);
        let rows = resolve_source(Some(&source), &f).unwrap();
        assert_eq!(rows.headers, vec!["a", "b"]);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_google_url_document_id_stops_at_path_end() {
        let export = google_csv_url("https://docs.google.com/spreadsheets/d/a-B_9/htmlview", None, None, None);
        assert!(export.url.starts_with("https://docs.google.com/spreadsheets/d/a-B_9/gviz/"));
    }

    #[test]
    fn test_resolve_errors() {
        let f = fetcher(&[]);
        assert!(matches!(resolve_source(None, &f), Err(SourceError::Missing)));

        let unknown = SourceDescriptor {
            kind: "ftp".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            resolve_source(Some(&unknown), &f),
            Err(SourceError::UnknownType(_))
        ));

        let no_path = SourceDescriptor {
            kind: "csv".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            resolve_source(Some(&no_path), &f),
            Err(SourceError::MissingField { field: "path", .. })
        ));

        let no_rows = SourceDescriptor {
            kind: "inline".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            resolve_source(Some(&no_rows), &f),
            Err(SourceError::MissingField { field: "rows", .. })
        ));

        let unreachable = SourceDescriptor {
            kind: "url".to_string(),
            url: Some("https://example.com/missing.csv".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            resolve_source(Some(&unreachable), &f),
            Err(SourceError::Fetch { .. })
        ));
    }

    #[test]
    fn test_http_fetcher_reads_relative_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("rows.csv"), "a\n1\n").unwrap();
        let f = HttpFetcher::with_base_dir(dir.path());
        assert_eq!(f.fetch_text("rows.csv").unwrap(), "a\n1\n");
        assert!(f.fetch_text("missing.csv").is_err());
    }
}
