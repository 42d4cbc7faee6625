use crate::error::SourceError;
use regex::Regex;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::io::Read;
use std::sync::OnceLock;

/// A single cell of the table.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

static NULL: Value = Value::Null;

/// 2^53; larger numerals lose precision as f64 and stay text
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

impl Value {
    /// Infer a typed value from a raw CSV field.
    ///
    /// Empty fields are null, `true`/`TRUE`/`false`/`FALSE` are booleans,
    /// decimal numerals strictly inside ±2^53 are numbers and everything else
    /// is kept as text.
    pub fn infer(raw: &str) -> Self {
        match raw {
            "" => return Value::Null,
            "true" | "TRUE" => return Value::Bool(true),
            "false" | "FALSE" => return Value::Bool(false),
            _ => {}
        }
        if float_pattern().is_match(raw) {
            if let Ok(n) = raw.trim().parse::<f64>() {
                if n.abs() < MAX_EXACT_INT {
                    return Value::Number(n);
                }
            }
        }
        Value::String(raw.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Identity used when values are compared as group keys.
    pub fn key(&self) -> GroupKey {
        match self {
            Value::Null => GroupKey::Null,
            Value::Bool(b) => GroupKey::Bool(*b),
            Value::Number(n) => {
                // -0 and 0 are the same key
                let n = if *n == 0.0 { 0.0 } else { *n };
                GroupKey::Number(n.to_bits())
            }
            Value::String(s) => GroupKey::String(s.clone()),
        }
    }

    fn from_json(value: &JsonValue, field: &str) -> Result<Self, SourceError> {
        match value {
            JsonValue::Null => Ok(Value::Null),
            JsonValue::Bool(b) => Ok(Value::Bool(*b)),
            JsonValue::Number(n) => Ok(n.as_f64().map(Value::Number).unwrap_or(Value::Null)),
            JsonValue::String(s) => Ok(Value::String(s.clone())),
            _ => Err(SourceError::Parse(format!(
                "Unsupported value type for field '{}'",
                field
            ))),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => JsonValue::String(s.clone()),
        }
    }
}

fn float_pattern() -> &'static Regex {
    static FLOAT: OnceLock<Regex> = OnceLock::new();
    FLOAT.get_or_init(|| {
        Regex::new(r"^\s*-?(\d+\.?|\.\d+|\d+\.\d+)([eE][-+]?\d+)?\s*$").expect("valid float pattern")
    })
}

fn number_to_json(n: f64) -> JsonValue {
    if n.fract() == 0.0 && n.abs() < MAX_EXACT_INT {
        JsonValue::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) if *n == 0.0 => write!(f, "0"),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => f.write_str(s),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

/// Hashable identity of a [`Value`].
///
/// Keys are type-sensitive: the number `1` and the string `"1"` differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Null,
    Bool(bool),
    Number(u64),
    String(String),
}

/// An ordered table whose column set comes from its header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl RowSet {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Locate a column, preferring an exact match over a case-insensitive one.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        find_column(&self.headers, name)
    }

    /// Parse delimited text with a header row.
    pub fn from_csv<R: Read>(reader: R) -> Result<Self, SourceError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| SourceError::Parse(e.to_string()))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record.map_err(|e| SourceError::Parse(e.to_string()))?;
            let row = (0..headers.len())
                .map(|i| record.get(i).map(Value::infer).unwrap_or(Value::Null))
                .collect();
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    pub fn from_csv_str(text: &str) -> Result<Self, SourceError> {
        Self::from_csv(text.as_bytes())
    }

    /// Create a RowSet from a JSON array of objects.
    ///
    /// The first object's keys define the columns; keys missing from later
    /// objects read as null.
    pub fn from_json(value: &JsonValue) -> Result<Self, SourceError> {
        let array = value
            .as_array()
            .ok_or_else(|| SourceError::Parse("Input data must be a JSON array of objects".to_string()))?;

        let Some(first) = array.first() else {
            return Ok(Self::default());
        };
        let first_obj = first
            .as_object()
            .ok_or_else(|| SourceError::Parse("Items in array must be objects".to_string()))?;
        let headers: Vec<String> = first_obj.keys().cloned().collect();

        let mut rows = Vec::with_capacity(array.len());
        for item in array {
            let obj = item
                .as_object()
                .ok_or_else(|| SourceError::Parse("Items in array must be objects".to_string()))?;
            let mut row = Vec::with_capacity(headers.len());
            for header in &headers {
                let val = match obj.get(header) {
                    Some(v) => Value::from_json(v, header)?,
                    None => Value::Null,
                };
                row.push(val);
            }
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    /// Rows as a JSON array of objects, keeping at most `limit` rows.
    pub fn to_json(&self, limit: Option<usize>) -> JsonValue {
        let take = limit.unwrap_or(self.rows.len());
        let rows = self
            .rows
            .iter()
            .take(take)
            .map(|row| {
                let mut obj = Map::new();
                for (i, header) in self.headers.iter().enumerate() {
                    obj.insert(header.clone(), cell(row, Some(i)).to_json());
                }
                JsonValue::Object(obj)
            })
            .collect();
        JsonValue::Array(rows)
    }
}

/// Locate a column, preferring an exact match over a case-insensitive one
pub fn find_column(headers: &[String], name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .or_else(|| headers.iter().position(|h| h.eq_ignore_ascii_case(name)))
}

/// Read one cell, tolerating short rows and unknown columns.
pub fn cell(row: &[Value], idx: Option<usize>) -> &Value {
    idx.and_then(|i| row.get(i)).unwrap_or(&NULL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_infer_types() {
        assert_eq!(Value::infer(""), Value::Null);
        assert_eq!(Value::infer("TRUE"), Value::Bool(true));
        assert_eq!(Value::infer("false"), Value::Bool(false));
        assert_eq!(Value::infer("3.5"), Value::Number(3.5));
        assert_eq!(Value::infer("-2e3"), Value::Number(-2000.0));
        assert_eq!(Value::infer(".5"), Value::Number(0.5));
        assert_eq!(Value::infer("12abc"), Value::String("12abc".to_string()));
        assert_eq!(Value::infer("inf"), Value::String("inf".to_string()));
    }

    #[test]
    fn test_infer_only_exact_boolean_spellings() {
        assert_eq!(Value::infer("TRUE"), Value::Bool(true));
        assert_eq!(Value::infer("FALSE"), Value::Bool(false));
        assert_eq!(Value::infer("True"), Value::from("True"));
        assert_eq!(Value::infer("fAlse"), Value::from("fAlse"));
    }

    #[test]
    fn test_infer_keeps_huge_integers_as_text() {
        assert_eq!(Value::infer("9007199254740991"), Value::Number(9_007_199_254_740_991.0));
        assert_eq!(Value::infer("9007199254740992"), Value::from("9007199254740992"));
        assert_eq!(Value::infer("-1e300"), Value::from("-1e300"));
    }

    #[test]
    fn test_display_matches_lexical_form() {
        assert_eq!(Value::Number(1.0).to_string(), "1");
        assert_eq!(Value::Number(-0.0).to_string(), "0");
        assert_eq!(Value::Number(2.25).to_string(), "2.25");
        assert_eq!(Value::Null.to_string(), "");
    }

    #[test]
    fn test_group_key_is_type_sensitive() {
        assert_ne!(Value::Number(1.0).key(), Value::from("1").key());
        assert_eq!(Value::Number(0.0).key(), Value::Number(-0.0).key());
    }

    #[test]
    fn test_from_csv() {
        let data = RowSet::from_csv_str("region,sales\nEU,10\n\nUS,\nAPAC,n/a\n").unwrap();
        assert_eq!(data.headers, vec!["region", "sales"]);
        assert_eq!(data.len(), 3);
        assert_eq!(data.rows[0], vec![Value::from("EU"), Value::Number(10.0)]);
        assert_eq!(data.rows[1][1], Value::Null);
        assert_eq!(data.rows[2][1], Value::from("n/a"));
    }

    #[test]
    fn test_from_csv_short_record() {
        let data = RowSet::from_csv_str("a,b,c\n1,2\n").unwrap();
        assert_eq!(data.rows[0][2], Value::Null);
    }

    #[test]
    fn test_from_csv_keeps_rows_of_empty_fields() {
        let data = RowSet::from_csv_str("a,b
1,2

,
3,4
").unwrap();
        assert_eq!(data.len(), 3);
        assert_eq!(data.rows[1], vec![Value::Null, Value::Null]);
    }

    #[test]
    fn test_from_json_keeps_key_order_and_tolerates_missing_keys() {
        let value = json!([{"zeta": 1, "alpha": "x"}, {"zeta": 2}]);
        let data = RowSet::from_json(&value).unwrap();
        assert_eq!(data.headers, vec!["zeta", "alpha"]);
        assert_eq!(data.rows[1][1], Value::Null);
    }

    #[test]
    fn test_from_json_rejects_nested_values() {
        let value = json!([{"a": [1, 2]}]);
        assert!(RowSet::from_json(&value).is_err());
    }

    #[test]
    fn test_to_json_limit() {
        let data = RowSet::from_csv_str("a\n1\n2\n3\n").unwrap();
        let json = data.to_json(Some(2));
        assert_eq!(json, json!([{"a": 1}, {"a": 2}]));
    }

    #[test]
    fn test_column_index_case_insensitive_fallback() {
        let data = RowSet::new(vec!["Region".to_string()], vec![]);
        assert_eq!(data.column_index("Region"), Some(0));
        assert_eq!(data.column_index("region"), Some(0));
        assert_eq!(data.column_index("country"), None);
    }
}
