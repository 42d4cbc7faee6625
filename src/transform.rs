use crate::data::{cell, GroupKey, Value};
use std::collections::HashMap;

/// Rows sharing one key value, in input order
#[derive(Debug, Clone)]
pub struct Group<'a> {
    pub key: &'a Value,
    pub rows: Vec<&'a [Value]>,
}

/// Coerce any cell to a finite number.
///
/// Follows numeric-literal conversion rules: blank text and null are 0,
/// booleans are 0/1, and anything unparsable or non-finite becomes 0.
pub fn to_number(value: &Value) -> f64 {
    parse_number(value).filter(|n| n.is_finite()).unwrap_or(0.0)
}

/// Numeric reading of a cell, or None when the text is not a numeral
pub fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Null => Some(0.0),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => Some(*n),
        Value::String(s) => parse_numeric_text(s),
    }
}

fn parse_numeric_text(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return Some(0.0);
    }
    let radix = match s.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0o") | Some("0O") => Some(8),
        Some("0b") | Some("0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return u64::from_str_radix(&s[2..], radix).ok().map(|n| n as f64);
    }
    // Rust also accepts "inf"/"nan"; those are never numerals here
    if s.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return None;
    }
    s.parse::<f64>().ok()
}

/// Partition rows by the value of one column.
///
/// Groups come out in first-seen order of their keys and keep the input
/// order of their rows. Keys compare by exact typed value.
pub fn group_by<'a>(rows: &'a [Vec<Value>], key_col: Option<usize>) -> Vec<Group<'a>> {
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<Group<'a>> = Vec::new();

    for row in rows {
        let key = cell(row, key_col);
        let slot = *index.entry(key.key()).or_insert_with(|| {
            groups.push(Group { key, rows: Vec::new() });
            groups.len() - 1
        });
        groups[slot].rows.push(row.as_slice());
    }

    groups
}

/// Count rows per distinct value of one column, in first-seen order
pub fn count_by<'a>(rows: &'a [Vec<Value>], key_col: Option<usize>) -> Vec<(&'a Value, usize)> {
    group_by(rows, key_col)
        .into_iter()
        .map(|g| (g.key, g.rows.len()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(keys: &[Value]) -> Vec<Vec<Value>> {
        keys.iter()
            .enumerate()
            .map(|(i, k)| vec![k.clone(), Value::Number(i as f64)])
            .collect()
    }

    #[test]
    fn test_to_number() {
        assert_eq!(to_number(&Value::from("abc")), 0.0);
        assert_eq!(to_number(&Value::from("3.5")), 3.5);
        assert_eq!(to_number(&Value::Null), 0.0);
        assert_eq!(to_number(&Value::from("  42 ")), 42.0);
        assert_eq!(to_number(&Value::from("")), 0.0);
        assert_eq!(to_number(&Value::from("0x1F")), 31.0);
        assert_eq!(to_number(&Value::from("Infinity")), 0.0);
        assert_eq!(to_number(&Value::from("nan")), 0.0);
        assert_eq!(to_number(&Value::from("1e3")), 1000.0);
        assert_eq!(to_number(&Value::Bool(true)), 1.0);
        assert_eq!(to_number(&Value::Number(f64::INFINITY)), 0.0);
    }

    #[test]
    fn test_parse_number_distinguishes_text() {
        assert_eq!(parse_number(&Value::from(" 42 ")), Some(42.0));
        assert_eq!(parse_number(&Value::from("0b101")), Some(5.0));
        assert_eq!(parse_number(&Value::from("n/a")), None);
        assert_eq!(parse_number(&Value::from("0xZZ")), None);
        assert_eq!(parse_number(&Value::Null), Some(0.0));
    }

    #[test]
    fn test_group_by_first_seen_order() {
        let data = rows(&[Value::from("b"), Value::from("a"), Value::from("b")]);
        let groups = group_by(&data, Some(0));
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, &Value::from("b"));
        assert_eq!(groups[0].rows.len(), 2);
        assert_eq!(groups[1].key, &Value::from("a"));
    }

    #[test]
    fn test_group_by_preserves_every_row() {
        let data = rows(&[
            Value::from("x"),
            Value::Number(1.0),
            Value::from("x"),
            Value::Null,
            Value::Number(1.0),
            Value::from("y"),
        ]);
        let groups = group_by(&data, Some(0));
        let mut ids: Vec<f64> = groups
            .iter()
            .flat_map(|g| g.rows.iter().map(|r| to_number(&r[1])))
            .collect();
        ids.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(ids, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_group_by_number_and_string_are_distinct() {
        let data = rows(&[Value::Number(1.0), Value::from("1")]);
        assert_eq!(group_by(&data, Some(0)).len(), 2);
    }

    #[test]
    fn test_group_by_missing_column_is_single_null_group() {
        let data = rows(&[Value::from("a"), Value::from("b")]);
        let groups = group_by(&data, None);
        assert_eq!(groups.len(), 1);
        assert!(groups[0].key.is_null());
    }

    #[test]
    fn test_count_by() {
        let data = rows(&[Value::from("a"), Value::from("a"), Value::from("b")]);
        let counts = count_by(&data, Some(0));
        assert_eq!(counts, vec![(&Value::from("a"), 2), (&Value::from("b"), 1)]);
    }
}
