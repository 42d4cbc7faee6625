use crate::data::{cell, RowSet};
use crate::parser::{parse_a1, A1Range};
use tracing::debug;

/// Restrict a row set to the cells addressed by an A1 range such as "A2:D20".
///
/// Row 1 is the header, so data row N lives at index N-2. Malformed or
/// reversed ranges, and empty inputs, return the rows unchanged.
pub fn slice_rows(rows: &RowSet, a1: &str) -> RowSet {
    if rows.is_empty() {
        return rows.clone();
    }
    let Some(range) = parse_a1(a1) else {
        debug!(range = a1, "ignoring malformed A1 range");
        return rows.clone();
    };
    if !range.is_ordered() {
        debug!(range = a1, "ignoring reversed A1 range");
        return rows.clone();
    }
    apply_range(rows, &range)
}

fn apply_range(rows: &RowSet, range: &A1Range) -> RowSet {
    let header_end = rows.headers.len();
    let col_start = range.start_col.min(header_end);
    let col_end = range.end_col.saturating_add(1).min(header_end);
    let keep: Vec<usize> = (col_start..col_end).collect();

    let slice_start = range.start_row.saturating_sub(2);
    let slice_end = slice_start.max(range.end_row.saturating_sub(2));

    let headers = keep.iter().map(|&i| rows.headers[i].clone()).collect();
    let sliced = rows
        .rows
        .iter()
        .skip(slice_start)
        .take(slice_end - slice_start + 1)
        .map(|row| keep.iter().map(|&i| cell(row, Some(i)).clone()).collect())
        .collect();

    RowSet::new(headers, sliced)
}
