// A1 range notation: "<Letters><Digits>:<Letters><Digits>"

use super::lexer::{column_letters, row_number, ws};
use nom::{
    character::complete::char,
    combinator::eof,
    sequence::{pair, separated_pair, terminated},
    IResult,
};

/// Bounds addressed by an A1 range.
///
/// Columns are zero-based, rows keep the 1-based spreadsheet numbering
/// (row 1 is the header).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct A1Range {
    pub start_col: usize,
    pub end_col: usize,
    pub start_row: usize,
    pub end_row: usize,
}

impl A1Range {
    /// True when the start cell is not after the end cell on either axis
    pub fn is_ordered(&self) -> bool {
        self.start_col <= self.end_col && self.start_row <= self.end_row
    }
}

fn cell_ref(input: &str) -> IResult<&str, (usize, usize)> {
    pair(column_letters, row_number)(input)
}

/// Parse a full A1 range such as "A2:D20" (letters in any case).
/// Whitespace is allowed only around the whole range.
pub fn parse_a1_range(input: &str) -> IResult<&str, A1Range> {
    let (input, ((start_col, start_row), (end_col, end_row))) =
        ws(terminated(separated_pair(cell_ref, char(':'), cell_ref), ws(eof)))(input)?;

    Ok((
        input,
        A1Range {
            start_col,
            end_col,
            start_row,
            end_row,
        },
    ))
}

/// Convenience wrapper returning None for anything that is not a range
pub fn parse_a1(input: &str) -> Option<A1Range> {
    parse_a1_range(input).ok().map(|(_, range)| range)
}
