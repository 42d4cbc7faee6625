// Shared lexical helpers for the notation parsers

use nom::{
    character::complete::{alpha1, digit1, multispace0},
    combinator::{map_opt, map_res},
    sequence::delimited,
    IResult,
};

/// Wrap a parser so surrounding whitespace is ignored
pub fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// Parse spreadsheet column letters ("A", "bc", "AAA") into a zero-based index
pub fn column_letters(input: &str) -> IResult<&str, usize> {
    map_opt(alpha1, letters_to_index)(input)
}

/// Parse a row number
pub fn row_number(input: &str) -> IResult<&str, usize> {
    map_res(digit1, str::parse::<usize>)(input)
}

/// Base-26 with digits A=1..Z=26, shifted down to zero-based.
/// Returns None on overflow.
pub fn letters_to_index(letters: &str) -> Option<usize> {
    let mut n: usize = 0;
    for b in letters.bytes() {
        let digit = (b.to_ascii_uppercase().checked_sub(b'A')? as usize) + 1;
        n = n.checked_mul(26)?.checked_add(digit)?;
    }
    n.checked_sub(1)
}
