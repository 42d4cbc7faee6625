// Parsers for spreadsheet notation

pub mod a1;
pub mod lexer;

// Public API re-exports
pub use a1::{parse_a1, A1Range};
