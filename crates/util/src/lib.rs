//! Chainterm utility functions: fuzzy matching and input-line lexing.

pub mod lexing;
pub mod matching;

pub use lexing::{LexToken, ParsedLine, lex_shell_like, lex_shell_like_ranged, parse_line};
pub use matching::{fuzzy_score, similarity};
