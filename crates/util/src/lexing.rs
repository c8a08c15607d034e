//! Shell-like lexing and input-line parsing.
//!
//! The lexer understands single and double quotes plus backslash escapes,
//! and can report byte ranges for callers that need cursor positions.
//! [`parse_line`] sits on top of it and splits a raw input line into the
//! command token, the untouched argument remainder, and an optional
//! explicit protocol override written as `protocol:command`.

/// Token with original byte positions.
#[derive(Debug, Clone)]
pub struct LexToken<'a> {
    /// The text content of the token, quotes preserved.
    pub text: &'a str,
    /// Starting byte position in the original string.
    pub start: usize,
    /// Ending byte position in the original string.
    pub end: usize,
}

/// Tokenize input using a simple, shell-like lexer.
///
/// Supports single and double quotes and backslash escapes. Quoted
/// segments stay intact, quotes included.
///
/// # Example
/// ```rust
/// use chainterm_util::lexing::lex_shell_like;
///
/// let tokens = lex_shell_like("swap 1 eth 'for usdc'");
/// assert_eq!(tokens, vec!["swap", "1", "eth", "'for usdc'"]);
/// ```
pub fn lex_shell_like(input: &str) -> Vec<String> {
    lex_shell_like_ranged(input)
        .into_iter()
        .map(|token| token.text.to_string())
        .collect()
}

/// Tokenize input returning borrowed slices and byte ranges.
pub fn lex_shell_like_ranged(input: &str) -> Vec<LexToken<'_>> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut index = 0usize;

    while index < bytes.len() {
        while index < bytes.len() && bytes[index].is_ascii_whitespace() {
            index += 1;
        }
        if index >= bytes.len() {
            break;
        }

        let start = index;
        index = token_end(bytes, index);
        tokens.push(LexToken {
            text: &input[start..index],
            start,
            end: index,
        });
    }

    tokens
}

/// Advances past one token, honoring quotes and escapes.
fn token_end(bytes: &[u8], start: usize) -> usize {
    let mut index = start;
    let mut in_single = false;
    let mut in_double = false;

    while index < bytes.len() {
        match bytes[index] {
            b'\\' if index + 1 < bytes.len() => {
                index += 2;
                continue;
            }
            b'\'' if !in_double => in_single = !in_single,
            b'"' if !in_single => in_double = !in_double,
            byte if byte.is_ascii_whitespace() && !in_single && !in_double => break,
            _ => {}
        }
        index += 1;
    }

    index
}

/// A parsed input line, ready for resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    /// Explicit protocol override (`stargate:bridge …`), when present.
    pub explicit_protocol: Option<String>,
    /// The command token resolution runs on.
    pub token: String,
    /// Everything after the command token, leading whitespace trimmed,
    /// otherwise verbatim (quotes and all).
    pub args: String,
}

/// Splits a raw line into command token, argument string, and optional
/// protocol override. Returns `None` for blank lines.
///
/// The override syntax is a colon inside the *first* token only; colons in
/// later tokens (URLs, pair names) are left alone. A leading or trailing
/// colon is not treated as an override.
///
/// # Example
/// ```rust
/// use chainterm_util::lexing::parse_line;
///
/// let line = parse_line("stargate:bridge 100 usdc").unwrap();
/// assert_eq!(line.explicit_protocol.as_deref(), Some("stargate"));
/// assert_eq!(line.token, "bridge");
/// assert_eq!(line.args, "100 usdc");
/// ```
pub fn parse_line(input: &str) -> Option<ParsedLine> {
    let tokens = lex_shell_like_ranged(input);
    let first = tokens.first()?;

    let args = input[first.end..].trim_start().to_string();
    let (explicit_protocol, token) = match first.text.split_once(':') {
        Some((protocol, command)) if !protocol.is_empty() && !command.is_empty() => {
            (Some(protocol.to_string()), command.to_string())
        }
        _ => (None, first.text.to_string()),
    };

    Some(ParsedLine {
        explicit_protocol,
        token,
        args,
    })
}
