//! Lexer - nom scanners over a located input
//!
//! Produces a flat token stream for the hybrid grammar: raw target commands
//! interleaved with macro syntax. The lexer never fails; anything it does not
//! recognize becomes a one-character `Text` token and is echoed downstream.
//!
//! Scanners are tried in priority order (see [`scan`]). Two of them depend on
//! the previous character:
//! - a sigil (`@`/`#`) only marks an invocation when it is not glued to a
//!   preceding word (`user@example` stays literal text)
//! - a leading `-` only belongs to a number under the same condition

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_till, take_until, take_while, take_while1},
    character::complete::{anychar, char, digit1, hex_digit1, line_ending, none_of, one_of, satisfy},
    combinator::{all_consuming, map, not, opt, peek, recognize, rest, value},
    error::{Error as NomError, ErrorKind},
    multi::{many0, many0_count},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};
use nom_locate::LocatedSpan;
use serde::{Deserialize, Serialize};

use crate::ast::{Builtin, Span};

/// Located input for the scanners
pub type Input<'a> = LocatedSpan<&'a str>;

// ============================================================================
// Tokens
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    /// `\` followed by a line break; invisible to the grammar
    Continuation,
    Newline,
    /// `#define`
    Define,
    Comment,
    /// `{repeat`, `{if`, `{for`, `{reverse`
    Builtin(Builtin),
    /// `@` or `#` directly followed by an identifier
    Sigil,
    Identifier,
    /// Reserved `in` of `for` loops
    In,
    /// Decoded character literal
    Char(i64),
    Number(i64),
    /// Double-quoted string literal, kept verbatim
    Str,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    RawCommand,
    Whitespace,
    Text,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

impl Token {
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// Whitespace, comments and continuations
    pub fn is_trivia(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Whitespace | TokenKind::Comment | TokenKind::Continuation
        )
    }
}

/// Retention options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexOptions {
    pub keep_comments: bool,
    pub keep_whitespace: bool,
}

impl Default for LexOptions {
    fn default() -> Self {
        Self {
            keep_comments: false,
            keep_whitespace: true,
        }
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Tokenize source text. The result always ends with an `Eof` token.
///
/// A stripped block comment that spans lines leaves one `Newline` token per
/// line break so statement line numbers stay aligned with the source.
pub fn tokenize(source: &str, options: LexOptions) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut input = Input::new(source);
    let mut prev: Option<char> = None;

    while !input.fragment().is_empty() {
        let Ok((remaining, kind)) = scan(input, prev) else {
            // unreachable: the catch-all scanner accepts any character
            break;
        };
        let text = &source[input.location_offset()..remaining.location_offset()];
        let span = span_between(&input, &remaining);
        prev = text.chars().last();
        input = remaining;

        match kind {
            TokenKind::Comment if !options.keep_comments => {
                for (offset, line) in comment_line_breaks(text, span) {
                    tokens.push(Token {
                        kind: TokenKind::Newline,
                        text: "\n".to_string(),
                        span: Span {
                            start: offset,
                            end: offset + 1,
                            line,
                            column: 1,
                            end_line: line + 1,
                            end_column: 1,
                        },
                    });
                }
            }
            TokenKind::Whitespace if !options.keep_whitespace => {}
            _ => tokens.push(Token {
                kind,
                text: text.to_string(),
                span,
            }),
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        text: String::new(),
        span: span_between(&input, &input),
    });

    tracing::debug!(count = tokens.len(), "tokenized source");
    tokens
}

/// Decode a complete numeric or character literal (`42`, `-3`, `0x1F`, `'A'`)
pub fn literal_value(text: &str) -> Option<i64> {
    let input = Input::new(text);
    match all_consuming(alt((char_literal, unsigned_context_number)))(input) {
        Ok((_, TokenKind::Char(v) | TokenKind::Number(v))) => Some(v),
        _ => None,
    }
}

/// Decode a double-quoted string literal into its characters
pub fn string_literal_chars(text: &str) -> Option<Vec<char>> {
    let input = Input::new(text);
    all_consuming(delimited(
        char('"'),
        many0(alt((escape_sequence, none_of("\"\\")))),
        char('"'),
    ))(input)
    .ok()
    .map(|(_, chars)| chars)
}

pub fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

pub fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

pub fn is_raw_command(c: char) -> bool {
    matches!(c, '>' | '<' | '+' | '-' | '.' | '[' | ']')
}

// ============================================================================
// Internal Scanners
// ============================================================================

fn scan<'a>(input: Input<'a>, prev: Option<char>) -> IResult<Input<'a>, TokenKind> {
    alt((
        value(TokenKind::Continuation, pair(char('\\'), line_ending)),
        value(TokenKind::Newline, char('\n')),
        define_keyword,
        comment,
        builtin_keyword,
        |i: Input<'a>| sigil(i, prev),
        identifier,
        char_literal,
        |i: Input<'a>| number(i, prev),
        string_literal,
        delimiter,
        value(TokenKind::RawCommand, take_while1(is_raw_command)),
        value(
            TokenKind::Whitespace,
            take_while1(|c: char| c == ' ' || c == '\t' || c == '\r'),
        ),
        value(TokenKind::Text, anychar),
    ))(input)
}

fn define_keyword(input: Input<'_>) -> IResult<Input<'_>, TokenKind> {
    value(
        TokenKind::Define,
        terminated(tag("#define"), not(satisfy(is_ident_char))),
    )(input)
}

fn comment(input: Input<'_>) -> IResult<Input<'_>, TokenKind> {
    value(
        TokenKind::Comment,
        alt((
            recognize(pair(tag("//"), take_till(|c: char| c == '\n'))),
            recognize(pair(
                tag("/*"),
                alt((terminated(take_until("*/"), tag("*/")), rest)),
            )),
        )),
    )(input)
}

fn builtin_keyword(input: Input<'_>) -> IResult<Input<'_>, TokenKind> {
    map(
        delimited(
            char('{'),
            alt((
                value(Builtin::Repeat, tag("repeat")),
                value(Builtin::Reverse, tag("reverse")),
                value(Builtin::If, tag("if")),
                value(Builtin::For, tag("for")),
            )),
            not(satisfy(is_ident_char)),
        ),
        TokenKind::Builtin,
    )(input)
}

fn sigil(input: Input<'_>, prev: Option<char>) -> IResult<Input<'_>, TokenKind> {
    if prev.map_or(false, is_ident_char) {
        return Err(nom::Err::Error(NomError::new(input, ErrorKind::Verify)));
    }
    value(
        TokenKind::Sigil,
        terminated(one_of("@#"), peek(satisfy(is_ident_start))),
    )(input)
}

fn identifier(input: Input<'_>) -> IResult<Input<'_>, TokenKind> {
    map(
        recognize(pair(satisfy(is_ident_start), take_while(is_ident_char))),
        |word: Input<'_>| {
            if *word.fragment() == "in" {
                TokenKind::In
            } else {
                TokenKind::Identifier
            }
        },
    )(input)
}

fn char_literal(input: Input<'_>) -> IResult<Input<'_>, TokenKind> {
    map(
        delimited(char('\''), alt((escape_sequence, none_of("\\'\n"))), char('\'')),
        |c: char| TokenKind::Char(c as i64),
    )(input)
}

fn escape_sequence(input: Input<'_>) -> IResult<Input<'_>, char> {
    preceded(
        char('\\'),
        alt((
            value('\n', char('n')),
            value('\t', char('t')),
            value('\r', char('r')),
            value('\0', char('0')),
            value('\\', char('\\')),
            value('\'', char('\'')),
            value('"', char('"')),
        )),
    )(input)
}

fn number<'a>(input: Input<'a>, prev: Option<char>) -> IResult<Input<'a>, TokenKind> {
    let signed = !prev.map_or(false, is_ident_char);
    let sign = |i: Input<'a>| -> IResult<Input<'a>, Option<char>> {
        if signed {
            opt(char('-'))(i)
        } else {
            Ok((i, None))
        }
    };
    let (remaining, lexeme) = recognize(pair(
        sign,
        alt((recognize(pair(tag_no_case("0x"), hex_digit1)), digit1)),
    ))(input)?;

    match parse_integer(lexeme.fragment()) {
        Some(v) => Ok((remaining, TokenKind::Number(v))),
        None => Err(nom::Err::Error(NomError::new(input, ErrorKind::Digit))),
    }
}

fn unsigned_context_number(input: Input<'_>) -> IResult<Input<'_>, TokenKind> {
    number(input, None)
}

fn string_literal(input: Input<'_>) -> IResult<Input<'_>, TokenKind> {
    value(
        TokenKind::Str,
        recognize(tuple((
            char('"'),
            many0_count(alt((
                recognize(preceded(char('\\'), anychar)),
                recognize(none_of("\"\\\n")),
            ))),
            char('"'),
        ))),
    )(input)
}

fn delimiter(input: Input<'_>) -> IResult<Input<'_>, TokenKind> {
    alt((
        value(TokenKind::LParen, char('(')),
        value(TokenKind::RParen, char(')')),
        value(TokenKind::LBrace, char('{')),
        value(TokenKind::RBrace, char('}')),
        value(TokenKind::Comma, char(',')),
    ))(input)
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_integer(lexeme: &str) -> Option<i64> {
    let (negative, digits) = match lexeme.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, lexeme),
    };
    let magnitude = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i64>().ok()?,
    };
    Some(if negative { -magnitude } else { magnitude })
}

fn span_between(start: &Input<'_>, end: &Input<'_>) -> Span {
    Span {
        start: start.location_offset(),
        end: end.location_offset(),
        line: start.location_line() as usize,
        column: start.get_utf8_column(),
        end_line: end.location_line() as usize,
        end_column: end.get_utf8_column(),
    }
}

/// Byte offset and line number of every line break inside a comment
fn comment_line_breaks(text: &str, span: Span) -> Vec<(usize, usize)> {
    text.match_indices('\n')
        .enumerate()
        .map(|(n, (offset, _))| (span.start + offset, span.line + n))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source, LexOptions::default())
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_definition_line() {
        use TokenKind::*;
        assert_eq!(
            kinds("#define inc(n) {repeat(n, +)}"),
            vec![
                Define,
                Whitespace,
                Identifier,
                LParen,
                Identifier,
                RParen,
                Whitespace,
                Builtin(crate::ast::Builtin::Repeat),
                LParen,
                Identifier,
                Comma,
                Whitespace,
                RawCommand,
                RParen,
                RBrace,
                Eof,
            ]
        );
    }

    #[test]
    fn test_sigil_needs_identifier_and_word_boundary() {
        use TokenKind::*;
        assert_eq!(kinds("@foo"), vec![Sigil, Identifier, Eof]);
        assert_eq!(kinds("#foo"), vec![Sigil, Identifier, Eof]);
        assert_eq!(kinds("@ foo"), vec![Text, Whitespace, Identifier, Eof]);
        assert_eq!(
            kinds("user@example"),
            vec![Identifier, Text, Identifier, Eof]
        );
    }

    #[test]
    fn test_define_requires_word_end() {
        use TokenKind::*;
        assert_eq!(kinds("#defined"), vec![Sigil, Identifier, Eof]);
        assert_eq!(kinds("#define"), vec![Define, Eof]);
    }

    #[test]
    fn test_builtin_keyword_is_not_a_prefix_match() {
        use TokenKind::*;
        assert_eq!(kinds("{repeated"), vec![LBrace, Identifier, Eof]);
        assert_eq!(
            kinds("{reverse("),
            vec![Builtin(crate::ast::Builtin::Reverse), LParen, Eof]
        );
        assert_eq!(kinds("{ if"), vec![LBrace, Whitespace, Identifier, Eof]);
    }

    #[test]
    fn test_numbers() {
        use TokenKind::*;
        assert_eq!(kinds("-5"), vec![Number(-5), Eof]);
        assert_eq!(kinds("0x1F"), vec![Number(31), Eof]);
        assert_eq!(kinds("a-1"), vec![Identifier, RawCommand, Number(1), Eof]);
        assert_eq!(kinds("[-]"), vec![RawCommand, Eof]);
    }

    #[test]
    fn test_in_is_reserved() {
        use TokenKind::*;
        assert_eq!(kinds("in inner"), vec![In, Whitespace, Identifier, Eof]);
    }

    #[test]
    fn test_char_literals_decode() {
        assert_eq!(kinds("'A'")[0], TokenKind::Char(65));
        assert_eq!(kinds("'\\n'")[0], TokenKind::Char(10));
        assert_eq!(kinds("'\\''")[0], TokenKind::Char(39));
        assert_eq!(kinds("don't")[1], TokenKind::Text);
    }

    #[test]
    fn test_comments_stripped_or_kept() {
        use TokenKind::*;
        assert_eq!(kinds("+ // note\n-"), vec![RawCommand, Whitespace, Newline, RawCommand, Eof]);

        let kept = tokenize(
            "+ // note",
            LexOptions {
                keep_comments: true,
                keep_whitespace: true,
            },
        );
        assert_eq!(kept[2].kind, Comment);
        assert_eq!(kept[2].text, "// note");
    }

    #[test]
    fn test_stripped_block_comment_keeps_line_breaks() {
        use TokenKind::*;
        let tokens = tokenize("+/* a\nb\nc */-", LexOptions::default());
        let got: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(got, vec![RawCommand, Newline, Newline, RawCommand, Eof]);
        assert_eq!(tokens[1].span.line, 1);
        assert_eq!(tokens[2].span.line, 2);
        assert_eq!(tokens[3].span.line, 3);
    }

    #[test]
    fn test_continuation_is_one_token() {
        use TokenKind::*;
        let tokens = tokenize("+\\\n+", LexOptions::default());
        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![RawCommand, Continuation, RawCommand, Eof]
        );
        assert_eq!(tokens[1].span.line, 1);
        assert_eq!(tokens[1].span.end_line, 2);
        assert_eq!(tokens[2].span.line, 2);
        assert_eq!(tokens[2].span.column, 1);
    }

    #[test]
    fn test_spans_track_utf8_columns() {
        let tokens = tokenize("é @x", LexOptions::default());
        let sigil = tokens.iter().find(|t| t.kind == TokenKind::Sigil).unwrap();
        assert_eq!(sigil.span.start, 3);
        assert_eq!(sigil.span.column, 3);
    }

    #[test]
    fn test_token_texts_reassemble_source() {
        let source = "#define a(x) x+\n@a(1) {for(i in {1,2}, i)} 'q' \"s\" ~";
        let options = LexOptions {
            keep_comments: true,
            keep_whitespace: true,
        };
        let joined: String = tokenize(source, options)
            .iter()
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(joined, source);
    }

    #[test]
    fn test_literal_helpers() {
        assert_eq!(literal_value("42"), Some(42));
        assert_eq!(literal_value("-0x10"), Some(-16));
        assert_eq!(literal_value("'a'"), Some(97));
        assert_eq!(literal_value("4 2"), None);
        assert_eq!(literal_value("abc"), None);
        assert_eq!(string_literal_chars("\"hi\\n\""), Some(vec!['h', 'i', '\n']));
        assert_eq!(string_literal_chars("hi"), None);
    }
}
