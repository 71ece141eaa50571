//! Parser - recursive descent over lexer tokens
//!
//! Produces a [`Program`] of `MacroDefinition` and `CodeLine` statements plus
//! parse diagnostics and highlight tokens for editors.
//!
//! ## Recovery
//!
//! Structural failures (unbalanced delimiters, missing `in` or comma, a
//! definition without a name) produce a `syntax_error`. The construct being
//! parsed is then echoed as literal text up to the end of its first line, and
//! parsing resumes with the next statement. Nothing in the source is dropped.
//!
//! ## Line layout
//!
//! Each statement ends at a newline that is not inside a delimiter. A
//! definition body can continue across lines with `\` or use a block body:
//!
//! ```text
//! #define clear {
//!     [-]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use crate::ast::*;
use crate::diagnostics::Diagnostic;
use crate::lexer::{is_ident_char, is_ident_start, is_raw_command, literal_value, Token, TokenKind};

type ParseResult<T> = Result<T, Diagnostic>;

/// Deepest argument/array nesting accepted before the parser gives up
pub const MAX_NESTING: usize = 128;

// ============================================================================
// Public API
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightKind {
    MacroDefinition,
    MacroInvocation,
    BuiltinFunction,
}

/// Editor highlight range (byte offsets)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightToken {
    pub kind: HighlightKind,
    pub start: usize,
    pub end: usize,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct ParseOutput {
    pub program: Program,
    pub diagnostics: Vec<Diagnostic>,
    /// Sorted by start offset
    pub highlights: Vec<HighlightToken>,
}

/// Parse a token stream produced by [`crate::lexer::tokenize`]
pub fn parse(tokens: &[Token]) -> ParseOutput {
    let mut parser = Parser::new(tokens);
    let program = parser.parse_program();
    parser.highlights.sort_by_key(|h| (h.start, h.end));

    tracing::debug!(
        statements = program.statements.len(),
        diagnostics = parser.diagnostics.len(),
        "parsed program"
    );

    ParseOutput {
        program,
        diagnostics: parser.diagnostics,
        highlights: parser.highlights,
    }
}

// ============================================================================
// Parser state
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    /// Code lines and single-line bodies
    Line,
    /// Inside a `{ ... }` block body: line-edge whitespace and comments drop
    Block,
}

struct Parser<'t> {
    tokens: Cow<'t, [Token]>,
    pos: usize,
    diagnostics: Vec<Diagnostic>,
    highlights: Vec<HighlightToken>,
    /// Open argument lists and arrays
    nesting: usize,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        let tokens = match tokens.last() {
            Some(last) if last.is(TokenKind::Eof) => Cow::Borrowed(tokens),
            _ => {
                let span = tokens.last().map(|t| point(t.span, true)).unwrap_or_default();
                let mut owned = tokens.to_vec();
                owned.push(Token {
                    kind: TokenKind::Eof,
                    text: String::new(),
                    span,
                });
                Cow::Owned(owned)
            }
        };
        Self {
            tokens,
            pos: 0,
            diagnostics: Vec::new(),
            highlights: Vec::new(),
            nesting: 0,
        }
    }

    // ------------------------------------------------------------------------
    // Token cursor
    // ------------------------------------------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn nth_kind(&self, n: usize) -> TokenKind {
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        self.tokens[idx].kind
    }

    fn prev_kind(&self) -> Option<TokenKind> {
        self.pos.checked_sub(1).map(|i| self.tokens[i].kind)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn at_line_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !token.is(TokenKind::Eof) {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.at(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    /// Span of the most recently consumed token
    fn last_span(&self) -> Span {
        match self.pos.checked_sub(1) {
            Some(i) => self.tokens[i].span,
            None => point(self.peek().span, false),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.at(TokenKind::Whitespace) {
            self.advance();
        }
    }

    /// Skip whitespace, comments, continuations and line breaks (inside delimiters)
    fn skip_trivia(&mut self) {
        while self.peek().is_trivia() || self.at(TokenKind::Newline) {
            self.advance();
        }
    }

    fn whitespace_at_line_edge(&self) -> bool {
        matches!(
            self.prev_kind(),
            None | Some(TokenKind::Newline | TokenKind::LBrace | TokenKind::Comment)
        ) || matches!(
            self.nth_kind(1),
            TokenKind::Newline | TokenKind::Comment | TokenKind::RBrace | TokenKind::Eof
        )
    }

    // ------------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------------

    fn parse_program(&mut self) -> Program {
        let mut statements = Vec::new();
        if self.at(TokenKind::Eof) {
            return Program { statements };
        }

        loop {
            statements.push(self.parse_statement());
            if self.eat(TokenKind::Newline).is_none() {
                break;
            }
            if self.at(TokenKind::Eof) {
                // source ended with a line break: one last empty line
                statements.push(Statement::CodeLine(CodeLine {
                    content: Vec::new(),
                    span: point(self.peek().span, false),
                }));
                break;
            }
        }

        Program { statements }
    }

    fn parse_statement(&mut self) -> Statement {
        let start = self.pos;
        self.skip_whitespace();

        if self.at(TokenKind::Define) {
            let highlights = self.highlights.len();
            match self.parse_definition() {
                Ok(def) => return Statement::MacroDefinition(def),
                Err(diag) => {
                    self.diagnostics.push(diag);
                    self.highlights.truncate(highlights);
                    let text = self.recover_to_line_end(start);
                    return Statement::CodeLine(CodeLine {
                        span: text.span,
                        content: vec![Content::Text(text)],
                    });
                }
            }
        }

        self.pos = start;
        Statement::CodeLine(self.parse_code_line())
    }

    fn parse_code_line(&mut self) -> CodeLine {
        let first = self.peek().span;
        let start = self.pos;
        let mut content = Vec::new();

        while !self.at_line_end() {
            if self.eat(TokenKind::Continuation).is_some() {
                continue;
            }
            content.push(self.parse_content(Layout::Line));
        }

        let span = if self.pos > start {
            Span::merge(first, self.last_span())
        } else {
            point(first, false)
        };
        CodeLine {
            content: merge_text(content),
            span,
        }
    }

    fn parse_definition(&mut self) -> ParseResult<MacroDefinition> {
        let define = self.advance();
        self.skip_whitespace();

        if !self.at(TokenKind::Identifier) {
            return Err(
                Diagnostic::syntax("Expected macro name after #define").with_span(define.span)
            );
        }
        let name = self.advance();
        self.highlights.push(HighlightToken {
            kind: HighlightKind::MacroDefinition,
            start: define.span.start,
            end: name.span.end,
            name: name.text.clone(),
        });

        let parameters = if self.at(TokenKind::LParen) {
            Some(self.parse_parameters()?)
        } else {
            None
        };

        self.skip_whitespace();
        let body = if self.at_block_body() {
            self.parse_block_body(define.span)
        } else {
            self.parse_line_body()
        };

        Ok(MacroDefinition {
            name: name.text,
            parameters,
            body,
            span: Span::merge(define.span, self.last_span()),
        })
    }

    fn parse_parameters(&mut self) -> ParseResult<Vec<String>> {
        let open = self.advance();
        let mut names: Vec<String> = Vec::new();

        self.skip_trivia();
        if self.eat(TokenKind::RParen).is_some() {
            return Ok(names);
        }

        loop {
            self.skip_trivia();
            if !self.at(TokenKind::Identifier) {
                return Err(Diagnostic::syntax("Expected parameter name in macro definition")
                    .with_span(self.peek().span));
            }
            let param = self.advance();
            if names.contains(&param.text) {
                self.diagnostics.push(
                    Diagnostic::syntax(format!("Duplicate parameter '{}'", param.text))
                        .with_span(param.span),
                );
            } else {
                names.push(param.text);
            }

            self.skip_trivia();
            match self.peek_kind() {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RParen => {
                    self.advance();
                    return Ok(names);
                }
                _ => {
                    return Err(Diagnostic::syntax("Expected ')' after parameter list")
                        .with_span(open.span))
                }
            }
        }
    }

    /// `{` followed only by trivia up to the end of the line
    fn at_block_body(&self) -> bool {
        if !self.at(TokenKind::LBrace) {
            return false;
        }
        let mut n = 1;
        loop {
            match self.nth_kind(n) {
                TokenKind::Whitespace | TokenKind::Comment => n += 1,
                TokenKind::Newline | TokenKind::Eof => return true,
                _ => return false,
            }
        }
    }

    fn parse_line_body(&mut self) -> Vec<Content> {
        let mut body = Vec::new();
        while !self.at_line_end() {
            if self.eat(TokenKind::Continuation).is_some() {
                continue;
            }
            body.push(self.parse_content(Layout::Line));
        }
        trim_body(merge_text(body))
    }

    fn parse_block_body(&mut self, define_span: Span) -> Vec<Content> {
        self.advance();
        let mut body = Vec::new();

        loop {
            match self.peek_kind() {
                TokenKind::Eof => {
                    self.diagnostics.push(
                        Diagnostic::syntax("Unclosed macro body - missing closing brace }")
                            .with_span(define_span),
                    );
                    break;
                }
                TokenKind::RBrace => {
                    self.advance();
                    break;
                }
                TokenKind::Newline | TokenKind::Comment | TokenKind::Continuation => {
                    self.advance();
                }
                TokenKind::Whitespace if self.whitespace_at_line_edge() => {
                    self.advance();
                }
                _ => body.push(self.parse_content(Layout::Block)),
            }
        }

        // anything after the closing brace on the same line joins the body
        while !self.at_line_end() {
            if self.eat(TokenKind::Continuation).is_some() {
                continue;
            }
            body.push(self.parse_content(Layout::Line));
        }

        trim_body(merge_text(body))
    }

    // ------------------------------------------------------------------------
    // Content
    // ------------------------------------------------------------------------

    fn parse_content(&mut self, layout: Layout) -> Content {
        let start = self.pos;
        let highlights = self.highlights.len();

        let result = match self.peek_kind() {
            TokenKind::Sigil if self.nth_kind(1) == TokenKind::Identifier => {
                self.parse_invocation().map(Content::MacroInvocation)
            }
            TokenKind::Builtin(builtin) => {
                self.parse_builtin(builtin).map(Content::BuiltinCall)
            }
            TokenKind::LBrace => self.parse_array().map(Content::ArrayLiteral),
            TokenKind::RawCommand => {
                let token = self.advance();
                Ok(Content::RawCommand(RawCommand {
                    commands: token.text,
                    span: token.span,
                }))
            }
            _ => Ok(Content::Text(self.parse_text_run(layout))),
        };

        match result {
            Ok(content) => content,
            Err(diag) => {
                self.diagnostics.push(diag);
                self.highlights.truncate(highlights);
                Content::Text(self.recover_to_line_end(start))
            }
        }
    }

    /// One or more consecutive literal tokens
    fn parse_text_run(&mut self, layout: Layout) -> Text {
        let first = self.advance();
        let mut value = first.text;
        let mut span = first.span;

        loop {
            let mergeable = match self.peek_kind() {
                TokenKind::Identifier
                | TokenKind::In
                | TokenKind::Number(_)
                | TokenKind::Char(_)
                | TokenKind::Str
                | TokenKind::Text
                | TokenKind::Comma
                | TokenKind::LParen
                | TokenKind::RParen
                | TokenKind::Define => true,
                TokenKind::Sigil => self.nth_kind(1) != TokenKind::Identifier,
                TokenKind::Whitespace => {
                    layout == Layout::Line || !self.whitespace_at_line_edge()
                }
                TokenKind::Comment => layout == Layout::Line,
                _ => false,
            };
            if !mergeable {
                break;
            }
            let token = self.advance();
            value.push_str(&token.text);
            span = Span::merge(span, token.span);
        }

        Text { value, span }
    }

    /// Echo everything from `start` to the end of that line as text
    fn recover_to_line_end(&mut self, start: usize) -> Text {
        self.pos = start;
        let first = self.peek().span;
        let mut value = String::new();
        while !self.at_line_end() {
            value.push_str(&self.advance().text);
        }
        Text {
            value,
            span: Span::merge(first, self.last_span()),
        }
    }

    fn parse_invocation(&mut self) -> ParseResult<MacroInvocation> {
        let sigil = self.advance();
        let name = self.advance();

        let arguments = if self.at(TokenKind::LParen) {
            Some(self.parse_argument_list(&name.text)?)
        } else {
            None
        };

        let span = Span::merge(sigil.span, self.last_span());
        self.highlights.push(HighlightToken {
            kind: HighlightKind::MacroInvocation,
            start: span.start,
            end: span.end,
            name: name.text.clone(),
        });

        Ok(MacroInvocation {
            name: name.text,
            sigil: sigil.text.chars().next().unwrap_or('@'),
            arguments,
            span,
            synthesized: false,
        })
    }

    /// `( expr, expr, ... )`, current token is the opening parenthesis
    fn parse_argument_list(&mut self, owner: &str) -> ParseResult<Vec<Expression>> {
        let open = self.advance();
        let mut args = Vec::new();

        self.skip_trivia();
        if self.eat(TokenKind::RParen).is_some() {
            return Ok(args);
        }

        loop {
            args.push(self.parse_expression()?);
            match self.peek_kind() {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RParen => {
                    self.advance();
                    return Ok(args);
                }
                _ => {
                    return Err(Diagnostic::syntax(format!(
                        "Expected ')' to close arguments of '{}'",
                        owner
                    ))
                    .with_span(open.span))
                }
            }
        }
    }

    fn parse_builtin(&mut self, builtin: Builtin) -> ParseResult<BuiltinCall> {
        let keyword = self.advance();

        if !self.at(TokenKind::LParen) {
            return Err(Diagnostic::syntax(format!(
                "Expected '(' after builtin '{}'",
                builtin.name()
            ))
            .with_span(keyword.span));
        }

        let arguments = match builtin {
            Builtin::For => self.parse_for_arguments()?,
            _ => self.parse_argument_list(builtin.name())?,
        };

        self.skip_whitespace();
        if self.eat(TokenKind::RBrace).is_none() {
            return Err(
                Diagnostic::syntax("Expected '}' after builtin function").with_span(keyword.span)
            );
        }

        let span = Span::merge(keyword.span, self.last_span());
        self.highlights.push(HighlightToken {
            kind: HighlightKind::BuiltinFunction,
            start: span.start,
            end: span.end,
            name: builtin.name().to_string(),
        });

        Ok(BuiltinCall {
            builtin,
            arguments,
            span,
            synthesized: false,
        })
    }

    /// `(binder[, index] in array, body)`
    fn parse_for_arguments(&mut self) -> ParseResult<Vec<Expression>> {
        let open = self.advance();

        self.skip_trivia();
        let binder = match self.peek_kind() {
            TokenKind::Identifier => {
                let token = self.advance();
                Expression::Identifier(Identifier {
                    name: token.text,
                    span: token.span,
                })
            }
            TokenKind::LParen => Expression::TuplePattern(self.parse_tuple_pattern()?),
            _ => {
                return Err(Diagnostic::syntax(
                    "Expected loop variable or tuple pattern in for loop",
                )
                .with_span(self.peek().span))
            }
        };

        self.skip_trivia();
        let binder = if self.at(TokenKind::Comma) {
            self.advance();
            self.skip_trivia();
            if !self.at(TokenKind::Identifier) {
                return Err(Diagnostic::syntax("Expected index variable after ',' in for loop")
                    .with_span(self.peek().span));
            }
            let token = self.advance();
            let span = Span::merge(binder.span(), token.span);
            self.skip_trivia();
            Expression::IndexedBinder(IndexedBinder {
                binder: Box::new(binder),
                index: Identifier {
                    name: token.text,
                    span: token.span,
                },
                span,
            })
        } else {
            binder
        };

        if self.eat(TokenKind::In).is_none() {
            return Err(Diagnostic::syntax("Expected 'in' in for loop").with_span(self.peek().span));
        }

        let array = self.parse_expression()?;
        if self.eat(TokenKind::Comma).is_none() {
            return Err(Diagnostic::syntax("Expected ',' after for loop array")
                .with_span(self.peek().span));
        }

        let body = self.parse_expression()?;
        if self.eat(TokenKind::RParen).is_none() {
            return Err(
                Diagnostic::syntax("Expected ')' to close for loop").with_span(open.span)
            );
        }

        Ok(vec![binder, array, body])
    }

    fn parse_tuple_pattern(&mut self) -> ParseResult<TuplePattern> {
        let open = self.advance();
        let mut names = Vec::new();

        loop {
            self.skip_trivia();
            if !self.at(TokenKind::Identifier) {
                return Err(Diagnostic::syntax("Expected identifier in tuple pattern")
                    .with_span(self.peek().span));
            }
            names.push(self.advance().text);

            self.skip_trivia();
            match self.peek_kind() {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RParen => {
                    self.advance();
                    break;
                }
                _ => {
                    return Err(Diagnostic::syntax("Expected ')' after tuple pattern")
                        .with_span(open.span))
                }
            }
        }

        Ok(TuplePattern {
            names,
            span: Span::merge(open.span, self.last_span()),
        })
    }

    fn parse_array(&mut self) -> ParseResult<ArrayLiteral> {
        let open = self.advance();
        let mut elements = Vec::new();

        self.skip_trivia();
        if !self.at(TokenKind::RBrace) {
            loop {
                elements.push(self.parse_expression()?);
                match self.peek_kind() {
                    TokenKind::Comma => {
                        self.advance();
                        self.skip_trivia();
                        if self.at(TokenKind::RBrace) {
                            break;
                        }
                    }
                    TokenKind::RBrace => break,
                    _ => {
                        return Err(Diagnostic::syntax(
                            "Unclosed array literal - missing closing brace }",
                        )
                        .with_span(open.span))
                    }
                }
            }
        }
        self.advance();

        Ok(ArrayLiteral {
            elements,
            span: Span::merge(open.span, self.last_span()),
        })
    }

    // ------------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------------

    /// One argument or array element. Stops at a top-level `,`, `)` or `}`.
    /// Line breaks, comments and indentation inside are dropped.
    fn parse_expression(&mut self) -> ParseResult<Expression> {
        if self.nesting >= MAX_NESTING {
            return Err(Diagnostic::syntax(format!(
                "Maximum nesting depth exceeded ({})",
                MAX_NESTING
            ))
            .with_span(self.peek().span));
        }
        self.nesting += 1;
        let expr = self.parse_expression_items();
        self.nesting -= 1;
        expr
    }

    fn parse_expression_items(&mut self) -> ParseResult<Expression> {
        let first = self.peek().span;
        let mut items: Vec<Content> = Vec::new();
        let mut depth = 0usize;
        let mut line_start = false;

        loop {
            match self.peek_kind() {
                TokenKind::Eof => break,
                TokenKind::Comma | TokenKind::RParen | TokenKind::RBrace if depth == 0 => break,
                TokenKind::Newline => {
                    self.advance();
                    line_start = true;
                    continue;
                }
                TokenKind::Comment | TokenKind::Continuation => {
                    self.advance();
                    continue;
                }
                TokenKind::Whitespace
                    if line_start
                        || matches!(
                            self.nth_kind(1),
                            TokenKind::Newline | TokenKind::Comment
                        ) =>
                {
                    self.advance();
                    continue;
                }
                TokenKind::Sigil if self.nth_kind(1) == TokenKind::Identifier => {
                    items.push(Content::MacroInvocation(self.parse_invocation()?));
                }
                TokenKind::Builtin(builtin) => {
                    items.push(Content::BuiltinCall(self.parse_builtin(builtin)?));
                }
                TokenKind::LBrace => items.push(Content::ArrayLiteral(self.parse_array()?)),
                TokenKind::RawCommand => {
                    let token = self.advance();
                    items.push(Content::RawCommand(RawCommand {
                        commands: token.text,
                        span: token.span,
                    }));
                }
                kind => {
                    match kind {
                        TokenKind::LParen => depth += 1,
                        TokenKind::RParen => depth = depth.saturating_sub(1),
                        _ => {}
                    }
                    let token = self.advance();
                    items.push(Content::Text(Text {
                        value: token.text,
                        span: token.span,
                    }));
                }
            }
            line_start = false;
        }

        Ok(fold_expression(items, point(first, false)))
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Zero-width span at the start (or end) of `span`
fn point(span: Span, at_end: bool) -> Span {
    if at_end {
        Span {
            start: span.end,
            line: span.end_line,
            column: span.end_column,
            ..span
        }
    } else {
        Span {
            end: span.start,
            end_line: span.line,
            end_column: span.column,
            ..span
        }
    }
}

/// Join adjacent text nodes
fn merge_text(items: Vec<Content>) -> Vec<Content> {
    let mut merged: Vec<Content> = Vec::with_capacity(items.len());
    for item in items {
        match (merged.last_mut(), item) {
            (Some(Content::Text(prev)), Content::Text(next)) => {
                prev.value.push_str(&next.value);
                prev.span = Span::merge(prev.span, next.span);
            }
            (_, item) => merged.push(item),
        }
    }
    merged
}

/// Drop trailing whitespace from a definition body
fn trim_body(mut body: Vec<Content>) -> Vec<Content> {
    if let Some(Content::Text(last)) = body.last_mut() {
        let trimmed = last.value.trim_end().len();
        last.value.truncate(trimmed);
        if last.value.is_empty() {
            body.pop();
        }
    }
    body
}

/// Fold a parsed expression: single structured nodes stay as they are, pure
/// literals collapse into one `Number`/`Identifier`/`RawCommand`/`Text`.
fn fold_expression(items: Vec<Content>, empty_span: Span) -> Expression {
    let mut items = merge_text(items);

    if let Some(Content::Text(first)) = items.first_mut() {
        first.value = first.value.trim_start().to_string();
    }
    if let Some(Content::Text(last)) = items.last_mut() {
        last.value = last.value.trim_end().to_string();
    }
    items.retain(|item| !matches!(item, Content::Text(t) if t.value.is_empty()));

    let is_literal = items
        .iter()
        .all(|item| matches!(item, Content::Text(_) | Content::RawCommand(_)));

    match items.len() {
        0 => Expression::Text(Text {
            value: String::new(),
            span: empty_span,
        }),
        1 => match items.remove(0) {
            Content::Text(text) => classify_literal(text.value, text.span),
            Content::RawCommand(raw) => Expression::RawCommand(raw),
            Content::MacroInvocation(inv) => Expression::MacroInvocation(inv),
            Content::BuiltinCall(call) => Expression::BuiltinCall(call),
            Content::ArrayLiteral(array) => Expression::ArrayLiteral(array),
        },
        _ if is_literal => {
            let span = Span::merge(items[0].span(), items[items.len() - 1].span());
            let value: String = items.iter().map(Content::to_source_string).collect();
            classify_literal(value, span)
        }
        _ => {
            let span = Span::merge(items[0].span(), items[items.len() - 1].span());
            Expression::ExpressionList(ExpressionList { items, span })
        }
    }
}

/// Classify a folded literal
pub(crate) fn classify_literal(value: String, span: Span) -> Expression {
    if let Some(number) = literal_value(&value) {
        return Expression::Number(Number {
            value: number,
            text: value,
            span,
        });
    }
    if is_identifier(&value) {
        return Expression::Identifier(Identifier { name: value, span });
    }
    if !value.is_empty() && value.chars().all(is_raw_command) {
        return Expression::RawCommand(RawCommand {
            commands: value,
            span,
        });
    }
    Expression::Text(Text { value, span })
}

pub(crate) fn is_identifier(word: &str) -> bool {
    let mut chars = word.chars();
    chars.next().map_or(false, is_ident_start) && chars.all(is_ident_char) && word != "in"
}
