//! AST for macro source
//!
//! The tree separates two layers:
//! - **Statements**: one `MacroDefinition` or `CodeLine` per logical source line
//! - **Content / Expression**: what a line or an argument is made of
//!
//! Content is what appears at statement level (raw commands, literal text,
//! invocations, builtin calls, bare array literals). Expressions are what
//! appears inside argument lists; pure-literal expressions are folded into a
//! single `Number`/`Identifier`/`Text` node, structured ones stay an
//! `ExpressionList` so substitution can still reach nested invocations.
//!
//! ## Pipeline Flow
//!
//! ```text
//! Source → Lexer → Tokens → Parser → Program
//!                                       ↓
//!                          Collector (macro table + validation)
//!                                       ↓
//!                          Expander → text + diagnostics + source map
//! ```
//!
//! Definition bodies are read-only templates. Substitution always produces
//! fresh nodes (see `expander::substitute`).

use serde::{Deserialize, Serialize};

// =============================================================================
// PROGRAM STRUCTURE
// =============================================================================

/// A complete source unit
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl Program {
    pub fn definitions(&self) -> impl Iterator<Item = &MacroDefinition> {
        self.statements.iter().filter_map(|s| match s {
            Statement::MacroDefinition(def) => Some(def),
            Statement::CodeLine(_) => None,
        })
    }
}

/// Top-level statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Statement {
    MacroDefinition(MacroDefinition),
    CodeLine(CodeLine),
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::MacroDefinition(def) => def.span,
            Statement::CodeLine(line) => line.span,
        }
    }
}

/// `#define name(params) body`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroDefinition {
    pub name: String,
    /// `None` for `#define name body`, `Some(vec![])` for `#define name() body`
    pub parameters: Option<Vec<String>>,
    pub body: Vec<Content>,
    pub span: Span,
}

impl MacroDefinition {
    /// Number of declared parameters
    pub fn arity(&self) -> usize {
        self.parameters.as_ref().map_or(0, Vec::len)
    }

    pub fn parameter_names(&self) -> &[String] {
        self.parameters.as_deref().unwrap_or(&[])
    }

    /// Render the body back to source text
    pub fn body_to_string(&self) -> String {
        self.body.iter().map(Content::to_source_string).collect()
    }
}

/// Any statement that is not a definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeLine {
    pub content: Vec<Content>,
    pub span: Span,
}

// =============================================================================
// CONTENT NODES
// =============================================================================

/// Statement-level content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Content {
    RawCommand(RawCommand),
    Text(Text),
    MacroInvocation(MacroInvocation),
    BuiltinCall(BuiltinCall),
    ArrayLiteral(ArrayLiteral),
}

impl Content {
    pub fn span(&self) -> Span {
        match self {
            Content::RawCommand(n) => n.span,
            Content::Text(n) => n.span,
            Content::MacroInvocation(n) => n.span,
            Content::BuiltinCall(n) => n.span,
            Content::ArrayLiteral(n) => n.span,
        }
    }

    /// Render back to source text
    pub fn to_source_string(&self) -> String {
        match self {
            Content::RawCommand(n) => n.commands.clone(),
            Content::Text(n) => n.value.clone(),
            Content::MacroInvocation(n) => n.to_source_string(),
            Content::BuiltinCall(n) => n.to_source_string(),
            Content::ArrayLiteral(n) => n.to_source_string(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(t) => Some(&t.value),
            _ => None,
        }
    }
}

/// A run of target-language commands (`><+-.[]`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCommand {
    pub commands: String,
    pub span: Span,
}

/// Literal text copied through to the output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    pub value: String,
    pub span: Span,
}

/// `@name` / `#name` with an optional argument list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroInvocation {
    pub name: String,
    /// The sigil character that introduced the invocation (`@` or `#`)
    pub sigil: char,
    /// `None` when written without parentheses
    pub arguments: Option<Vec<Expression>>,
    pub span: Span,
    /// Set when substitution rewrote this node; literal echo then renders
    /// from the tree instead of the source slice.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub synthesized: bool,
}

impl MacroInvocation {
    pub fn argument_count(&self) -> usize {
        self.arguments.as_ref().map_or(0, Vec::len)
    }

    pub fn arguments(&self) -> &[Expression] {
        self.arguments.as_deref().unwrap_or(&[])
    }

    pub fn to_source_string(&self) -> String {
        match &self.arguments {
            None => format!("{}{}", self.sigil, self.name),
            Some(args) => format!(
                "{}{}({})",
                self.sigil,
                self.name,
                join_expressions(args)
            ),
        }
    }
}

/// The builtin control constructs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Builtin {
    Repeat,
    If,
    For,
    Reverse,
}

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Repeat => "repeat",
            Builtin::If => "if",
            Builtin::For => "for",
            Builtin::Reverse => "reverse",
        }
    }

    /// Fixed argument count, checked at expansion time
    pub fn arity(self) -> usize {
        match self {
            Builtin::Repeat => 2,
            Builtin::If | Builtin::For => 3,
            Builtin::Reverse => 1,
        }
    }
}

/// `{repeat(..)}`, `{if(..)}`, `{for(..)}`, `{reverse(..)}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuiltinCall {
    pub builtin: Builtin,
    pub arguments: Vec<Expression>,
    pub span: Span,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub synthesized: bool,
}

impl BuiltinCall {
    pub fn to_source_string(&self) -> String {
        let args = match (self.builtin, self.arguments.as_slice()) {
            (Builtin::For, [binder, array, body]) => format!(
                "{} in {}, {}",
                binder.to_source_string(),
                array.to_source_string(),
                body.to_source_string()
            ),
            _ => join_expressions(&self.arguments),
        };
        format!("{{{}({})}}", self.builtin.name(), args)
    }
}

/// `{a, b, c}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayLiteral {
    pub elements: Vec<Expression>,
    pub span: Span,
}

impl ArrayLiteral {
    pub fn to_source_string(&self) -> String {
        format!("{{{}}}", join_expressions(&self.elements))
    }
}

// =============================================================================
// EXPRESSIONS
// =============================================================================

/// Argument-position node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expression {
    Number(Number),
    Identifier(Identifier),
    Text(Text),
    RawCommand(RawCommand),
    MacroInvocation(MacroInvocation),
    BuiltinCall(BuiltinCall),
    ArrayLiteral(ArrayLiteral),
    ExpressionList(ExpressionList),
    TuplePattern(TuplePattern),
    IndexedBinder(IndexedBinder),
}

impl Expression {
    pub fn span(&self) -> Span {
        match self {
            Expression::Number(n) => n.span,
            Expression::Identifier(n) => n.span,
            Expression::Text(n) => n.span,
            Expression::RawCommand(n) => n.span,
            Expression::MacroInvocation(n) => n.span,
            Expression::BuiltinCall(n) => n.span,
            Expression::ArrayLiteral(n) => n.span,
            Expression::ExpressionList(n) => n.span,
            Expression::TuplePattern(n) => n.span,
            Expression::IndexedBinder(n) => n.span,
        }
    }

    pub fn to_source_string(&self) -> String {
        match self {
            Expression::Number(n) => n.text.clone(),
            Expression::Identifier(n) => n.name.clone(),
            Expression::Text(n) => n.value.clone(),
            Expression::RawCommand(n) => n.commands.clone(),
            Expression::MacroInvocation(n) => n.to_source_string(),
            Expression::BuiltinCall(n) => n.to_source_string(),
            Expression::ArrayLiteral(n) => n.to_source_string(),
            Expression::ExpressionList(n) => {
                n.items.iter().map(Content::to_source_string).collect()
            }
            Expression::TuplePattern(n) => format!("({})", n.names.join(", ")),
            Expression::IndexedBinder(n) => {
                format!("{}, {}", n.binder.to_source_string(), n.index.name)
            }
        }
    }

    pub fn as_identifier(&self) -> Option<&str> {
        match self {
            Expression::Identifier(id) => Some(&id.name),
            _ => None,
        }
    }
}

/// Numeric or character literal, already decoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Number {
    pub value: i64,
    /// Lexeme as written (`0x10`, `'A'`, `-3`)
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

/// Mixed expression content, e.g. `+@step(n)>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionList {
    pub items: Vec<Content>,
    pub span: Span,
}

/// `(a, b)` loop binder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuplePattern {
    pub names: Vec<String>,
    pub span: Span,
}

/// `v, i` or `(a, b), i`: a loop binder plus the 0-based element index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedBinder {
    pub binder: Box<Expression>,
    pub index: Identifier,
    pub span: Span,
}

fn join_expressions(exprs: &[Expression]) -> String {
    exprs
        .iter()
        .map(Expression::to_source_string)
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// SOURCE SPAN
// =============================================================================

/// Source span. Offsets are bytes; lines and columns are 1-based and
/// columns count characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// Byte offset of start
    pub start: usize,
    /// Byte offset of end
    pub end: usize,
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl Span {
    /// Create a span covering two spans (`a` must start first)
    pub fn merge(a: Span, b: Span) -> Span {
        Span {
            start: a.start,
            end: b.end.max(a.end),
            line: a.line,
            column: a.column,
            end_line: b.end_line,
            end_column: b.end_column,
        }
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Number of source lines touched
    pub fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.line) + 1
    }

    /// Source text under this span, if the span is in bounds
    pub fn slice<'s>(&self, source: &'s str) -> Option<&'s str> {
        source.get(self.start..self.end)
    }
}

// =============================================================================
// TREE WALKING UTILITIES
// =============================================================================

/// Visitor trait for walking the AST
pub trait AstVisitor {
    fn visit_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::MacroDefinition(def) => self.visit_definition(def),
            Statement::CodeLine(line) => {
                for content in &line.content {
                    self.visit_content(content);
                }
            }
        }
    }

    fn visit_definition(&mut self, def: &MacroDefinition) {
        for content in &def.body {
            self.visit_content(content);
        }
    }

    fn visit_content(&mut self, content: &Content) {
        match content {
            Content::RawCommand(_) | Content::Text(_) => {}
            Content::MacroInvocation(inv) => self.visit_invocation(inv),
            Content::BuiltinCall(call) => self.visit_builtin(call),
            Content::ArrayLiteral(array) => {
                for element in &array.elements {
                    self.visit_expression(element);
                }
            }
        }
    }

    fn visit_expression(&mut self, expr: &Expression) {
        match expr {
            Expression::Number(_)
            | Expression::Identifier(_)
            | Expression::Text(_)
            | Expression::RawCommand(_)
            | Expression::TuplePattern(_)
            | Expression::IndexedBinder(_) => {}
            Expression::MacroInvocation(inv) => self.visit_invocation(inv),
            Expression::BuiltinCall(call) => self.visit_builtin(call),
            Expression::ArrayLiteral(array) => {
                for element in &array.elements {
                    self.visit_expression(element);
                }
            }
            Expression::ExpressionList(list) => {
                for item in &list.items {
                    self.visit_content(item);
                }
            }
        }
    }

    /// Visit an invocation - default walks the arguments
    fn visit_invocation(&mut self, inv: &MacroInvocation) {
        for arg in inv.arguments() {
            self.visit_expression(arg);
        }
    }

    /// Visit a builtin call - default walks the arguments
    fn visit_builtin(&mut self, call: &BuiltinCall) {
        for arg in &call.arguments {
            self.visit_expression(arg);
        }
    }
}

/// Collect every invocation name referenced in the program, in source order
pub fn find_invocations(program: &Program) -> Vec<(String, Span)> {
    struct Collector {
        refs: Vec<(String, Span)>,
    }

    impl AstVisitor for Collector {
        fn visit_invocation(&mut self, inv: &MacroInvocation) {
            self.refs.push((inv.name.clone(), inv.span));
            for arg in inv.arguments() {
                self.visit_expression(arg);
            }
        }
    }

    let mut collector = Collector { refs: Vec::new() };
    for stmt in &program.statements {
        collector.visit_statement(stmt);
    }
    collector.refs
}
