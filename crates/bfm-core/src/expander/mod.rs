//! Expander - walks the program and produces target text
//!
//! ## Pipeline Flow
//!
//! ```text
//! Statement ─→ Content ─┬─→ RawCommand / Text ──────────────→ emit
//!                       ├─→ MacroInvocation ─→ bind args ─→ body (substituted)
//!                       ├─→ BuiltinCall ─────→ repeat / if / for / reverse
//!                       └─→ ArrayLiteral ────→ "{a, b}"
//! ```
//!
//! Every path ends in [`Expander::emit`], which either appends to the output
//! (tracking position and recording a source map entry) or, while an
//! argument is being evaluated, to the innermost capture buffer. Arguments
//! are evaluated eagerly in the caller's frame before the callee's frame is
//! pushed.
//!
//! Nothing here fails: every problem becomes a diagnostic plus a literal
//! echo of the construct that could not be expanded.

mod builtins;
mod context;
mod substitute;

use std::collections::HashSet;

use crate::ast::*;
use crate::collector::MacroTable;
use crate::diagnostics::{self, Diagnostic};
use crate::lines::{collapse_empty_lines, line_slots};
use crate::options::ExpandOptions;
use crate::source_map::{Position, Range, SourceMap, SourceMapBuilder};

use context::{invocation_signature, CallFrame, ExpansionContext};
use substitute::{substitute_content, Bindings};

/// Text, diagnostics and optional source map of one run
#[derive(Debug)]
pub(crate) struct ExpansionOutput {
    pub text: String,
    pub diagnostics: Vec<Diagnostic>,
    pub source_map: Option<SourceMap>,
}

/// Output text with a running 1-based position
#[derive(Debug)]
struct OutputBuffer {
    text: String,
    line: usize,
    column: usize,
}

impl OutputBuffer {
    fn new() -> Self {
        Self {
            text: String::new(),
            line: 1,
            column: 1,
        }
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    /// Append and return the range the text now occupies
    fn push(&mut self, text: &str) -> Range {
        let start = self.position();
        for c in text.chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.text.push_str(text);
        Range {
            start,
            end: self.position(),
        }
    }
}

pub(crate) struct Expander<'a> {
    source: &'a str,
    table: &'a MacroTable,
    options: &'a ExpandOptions,
    context: ExpansionContext,
    output: OutputBuffer,
    /// Open argument evaluations, innermost last
    captures: Vec<String>,
    /// Span of the statement-level node being expanded
    statement_root: Option<Span>,
    source_map: Option<SourceMapBuilder>,
    diagnostics: Vec<Diagnostic>,
    seen: HashSet<Diagnostic>,
}

impl<'a> Expander<'a> {
    pub fn new(source: &'a str, table: &'a MacroTable, options: &'a ExpandOptions) -> Self {
        Self {
            source,
            table,
            options,
            context: ExpansionContext::default(),
            output: OutputBuffer::new(),
            captures: Vec::new(),
            statement_root: None,
            source_map: options.generate_source_map.then(SourceMapBuilder::new),
            diagnostics: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Diagnostics reported by earlier passes; expansion will not repeat them
    pub fn with_reported(mut self, reported: impl IntoIterator<Item = Diagnostic>) -> Self {
        for diag in reported {
            self.report(diag);
        }
        self
    }

    pub fn run(mut self, program: &Program) -> ExpansionOutput {
        for (i, stmt) in program.statements.iter().enumerate() {
            if i > 0 {
                self.newline();
            }

            let first_line = self.output.line;
            if let Statement::CodeLine(line) = stmt {
                for content in &line.content {
                    self.statement_root = Some(content.span());
                    self.expand_content(content);
                }
                self.statement_root = None;
            }

            // definitions and folded lines still own their source lines
            let produced = self.output.line - first_line + 1;
            for _ in produced..line_slots(stmt) {
                self.newline();
            }
        }

        let mut text = self.output.text;
        let mut source_map = self.source_map.map(SourceMapBuilder::build);

        if self.options.collapse_empty_lines {
            let (collapsed, remap) = collapse_empty_lines(&text);
            tracing::debug!(kept_lines = remap.kept_lines(), "collapsed empty lines");
            text = collapsed;
            source_map = source_map.map(|map| map.remap_expanded_lines(&remap));
        }

        tracing::debug!(
            output_len = text.len(),
            diagnostics = self.diagnostics.len(),
            mapped = source_map.as_ref().map_or(0, |m| m.entries().len()),
            "expanded program"
        );

        ExpansionOutput {
            text,
            diagnostics: self.diagnostics,
            source_map,
        }
    }

    // =========================================================================
    // OUTPUT
    // =========================================================================

    /// Append expanded text attributed to `origin` (or the active call site)
    fn emit(&mut self, text: &str, origin: Span) {
        if text.is_empty() {
            return;
        }
        if let Some(capture) = self.captures.last_mut() {
            capture.push_str(text);
            return;
        }

        let range = self.output.push(text);
        if let Some(builder) = self.source_map.as_mut() {
            builder.add(self.context.map_entry(range, origin));
        }
    }

    fn newline(&mut self) {
        match self.captures.last_mut() {
            Some(capture) => capture.push('\n'),
            None => {
                self.output.push("\n");
            }
        }
    }

    /// Expand an expression into a string instead of the output
    fn evaluate(&mut self, expr: &Expression) -> String {
        self.captures.push(String::new());
        self.expand_expression(expr);
        let value = self.captures.pop().unwrap_or_default();
        value.trim().to_string()
    }

    /// Literal fallback: the source text when the node is untouched,
    /// otherwise the node rendered back to source. A slice spanning lines is
    /// only copied for a statement-level node, where it fills exactly the
    /// lines it came from.
    fn echo(&mut self, span: Span, synthesized: bool, render: impl FnOnce() -> String) {
        let text = match span.slice(self.source) {
            Some(slice) if !synthesized && !slice.contains('\n') => slice.to_string(),
            Some(slice) if !synthesized && self.echoes_verbatim(span) => slice.to_string(),
            _ => render(),
        };
        self.emit(&text, span);
    }

    fn echoes_verbatim(&self, span: Span) -> bool {
        self.statement_root == Some(span) && self.context.depth() == 0 && self.captures.is_empty()
    }

    fn echo_invocation(&mut self, inv: &MacroInvocation) {
        self.echo(inv.span, inv.synthesized, || inv.to_source_string());
    }

    fn echo_builtin(&mut self, call: &BuiltinCall) {
        self.echo(call.span, call.synthesized, || call.to_source_string());
    }

    fn report(&mut self, diag: Diagnostic) {
        if self.seen.insert(diag.clone()) {
            self.diagnostics.push(diag);
        }
    }

    // =========================================================================
    // CONTENT AND EXPRESSIONS
    // =========================================================================

    fn expand_content(&mut self, content: &Content) {
        match content {
            Content::RawCommand(raw) => self.emit(&raw.commands, raw.span),
            Content::Text(text) => self.emit(&text.value, text.span),
            Content::MacroInvocation(inv) => self.expand_invocation(inv),
            Content::BuiltinCall(call) => self.expand_builtin(call),
            Content::ArrayLiteral(array) => self.expand_array(array),
        }
    }

    fn expand_expression(&mut self, expr: &Expression) {
        match expr {
            Expression::Number(number) => self.emit(&number.value.to_string(), number.span),
            Expression::Identifier(id) => self.emit(&id.name, id.span),
            Expression::Text(text) => self.emit(&text.value, text.span),
            Expression::RawCommand(raw) => self.emit(&raw.commands, raw.span),
            Expression::MacroInvocation(inv) => self.expand_invocation(inv),
            Expression::BuiltinCall(call) => self.expand_builtin(call),
            Expression::ArrayLiteral(array) => self.expand_array(array),
            Expression::ExpressionList(list) => {
                for item in &list.items {
                    self.expand_content(item);
                }
            }
            Expression::TuplePattern(_) | Expression::IndexedBinder(_) => {
                self.emit(&expr.to_source_string(), expr.span())
            }
        }
    }

    /// Arrays are normalized to `{a, b, c}` with every element expanded
    fn expand_array(&mut self, array: &ArrayLiteral) {
        self.emit("{", array.span);
        for (i, element) in array.elements.iter().enumerate() {
            if i > 0 {
                self.emit(", ", array.span);
            }
            self.expand_expression(element);
        }
        self.emit("}", array.span);
    }

    // =========================================================================
    // INVOCATIONS
    // =========================================================================

    fn expand_invocation(&mut self, inv: &MacroInvocation) {
        let table = self.table;
        let Some(def) = table.get(&inv.name) else {
            self.report(diagnostics::undefined_macro(&inv.name, inv.span));
            self.echo_invocation(inv);
            return;
        };

        let signature = invocation_signature(inv);
        if self.context.is_active(&signature) {
            let diag = diagnostics::circular_dependency(
                &self.context.signature_chain(),
                &signature,
                inv.span,
            );
            self.report(diag);
            self.emit(&format!("{}{}", inv.sigil, inv.name), inv.span);
            return;
        }

        if self.context.depth() >= self.options.max_depth {
            self.report(diagnostics::depth_exceeded(self.options.max_depth, inv.span));
            self.echo_invocation(inv);
            return;
        }

        if inv.argument_count() != def.arity() {
            self.report(diagnostics::parameter_mismatch(
                &inv.name,
                def.arity(),
                inv.argument_count(),
                inv.span,
            ));
            self.echo_invocation(inv);
            return;
        }

        // eager: arguments see the caller's bindings, not the callee's
        let values: Vec<String> = inv
            .arguments()
            .iter()
            .map(|arg| self.evaluate(arg))
            .collect();
        let bindings = Bindings::new(def.parameter_names().iter().cloned().zip(values));

        let frame = CallFrame {
            macro_name: def.name.clone(),
            call_site: inv.span,
            parameters: bindings.to_map(),
            signature,
        };

        tracing::trace!(
            macro_name = %def.name,
            depth = self.context.depth() + 1,
            "expanding invocation"
        );

        self.within_frame(frame, |this| {
            for node in &def.body {
                if bindings.is_empty() {
                    this.expand_content(node);
                } else {
                    let node = substitute_content(node, &bindings);
                    this.expand_content(&node);
                }
            }
        });
    }

    /// Push `frame` for the duration of `f`; the pop happens on every path
    fn within_frame(&mut self, frame: CallFrame, f: impl FnOnce(&mut Self)) {
        self.context.push(frame);
        f(self);
        self.context.pop();
    }
}
