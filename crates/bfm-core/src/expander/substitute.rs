//! Parameter substitution
//!
//! Substitution never touches definition trees: every call returns a fresh
//! node. Text is rewritten word by word, so a parameter `n` never matches
//! inside `next`, and a single pass means substituted values are not
//! rescanned.
//!
//! Loop binders may additionally be *segmented*: inside a `for` body a word
//! that is not itself a binder but splits entirely into binder names
//! (`xy` with binders `x`, `y`) becomes the concatenation of their values.

use std::collections::BTreeMap;

use crate::ast::*;
use crate::collector::binder_names;
use crate::lexer::{is_ident_char, is_ident_start, literal_value};
use crate::parser::is_identifier;

#[derive(Debug, Clone, Default)]
pub(crate) struct Bindings {
    /// Longest name first
    entries: Vec<(String, String)>,
    segmenting: bool,
}

impl Bindings {
    pub fn new(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut entries: Vec<(String, String)> = pairs.into_iter().collect();
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self {
            entries,
            segmenting: false,
        }
    }

    /// Bind names to row values; missing values bind to empty text
    pub fn positional(names: &[String], values: Vec<String>) -> Self {
        let mut values = values.into_iter();
        Self::new(
            names
                .iter()
                .map(|name| (name.clone(), values.next().unwrap_or_default())),
        )
    }

    pub fn segmenting(mut self) -> Self {
        self.segmenting = true;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(bound, _)| bound == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.entries.iter().cloned().collect()
    }

    /// Copy without the given names (shadowed by an inner binder)
    pub fn without(&self, names: &[String]) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|(bound, _)| !names.contains(bound))
                .cloned()
                .collect(),
            segmenting: self.segmenting,
        }
    }

    fn resolve_word(&self, word: &str) -> Option<String> {
        if let Some(value) = self.get(word) {
            return Some(value.to_string());
        }
        if self.segmenting {
            return self.segment(word, 0);
        }
        None
    }

    /// Split `rest` into at least two binder names, longest names first
    fn segment(&self, rest: &str, parts: usize) -> Option<String> {
        if rest.is_empty() {
            return (parts >= 2).then(String::new);
        }
        self.entries.iter().find_map(|(name, value)| {
            let tail = rest.strip_prefix(name.as_str())?;
            if name.is_empty() {
                return None;
            }
            self.segment(tail, parts + 1)
                .map(|expanded| format!("{}{}", value, expanded))
        })
    }

    /// Replace whole words only
    pub fn replace_words(&self, text: &str) -> String {
        if self.is_empty() {
            return text.to_string();
        }

        let mut out = String::with_capacity(text.len());
        let mut word_start: Option<usize> = None;

        for (i, c) in text.char_indices() {
            match (is_ident_char(c), word_start) {
                (true, None) => word_start = Some(i),
                (true, Some(_)) => {}
                (false, Some(start)) => {
                    self.push_word(&mut out, &text[start..i]);
                    word_start = None;
                    out.push(c);
                }
                (false, None) => out.push(c),
            }
        }
        if let Some(start) = word_start {
            self.push_word(&mut out, &text[start..]);
        }
        out
    }

    fn push_word(&self, out: &mut String, word: &str) {
        let replacement = word
            .chars()
            .next()
            .filter(|&c| is_ident_start(c))
            .and_then(|_| self.resolve_word(word));
        match replacement {
            Some(value) => out.push_str(&value),
            None => out.push_str(word),
        }
    }
}

// =============================================================================
// TREE SUBSTITUTION
// =============================================================================

pub(crate) fn substitute_content(content: &Content, bindings: &Bindings) -> Content {
    match content {
        Content::Text(text) => Content::Text(Text {
            value: bindings.replace_words(&text.value),
            span: text.span,
        }),
        Content::RawCommand(_) => content.clone(),
        Content::MacroInvocation(inv) => {
            Content::MacroInvocation(substitute_invocation(inv, bindings))
        }
        Content::BuiltinCall(call) => Content::BuiltinCall(substitute_builtin(call, bindings)),
        Content::ArrayLiteral(array) => Content::ArrayLiteral(substitute_array(array, bindings)),
    }
}

pub(crate) fn substitute_expression(expr: &Expression, bindings: &Bindings) -> Expression {
    match expr {
        Expression::Identifier(id) => match bindings.resolve_word(&id.name) {
            Some(value) => value_expression(value, id.span),
            None => expr.clone(),
        },
        Expression::Text(text) => Expression::Text(Text {
            value: bindings.replace_words(&text.value),
            span: text.span,
        }),
        Expression::Number(_)
        | Expression::RawCommand(_)
        | Expression::TuplePattern(_)
        | Expression::IndexedBinder(_) => expr.clone(),
        Expression::MacroInvocation(inv) => {
            Expression::MacroInvocation(substitute_invocation(inv, bindings))
        }
        Expression::BuiltinCall(call) => {
            Expression::BuiltinCall(substitute_builtin(call, bindings))
        }
        Expression::ArrayLiteral(array) => {
            Expression::ArrayLiteral(substitute_array(array, bindings))
        }
        Expression::ExpressionList(list) => Expression::ExpressionList(ExpressionList {
            items: list
                .items
                .iter()
                .map(|item| substitute_content(item, bindings))
                .collect(),
            span: list.span,
        }),
    }
}

/// A parameter bound to a macro name renames the invocation (`@f` with `f = clear`)
fn substitute_invocation(inv: &MacroInvocation, bindings: &Bindings) -> MacroInvocation {
    let name = match bindings.get(&inv.name) {
        Some(value) if is_identifier(value) => value.to_string(),
        _ => inv.name.clone(),
    };
    MacroInvocation {
        name,
        sigil: inv.sigil,
        arguments: inv.arguments.as_ref().map(|args| {
            args.iter()
                .map(|arg| substitute_expression(arg, bindings))
                .collect()
        }),
        span: inv.span,
        synthesized: true,
    }
}

fn substitute_builtin(call: &BuiltinCall, bindings: &Bindings) -> BuiltinCall {
    let arguments = match (call.builtin, call.arguments.as_slice()) {
        (Builtin::For, [binder, array, body]) => {
            let inner = bindings.without(&binder_names(binder));
            vec![
                binder.clone(),
                substitute_expression(array, bindings),
                substitute_expression(body, &inner),
            ]
        }
        _ => call
            .arguments
            .iter()
            .map(|arg| substitute_expression(arg, bindings))
            .collect(),
    };
    BuiltinCall {
        builtin: call.builtin,
        arguments,
        span: call.span,
        synthesized: true,
    }
}

fn substitute_array(array: &ArrayLiteral, bindings: &Bindings) -> ArrayLiteral {
    ArrayLiteral {
        elements: array
            .elements
            .iter()
            .map(|element| substitute_expression(element, bindings))
            .collect(),
        span: array.span,
    }
}

fn value_expression(value: String, span: Span) -> Expression {
    match literal_value(&value) {
        Some(number) => Expression::Number(Number {
            value: number,
            text: value,
            span,
        }),
        None => Expression::Text(Text { value, span }),
    }
}
