//! Builtin control constructs: `repeat`, `if`, `for`, `reverse`
//!
//! Scalar arguments (repeat count, condition) and array arguments are
//! evaluated to text first and then interpreted, so a macro or parameter can
//! supply them. Bodies are expanded directly into the current output.

use super::substitute::{substitute_expression, Bindings};
use super::Expander;
use crate::ast::{BuiltinCall, Builtin, Expression};
use crate::collector::split_binder;
use crate::diagnostics;
use crate::lexer::{literal_value, string_literal_chars};

impl Expander<'_> {
    pub(super) fn expand_builtin(&mut self, call: &BuiltinCall) {
        let expected = call.builtin.arity();
        if call.arguments.len() != expected {
            self.report(diagnostics::builtin_arity(
                call.builtin.name(),
                expected,
                call.arguments.len(),
                call.span,
            ));
            self.echo_builtin(call);
            return;
        }

        match (call.builtin, call.arguments.as_slice()) {
            (Builtin::Repeat, [count, body]) => self.expand_repeat(call, count, body),
            (Builtin::If, [cond, then, otherwise]) => self.expand_if(call, cond, then, otherwise),
            (Builtin::For, [binder, array, body]) => self.expand_for(call, binder, array, body),
            (Builtin::Reverse, [array]) => self.expand_reverse(call, array),
            _ => self.echo_builtin(call),
        }
    }

    fn expand_repeat(&mut self, call: &BuiltinCall, count: &Expression, body: &Expression) {
        let value = self.evaluate(count);
        match literal_value(&value) {
            Some(times) if times >= 0 => {
                for _ in 0..times {
                    self.expand_expression(body);
                }
            }
            _ => {
                self.report(diagnostics::invalid_repeat_count(&value, call.span));
                self.echo_builtin(call);
            }
        }
    }

    /// Only the selected branch is ever expanded
    fn expand_if(
        &mut self,
        call: &BuiltinCall,
        cond: &Expression,
        then: &Expression,
        otherwise: &Expression,
    ) {
        let value = self.evaluate(cond);
        match literal_value(&value) {
            Some(0) => self.expand_expression(otherwise),
            Some(_) => self.expand_expression(then),
            None => {
                self.report(diagnostics::invalid_condition(&value, call.span));
                self.echo_builtin(call);
            }
        }
    }

    fn expand_for(
        &mut self,
        call: &BuiltinCall,
        binder: &Expression,
        array: &Expression,
        body: &Expression,
    ) {
        let (names, index) = split_binder(binder);
        if names.is_empty() {
            self.report(diagnostics::invalid_binder(
                &binder.to_source_string(),
                binder.span(),
            ));
            self.echo_builtin(call);
            return;
        }

        let value = self.evaluate(array);
        let Some(elements) = parse_array_text(&value) else {
            self.report(diagnostics::for_requires_array(&value, call.span));
            self.echo_builtin(call);
            return;
        };

        let rows = if names.len() == 1 {
            elements.into_iter().map(|element| vec![element]).collect()
        } else {
            tuple_rows(elements)
        };

        let mut bound = names.clone();
        bound.extend(index.map(str::to_string));

        for (i, mut row) in rows.into_iter().enumerate() {
            if index.is_some() {
                row.resize(names.len(), String::new());
                row.push(i.to_string());
            }
            let bindings = Bindings::positional(&bound, row).segmenting();
            let body = substitute_expression(body, &bindings);
            self.expand_expression(&body);
        }
    }

    fn expand_reverse(&mut self, call: &BuiltinCall, array: &Expression) {
        let value = self.evaluate(array);
        match parse_array_text(&value) {
            Some(mut elements) => {
                elements.reverse();
                self.emit(&format!("{{{}}}", elements.join(", ")), call.span);
            }
            None => {
                self.report(diagnostics::reverse_requires_array(&value, call.span));
                self.echo_builtin(call);
            }
        }
    }
}

/// Rows for a tuple binder. An array of scalars is one row; a scalar among
/// array rows binds to the first name only.
fn tuple_rows(elements: Vec<String>) -> Vec<Vec<String>> {
    if elements.is_empty() {
        return Vec::new();
    }

    let parsed: Vec<Option<Vec<String>>> =
        elements.iter().map(|element| parse_array_text(element)).collect();
    if parsed.iter().all(Option::is_none) {
        return vec![elements];
    }

    elements
        .into_iter()
        .zip(parsed)
        .map(|(element, row)| row.unwrap_or_else(|| vec![element]))
        .collect()
}

// =============================================================================
// ARRAY TEXT
// =============================================================================

/// Interpret expanded text as an array.
///
/// Accepted forms: `{a, b, c}` (outer braces closing each other), a string
/// literal (its character codes), or a bare top-level comma list `a, b`.
fn parse_array_text(text: &str) -> Option<Vec<String>> {
    let text = text.trim();

    if let Some(chars) = string_literal_chars(text) {
        return Some(chars.into_iter().map(|c| u32::from(c).to_string()).collect());
    }

    if let Some(inner) = text.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
        if outer_braces_pair(text) {
            return Some(split_top_level(inner));
        }
    }

    let commas = top_level_commas(text);
    if commas.is_empty() {
        return None;
    }
    Some(split_at(text, &commas))
}

/// Does the opening brace at 0 close at the last character?
fn outer_braces_pair(text: &str) -> bool {
    let mut depth = 0i32;
    let mut quotes = QuoteState::default();
    for (i, c) in text.char_indices() {
        if quotes.in_string(c) {
            continue;
        }
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return i + c.len_utf8() == text.len();
                }
            }
            _ => {}
        }
    }
    false
}

fn split_top_level(text: &str) -> Vec<String> {
    split_at(text, &top_level_commas(text))
}

/// Byte offsets of commas outside nested braces, parentheses and strings
fn top_level_commas(text: &str) -> Vec<usize> {
    let mut depth = 0i32;
    let mut quotes = QuoteState::default();
    let mut commas = Vec::new();
    for (i, c) in text.char_indices() {
        if quotes.in_string(c) {
            continue;
        }
        match c {
            '{' | '(' => depth += 1,
            '}' | ')' => depth -= 1,
            ',' if depth == 0 => commas.push(i),
            _ => {}
        }
    }
    commas
}

/// Split at the given commas; elements are trimmed and empty ones dropped
fn split_at(text: &str, commas: &[usize]) -> Vec<String> {
    let mut elements = Vec::with_capacity(commas.len() + 1);
    let mut start = 0;
    for comma in commas.iter().copied().chain(std::iter::once(text.len())) {
        let element = text[start..comma].trim();
        if !element.is_empty() {
            elements.push(element.to_string());
        }
        start = comma + 1;
    }
    elements
}

#[derive(Default)]
struct QuoteState {
    open: bool,
    escaped: bool,
}

impl QuoteState {
    /// Feed one character; true while it belongs to a string literal
    fn in_string(&mut self, c: char) -> bool {
        if !self.open {
            if c == '"' {
                self.open = true;
                return true;
            }
            return false;
        }
        if self.escaped {
            self.escaped = false;
        } else if c == '\\' {
            self.escaped = true;
        } else if c == '"' {
            self.open = false;
        }
        true
    }
}
