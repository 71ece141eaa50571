//! Definition collection and early validation
//!
//! Two passes over a parsed program, both before any expansion runs:
//!
//! 1. **Collect** - build the name → definition table. The first definition
//!    of a name wins; later ones are reported as duplicates.
//! 2. **Validate** - walk every body and check each referenced invocation
//!    against the complete table, so sibling forward references are fine.
//!    Names bound by the macro's own parameters or an enclosing `for` binder
//!    are resolved at call time and skipped here.
//!
//! Builtin argument shapes are only checked when the literal is unambiguous
//! (a raw command as a repeat count, a number as a `for` array). Anything
//! that could still change through substitution is left to the expander.

use std::collections::HashMap;

use crate::ast::*;
use crate::diagnostics::{self, Diagnostic};
use crate::lexer::is_ident_char;

// =============================================================================
// MACRO TABLE
// =============================================================================

/// Read-only name → definition table, in source order
#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    definitions: Vec<MacroDefinition>,
    index: HashMap<String, usize>,
}

impl MacroTable {
    pub fn get(&self, name: &str) -> Option<&MacroDefinition> {
        self.index.get(name).map(|&i| &self.definitions[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Definitions in source order
    pub fn iter(&self) -> impl Iterator<Item = &MacroDefinition> {
        self.definitions.iter()
    }

    /// Insert unless the name is taken; returns false for a duplicate
    fn insert(&mut self, def: MacroDefinition) -> bool {
        if self.index.contains_key(&def.name) {
            return false;
        }
        self.index.insert(def.name.clone(), self.definitions.len());
        self.definitions.push(def);
        true
    }
}

#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub table: MacroTable,
    pub diagnostics: Vec<Diagnostic>,
}

// =============================================================================
// PASS 1: COLLECT
// =============================================================================

pub fn collect_definitions(program: &Program) -> Collection {
    let mut collection = Collection::default();

    for def in program.definitions() {
        let span = def.span;
        let name = def.name.clone();
        if !collection.table.insert(def.clone()) {
            collection
                .diagnostics
                .push(diagnostics::duplicate_definition(&name, span));
        }
    }

    tracing::debug!(
        definitions = collection.table.len(),
        duplicates = collection.diagnostics.len(),
        "collected macro definitions"
    );
    collection
}

// =============================================================================
// PASS 2: VALIDATE
// =============================================================================

/// Validate every definition body against the complete table
pub fn validate_definitions(table: &MacroTable) -> Vec<Diagnostic> {
    let mut validator = ReferenceValidator {
        table,
        scopes: Vec::new(),
        diagnostics: Vec::new(),
    };

    for def in table.iter() {
        validator.scopes.push(def.parameter_names().to_vec());
        validator.visit_definition(def);
        validator.scopes.pop();
    }

    tracing::debug!(
        diagnostics = validator.diagnostics.len(),
        "validated macro bodies"
    );
    validator.diagnostics
}

struct ReferenceValidator<'a> {
    table: &'a MacroTable,
    /// Parameter names, then one scope per enclosing `for` binder
    scopes: Vec<Vec<String>>,
    diagnostics: Vec<Diagnostic>,
}

impl ReferenceValidator<'_> {
    fn in_scope(&self, name: &str) -> bool {
        self.scopes.iter().flatten().any(|bound| bound == name)
    }

    fn check_builtin_shape(&mut self, call: &BuiltinCall) {
        let diag = match (call.builtin, call.arguments.as_slice()) {
            (Builtin::Repeat, [count, _]) => {
                unambiguous_literal(count, |n| n < 0)
                    .map(|value| diagnostics::invalid_repeat_count(&value, call.span))
            }
            (Builtin::If, [cond, _, _]) => unambiguous_literal(cond, |_| false)
                .map(|value| diagnostics::invalid_condition(&value, call.span)),
            (Builtin::For, [_, array, _]) => scalar_literal(array)
                .map(|value| diagnostics::for_requires_array(&value, call.span)),
            (Builtin::Reverse, [array]) => scalar_literal(array)
                .map(|value| diagnostics::reverse_requires_array(&value, call.span)),
            _ => None,
        };
        self.diagnostics.extend(diag);
    }
}

impl AstVisitor for ReferenceValidator<'_> {
    fn visit_invocation(&mut self, inv: &MacroInvocation) {
        if !self.in_scope(&inv.name) && !self.table.contains(&inv.name) {
            self.diagnostics
                .push(diagnostics::undefined_macro(&inv.name, inv.span));
        }
        for arg in inv.arguments() {
            self.visit_expression(arg);
        }
    }

    fn visit_builtin(&mut self, call: &BuiltinCall) {
        self.check_builtin_shape(call);

        match (call.builtin, call.arguments.as_slice()) {
            (Builtin::For, [binder, array, body]) => {
                self.visit_expression(array);
                self.scopes.push(binder_names(binder));
                self.visit_expression(body);
                self.scopes.pop();
            }
            _ => {
                for arg in &call.arguments {
                    self.visit_expression(arg);
                }
            }
        }
    }
}

/// Names bound by a `for` binder, index variable included
pub(crate) fn binder_names(binder: &Expression) -> Vec<String> {
    let (mut names, index) = split_binder(binder);
    if !names.is_empty() {
        names.extend(index.map(str::to_string));
    }
    names
}

/// Pattern names and index variable of a `for` binder
pub(crate) fn split_binder(binder: &Expression) -> (Vec<String>, Option<&str>) {
    match binder {
        Expression::Identifier(id) => (vec![id.name.clone()], None),
        Expression::TuplePattern(tuple) => (tuple.names.clone(), None),
        Expression::IndexedBinder(indexed) => match indexed.binder.as_ref() {
            Expression::IndexedBinder(_) => (Vec::new(), None),
            inner => (split_binder(inner).0, Some(indexed.index.name.as_str())),
        },
        _ => (Vec::new(), None),
    }
}

/// Literal that can never become an integer, or a number rejected by `bad`
fn unambiguous_literal(expr: &Expression, bad: impl Fn(i64) -> bool) -> Option<String> {
    match expr {
        Expression::Number(n) if bad(n.value) => Some(n.value.to_string()),
        Expression::RawCommand(raw) => Some(raw.commands.clone()),
        Expression::Text(text) if !text.value.chars().any(is_ident_char) => {
            Some(text.value.clone())
        }
        _ => None,
    }
}

/// Literal that can never become an array
fn scalar_literal(expr: &Expression) -> Option<String> {
    match expr {
        Expression::Number(n) => Some(n.value.to_string()),
        Expression::RawCommand(raw) => Some(raw.commands.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use crate::lexer::{tokenize, LexOptions};
    use crate::parser::parse;

    fn collect(source: &str) -> Collection {
        let parsed = parse(&tokenize(source, LexOptions::default()));
        collect_definitions(&parsed.program)
    }

    fn validate(source: &str) -> Vec<Diagnostic> {
        validate_definitions(&collect(source).table)
    }

    #[test]
    fn test_first_definition_wins() {
        let collection = collect("#define a +\n#define a -");
        assert_eq!(collection.table.len(), 1);
        assert_eq!(collection.table.get("a").unwrap().body_to_string(), "+");
        assert_eq!(collection.diagnostics.len(), 1);
        assert_eq!(
            collection.diagnostics[0].message,
            "Duplicate macro definition: 'a'"
        );
        assert_eq!(collection.diagnostics[0].location.unwrap().line, 1);
    }

    #[test]
    fn test_forward_reference_is_valid() {
        assert!(validate("#define a @b\n#define b +").is_empty());
    }

    #[test]
    fn test_every_missing_reference_is_reported() {
        let diags = validate("#define test @foo @bar @baz");
        assert_eq!(diags.len(), 3);
        assert!(diags.iter().all(|d| d.kind == DiagnosticKind::Undefined));
        assert_eq!(diags[1].message, "Macro 'bar' is not defined");
        let loc = diags[1].location.unwrap();
        assert_eq!((loc.line, loc.column, loc.length), (0, 18, 4));
    }

    #[test]
    fn test_parameter_names_shadow() {
        assert!(validate("#define apply(f) @f").is_empty());
    }

    #[test]
    fn test_for_binders_shadow() {
        assert!(validate("#define each {for(m in {a, b}, @m)}").is_empty());
        assert_eq!(validate("#define each {for(m in {a, b}, @n)}").len(), 1);
        assert!(validate("#define each {for(m, i in {a, b}, @i @m)}").is_empty());
    }

    #[test]
    fn test_split_binder_separates_index() {
        let program = parse(&tokenize("{for((a, b), i in {}, ab)}", LexOptions::default())).program;
        let Statement::CodeLine(line) = &program.statements[0] else {
            panic!("expected code line");
        };
        let Content::BuiltinCall(call) = &line.content[0] else {
            panic!("expected builtin");
        };
        let (names, index) = split_binder(&call.arguments[0]);
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(index, Some("i"));
        assert_eq!(binder_names(&call.arguments[0]), vec!["a", "b", "i"]);
    }

    #[test]
    fn test_nested_arguments_are_checked() {
        let diags = validate("#define x +\n#define y @x(@missing)");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "Macro 'missing' is not defined");
    }

    #[test]
    fn test_soft_builtin_shapes() {
        // identifier count may still be substituted
        assert!(validate("#define r(n) {repeat(n, +)}").is_empty());

        let diags = validate("#define r {repeat(+, 3)}");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "Invalid repeat count: '+'");

        let diags = validate("#define r {for(i in 5, i)}");
        assert_eq!(diags[0].message, "for() expects an array, got '5'");
    }

    #[test]
    fn test_table_keeps_source_order() {
        let collection = collect("#define z +\n#define a -\n#define m .");
        let names: Vec<_> = collection.table.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["z", "a", "m"]);
    }
}
