//! Unified Diagnostics Module
//!
//! Single diagnostic type used across parsing, definition collection and
//! expansion. Every condition the engine can hit is reported as a value in
//! the result; nothing here aborts a run.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ast::Span;

/// Diagnostic kinds surfaced to callers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Invocation of a name with no definition
    Undefined,
    /// Argument count differs from the declared parameter count
    ParameterMismatch,
    /// Invocation signature already active on the call chain
    CircularDependency,
    /// Malformed source, invalid builtin argument, depth ceiling
    SyntaxError,
}

impl DiagnosticKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::Undefined => "undefined",
            DiagnosticKind::ParameterMismatch => "parameter_mismatch",
            DiagnosticKind::CircularDependency => "circular_dependency",
            DiagnosticKind::SyntaxError => "syntax_error",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 0-based location of a diagnostic
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
    /// Length in bytes
    pub length: usize,
}

impl From<Span> for SourceLocation {
    fn from(span: Span) -> Self {
        Self {
            line: span.line.saturating_sub(1),
            column: span.column.saturating_sub(1),
            length: span.len(),
        }
    }
}

/// A diagnostic message with optional location
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: None,
        }
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::SyntaxError, message)
    }

    /// Add source span
    pub fn with_span(mut self, span: Span) -> Self {
        self.location = Some(span.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(
                f,
                "{}:{}: {}: {}",
                loc.line + 1,
                loc.column + 1,
                self.kind,
                self.message
            ),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

// =============================================================================
// Convenience Builders
// =============================================================================

pub fn undefined_macro(name: &str, span: Span) -> Diagnostic {
    Diagnostic::new(
        DiagnosticKind::Undefined,
        format!("Macro '{}' is not defined", name),
    )
    .with_span(span)
}

pub fn parameter_mismatch(name: &str, expected: usize, got: usize, span: Span) -> Diagnostic {
    Diagnostic::new(
        DiagnosticKind::ParameterMismatch,
        format!(
            "Macro '{}' expects {} parameter(s), got {}",
            name, expected, got
        ),
    )
    .with_span(span)
}

/// `chain` is the active signature chain, outermost first
pub fn circular_dependency(chain: &[String], signature: &str, span: Span) -> Diagnostic {
    let mut path = chain.to_vec();
    path.push(signature.to_string());
    Diagnostic::new(
        DiagnosticKind::CircularDependency,
        format!("Circular macro dependency detected: {}", path.join(" → ")),
    )
    .with_span(span)
}

pub fn depth_exceeded(max_depth: usize, span: Span) -> Diagnostic {
    Diagnostic::syntax(format!(
        "Maximum macro expansion depth exceeded ({})",
        max_depth
    ))
    .with_span(span)
}

pub fn duplicate_definition(name: &str, span: Span) -> Diagnostic {
    Diagnostic::syntax(format!("Duplicate macro definition: '{}'", name)).with_span(span)
}

pub fn builtin_arity(builtin: &str, expected: usize, got: usize, span: Span) -> Diagnostic {
    let noun = if expected == 1 { "argument" } else { "arguments" };
    Diagnostic::syntax(format!(
        "{}() expects exactly {} {}, got {}",
        builtin, expected, noun, got
    ))
    .with_span(span)
}

pub fn invalid_repeat_count(value: &str, span: Span) -> Diagnostic {
    Diagnostic::syntax(format!("Invalid repeat count: '{}'", value)).with_span(span)
}

pub fn invalid_condition(value: &str, span: Span) -> Diagnostic {
    Diagnostic::syntax(format!("Invalid if condition: '{}'", value)).with_span(span)
}

pub fn for_requires_array(value: &str, span: Span) -> Diagnostic {
    Diagnostic::syntax(format!("for() expects an array, got '{}'", value)).with_span(span)
}

pub fn reverse_requires_array(value: &str, span: Span) -> Diagnostic {
    Diagnostic::syntax(format!(
        "reverse() expects an array literal, got '{}'",
        value
    ))
    .with_span(span)
}

pub fn invalid_binder(found: &str, span: Span) -> Diagnostic {
    Diagnostic::syntax(format!(
        "for() expects a loop variable or tuple pattern, got '{}'",
        found
    ))
    .with_span(span)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        Span {
            start: 12,
            end: 20,
            line: 3,
            column: 5,
            end_line: 3,
            end_column: 13,
        }
    }

    #[test]
    fn test_location_is_zero_based() {
        let diag = undefined_macro("foo", span());
        let loc = diag.location.unwrap();
        assert_eq!(loc.line, 2);
        assert_eq!(loc.column, 4);
        assert_eq!(loc.length, 8);
        assert_eq!(diag.message, "Macro 'foo' is not defined");
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&DiagnosticKind::ParameterMismatch).unwrap();
        assert_eq!(json, "\"parameter_mismatch\"");
    }

    #[test]
    fn test_circular_message_chain() {
        let diag = circular_dependency(&["a".into(), "b".into()], "a", span());
        assert_eq!(diag.kind, DiagnosticKind::CircularDependency);
        assert_eq!(
            diag.message,
            "Circular macro dependency detected: a → b → a"
        );
    }

    #[test]
    fn test_builtin_arity_wording() {
        assert_eq!(
            builtin_arity("reverse", 1, 2, span()).message,
            "reverse() expects exactly 1 argument, got 2"
        );
        assert_eq!(
            builtin_arity("repeat", 2, 1, span()).message,
            "repeat() expects exactly 2 arguments, got 1"
        );
    }

    #[test]
    fn test_display_is_one_based() {
        let diag = parameter_mismatch("inc", 1, 0, span());
        assert_eq!(
            diag.to_string(),
            "3:5: parameter_mismatch: Macro 'inc' expects 1 parameter(s), got 0"
        );
    }
}
