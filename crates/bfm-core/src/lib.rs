//! bfm-core: macro expansion engine for Brainfuck macro source
//!
//! This crate is a pure text-plus-metadata transform with NO I/O:
//! - Lexer over the hybrid grammar (raw commands interleaved with macro syntax)
//! - Recursive-descent parser producing a `Program` AST and highlight tokens
//! - Definition collector and early reference validator
//! - Expander with parameter substitution, builtins (`repeat`, `if`, `for`,
//!   `reverse`), cycle detection and a depth ceiling
//! - Optional bidirectional source map
//!
//! ## Pipeline Flow
//!
//! ```text
//! source ─→ lexer::tokenize ─→ parser::parse ─→ collector ─→ Expander::run
//!              tokens              Program         MacroTable     text
//!                                  diagnostics     diagnostics    diagnostics
//!                                  highlights                     source map
//! ```
//!
//! Every call to [`expand`] builds its own state; concurrent calls share
//! nothing.

pub mod ast;
pub mod collector;
pub mod diagnostics;
mod expander;
pub mod lexer;
pub mod lines;
pub mod options;
pub mod parser;
pub mod source_map;

use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use ast::{MacroDefinition, Program, Span, Statement};
pub use collector::{collect_definitions, validate_definitions, MacroTable};
pub use diagnostics::{Diagnostic, DiagnosticKind, SourceLocation};
pub use options::{ExpandOptions, OptionsError, DEFAULT_MAX_DEPTH};
pub use parser::{HighlightKind, HighlightToken};
pub use source_map::{Position, Range, SourceMap, SourceMapEntry};

use expander::Expander;

/// A collected macro definition, as reported to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroSummary {
    pub name: String,
    /// `None` when declared without parentheses
    pub parameters: Option<Vec<String>>,
    /// Body rendered back to source text
    pub body: String,
    pub location: SourceLocation,
}

impl From<&MacroDefinition> for MacroSummary {
    fn from(def: &MacroDefinition) -> Self {
        Self {
            name: def.name.clone(),
            parameters: def.parameters.clone(),
            body: def.body_to_string(),
            location: def.span.into(),
        }
    }
}

/// Everything one expansion run produces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpansionResult {
    pub expanded: String,
    pub diagnostics: Vec<Diagnostic>,
    /// Editor highlight tokens, sorted by start offset
    pub tokens: Vec<HighlightToken>,
    /// Definitions in source order
    pub macros: Vec<MacroSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_map: Option<SourceMap>,
}

impl ExpansionResult {
    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn diagnostics_of(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }

    pub fn macro_named(&self, name: &str) -> Option<&MacroSummary> {
        self.macros.iter().find(|m| m.name == name)
    }
}

/// Expand macro source into target text.
///
/// Never fails: every problem is reported in `diagnostics` and the construct
/// that caused it is echoed into the output unchanged.
#[tracing::instrument(level = "debug", skip_all, fields(source_len = source.len()))]
pub fn expand(source: &str, options: &ExpandOptions) -> ExpansionResult {
    let tokens = lexer::tokenize(source, options.lex_options());
    let parsed = parser::parse(&tokens);
    let collection = collect_definitions(&parsed.program);
    let validation = validate_definitions(&collection.table);

    let reported = parsed
        .diagnostics
        .into_iter()
        .chain(collection.diagnostics)
        .chain(validation);

    let output = Expander::new(source, &collection.table, options)
        .with_reported(reported)
        .run(&parsed.program);

    let macros: Vec<MacroSummary> = collection.table.iter().map(MacroSummary::from).collect();

    tracing::debug!(
        macros = macros.len(),
        diagnostics = output.diagnostics.len(),
        "expansion complete"
    );

    ExpansionResult {
        expanded: output.text,
        diagnostics: output.diagnostics,
        tokens: parsed.highlights,
        macros,
        source_map: output.source_map,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_diagnostic_not_repeated_by_expansion() {
        let result = expand("#define a @missing\n@a", &ExpandOptions::default());
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].kind, DiagnosticKind::Undefined);
        assert_eq!(result.expanded, "\n@missing");
    }

    #[test]
    fn test_macro_summaries() {
        let result = expand(
            "#define inc(n) {repeat(n, +)}\n#define clear [-]",
            &ExpandOptions::default(),
        );
        let inc = result.macro_named("inc").unwrap();
        assert_eq!(inc.parameters, Some(vec!["n".to_string()]));
        assert_eq!(inc.body, "{repeat(n, +)}");
        assert_eq!(inc.location.line, 0);
        let clear = result.macro_named("clear").unwrap();
        assert_eq!(clear.parameters, None);
        assert_eq!(clear.location.line, 1);
    }

    #[test]
    fn test_result_serializes_without_absent_source_map() {
        let result = expand("@nope", &ExpandOptions::default());
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("source_map").is_none());
        assert_eq!(json["diagnostics"][0]["kind"], "undefined");
    }
}
