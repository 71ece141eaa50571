//! Per-run expansion context: call stack and cycle detection

use std::collections::{BTreeMap, HashSet};

use crate::ast::{Expression, MacroInvocation, Span};
use crate::source_map::{CallStackEntry, Range, SourceMapEntry};

/// Arguments summarized in an invocation signature
const SIGNATURE_ARGS: usize = 3;
/// Argument renderings this long or longer are cut
const SIGNATURE_ARG_CUTOFF: usize = 10;
const SIGNATURE_ARG_KEEP: usize = 8;

#[derive(Debug, Clone)]
pub(crate) struct CallFrame {
    pub macro_name: String,
    pub call_site: Span,
    pub parameters: BTreeMap<String, String>,
    pub signature: String,
}

#[derive(Debug, Default)]
pub(crate) struct ExpansionContext {
    frames: Vec<CallFrame>,
    active: HashSet<String>,
}

impl ExpansionContext {
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_active(&self, signature: &str) -> bool {
        self.active.contains(signature)
    }

    /// Active signatures, outermost first
    pub fn signature_chain(&self) -> Vec<String> {
        self.frames.iter().map(|f| f.signature.clone()).collect()
    }

    pub fn push(&mut self, frame: CallFrame) {
        self.active.insert(frame.signature.clone());
        self.frames.push(frame);
    }

    pub fn pop(&mut self) {
        if let Some(frame) = self.frames.pop() {
            self.active.remove(&frame.signature);
        }
    }

    /// Source map entry for output appended now. Inside an invocation the
    /// output is attributed to the innermost call site.
    pub fn map_entry(&self, expanded: Range, origin: Span) -> SourceMapEntry {
        match self.frames.last() {
            Some(frame) => SourceMapEntry {
                expanded_range: expanded,
                source_range: frame.call_site.into(),
                expansion_depth: self.depth(),
                macro_name: Some(frame.macro_name.clone()),
                macro_call_site: Some(frame.call_site.into()),
                parameter_values: (!frame.parameters.is_empty())
                    .then(|| frame.parameters.clone()),
                macro_call_stack: self.call_stack(),
            },
            None => SourceMapEntry {
                expanded_range: expanded,
                source_range: origin.into(),
                expansion_depth: 0,
                macro_name: None,
                macro_call_site: None,
                parameter_values: None,
                macro_call_stack: Vec::new(),
            },
        }
    }

    fn call_stack(&self) -> Vec<CallStackEntry> {
        self.frames
            .iter()
            .map(|frame| CallStackEntry {
                macro_name: frame.macro_name.clone(),
                call_site: frame.call_site.into(),
                parameters: frame.parameters.clone(),
            })
            .collect()
    }
}

/// Cycle-detection key: name plus a bounded summary of up to three
/// arguments. Distinguishes some instantiations of a recursive macro; the
/// depth ceiling remains the backstop.
pub(crate) fn invocation_signature(inv: &MacroInvocation) -> String {
    let args = inv.arguments();
    if args.is_empty() {
        return inv.name.clone();
    }

    let mut parts: Vec<String> = args.iter().take(SIGNATURE_ARGS).map(argument_shape).collect();
    if args.len() > SIGNATURE_ARGS {
        parts.push("...".to_string());
    }
    format!("{}({})", inv.name, parts.join(", "))
}

fn argument_shape(arg: &Expression) -> String {
    match arg {
        Expression::MacroInvocation(inner) => format!("@{}", inner.name),
        other => {
            let text = other.to_source_string();
            if text.chars().count() >= SIGNATURE_ARG_CUTOFF {
                let kept: String = text.chars().take(SIGNATURE_ARG_KEEP).collect();
                format!("{}…", kept)
            } else {
                text
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Number, Text};

    fn inv(args: Option<Vec<Expression>>) -> MacroInvocation {
        MacroInvocation {
            name: "m".into(),
            sigil: '@',
            arguments: args,
            span: Span::default(),
            synthesized: false,
        }
    }

    fn num(v: i64) -> Expression {
        Expression::Number(Number {
            value: v,
            text: v.to_string(),
            span: Span::default(),
        })
    }

    #[test]
    fn test_signature_shapes() {
        assert_eq!(invocation_signature(&inv(None)), "m");
        assert_eq!(invocation_signature(&inv(Some(vec![num(1), num(2)]))), "m(1, 2)");
        assert_eq!(
            invocation_signature(&inv(Some(vec![num(1), num(2), num(3), num(4)]))),
            "m(1, 2, 3, ...)"
        );
        let long = Expression::Text(Text {
            value: "abcdefghij".into(),
            span: Span::default(),
        });
        assert_eq!(invocation_signature(&inv(Some(vec![long]))), "m(abcdefgh…)");
        let nested = Expression::MacroInvocation(inv(Some(vec![num(9)])));
        assert_eq!(invocation_signature(&inv(Some(vec![nested]))), "m(@m)");
    }

    #[test]
    fn test_push_pop_is_symmetric() {
        let mut ctx = ExpansionContext::default();
        ctx.push(CallFrame {
            macro_name: "a".into(),
            call_site: Span::default(),
            parameters: BTreeMap::new(),
            signature: "a".into(),
        });
        assert!(ctx.is_active("a"));
        assert_eq!(ctx.depth(), 1);
        ctx.pop();
        assert!(!ctx.is_active("a"));
        assert_eq!(ctx.depth(), 0);
        ctx.pop();
        assert_eq!(ctx.depth(), 0);
    }
}
