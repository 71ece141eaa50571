//! Property tests for the expansion laws.

use bfm_core::{expand, DiagnosticKind, ExpandOptions};
use proptest::prelude::*;

// -- Strategy helpers --

/// Source built only from target commands and plain text
fn arb_plain_source() -> impl Strategy<Value = String> {
    "[+\\-<>.\\[\\] abc\n,()]{0,64}"
}

fn arb_commands() -> impl Strategy<Value = String> {
    "[+\\-<>.\\[\\]]{1,6}"
}

/// Arbitrary sequences of macro-syntax fragments, well formed or not
fn arb_macro_source() -> impl Strategy<Value = String> {
    let fragment = prop_oneof![
        Just("#define a +"),
        Just("#define b(x) x@a"),
        Just("#define c(x, y) {for((p, q) in x, pq)}"),
        Just("@a"),
        Just("@b(1)"),
        Just("@c({{1, 2}}, 3)"),
        Just("@missing"),
        Just("{repeat(2, @a)}"),
        Just("{if(0, -, +)}"),
        Just("{reverse({1, 2})}"),
        Just("{for(v in {1, 2}, v)}"),
        Just("{"),
        Just(")"),
        Just(" "),
        Just("\n"),
        Just("+-"),
    ];
    prop::collection::vec(fragment, 0..24).prop_map(|parts| parts.concat())
}

proptest! {
    /// Macro-free source passes through unchanged with no diagnostics
    #[test]
    fn plain_source_is_identity(source in arb_plain_source()) {
        let result = expand(&source, &ExpandOptions::default());
        prop_assert_eq!(&result.expanded, &source);
        prop_assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn expansion_is_deterministic(source in arb_macro_source()) {
        let options = ExpandOptions::default().with_source_map(true);
        let first = expand(&source, &options);
        let second = expand(&source, &options);
        prop_assert_eq!(&first.expanded, &second.expanded);
        prop_assert_eq!(&first.diagnostics, &second.diagnostics);
        prop_assert_eq!(&first.tokens, &second.tokens);
        prop_assert_eq!(
            first.source_map.map(|m| m.entries().to_vec()),
            second.source_map.map(|m| m.entries().to_vec())
        );
    }

    #[test]
    fn repeat_concatenates_n_copies(n in 0usize..20, body in arb_commands()) {
        let source = format!("{{repeat({}, {})}}", n, body);
        let result = expand(&source, &ExpandOptions::default());
        prop_assert_eq!(result.expanded, body.repeat(n));
        prop_assert!(result.diagnostics.is_empty());
    }

    /// Wrong argument count: exactly one mismatch and the call left as written
    #[test]
    fn wrong_arity_reports_exactly_one_mismatch(
        arity in 1usize..4,
        given in 0usize..6,
    ) {
        prop_assume!(arity != given);

        let params: Vec<String> = (0..arity).map(|i| format!("p{}", i)).collect();
        let args: Vec<String> = (0..given).map(|i| i.to_string()).collect();
        let call = format!("@m({})", args.join(", "));
        let source = format!("#define m({}) {}\n{}", params.join(", "), params.join(" "), call);

        let result = expand(&source, &ExpandOptions::default());
        let mismatches = result
            .diagnostics_of(DiagnosticKind::ParameterMismatch)
            .count();
        prop_assert_eq!(mismatches, 1);
        prop_assert_eq!(result.diagnostics.len(), 1);
        prop_assert_eq!(result.expanded, format!("\n{}", call));
    }
}
