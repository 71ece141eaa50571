//! End-to-end expansion behaviour through the public `expand` entry point.

use bfm_core::{expand, DiagnosticKind, ExpandOptions, ExpansionResult};
use pretty_assertions::assert_eq;

fn run(source: &str) -> ExpansionResult {
    expand(source, &ExpandOptions::default())
}

fn kinds(result: &ExpansionResult) -> Vec<DiagnosticKind> {
    result.diagnostics.iter().map(|d| d.kind).collect()
}

// =============================================================================
// Definitions and invocations
// =============================================================================

#[test]
fn test_parameterized_repeat() {
    let result = run("#define inc(n) {repeat(n, +)}\n@inc(3)");
    assert_eq!(result.expanded, "\n+++");
    assert!(result.diagnostics.is_empty());
}

#[test]
fn test_unknown_macro_is_echoed() {
    let result = run("@unknown_macro");
    assert_eq!(result.expanded, "@unknown_macro");
    assert_eq!(kinds(&result), vec![DiagnosticKind::Undefined]);
    assert!(result.diagnostics[0].message.contains("unknown_macro"));
}

#[test]
fn test_parameter_mismatch_echoes_invocation() {
    let result = run("#define pair(a, b) a b\n@pair(1)");
    assert_eq!(result.expanded, "\n@pair(1)");
    assert_eq!(kinds(&result), vec![DiagnosticKind::ParameterMismatch]);
    assert_eq!(
        result.diagnostics[0].message,
        "Macro 'pair' expects 2 parameter(s), got 1"
    );
}

#[test]
fn test_multiline_unknown_invocation_echoed_as_written() {
    let result = run("@nope(1,\n  2)");
    assert_eq!(result.expanded, "@nope(1,\n  2)");
    assert_eq!(kinds(&result), vec![DiagnosticKind::Undefined]);

    let result = run("{repeat(x,\n    +)} -\n+");
    assert_eq!(result.expanded, "{repeat(x,\n    +)} -\n+");
    assert_eq!(
        result.diagnostics[0].message,
        "Invalid repeat count: 'x'"
    );
}

#[test]
fn test_hash_sigil_invokes() {
    assert_eq!(run("#define clear [-]\n#clear").expanded, "\n[-]");
}

#[test]
fn test_sigil_inside_word_is_text() {
    let result = run("mail me@host");
    assert_eq!(result.expanded, "mail me@host");
    assert!(result.diagnostics.is_empty());
}

#[test]
fn test_parameters_feed_builtins() {
    let result = run("#define move(d, n) {repeat(n, d)}\n@move(>, 3)");
    assert_eq!(result.expanded, "\n>>>");
    assert!(result.diagnostics.is_empty());
}

#[test]
fn test_duplicate_definition_first_wins() {
    let result = run("#define a +\n#define a -\n@a");
    assert_eq!(result.expanded, "\n\n+");
    assert_eq!(kinds(&result), vec![DiagnosticKind::SyntaxError]);
    assert_eq!(
        result.diagnostics[0].message,
        "Duplicate macro definition: 'a'"
    );
}

#[test]
fn test_forward_reference_between_siblings() {
    let result = run("#define outer @inner>\n#define inner +\n@outer");
    assert_eq!(result.expanded, "\n\n+>");
    assert!(result.diagnostics.is_empty());
}

// =============================================================================
// Builtins
// =============================================================================

#[test]
fn test_repeat_zero_is_empty() {
    let result = run("{repeat(0, +)}");
    assert_eq!(result.expanded, "");
    assert!(result.diagnostics.is_empty());
}

#[test]
fn test_untaken_if_branch_reports_nothing() {
    let result = run("{if(0, @nope, +)}\n{if(1, -, {reverse(5)})}");
    assert_eq!(result.expanded, "+\n-");
    assert!(result.diagnostics.is_empty());
}

#[test]
fn test_reverse() {
    assert_eq!(run("{reverse({1,2,3})}").expanded, "{3, 2, 1}");
    assert_eq!(run("{reverse({})}").expanded, "{}");
}

#[test]
fn test_reverse_of_bare_comma_list() {
    let result = run("#define nums 1, 2, 3\n{reverse(@nums)}");
    assert_eq!(result.expanded, "\n{3, 2, 1}");
}

#[test]
fn test_for_over_macro_array() {
    let result = run("#define nums {1, 2, 3}\n{for(n in @nums, n>)}");
    assert_eq!(result.expanded, "\n1>2>3>");
    assert!(result.diagnostics.is_empty());
}

#[test]
fn test_for_tuple_rows_in_order() {
    assert_eq!(run("{for((x,y) in {{1,2},{3,4}}, xy)}").expanded, "1234");
}

#[test]
fn test_for_ragged_row_binds_empty() {
    let result = run("{for((x,y) in {{1}}, [x|y])}");
    assert_eq!(result.expanded, "[1|]");
    assert!(result.diagnostics.is_empty());
}

#[test]
fn test_for_with_index_variable() {
    let source = "#define print(i, v) i:v.\n#define show(arr) {for(val, idx in arr, @print(idx, val))}\n@show({A, B})";
    let result = run(source);
    assert_eq!(result.expanded, "\n\n0:A.1:B.");
    assert!(result.diagnostics.is_empty());
}

#[test]
fn test_for_with_tuple_and_index_variable() {
    let result = run("{for((a, b), idx in {{1, 2}, {3, 4}}, [idx]a>b)}");
    assert_eq!(result.expanded, "[0]1>2[1]3>4");
    assert!(result.diagnostics.is_empty());
}

// =============================================================================
// Cycles and depth
// =============================================================================

#[test]
fn test_mutual_recursion_terminates() {
    let result = run("#define a @b\n#define b @a\n@a");
    assert!(result.diagnostics_of(DiagnosticKind::CircularDependency).count() >= 1);
    assert_eq!(result.expanded, "\n\n@a");
}

#[test]
fn test_self_recursion_with_growing_argument_terminates() {
    let result = run("#define grow(x) @grow(x+)\n@grow(+)");
    assert!(result.has_diagnostics());
    assert!(result.expanded.starts_with('\n'));
}

#[test]
fn test_depth_ceiling_from_options() {
    let options = ExpandOptions::default().with_max_depth(1);
    let result = expand("#define a @b\n#define b +\n@a", &options);
    assert_eq!(result.expanded, "\n\n@b");
    assert_eq!(
        result.diagnostics[0].message,
        "Maximum macro expansion depth exceeded (1)"
    );
}

// =============================================================================
// Layout
// =============================================================================

#[test]
fn test_block_body_keeps_line_alignment() {
    let source = "#define clear {\n    [-]\n    >\n}\n@clear";
    let result = run(source);
    assert_eq!(result.expanded, "\n\n\n\n[-]>");
    assert_eq!(result.macro_named("clear").unwrap().body, "[-]>");
}

#[test]
fn test_unclosed_block_body_still_registers() {
    let result = run("#define a {\n+\n");
    assert!(result.macro_named("a").is_some());
    assert_eq!(
        result.diagnostics[0].message,
        "Unclosed macro body - missing closing brace }"
    );
}

#[test]
fn test_continuation_body_occupies_both_lines() {
    assert_eq!(run("#define m +\\\n-\n@m").expanded, "\n\n+-");
}

#[test]
fn test_trailing_newline_preserved() {
    assert_eq!(run("+\n-\n").expanded, "+\n-\n");
}

#[test]
fn test_collapse_empty_lines() {
    let options = ExpandOptions::default().with_collapse_empty_lines(true);
    let result = expand("#define a +\n\n@a\n  \n@a", &options);
    assert_eq!(result.expanded, "+\n+");
}

#[test]
fn test_comments_stripped_or_kept() {
    assert_eq!(run("+ // note\n-").expanded, "+ \n-");

    let options = ExpandOptions::default().with_strip_comments(false);
    assert_eq!(expand("+ // note\n-", &options).expanded, "+ // note\n-");
}

#[test]
fn test_determinism() {
    let source = "#define a(x) {for(v in x, v.)}\n@a({1, 2})\n@zz\n{repeat(x, +)}";
    let first = run(source);
    let second = run(source);
    assert_eq!(first.expanded, second.expanded);
    assert_eq!(first.diagnostics, second.diagnostics);
    assert_eq!(first.tokens, second.tokens);
}

#[test]
fn test_highlight_tokens_reported() {
    let result = run("#define a +\n@a {repeat(1, @a)}");
    let names: Vec<_> = result.tokens.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["a", "a", "repeat", "a"]);
}
