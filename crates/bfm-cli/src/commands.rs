//! Subcommand implementations
//!
//! All file, stdin and stdout handling for the CLI lives here; the engine
//! itself only sees strings.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::fs;
use std::io::{self, IsTerminal, Read, Write};
use std::path::Path;

use bfm_core::ast::find_invocations;
use bfm_core::{expand, lexer, parser, Diagnostic, ExpandOptions, ExpansionResult, MacroSummary};

use crate::{ExpandFormat, ListFormat};

/// Command line flags layered over the options file
#[derive(Debug, Clone, Default)]
pub struct OptionOverrides {
    pub keep_comments: bool,
    pub collapse_empty_lines: bool,
    pub source_map: bool,
    pub max_depth: Option<usize>,
}

// =============================================================================
// COMMANDS
// =============================================================================

pub fn cmd_expand(
    input: Option<&Path>,
    output: Option<&Path>,
    config: Option<&Path>,
    overrides: &OptionOverrides,
    format: ExpandFormat,
) -> Result<()> {
    let source = read_input(input)?;
    let options = load_options(config, overrides)?;
    let result = expand(&source, &options);

    tracing::debug!(
        input = %input_label(input),
        diagnostics = result.diagnostics.len(),
        "expanded input"
    );

    let rendered = match format {
        ExpandFormat::Code => {
            print_diagnostics(&input_label(input), &result.diagnostics);
            result.expanded.clone()
        }
        ExpandFormat::Json => {
            let mut json = serde_json::to_string_pretty(&result)
                .context("failed to serialize expansion result")?;
            json.push('\n');
            json
        }
        ExpandFormat::Debug => render_debug(&result),
    };

    write_output(output, &rendered)
}

pub fn cmd_list(input: Option<&Path>, format: ListFormat) -> Result<()> {
    let source = read_input(input)?;
    let rendered = render_list(&source, format)?;
    write_output(None, &rendered)
}

pub fn cmd_validate(input: Option<&Path>, config: Option<&Path>) -> Result<()> {
    let source = read_input(input)?;
    let options = load_options(config, &OptionOverrides::default())?;
    let result = expand(&source, &options);

    if result.diagnostics.is_empty() {
        println!(
            "{} {} macro(s), no diagnostics",
            "OK".green().bold(),
            result.macros.len()
        );
        return Ok(());
    }

    print_diagnostics(&input_label(input), &result.diagnostics);
    bail!("{} diagnostic(s) reported", result.diagnostics.len())
}

// =============================================================================
// OPTIONS
// =============================================================================

/// Options from `config` (if any) with flags applied on top
pub fn load_options(config: Option<&Path>, overrides: &OptionOverrides) -> Result<ExpandOptions> {
    let mut options = match config {
        Some(path) => read_options_file(path)?,
        None => ExpandOptions::default(),
    };

    if overrides.keep_comments {
        options.strip_comments = false;
    }
    if overrides.collapse_empty_lines {
        options.collapse_empty_lines = true;
    }
    if overrides.source_map {
        options.generate_source_map = true;
    }
    if let Some(depth) = overrides.max_depth {
        options.max_depth = depth;
    }

    options.validate().context("invalid expansion options")
}

fn read_options_file(path: &Path) -> Result<ExpandOptions> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config '{}'", path.display()))?;

    let loaded = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => ExpandOptions::from_json_str(&text),
        Some("yaml") | Some("yml") => ExpandOptions::from_yaml_str(&text),
        _ => bail!(
            "unsupported config file '{}': expected .yaml, .yml or .json",
            path.display()
        ),
    };

    loaded.with_context(|| format!("failed to load config '{}'", path.display()))
}

// =============================================================================
// RENDERING
// =============================================================================

fn print_diagnostics(label: &str, diagnostics: &[Diagnostic]) {
    for diag in diagnostics {
        let location = diag
            .location
            .map(|loc| format!("{}:{}:", loc.line + 1, loc.column + 1))
            .unwrap_or_default();
        eprintln!(
            "{}:{} {}: {}",
            label,
            location,
            diag.kind.as_str().yellow().bold(),
            diag.message
        );
    }
}

fn render_debug(result: &ExpansionResult) -> String {
    let mut out = String::new();
    out.push_str(&result.expanded);
    if !result.expanded.ends_with('\n') {
        out.push('\n');
    }

    out.push_str(&format!("--- diagnostics ({}) ---\n", result.diagnostics.len()));
    for diag in &result.diagnostics {
        out.push_str(&format!("{}\n", diag));
    }

    out.push_str(&format!("--- macros ({}) ---\n", result.macros.len()));
    for summary in &result.macros {
        out.push_str(&format!(
            "{} = {}  [line {}]\n",
            signature(summary),
            summary.body,
            summary.location.line + 1
        ));
    }

    if let Some(map) = &result.source_map {
        out.push_str(&format!("--- source map ({} entries) ---\n", map.entries().len()));
    }
    out
}

/// Render the macro listing for `source`
pub fn render_list(source: &str, format: ListFormat) -> Result<String> {
    let options = ExpandOptions::default();
    let result = expand(source, &options);

    match format {
        ListFormat::Text => Ok(result
            .macros
            .iter()
            .map(|summary| format!("{}\n", signature(summary)))
            .collect()),
        ListFormat::Json => {
            let mut json = serde_json::to_string_pretty(&result.macros)
                .context("failed to serialize macro list")?;
            json.push('\n');
            Ok(json)
        }
        ListFormat::Detailed => {
            let program = parser::parse(&lexer::tokenize(source, options.lex_options())).program;
            let references = find_invocations(&program);

            let mut out = String::new();
            for summary in &result.macros {
                out.push_str(&format!(
                    "{}  (line {}, column {})\n",
                    signature(summary),
                    summary.location.line + 1,
                    summary.location.column + 1
                ));
                out.push_str(&format!("    body: {}\n", summary.body));

                let sites: Vec<String> = references
                    .iter()
                    .filter(|(name, _)| *name == summary.name)
                    .map(|(_, span)| format!("{}:{}", span.line, span.column))
                    .collect();
                if sites.is_empty() {
                    out.push_str("    used: never\n");
                } else {
                    out.push_str(&format!("    used: {}\n", sites.join(", ")));
                }
            }
            Ok(out)
        }
    }
}

fn signature(summary: &MacroSummary) -> String {
    match &summary.parameters {
        Some(params) => format!("{}({})", summary.name, params.join(", ")),
        None => summary.name.clone(),
    }
}

// =============================================================================
// I/O
// =============================================================================

fn input_label(input: Option<&Path>) -> String {
    match input {
        Some(path) if path != Path::new("-") => path.display().to_string(),
        _ => "<stdin>".to_string(),
    }
}

fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) if path != Path::new("-") => fs::read_to_string(path)
            .with_context(|| format!("failed to read '{}'", path.display())),
        _ => {
            if io::stdin().is_terminal() {
                bail!("no input provided: pass a file or pipe source via stdin");
            }
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read stdin")?;
            Ok(buffer)
        }
    }
}

fn write_output(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => fs::write(path, text)
            .with_context(|| format!("failed to write '{}'", path.display())),
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(text.as_bytes())
                .context("failed to write stdout")?;
            stdout.flush().context("failed to flush stdout")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write as _;

    fn config_file(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .expect("temp file");
        file.write_all(contents.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn test_yaml_config_with_flag_overrides() {
        let file = config_file(".yaml", "generate_source_map: true\nmax_depth: 10\n");
        let overrides = OptionOverrides {
            keep_comments: true,
            max_depth: Some(25),
            ..Default::default()
        };

        let options = load_options(Some(file.path()), &overrides).unwrap();
        assert!(options.generate_source_map);
        assert!(!options.strip_comments);
        assert_eq!(options.max_depth, 25);
    }

    #[test]
    fn test_json_config() {
        let file = config_file(".json", r#"{"collapse_empty_lines": true}"#);
        let options = load_options(Some(file.path()), &OptionOverrides::default()).unwrap();
        assert!(options.collapse_empty_lines);
        assert_eq!(options.max_depth, 100);
    }

    #[test]
    fn test_unknown_config_extension_rejected() {
        let file = config_file(".toml", "max_depth = 3");
        let err = load_options(Some(file.path()), &OptionOverrides::default()).unwrap_err();
        assert!(err.to_string().contains("unsupported config file"));
    }

    #[test]
    fn test_zero_depth_override_rejected() {
        let overrides = OptionOverrides {
            max_depth: Some(0),
            ..Default::default()
        };
        let err = load_options(None, &overrides).unwrap_err();
        assert_eq!(format!("{:#}", err), "invalid expansion options: max_depth must be at least 1");
    }

    #[test]
    fn test_read_input_from_file() {
        let file = config_file(".bfm", "#define a +\n@a");
        assert_eq!(read_input(Some(file.path())).unwrap(), "#define a +\n@a");
        assert!(read_input(Some(Path::new("/nonexistent/input.bfm"))).is_err());
    }

    #[test]
    fn test_list_text_and_detailed() {
        let source = "#define clear [-]\n#define move(d, n) {repeat(n, d)}\n@clear @clear";
        assert_eq!(
            render_list(source, ListFormat::Text).unwrap(),
            "clear\nmove(d, n)\n"
        );

        let detailed = render_list(source, ListFormat::Detailed).unwrap();
        assert!(detailed.contains("clear  (line 1, column 1)"));
        assert!(detailed.contains("    used: 3:1, 3:8"));
        assert!(detailed.contains("    body: {repeat(n, d)}"));
        assert!(detailed.contains("    used: never"));
    }

    #[test]
    fn test_debug_rendering() {
        let result = expand("@nope", &ExpandOptions::default());
        let rendered = render_debug(&result);
        assert!(rendered.starts_with("@nope\n--- diagnostics (1) ---\n"));
        assert!(rendered.contains("1:1: undefined: Macro 'nope' is not defined"));
        assert!(rendered.ends_with("--- macros (0) ---\n"));
    }
}
