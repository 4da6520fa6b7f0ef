//! rustfmt adapter.
//!
//! Source arrives on stdin and the reformatted bytes come back on stdout;
//! the style travels as `--config key=val,...`. rustfmt is known to warn on
//! nonzero exit while still emitting usable output, so a nonzero exit with
//! non-empty stdout is consumed; nonzero with empty stdout is a per-pair
//! formatter error.
//!
//! rustfmt has no preset bundles — the single base style is the tool's
//! defaults.

use std::path::PathBuf;
use std::time::Duration;

use stylefit_kernel::hash::ContentHash;
use stylefit_kernel::options::{OptionDef, OptionValue};
use stylefit_kernel::style::Style;
use stylefit_search::contract::{FormatVerdict, Formatter, NamedStyle};

use super::{tool_fingerprint, AdapterError};
use crate::invoke::{run_tool, ToolOutcome, ToolRequest};

/// Adapter identifier, also the binary name searched on `PATH`.
pub const NAME: &str = "rustfmt";

/// rustfmt driven through its CLI.
pub struct Rustfmt {
    binary: PathBuf,
    fingerprint: ContentHash,
    options: Vec<OptionDef>,
    timeout: Duration,
}

impl Rustfmt {
    /// Locate the tool on `PATH` and fingerprint its version.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Unavailable`] when the binary is missing or
    /// `--version` fails.
    pub fn locate(timeout: Duration) -> Result<Self, AdapterError> {
        let binary = which::which(NAME).map_err(|e| AdapterError::Unavailable {
            name: NAME.to_string(),
            detail: e.to_string(),
        })?;
        let outcome = run_tool(&ToolRequest {
            program: &binary,
            args: vec!["--version".to_string()],
            stdin: b"",
            timeout,
        })
        .map_err(|e| AdapterError::Unavailable {
            name: NAME.to_string(),
            detail: e.to_string(),
        })?;
        let ToolOutcome::Completed {
            code: Some(0),
            stdout,
            ..
        } = outcome
        else {
            return Err(AdapterError::Unavailable {
                name: NAME.to_string(),
                detail: "--version did not succeed".to_string(),
            });
        };
        tracing::info!(
            binary = %binary.display(),
            version = %String::from_utf8_lossy(&stdout).trim(),
            "located rustfmt"
        );
        Ok(Self {
            fingerprint: tool_fingerprint(&binary, &stdout),
            binary,
            options: option_table(),
            timeout,
        })
    }
}

fn option_table() -> Vec<OptionDef> {
    vec![
        OptionDef::enumerated("edition", &["2015", "2018", "2021"], "2015"),
        OptionDef::boolean("hard_tabs", false),
        OptionDef::boolean("match_block_trailing_comma", false),
        OptionDef::bounded_int("max_width", 40, 200, &[80, 100, 120], 100),
        OptionDef::enumerated(
            "newline_style",
            &["Auto", "Native", "Unix", "Windows"],
            "Auto",
        ),
        OptionDef::boolean("remove_nested_parens", true),
        OptionDef::boolean("reorder_imports", true),
        OptionDef::boolean("reorder_modules", true),
        OptionDef::bounded_int("tab_spaces", 1, 16, &[2, 4, 8], 4),
        OptionDef::enumerated("use_small_heuristics", &["Default", "Max", "Off"], "Default"),
    ]
}

/// Render one value for `--config key=val` (no quoting; rustfmt parses
/// bare tokens).
fn config_value(value: &OptionValue) -> String {
    match value {
        OptionValue::Bool(true) => "true".to_string(),
        OptionValue::Bool(false) => "false".to_string(),
        OptionValue::Int(i) => i.to_string(),
        OptionValue::Token(t) => t.clone(),
        // No composite options in this table; render defensively as empty.
        OptionValue::Map(_) => String::new(),
    }
}

impl Formatter for Rustfmt {
    fn name(&self) -> &str {
        NAME
    }

    fn fingerprint(&self) -> &ContentHash {
        &self.fingerprint
    }

    fn options(&self) -> &[OptionDef] {
        &self.options
    }

    fn base_styles(&self) -> Vec<NamedStyle> {
        vec![NamedStyle::new("default", Style::empty())]
    }

    fn format(&self, style: &Style, source: &[u8], _filename_hint: &str) -> FormatVerdict {
        // Reading from stdin, rustfmt always writes the result to stdout.
        let mut args = Vec::new();
        if !style.is_empty() {
            let config: Vec<String> = style
                .iter()
                .map(|(name, value)| format!("{name}={}", config_value(value)))
                .collect();
            args.push("--config".to_string());
            args.push(config.join(","));
        }

        let outcome = run_tool(&ToolRequest {
            program: &self.binary,
            args,
            stdin: source,
            timeout: self.timeout,
        });
        match outcome {
            Ok(ToolOutcome::Completed {
                code: Some(0),
                stdout,
                ..
            }) => FormatVerdict::Output(stdout),
            // rustfmt warns on nonzero with output still usable.
            Ok(ToolOutcome::Completed { stdout, .. }) if !stdout.is_empty() => {
                FormatVerdict::Output(stdout)
            }
            Ok(ToolOutcome::Completed { code, stderr, .. }) => FormatVerdict::Rejected {
                detail: format!(
                    "exit {code:?}: {}",
                    String::from_utf8_lossy(&stderr).trim()
                ),
            },
            Ok(ToolOutcome::TimedOut { limit_ms }) => FormatVerdict::TimedOut { limit_ms },
            Err(e) => FormatVerdict::Rejected {
                detail: e.to_string(),
            },
        }
    }

    fn render_style(&self, style: &Style) -> String {
        render_toml(style)
    }
}

/// Render a style in `rustfmt.toml` syntax: bools and integers bare,
/// tokens quoted.
fn render_toml(style: &Style) -> String {
    let mut out = String::new();
    for (name, value) in style.iter() {
        let rendered = match value {
            OptionValue::Token(t) => format!("\"{t}\""),
            other => config_value(other),
        };
        out.push_str(&format!("{name} = {rendered}\n"));
    }
    out
}
