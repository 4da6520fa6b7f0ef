//! clang-format adapter.
//!
//! Styles are passed inline via `-style={...}` (YAML flow syntax), the
//! source arrives on stdin with `-assume-filename` carrying the dialect
//! hint, and the reformatted bytes come back on stdout. A nonzero exit is a
//! per-pair formatter error (clang-format writes nothing useful to stdout
//! when it fails).
//!
//! The option table is a curated subset of the tool's surface: the options
//! that dominate observable formatting, each with the LLVM-style default.
//! `BraceWrapping` is the composite example; its children only take effect
//! under `BreakBeforeBraces: Custom`, which is exactly how the tool treats
//! them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use stylefit_kernel::hash::ContentHash;
use stylefit_kernel::options::{OptionDef, OptionValue};
use stylefit_kernel::style::Style;
use stylefit_search::contract::{FormatVerdict, Formatter, NamedStyle};

use super::{tool_fingerprint, AdapterError};
use crate::invoke::{run_tool, ToolOutcome, ToolRequest};

/// Adapter identifier, also the binary name searched on `PATH`.
pub const NAME: &str = "clang-format";

/// The preset-bundle option; not part of the searched option table.
const BASED_ON_STYLE: &str = "BasedOnStyle";

/// Preset bundles exposed as search baselines, in declaration order.
const BASE_STYLES: &[&str] = &["LLVM", "Google", "Chromium", "Mozilla", "WebKit"];

/// clang-format driven through its CLI.
pub struct ClangFormat {
    binary: PathBuf,
    fingerprint: ContentHash,
    options: Vec<OptionDef>,
    timeout: Duration,
}

impl ClangFormat {
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
        let version = read_version(&binary, timeout)?;
        tracing::info!(
            binary = %binary.display(),
            version = %String::from_utf8_lossy(&version).trim(),
            "located clang-format"
        );
        Ok(Self {
            fingerprint: tool_fingerprint(&binary, &version),
            binary,
            options: option_table(),
            timeout,
        })
    }
}

fn read_version(binary: &Path, timeout: Duration) -> Result<Vec<u8>, AdapterError> {
    let outcome = run_tool(&ToolRequest {
        program: binary,
        args: vec!["--version".to_string()],
        stdin: b"",
        timeout,
    })
    .map_err(|e| AdapterError::Unavailable {
        name: NAME.to_string(),
        detail: e.to_string(),
    })?;
    match outcome {
        ToolOutcome::Completed {
            code: Some(0),
            stdout,
            ..
        } => Ok(stdout),
        ToolOutcome::Completed { code, stderr, .. } => Err(AdapterError::Unavailable {
            name: NAME.to_string(),
            detail: format!(
                "--version exited {code:?}: {}",
                String::from_utf8_lossy(&stderr).trim()
            ),
        }),
        ToolOutcome::TimedOut { limit_ms } => Err(AdapterError::Unavailable {
            name: NAME.to_string(),
            detail: format!("--version timed out after {limit_ms} ms"),
        }),
    }
}

fn option_table() -> Vec<OptionDef> {
    vec![
        OptionDef::boolean("AlignConsecutiveAssignments", false),
        OptionDef::enumerated(
            "AllowShortFunctionsOnASingleLine",
            &["All", "Empty", "Inline", "InlineOnly", "None"],
            "All",
        ),
        OptionDef::composite(
            "BraceWrapping",
            vec![
                OptionDef::boolean("AfterClass", false),
                OptionDef::boolean("AfterFunction", false),
                OptionDef::boolean("AfterStruct", false),
                OptionDef::boolean("BeforeElse", false),
            ],
        ),
        OptionDef::enumerated(
            "BreakBeforeBraces",
            &[
                "Allman",
                "Attach",
                "Custom",
                "GNU",
                "Linux",
                "Mozilla",
                "Stroustrup",
                "WebKit",
            ],
            "Attach",
        ),
        OptionDef::bounded_int("ColumnLimit", 0, 200, &[0, 79, 80, 100, 120], 80),
        OptionDef::boolean("IndentCaseLabels", false),
        OptionDef::bounded_int("IndentWidth", 1, 16, &[2, 3, 4, 8], 2),
        OptionDef::bounded_int("MaxEmptyLinesToKeep", 0, 8, &[0, 1, 2], 1),
        OptionDef::enumerated("PointerAlignment", &["Left", "Middle", "Right"], "Right"),
        OptionDef::boolean("SortIncludes", true),
        OptionDef::enumerated(
            "SpaceBeforeParens",
            &["Always", "ControlStatements", "Never"],
            "ControlStatements",
        ),
        OptionDef::enumerated(
            "UseTab",
            &[
                "Always",
                "ForContinuationAndIndentation",
                "ForIndentation",
                "Never",
            ],
            "Never",
        ),
    ]
}

/// Render a value in YAML flow syntax (what `-style={...}` accepts).
fn flow_value(value: &OptionValue) -> String {
    match value {
        OptionValue::Bool(true) => "true".to_string(),
        OptionValue::Bool(false) => "false".to_string(),
        OptionValue::Int(i) => i.to_string(),
        OptionValue::Token(t) => t.clone(),
        OptionValue::Map(map) => {
            let inner: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{k}: {}", flow_value(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
    }
}

/// Render a whole style in flow syntax for the command line.
fn flow_style(style: &Style) -> String {
    let inner: Vec<String> = style
        .iter()
        .map(|(name, value)| format!("{name}: {}", flow_value(value)))
        .collect();
    format!("{{{}}}", inner.join(", "))
}

impl Formatter for ClangFormat {
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
        BASE_STYLES
            .iter()
            .map(|name| {
                NamedStyle::new(
                    name,
                    Style::empty()
                        .with_value(BASED_ON_STYLE, OptionValue::Token((*name).to_string())),
                )
            })
            .collect()
    }

    fn format(&self, style: &Style, source: &[u8], filename_hint: &str) -> FormatVerdict {
        let outcome = run_tool(&ToolRequest {
            program: &self.binary,
            args: vec![
                format!("-style={}", flow_style(style)),
                format!("-assume-filename={filename_hint}"),
            ],
            stdin: source,
            timeout: self.timeout,
        });
        match outcome {
            Ok(ToolOutcome::Completed {
                code: Some(0),
                stdout,
                ..
            }) => FormatVerdict::Output(stdout),
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
        config_style(style)
    }
}

/// Render a style in `.clang-format` file syntax: one `Key: value` per
/// line, composites as nested two-space-indented blocks.
fn config_style(style: &Style) -> String {
    let mut out = String::new();
    for (name, value) in style.iter() {
        match value {
            OptionValue::Map(map) => {
                out.push_str(&format!("{name}:\n"));
                for (child, child_value) in map {
                    out.push_str(&format!("  {child}: {}\n", flow_value(child_value)));
                }
            }
            scalar => out.push_str(&format!("{name}: {}\n", flow_value(scalar))),
        }
    }
    out
}
