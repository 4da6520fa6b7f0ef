//! Fixture formatter: a deterministic in-process formatter.
//!
//! Exists so the lock tests and benchmarks can exercise the full search
//! pipeline — baselines, greedy attachment, resilient pins, variants,
//! cancellation — without any external tool. The transform is a small
//! brace-language re-indenter whose observable output is fully determined
//! by the option values.
//!
//! Two deliberate properties:
//!
//! - `comma_style=spaced` and `spaces_after_comma=true` produce identical
//!   output, so a corpus with spaced commas exercises the cardinality
//!   tie-break between two independently sufficient options.
//! - Inputs containing [`REJECT_MARKER`] are rejected, modeling a corpus
//!   the tool cannot parse.

use stylefit_kernel::hash::{canonical_hash, ContentHash, DOMAIN_FORMATTER_IDENTITY};
use stylefit_kernel::options::{OptionDef, OptionValue};
use stylefit_kernel::style::Style;
use stylefit_search::contract::{FormatVerdict, Formatter, NamedStyle};

/// Adapter identifier.
pub const NAME: &str = "fixture";

/// Inputs containing this marker are rejected with a nonzero-exit analog.
pub const REJECT_MARKER: &[u8] = b"@@fixture:reject@@";

/// The in-process fixture formatter.
pub struct FixtureFormatter {
    fingerprint: ContentHash,
    options: Vec<OptionDef>,
}

impl Default for FixtureFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureFormatter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            fingerprint: canonical_hash(DOMAIN_FORMATTER_IDENTITY, b"fixture/1"),
            options: option_table(),
        }
    }

    /// Resolve the effective settings in one pass over the option table.
    fn settings(&self, style: &Style) -> Settings {
        let mut settings = Settings::default();
        for def in &self.options {
            match (def.name.as_str(), style.effective(def)) {
                ("brace_style", OptionValue::Token(t)) => settings.break_braces = t == "break",
                ("comma_style", OptionValue::Token(t)) => {
                    settings.spaced_commas |= t == "spaced";
                }
                ("indent_width", OptionValue::Int(i)) => {
                    settings.indent_width = usize::try_from(i).unwrap_or(4);
                }
                ("max_blank_lines", OptionValue::Int(i)) => {
                    settings.max_blank = usize::try_from(i).unwrap_or(1);
                }
                ("spaces_after_comma", OptionValue::Bool(b)) => settings.spaced_commas |= b,
                ("trailing_newline", OptionValue::Bool(b)) => settings.trailing_newline = b,
                ("use_tabs", OptionValue::Bool(b)) => settings.use_tabs = b,
                _ => {}
            }
        }
        settings
    }
}

/// Effective transform settings.
struct Settings {
    break_braces: bool,
    spaced_commas: bool,
    indent_width: usize,
    max_blank: usize,
    trailing_newline: bool,
    use_tabs: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            break_braces: false,
            spaced_commas: false,
            indent_width: 4,
            max_blank: 1,
            trailing_newline: true,
            use_tabs: false,
        }
    }
}

fn option_table() -> Vec<OptionDef> {
    vec![
        OptionDef::enumerated("brace_style", &["attach", "break"], "attach"),
        OptionDef::enumerated("comma_style", &["spaced", "tight"], "tight"),
        OptionDef::bounded_int("indent_width", 1, 8, &[2, 4, 8], 4),
        OptionDef::bounded_int("max_blank_lines", 0, 4, &[0, 1, 2], 1),
        OptionDef::boolean("spaces_after_comma", false),
        OptionDef::boolean("trailing_newline", true),
        OptionDef::boolean("use_tabs", false),
    ]
}

impl Formatter for FixtureFormatter {
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
        vec![
            NamedStyle::new("default", Style::empty()),
            NamedStyle::new(
                "dense",
                Style::empty()
                    .with_value("indent_width", OptionValue::Int(2))
                    .with_value("max_blank_lines", OptionValue::Int(0)),
            ),
        ]
    }

    fn format(&self, style: &Style, source: &[u8], _filename_hint: &str) -> FormatVerdict {
        if source
            .windows(REJECT_MARKER.len())
            .any(|w| w == REJECT_MARKER)
        {
            return FormatVerdict::Rejected {
                detail: "unsupported construct".to_string(),
            };
        }

        let text = String::from_utf8_lossy(source);
        let Settings {
            break_braces,
            spaced_commas,
            indent_width,
            max_blank,
            trailing_newline,
            use_tabs,
        } = self.settings(style);

        // Pass 1: brace placement over trimmed logical lines.
        let mut logical: Vec<String> = Vec::new();
        for raw in text.lines() {
            let line = raw.trim().to_string();
            if break_braces {
                if line.len() > 1 && line.ends_with('{') {
                    logical.push(line[..line.len() - 1].trim_end().to_string());
                    logical.push("{".to_string());
                    continue;
                }
            } else if line == "{" {
                if let Some(previous) = logical.iter_mut().rev().find(|l| !l.is_empty()) {
                    previous.push_str(" {");
                    continue;
                }
            }
            logical.push(line);
        }

        // Pass 2: collapse blank-line runs.
        let mut collapsed: Vec<String> = Vec::new();
        let mut blanks = 0usize;
        for line in logical {
            if line.is_empty() {
                blanks += 1;
                continue;
            }
            for _ in 0..blanks.min(max_blank) {
                collapsed.push(String::new());
            }
            blanks = 0;
            collapsed.push(line);
        }

        // Pass 3: depth-based reindentation plus comma spacing.
        let unit = if use_tabs {
            "\t".to_string()
        } else {
            " ".repeat(indent_width)
        };
        let mut depth = 0usize;
        let mut out = String::new();
        for line in collapsed {
            if line.is_empty() {
                out.push('\n');
                continue;
            }
            let mut content = line.replace(", ", ",");
            if spaced_commas {
                content = content.replace(',', ", ");
            }
            if content.starts_with('}') {
                depth = depth.saturating_sub(1);
            }
            for _ in 0..depth {
                out.push_str(&unit);
            }
            out.push_str(&content);
            out.push('\n');
            if content.ends_with('{') {
                depth += 1;
            }
        }

        if !trailing_newline {
            while out.ends_with('\n') {
                out.pop();
            }
        }
        FormatVerdict::Output(out.into_bytes())
    }

    fn render_style(&self, style: &Style) -> String {
        let mut out = String::new();
        for (name, value) in style.iter() {
            out.push_str(&format!("{name} = {}\n", value.token()));
        }
        out
    }
}
