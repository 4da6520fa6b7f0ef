//! Immutable styles: option-name → value mappings with fingerprints.
//!
//! A style's fingerprint is a pure function of its (option, value) pairs in
//! canonical order; two styles with equal fingerprints are interchangeable
//! everywhere in the engine. Styles are value types — every mutation-like
//! operation returns a new style.

use std::collections::BTreeMap;

use crate::hash::{canonical_hash, ContentHash, DOMAIN_STYLE};
use crate::options::{OptionDef, OptionValue};

/// A concrete mapping from option names to chosen values.
///
/// Only explicitly chosen options appear in the map; everything else is the
/// formatter's default. The map size is therefore the style's *cardinality*,
/// the quantity minimized by the Occam tie-break.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Style {
    options: BTreeMap<String, OptionValue>,
}

impl Style {
    /// The empty style: every option at its formatter default.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a style from (name, value) pairs.
    #[must_use]
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, OptionValue)>,
    {
        Self {
            options: pairs.into_iter().collect(),
        }
    }

    /// The explicitly chosen value for `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.options.get(name)
    }

    /// Whether `name` is explicitly set.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.options.contains_key(name)
    }

    /// The effective value of an option: explicit if present, else default.
    #[must_use]
    pub fn effective(&self, def: &OptionDef) -> OptionValue {
        self.options
            .get(&def.name)
            .cloned()
            .unwrap_or_else(|| def.default.clone())
    }

    /// A copy of this style with `name` explicitly set to `value`.
    #[must_use]
    pub fn with_value(&self, name: &str, value: OptionValue) -> Self {
        let mut options = self.options.clone();
        options.insert(name.to_string(), value);
        Self { options }
    }

    /// A copy of this style with `name` removed (reverted to its default).
    #[must_use]
    pub fn without(&self, name: &str) -> Self {
        let mut options = self.options.clone();
        options.remove(name);
        Self { options }
    }

    /// Substitute a trial value for `def`, eliding default-valued entries.
    ///
    /// When the value equals the option's declared default the entry is
    /// removed instead of written, lowering cardinality: the formatter will
    /// still apply the default implicitly.
    #[must_use]
    pub fn substituted(&self, def: &OptionDef, value: OptionValue) -> Self {
        if value == def.default {
            self.without(&def.name)
        } else {
            self.with_value(&def.name, value)
        }
    }

    /// Count of explicitly set options.
    #[must_use]
    pub fn cardinality(&self) -> u64 {
        self.options.len() as u64
    }

    /// Whether no option is explicitly set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Iterate (name, value) pairs in canonical (name-sorted) order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &OptionValue)> {
        self.options.iter()
    }

    /// Canonical bytes of this style: compact JSON with sorted keys.
    ///
    /// This is the byte stream the fingerprint hashes; it never contains
    /// floats, so serialization is infallible.
    #[must_use]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        write_map(&mut buf, &self.options);
        buf
    }

    /// The style fingerprint: `canonical_hash(DOMAIN_STYLE, canonical_bytes)`.
    #[must_use]
    pub fn fingerprint(&self) -> ContentHash {
        canonical_hash(DOMAIN_STYLE, &self.canonical_bytes())
    }

    /// JSON representation for reports and the search log.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        for (name, value) in &self.options {
            obj.insert(name.clone(), value.to_json());
        }
        serde_json::Value::Object(obj)
    }
}

// A dedicated writer rather than a round-trip through `serde_json::Value`:
// option values are bools, integers, tokens and nested maps only, so the
// canonical encoding is infallible and fingerprinting never returns Result.

fn write_map(buf: &mut Vec<u8>, map: &BTreeMap<String, OptionValue>) {
    buf.push(b'{');
    for (i, (name, value)) in map.iter().enumerate() {
        if i > 0 {
            buf.push(b',');
        }
        write_string(buf, name);
        buf.push(b':');
        write_value(buf, value);
    }
    buf.push(b'}');
}

fn write_value(buf: &mut Vec<u8>, value: &OptionValue) {
    match value {
        OptionValue::Bool(true) => buf.extend_from_slice(b"true"),
        OptionValue::Bool(false) => buf.extend_from_slice(b"false"),
        OptionValue::Int(i) => buf.extend_from_slice(i.to_string().as_bytes()),
        OptionValue::Token(t) => write_string(buf, t),
        OptionValue::Map(map) => write_map(buf, map),
    }
}

fn write_string(buf: &mut Vec<u8>, s: &str) {
    buf.push(b'"');
    for ch in s.chars() {
        match ch {
            '"' => buf.extend_from_slice(b"\\\""),
            '\\' => buf.extend_from_slice(b"\\\\"),
            '\n' => buf.extend_from_slice(b"\\n"),
            '\r' => buf.extend_from_slice(b"\\r"),
            '\t' => buf.extend_from_slice(b"\\t"),
            c if c < '\u{0020}' => {
                buf.extend_from_slice(format!("\\u{:04x}", c as u32).as_bytes());
            }
            c => {
                let mut utf8 = [0u8; 4];
                buf.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
            }
        }
    }
    buf.push(b'"');
}
