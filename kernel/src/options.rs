//! Formatter option declarations.
//!
//! Each adapter declares its searchable surface as a list of [`OptionDef`]s:
//! a name, a tagged value domain, and a canonical default. The search engine
//! pattern-matches on the domain tag to generate trial values; it never
//! invents values of its own. Numeric domains therefore carry an
//! adapter-declared sweep instead of an engine-side heuristic.
//!
//! Declarations are validated once at startup and immutable afterwards.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

/// A concrete value assigned to an option.
///
/// `Map` carries a fully-specified composite value: every child of the
/// composite's declaration is present, explicitly or at its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Token(String),
    Map(BTreeMap<String, OptionValue>),
}

impl OptionValue {
    /// Canonical single-line token for ordering and log records.
    #[must_use]
    pub fn token(&self) -> String {
        match self {
            Self::Bool(b) => {
                if *b {
                    "true".to_string()
                } else {
                    "false".to_string()
                }
            }
            Self::Int(i) => i.to_string(),
            Self::Token(t) => t.clone(),
            Self::Map(map) => {
                let inner: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("{k}={}", v.token()))
                    .collect();
                format!("{{{}}}", inner.join(","))
            }
        }
    }

    /// JSON representation used by canonical style serialization.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Token(t) => serde_json::Value::String(t.clone()),
            Self::Map(map) => {
                let mut obj = serde_json::Map::new();
                for (k, v) in map {
                    obj.insert(k.clone(), v.to_json());
                }
                serde_json::Value::Object(obj)
            }
        }
    }
}

/// The value domain of an option, as declared by its formatter adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueDomain {
    /// `true` / `false`.
    Boolean,
    /// A closed set of token values.
    Enumerated { values: Vec<String> },
    /// A bounded integer with an adapter-declared sweep of values worth
    /// trying (typically the endpoints, the midpoint, and common settings).
    BoundedInt { min: i64, max: i64, sweep: Vec<i64> },
    /// A nested group of options set together (e.g. per-construct brace
    /// wrapping flags).
    Composite { children: Vec<OptionDef> },
}

/// A single formatter option: name, domain, canonical default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionDef {
    pub name: String,
    pub domain: ValueDomain,
    pub default: OptionValue,
}

/// Typed failure for option declaration validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionDeclError {
    #[error("option `{name}`: {detail}")]
    Invalid { name: String, detail: String },

    #[error("duplicate option name `{name}`")]
    Duplicate { name: String },
}

impl OptionDef {
    /// A boolean option.
    #[must_use]
    pub fn boolean(name: &str, default: bool) -> Self {
        Self {
            name: name.to_string(),
            domain: ValueDomain::Boolean,
            default: OptionValue::Bool(default),
        }
    }

    /// An enumerated option. The default must be one of `values`.
    #[must_use]
    pub fn enumerated(name: &str, values: &[&str], default: &str) -> Self {
        Self {
            name: name.to_string(),
            domain: ValueDomain::Enumerated {
                values: values.iter().map(|v| (*v).to_string()).collect(),
            },
            default: OptionValue::Token(default.to_string()),
        }
    }

    /// A bounded integer option with an adapter-declared sweep.
    #[must_use]
    pub fn bounded_int(name: &str, min: i64, max: i64, sweep: &[i64], default: i64) -> Self {
        Self {
            name: name.to_string(),
            domain: ValueDomain::BoundedInt {
                min,
                max,
                sweep: sweep.to_vec(),
            },
            default: OptionValue::Int(default),
        }
    }

    /// A composite option. The default is the map of child defaults.
    #[must_use]
    pub fn composite(name: &str, children: Vec<OptionDef>) -> Self {
        let default = OptionValue::Map(
            children
                .iter()
                .map(|c| (c.name.clone(), c.default.clone()))
                .collect(),
        );
        Self {
            name: name.to_string(),
            domain: ValueDomain::Composite { children },
            default,
        }
    }

    /// Whether `value` lies in this option's domain.
    #[must_use]
    pub fn contains(&self, value: &OptionValue) -> bool {
        match (&self.domain, value) {
            (ValueDomain::Boolean, OptionValue::Bool(_)) => true,
            (ValueDomain::Enumerated { values }, OptionValue::Token(t)) => {
                values.iter().any(|v| v == t)
            }
            (ValueDomain::BoundedInt { min, max, .. }, OptionValue::Int(i)) => {
                *min <= *i && *i <= *max
            }
            (ValueDomain::Composite { children }, OptionValue::Map(map)) => {
                map.len() == children.len()
                    && children.iter().all(|child| {
                        map.get(&child.name).is_some_and(|v| child.contains(v))
                    })
            }
            _ => false,
        }
    }

    /// Validate this declaration.
    ///
    /// # Errors
    ///
    /// Returns [`OptionDeclError`] if the default lies outside the domain,
    /// an enumerated domain is empty or has duplicates, a sweep value lies
    /// outside the bounds, or composite children are invalid.
    pub fn validate(&self) -> Result<(), OptionDeclError> {
        let invalid = |detail: String| OptionDeclError::Invalid {
            name: self.name.clone(),
            detail,
        };
        if self.name.is_empty() {
            return Err(invalid("empty option name".to_string()));
        }
        match &self.domain {
            ValueDomain::Boolean => {}
            ValueDomain::Enumerated { values } => {
                if values.is_empty() {
                    return Err(invalid("enumerated domain is empty".to_string()));
                }
                let unique: BTreeSet<&String> = values.iter().collect();
                if unique.len() != values.len() {
                    return Err(invalid("enumerated domain has duplicates".to_string()));
                }
            }
            ValueDomain::BoundedInt { min, max, sweep } => {
                if min > max {
                    return Err(invalid(format!("empty integer range {min}..{max}")));
                }
                if sweep.is_empty() {
                    return Err(invalid("integer sweep is empty".to_string()));
                }
                for v in sweep {
                    if v < min || v > max {
                        return Err(invalid(format!("sweep value {v} outside {min}..{max}")));
                    }
                }
            }
            ValueDomain::Composite { children } => {
                if children.is_empty() {
                    return Err(invalid("composite has no children".to_string()));
                }
                let mut seen = BTreeSet::new();
                for child in children {
                    if !seen.insert(child.name.clone()) {
                        return Err(OptionDeclError::Duplicate {
                            name: format!("{}.{}", self.name, child.name),
                        });
                    }
                    child.validate()?;
                }
            }
        }
        if !self.contains(&self.default) {
            return Err(invalid(format!(
                "default `{}` outside the declared domain",
                self.default.token()
            )));
        }
        Ok(())
    }

    /// The canonical admissible-value neighborhood around `anchor`.
    ///
    /// Scalar domains ignore the anchor and enumerate the whole admissible
    /// set: booleans `false` then `true`, enumerated values sorted by
    /// token, the declared integer sweep plus the default ascending. For a
    /// composite the neighborhood varies one child at a time around the
    /// anchor map (children by name, then child value order).
    #[must_use]
    pub fn domain_values(&self, anchor: &OptionValue) -> Vec<OptionValue> {
        match &self.domain {
            ValueDomain::Boolean => {
                vec![OptionValue::Bool(false), OptionValue::Bool(true)]
            }
            ValueDomain::Enumerated { values } => {
                let mut sorted = values.clone();
                sorted.sort();
                sorted.into_iter().map(OptionValue::Token).collect()
            }
            ValueDomain::BoundedInt { sweep, .. } => {
                let mut candidates: BTreeSet<i64> = sweep.iter().copied().collect();
                if let OptionValue::Int(d) = &self.default {
                    candidates.insert(*d);
                }
                candidates.into_iter().map(OptionValue::Int).collect()
            }
            ValueDomain::Composite { children } => {
                let base = self.complete_map(anchor);
                let mut maps = Vec::new();
                let mut sorted: Vec<&OptionDef> = children.iter().collect();
                sorted.sort_by(|a, b| a.name.cmp(&b.name));
                for child in sorted {
                    let child_current = base
                        .get(&child.name)
                        .cloned()
                        .unwrap_or_else(|| child.default.clone());
                    for value in child.trial_values(&child_current) {
                        let mut map = base.clone();
                        map.insert(child.name.clone(), value);
                        maps.push(OptionValue::Map(map));
                    }
                }
                maps
            }
        }
    }

    /// Enumerate admissible trial values that differ from `current`.
    ///
    /// This is [`OptionDef::domain_values`] anchored at `current` with the
    /// current value itself removed. Same inputs always produce the same
    /// sequence.
    #[must_use]
    pub fn trial_values(&self, current: &OptionValue) -> Vec<OptionValue> {
        let mut trials = self.domain_values(current);
        trials.retain(|v| v != current);
        trials
    }

    /// Expand a (possibly partial) composite value to a full child map.
    /// For non-composite domains, returns an empty map.
    fn complete_map(&self, current: &OptionValue) -> BTreeMap<String, OptionValue> {
        let ValueDomain::Composite { children } = &self.domain else {
            return BTreeMap::new();
        };
        let explicit = match current {
            OptionValue::Map(map) => map.clone(),
            _ => BTreeMap::new(),
        };
        children
            .iter()
            .map(|child| {
                let value = explicit
                    .get(&child.name)
                    .cloned()
                    .unwrap_or_else(|| child.default.clone());
                (child.name.clone(), value)
            })
            .collect()
    }
}

/// Validate a full option table: every declaration valid, names unique.
///
/// # Errors
///
/// Returns the first [`OptionDeclError`] encountered.
pub fn validate_options(defs: &[OptionDef]) -> Result<(), OptionDeclError> {
    let mut seen = BTreeSet::new();
    for def in defs {
        if !seen.insert(def.name.clone()) {
            return Err(OptionDeclError::Duplicate {
                name: def.name.clone(),
            });
        }
        def.validate()?;
    }
    Ok(())
}
