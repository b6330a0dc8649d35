//! Header label to column name translation.

use crate::config::HeaderCase;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Translation applied to labels that have no explicit mapping.
#[derive(Clone, Default)]
pub enum Fallback {
    /// Lowercase the label.
    #[default]
    Lowercase,
    /// Keep the label unchanged.
    Preserve,
    /// Lowercase and replace runs of non-alphanumerics with `_`.
    SnakeCase,
    /// Caller-supplied function.
    Custom(Arc<dyn Fn(&str) -> String + Send + Sync>),
}

impl Fallback {
    fn apply(&self, label: &str) -> String {
        match self {
            Self::Lowercase => label.to_lowercase(),
            Self::Preserve => label.to_string(),
            Self::SnakeCase => snake_case(label),
            Self::Custom(f) => f(label),
        }
    }
}

impl fmt::Debug for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lowercase => f.write_str("Lowercase"),
            Self::Preserve => f.write_str("Preserve"),
            Self::SnakeCase => f.write_str("SnakeCase"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl From<HeaderCase> for Fallback {
    fn from(case: HeaderCase) -> Self {
        match case {
            HeaderCase::Lower => Self::Lowercase,
            HeaderCase::Preserve => Self::Preserve,
            HeaderCase::Snake => Self::SnakeCase,
        }
    }
}

fn snake_case(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut pending_sep = false;
    for ch in label.trim().chars() {
        if ch.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Maps external header labels to internal column names.
///
/// An exact match in the configured map wins and is used as-is. Any other
/// label goes through the [`Fallback`]. Translation never fails.
///
/// # Example
///
/// ```rust
/// use seedbus_core::NameTranslator;
///
/// let translator = NameTranslator::new().with_mapping("Date", "datetime");
/// assert_eq!(translator.translate("Date"), "datetime");
/// assert_eq!(translator.translate("Title"), "title");
/// ```
#[derive(Debug, Clone, Default)]
pub struct NameTranslator {
    mappings: BTreeMap<String, String>,
    fallback: Fallback,
}

impl NameTranslator {
    /// Creates a translator with no mappings and the lowercase fallback.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a translator from a label map and fallback.
    #[must_use]
    pub fn from_parts(mappings: BTreeMap<String, String>, fallback: Fallback) -> Self {
        Self { mappings, fallback }
    }

    /// Adds an explicit mapping.
    #[must_use]
    pub fn with_mapping(mut self, label: impl Into<String>, column: impl Into<String>) -> Self {
        self.mappings.insert(label.into(), column.into());
        self
    }

    /// Replaces the fallback.
    #[must_use]
    pub fn with_fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = fallback;
        self
    }

    /// Translates a label.
    #[must_use]
    pub fn translate(&self, label: &str) -> String {
        match self.mappings.get(label) {
            Some(column) => column.clone(),
            None => self.fallback.apply(label),
        }
    }
}
