//! Transcript normalization
//!
//! Deterministic, side-effect-free cleanup applied to recognizer output:
//! 1. Collapse repeated whitespace and trim
//! 2. Apply the correction table (case-insensitive literal substrings), each
//!    entry re-applied over the whole string until it no longer matches
//! 3. Capitalize the first character
//!
//! Terminal punctuation is never added or removed. Interim text only gets
//! step 1.

mod table;

use regex::{NoExpand, Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub use table::DEFAULT_CORRECTIONS;

/// A literal replacement entry, as written in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionEntry {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NormalizerError {
    #[error("correction pattern is empty")]
    EmptyPattern,
    #[error("replacement '{to}' contains its own pattern '{from}'")]
    SelfMatching { from: String, to: String },
    #[error("replacement '{to}' reintroduces the earlier pattern '{earlier}'")]
    Reintroduces { earlier: String, to: String },
    #[error("invalid correction pattern '{0}': {1}")]
    Pattern(String, String),
}

#[derive(Debug, Clone)]
struct Correction {
    from: String,
    pattern: Regex,
    replacement: String,
}

impl Correction {
    fn new(from: &str, to: &str) -> Result<Self, NormalizerError> {
        if from.is_empty() {
            return Err(NormalizerError::EmptyPattern);
        }

        let pattern = RegexBuilder::new(&regex::escape(from))
            .case_insensitive(true)
            .build()
            .map_err(|e| NormalizerError::Pattern(from.to_string(), e.to_string()))?;

        // Such an entry would never reach a fixed point
        if pattern.is_match(to) {
            return Err(NormalizerError::SelfMatching {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        Ok(Self {
            from: from.to_string(),
            pattern,
            replacement: to.to_string(),
        })
    }

    /// An earlier entry whose pattern this replacement would bring back
    fn reintroduced<'a>(&self, earlier: &'a [Correction]) -> Option<&'a Correction> {
        earlier
            .iter()
            .find(|entry| entry.pattern.is_match(&self.replacement))
    }

    fn apply(&self, text: String) -> String {
        let mut current = text;
        // Each pass strictly rewrites a match; the bound guards odd tables
        for _ in 0..=current.len() {
            if !self.pattern.is_match(&current) {
                break;
            }
            current = self
                .pattern
                .replace_all(&current, NoExpand(&self.replacement))
                .into_owned();
        }
        current
    }
}

/// Table-driven transcript normalizer
///
/// Entries run once each, in order, so no replacement may contain the
/// pattern of an entry before it. Tables breaking that rule are refused.
/// Patterns that only form across a replacement and its neighbouring text
/// are not detected.
///
/// Cost is O(n·m) for n characters and m table entries, fine for a small
/// hand-curated table.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    corrections: Vec<Correction>,
}

impl TextNormalizer {
    /// Build a normalizer from an ordered `(from, to)` table
    pub fn new<'a>(
        table: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, NormalizerError> {
        let mut corrections: Vec<Correction> = Vec::new();
        for (from, to) in table {
            let correction = Correction::new(from, to)?;
            if let Some(earlier) = correction.reintroduced(&corrections) {
                return Err(NormalizerError::Reintroduces {
                    earlier: earlier.from.clone(),
                    to: to.to_string(),
                });
            }
            corrections.push(correction);
        }

        Ok(Self { corrections })
    }

    /// Built-in table followed by `extra` entries
    ///
    /// Invalid extra entries are skipped with a warning.
    pub fn with_extra(extra: &[CorrectionEntry]) -> Self {
        let mut normalizer = Self::default();
        for entry in extra {
            match normalizer.accept(&entry.from, &entry.to) {
                Ok(correction) => normalizer.corrections.push(correction),
                Err(e) => warn!("Skipping correction '{}' -> '{}': {}", entry.from, entry.to, e),
            }
        }
        normalizer
    }

    fn accept(&self, from: &str, to: &str) -> Result<Correction, NormalizerError> {
        let correction = Correction::new(from, to)?;
        match correction.reintroduced(&self.corrections) {
            Some(earlier) => Err(NormalizerError::Reintroduces {
                earlier: earlier.from.clone(),
                to: to.to_string(),
            }),
            None => Ok(correction),
        }
    }

    /// An empty table: whitespace and capitalization only
    pub fn without_corrections() -> Self {
        Self {
            corrections: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.corrections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corrections.is_empty()
    }

    /// Full pipeline for final text
    pub fn normalize(&self, text: &str) -> String {
        let collapsed = collapse_whitespace(text);
        let corrected = self
            .corrections
            .iter()
            .fold(collapsed, |acc, correction| correction.apply(acc));
        capitalize_first(&corrected)
    }

    /// Cheap pipeline for interim previews
    pub fn normalize_interim(&self, text: &str) -> String {
        collapse_whitespace(text)
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        let mut normalizer = Self::without_corrections();
        for (from, to) in DEFAULT_CORRECTIONS {
            match normalizer.accept(from, to) {
                Ok(correction) => normalizer.corrections.push(correction),
                Err(e) => warn!("Skipping built-in correction '{}': {}", from, e),
            }
        }
        normalizer
    }
}

/// Collapse whitespace runs to a single space and trim
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
