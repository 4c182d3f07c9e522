//! Short-code synthesis for new administrative units.
//!
//! Codes are human-readable, parent-prefixed, and globally unique within an
//! entity table. Allocation is deterministic for a fixed used-code state and
//! call order; the overall set of codes a run produces is order-dependent
//! (processing the same dataset in a different order can assign different
//! codes to the same entities). That is a documented property of the scheme,
//! not something this module tries to repair.

use std::collections::BTreeSet;
use thiserror::Error as ThisError;

/// Numeric-suffix probes tried after every letter probe collides. The probe
/// space is per parent prefix, so hitting this cap takes thousands of
/// same-prefix siblings.
const MAX_NUMERIC_PROBES: u32 = 9_999;

///
/// CodeStyle
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CodeStyle {
    /// First, middle, and last letter of the cleaned name.
    #[default]
    Initials,

    /// Three-letter name prefix; used for County codes.
    Prefix3,
}

///
/// CodeError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum CodeError {
    #[error("cannot derive a code from {name:?}: no letters")]
    EmptyName { name: String },

    #[error("collision probing exhausted for {name:?} under parent {parent_code:?}")]
    Exhausted { parent_code: String, name: String },
}

///
/// CodeSynthesizer
///
/// Allocates collision-free codes against a used-code set that must be
/// preloaded with every code already persisted for the entity table, so
/// reruns never collide with historical data. Every accepted code is added
/// to the set before the call returns.
///

#[derive(Debug, Default)]
pub struct CodeSynthesizer {
    used: BTreeSet<String>,
}

impl CodeSynthesizer {
    #[must_use]
    pub fn preloaded(used: impl IntoIterator<Item = String>) -> Self {
        Self {
            used: used.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.used.contains(code)
    }

    /// Allocate a unique code for `name` under `parent_code`.
    ///
    /// Candidate order, followed exactly:
    /// 1. the base candidate for `style`;
    /// 2. `first + cleaned[i] + last` for i in 1..=len-2 (middle-letter probes);
    /// 3. `first + counter + last` for counter 1, 2, ...
    pub fn generate(
        &mut self,
        parent_code: &str,
        name: &str,
        style: CodeStyle,
    ) -> Result<String, CodeError> {
        let cleaned: Vec<char> = name
            .chars()
            .flat_map(char::to_lowercase)
            .filter(char::is_ascii_lowercase)
            .collect();

        if cleaned.is_empty() {
            return Err(CodeError::EmptyName {
                name: name.to_string(),
            });
        }

        let first = cleaned[0];
        let last = cleaned[cleaned.len() - 1];

        let base_suffix = match style {
            CodeStyle::Initials => {
                let middle = cleaned[cleaned.len() / 2];
                format!("{first}{middle}{last}")
            }
            CodeStyle::Prefix3 => cleaned.iter().take(3).collect(),
        };

        if let Some(code) = self.try_accept(parent_code, &base_suffix) {
            return Ok(code);
        }

        // Step 2: vary the middle letter through the rest of the name.
        for i in 1..cleaned.len().saturating_sub(1) {
            let suffix = format!("{first}{}{last}", cleaned[i]);
            if let Some(code) = self.try_accept(parent_code, &suffix) {
                return Ok(code);
            }
        }

        // Step 3: numeric middle, unbounded in principle, capped in practice.
        for counter in 1..=MAX_NUMERIC_PROBES {
            let suffix = format!("{first}{counter}{last}");
            if let Some(code) = self.try_accept(parent_code, &suffix) {
                return Ok(code);
            }
        }

        Err(CodeError::Exhausted {
            parent_code: parent_code.to_string(),
            name: name.to_string(),
        })
    }

    // Uppercase the candidate and accept it if unused.
    fn try_accept(&mut self, parent_code: &str, suffix: &str) -> Option<String> {
        let candidate = format!("{parent_code}-{suffix}").to_uppercase();

        if self.used.contains(&candidate) {
            return None;
        }
        self.used.insert(candidate.clone());

        Some(candidate)
    }
}

///
/// TESTS
///
