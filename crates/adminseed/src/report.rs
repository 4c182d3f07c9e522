//! Per-level run reporting.
//!
//! Resolution and code synthesis communicate skip decisions as typed
//! `Diagnostic` values; only this layer and the CLI render them for humans.
//! Console output is never used to signal control flow.

use crate::{batch::BatchError, codegen::CodeError, model::Level};
use thiserror::Error as ThisError;

///
/// Diagnostic
///
/// Why one raw record was skipped. Recoverable by fixing source data and
/// rerunning; never aborts a level.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum Diagnostic {
    #[error(
        "{child_level} {child:?}: {parent_level} {parent:?} not found under any normalized variant"
    )]
    UnresolvedParent {
        child_level: Level,
        child: String,
        parent_level: Level,
        parent: String,
    },

    #[error("{child_level} {child:?}: no {parent_level} with source id {source_id:?}")]
    UnresolvedParentId {
        child_level: Level,
        child: String,
        parent_level: Level,
        source_id: String,
    },

    #[error("{level} {name:?}: code synthesis failed: {source}")]
    CodeSynthesis {
        level: Level,
        name: String,
        source: CodeError,
    },
}

impl Diagnostic {
    #[must_use]
    pub fn unresolved_parent(
        child_level: Level,
        child: &str,
        parent_level: Level,
        parent: &str,
    ) -> Self {
        Self::UnresolvedParent {
            child_level,
            child: child.to_string(),
            parent_level,
            parent: parent.to_string(),
        }
    }

    #[must_use]
    pub fn code_synthesis(level: Level, name: &str, source: CodeError) -> Self {
        Self::CodeSynthesis {
            level,
            name: name.to_string(),
            source,
        }
    }
}

/// Split per-record outcomes into rows ready to persist and skip reasons.
/// The single partition point for the whole level; resolution code never
/// appends to shared mutable state.
#[must_use]
pub fn partition<T>(results: Vec<Result<T, Diagnostic>>) -> (Vec<T>, Vec<Diagnostic>) {
    let mut prepared = Vec::with_capacity(results.len());
    let mut skipped = Vec::new();

    for result in results {
        match result {
            Ok(value) => prepared.push(value),
            Err(diag) => skipped.push(diag),
        }
    }

    (prepared, skipped)
}

///
/// SeedReport
///
/// Outcome of one completed level run. A level that completes with skips is
/// still `Completed`; fatal preconditions surface as `Error` before any
/// report exists.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SeedReport {
    pub level: Option<Level>,
    pub prepared: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unresolved: Vec<Diagnostic>,
    pub batch_failures: Vec<BatchError>,
}

impl SeedReport {
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.unresolved.len()
    }

    #[must_use]
    pub fn clean(&self) -> bool {
        self.unresolved.is_empty() && self.batch_failures.is_empty()
    }
}

impl std::fmt::Display for SeedReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.level {
            Some(level) => write!(f, "{level}: ")?,
            None => write!(f, "run: ")?,
        }
        write!(
            f,
            "prepared={} inserted={} updated={} skipped={} batch_failures={}",
            self.prepared,
            self.inserted,
            self.updated,
            self.skipped(),
            self.batch_failures.len()
        )?;

        for diag in &self.unresolved {
            write!(f, "\n  skipped: {diag}")?;
        }
        for failure in &self.batch_failures {
            write!(f, "\n  failed: {failure}")?;
        }

        Ok(())
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_splits_outcomes() {
        let results: Vec<Result<u32, Diagnostic>> = vec![
            Ok(1),
            Err(Diagnostic::unresolved_parent(
                Level::SubCounty,
                "Busoro",
                Level::District,
                "Atlantis",
            )),
            Ok(2),
        ];

        let (prepared, skipped) = partition(results);
        assert_eq!(prepared, vec![1, 2]);
        assert_eq!(skipped.len(), 1);
    }

    #[test]
    fn test_diagnostic_names_the_missing_parent() {
        let diag = Diagnostic::unresolved_parent(
            Level::SubCounty,
            "Busoro",
            Level::District,
            "Atlantis",
        );
        let rendered = diag.to_string();
        assert!(rendered.contains("Atlantis"));
        assert!(rendered.contains("District"));
    }

    #[test]
    fn test_report_render_lists_skips() {
        let report = SeedReport {
            level: Some(Level::SubCounty),
            prepared: 2,
            inserted: 2,
            updated: 0,
            unresolved: vec![Diagnostic::unresolved_parent(
                Level::SubCounty,
                "Busoro",
                Level::District,
                "Atlantis",
            )],
            batch_failures: vec![],
        };

        let rendered = report.to_string();
        assert!(rendered.starts_with("SubCounty: prepared=2"));
        assert!(rendered.contains("skipped: "));
    }
}
