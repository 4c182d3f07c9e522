//! Parent resolution against the persisted rows of the previous level.
//!
//! The index is rebuilt from the store at the start of every level run so a
//! level's own freshly committed rows are visible to the next level.

use crate::{
    model::AdminUnit,
    normalize::{normalize, normalize_for},
};
use serde::Deserialize;
use std::collections::BTreeMap;

///
/// SourceIdEntry
///
/// One row of an auxiliary id-mapping table: a dataset-local parent id and
/// the parent's name as that dataset spells it.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct SourceIdEntry {
    pub id: String,
    pub name: String,
}

///
/// ParentIndex
///
/// Normalized-name lookup over every persisted parent-level entity. Each
/// entity is indexed under every normalization variant of its name; when two
/// variants collide the first writer wins. Differently-spelled parents that
/// normalize to the same key therefore shadow one another depending on load
/// order. The source data exhibits exactly this behavior with no tie-break
/// rule, and the ambiguity is preserved here on purpose.
///

#[derive(Debug)]
pub struct ParentIndex<E: AdminUnit> {
    entries: Vec<E>,
    by_key: BTreeMap<String, usize>,
    by_source_id: BTreeMap<String, usize>,
}

impl<E: AdminUnit> ParentIndex<E> {
    /// Index `parents` under every normalization variant of their names,
    /// using the filler tokens of the parent level itself.
    #[must_use]
    pub fn build(parents: Vec<E>) -> Self {
        let mut by_key = BTreeMap::new();

        for (idx, parent) in parents.iter().enumerate() {
            for variant in normalize_for(E::LEVEL, parent.name()) {
                // First writer wins; later entities never displace an entry.
                by_key.entry(variant).or_insert(idx);
            }
        }

        Self {
            entries: parents,
            by_key,
            by_source_id: BTreeMap::new(),
        }
    }

    /// Attach a source-provided id-mapping table as a secondary index.
    ///
    /// Each entry's name is resolved through the primary index; entries whose
    /// names do not resolve are dropped silently — the per-record resolution
    /// path reports the miss with full context instead.
    pub fn attach_source_ids(&mut self, mapping: &[SourceIdEntry]) {
        for entry in mapping {
            if let Some(idx) = self.resolve_idx(&entry.name) {
                self.by_source_id.entry(entry.id.clone()).or_insert(idx);
            }
        }
    }

    /// Resolve a raw parent name: probe the index with each normalization
    /// variant in order, returning the first hit.
    #[must_use]
    pub fn resolve(&self, raw_name: &str) -> Option<&E> {
        self.resolve_idx(raw_name).map(|idx| &self.entries[idx])
    }

    /// Resolve through the secondary source-id index.
    #[must_use]
    pub fn resolve_source_id(&self, id: &str) -> Option<&E> {
        self.by_source_id.get(id).map(|idx| &self.entries[*idx])
    }

    /// First entity matching `pred`, in persisted order. Used for the
    /// county-by-district fallback, which assumes at most one County per
    /// District in the seed datasets; multi-county districts would resolve
    /// to an arbitrary County here.
    #[must_use]
    pub fn find(&self, pred: impl Fn(&E) -> bool) -> Option<&E> {
        self.entries.iter().find(|e| pred(e))
    }

    /// First entity in persisted order.
    #[must_use]
    pub fn first(&self) -> Option<&E> {
        self.entries.first()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn resolve_idx(&self, raw_name: &str) -> Option<usize> {
        normalize(raw_name, E::LEVEL.filler_tokens())
            .iter()
            .find_map(|variant| self.by_key.get(variant))
            .copied()
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Country, District, RowMeta, UnitId};

    fn district(name: &str, code: &str) -> District {
        let mut meta = RowMeta::prepared(code, name);
        meta.id = Some(UnitId::generate());
        District {
            meta,
            country_id: UnitId::generate(),
        }
    }

    #[test]
    fn test_resolves_exact_name() {
        let index = ParentIndex::build(vec![district("Kabarole", "UG-KBL")]);
        assert_eq!(index.resolve("Kabarole").unwrap().code(), "UG-KBL");
    }

    #[test]
    fn test_resolves_suffixed_spelling() {
        let index = ParentIndex::build(vec![district("Kabarole", "UG-KBL")]);
        // Child datasets often write "Kabarole District"; the stripped
        // variant must land on the same row.
        assert_eq!(index.resolve("Kabarole District").unwrap().code(), "UG-KBL");
    }

    #[test]
    fn test_resolves_through_alias() {
        let index = ParentIndex::build(vec![district("Kabarole", "UG-KBL")]);
        assert_eq!(index.resolve("Fort Portal City").unwrap().code(), "UG-KBL");
    }

    #[test]
    fn test_miss_returns_none() {
        let index = ParentIndex::build(vec![district("Kabarole", "UG-KBL")]);
        assert!(index.resolve("Atlantis").is_none());
    }

    #[test]
    fn test_first_writer_wins_on_variant_collision() {
        // Both names normalize to "mbarara"; load order decides the winner.
        let index = ParentIndex::build(vec![
            district("Mbarara", "UG-MBR"),
            district("Mbarara City", "UG-MBC"),
        ]);
        assert_eq!(index.resolve("Mbarara").unwrap().code(), "UG-MBR");

        let flipped = ParentIndex::build(vec![
            district("Mbarara City", "UG-MBC"),
            district("Mbarara", "UG-MBR"),
        ]);
        assert_eq!(flipped.resolve("Mbarara").unwrap().code(), "UG-MBC");
    }

    #[test]
    fn test_source_id_fallback() {
        let mut index = ParentIndex::build(vec![district("Kabarole", "UG-KBL")]);
        index.attach_source_ids(&[
            SourceIdEntry {
                id: "D014".to_string(),
                name: "Kabarole District".to_string(),
            },
            SourceIdEntry {
                id: "D999".to_string(),
                name: "Nowhere".to_string(),
            },
        ]);

        assert_eq!(index.resolve_source_id("D014").unwrap().code(), "UG-KBL");
        assert!(index.resolve_source_id("D999").is_none());
    }

    #[test]
    fn test_empty_index_for_missing_parent_level() {
        let index: ParentIndex<Country> = ParentIndex::build(Vec::new());
        assert!(index.is_empty());
        assert!(index.resolve("Uganda").is_none());
    }
}
