use crate::{
    error::Error,
    model::{AdminUnit, UnitId},
    store::{Store, UpsertDelta},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

///
/// Table
///
/// Row images keyed by insertion sequence (ids are not ordering-safe within
/// a millisecond), plus the unique index over `code`.
///

#[derive(Debug, Default, Deserialize, Serialize)]
struct Table {
    next_seq: u64,
    rows: BTreeMap<u64, serde_json::Value>,
    codes: BTreeMap<String, u64>,
}

///
/// MemoryStore
///
/// In-process engine holding every unit table as serialized row images, in
/// insertion-stable key order. Uniqueness of `code` is enforced per table;
/// a chunk that would touch the same code twice in one upsert call is
/// rejected whole, mirroring relational on-conflict semantics.
///

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct MemoryStore {
    tables: BTreeMap<String, Table>,
}

impl MemoryStore {
    fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    fn table_mut(&mut self, name: &str) -> &mut Table {
        self.tables.entry(name.to_string()).or_default()
    }

    fn decode<E: AdminUnit>(value: &serde_json::Value) -> Result<E, Error> {
        serde_json::from_value(value.clone()).map_err(|err| {
            Error::store_corruption(format!("undecodable {} row: {err}", E::TABLE))
        })
    }

    // Reject empty codes and codes touched twice within one statement.
    fn check_chunk_codes<E: AdminUnit>(rows: &[E]) -> Result<(), Error> {
        let mut seen = BTreeSet::new();

        for row in rows {
            if row.code().is_empty() {
                return Err(Error::store(format!(
                    "{}: cannot persist a row with an empty code",
                    E::TABLE
                )));
            }
            if !seen.insert(row.code().to_string()) {
                return Err(Error::store(format!(
                    "{}: code {} affected twice in one statement",
                    E::TABLE,
                    row.code()
                )));
            }
        }

        Ok(())
    }

    fn insert_row<E: AdminUnit>(table: &mut Table, mut row: E) -> Result<E, Error> {
        let now = Utc::now();
        let meta = row.meta_mut();
        meta.id = Some(UnitId::generate());
        meta.created_at = now;
        meta.updated_at = now;

        let value = serde_json::to_value(&row)
            .map_err(|err| Error::store(format!("{}: encode failed: {err}", E::TABLE)))?;
        let seq = table.next_seq;
        table.next_seq += 1;
        table.rows.insert(seq, value);
        table.codes.insert(row.code().to_string(), seq);

        Ok(row)
    }
}

impl Store for MemoryStore {
    fn select_all<E: AdminUnit>(&self) -> Result<Vec<E>, Error> {
        let Some(table) = self.table(E::TABLE) else {
            return Ok(Vec::new());
        };

        table.rows.values().map(Self::decode).collect()
    }

    fn select_where<E: AdminUnit, P: Fn(&E) -> bool>(&self, pred: P) -> Result<Vec<E>, Error> {
        Ok(self.select_all()?.into_iter().filter(|e| pred(e)).collect())
    }

    fn insert<E: AdminUnit>(&mut self, rows: Vec<E>) -> Result<Vec<E>, Error> {
        Self::check_chunk_codes(&rows)?;

        // Uniqueness check before any write; an insert statement either
        // lands whole or not at all.
        {
            let table = self.table_mut(E::TABLE);
            for row in &rows {
                if table.codes.contains_key(row.code()) {
                    return Err(Error::store(format!(
                        "{}: duplicate code {}",
                        E::TABLE,
                        row.code()
                    )));
                }
            }
        }

        let table = self.table_mut(E::TABLE);
        rows.into_iter()
            .map(|row| Self::insert_row(table, row))
            .collect()
    }

    fn upsert_on_code<E: AdminUnit>(&mut self, rows: Vec<E>) -> Result<UpsertDelta, Error> {
        Self::check_chunk_codes(&rows)?;

        let table = self.table_mut(E::TABLE);
        let mut delta = UpsertDelta::default();

        for row in rows {
            if let Some(seq) = table.codes.get(row.code()).copied() {
                // Conflict: touch name and updated_at only.
                let value = table.rows.get(&seq).ok_or_else(|| {
                    Error::store_corruption(format!(
                        "{}: code index points at missing row {seq}",
                        E::TABLE
                    ))
                })?;
                let mut existing: E = Self::decode(value)?;
                let meta = existing.meta_mut();
                meta.name = row.name().to_string();
                meta.updated_at = Utc::now();

                let value = serde_json::to_value(&existing)
                    .map_err(|err| Error::store(format!("{}: encode failed: {err}", E::TABLE)))?;
                table.rows.insert(seq, value);
                delta.updated += 1;
            } else {
                Self::insert_row(table, row)?;
                delta.inserted += 1;
            }
        }

        Ok(delta)
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Country, RowMeta};

    fn country(code: &str, name: &str) -> Country {
        Country {
            meta: RowMeta::prepared(code, name),
        }
    }

    #[test]
    fn test_insert_assigns_id_and_timestamps() {
        let mut store = MemoryStore::default();
        let rows = store.insert(vec![country("UG", "Uganda")]).unwrap();

        assert_eq!(rows.len(), 1);
        assert!(rows[0].id().is_some());

        let all: Vec<Country> = store.select_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].code(), "UG");
    }

    #[test]
    fn test_insert_rejects_duplicate_code() {
        let mut store = MemoryStore::default();
        store.insert(vec![country("UG", "Uganda")]).unwrap();

        let err = store.insert(vec![country("UG", "Uganda")]).unwrap_err();
        assert_eq!(err.class, crate::error::ErrorClass::Store);
    }

    #[test]
    fn test_upsert_conflict_touches_name_and_updated_at_only() {
        let mut store = MemoryStore::default();
        let inserted = store.insert(vec![country("UG", "Ugnda")]).unwrap();
        let original = inserted[0].clone();

        let delta = store.upsert_on_code(vec![country("UG", "Uganda")]).unwrap();
        assert_eq!(delta, UpsertDelta { inserted: 0, updated: 1 });

        let all: Vec<Country> = store.select_all().unwrap();
        assert_eq!(all[0].name(), "Uganda");
        assert_eq!(all[0].id(), original.id());
        assert_eq!(all[0].meta.created_at, original.meta.created_at);
        assert!(all[0].meta.updated_at >= original.meta.updated_at);
    }

    #[test]
    fn test_upsert_inserts_missing_codes() {
        let mut store = MemoryStore::default();
        let delta = store
            .upsert_on_code(vec![country("UG", "Uganda"), country("KE", "Kenya")])
            .unwrap();
        assert_eq!(delta, UpsertDelta { inserted: 2, updated: 0 });
    }

    #[test]
    fn test_upsert_rejects_code_affected_twice() {
        let mut store = MemoryStore::default();
        let err = store
            .upsert_on_code(vec![country("UG", "Uganda"), country("UG", "Uganda again")])
            .unwrap_err();
        assert!(err.message.contains("affected twice"));
    }

    #[test]
    fn test_select_where_filters() {
        let mut store = MemoryStore::default();
        store
            .insert(vec![country("UG", "Uganda"), country("KE", "Kenya")])
            .unwrap();

        let hits: Vec<Country> = store.select_where(|c: &Country| c.code() == "KE").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name(), "Kenya");
    }

    #[test]
    fn test_select_all_on_missing_table_is_empty() {
        let store = MemoryStore::default();
        let all: Vec<Country> = store.select_all().unwrap();
        assert!(all.is_empty());
    }
}
