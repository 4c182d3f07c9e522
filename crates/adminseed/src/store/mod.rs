//! Store capability surface and the shipped engines.
//!
//! The engine needs four primitives from any relational-style backend:
//! select-all, select-where, insert, and upsert-on-conflict keyed on the
//! unique `code` column. `MemoryStore` is the in-process engine;
//! `JsonStore` wraps it with a durable single-file image. The connection
//! target is a DSN string: `memory:` or `file:<path>` (a bare path is
//! treated as a file).

mod json;
mod memory;

pub use json::JsonStore;
pub use memory::MemoryStore;

use crate::{error::Error, model::AdminUnit};

///
/// UpsertDelta
///
/// What one upsert call did: fresh inserts vs. conflict touch-updates.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct UpsertDelta {
    pub inserted: usize,
    pub updated: usize,
}

impl UpsertDelta {
    #[must_use]
    pub const fn total(self) -> usize {
        self.inserted + self.updated
    }
}

///
/// Store
///
/// On upsert conflict only `name` and `updated_at` are overwritten; `id`,
/// `code`, `created_at`, and parent references are left untouched. Insert
/// assigns the row id and stamps both timestamps.
///

pub trait Store {
    fn select_all<E: AdminUnit>(&self) -> Result<Vec<E>, Error>;

    fn select_where<E: AdminUnit, P: Fn(&E) -> bool>(&self, pred: P) -> Result<Vec<E>, Error>;

    fn insert<E: AdminUnit>(&mut self, rows: Vec<E>) -> Result<Vec<E>, Error>;

    fn upsert_on_code<E: AdminUnit>(&mut self, rows: Vec<E>) -> Result<UpsertDelta, Error>;
}

///
/// SeedStore
///
/// Engine selected from a DSN at startup.
///

#[derive(Debug)]
pub enum SeedStore {
    Memory(MemoryStore),
    Json(JsonStore),
}

impl SeedStore {
    /// Open the engine named by `dsn`.
    pub fn open(dsn: &str) -> Result<Self, Error> {
        if dsn == "memory:" || dsn == "memory" {
            return Ok(Self::Memory(MemoryStore::default()));
        }

        if let Some(path) = dsn.strip_prefix("file:") {
            return Ok(Self::Json(JsonStore::open(path)?));
        }

        if dsn.contains("://") {
            return Err(Error::config(format!(
                "unsupported database url scheme: {dsn}"
            )));
        }

        Ok(Self::Json(JsonStore::open(dsn)?))
    }
}

impl Store for SeedStore {
    fn select_all<E: AdminUnit>(&self) -> Result<Vec<E>, Error> {
        match self {
            Self::Memory(store) => store.select_all(),
            Self::Json(store) => store.select_all(),
        }
    }

    fn select_where<E: AdminUnit, P: Fn(&E) -> bool>(&self, pred: P) -> Result<Vec<E>, Error> {
        match self {
            Self::Memory(store) => store.select_where(pred),
            Self::Json(store) => store.select_where(pred),
        }
    }

    fn insert<E: AdminUnit>(&mut self, rows: Vec<E>) -> Result<Vec<E>, Error> {
        match self {
            Self::Memory(store) => store.insert(rows),
            Self::Json(store) => store.insert(rows),
        }
    }

    fn upsert_on_code<E: AdminUnit>(&mut self, rows: Vec<E>) -> Result<UpsertDelta, Error> {
        match self {
            Self::Memory(store) => store.upsert_on_code(rows),
            Self::Json(store) => store.upsert_on_code(rows),
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_memory_dsn() {
        assert!(matches!(
            SeedStore::open("memory:").unwrap(),
            SeedStore::Memory(_)
        ));
    }

    #[test]
    fn test_open_rejects_foreign_scheme() {
        let err = SeedStore::open("postgres://localhost/geo").unwrap_err();
        assert_eq!(err.class, crate::error::ErrorClass::Config);
    }
}
