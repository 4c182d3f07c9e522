use crate::{
    error::Error,
    model::AdminUnit,
    store::{MemoryStore, Store, UpsertDelta},
};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

///
/// JsonStore
///
/// `MemoryStore` behind a single durable JSON image. The image is reloaded
/// on open and rewritten after every mutating statement via a temp-file
/// rename, so an aborted process leaves the last committed image intact
/// and the run can resume (upserts are idempotent on `code`).
///

#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl JsonStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        let inner = if path.exists() {
            let bytes = fs::read(&path).map_err(|err| {
                Error::store(format!("cannot read store image {}: {err}", path.display()))
            })?;
            serde_json::from_slice(&bytes).map_err(|err| {
                Error::store_corruption(format!(
                    "store image {} does not parse: {err}",
                    path.display()
                ))
            })?
        } else {
            MemoryStore::default()
        };

        Ok(Self { path, inner })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), Error> {
        let image = serde_json::to_vec_pretty(&self.inner)
            .map_err(|err| Error::store(format!("cannot encode store image: {err}")))?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, image).map_err(|err| {
            Error::store(format!("cannot write store image {}: {err}", tmp.display()))
        })?;
        fs::rename(&tmp, &self.path).map_err(|err| {
            Error::store(format!(
                "cannot commit store image {}: {err}",
                self.path.display()
            ))
        })?;

        debug!(path = %self.path.display(), "store image committed");

        Ok(())
    }
}

impl Store for JsonStore {
    fn select_all<E: AdminUnit>(&self) -> Result<Vec<E>, Error> {
        self.inner.select_all()
    }

    fn select_where<E: AdminUnit, P: Fn(&E) -> bool>(&self, pred: P) -> Result<Vec<E>, Error> {
        self.inner.select_where(pred)
    }

    fn insert<E: AdminUnit>(&mut self, rows: Vec<E>) -> Result<Vec<E>, Error> {
        let out = self.inner.insert(rows)?;
        self.flush()?;

        Ok(out)
    }

    fn upsert_on_code<E: AdminUnit>(&mut self, rows: Vec<E>) -> Result<UpsertDelta, Error> {
        let delta = self.inner.upsert_on_code(rows)?;
        self.flush()?;

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
    fn test_image_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("units.json");

        {
            let mut store = JsonStore::open(&path).unwrap();
            store.insert(vec![country("UG", "Uganda")]).unwrap();
        }

        let store = JsonStore::open(&path).unwrap();
        let all: Vec<Country> = store.select_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].code(), "UG");
        assert!(all[0].id().is_some());
    }

    #[test]
    fn test_upsert_after_reopen_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("units.json");

        let id = {
            let mut store = JsonStore::open(&path).unwrap();
            store
                .upsert_on_code(vec![country("UG", "Uganda")])
                .unwrap();
            let all: Vec<Country> = store.select_all().unwrap();
            all[0].id()
        };

        let mut store = JsonStore::open(&path).unwrap();
        let delta = store.upsert_on_code(vec![country("UG", "Uganda")]).unwrap();
        assert_eq!(delta.inserted, 0);
        assert_eq!(delta.updated, 1);

        let all: Vec<Country> = store.select_all().unwrap();
        assert_eq!(all[0].id(), id);
    }

    #[test]
    fn test_garbage_image_is_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("units.json");
        fs::write(&path, b"not json").unwrap();

        let err = JsonStore::open(&path).unwrap_err();
        assert_eq!(err.class, crate::error::ErrorClass::Corruption);
    }
}
