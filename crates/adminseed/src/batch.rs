//! Chunked, idempotent persistence of prepared entities.
//!
//! Failure is batch-granular, not row-granular: one bad row fails its whole
//! chunk, the chunk is recorded, and the remaining chunks are still
//! attempted. Rerunning the level is always safe because writes are keyed
//! on `code`.

use crate::{error::Error, model::AdminUnit, store::Store};
use tracing::{debug, warn};

/// Default chunk size for upsert statements.
pub const DEFAULT_BATCH_SIZE: usize = 25;

///
/// BatchError
///
/// One failed chunk: the codes it carried and the store's error message.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BatchError {
    pub codes: Vec<String>,
    pub message: String,
}

impl std::fmt::Display for BatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "chunk [{}] failed: {}", self.codes.join(", "), self.message)
    }
}

///
/// BatchOutcome
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BatchOutcome {
    pub inserted: usize,
    pub updated: usize,
    pub failures: Vec<BatchError>,
}

impl BatchOutcome {
    #[must_use]
    pub const fn upserted(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Upsert `rows` in chunks of `batch_size`, keyed on `code`.
///
/// Never returns `Err`: store rejections are demoted to recorded
/// `BatchError`s so one poisoned chunk cannot abort the level.
pub fn upsert_in_chunks<E: AdminUnit, S: Store>(
    store: &mut S,
    rows: Vec<E>,
    batch_size: usize,
) -> BatchOutcome {
    let batch_size = batch_size.max(1);
    let mut outcome = BatchOutcome::default();

    for chunk in rows.chunks(batch_size) {
        match store.upsert_on_code(chunk.to_vec()) {
            Ok(delta) => {
                debug!(
                    table = E::TABLE,
                    rows = chunk.len(),
                    inserted = delta.inserted,
                    updated = delta.updated,
                    "chunk upserted"
                );
                outcome.inserted += delta.inserted;
                outcome.updated += delta.updated;
            }
            Err(err) => {
                let failure = chunk_failure(chunk, &err);
                warn!(table = E::TABLE, %err, codes = ?failure.codes, "chunk failed");
                outcome.failures.push(failure);
            }
        }
    }

    outcome
}

fn chunk_failure<E: AdminUnit>(chunk: &[E], err: &Error) -> BatchError {
    BatchError {
        codes: chunk.iter().map(|row| row.code().to_string()).collect(),
        message: err.to_string(),
    }
}

///
/// TESTS
///
