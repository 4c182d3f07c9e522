//! Administrative-geography seeding engine.
//!
//! Resolves a country's administrative hierarchy (districts, counties,
//! sub-counties, parishes, villages, plus municipality and city overlays)
//! from raw name-keyed datasets, synthesizes stable hierarchical codes, and
//! upserts the rows idempotently into a pluggable store.
//!
//! ## Crate layout
//! - `batch`: chunked upserts with batch-granular failure capture.
//! - `codegen`: hierarchical code synthesis and collision handling.
//! - `error`: shared error type with class and origin.
//! - `model`: levels, ids, and the per-level entity types.
//! - `normalize`: name canonicalization and the spelling-alias table.
//! - `report`: per-level run reports and skip diagnostics.
//! - `resolve`: normalized-name parent lookup over persisted rows.
//! - `seed`: dataset parsing and the level-by-level orchestrator.
//! - `store`: the store trait plus memory and JSON-file backends.

pub mod batch;
pub mod codegen;
pub mod error;
pub mod model;
pub mod normalize;
pub mod report;
pub mod resolve;
pub mod seed;
pub mod store;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use error::Error;

///
/// Prelude
/// using _ brings traits into scope and avoids name conflicts
///

pub mod prelude {
    pub use crate::{
        batch::DEFAULT_BATCH_SIZE,
        error::{Error, ErrorClass, ErrorOrigin},
        model::{AdminUnit as _, Level, UnitId},
        report::SeedReport,
        seed::{
            self,
            dataset::{DatasetBundle, DatasetSources},
        },
        store::{SeedStore, Store as _},
    };
}
