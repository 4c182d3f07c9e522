use derive_more::Display;
use thiserror::Error as ThisError;

///
/// Error
///
/// Structured runtime error with a stable classification.
/// Anything surfaced through this type aborts the current level; per-record
/// skip decisions travel as `report::Diagnostic` instead, never as `Error`.
///

#[derive(Debug, ThisError)]
#[error("{origin}: {message}")]
pub struct Error {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
        }
    }

    /// A required upstream entity is entirely missing; the level cannot run.
    pub fn fatal_precondition(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::FatalPrecondition, ErrorOrigin::Seed, message)
    }

    /// A dataset could not be read, parsed, or validated.
    pub fn dataset(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Dataset, ErrorOrigin::Dataset, message)
    }

    /// The store rejected an operation (constraint violation, I/O failure).
    pub fn store(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Store, ErrorOrigin::Store, message)
    }

    /// A persisted row no longer decodes or violates a row invariant.
    pub fn store_corruption(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Corruption, ErrorOrigin::Store, message)
    }

    /// Invalid connection target or engine configuration.
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Config, ErrorOrigin::Config, message)
    }
}

///
/// ErrorClass
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum ErrorClass {
    /// Required upstream rows (typically the root Country) are missing.
    FatalPrecondition,

    /// Source dataset failed to parse or validate.
    Dataset,

    /// Store-level failure outside the batch-granular upsert path.
    Store,

    /// Persisted state is undecodable or internally inconsistent.
    Corruption,

    /// Bad connection target or engine configuration.
    Config,
}

///
/// ErrorOrigin
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum ErrorOrigin {
    Seed,
    Store,
    Dataset,
    Config,
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_origin_and_message() {
        let err = Error::fatal_precondition("no country row found");
        assert_eq!(err.to_string(), "Seed: no country row found");
        assert_eq!(err.class, ErrorClass::FatalPrecondition);
    }

    #[test]
    fn test_store_corruption_class() {
        let err = Error::store_corruption("bad row");
        assert_eq!(err.class, ErrorClass::Corruption);
        assert_eq!(err.origin, ErrorOrigin::Store);
    }
}
