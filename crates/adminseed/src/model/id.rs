use derive_more::Display;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

///
/// UnitId
///
/// Opaque row identifier, assigned by the store on insert and immutable
/// thereafter. Never derived from source data; the natural key for
/// idempotent writes is `code`, not this id.
///

#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[repr(transparent)]
pub struct UnitId(Ulid);

impl UnitId {
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new())
    }

    #[must_use]
    pub const fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_unique() {
        let a = UnitId::generate();
        let b = UnitId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_serde_round_trip() {
        let id = UnitId::generate();
        let json = serde_json::to_string(&id).unwrap();
        let back: UnitId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
