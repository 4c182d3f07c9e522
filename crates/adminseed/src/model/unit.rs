use crate::{
    error::Error,
    model::{Level, UnitId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

///
/// RowMeta
///
/// Columns shared by every administrative unit table.
///
/// `id` is None until the store assigns one on insert. `code` is the natural
/// key for idempotent upsert and never changes once persisted; `name` may be
/// corrected on reseed, refreshing `updated_at`.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RowMeta {
    pub id: Option<UnitId>,
    pub code: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RowMeta {
    /// Prepared-row metadata: no id yet, provisional timestamps. The store
    /// is the authority for both on insert.
    #[must_use]
    pub fn prepared(code: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();

        Self {
            id: None,
            code: code.into(),
            name: name.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

///
/// AdminUnit
///
/// One persisted administrative unit type. `TABLE` and `LEVEL` are fixed per
/// type; everything else goes through the shared row metadata.
///

pub trait AdminUnit: Clone + std::fmt::Debug + Serialize + DeserializeOwned {
    const TABLE: &'static str;
    const LEVEL: Level;

    fn meta(&self) -> &RowMeta;
    fn meta_mut(&mut self) -> &mut RowMeta;

    fn code(&self) -> &str {
        &self.meta().code
    }

    fn name(&self) -> &str {
        &self.meta().name
    }

    fn id(&self) -> Option<UnitId> {
        self.meta().id
    }

    /// Id of a row that has been through the store. Absence means the row
    /// never went through `insert`, which is corruption at this layer.
    fn persisted_id(&self) -> Result<UnitId, Error> {
        self.meta().id.ok_or_else(|| {
            Error::store_corruption(format!(
                "{} row {} has no store-assigned id",
                Self::TABLE,
                self.meta().code
            ))
        })
    }
}

// Defines one unit entity: shared row metadata plus its parent reference
// columns, wired into the AdminUnit trait.
macro_rules! admin_unit {
    (
        ident = $ident:ident,
        level = $level:ident,
        $(doc = $doc:literal,)?
        parents = { $($(#[$pmeta:meta])? $pfield:ident: $pty:ty),* $(,)? }
    ) => {
        $(#[doc = $doc])?
        #[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
        pub struct $ident {
            #[serde(flatten)]
            pub meta: RowMeta,
            $($(#[$pmeta])? pub $pfield: $pty,)*
        }

        impl AdminUnit for $ident {
            const TABLE: &'static str = Level::$level.table();
            const LEVEL: Level = Level::$level;

            fn meta(&self) -> &RowMeta {
                &self.meta
            }

            fn meta_mut(&mut self) -> &mut RowMeta {
                &mut self.meta
            }
        }
    };
}

admin_unit! {
    ident = Country,
    level = Country,
    parents = {}
}

admin_unit! {
    ident = District,
    level = District,
    parents = { country_id: UnitId }
}

admin_unit! {
    ident = County,
    level = County,
    parents = { district_id: UnitId }
}

admin_unit! {
    ident = SubCounty,
    level = SubCounty,
    parents = { district_id: UnitId, county_id: UnitId }
}

admin_unit! {
    ident = Parish,
    level = Parish,
    parents = { sub_county_id: UnitId }
}

admin_unit! {
    ident = Village,
    level = Village,
    parents = { parish_id: UnitId }
}

admin_unit! {
    ident = Municipality,
    level = Municipality,
    parents = { district_id: UnitId, county_id: UnitId, sub_county_id: UnitId }
}

admin_unit! {
    ident = City,
    level = City,
    doc = "City overlay; links the full district/county/sub-county chain and, where one exists, its municipality.",
    parents = {
        district_id: UnitId,
        county_id: UnitId,
        sub_county_id: UnitId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        municipality_id: Option<UnitId>,
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepared_meta_has_no_id() {
        let meta = RowMeta::prepared("UG-KLA", "Kampala");
        assert!(meta.id.is_none());
        assert_eq!(meta.code, "UG-KLA");
        assert_eq!(meta.created_at, meta.updated_at);
    }

    #[test]
    fn test_persisted_id_rejects_prepared_rows() {
        let country = Country {
            meta: RowMeta::prepared("UG", "Uganda"),
        };
        assert!(country.persisted_id().is_err());
    }

    #[test]
    fn test_table_constants_match_levels() {
        assert_eq!(District::TABLE, "districts");
        assert_eq!(SubCounty::TABLE, "sub_counties");
        assert_eq!(City::LEVEL, Level::City);
    }

    #[test]
    fn test_city_serde_omits_absent_municipality() {
        let city = City {
            meta: RowMeta::prepared("UG-KBL-FPC", "Fort Portal City"),
            district_id: UnitId::generate(),
            county_id: UnitId::generate(),
            sub_county_id: UnitId::generate(),
            municipality_id: None,
        };
        let json = serde_json::to_value(&city).unwrap();
        assert!(json.get("municipality_id").is_none());
    }
}
