use derive_more::Display;
use std::str::FromStr;

///
/// Level
///
/// The administrative levels of the hierarchy, plus the City/Municipality
/// overlay entities. `SEED_ORDER` is the only valid processing order: each
/// level's resolver index must observe the fully committed rows of the
/// level before it.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Level {
    Country,
    District,
    County,
    SubCounty,
    Parish,
    Village,
    Municipality,
    City,
}

impl Level {
    /// Fixed dependency order for a full seeding run. Municipality precedes
    /// City so a city's optional municipality link can resolve.
    pub const SEED_ORDER: [Self; 8] = [
        Self::Country,
        Self::District,
        Self::County,
        Self::SubCounty,
        Self::Parish,
        Self::Village,
        Self::Municipality,
        Self::City,
    ];

    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Country => "countries",
            Self::District => "districts",
            Self::County => "counties",
            Self::SubCounty => "sub_counties",
            Self::Parish => "parishes",
            Self::Village => "villages",
            Self::Municipality => "municipalities",
            Self::City => "cities",
        }
    }

    /// Filler tokens stripped from this level's names during normalization.
    ///
    /// The active subset depends on the suffixes the source datasets actually
    /// attach at each level; parish and village names only ever carry
    /// parish/ward decorations.
    #[must_use]
    pub const fn filler_tokens(self) -> &'static [&'static str] {
        match self {
            Self::Country => &[],
            Self::District => &[
                "district",
                "municipality",
                "city",
                "tc",
                "towncounty",
                "town",
                "council",
            ],
            Self::County => &["county", "municipality", "tc", "towncounty", "town", "council"],
            Self::SubCounty => &[
                "subcounty",
                "tc",
                "towncounty",
                "town",
                "council",
                "division",
            ],
            Self::Parish | Self::Village => &["parish", "ward"],
            Self::Municipality => &["municipality", "tc", "towncounty", "town", "council"],
            Self::City => &["city", "municipality"],
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "country" => Ok(Self::Country),
            "district" => Ok(Self::District),
            "county" => Ok(Self::County),
            "subcounty" | "sub-county" | "sub_county" => Ok(Self::SubCounty),
            "parish" => Ok(Self::Parish),
            "village" => Ok(Self::Village),
            "municipality" => Ok(Self::Municipality),
            "city" => Ok(Self::City),
            other => Err(format!("unknown level: {other}")),
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
    fn test_seed_order_starts_at_country() {
        assert_eq!(Level::SEED_ORDER[0], Level::Country);
        assert_eq!(Level::SEED_ORDER.len(), 8);
    }

    #[test]
    fn test_municipality_precedes_city() {
        let mun = Level::SEED_ORDER
            .iter()
            .position(|l| *l == Level::Municipality)
            .unwrap();
        let city = Level::SEED_ORDER
            .iter()
            .position(|l| *l == Level::City)
            .unwrap();
        assert!(mun < city);
    }

    #[test]
    fn test_from_str_accepts_subcounty_spellings() {
        assert_eq!("sub-county".parse::<Level>().unwrap(), Level::SubCounty);
        assert_eq!("subcounty".parse::<Level>().unwrap(), Level::SubCounty);
        assert!("region".parse::<Level>().is_err());
    }

    #[test]
    fn test_village_tokens_are_parish_scoped() {
        assert_eq!(Level::Village.filler_tokens(), &["parish", "ward"]);
    }
}
