//! Typed parse boundary for the raw source datasets.
//!
//! Every level gets one explicit record type, validated right after parse.
//! A dataset that fails to parse or validate is fatal for the run; nothing
//! downstream ever sees an unchecked shape.

use crate::{error::Error, model::Level, resolve::SourceIdEntry};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::{fs, path::Path};

///
/// RawRecord
///
/// A dataset record type with its validating constructor.
///

pub trait RawRecord: DeserializeOwned {
    const LEVEL: Level;

    /// Value-or-error validation applied at the parse boundary.
    fn validated(self) -> Result<Self, String>
    where
        Self: Sized;
}

fn require(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("empty {field}"));
    }

    Ok(())
}

///
/// RawCountry
///
/// The root level is the only one whose codes come from the dataset itself.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct RawCountry {
    pub name: String,
    pub code: String,
}

impl RawRecord for RawCountry {
    const LEVEL: Level = Level::Country;

    fn validated(self) -> Result<Self, String> {
        require("name", &self.name)?;
        require("code", &self.code)?;

        Ok(self)
    }
}

///
/// RawDistrict
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct RawDistrict {
    pub name: String,
    /// Country name; records without one attach to the sole country row.
    #[serde(default)]
    pub country: Option<String>,
}

impl RawRecord for RawDistrict {
    const LEVEL: Level = Level::District;

    fn validated(self) -> Result<Self, String> {
        require("name", &self.name)?;

        Ok(self)
    }
}

///
/// RawCounty
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct RawCounty {
    pub name: String,
    pub district: String,
}

impl RawRecord for RawCounty {
    const LEVEL: Level = Level::County;

    fn validated(self) -> Result<Self, String> {
        require("name", &self.name)?;
        require("district", &self.district)?;

        Ok(self)
    }
}

///
/// RawSubCounty
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct RawSubCounty {
    pub name: String,
    pub district: String,
    /// County name where the dataset has one; otherwise the county is
    /// found through the resolved district.
    #[serde(default)]
    pub county: Option<String>,
}

impl RawRecord for RawSubCounty {
    const LEVEL: Level = Level::SubCounty;

    fn validated(self) -> Result<Self, String> {
        require("name", &self.name)?;
        require("district", &self.district)?;

        Ok(self)
    }
}

///
/// RawParish
///
/// Parishes reference their sub-county by a dataset-local id; the bundle
/// carries the id→name table alongside.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct RawParish {
    pub name: String,
    pub sub_county_id: String,
}

impl RawRecord for RawParish {
    const LEVEL: Level = Level::Parish;

    fn validated(self) -> Result<Self, String> {
        require("name", &self.name)?;
        require("sub_county_id", &self.sub_county_id)?;

        Ok(self)
    }
}

///
/// RawVillage
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct RawVillage {
    pub name: String,
    pub parish_id: String,
}

impl RawRecord for RawVillage {
    const LEVEL: Level = Level::Village;

    fn validated(self) -> Result<Self, String> {
        require("name", &self.name)?;
        require("parish_id", &self.parish_id)?;

        Ok(self)
    }
}

///
/// RawMunicipality
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct RawMunicipality {
    pub name: String,
    pub district: String,
    pub county: String,
    pub sub_county: String,
}

impl RawRecord for RawMunicipality {
    const LEVEL: Level = Level::Municipality;

    fn validated(self) -> Result<Self, String> {
        require("name", &self.name)?;
        require("district", &self.district)?;
        require("county", &self.county)?;
        require("sub_county", &self.sub_county)?;

        Ok(self)
    }
}

///
/// RawCity
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct RawCity {
    pub name: String,
    pub district: String,
    pub county: String,
    pub sub_county: String,
    #[serde(default)]
    pub municipality: Option<String>,
}

impl RawRecord for RawCity {
    const LEVEL: Level = Level::City;

    fn validated(self) -> Result<Self, String> {
        require("name", &self.name)?;
        require("district", &self.district)?;
        require("county", &self.county)?;
        require("sub_county", &self.sub_county)?;

        Ok(self)
    }
}

///
/// ParishDataset / VillageDataset
///
/// Levels whose parents arrive as dataset-local ids bundle the records with
/// the auxiliary id-mapping table.
///

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ParishDataset {
    pub records: Vec<RawParish>,
    pub sub_counties: Vec<SourceIdEntry>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct VillageDataset {
    pub records: Vec<RawVillage>,
    pub parishes: Vec<SourceIdEntry>,
}

///
/// DatasetSources
///
/// Raw JSON text per level, before parsing. The CLI seeds this from its
/// embedded defaults and overrides individual files from `--data <dir>`.
///

#[derive(Clone, Debug, Default)]
pub struct DatasetSources {
    pub countries: String,
    pub districts: String,
    pub counties: String,
    pub sub_counties: String,
    pub parishes: String,
    pub villages: String,
    pub municipalities: String,
    pub cities: String,
}

impl DatasetSources {
    /// File names looked up inside a `--data` directory.
    const FILE_NAMES: [&'static str; 8] = [
        "countries.json",
        "districts.json",
        "counties.json",
        "sub_counties.json",
        "parishes.json",
        "villages.json",
        "municipalities.json",
        "cities.json",
    ];

    fn slot(&mut self, file: &str) -> &mut String {
        match file {
            "countries.json" => &mut self.countries,
            "districts.json" => &mut self.districts,
            "counties.json" => &mut self.counties,
            "sub_counties.json" => &mut self.sub_counties,
            "parishes.json" => &mut self.parishes,
            "villages.json" => &mut self.villages,
            "municipalities.json" => &mut self.municipalities,
            _ => &mut self.cities,
        }
    }

    /// Replace any level whose file exists under `dir`; missing files keep
    /// the current (embedded) text.
    pub fn override_from_dir(mut self, dir: &Path) -> Result<Self, Error> {
        for file in Self::FILE_NAMES {
            let path = dir.join(file);
            if path.exists() {
                *self.slot(file) = fs::read_to_string(&path).map_err(|err| {
                    Error::dataset(format!("cannot read {}: {err}", path.display()))
                })?;
            }
        }

        Ok(self)
    }
}

///
/// DatasetBundle
///
/// Fully parsed and validated input for a whole run.
///

#[derive(Clone, Debug, Default)]
pub struct DatasetBundle {
    pub countries: Vec<RawCountry>,
    pub districts: Vec<RawDistrict>,
    pub counties: Vec<RawCounty>,
    pub sub_counties: Vec<RawSubCounty>,
    pub parishes: ParishDataset,
    pub villages: VillageDataset,
    pub municipalities: Vec<RawMunicipality>,
    pub cities: Vec<RawCity>,
}

impl DatasetBundle {
    pub fn parse(src: &DatasetSources) -> Result<Self, Error> {
        let parishes: ParishDataset = parse_json(Level::Parish, &src.parishes)?;
        let villages: VillageDataset = parse_json(Level::Village, &src.villages)?;

        Ok(Self {
            countries: parse_records(&src.countries)?,
            districts: parse_records(&src.districts)?,
            counties: parse_records(&src.counties)?,
            sub_counties: parse_records(&src.sub_counties)?,
            parishes: ParishDataset {
                records: validate_records(parishes.records)?,
                sub_counties: parishes.sub_counties,
            },
            villages: VillageDataset {
                records: validate_records(villages.records)?,
                parishes: villages.parishes,
            },
            municipalities: parse_records(&src.municipalities)?,
            cities: parse_records(&src.cities)?,
        })
    }
}

fn parse_json<T: DeserializeOwned>(level: Level, json: &str) -> Result<T, Error> {
    serde_json::from_str(json)
        .map_err(|err| Error::dataset(format!("{level} dataset does not parse: {err}")))
}

fn parse_records<T: RawRecord>(json: &str) -> Result<Vec<T>, Error> {
    let records: Vec<T> = parse_json(T::LEVEL, json)?;

    validate_records(records)
}

fn validate_records<T: RawRecord>(records: Vec<T>) -> Result<Vec<T>, Error> {
    records
        .into_iter()
        .enumerate()
        .map(|(idx, record)| {
            record.validated().map_err(|reason| {
                Error::dataset(format!("{} record {idx}: {reason}", T::LEVEL))
            })
        })
        .collect()
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_districts() {
        let records: Vec<RawDistrict> = parse_records(
            r#"[{"name": "Kabarole"}, {"name": "Kampala", "country": "Uganda"}]"#,
        )
        .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].country.as_deref(), Some("Uganda"));
    }

    #[test]
    fn test_empty_name_fails_validation() {
        let err = parse_records::<RawDistrict>(r#"[{"name": "  "}]"#).unwrap_err();
        assert_eq!(err.class, crate::error::ErrorClass::Dataset);
        assert!(err.message.contains("record 0"));
    }

    #[test]
    fn test_malformed_json_is_dataset_error() {
        let err = parse_records::<RawCounty>("[{").unwrap_err();
        assert_eq!(err.class, crate::error::ErrorClass::Dataset);
    }

    #[test]
    fn test_parish_dataset_carries_aux_table() {
        let json = r#"{
            "records": [{"name": "Kitumba", "sub_county_id": "SC01"}],
            "sub_counties": [{"id": "SC01", "name": "Busoro"}]
        }"#;
        let parsed: ParishDataset = parse_json(Level::Parish, json).unwrap();
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.sub_counties[0].id, "SC01");
    }

    #[test]
    fn test_override_from_dir_replaces_present_files_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("districts.json"), r#"[{"name": "Gulu"}]"#).unwrap();

        let src = DatasetSources {
            countries: "[]".to_string(),
            districts: r#"[{"name": "Kabarole"}]"#.to_string(),
            ..DatasetSources::default()
        };
        let merged = src.override_from_dir(dir.path()).unwrap();

        assert!(merged.districts.contains("Gulu"));
        assert_eq!(merged.countries, "[]");
    }
}
