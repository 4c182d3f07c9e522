//! Level-by-level seeding.
//!
//! Each level run: load the parent level fresh from the store, build the
//! resolver index, preload used codes, map every raw record to a prepared
//! row or a diagnostic, partition once, then batch-upsert. A record that
//! already exists (under any normalized variant of its name) keeps its
//! persisted code, which is what makes reruns pure touch-updates.
//!
//! Levels run strictly in `Level::SEED_ORDER`; the store is re-read at the
//! start of each level so freshly committed rows are visible to the next.

use crate::{
    batch::upsert_in_chunks,
    codegen::{CodeError, CodeStyle, CodeSynthesizer},
    error::Error,
    model::{
        AdminUnit, City, Country, County, District, Level, Municipality, Parish, RowMeta,
        SubCounty, Village,
    },
    report::{Diagnostic, SeedReport, partition},
    resolve::ParentIndex,
    seed::dataset::{
        DatasetBundle, RawCity, RawCounty, RawDistrict, RawMunicipality, RawSubCounty,
    },
    store::Store,
};
use std::collections::BTreeMap;
use tracing::info;

/// Per-record outcome: a prepared row or the reason it was skipped.
type RecordOutcome<E> = Result<E, Diagnostic>;

/// Run every level in dependency order against `bundle`.
pub fn run_all<S: Store>(
    store: &mut S,
    bundle: &DatasetBundle,
    batch_size: usize,
) -> Result<Vec<SeedReport>, Error> {
    Level::SEED_ORDER
        .iter()
        .map(|level| run_level(store, bundle, *level, batch_size))
        .collect()
}

/// Run one level end-to-end. Completes (with skips in the report) unless a
/// required upstream level is entirely missing or the store itself fails.
pub fn run_level<S: Store>(
    store: &mut S,
    bundle: &DatasetBundle,
    level: Level,
    batch_size: usize,
) -> Result<SeedReport, Error> {
    match level {
        Level::Country => seed_countries(store, bundle, batch_size),
        Level::District => seed_districts(store, bundle, batch_size),
        Level::County => seed_counties(store, bundle, batch_size),
        Level::SubCounty => seed_sub_counties(store, bundle, batch_size),
        Level::Parish => seed_parishes(store, bundle, batch_size),
        Level::Village => seed_villages(store, bundle, batch_size),
        Level::Municipality => seed_municipalities(store, bundle, batch_size),
        Level::City => seed_cities(store, bundle, batch_size),
    }
}

// ======================================================================
// Shared plumbing
// ======================================================================

// Fresh index over a parent level that must already be populated.
fn load_required_index<P: AdminUnit, S: Store>(
    store: &S,
    child: Level,
) -> Result<ParentIndex<P>, Error> {
    let index = ParentIndex::build(store.select_all::<P>()?);

    if index.is_empty() {
        return Err(Error::fatal_precondition(format!(
            "no {} rows found; cannot seed {child}",
            P::LEVEL
        )));
    }

    Ok(index)
}

// Index over the level's own persisted rows, for code reuse on reruns.
fn load_existing_index<E: AdminUnit, S: Store>(store: &S) -> Result<ParentIndex<E>, Error> {
    Ok(ParentIndex::build(store.select_all::<E>()?))
}

// Used codes must cover everything persisted for the table before the run
// starts, so reruns never collide with historical data.
fn preload_codes<E: AdminUnit, S: Store>(store: &S) -> Result<CodeSynthesizer, Error> {
    let codes = store
        .select_all::<E>()?
        .into_iter()
        .map(|e| e.code().to_string());

    Ok(CodeSynthesizer::preloaded(codes))
}

// Reuse the persisted code when the record matches an existing row;
// synthesize a fresh one otherwise.
fn existing_or_generate<E: AdminUnit>(
    existing: &ParentIndex<E>,
    codes: &mut CodeSynthesizer,
    parent_code: &str,
    name: &str,
    style: CodeStyle,
) -> Result<String, CodeError> {
    if let Some(row) = existing.resolve(name) {
        return Ok(row.code().to_string());
    }

    codes.generate(parent_code, name, style)
}

fn code_diag(level: Level, name: &str, err: CodeError) -> Diagnostic {
    Diagnostic::code_synthesis(level, name, err)
}

fn finish_level<E: AdminUnit, S: Store>(
    store: &mut S,
    level: Level,
    prepared: Vec<E>,
    unresolved: Vec<Diagnostic>,
    batch_size: usize,
) -> SeedReport {
    let prepared_count = prepared.len();
    let outcome = upsert_in_chunks(store, prepared, batch_size);

    info!(
        %level,
        prepared = prepared_count,
        inserted = outcome.inserted,
        updated = outcome.updated,
        skipped = unresolved.len(),
        batch_failures = outcome.failures.len(),
        "level completed"
    );

    SeedReport {
        level: Some(level),
        prepared: prepared_count,
        inserted: outcome.inserted,
        updated: outcome.updated,
        unresolved,
        batch_failures: outcome.failures,
    }
}

// ======================================================================
// Country
// ======================================================================

fn seed_countries<S: Store>(
    store: &mut S,
    bundle: &DatasetBundle,
    batch_size: usize,
) -> Result<SeedReport, Error> {
    // Root level: codes come from the dataset itself, so idempotence needs
    // no name matching.
    let prepared: Vec<Country> = bundle
        .countries
        .iter()
        .map(|record| Country {
            meta: RowMeta::prepared(record.code.to_uppercase(), record.name.clone()),
        })
        .collect();

    Ok(finish_level(
        store,
        Level::Country,
        prepared,
        Vec::new(),
        batch_size,
    ))
}

// ======================================================================
// District
// ======================================================================

fn seed_districts<S: Store>(
    store: &mut S,
    bundle: &DatasetBundle,
    batch_size: usize,
) -> Result<SeedReport, Error> {
    let countries = load_required_index::<Country, S>(store, Level::District)?;
    let existing = load_existing_index::<District, S>(store)?;
    let mut codes = preload_codes::<District, S>(store)?;

    let mut results = Vec::with_capacity(bundle.districts.len());
    for record in &bundle.districts {
        results.push(prepare_district(record, &countries, &existing, &mut codes)?);
    }

    let (prepared, skipped) = partition(results);

    Ok(finish_level(store, Level::District, prepared, skipped, batch_size))
}

fn prepare_district(
    record: &RawDistrict,
    countries: &ParentIndex<Country>,
    existing: &ParentIndex<District>,
    codes: &mut CodeSynthesizer,
) -> Result<RecordOutcome<District>, Error> {
    let country = match &record.country {
        Some(raw) => match countries.resolve(raw) {
            Some(country) => country,
            None => {
                return Ok(Err(Diagnostic::unresolved_parent(
                    Level::District,
                    &record.name,
                    Level::Country,
                    raw,
                )));
            }
        },
        // Records without a country name attach to the sole root row.
        None => countries
            .first()
            .ok_or_else(|| Error::fatal_precondition("no Country row found"))?,
    };

    let code = match existing_or_generate(
        existing,
        codes,
        country.code(),
        &record.name,
        CodeStyle::Initials,
    ) {
        Ok(code) => code,
        Err(err) => return Ok(Err(code_diag(Level::District, &record.name, err))),
    };

    Ok(Ok(District {
        meta: RowMeta::prepared(code, record.name.clone()),
        country_id: country.persisted_id()?,
    }))
}

// ======================================================================
// County
// ======================================================================

fn seed_counties<S: Store>(
    store: &mut S,
    bundle: &DatasetBundle,
    batch_size: usize,
) -> Result<SeedReport, Error> {
    let districts = load_required_index::<District, S>(store, Level::County)?;
    let existing = load_existing_index::<County, S>(store)?;
    let mut codes = preload_codes::<County, S>(store)?;

    let mut results = Vec::with_capacity(bundle.counties.len());
    for record in &bundle.counties {
        results.push(prepare_county(record, &districts, &existing, &mut codes)?);
    }

    let (prepared, skipped) = partition(results);

    Ok(finish_level(store, Level::County, prepared, skipped, batch_size))
}

fn prepare_county(
    record: &RawCounty,
    districts: &ParentIndex<District>,
    existing: &ParentIndex<County>,
    codes: &mut CodeSynthesizer,
) -> Result<RecordOutcome<County>, Error> {
    let Some(district) = districts.resolve(&record.district) else {
        return Ok(Err(Diagnostic::unresolved_parent(
            Level::County,
            &record.name,
            Level::District,
            &record.district,
        )));
    };

    // County codes use a three-letter name prefix rather than initials.
    let code = match existing_or_generate(
        existing,
        codes,
        district.code(),
        &record.name,
        CodeStyle::Prefix3,
    ) {
        Ok(code) => code,
        Err(err) => return Ok(Err(code_diag(Level::County, &record.name, err))),
    };

    Ok(Ok(County {
        meta: RowMeta::prepared(code, record.name.clone()),
        district_id: district.persisted_id()?,
    }))
}

// ======================================================================
// SubCounty
// ======================================================================

fn seed_sub_counties<S: Store>(
    store: &mut S,
    bundle: &DatasetBundle,
    batch_size: usize,
) -> Result<SeedReport, Error> {
    let districts = load_required_index::<District, S>(store, Level::SubCounty)?;
    let counties = load_required_index::<County, S>(store, Level::SubCounty)?;
    let existing = load_existing_index::<SubCounty, S>(store)?;
    let mut codes = preload_codes::<SubCounty, S>(store)?;

    let mut results = Vec::with_capacity(bundle.sub_counties.len());
    for record in &bundle.sub_counties {
        results.push(prepare_sub_county(
            record, &districts, &counties, &existing, &mut codes,
        )?);
    }

    let (prepared, skipped) = partition(results);

    Ok(finish_level(store, Level::SubCounty, prepared, skipped, batch_size))
}

fn prepare_sub_county(
    record: &RawSubCounty,
    districts: &ParentIndex<District>,
    counties: &ParentIndex<County>,
    existing: &ParentIndex<SubCounty>,
    codes: &mut CodeSynthesizer,
) -> Result<RecordOutcome<SubCounty>, Error> {
    let Some(district) = districts.resolve(&record.district) else {
        return Ok(Err(Diagnostic::unresolved_parent(
            Level::SubCounty,
            &record.name,
            Level::District,
            &record.district,
        )));
    };
    let district_id = district.persisted_id()?;

    // County resolves independently; when the name misses (or the dataset
    // has none), fall back to the county whose parent is the resolved
    // district. The datasets carry at most one county per district, so the
    // fallback is unambiguous there.
    let county = record
        .county
        .as_deref()
        .and_then(|raw| counties.resolve(raw))
        .or_else(|| counties.find(|c| c.district_id == district_id));

    let Some(county) = county else {
        return Ok(Err(Diagnostic::unresolved_parent(
            Level::SubCounty,
            &record.name,
            Level::County,
            record.county.as_deref().unwrap_or("(via district)"),
        )));
    };

    let code = match existing_or_generate(
        existing,
        codes,
        district.code(),
        &record.name,
        CodeStyle::Initials,
    ) {
        Ok(code) => code,
        Err(err) => return Ok(Err(code_diag(Level::SubCounty, &record.name, err))),
    };

    Ok(Ok(SubCounty {
        meta: RowMeta::prepared(code, record.name.clone()),
        district_id,
        county_id: county.persisted_id()?,
    }))
}

// ======================================================================
// Parish / Village (parents referenced by dataset-local ids)
// ======================================================================

fn seed_parishes<S: Store>(
    store: &mut S,
    bundle: &DatasetBundle,
    batch_size: usize,
) -> Result<SeedReport, Error> {
    let mut sub_counties = load_required_index::<SubCounty, S>(store, Level::Parish)?;
    sub_counties.attach_source_ids(&bundle.parishes.sub_counties);
    let names = source_id_names(&bundle.parishes.sub_counties);

    let existing = load_existing_index::<Parish, S>(store)?;
    let mut codes = preload_codes::<Parish, S>(store)?;

    let mut results = Vec::with_capacity(bundle.parishes.records.len());
    for record in &bundle.parishes.records {
        let parent = resolve_by_source_id(
            &sub_counties,
            &names,
            &record.sub_county_id,
        );

        let outcome = match parent {
            Some(sub_county) => {
                match existing_or_generate(
                    &existing,
                    &mut codes,
                    sub_county.code(),
                    &record.name,
                    CodeStyle::Initials,
                ) {
                    Ok(code) => Ok(Parish {
                        meta: RowMeta::prepared(code, record.name.clone()),
                        sub_county_id: sub_county.persisted_id()?,
                    }),
                    Err(err) => Err(code_diag(Level::Parish, &record.name, err)),
                }
            }
            None => Err(Diagnostic::UnresolvedParentId {
                child_level: Level::Parish,
                child: record.name.clone(),
                parent_level: Level::SubCounty,
                source_id: record.sub_county_id.clone(),
            }),
        };
        results.push(outcome);
    }

    let (prepared, skipped) = partition(results);

    Ok(finish_level(store, Level::Parish, prepared, skipped, batch_size))
}

fn seed_villages<S: Store>(
    store: &mut S,
    bundle: &DatasetBundle,
    batch_size: usize,
) -> Result<SeedReport, Error> {
    let mut parishes = load_required_index::<Parish, S>(store, Level::Village)?;
    parishes.attach_source_ids(&bundle.villages.parishes);
    let names = source_id_names(&bundle.villages.parishes);

    let existing = load_existing_index::<Village, S>(store)?;
    let mut codes = preload_codes::<Village, S>(store)?;

    let mut results = Vec::with_capacity(bundle.villages.records.len());
    for record in &bundle.villages.records {
        let parent = resolve_by_source_id(&parishes, &names, &record.parish_id);

        let outcome = match parent {
            Some(parish) => {
                match existing_or_generate(
                    &existing,
                    &mut codes,
                    parish.code(),
                    &record.name,
                    CodeStyle::Initials,
                ) {
                    Ok(code) => Ok(Village {
                        meta: RowMeta::prepared(code, record.name.clone()),
                        parish_id: parish.persisted_id()?,
                    }),
                    Err(err) => Err(code_diag(Level::Village, &record.name, err)),
                }
            }
            None => Err(Diagnostic::UnresolvedParentId {
                child_level: Level::Village,
                child: record.name.clone(),
                parent_level: Level::Parish,
                source_id: record.parish_id.clone(),
            }),
        };
        results.push(outcome);
    }

    let (prepared, skipped) = partition(results);

    Ok(finish_level(store, Level::Village, prepared, skipped, batch_size))
}

fn source_id_names(
    mapping: &[crate::resolve::SourceIdEntry],
) -> BTreeMap<&str, &str> {
    mapping
        .iter()
        .map(|entry| (entry.id.as_str(), entry.name.as_str()))
        .collect()
}

// Id -> name pre-pass through the auxiliary table, then normalized name
// resolution; the secondary source-id index is the fallback.
fn resolve_by_source_id<'a, E: AdminUnit>(
    index: &'a ParentIndex<E>,
    names: &BTreeMap<&str, &str>,
    source_id: &str,
) -> Option<&'a E> {
    names
        .get(source_id)
        .and_then(|name| index.resolve(name))
        .or_else(|| index.resolve_source_id(source_id))
}

// ======================================================================
// Municipality / City overlays
// ======================================================================

fn seed_municipalities<S: Store>(
    store: &mut S,
    bundle: &DatasetBundle,
    batch_size: usize,
) -> Result<SeedReport, Error> {
    let districts = load_required_index::<District, S>(store, Level::Municipality)?;
    let counties = load_required_index::<County, S>(store, Level::Municipality)?;
    let sub_counties = load_required_index::<SubCounty, S>(store, Level::Municipality)?;
    let existing = load_existing_index::<Municipality, S>(store)?;
    let mut codes = preload_codes::<Municipality, S>(store)?;

    let mut results = Vec::with_capacity(bundle.municipalities.len());
    for record in &bundle.municipalities {
        results.push(prepare_municipality(
            record,
            &districts,
            &counties,
            &sub_counties,
            &existing,
            &mut codes,
        )?);
    }

    let (prepared, skipped) = partition(results);

    Ok(finish_level(store, Level::Municipality, prepared, skipped, batch_size))
}

fn prepare_municipality(
    record: &RawMunicipality,
    districts: &ParentIndex<District>,
    counties: &ParentIndex<County>,
    sub_counties: &ParentIndex<SubCounty>,
    existing: &ParentIndex<Municipality>,
    codes: &mut CodeSynthesizer,
) -> Result<RecordOutcome<Municipality>, Error> {
    let Some(district) = districts.resolve(&record.district) else {
        return Ok(Err(Diagnostic::unresolved_parent(
            Level::Municipality,
            &record.name,
            Level::District,
            &record.district,
        )));
    };
    let Some(county) = counties.resolve(&record.county) else {
        return Ok(Err(Diagnostic::unresolved_parent(
            Level::Municipality,
            &record.name,
            Level::County,
            &record.county,
        )));
    };
    let Some(sub_county) = sub_counties.resolve(&record.sub_county) else {
        return Ok(Err(Diagnostic::unresolved_parent(
            Level::Municipality,
            &record.name,
            Level::SubCounty,
            &record.sub_county,
        )));
    };

    let code = match existing_or_generate(
        existing,
        codes,
        district.code(),
        &record.name,
        CodeStyle::Initials,
    ) {
        Ok(code) => code,
        Err(err) => return Ok(Err(code_diag(Level::Municipality, &record.name, err))),
    };

    Ok(Ok(Municipality {
        meta: RowMeta::prepared(code, record.name.clone()),
        district_id: district.persisted_id()?,
        county_id: county.persisted_id()?,
        sub_county_id: sub_county.persisted_id()?,
    }))
}

fn seed_cities<S: Store>(
    store: &mut S,
    bundle: &DatasetBundle,
    batch_size: usize,
) -> Result<SeedReport, Error> {
    let districts = load_required_index::<District, S>(store, Level::City)?;
    let counties = load_required_index::<County, S>(store, Level::City)?;
    let sub_counties = load_required_index::<SubCounty, S>(store, Level::City)?;
    // Municipalities are optional parents; an empty index is fine.
    let municipalities = load_existing_index::<Municipality, S>(store)?;
    let existing = load_existing_index::<City, S>(store)?;
    let mut codes = preload_codes::<City, S>(store)?;

    let mut results = Vec::with_capacity(bundle.cities.len());
    for record in &bundle.cities {
        results.push(prepare_city(
            record,
            &districts,
            &counties,
            &sub_counties,
            &municipalities,
            &existing,
            &mut codes,
        )?);
    }

    let (prepared, skipped) = partition(results);

    Ok(finish_level(store, Level::City, prepared, skipped, batch_size))
}

#[allow(clippy::too_many_arguments)]
fn prepare_city(
    record: &RawCity,
    districts: &ParentIndex<District>,
    counties: &ParentIndex<County>,
    sub_counties: &ParentIndex<SubCounty>,
    municipalities: &ParentIndex<Municipality>,
    existing: &ParentIndex<City>,
    codes: &mut CodeSynthesizer,
) -> Result<RecordOutcome<City>, Error> {
    let Some(district) = districts.resolve(&record.district) else {
        return Ok(Err(Diagnostic::unresolved_parent(
            Level::City,
            &record.name,
            Level::District,
            &record.district,
        )));
    };
    let Some(county) = counties.resolve(&record.county) else {
        return Ok(Err(Diagnostic::unresolved_parent(
            Level::City,
            &record.name,
            Level::County,
            &record.county,
        )));
    };
    let Some(sub_county) = sub_counties.resolve(&record.sub_county) else {
        return Ok(Err(Diagnostic::unresolved_parent(
            Level::City,
            &record.name,
            Level::SubCounty,
            &record.sub_county,
        )));
    };

    // The municipality link is optional, but a named one that does not
    // resolve rejects the record rather than persisting a dangling link.
    let municipality_id = match &record.municipality {
        Some(raw) => match municipalities.resolve(raw) {
            Some(municipality) => Some(municipality.persisted_id()?),
            None => {
                return Ok(Err(Diagnostic::unresolved_parent(
                    Level::City,
                    &record.name,
                    Level::Municipality,
                    raw,
                )));
            }
        },
        None => None,
    };

    let code = match existing_or_generate(
        existing,
        codes,
        district.code(),
        &record.name,
        CodeStyle::Initials,
    ) {
        Ok(code) => code,
        Err(err) => return Ok(Err(code_diag(Level::City, &record.name, err))),
    };

    Ok(Ok(City {
        meta: RowMeta::prepared(code, record.name.clone()),
        district_id: district.persisted_id()?,
        county_id: county.persisted_id()?,
        sub_county_id: sub_county.persisted_id()?,
        municipality_id,
    }))
}

// ======================================================================
// Maintenance
// ======================================================================

/// Strip a trailing " District" from district display names. Codes and ids
/// are untouched; this is a plain name correction applied through the same
/// idempotent upsert path.
pub fn strip_district_suffix<S: Store>(store: &mut S) -> Result<usize, Error> {
    let districts = store.select_all::<District>()?;

    let renamed: Vec<District> = districts
        .into_iter()
        .filter_map(|mut district| {
            let stripped = district
                .name()
                .strip_suffix(" District")
                .or_else(|| district.name().strip_suffix(" district"))
                .map(str::trim_end)
                .filter(|name| !name.is_empty())
                .map(ToString::to_string)?;

            district.meta_mut().name = stripped;
            Some(district)
        })
        .collect();

    if renamed.is_empty() {
        return Ok(0);
    }

    let count = renamed.len();
    let outcome = upsert_in_chunks(store, renamed, crate::batch::DEFAULT_BATCH_SIZE);
    if let Some(failure) = outcome.failures.first() {
        return Err(Error::store(failure.to_string()));
    }

    Ok(count)
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
