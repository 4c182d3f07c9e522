//! Command-line front end for the seeding engine.
//!
//! Ships with embedded default datasets; any of them can be overridden per
//! file through `--data <dir>`. Exit code is 0 when the run completes (skips
//! included) and 1 on a fatal error.

use adminseed::prelude::*;
use clap::{Args, Parser, Subcommand};
use std::{path::PathBuf, process};
use tracing::{error, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt};

///
/// Cli
///

#[derive(Debug, Parser)]
#[command(name = "adminseed", version = adminseed::VERSION)]
#[command(about = "Seed an administrative-geography hierarchy into a store")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Seed every level in dependency order, or a single level.
    Seed(SeedArgs),

    /// Strip a trailing " District" from persisted district names.
    StripDistrictSuffix(StoreArgs),
}

#[derive(Args, Debug)]
struct StoreArgs {
    /// Store DSN: `memory:`, `file:<path>`, or a bare file path.
    #[arg(long, env = "DATABASE_URL", default_value = "file:adminseed.db.json")]
    database_url: String,
}

#[derive(Args, Debug)]
struct SeedArgs {
    #[command(flatten)]
    store: StoreArgs,

    /// Directory of dataset overrides; files not present there keep the
    /// embedded defaults.
    #[arg(long)]
    data: Option<PathBuf>,

    /// Seed a single level instead of the full run.
    #[arg(long)]
    level: Option<Level>,

    /// Rows per upsert statement.
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,
}

fn main() {
    init_logging();

    if let Err(err) = run(&Cli::parse()) {
        error!("{err}");
        process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().compact());

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn run(cli: &Cli) -> Result<(), Error> {
    match &cli.command {
        Command::Seed(args) => seed(args),
        Command::StripDistrictSuffix(store_args) => {
            let mut store = SeedStore::open(&store_args.database_url)?;
            let renamed = seed::strip_district_suffix(&mut store)?;
            println!("renamed {renamed} district(s)");

            Ok(())
        }
    }
}

fn seed(args: &SeedArgs) -> Result<(), Error> {
    let mut sources = embedded_sources();
    if let Some(dir) = &args.data {
        sources = sources.override_from_dir(dir)?;
    }
    let bundle = DatasetBundle::parse(&sources)?;

    let mut store = SeedStore::open(&args.store.database_url)?;
    let reports = match args.level {
        Some(level) => vec![seed::run_level(&mut store, &bundle, level, args.batch_size)?],
        None => seed::run_all(&mut store, &bundle, args.batch_size)?,
    };

    for report in &reports {
        println!("{report}");
        if !report.clean() {
            warn!(level = ?report.level, "level completed with skips or batch failures");
        }
    }

    Ok(())
}

/// Default datasets compiled into the binary.
fn embedded_sources() -> DatasetSources {
    DatasetSources {
        countries: include_str!("../datasets/countries.json").to_string(),
        districts: include_str!("../datasets/districts.json").to_string(),
        counties: include_str!("../datasets/counties.json").to_string(),
        sub_counties: include_str!("../datasets/sub_counties.json").to_string(),
        parishes: include_str!("../datasets/parishes.json").to_string(),
        villages: include_str!("../datasets/villages.json").to_string(),
        municipalities: include_str!("../datasets/municipalities.json").to_string(),
        cities: include_str!("../datasets/cities.json").to_string(),
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use adminseed::store::MemoryStore;

    #[test]
    fn test_embedded_datasets_parse() {
        let bundle = DatasetBundle::parse(&embedded_sources()).unwrap();
        assert_eq!(bundle.countries.len(), 1);
        assert_eq!(bundle.districts.len(), 15);
        assert_eq!(bundle.parishes.records.len(), 8);
    }

    #[test]
    fn test_embedded_full_run_is_clean() {
        let bundle = DatasetBundle::parse(&embedded_sources()).unwrap();
        let mut store = MemoryStore::default();

        let reports = seed::run_all(&mut store, &bundle, DEFAULT_BATCH_SIZE).unwrap();
        for report in &reports {
            assert!(report.clean(), "unexpected skips: {report}");
        }
        assert_eq!(reports.iter().map(|r| r.inserted).sum::<usize>(), 65);
    }

    #[test]
    fn test_seed_into_file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let dsn = format!("file:{}", dir.path().join("seed.db.json").display());
        let bundle = DatasetBundle::parse(&embedded_sources()).unwrap();

        let mut store = SeedStore::open(&dsn).unwrap();
        seed::run_all(&mut store, &bundle, DEFAULT_BATCH_SIZE).unwrap();
        drop(store);

        let mut reopened = SeedStore::open(&dsn).unwrap();
        let reports = seed::run_all(&mut reopened, &bundle, DEFAULT_BATCH_SIZE).unwrap();
        for report in &reports {
            assert_eq!(report.inserted, 0);
        }
    }
}
