#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for home valuation.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use unicorn_listing::valuation::{decode_location_suggestions, decode_property_value};
use unicorn_model::FileModelStore;
use unicorn_source::{ListingSource, RealEstateApi, ResponseCache, WalkScoreApi};
use unicorn_valuation::{
    HomeAdjustment, SessionPayloads, ValuationConfig, ValuationSession, fetch_payloads,
};
use unicorn_walkability::OfflineSource;

#[derive(Parser)]
#[command(name = "unicorn", about = "Home valuation from comparable listings")]
struct Cli {
    /// TOML file merged over the built-in defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Reference date for day deltas (YYYY-MM-DD). Defaults to today.
    #[arg(long, global = true)]
    today: Option<NaiveDate>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SessionArgs {
    /// Session file written by `fetch`
    #[arg(long)]
    session: PathBuf,
    /// Skip walkability scoring
    #[arg(long)]
    no_walkability: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the subject property and comparables, saving the raw payloads
    Fetch {
        /// Property id of the home to value
        property_id: String,
        /// Where to write the session
        #[arg(long, default_value = "session.json")]
        out: PathBuf,
    },
    /// Write the feature matrix for a session as CSV
    Features {
        #[command(flatten)]
        session: SessionArgs,
        /// Output file (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Train and store the price predictor for the session's city
    Train {
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Estimate the home's value, optionally with attribute changes
    Estimate {
        #[command(flatten)]
        session: SessionArgs,
        #[arg(long)]
        beds: Option<i64>,
        #[arg(long)]
        baths_full: Option<f64>,
        #[arg(long)]
        baths_3qtr: Option<f64>,
        #[arg(long)]
        baths_half: Option<f64>,
        #[arg(long)]
        baths_1qtr: Option<f64>,
        #[arg(long)]
        sqft: Option<i64>,
        #[arg(long)]
        lot_sqft: Option<i64>,
        #[arg(long)]
        garage: Option<i64>,
        #[arg(long)]
        stories: Option<i64>,
        #[arg(long)]
        year_built: Option<i64>,
        #[arg(long)]
        new_construction: Option<bool>,
    },
    /// Look up addresses matching free text
    Suggest {
        /// Address or place to search for
        input: String,
    },
    /// Show the market summary of a session or the value history of a home
    Market {
        #[arg(long)]
        session: Option<PathBuf>,
        #[arg(long)]
        property_id: Option<String>,
    },
}

#[allow(clippy::too_many_lines)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let config = ValuationConfig::load(cli.config.as_deref())?;
    let today = cli
        .today
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    match cli.command {
        Commands::Fetch { property_id, out } => {
            let source = listing_source(&config)?;
            let payloads = fetch_payloads(&source, &property_id, &config.search).await?;
            std::fs::write(&out, serde_json::to_string_pretty(&payloads)?)?;
            log::info!(
                "Saved {} comparable payloads to {}",
                payloads.listings.len(),
                out.display()
            );
        }
        Commands::Features { session, out } => {
            let session = open_session(&session, &config, today).await?;
            let matrix = session.feature_matrix();
            match out {
                Some(path) => matrix.write_csv(std::fs::File::create(&path)?)?,
                None => matrix.write_csv(std::io::stdout().lock())?,
            }
        }
        Commands::Train { session } => {
            let session = open_session(&session, &config, today).await?;
            let predictor = session.train_price_model(&config.model)?;
            unicorn_model::store::save_model(
                &FileModelStore::new(&config.store.model_dir),
                unicorn_model::ModelKind::PricePredictor,
                &session.model_key(),
                &predictor,
            )?;
            log::info!(
                "Trained price predictor for {} on {} comparables",
                session.model_key(),
                session.set().len()
            );
        }
        Commands::Estimate {
            session,
            beds,
            baths_full,
            baths_3qtr,
            baths_half,
            baths_1qtr,
            sqft,
            lot_sqft,
            garage,
            stories,
            year_built,
            new_construction,
        } => {
            let session = open_session(&session, &config, today).await?;
            let store = FileModelStore::new(&config.store.model_dir);
            let predictor = session.price_model(&config.model, &store)?;
            let adjustment = HomeAdjustment {
                beds,
                baths_full,
                baths_3qtr,
                baths_half,
                baths_1qtr,
                sqft,
                lot_sqft,
                garage,
                stories,
                year_built,
                new_construction,
            };
            let estimate = session.toggle(&predictor)?.estimate(&adjustment)?;
            println!("{}", serde_json::to_string_pretty(&estimate)?);
        }
        Commands::Suggest { input } => {
            let source = listing_source(&config)?;
            let suggestions = decode_location_suggestions(&source.suggest_locations(&input).await?);
            if suggestions.is_empty() {
                println!("No plausible locations for {input:?}");
            }
            for (i, suggestion) in suggestions.iter().enumerate() {
                println!(
                    "#{} {} ({})",
                    i + 1,
                    suggestion.full_address,
                    suggestion.property_id.as_deref().unwrap_or("-")
                );
            }
        }
        Commands::Market {
            session,
            property_id,
        } => {
            if let Some(path) = session {
                let payloads = read_payloads(&path)?;
                let session = ValuationSession::from_payloads(&payloads, &config, today)?;
                println!("{}", serde_json::to_string_pretty(session.geo())?);
            }
            if let Some(property_id) = property_id {
                let source = listing_source(&config)?;
                let valuation =
                    decode_property_value(&source.fetch_property_value(&property_id).await?)?;
                println!("{}", serde_json::to_string_pretty(&valuation)?);
            }
        }
    }

    Ok(())
}

fn listing_source(config: &ValuationConfig) -> Result<RealEstateApi, Box<dyn std::error::Error>> {
    let api = RealEstateApi::from_env()?;
    Ok(if config.source.cache_responses {
        api.with_cache(ResponseCache::new(&config.source.cache_dir))
    } else {
        api
    })
}

fn read_payloads(path: &Path) -> Result<SessionPayloads, Box<dyn std::error::Error>> {
    Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
}

async fn open_session(
    args: &SessionArgs,
    config: &ValuationConfig,
    today: NaiveDate,
) -> Result<ValuationSession, Box<dyn std::error::Error>> {
    let payloads = read_payloads(&args.session)?;
    let mut session = ValuationSession::from_payloads(&payloads, config, today)?;

    if args.no_walkability || !config.walkability.enabled {
        return Ok(session);
    }
    let store = FileModelStore::new(&config.store.model_dir);
    match WalkScoreApi::from_env() {
        Ok(api) => {
            let api = if config.source.cache_responses {
                api.with_cache(ResponseCache::new(&config.source.cache_dir))
            } else {
                api
            };
            session
                .score_walkability(&config.walkability, &api, &store)
                .await?;
        }
        Err(e) => {
            log::warn!("{e}, walk scores limited to a stored model or the fallback");
            let offline = OfflineSource::new(e.to_string());
            session
                .score_walkability(&config.walkability, &offline, &store)
                .await?;
        }
    }
    Ok(session)
}
