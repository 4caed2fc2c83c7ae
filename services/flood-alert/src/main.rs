//! Flood hazard alerting for Java, Indonesia.
//!
//! `run` fetches the current flood risk and forecast rain, computes the
//! H-MHEWS hazard index and notifies about affected areas. `backtest` scores
//! the historical variant of the index against DIBI flood events over a date
//! range and grid-searches the hazard cell threshold.

mod config;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use areas::{gadm_province_name, AdminLevel, CadastreStore, GadmLocationManager};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use event_store::{DibiClient, DibiEventStore, DisasterType, StoreQuery, BACKTEST_PROVINCES};
use hazard::{
    AlertBackend, AlertNotifier, Backtest, ConsoleAreaNotifier, DateRange, HistoricalPredictor,
    HmhewsFloodHazardIndex, HmhewsHistoricalFloodHazardIndex, LogBackend, Registry, TelegramBackend,
    WebhookBackend, HMHEWS_ID,
};
use sources::{BmkgSource, CachedHttpClient, ChirpsSource, GfsSource, InaRiskSource, Source};
use storage::ResponseCache;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use crate::config::{BackendConfig, FloodAlertConfig, TELEGRAM_TOKEN_ENV};

#[derive(Parser, Debug)]
#[command(name = "flood-alert")]
#[command(about = "Flood hazard alerts and backtests for Java, Indonesia")]
struct Args {
    /// Configuration file
    #[arg(long, env = "FLOOD_ALERT_CONFIG", default_value = "config/flood-alert.yaml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute the forecast hazard index and send alerts
    Run {
        /// Forecast date (defaults to today, UTC)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Score the historical hazard index against recorded flood events
    Backtest {
        /// First day scored (overrides the config)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last day scored, inclusive (overrides the config)
        #[arg(long)]
        end: Option<NaiveDate>,
    },
}

fn init_logging(level: &str, json: bool) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder().with_max_level(level).with_target(true);
    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before clap reads env-backed arguments.
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level, args.log_json)?;

    let config = FloodAlertConfig::load(&args.config)?;

    match args.command {
        Command::Run { date } => {
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            run_forecast(&config, date).await
        }
        Command::Backtest { start, end } => {
            let dates = DateRange::new(
                start.unwrap_or(config.backtest.start),
                end.unwrap_or(config.backtest.end),
            )?;
            run_backtest(&config, dates).await
        }
    }
}

async fn http_client(config: &FloodAlertConfig) -> Result<CachedHttpClient> {
    let cache = match &config.http.cache_dir {
        Some(dir) => {
            let cache = ResponseCache::open(dir, config.http.cache_ttl())
                .await
                .with_context(|| format!("Failed to open response cache at {}", dir.display()))?;
            Some(Arc::new(cache))
        }
        None => None,
    };
    Ok(CachedHttpClient::new(config.http.timeout(), cache)?)
}

fn alert_backend(config: &FloodAlertConfig) -> Result<Arc<dyn AlertBackend>> {
    let backend: Arc<dyn AlertBackend> = match &config.alert.backend {
        BackendConfig::Log => Arc::new(LogBackend),
        BackendConfig::Telegram { chat_id } => {
            let token = std::env::var(TELEGRAM_TOKEN_ENV)
                .with_context(|| format!("{} must be set for the telegram backend", TELEGRAM_TOKEN_ENV))?;
            Arc::new(TelegramBackend::new(token, chat_id.clone())?)
        }
        BackendConfig::Webhook {
            url,
            group_id,
            phone_number,
        } => Arc::new(WebhookBackend::new(url.clone(), group_id.clone(), phone_number.clone())?),
    };
    info!(backend = backend.name(), language = %config.alert.language, "Alert backend ready");
    Ok(backend)
}

async fn run_forecast(config: &FloodAlertConfig, date: NaiveDate) -> Result<()> {
    let (extent, resolution) = config.grid()?;
    info!(
        %date,
        cycle = %config.forecast.cycle,
        bbox = %extent.to_bbox_string(),
        %resolution,
        "Starting forecast run"
    );

    let http = http_client(config).await?;
    let areas = Arc::new(
        CadastreStore::load_dir(&config.cadastre.dir, config.cadastre.level)
            .context("Failed to load administrative boundaries")?
            .java(),
    );

    let mut registry = Registry::new();
    registry.register_source(Arc::new(InaRiskSource::flood(http.clone())));
    registry.register_source(Arc::new(GfsSource::new(
        http.clone(),
        date,
        config.forecast.cycle,
        config.forecast.hours_ahead,
    )));
    // Only fetched when an index asks for it.
    registry.register_source(Arc::new(BmkgSource::new(http.clone())));
    registry.register_hazard_index(Arc::new(HmhewsFloodHazardIndex::new(config.weights)));

    if config.notify.console {
        registry.register_notifier(Arc::new(
            ConsoleAreaNotifier::new(Arc::clone(&areas))
                .with_index(HMHEWS_ID)
                .with_threshold(config.notify.cell_threshold)
                .with_buffer(config.buffer()),
        ));
    }
    registry.register_notifier(Arc::new(
        AlertNotifier::new(Arc::clone(&areas), alert_backend(config)?)
            .with_index(HMHEWS_ID)
            .with_cell_threshold(config.notify.cell_threshold)
            .with_scale(config.notify.index_scale)
            .with_language(config.alert.language)
            .with_buffer(config.buffer()),
    ));

    let report = registry.run(&extent, resolution).await?;
    info!(
        sources = ?report.sources_fetched,
        indices = ?report.indices_computed,
        notifiers = ?report.notifiers_invoked,
        "Forecast run complete"
    );

    if let Some(cache) = http.cache() {
        let stats = cache.stats();
        info!(
            hits = stats.hits(),
            misses = stats.misses(),
            stale = stats.stale_served(),
            "Response cache"
        );
    }
    Ok(())
}

async fn run_backtest(config: &FloodAlertConfig, dates: DateRange) -> Result<()> {
    let (extent, resolution) = config.grid()?;
    info!(
        start = %dates.start(),
        end = %dates.end_inclusive(),
        days = dates.len(),
        thresholds = ?config.backtest.thresholds,
        "Starting backtest"
    );

    let province_keys: Vec<&str> = BACKTEST_PROVINCES.iter().map(|p| p.key()).collect();
    let province_names: Vec<&str> = province_keys.iter().filter_map(|k| gadm_province_name(k)).collect();

    // Events are recorded per district, so scoring happens at level 2.
    let districts = Arc::new(
        CadastreStore::load_dir(&config.cadastre.dir, AdminLevel::District)
            .context("Failed to load district boundaries")?
            .filter_provinces(&province_names),
    );
    let locations = GadmLocationManager::new(Arc::clone(&districts));
    let district_ids: BTreeSet<String> = locations.district_gid2s_in_provinces(&province_keys);
    if district_ids.is_empty() {
        warn!(dir = %config.cadastre.dir.display(), "No districts found for the backtest provinces");
    }

    let http = http_client(config).await?;
    let query = StoreQuery {
        provinces: BACKTEST_PROVINCES.to_vec(),
        years: dates.years(),
        disaster_types: vec![DisasterType::Flood],
    };
    let events = DibiEventStore::load(&DibiClient::new(http.clone()), &query, &locations)
        .await
        .context("Failed to load flood events")?;
    info!(events = events.len(), districts = district_ids.len(), "Loaded ground truth");

    let rain_client = http.clone();
    let predictor = HistoricalPredictor::new(
        Arc::new(InaRiskSource::flood(http.clone())),
        Box::new(move |date| Arc::new(ChirpsSource::new(rain_client.clone(), date)) as Arc<dyn Source>),
        Arc::clone(&districts),
        extent,
        resolution,
    )
    .with_index(HmhewsHistoricalFloodHazardIndex::new(config.weights));

    let backtest = Backtest::new(dates, &district_ids, &events);
    let search = backtest
        .grid_search(&config.backtest.thresholds, |date, threshold| {
            predictor.predict(date, threshold)
        })
        .await?;

    for (threshold, matrix) in &search.results {
        println!("Threshold {}:\n{}\n", threshold, matrix);
    }
    match search.best() {
        Some((threshold, matrix)) => {
            info!(threshold, f1 = matrix.f1(), "Best threshold");
            println!("Best threshold: {} (F1 {:.4})", threshold, matrix.f1());
        }
        None => warn!("No thresholds evaluated"),
    }
    Ok(())
}
