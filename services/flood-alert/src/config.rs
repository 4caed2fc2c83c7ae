//! flood-alert configuration.
//!
//! Loaded from `config/flood-alert.yaml`. Every field has a default, so an
//! empty file (or none at all) yields the Java-wide forecast setup. Secrets
//! are never read from the file: the Telegram token comes from
//! `TELEGRAM_BOT_TOKEN`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use areas::AdminLevel;
use chrono::NaiveDate;
use flood_common::{Extent, Resolution};
use hazard::{HmhewsWeights, Language, DEFAULT_CELL_THRESHOLD, DEFAULT_INDEX_SCALE};
use serde::{Deserialize, Serialize};
use sources::GfsCycle;

/// Environment variable holding the Telegram bot token.
pub const TELEGRAM_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

// ============================================================================
// Top level
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloodAlertConfig {
    /// Area of interest in degrees.
    #[serde(default = "default_extent")]
    pub extent: Extent,

    /// Cell size in degrees of the common grid.
    #[serde(default = "default_angular_resolution")]
    pub angular_resolution: f64,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub cadastre: CadastreConfig,

    #[serde(default)]
    pub weights: HmhewsWeights,

    #[serde(default)]
    pub forecast: ForecastConfig,

    #[serde(default)]
    pub notify: NotifyConfig,

    #[serde(default)]
    pub alert: AlertConfig,

    #[serde(default)]
    pub backtest: BacktestConfig,
}

impl Default for FloodAlertConfig {
    fn default() -> Self {
        Self {
            extent: default_extent(),
            angular_resolution: default_angular_resolution(),
            http: HttpConfig::default(),
            cadastre: CadastreConfig::default(),
            weights: HmhewsWeights::default(),
            forecast: ForecastConfig::default(),
            notify: NotifyConfig::default(),
            alert: AlertConfig::default(),
            backtest: BacktestConfig::default(),
        }
    }
}

impl FloodAlertConfig {
    /// Load the YAML file at `path`, or the defaults if it does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config = Self::from_yaml_str(&content).with_context(|| format!("Invalid config: {}", path.display()))?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to an empty map.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content).context("Failed to parse YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.angular_resolution.is_finite() && self.angular_resolution > 0.0) {
            bail!("angular_resolution must be positive, got {}", self.angular_resolution);
        }
        if self.http.timeout_secs == 0 {
            bail!("http.timeout_secs must be positive");
        }
        if let Some(buffer) = self.cadastre.buffer {
            if !(buffer.is_finite() && buffer >= 0.0) {
                bail!("cadastre.buffer must be non-negative, got {}", buffer);
            }
        }
        if self.notify.index_scale <= 0.0 {
            bail!("notify.index_scale must be positive, got {}", self.notify.index_scale);
        }
        if self.backtest.end < self.backtest.start {
            bail!(
                "backtest.end {} is before backtest.start {}",
                self.backtest.end,
                self.backtest.start
            );
        }
        if self.backtest.thresholds.is_empty() {
            bail!("backtest.thresholds must not be empty");
        }
        Ok(())
    }

    /// The extent snapped outward to the grid and the grid's dimensions.
    pub fn grid(&self) -> Result<(Extent, Resolution)> {
        let extent = self
            .extent
            .grow_to_resolution(self.angular_resolution)
            .context("Failed to align extent to the grid")?;
        let resolution =
            Resolution::from_angular(&extent, self.angular_resolution).context("Failed to derive grid resolution")?;
        Ok((extent, resolution))
    }

    /// Neighbour buffer for area resolution.
    pub fn buffer(&self) -> f64 {
        self.cadastre.buffer.unwrap_or_else(|| self.cadastre.level.default_buffer())
    }
}

fn default_extent() -> Extent {
    // Java plus the surrounding sea.
    Extent::new(104.52, 119.98, -9.97, -4.76).unwrap_or_else(|e| panic!("default extent is valid: {}", e))
}

fn default_angular_resolution() -> f64 {
    0.05
}

// ============================================================================
// HTTP and response cache
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// On-disk response cache; `null` disables caching.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: Option<PathBuf>,

    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            cache_dir: default_cache_dir(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

fn default_timeout_secs() -> u64 {
    sources::DEFAULT_TIMEOUT.as_secs()
}

fn default_cache_dir() -> Option<PathBuf> {
    Some(PathBuf::from(".cache/flood-alert"))
}

fn default_cache_ttl_secs() -> u64 {
    storage::DEFAULT_TTL.as_secs()
}

// ============================================================================
// Administrative boundaries
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CadastreConfig {
    /// Directory holding `gadm41_IDN_{level}.json`.
    #[serde(default = "default_cadastre_dir")]
    pub dir: PathBuf,

    /// GADM level reported in alerts (1, 2 or 3).
    #[serde(default = "default_cadastre_level")]
    pub level: AdminLevel,

    /// Neighbour distance in degrees; the level default when unset.
    #[serde(default)]
    pub buffer: Option<f64>,
}

impl Default for CadastreConfig {
    fn default() -> Self {
        Self {
            dir: default_cadastre_dir(),
            level: default_cadastre_level(),
            buffer: None,
        }
    }
}

fn default_cadastre_dir() -> PathBuf {
    PathBuf::from("data/gadm")
}

fn default_cadastre_level() -> AdminLevel {
    AdminLevel::SubDistrict
}

// ============================================================================
// Forecast run
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    #[serde(default = "default_cycle")]
    pub cycle: GfsCycle,

    /// Hours after the cycle start of the accumulation to use.
    #[serde(default = "default_hours_ahead")]
    pub hours_ahead: u32,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            cycle: default_cycle(),
            hours_ahead: default_hours_ahead(),
        }
    }
}

fn default_cycle() -> GfsCycle {
    GfsCycle::Z00
}

fn default_hours_ahead() -> u32 {
    3
}

// ============================================================================
// Notifiers
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Hazard cells at or above this value count as affected.
    #[serde(default = "default_cell_threshold")]
    pub cell_threshold: f32,

    /// Divisor turning the hazard maximum into a `[0,1]` scalar.
    #[serde(default = "default_index_scale")]
    pub index_scale: f32,

    /// Log affected areas on every run.
    #[serde(default = "default_true")]
    pub console: bool,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            cell_threshold: default_cell_threshold(),
            index_scale: default_index_scale(),
            console: true,
        }
    }
}

fn default_cell_threshold() -> f32 {
    DEFAULT_CELL_THRESHOLD
}

fn default_index_scale() -> f32 {
    DEFAULT_INDEX_SCALE
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Alert delivery
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    #[serde(default)]
    pub language: Language,

    #[serde(default)]
    pub backend: BackendConfig,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            language: Language::default(),
            backend: BackendConfig::Log,
        }
    }
}

/// Where alerts are delivered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    #[default]
    Log,
    Telegram {
        chat_id: String,
    },
    Webhook {
        url: String,
        #[serde(default)]
        group_id: Option<String>,
        #[serde(default)]
        phone_number: Option<String>,
    },
}

// ============================================================================
// Backtest
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// First day scored, inclusive.
    #[serde(default = "default_backtest_start")]
    pub start: NaiveDate,

    /// Last day scored, inclusive.
    #[serde(default = "default_backtest_end")]
    pub end: NaiveDate,

    /// Hazard cell thresholds to grid-search.
    #[serde(default = "default_thresholds")]
    pub thresholds: Vec<f32>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            start: default_backtest_start(),
            end: default_backtest_end(),
            thresholds: default_thresholds(),
        }
    }
}

fn default_backtest_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 1, 1).unwrap_or_default()
}

fn default_backtest_end() -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 12, 31).unwrap_or_default()
}

fn default_thresholds() -> Vec<f32> {
    vec![16.0, 20.0, 24.0, 28.0, 32.0, 36.0, 40.0]
}
