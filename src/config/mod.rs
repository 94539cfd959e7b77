use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub enrich: EnrichConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// HTTP and per-run scraper settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Max offers per agency (destinations for Aratour, offer pages for Dari
    /// Tour). 0 means no limit.
    #[serde(default = "default_limit")]
    pub limit: usize,

    #[serde(default)]
    pub debug: bool,

    #[serde(default = "default_debug_dir")]
    pub debug_dir: PathBuf,

    /// Concurrent agency scrapers in `scrape` / `run`.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Raw Angel Travel dump re-processed by its scraper.
    #[serde(default = "default_angel_raw_path")]
    pub angel_raw_path: PathBuf,
}

/// Bohemia date enrichment
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnrichConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_browser_concurrency")]
    pub browser_concurrency: usize,

    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_batch_pause_ms")]
    pub batch_pause_ms: u64,

    /// Read ambiguous dot dates as MM.DD.
    #[serde(default)]
    pub dot_mmdd: bool,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

/// Where JSON artifacts are read and written
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_mappings_path")]
    pub mappings_path: PathBuf,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_timeout_secs() -> u64 {
    30
}
fn default_request_delay_ms() -> u64 {
    1000
}
fn default_jitter_ms() -> u64 {
    250
}
fn default_max_retries() -> u32 {
    3
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}
fn default_limit() -> usize {
    20
}
fn default_debug_dir() -> PathBuf {
    PathBuf::from("dev")
}
fn default_concurrency() -> usize {
    2
}
fn default_angel_raw_path() -> PathBuf {
    PathBuf::from("data/angel_travel_raw.json")
}
fn default_true() -> bool {
    true
}
fn default_batch_size() -> usize {
    50
}
fn default_browser_concurrency() -> usize {
    5
}
fn default_http_timeout_secs() -> u64 {
    12
}
fn default_batch_pause_ms() -> u64 {
    150
}
fn default_db_path() -> PathBuf {
    PathBuf::from("data/travel_offers.duckdb")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_mappings_path() -> PathBuf {
    PathBuf::from("config/destination_mappings.json")
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            request_delay_ms: default_request_delay_ms(),
            jitter_ms: default_jitter_ms(),
            max_retries: default_max_retries(),
            user_agent: default_user_agent(),
            limit: default_limit(),
            debug: false,
            debug_dir: default_debug_dir(),
            concurrency: default_concurrency(),
            angel_raw_path: default_angel_raw_path(),
        }
    }
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            batch_size: default_batch_size(),
            browser_concurrency: default_browser_concurrency(),
            http_timeout_secs: default_http_timeout_secs(),
            batch_pause_ms: default_batch_pause_ms(),
            dot_mmdd: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            mappings_path: default_mappings_path(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scraper: ScraperConfig::default(),
            enrich: EnrichConfig::default(),
            storage: StorageConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("TRAVEL").separator("__"))
            .build()?;

        let app_cfg: AppConfig = cfg.try_deserialize().unwrap_or_else(|e| {
            tracing::warn!("Invalid configuration, using defaults: {}", e);
            AppConfig::default()
        });
        Ok(app_cfg)
    }

    /// Path of a raw agency file inside the output dir.
    pub fn raw_path(&self, agency: crate::models::Agency) -> PathBuf {
        self.output.dir.join(agency.raw_file_name())
    }

    pub fn unified_path(&self) -> PathBuf {
        self.output.dir.join("unified_offers.json")
    }
}
