//! ---
//! msim_section: "01-core-functionality"
//! msim_subsection: "module"
//! msim_type: "source"
//! msim_scope: "code"
//! msim_description: "Configuration model for the Marketsim runtime."
//! msim_version: "v0.1.0"
//! msim_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use sha2::{Digest, Sha256};
use tracing::debug;
use url::Url;

use crate::logging::LogFormat;

fn default_base_url() -> Url {
    "http://127.0.0.1:5000/"
        .parse()
        .expect("valid default target url")
}

fn default_store_directory() -> PathBuf {
    PathBuf::from("target/sessions")
}

fn default_upvote_probability() -> f64 {
    0.5
}

fn default_sell_probability() -> f64 {
    0.05
}

fn default_buy_probability() -> f64 {
    0.2
}

fn default_min_price() -> u32 {
    10
}

fn default_max_price() -> u32 {
    100
}

fn default_min_quantity() -> u32 {
    1
}

fn default_max_quantity() -> u32 {
    10
}

fn default_fund_increment() -> u32 {
    1000
}

fn default_user_count() -> u32 {
    2
}

fn default_user_prefix() -> String {
    "usr".to_owned()
}

fn default_max_orders_placed() -> u32 {
    30
}

fn default_random_seed() -> u64 {
    0x5EEDu64
}

fn default_driver_endpoint() -> Url {
    "http://127.0.0.1:4444/"
        .parse()
        .expect("valid default driver endpoint")
}

fn default_navigation_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_receipt_directory() -> PathBuf {
    PathBuf::from("target/receipts")
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

/// Primary configuration object for the Marketsim runtime.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub behavior: BehaviorConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub driver: DriverConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "MARKETSIM_CONFIG";

    /// Load configuration from disk, respecting the `MARKETSIM_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: PathBuf) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.behavior.validate()?;
        self.simulation.validate()?;
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Target application surface the simulated shoppers exercise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(default = "default_base_url")]
    pub base_url: Url,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// Location of the per-user session records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_directory")]
    pub directory: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            directory: default_store_directory(),
        }
    }
}

/// Probabilities and bounds feeding the decision engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorConfig {
    /// Chance that any single upvote control is toggled.
    #[serde(default = "default_upvote_probability")]
    pub upvote_probability: f64,
    /// Chance that a catalog row is picked as a resale candidate.
    #[serde(default = "default_sell_probability")]
    pub sell_probability: f64,
    /// Chance that a catalog row is picked as a buy candidate.
    #[serde(default = "default_buy_probability")]
    pub buy_probability: f64,
    /// Inclusive lower bound for listing prices.
    #[serde(default = "default_min_price")]
    pub min_price: u32,
    /// Exclusive upper bound for listing prices.
    #[serde(default = "default_max_price")]
    pub max_price: u32,
    /// Inclusive lower bound for listing quantities.
    #[serde(default = "default_min_quantity")]
    pub min_quantity: u32,
    /// Exclusive upper bound for listing quantities.
    #[serde(default = "default_max_quantity")]
    pub max_quantity: u32,
    /// Fixed balance top-up submitted by each funding call.
    #[serde(default = "default_fund_increment")]
    pub fund_increment: u32,
}

impl BehaviorConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, p) in [
            ("upvote_probability", self.upvote_probability),
            ("sell_probability", self.sell_probability),
            ("buy_probability", self.buy_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(anyhow!("{} must be within [0, 1], got {}", name, p));
            }
        }
        if self.min_price >= self.max_price {
            return Err(anyhow!(
                "min_price {} must be below max_price {}",
                self.min_price,
                self.max_price
            ));
        }
        if self.min_quantity >= self.max_quantity {
            return Err(anyhow!(
                "min_quantity {} must be below max_quantity {}",
                self.min_quantity,
                self.max_quantity
            ));
        }
        if self.fund_increment == 0 {
            return Err(anyhow!("fund_increment must be nonzero"));
        }
        Ok(())
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            upvote_probability: default_upvote_probability(),
            sell_probability: default_sell_probability(),
            buy_probability: default_buy_probability(),
            min_price: default_min_price(),
            max_price: default_max_price(),
            min_quantity: default_min_quantity(),
            max_quantity: default_max_quantity(),
            fund_increment: default_fund_increment(),
        }
    }
}

/// Population shape and randomness source for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_user_count")]
    pub user_count: u32,
    #[serde(default = "default_user_prefix")]
    pub user_prefix: String,
    /// Upper bound (inclusive) on order repetitions drawn per user.
    #[serde(default = "default_max_orders_placed")]
    pub max_orders_placed: u32,
    #[serde(default = "default_random_seed")]
    pub random_seed: u64,
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.user_count == 0 {
            return Err(anyhow!("user_count must be at least 1"));
        }
        if self.max_orders_placed == 0 {
            return Err(anyhow!("max_orders_placed must be at least 1"));
        }
        if self.user_prefix.trim().is_empty() {
            return Err(anyhow!("user_prefix cannot be blank"));
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            user_count: default_user_count(),
            user_prefix: default_user_prefix(),
            max_orders_placed: default_max_orders_placed(),
            random_seed: default_random_seed(),
        }
    }
}

/// Connection settings for the automation backend.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// WebDriver endpoint the adapter talks to.
    #[serde(default = "default_driver_endpoint")]
    pub endpoint: Url,
    /// Upper bound on the post-click readiness poll.
    #[serde(default = "default_navigation_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub navigation_timeout: Duration,
    /// Directory receiving checkout receipt artifacts.
    #[serde(default = "default_receipt_directory")]
    pub receipt_dir: PathBuf,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            endpoint: default_driver_endpoint(),
            navigation_timeout: default_navigation_timeout(),
            receipt_dir: default_receipt_directory(),
        }
    }
}

/// Logging sink configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

/// Compute the deterministic SHA-256 hash of an effective configuration.
pub fn hash_app_config(config: &AppConfig) -> Result<String> {
    let serialised = toml::to_string(config)
        .with_context(|| "failed to serialise configuration for hashing")?;
    let mut hasher = Sha256::new();
    hasher.update(serialised.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.simulation.user_prefix, "usr");
        assert_eq!(config.behavior.fund_increment, 1000);
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let config: AppConfig = r#"
            [simulation]
            user_count = 5
            user_prefix = "shopper"

            [behavior]
            buy_probability = 1.0
        "#
        .parse()
        .unwrap();
        assert_eq!(config.simulation.user_count, 5);
        assert_eq!(config.simulation.user_prefix, "shopper");
        assert!((config.behavior.buy_probability - 1.0).abs() < f64::EPSILON);
        assert!((config.behavior.sell_probability - 0.05).abs() < f64::EPSILON);
        assert_eq!(config.target.base_url.as_str(), "http://127.0.0.1:5000/");
    }

    #[test]
    fn rejects_probability_out_of_range() {
        let result: std::result::Result<AppConfig, _> = r#"
            [behavior]
            buy_probability = 1.5
        "#
        .parse();
        assert!(result.is_err());
    }

    #[test]
    fn rejects_inverted_price_bounds() {
        let result: std::result::Result<AppConfig, _> = r#"
            [behavior]
            min_price = 100
            max_price = 10
        "#
        .parse();
        assert!(result.is_err());
    }

    #[test]
    fn hash_is_deterministic_and_sensitive() {
        let a = AppConfig::default();
        let mut b = AppConfig::default();
        assert_eq!(hash_app_config(&a).unwrap(), hash_app_config(&b).unwrap());
        b.simulation.user_count = 7;
        assert_ne!(hash_app_config(&a).unwrap(), hash_app_config(&b).unwrap());
    }

    #[test]
    fn load_with_source_walks_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("marketsim.toml");
        std::fs::write(&path, "[simulation]\nuser_count = 3\n").unwrap();
        let missing = dir.path().join("absent.toml");
        let loaded = AppConfig::load_with_source(&[missing, path.clone()]).unwrap();
        assert_eq!(loaded.source, path);
        assert_eq!(loaded.config.simulation.user_count, 3);
    }
}
