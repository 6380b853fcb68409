// common/src/config.rs
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use config::{Config as ConfigFile, File, Environment};

/// Central configuration for the storefront
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: String,
    pub wallet: WalletConfig,
    pub checkout: CheckoutConfig,
    pub catalog: CatalogConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Key under which the "reconnect on next start" flag is stored
    pub autoconnect_key: String,
    /// File backing the flag store; in-memory when unset
    pub storage_path: Option<String>,
    pub simulated: SimulatedWalletConfig,
}

/// Settings for the in-process wallet used by the demo binary
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatedWalletConfig {
    pub installed: bool,
    pub accounts: Vec<String>,
    pub chain_id: String,
    /// Whether the accounts are already authorized for silent reconnects
    pub authorized: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutConfig {
    pub processing_delay_ms: u64,
    pub success_rate: f64,
    pub seed: Option<u64>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            wallet: WalletConfig::default(),
            checkout: CheckoutConfig::default(),
            catalog: CatalogConfig::default(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            autoconnect_key: "wallet_autoconnect".to_string(),
            storage_path: None,
            simulated: SimulatedWalletConfig::default(),
        }
    }
}

impl Default for SimulatedWalletConfig {
    fn default() -> Self {
        Self {
            installed: true,
            accounts: vec!["0x71C7656EC7ab88b098defB751B7401B5f6d8976F".to_string()],
            chain_id: "0x1".to_string(),
            authorized: false,
        }
    }
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            processing_delay_ms: 3000,
            success_rate: 0.9,
            seed: None,
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        // Get the run mode, defaulting to "development"
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        // Locate the config directory
        let config_dir = env::var("CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                // Check if we're in the project root or a subcrate
                let mut path = PathBuf::from("./config");
                if !path.exists() {
                    path = PathBuf::from("../config");
                }
                path
            });

        tracing::info!("Loading configuration from {}", config_dir.display());
        tracing::info!("Using run mode: {}", run_mode);

        let config = ConfigFile::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", run_mode))).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // APP__CHECKOUT__SUCCESS_RATE=0.5 and friends
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Load from files, falling back to plain environment variables
    pub fn from_env() -> Self {
        match Self::load() {
            Ok(config) => {
                tracing::info!("Configuration loaded from files and environment");
                config
            },
            Err(e) => {
                tracing::warn!("Failed to load configuration from files: {}", e);
                tracing::info!("Falling back to environment variables only");

                let defaults = Self::default();

                let log_level = env::var("LOG_LEVEL").unwrap_or(defaults.log_level);

                let autoconnect_key = env::var("WALLET_AUTOCONNECT_KEY")
                    .unwrap_or(defaults.wallet.autoconnect_key);

                let storage_path = env::var("WALLET_STORAGE_PATH").ok();

                let processing_delay_ms = env::var("CHECKOUT_PROCESSING_DELAY_MS")
                    .ok()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(defaults.checkout.processing_delay_ms);

                let success_rate = env::var("CHECKOUT_SUCCESS_RATE")
                    .ok()
                    .and_then(|v| v.parse::<f64>().ok())
                    .unwrap_or(defaults.checkout.success_rate);

                let seed = env::var("CHECKOUT_SEED")
                    .ok()
                    .and_then(|v| v.parse::<u64>().ok());

                let catalog_path = env::var("CATALOG_PATH").ok();

                Self {
                    log_level,
                    wallet: WalletConfig {
                        autoconnect_key,
                        storage_path,
                        simulated: defaults.wallet.simulated,
                    },
                    checkout: CheckoutConfig {
                        processing_delay_ms,
                        success_rate,
                        seed,
                    },
                    catalog: CatalogConfig {
                        path: catalog_path,
                    },
                }
            }
        }
    }
}
