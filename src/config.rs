//! Cart Configuration

use std::{fs, path::Path, time::Duration};

use jiff::SignedDuration;
use rust_decimal::Decimal;
use rusty_money::iso::Currency;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    persistence::MemoryStorage,
    prices::{PriceParseError, currency_for_code},
    reconcile::ReconcileSettings,
};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid YAML for [`CartConfig`].
    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// The configured currency is not supported.
    #[error(transparent)]
    Currency(#[from] PriceParseError),

    /// A value is out of range.
    #[error("invalid config value for {field}: {message}")]
    Invalid {
        /// Offending field
        field: &'static str,

        /// What is wrong with it
        message: String,
    },
}

/// Cart engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CartConfig {
    /// ISO code of the cart currency
    pub currency: String,

    /// Debounce window for saves, in milliseconds
    pub debounce_ms: u64,

    /// How long a validated line may reuse cached product data, in seconds
    pub freshness_window_secs: u64,

    /// Unit price drift, in minor units, that is not reported
    pub price_tolerance_minor: u32,

    /// Carts to evict when storage is full
    pub eviction_batch: usize,

    /// Byte quota for in-memory storage
    pub storage_quota_bytes: Option<usize>,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            currency: "INR".to_string(),
            debounce_ms: 500,
            freshness_window_secs: 300,
            price_tolerance_minor: 1,
            eviction_batch: 1,
            storage_quota_bytes: None,
        }
    }
}

impl CartConfig {
    /// Parse and validate YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or a value is invalid.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_norway::from_str(yaml)?;

        config.validate()?;

        Ok(config)
    }

    /// Load and validate a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or a value is invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_yaml(&fs::read_to_string(path)?)
    }

    /// Check every value is usable.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.currency()?;

        if self.debounce_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "debounce_ms",
                message: "must be at least 1".to_string(),
            });
        }

        if self.eviction_batch == 0 {
            return Err(ConfigError::Invalid {
                field: "eviction_batch",
                message: "must be at least 1".to_string(),
            });
        }

        if i64::try_from(self.freshness_window_secs).is_err() {
            return Err(ConfigError::Invalid {
                field: "freshness_window_secs",
                message: format!("{} is too large", self.freshness_window_secs),
            });
        }

        Ok(())
    }

    /// The cart currency.
    ///
    /// # Errors
    ///
    /// Returns an error if the currency is not supported.
    pub fn currency(&self) -> Result<&'static Currency, ConfigError> {
        Ok(currency_for_code(&self.currency)?)
    }

    /// Debounce window for saves.
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// In-memory storage limited to `storage_quota_bytes`, if set.
    #[must_use]
    pub fn memory_storage(&self) -> MemoryStorage {
        self.storage_quota_bytes
            .map_or_else(MemoryStorage::new, MemoryStorage::with_quota)
    }

    /// Reconciliation tuning.
    #[must_use]
    pub fn reconcile_settings(&self) -> ReconcileSettings {
        let window = i64::try_from(self.freshness_window_secs).unwrap_or(i64::MAX);

        ReconcileSettings {
            freshness_window: SignedDuration::from_secs(window),
            price_tolerance_minor: Decimal::from(self.price_tolerance_minor),
        }
    }
}
