//! Engine configuration loading from config.toml
//!
//! This module loads the engine's policy knobs, the bill-numbering scheme and the restaurants
//! (with their tax rates and tables) that the binary seeds into the store. Every section is
//! optional; a missing file section falls back to the defaults below.

use crate::errors::{Error, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;

/// Default minimum length of a cancel reason after trimming.
pub const DEFAULT_CANCEL_REASON_MIN_LEN: usize = 3;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Order lifecycle policies
    pub engine: EngineSettings,
    /// Bill numbering
    pub billing: BillingSettings,
    /// Restaurants to seed
    pub restaurants: Vec<RestaurantConfig>,
}

/// What removing a line item does to an order's payment state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovalPaymentPolicy {
    /// Leave `paid_amount` and `payment_status` untouched; reconciled explicitly later
    #[default]
    Preserve,
    /// Clamp `paid_amount` to the new total and re-derive `payment_status`
    Recompute,
}

/// Order lifecycle policies
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Minimum trimmed length of a cancel reason
    pub cancel_reason_min_len: usize,
    /// Payment handling on item removal
    pub removal_payment_policy: RemovalPaymentPolicy,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            cancel_reason_min_len: DEFAULT_CANCEL_REASON_MIN_LEN,
            removal_payment_policy: RemovalPaymentPolicy::default(),
        }
    }
}

/// Which bill-numbering strategy the ledger uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberingScheme {
    /// Per-restaurant counter: `INV-<restaurant>-<000001>`
    #[default]
    Sequential,
    /// Date plus random suffix with a collision check: `INV-<yyyymmdd>-<XXXXXX>`
    Random,
}

/// Bill numbering settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BillingSettings {
    /// Strategy to use
    pub numbering: NumberingScheme,
    /// Prefix of every bill number
    pub prefix: String,
    /// Attempts before a random number collision is reported
    pub max_attempts: u32,
}

impl Default for BillingSettings {
    fn default() -> Self {
        Self {
            numbering: NumberingScheme::default(),
            prefix: "INV".to_string(),
            max_attempts: 8,
        }
    }
}

/// Configuration for a single restaurant to seed
#[derive(Debug, Deserialize, Clone)]
pub struct RestaurantConfig {
    /// Restaurant name; seeding is keyed on it
    pub name: String,
    /// GST rate in percent
    pub gst_rate_percent: Decimal,
    /// Dine-in service charge rate in percent
    pub service_rate_percent: Decimal,
    /// Table labels to create if missing
    #[serde(default)]
    pub tables: Vec<String>,
}

/// Loads the configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A field has the wrong type or a restaurant is missing required fields
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    parse_config(&contents)
}

/// Parses configuration from TOML text.
pub fn parse_config(contents: &str) -> Result<Config> {
    let config: Config = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;

    for restaurant in &config.restaurants {
        if restaurant.gst_rate_percent.is_sign_negative()
            || restaurant.service_rate_percent.is_sign_negative()
        {
            return Err(Error::Config {
                message: format!("Negative tax rate for restaurant '{}'", restaurant.name),
            });
        }
    }

    Ok(config)
}

/// Loads configuration from `ORDER_LEDGER_CONFIG`, or ./config.toml when unset.
///
/// A missing default file is not an error; defaults are used instead.
pub fn load_default_config() -> Result<Config> {
    if let Ok(path) = std::env::var("ORDER_LEDGER_CONFIG") {
        return load_config(path);
    }
    if Path::new("config.toml").exists() {
        load_config("config.toml")
    } else {
        Ok(Config::default())
    }
}
