/// Database configuration and connection management
pub mod database;

/// Engine, billing and seed configuration loading from config.toml
pub mod engine;

pub use engine::{
    BillingSettings, Config, EngineSettings, NumberingScheme, RemovalPaymentPolicy,
    RestaurantConfig, load_config, load_default_config, parse_config,
};
