/// Catalog seed loading from config.toml
pub mod catalog;

/// Database configuration and connection management
pub mod database;

/// Runtime settings read from the environment
pub mod settings;

pub use settings::AppConfig;
