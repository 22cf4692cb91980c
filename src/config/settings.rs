//! Runtime settings for the service.
//!
//! Values come from environment variables (a `.env` file is loaded by `main`
//! beforehand). External API keys are optional here; the chatbot reports the
//! ones that are missing when it is called.

use super::database::DEFAULT_DATABASE_URL;
use crate::errors::{Error, Result};
use std::net::SocketAddr;
use tracing::{info, warn};

/// Credentials for the first administrator, created when the user table is empty.
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    /// Six-character institutional id
    pub institutional_id: String,
    /// Display name
    pub name: String,
    /// Institutional email
    pub email: String,
    /// Plain-text password, hashed before storage
    pub password: String,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `SeaORM` connection string
    pub database_url: String,
    /// Address the HTTP server listens on
    pub bind_addr: SocketAddr,
    /// Prefix for absolute image URLs (e.g., `https://cafeteria.example.edu`)
    pub public_base_url: String,
    /// Domain that user emails must belong to
    pub allowed_email_domain: String,
    /// Key for the chat completion API
    pub openai_api_key: Option<String>,
    /// Chat completion model name
    pub openai_model: String,
    /// Edamam application id
    pub edamam_app_id: Option<String>,
    /// Edamam application key
    pub edamam_app_key: Option<String>,
    /// Path of the optional catalog seed file
    pub catalog_path: String,
    /// Administrator to create on an empty database
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            public_base_url: String::new(),
            allowed_email_domain: "tecsup.edu.pe".to_string(),
            openai_api_key: None,
            openai_model: "gpt-3.5-turbo".to_string(),
            edamam_app_id: None,
            edamam_app_key: None,
            catalog_path: "config.toml".to_string(),
            bootstrap_admin: None,
        }
    }
}

/// Reads a variable, treating unset and blank values the same.
fn optional_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl AppConfig {
    /// Builds the configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let bind_addr = match optional_var("BIND_ADDR") {
            Some(raw) => raw.parse().map_err(|e| Error::Config {
                message: format!("Invalid BIND_ADDR '{raw}': {e}"),
            })?,
            None => defaults.bind_addr,
        };

        let bootstrap_admin = match (
            optional_var("ADMIN_INSTITUTIONAL_ID"),
            optional_var("ADMIN_NAME"),
            optional_var("ADMIN_EMAIL"),
            optional_var("ADMIN_PASSWORD"),
        ) {
            (Some(institutional_id), Some(name), Some(email), Some(password)) => {
                Some(BootstrapAdmin {
                    institutional_id,
                    name,
                    email,
                    password,
                })
            }
            (None, None, None, None) => None,
            _ => {
                warn!("Incomplete ADMIN_* settings; skipping administrator bootstrap");
                None
            }
        };

        let config = Self {
            database_url: optional_var("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_addr,
            public_base_url: optional_var("PUBLIC_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.public_base_url),
            allowed_email_domain: optional_var("ALLOWED_EMAIL_DOMAIN")
                .unwrap_or(defaults.allowed_email_domain),
            openai_api_key: optional_var("OPENAI_API_KEY"),
            openai_model: optional_var("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            edamam_app_id: optional_var("EDAMAM_APP_ID"),
            edamam_app_key: optional_var("EDAMAM_APP_KEY"),
            catalog_path: optional_var("CATALOG_CONFIG").unwrap_or(defaults.catalog_path),
            bootstrap_admin,
        };

        info!(
            bind_addr = %config.bind_addr,
            email_domain = %config.allowed_email_domain,
            chatbot_keys = config.missing_chatbot_keys().is_empty(),
            "Loaded application configuration"
        );
        Ok(config)
    }

    /// Names of the chatbot settings that are not configured.
    #[must_use]
    pub fn missing_chatbot_keys(&self) -> Vec<&'static str> {
        [
            ("OPENAI_API_KEY", &self.openai_api_key),
            ("EDAMAM_APP_ID", &self.edamam_app_id),
            ("EDAMAM_APP_KEY", &self.edamam_app_key),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| name)
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_chatbot_keys_lists_all_when_unset() {
        let config = AppConfig::default();
        assert_eq!(
            config.missing_chatbot_keys(),
            vec!["OPENAI_API_KEY", "EDAMAM_APP_ID", "EDAMAM_APP_KEY"]
        );
    }

    #[test]
    fn test_missing_chatbot_keys_partial() {
        let config = AppConfig {
            openai_api_key: Some("sk-test".to_string()),
            edamam_app_key: Some("key".to_string()),
            ..AppConfig::default()
        };
        assert_eq!(config.missing_chatbot_keys(), vec!["EDAMAM_APP_ID"]);
    }
}
