//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use std::collections::HashMap;

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `WEBHOOK_SECRET` (required): shared secret for verifying payment webhooks
/// - `PUBLIC_BASE_URL` (required): externally reachable base URL, used to build download links
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `ASSETS_DIR` (optional): directory holding deliverable files, defaults to `assets`
/// - `RESEND_API_KEY` (optional): email API key; when unset, emails are disabled and logged only
/// - `EMAIL_FROM` (optional): From address for customer emails
/// - `PRODUCT_KEY_MAP` (optional): JSON object mapping price/product ids to delivery paths,
///   e.g. `{"pri_01abc":"products/demo.zip"}`
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    pub webhook_secret: String,

    pub public_base_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_assets_dir")]
    pub assets_dir: String,

    #[serde(default)]
    pub resend_api_key: Option<String>,

    #[serde(default = "default_email_from")]
    pub email_from: String,

    #[serde(default)]
    pub product_key_map: Option<String>,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_assets_dir() -> String {
    "assets".to_string()
}

fn default_email_from() -> String {
    "Downloads <onboarding@resend.dev>".to_string()
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Parse environment variables into Config struct
        // Field names are automatically converted: database_url -> DATABASE_URL
        envy::from_env::<Config>()
    }

    /// Parse `PRODUCT_KEY_MAP` into the lookup table consumed by the key resolver.
    ///
    /// An unset variable yields an empty table. A set but malformed value is a
    /// configuration error and should abort startup.
    pub fn product_key_table(&self) -> Result<HashMap<String, String>, serde_json::Error> {
        match self.product_key_map.as_deref() {
            Some(raw) => serde_json::from_str(raw),
            None => Ok(HashMap::new()),
        }
    }
}
