use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Routing service settings
#[derive(Debug, Clone)]
pub struct RoutingConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub origin_lat: f64,
    pub origin_lng: f64,
    /// 0 avoids highways as much as possible, 1 prefers them
    pub use_highways: f64,
    /// Refuse to start without an API key
    pub required: bool,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub discord_client_id: u64,
    pub routing: RoutingConfig,
    pub images_dir: PathBuf,
    pub http_timeout: Duration,
    pub debug_dump: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let discord_token = var("DISCORD_TOKEN").context("DISCORD_TOKEN must be set")?;
        let discord_client_id: u64 = var("DISCORD_CLIENT_ID")
            .context("DISCORD_CLIENT_ID must be set")?
            .trim()
            .parse()
            .context("DISCORD_CLIENT_ID must be a numeric id")?;
        if discord_client_id == 0 {
            bail!("DISCORD_CLIENT_ID must not be zero");
        }

        let routing = RoutingConfig {
            api_key: var("ROUTING_API_KEY"),
            endpoint: var("ROUTING_ENDPOINT")
                .unwrap_or_else(|| "https://api.stadiamaps.com/route/v1".to_string()),
            origin_lat: parse_or(&var, "ROUTING_ORIGIN_LAT", 48.8566)?,
            origin_lng: parse_or(&var, "ROUTING_ORIGIN_LNG", 2.3522)?,
            use_highways: parse_or(&var, "ROUTING_USE_HIGHWAYS", 0.3)?,
            required: parse_or(&var, "ROUTING_REQUIRED", false)?,
        };
        if !(0.0..=1.0).contains(&routing.use_highways) {
            bail!("ROUTING_USE_HIGHWAYS must be between 0 and 1");
        }
        if routing.required && routing.api_key.is_none() {
            bail!("ROUTING_API_KEY must be set when ROUTING_REQUIRED is true");
        }

        Ok(Self {
            discord_token,
            discord_client_id,
            routing,
            images_dir: var("LBC_IMAGES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./lbc-ads-images")),
            http_timeout: Duration::from_secs(parse_or(&var, "HTTP_TIMEOUT_SECS", 30)?),
            debug_dump: var("LBC_DEBUG_DUMP").map(PathBuf::from),
        })
    }
}

fn parse_or<T>(var: impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        None => Ok(default),
    }
}
