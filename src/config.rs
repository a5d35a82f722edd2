use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub dashboard_url: String,
    pub screen_resolution: String,
    pub request_timeout_secs: u64,
    pub compiler_timeout_secs: u64,
    pub session_file: Option<String>,
    pub skip_fullscreen_check: bool,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            api_base_url: get_env("API_BASE_URL")?,
            dashboard_url: get_env("DASHBOARD_URL")?,
            screen_resolution: get_env("SCREEN_RESOLUTION")?,
            request_timeout_secs: get_env_parse("REQUEST_TIMEOUT_SECS")?,
            compiler_timeout_secs: get_env_parse("COMPILER_TIMEOUT_SECS")?,
            session_file: env::var("SESSION_FILE").ok(),
            skip_fullscreen_check: env::var("SKIP_FULLSCREEN_CHECK")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse<T>(name: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get_env(name)?;
    raw.parse()
        .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
