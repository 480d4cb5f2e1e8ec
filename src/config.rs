use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

pub const DEFAULT_FCM_BASE_URL: &str = "https://fcm.googleapis.com";
pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com";
pub const DEFAULT_SWEEP_SCHEDULE: &str = "0 */5 * * * *";

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub webhook_secret: String,
    pub firebase_project_id: String,
    pub google_credentials_path: Option<String>,
    pub fcm_base_url: String,
    pub identity_base_url: String,
    pub sweep_schedule: String,
    pub callable_rps: u32,
    pub events_rps: u32,
    pub json_logs: bool,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            jwt_secret: get_env("JWT_SECRET")?,
            webhook_secret: get_env("WEBHOOK_SECRET")?,
            firebase_project_id: get_env("FIREBASE_PROJECT_ID")?,
            google_credentials_path: env::var("GOOGLE_APPLICATION_CREDENTIALS").ok(),
            fcm_base_url: get_env_or("FCM_BASE_URL", DEFAULT_FCM_BASE_URL),
            identity_base_url: get_env_or("IDENTITY_BASE_URL", DEFAULT_IDENTITY_BASE_URL),
            sweep_schedule: get_env_or("SWEEP_SCHEDULE", DEFAULT_SWEEP_SCHEDULE),
            callable_rps: get_env_parse_or("CALLABLE_RPS", 20)?,
            events_rps: get_env_parse_or("EVENTS_RPS", 50)?,
            json_logs: env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

/// Loads the configuration once per process. Later calls are no-ops, so
/// every entry point (binary, tests) can call it unconditionally.
pub fn init_config() -> Result<()> {
    if CONFIG.get().is_some() {
        return Ok(());
    }
    let config = Config::from_env()?;
    // A concurrent initialiser may have won the race; either value came from
    // the same environment.
    let _ = CONFIG.set(config);
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
