//! Application settings, read from an optional `settings.toml` in the working
//! directory and overridden by `TALLY__<SECTION>__<KEY>` environment
//! variables (e.g. `TALLY__SERVER__PORT=8080`).
//!
//! ```toml
//! database = "memory"            # or { sqlite = "tally.db" }
//!
//! [app]
//! level = "info"
//!
//! [server]
//! bind = "0.0.0.0"
//! port = 3000
//!
//! [auth]
//! secret = "change-me-to-a-secret-of-at-least-32-chars"
//! token_ttl_minutes = 30
//!
//! [scheduler]
//! timezone = "Europe/Rome"
//! recurring_at = ["00:00"]
//! reminders_at = ["09:00", "18:00"]
//! ```

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    #[default]
    Memory,
    Sqlite(String),
}

impl Database {
    pub fn url(&self) -> String {
        match self {
            Database::Memory => String::from("sqlite::memory:"),
            Database::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct Auth {
    pub secret: String,
    #[serde(default = "default_ttl")]
    pub token_ttl_minutes: i64,
}

fn default_ttl() -> i64 {
    engine::DEFAULT_TOKEN_TTL_MINUTES
}

#[derive(Debug, Deserialize)]
pub struct Scheduler {
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_recurring_at")]
    pub recurring_at: Vec<String>,
    #[serde(default = "default_reminders_at")]
    pub reminders_at: Vec<String>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            recurring_at: default_recurring_at(),
            reminders_at: default_reminders_at(),
        }
    }
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_recurring_at() -> Vec<String> {
    vec!["00:00".to_string()]
}

fn default_reminders_at() -> Vec<String> {
    vec!["09:00".to_string(), "18:00".to_string()]
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    #[serde(default)]
    pub database: Database,
    pub server: Option<Server>,
    pub auth: Option<Auth>,
    #[serde(default)]
    pub scheduler: Scheduler,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings").required(false))
            .add_source(
                Environment::with_prefix("TALLY")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("scheduler.recurring_at")
                    .with_list_parse_key("scheduler.reminders_at")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}
