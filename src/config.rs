use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context};
use tracing::info;

pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub reports_dir: PathBuf,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")
            .context("DATABASE_URL must be set to a Postgres instance")?;

        Ok(Self {
            database_url,
            max_connections: try_load("DATABASE_MAX_CONNECTIONS", "5")?,
            reports_dir: try_load("FEEDBACK_REPORTS_DIR", "reports")?,
        })
    }
}

fn try_load<T>(key: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    parse_setting(key, env::var(key).ok(), default)
}

fn parse_setting<T>(key: &str, raw: Option<String>, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let value = raw.unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    value
        .trim()
        .parse()
        .map_err(|e| anyhow!("invalid {key} value {value:?}: {e}"))
}
