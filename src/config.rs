use std::{env, io, net::{SocketAddr, ToSocketAddrs as _}, path::PathBuf, time::Duration};

use chrono_tz::Tz;
use thiserror::Error;
use tracing::info;

use crate::{consts, upstream::N8nSettings, workdays::{HolidaySet, WeekendPolicy, WorkdayError}};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("`HOST_ADDRESS` is not in a valid format")]
    HostAddress(#[source] io::Error),
    #[error("unable to resolve host from `HOST_ADDRESS`")]
    UnresolvedHost,
    #[error("`TIMEZONE` is not a known IANA zone: {0}")]
    TimeZone(String),
    #[error("`{name}` is invalid")]
    Calendar { name: &'static str, #[source] source: WorkdayError },
    #[error("`{name}` must be a whole number, got `{value}`")]
    Number { name: &'static str, value: String },
}

pub struct Config {
    pub host_address: SocketAddr,

    pub time_zone: Tz,
    pub weekend: WeekendPolicy,
    pub holidays: HolidaySet,

    pub n8n: N8nSettings,
    pub callback_token: Option<String>,
    pub revalidate_interval: Duration,

    pub mock_dir: Option<PathBuf>,
    pub store_path: Option<PathBuf>,
}

pub fn load() -> Result<Config, ConfigError> {
    Ok(Config {
        host_address: load_host_address()?,
        time_zone: load_time_zone()?,
        weekend: load_weekend()?,
        holidays: load_holidays()?,
        n8n: N8nSettings {
            ingest_url: var("N8N_WEBHOOK_INGEST_URL"),
            snapshot_url: var("N8N_WEBHOOK_SNAPSHOT_URL"),
            timeout: load_millis("N8N_TIMEOUT_MS", consts::DEFAULT_UPSTREAM_TIMEOUT)?,
        },
        callback_token: var("N8N_CALLBACK_TOKEN"),
        revalidate_interval: load_secs("REVALIDATE_INTERVAL_SECS", consts::DEFAULT_REVALIDATE_INTERVAL)?,
        mock_dir: load_mock_dir(),
        store_path: load_store_path(),
    })
}

fn var(name: &str) -> Option<String> {
    info!("Loading environment `{name}`");

    env::var(name).ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn load_host_address() -> Result<SocketAddr, ConfigError> {
    let value = var("HOST_ADDRESS").unwrap_or_else(|| consts::DEFAULT_HOST_ADDRESS.to_string());

    value.to_socket_addrs()
        .map_err(ConfigError::HostAddress)?
        .next()
        .ok_or(ConfigError::UnresolvedHost)
}

fn load_time_zone() -> Result<Tz, ConfigError> {
    parse_time_zone(var("TIMEZONE").as_deref())
}

fn load_weekend() -> Result<WeekendPolicy, ConfigError> {
    var("WEEKEND_DAYS")
        .map(|v| v.parse().map_err(|source| ConfigError::Calendar { name: "WEEKEND_DAYS", source }))
        .unwrap_or_else(|| Ok(WeekendPolicy::default()))
}

fn load_holidays() -> Result<HolidaySet, ConfigError> {
    var("PUBLIC_HOLIDAYS")
        .map(|v| v.parse().map_err(|source| ConfigError::Calendar { name: "PUBLIC_HOLIDAYS", source }))
        .unwrap_or_else(|| Ok(HolidaySet::new()))
}

fn load_millis(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    parse_number(name, var(name)).map(|v| v.map(Duration::from_millis).unwrap_or(default))
}

fn load_secs(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    parse_number(name, var(name)).map(|v| v.map(Duration::from_secs).unwrap_or(default))
}

fn load_mock_dir() -> Option<PathBuf> {
    let enabled = var("MOCK").is_some_and(|v| v == "1");

    enabled.then(|| var("MOCK_DIR").unwrap_or_else(|| consts::DEFAULT_MOCK_DIR.to_string()).into())
}

/// `STORE_PATH=none` keeps the store in memory only
fn load_store_path() -> Option<PathBuf> {
    match var("STORE_PATH") {
        Some(v) if v.eq_ignore_ascii_case("none") => None,
        Some(v) => Some(v.into()),
        None => Some(consts::DEFAULT_STORE_PATH.into()),
    }
}

fn parse_time_zone(value: Option<&str>) -> Result<Tz, ConfigError> {
    let value = value.unwrap_or(consts::DEFAULT_TIMEZONE);

    value.parse().map_err(|_| ConfigError::TimeZone(value.to_string()))
}

fn parse_number(name: &'static str, value: Option<String>) -> Result<Option<u64>, ConfigError> {
    value
        .map(|v| v.parse().map_err(|_| ConfigError::Number { name, value: v }))
        .transpose()
}
