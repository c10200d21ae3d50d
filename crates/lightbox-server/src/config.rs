use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::{Duration, Utc};

use lightbox_api::session::MAX_SESSION_TTL_HOURS;

/// Sample `.env` secrets that are refused at startup.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me",
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub secret_key: String,
    pub db_path: PathBuf,
    pub session_dir: PathBuf,
    pub user_data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub session_ttl: Duration,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let secret_key = lookup("LIGHTBOX_SECRET_KEY").unwrap_or_default();
        if secret_key.trim().is_empty() || PLACEHOLDER_SECRETS.contains(&secret_key.as_str()) {
            bail!("LIGHTBOX_SECRET_KEY is unset or still a placeholder; set it in your .env file and restart");
        }

        let port = var("LIGHTBOX_PORT", "8050");
        let ttl = var("LIGHTBOX_SESSION_TTL_HOURS", "24");
        let max_upload = var("LIGHTBOX_MAX_UPLOAD_MB", "50");

        let ttl_hours: i64 = ttl
            .parse()
            .with_context(|| format!("LIGHTBOX_SESSION_TTL_HOURS={ttl} is not a number"))?;
        let session_ttl = session_ttl(ttl_hours)?;

        let max_upload_mb: usize = max_upload
            .parse()
            .with_context(|| format!("LIGHTBOX_MAX_UPLOAD_MB={max_upload} is not a number"))?;
        let max_upload_bytes = max_upload_mb
            .checked_mul(1024 * 1024)
            .with_context(|| format!("LIGHTBOX_MAX_UPLOAD_MB={max_upload} is too large"))?;

        Ok(Self {
            secret_key,
            db_path: var("LIGHTBOX_DB_PATH", "data/users.db").into(),
            session_dir: var("LIGHTBOX_SESSION_DIR", "data/sessions").into(),
            user_data_dir: var("LIGHTBOX_USER_DATA_DIR", "data/users").into(),
            host: var("LIGHTBOX_HOST", "0.0.0.0"),
            port: port
                .parse()
                .with_context(|| format!("LIGHTBOX_PORT={port} is not a port number"))?,
            session_ttl,
            max_upload_bytes,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

fn session_ttl(hours: i64) -> Result<Duration> {
    if !(1..=MAX_SESSION_TTL_HOURS).contains(&hours) {
        bail!("LIGHTBOX_SESSION_TTL_HOURS must be between 1 and {MAX_SESSION_TTL_HOURS}");
    }
    Duration::try_hours(hours)
        .filter(|ttl| Utc::now().checked_add_signed(*ttl).is_some())
        .with_context(|| format!("LIGHTBOX_SESSION_TTL_HOURS={hours} is out of range"))
}
