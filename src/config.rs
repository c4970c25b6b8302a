use std::env;

use anyhow::{anyhow, Context, Result};
use chrono::FixedOffset;
use url::Url;

use crate::db::DEFAULT_MAX_POOL_SIZE;
use crate::timezone::parse_utc_offset;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_pool_size: u32,
    pub server_host: String,
    pub server_port: u16,
    pub app_base_url: String,
    pub session_expiry_days: i64,
    pub session_cookie_secure: bool,
    pub cors_allowed_origin: Option<String>,
    pub display_offset: FixedOffset,
    pub smtp: Option<SmtpConfig>,
}

#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub sender: String,
    pub bcc_recipients: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let database_max_pool_size = env::var("DATABASE_MAX_POOL_SIZE")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_MAX_POOL_SIZE);
        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .context("SERVER_PORT must be a valid u16")?;
        let app_base_url = env::var("APP_BASE_URL")
            .map(|value| value.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| format!("http://{server_host}:{server_port}"));
        let session_expiry_days = env::var("SESSION_EXPIRY_DAYS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .context("SESSION_EXPIRY_DAYS must be an integer")?;
        let session_cookie_secure = env::var("SESSION_COOKIE_SECURE")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let cors_allowed_origin = env::var("CORS_ALLOWED_ORIGIN").ok();
        let display_offset = parse_utc_offset(
            &env::var("DISPLAY_UTC_OFFSET").unwrap_or_else(|_| "-05:00".to_string()),
        )
        .map_err(|err| anyhow!("DISPLAY_UTC_OFFSET is invalid: {err}"))?;
        let smtp = SmtpConfig::from_env()?;

        Ok(Self {
            database_url,
            database_max_pool_size,
            server_host,
            server_port,
            app_base_url,
            session_expiry_days,
            session_cookie_secure,
            cors_allowed_origin,
            display_offset,
            smtp,
        })
    }

    pub fn redacted_database_url(&self) -> String {
        redact_database_url(&self.database_url)
    }
}

impl SmtpConfig {
    /// Returns `None` when `SMTP_HOST` is unset; outgoing mail is then only logged.
    fn from_env() -> Result<Option<Self>> {
        let host = match env::var("SMTP_HOST") {
            Ok(host) if !host.trim().is_empty() => host,
            _ => return Ok(None),
        };
        let port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse()
            .context("SMTP_PORT must be a valid u16")?;
        let username = env::var("SMTP_USER").unwrap_or_default();
        let password = env::var("SMTP_PASS").unwrap_or_default();
        let sender = env::var("SMTP_SENDER").context("SMTP_SENDER must be set with SMTP_HOST")?;
        let bcc_recipients = split_recipients(&env::var("SMTP_BCC_RECIPIENTS").unwrap_or_default());

        Ok(Some(Self {
            host,
            port,
            username,
            password,
            sender,
            bcc_recipients,
        }))
    }
}

fn split_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

fn redact_database_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut parsed) => {
            let _ = parsed.set_password(Some("*****"));
            parsed.to_string()
        }
        Err(_) => "***".to_string(),
    }
}
