use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Directory holding the durable session document.
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Loopback unless `APP_HOST` says otherwise.
    pub host: String,
    pub port: u16,
    /// Single origin allowed cross-origin access. `None` sends no CORS headers.
    pub cors_origin: Option<String>,
}

impl HttpConfig {
    fn from_vars(
        host: Option<String>,
        port: Option<String>,
        cors_origin: Option<String>,
    ) -> anyhow::Result<Self> {
        let port = match port {
            Some(p) => p
                .trim()
                .parse()
                .with_context(|| format!("APP_PORT is not a port: {p}"))?,
            None => DEFAULT_PORT,
        };
        Ok(Self {
            host: host.unwrap_or_else(|| DEFAULT_HOST.into()),
            port,
            cors_origin: cors_origin
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty()),
        })
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            cors_origin: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub session: SessionConfig,
    pub http: HttpConfig,
    /// Unverified password overwrite by email; see `SessionManager::request_password_reset`.
    pub password_reset_enabled: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let session = SessionConfig {
            dir: std::env::var("SESSION_DIR")
                .unwrap_or_else(|_| ".session".into())
                .into(),
        };
        let password_reset_enabled = std::env::var("PASSWORD_RESET_ENABLED")
            .ok()
            .and_then(|v| parse_flag(&v))
            .unwrap_or(true);
        let http = HttpConfig::from_vars(
            std::env::var("APP_HOST").ok(),
            std::env::var("APP_PORT").ok(),
            std::env::var("CORS_ALLOWED_ORIGIN").ok(),
        )?;
        Ok(Self {
            database_url,
            session,
            http,
            password_reset_enabled,
        })
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
