use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{QuizzyError, Result};

pub const DEFAULT_BASE_PATH: &str = "quizzy";

/// Default bound on a single socket write
pub const DEFAULT_SEND_TIMEOUT_MS: u64 = 5000;

/// Default number of queued outbound events per connection
pub const DEFAULT_OUTBOX_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub base_path: String,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub send_timeout: Duration,
    pub outbox_capacity: usize,
    /// Optional JSON seed of quizzes loaded at startup
    pub quiz_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            send_timeout: Duration::from_millis(DEFAULT_SEND_TIMEOUT_MS),
            outbox_capacity: DEFAULT_OUTBOX_CAPACITY,
            quiz_file: None,
        }
    }
}

impl Config {
    /// Loads configuration from the environment, reading `.env` first if present.
    ///
    /// Recognized variables:
    /// - `SERVER_HOST` / `SERVER_PORT`: bind address (default `0.0.0.0:8080`)
    /// - `QUIZZY_BASE_PATH`: single-segment route prefix (default `quizzy`)
    /// - `QUIZZY_SEND_TIMEOUT_MS`: per-write timeout (default 5000)
    /// - `QUIZZY_OUTBOX_CAPACITY`: queued events per connection (default 64)
    /// - `QUIZZY_QUIZ_FILE`: quiz seed file (optional)
    /// - `QUIZZY_LOG_FORMAT`: `pretty` or `json`
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let send_timeout_ms: u64 = parse_var("QUIZZY_SEND_TIMEOUT_MS", DEFAULT_SEND_TIMEOUT_MS)?;
        let outbox_capacity: usize = parse_var("QUIZZY_OUTBOX_CAPACITY", DEFAULT_OUTBOX_CAPACITY)?;
        if outbox_capacity == 0 {
            return Err(QuizzyError::InvalidConfiguration(
                "QUIZZY_OUTBOX_CAPACITY must be greater than zero".to_string(),
            ));
        }

        let base_path = env::var("QUIZZY_BASE_PATH")
            .ok()
            .map(|p| p.trim_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_PATH.to_string());
        if base_path.contains('/') {
            return Err(QuizzyError::InvalidConfiguration(format!(
                "QUIZZY_BASE_PATH must be a single path segment, got {:?}",
                base_path
            )));
        }

        let log_format = match env::var("QUIZZY_LOG_FORMAT") {
            Ok(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_var("SERVER_PORT", 8080)?,
                base_path,
            },
            session: SessionConfig {
                send_timeout: Duration::from_millis(send_timeout_ms),
                outbox_capacity,
                quiz_file: env::var("QUIZZY_QUIZ_FILE")
                    .ok()
                    .filter(|p| !p.is_empty())
                    .map(PathBuf::from),
            },
            log_format,
        })
    }

    pub fn bind_address(&self) -> ([u8; 4], u16) {
        let ip_addr = self.parse_host_to_ipv4();
        (ip_addr.octets(), self.server.port)
    }

    fn parse_host_to_ipv4(&self) -> Ipv4Addr {
        if let Ok(addr) = self.server.host.parse::<IpAddr>() {
            match addr {
                IpAddr::V4(ipv4) => return ipv4,
                IpAddr::V6(_) => {
                    tracing::warn!(
                        host = %self.server.host,
                        "IPv6 address provided but only IPv4 supported, using 0.0.0.0"
                    );
                    return Ipv4Addr::new(0, 0, 0, 0);
                }
            }
        }

        match self.server.host.as_str() {
            "localhost" => Ipv4Addr::new(127, 0, 0, 1),
            "" | "0.0.0.0" => Ipv4Addr::new(0, 0, 0, 0),
            _ => {
                tracing::warn!(
                    host = %self.server.host,
                    "Unable to parse host as IPv4, using 0.0.0.0"
                );
                Ipv4Addr::new(0, 0, 0, 0)
            }
        }
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|_| {
            QuizzyError::ConfigurationParseFailed(format!("{} has invalid value {:?}", name, raw))
        }),
        _ => Ok(default),
    }
}
