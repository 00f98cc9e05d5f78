use std::{net::SocketAddr, time::Duration};

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8088";

pub struct Config {
    pub listen_addr: SocketAddr,
    pub db_path: String,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let listen_addr = parse_listen_addr(std::env::var("LB_LISTEN_ADDR").ok());
        let db_path = std::env::var("LB_DB_PATH").unwrap_or_else(|_| "./db/loanbook.db".into());
        let cors_allow = std::env::var("LB_CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let timeout_ms: u64 = std::env::var("LB_REQUEST_TIMEOUT_MS")
            .unwrap_or_else(|_| "30000".into())
            .parse()
            .unwrap_or(30000);
        Self {
            listen_addr,
            db_path,
            cors_allow,
            request_timeout: Duration::from_millis(timeout_ms),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8088))
}

fn parse_listen_addr(raw: Option<String>) -> SocketAddr {
    match raw {
        None => default_listen_addr(),
        Some(value) => value.parse().unwrap_or_else(|_| {
            tracing::warn!(
                "Invalid LB_LISTEN_ADDR '{}', using {}",
                value,
                DEFAULT_LISTEN_ADDR
            );
            default_listen_addr()
        }),
    }
}
