//! Server configuration loaded from environment variables.

use std::net::SocketAddr;

/// Runtime configuration. Every field has a usable default so a bare
/// `cargo run` starts a working server against a local database file.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to listen on.
    pub listen_addr: SocketAddr,
    /// sqlx connection string.
    pub database_url: String,
    /// Connection pool size.
    pub db_max_connections: u32,
    /// Session inactivity expiry in minutes.
    pub session_ttl_minutes: i64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen_addr: "0.0.0.0:8080".parse().unwrap(),
            database_url: "sqlite:parlor.db?mode=rwc".to_owned(),
            db_max_connections: 16,
            session_ttl_minutes: 60,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = dotenv::var("PARLOR_LISTEN_ADDR") {
            if let Ok(parsed) = addr.parse() {
                config.listen_addr = parsed;
            }
        }

        if let Ok(url) = dotenv::var("DATABASE_URL") {
            config.database_url = url;
        }

        if let Ok(val) = dotenv::var("PARLOR_DB_MAX_CONNECTIONS") {
            if let Ok(parsed) = val.parse() {
                config.db_max_connections = parsed;
            }
        }

        if let Ok(val) = dotenv::var("PARLOR_SESSION_TTL_MINUTES") {
            if let Ok(parsed) = val.parse() {
                config.session_ttl_minutes = parsed;
            }
        }

        config
    }
}
