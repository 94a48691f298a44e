//! Server configuration from command-line flags and environment variables.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::events::DEFAULT_EVENT_BUFFER;

/// Storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DbDriver {
    /// PostgreSQL via `--database-url` or the `--db-*` flags.
    Postgres,
    /// In-process store; contents are lost on exit.
    Memory,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

/// Module update router configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "module-update-router")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Address to listen on for API requests
    #[arg(long, env = "ADDR", default_value = ":8080")]
    pub addr: String,

    /// Address to serve Prometheus metrics on
    #[arg(long, env = "MADDR", default_value = ":2112")]
    pub maddr: String,

    /// Path prefix for API roots
    #[arg(long, env = "PATH_PREFIX", default_value = "/api")]
    pub path_prefix: String,

    /// Application name used in API roots
    #[arg(long, env = "APP_NAME", default_value = "module-update-router")]
    pub app_name: String,

    /// API version used in API roots
    #[arg(long, env = "API_VERSION", default_value = "v1")]
    pub api_version: String,

    /// Database driver
    #[arg(long, env = "DB_DRIVER", value_enum, default_value_t = DbDriver::Memory)]
    pub db_driver: DbDriver,

    /// Database connection URL (overrides the --db-* flags)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// IP or hostname of database server
    #[arg(long, env = "DB_HOST", default_value = "localhost")]
    pub db_host: String,

    /// TCP port on database server
    #[arg(long, env = "DB_PORT", default_value_t = 5432)]
    pub db_port: u16,

    /// Database name
    #[arg(long, env = "DB_NAME", default_value = "postgres")]
    pub db_name: String,

    /// Database username
    #[arg(long, env = "DB_USER", default_value = "postgres")]
    pub db_user: String,

    /// Database user password
    #[arg(long, env = "DB_PASS", default_value = "")]
    pub db_pass: String,

    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Logging format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Number of accepted events buffered for relay (0 disables relaying)
    #[arg(long, env = "EVENT_BUFFER", default_value_t = DEFAULT_EVENT_BUFFER)]
    pub event_buffer: usize,

    /// SQL file loaded into the database at startup
    #[arg(long, env = "SEED_PATH")]
    pub seed_path: Option<PathBuf>,

    /// Drop and recreate all tables at startup
    #[arg(long, env = "RESET")]
    pub reset: bool,
}

impl Config {
    /// API roots: `<prefix>/<app>/<version>` and `<prefix>/<app>/<major>`.
    ///
    /// The two are the same for a bare major version such as `v1`.
    pub fn api_roots(&self) -> Vec<String> {
        let base = format!(
            "{}/{}",
            self.path_prefix.trim_end_matches('/'),
            self.app_name.trim_matches('/')
        );
        let major = self.api_version.split('.').next().unwrap_or_default();

        let mut roots = vec![format!("{}/{}", base, self.api_version)];
        let major_root = format!("{}/{}", base, major);
        if !roots.contains(&major_root) {
            roots.push(major_root);
        }
        roots
    }

    /// Database URL from `--database-url` or the individual `--db-*` flags.
    pub fn database_url(&self) -> String {
        match &self.database_url {
            Some(url) if !url.is_empty() => url.clone(),
            _ if self.db_pass.is_empty() => format!(
                "postgres://{}@{}:{}/{}",
                self.db_user, self.db_host, self.db_port, self.db_name
            ),
            _ => format!(
                "postgres://{}:{}@{}:{}/{}",
                self.db_user, self.db_pass, self.db_host, self.db_port, self.db_name
            ),
        }
    }

    /// Listen address, with `:port` expanded to all interfaces.
    pub fn listen_addr(&self) -> String {
        expand_addr(&self.addr)
    }

    /// Metrics address, with `:port` expanded to all interfaces.
    pub fn metrics_addr(&self) -> String {
        expand_addr(&self.maddr)
    }
}

fn expand_addr(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    }
}
