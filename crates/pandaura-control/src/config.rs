//! Configuration from the environment surface.
//!
//! Recognised variables each map to a documented key with a default;
//! unknown variables are ignored.

use std::path::PathBuf;

use smol_str::SmolStr;

/// Persistence profile selected by `NODE_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DbProfile {
    /// Development database, verbose logging defaults.
    #[default]
    Development,
    /// Production database.
    Production,
    /// Throwaway in-memory database.
    Test,
}

/// Resolved backend settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Listen port (`PORT`, default 5000).
    pub port: u16,
    /// Bind host (`PANDAURA_HOST`, default `127.0.0.1`).
    pub host: SmolStr,
    /// Directory for CSV exports (`CSV_OUTPUT_DIR`, default `./exports`).
    pub csv_output_dir: PathBuf,
    /// Log filter (`LOG_LEVEL`, default `info`).
    pub log_level: SmolStr,
    /// Live-sync interval in milliseconds (`SYNC_INTERVAL`, default 1000).
    pub sync_interval_ms: u64,
    /// Persistence profile (`NODE_ENV`, default development).
    pub db_profile: DbProfile,
    /// Database path (`DB_PATH`, default `./data/pandaura.db`).
    pub db_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: 5000,
            host: "127.0.0.1".into(),
            csv_output_dir: PathBuf::from("./exports"),
            log_level: "info".into(),
            sync_interval_ms: 1000,
            db_profile: DbProfile::Development,
            db_path: PathBuf::from("./data/pandaura.db"),
        }
    }
}

impl Settings {
    /// Read settings from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through a lookup function; tests inject maps.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();
        if let Some(port) = lookup("PORT").and_then(|v| v.parse().ok()) {
            settings.port = port;
        }
        if let Some(host) = lookup("PANDAURA_HOST") {
            settings.host = host.into();
        }
        if let Some(dir) = lookup("CSV_OUTPUT_DIR") {
            settings.csv_output_dir = PathBuf::from(dir);
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            settings.log_level = level.into();
        }
        if let Some(interval) = lookup("SYNC_INTERVAL").and_then(|v| v.parse().ok()) {
            settings.sync_interval_ms = interval;
        }
        if let Some(env) = lookup("NODE_ENV") {
            settings.db_profile = match env.as_str() {
                "production" => DbProfile::Production,
                "test" => DbProfile::Test,
                _ => DbProfile::Development,
            };
        }
        if let Some(path) = lookup("DB_PATH") {
            settings.db_path = PathBuf::from(path);
        }
        settings
    }

    /// Install a `tracing` fmt subscriber honouring the configured level.
    /// Safe to call more than once; later calls are no-ops.
    pub fn init_logging(&self) {
        let filter = tracing_subscriber::EnvFilter::try_new(self.log_level.as_str())
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init();
    }
}
