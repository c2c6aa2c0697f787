use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "clinic-intake";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;
const DATABASE_FILE: &str = "clinic.db";

/// Variable holding the tracing filter; `RUST_LOG` is the fallback.
pub const LOG_FILTER_VAR: &str = "CLINIC_LOG";

/// Filter used when neither `CLINIC_LOG` nor `RUST_LOG` is set.
pub fn default_log_filter() -> &'static str {
    "clinic_intake=info,tower_http=info"
}

/// Directory holding the database when no explicit path is configured.
/// Falls back to the working directory on systems without a data dir.
pub fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_NAME))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Runtime settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub store_timeout: Duration,
    pub seed_questions: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: data_dir().join(DATABASE_FILE),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
            seed_questions: true,
        }
    }
}

impl Config {
    /// Read `CLINIC_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unparseable values keep their default
    /// and are reported with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup("CLINIC_DB_PATH").filter(|v| !v.trim().is_empty()) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup("CLINIC_BIND_ADDR") {
            match raw.parse() {
                Ok(addr) => config.bind_addr = addr,
                Err(_) => tracing::warn!(value = %raw, default = DEFAULT_BIND_ADDR, "Invalid CLINIC_BIND_ADDR"),
            }
        }
        if let Some(raw) = lookup("CLINIC_STORE_TIMEOUT_MS") {
            match raw.parse::<u64>() {
                Ok(ms) if ms > 0 => config.store_timeout = Duration::from_millis(ms),
                _ => tracing::warn!(
                    value = %raw,
                    default = DEFAULT_STORE_TIMEOUT_MS,
                    "Invalid CLINIC_STORE_TIMEOUT_MS"
                ),
            }
        }
        if let Some(raw) = lookup("CLINIC_SEED_QUESTIONS") {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => config.seed_questions = true,
                "0" | "false" | "no" | "off" => config.seed_questions = false,
                _ => tracing::warn!(value = %raw, "Invalid CLINIC_SEED_QUESTIONS"),
            }
        }

        config
    }
}
