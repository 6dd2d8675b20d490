use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

pub mod scheduling;

pub use scheduling::{ConfigError, SchedulingConfig, WorkingHours};

const DEFAULT_STORAGE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Which backend holds appointment records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Supabase,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "supabase" => Ok(StoreBackend::Supabase),
            "memory" | "in-memory" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::InvalidValue {
                key: "SCHEDULING_STORE",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: Option<String>,
    pub storage_timeout_ms: u64,
    pub bind_addr: String,
    pub store_backend: StoreBackend,
    pub scheduling: SchedulingConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let supabase_url = env::var("SUPABASE_URL")
            .unwrap_or_else(|_| {
                warn!("SUPABASE_URL not set, using empty value");
                String::new()
            });
        let supabase_anon_key = env::var("SUPABASE_ANON_PUBLIC_KEY")
            .unwrap_or_else(|_| {
                warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                String::new()
            });
        let supabase_service_role_key = env::var("SUPABASE_SERVICE_ROLE_KEY").ok();

        let storage_timeout_ms = match env::var("STORAGE_TIMEOUT_MS") {
            Ok(raw) => raw.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                key: "STORAGE_TIMEOUT_MS",
                value: raw,
            })?,
            Err(_) => DEFAULT_STORAGE_TIMEOUT_MS,
        };

        let bind_addr = env::var("API_BIND_ADDR")
            .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

        let scheduling = match env::var("SCHEDULING_CONFIG_PATH") {
            Ok(path) => {
                info!("Loading scheduling policy from {}", path);
                SchedulingConfig::load(PathBuf::from(path))?
            }
            Err(_) => {
                warn!("SCHEDULING_CONFIG_PATH not set, using default practice hours");
                SchedulingConfig::default()
            }
        };

        let mut config = Self {
            supabase_url,
            supabase_anon_key,
            supabase_service_role_key,
            storage_timeout_ms,
            bind_addr,
            store_backend: StoreBackend::Memory,
            scheduling,
        };

        config.store_backend = match env::var("SCHEDULING_STORE") {
            Ok(raw) => raw.parse()?,
            Err(_) if config.is_configured() => StoreBackend::Supabase,
            Err(_) => {
                warn!("Supabase not configured - appointments will be kept in memory");
                StoreBackend::Memory
            }
        };

        if config.store_backend == StoreBackend::Supabase && !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        Ok(config)
    }

    /// Configuration with the in-memory store and default policy.
    pub fn local() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_service_role_key: None,
            storage_timeout_ms: DEFAULT_STORAGE_TIMEOUT_MS,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            store_backend: StoreBackend::Memory,
            scheduling: SchedulingConfig::default(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }

    pub fn storage_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.storage_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_backend_parses_known_names() {
        assert_eq!("supabase".parse::<StoreBackend>().unwrap(), StoreBackend::Supabase);
        assert_eq!(" Memory ".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert!("postgres".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn local_config_is_not_supabase_backed() {
        let config = AppConfig::local();
        assert!(!config.is_configured());
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.storage_timeout().as_millis(), 5_000);
    }
}
