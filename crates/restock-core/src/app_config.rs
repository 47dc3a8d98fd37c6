use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub log_format: LogFormat,
    /// SKUs to monitor, trimmed and de-duplicated in configuration order.
    pub skus: Vec<String>,
    pub webhook_url: String,
    pub store_base_url: String,
    pub store_scope: String,
    pub user_agent: String,
    pub proxies_path: PathBuf,
    pub products_path: PathBuf,
    pub monitor_delay_ms: u64,
    pub error_delay_ms: u64,
    pub max_error_delay_ms: u64,
    pub cooldown_ms: u64,
    pub cooldown_after_hits: u32,
    pub request_timeout_secs: u64,
}

impl AppConfig {
    #[must_use]
    pub fn monitor_delay(&self) -> Duration {
        Duration::from_millis(self.monitor_delay_ms)
    }

    #[must_use]
    pub fn error_delay(&self) -> Duration {
        Duration::from_millis(self.error_delay_ms)
    }

    #[must_use]
    pub fn max_error_delay(&self) -> Duration {
        Duration::from_millis(self.max_error_delay_ms)
    }

    #[must_use]
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .field("skus", &self.skus)
            .field("webhook_url", &"[redacted]")
            .field("store_base_url", &self.store_base_url)
            .field("store_scope", &self.store_scope)
            .field("user_agent", &self.user_agent)
            .field("proxies_path", &self.proxies_path)
            .field("products_path", &self.products_path)
            .field("monitor_delay_ms", &self.monitor_delay_ms)
            .field("error_delay_ms", &self.error_delay_ms)
            .field("max_error_delay_ms", &self.max_error_delay_ms)
            .field("cooldown_ms", &self.cooldown_ms)
            .field("cooldown_after_hits", &self.cooldown_after_hits)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}
