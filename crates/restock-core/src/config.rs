use crate::app_config::{AppConfig, Environment, LogFormat};
use crate::ConfigError;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:80.0) Gecko/20100101 Firefox/80.0";

/// Reads the monitor configuration, loading a `.env` file first if present.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Reads the monitor configuration from the process environment only.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Parses and validates every `RESTOCK_*` variable through `lookup`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<u32>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let env = parse_environment(&or_default("RESTOCK_ENV", "development"))?;
    let log_level = or_default("RESTOCK_LOG_LEVEL", "info");
    let log_format = parse_log_format(&or_default("RESTOCK_LOG_FORMAT", "pretty"))?;

    let skus = parse_skus(&require("RESTOCK_SKUS")?)?;
    let webhook_url = require("RESTOCK_WEBHOOK_URL")?;

    let store_base_url = or_default("RESTOCK_STORE_BASE_URL", "https://www.gamenerdz.com")
        .trim_end_matches('/')
        .to_string();
    let store_scope = or_default("RESTOCK_STORE_SCOPE", "pokemon");
    let user_agent = or_default("RESTOCK_USER_AGENT", DEFAULT_USER_AGENT);
    let proxies_path = PathBuf::from(or_default("RESTOCK_PROXIES_PATH", "./proxies.txt"));
    let products_path = PathBuf::from(or_default("RESTOCK_PRODUCTS_PATH", "./products.csv"));

    let monitor_delay_ms = parse_u64("RESTOCK_MONITOR_DELAY_MS", "300000")?;
    let error_delay_ms = parse_u64("RESTOCK_ERROR_DELAY_MS", "10000")?;
    let max_error_delay_ms = parse_u64("RESTOCK_MAX_ERROR_DELAY_MS", "300000")?;
    let cooldown_ms = parse_u64("RESTOCK_COOLDOWN_MS", "7200000")?;
    let cooldown_after_hits = parse_u32("RESTOCK_COOLDOWN_AFTER_HITS", "3")?;
    let request_timeout_secs = parse_u64("RESTOCK_REQUEST_TIMEOUT_SECS", "30")?;

    if monitor_delay_ms == 0 {
        return Err(ConfigError::Validation(
            "RESTOCK_MONITOR_DELAY_MS must be greater than zero".to_string(),
        ));
    }
    if max_error_delay_ms < error_delay_ms {
        return Err(ConfigError::Validation(format!(
            "RESTOCK_MAX_ERROR_DELAY_MS ({max_error_delay_ms}) must be at least RESTOCK_ERROR_DELAY_MS ({error_delay_ms})"
        )));
    }
    if cooldown_after_hits == 0 {
        return Err(ConfigError::Validation(
            "RESTOCK_COOLDOWN_AFTER_HITS must be at least 1".to_string(),
        ));
    }
    if request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "RESTOCK_REQUEST_TIMEOUT_SECS must be greater than zero".to_string(),
        ));
    }

    Ok(AppConfig {
        env,
        log_level,
        log_format,
        skus,
        webhook_url,
        store_base_url,
        store_scope,
        user_agent,
        proxies_path,
        products_path,
        monitor_delay_ms,
        error_delay_ms,
        max_error_delay_ms,
        cooldown_ms,
        cooldown_after_hits,
        request_timeout_secs,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s.trim() {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "RESTOCK_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

fn parse_log_format(s: &str) -> Result<LogFormat, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "pretty" | "text" => Ok(LogFormat::Pretty),
        "json" => Ok(LogFormat::Json),
        other => Err(ConfigError::InvalidEnvVar {
            var: "RESTOCK_LOG_FORMAT".to_string(),
            reason: format!("expected 'pretty' or 'json', got '{other}'"),
        }),
    }
}

/// Split a comma-separated SKU list, dropping blanks and repeats.
fn parse_skus(raw: &str) -> Result<Vec<String>, ConfigError> {
    let mut skus: Vec<String> = Vec::new();
    for sku in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !skus.iter().any(|seen| seen == sku) {
            skus.push(sku.to_string());
        }
    }

    if skus.is_empty() {
        return Err(ConfigError::InvalidEnvVar {
            var: "RESTOCK_SKUS".to_string(),
            reason: "no SKUs listed".to_string(),
        });
    }

    Ok(skus)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
