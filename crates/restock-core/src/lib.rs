pub mod app_config;
pub mod config;
pub mod products;
pub mod proxies;

pub use app_config::{AppConfig, Environment, LogFormat};
pub use config::{load_app_config, load_app_config_from_env};
pub use products::{load_product_catalog, ProductCatalog, ProductInfo};
pub use proxies::{load_proxy_list, parse_proxy_line, parse_proxy_list, Proxy};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("configuration validation failed: {0}")]
    Validation(String),

    #[error("failed to read products file {path}: {source}")]
    ProductsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse products file {path}: {source}")]
    ProductsFileParse {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("failed to read proxies file {path}: {source}")]
    ProxiesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid proxy on line {line}: {reason}")]
    InvalidProxyLine { line: usize, reason: String },
}
