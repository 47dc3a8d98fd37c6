//! Proxy credentials and the line-delimited proxy list format.
//!
//! Each non-blank line is `host:port:username:password`. Lines starting with
//! `#` are comments. Hosts are kept as written here; DNS resolution happens
//! in the monitor crate when the pool is built.

use std::path::Path;

/// One proxy binding. `available` mirrors the pool's usability mark at the
/// time the proxy was leased.
#[derive(Clone, PartialEq, Eq)]
pub struct Proxy {
    /// `host:port`.
    pub host: String,
    pub username: String,
    pub password: String,
    pub available: bool,
}

impl Proxy {
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
            available: true,
        }
    }
}

impl std::fmt::Debug for Proxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proxy")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .field("available", &self.available)
            .finish()
    }
}

/// Parse one `host:port:username:password` line.
///
/// # Errors
///
/// Returns a human-readable reason when the line does not have exactly four
/// non-empty fields or the port is not numeric.
pub fn parse_proxy_line(line: &str) -> Result<Proxy, String> {
    let parts: Vec<&str> = line.trim().split(':').collect();
    let [host, port, username, password] = parts.as_slice() else {
        return Err(format!(
            "expected host:port:username:password, got {} field(s)",
            parts.len()
        ));
    };

    if host.is_empty() || username.is_empty() || password.is_empty() {
        return Err("host, username and password must be non-empty".to_string());
    }
    port.parse::<u16>()
        .map_err(|e| format!("invalid port '{port}': {e}"))?;

    Ok(Proxy::new(format!("{host}:{port}"), *username, *password))
}

/// Parse every proxy in a list, skipping blank lines and `#` comments.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidProxyLine`](crate::ConfigError::InvalidProxyLine)
/// with the 1-based line number of the first malformed entry.
pub fn parse_proxy_list(content: &str) -> Result<Vec<Proxy>, crate::ConfigError> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        })
        .map(|(idx, line)| {
            parse_proxy_line(line).map_err(|reason| crate::ConfigError::InvalidProxyLine {
                line: idx + 1,
                reason,
            })
        })
        .collect()
}

/// Load the proxy list from a file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read or a line is malformed.
pub fn load_proxy_list(path: &Path) -> Result<Vec<Proxy>, crate::ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| crate::ConfigError::ProxiesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_proxy_list(&content)
}
