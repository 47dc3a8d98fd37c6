//! Round-robin proxy rotation shared by every monitor worker.
//!
//! The cursor is a single atomic advanced with `fetch_update`, so concurrent
//! callers each observe a distinct pre-increment position and the cursor
//! always stays in `0..len`. Each slot also carries a usability flag behind
//! [`ProxyPool::mark_unusable`]; workers do not mark proxies by default, which
//! makes the baseline pure round-robin reuse.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rand::seq::IndexedRandom;
use restock_core::Proxy;

use crate::error::PoolError;

pub struct ProxyPool {
    proxies: Vec<Proxy>,
    usable: Vec<AtomicBool>,
    cursor: AtomicUsize,
}

impl ProxyPool {
    /// # Errors
    ///
    /// Returns [`PoolError::Empty`] when `proxies` is empty.
    pub fn new(proxies: Vec<Proxy>) -> Result<Self, PoolError> {
        if proxies.is_empty() {
            return Err(PoolError::Empty);
        }
        let usable = proxies.iter().map(|_| AtomicBool::new(true)).collect();
        Ok(Self {
            proxies,
            usable,
            cursor: AtomicUsize::new(0),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    #[must_use]
    pub fn usable_count(&self) -> usize {
        self.usable
            .iter()
            .filter(|flag| flag.load(Ordering::Acquire))
            .count()
    }

    /// Leases the next proxy in rotation.
    ///
    /// Slots marked unusable are skipped. When every slot is marked, all
    /// marks are cleared and rotation continues from the current position.
    pub fn next(&self) -> Proxy {
        let len = self.proxies.len();
        for _ in 0..len {
            let idx = self.advance();
            if self.usable[idx].load(Ordering::Acquire) {
                return self.lease(idx);
            }
        }

        tracing::warn!(
            proxies = len,
            "every proxy is marked unusable; resetting marks"
        );
        for flag in &self.usable {
            flag.store(true, Ordering::Release);
        }
        let idx = self.advance();
        self.lease(idx)
    }

    /// Takes the proxy with a matching host out of rotation until it is
    /// marked usable again or the whole pool is exhausted.
    pub fn mark_unusable(&self, proxy: &Proxy) {
        if let Some(idx) = self.position(proxy) {
            self.usable[idx].store(false, Ordering::Release);
            tracing::debug!(proxy = %proxy.host, "proxy marked unusable");
        }
    }

    pub fn mark_usable(&self, proxy: &Proxy) {
        if let Some(idx) = self.position(proxy) {
            self.usable[idx].store(true, Ordering::Release);
        }
    }

    /// Returns the current cursor and moves it one slot forward, wrapping at
    /// the end of the list.
    fn advance(&self) -> usize {
        let len = self.proxies.len();
        match self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| Some((c + 1) % len))
        {
            Ok(prev) | Err(prev) => prev,
        }
    }

    fn lease(&self, idx: usize) -> Proxy {
        let mut proxy = self.proxies[idx].clone();
        proxy.available = self.usable[idx].load(Ordering::Acquire);
        proxy
    }

    fn position(&self, proxy: &Proxy) -> Option<usize> {
        self.proxies.iter().position(|p| {
            p.host == proxy.host && p.username == proxy.username
        })
    }
}

impl std::fmt::Debug for ProxyPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyPool")
            .field("len", &self.proxies.len())
            .field("usable", &self.usable_count())
            .field("cursor", &self.cursor.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Resolves each proxy's `host:port` to one of its IPv4 addresses, chosen at
/// random, so that workers spread across every A record of a rotating
/// hostname.
///
/// Entries that fail to resolve are logged and dropped. Hosts that are
/// already IP literals pass through unchanged.
pub async fn resolve_proxies(proxies: Vec<Proxy>) -> Vec<Proxy> {
    let mut resolved = Vec::with_capacity(proxies.len());
    for mut proxy in proxies {
        let lookup = tokio::net::lookup_host(proxy.host.clone()).await;
        match lookup {
            Ok(addrs) => {
                let v4: Vec<SocketAddr> = addrs.filter(SocketAddr::is_ipv4).collect();
                if let Some(addr) = v4.choose(&mut rand::rng()).copied() {
                    tracing::debug!(host = %proxy.host, resolved = %addr, "resolved proxy host");
                    proxy.host = addr.to_string();
                    resolved.push(proxy);
                } else {
                    tracing::warn!(host = %proxy.host, "proxy host has no IPv4 address; skipping");
                }
            }
            Err(e) => {
                tracing::warn!(
                    host = %proxy.host,
                    error = %e,
                    "failed to resolve proxy host; skipping"
                );
            }
        }
    }
    resolved
}
