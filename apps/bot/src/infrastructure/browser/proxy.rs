use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use rand::seq::SliceRandom;

/// Failures after which a proxy is no longer handed out
pub const MAX_PROXY_FAILURES: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Proxy {
    pub host: String,
    pub port: u16,
}

impl Proxy {
    /// Parses a `host:port` line
    pub fn parse(line: &str) -> Option<Self> {
        let (host, port) = line.trim().rsplit_once(':')?;
        let host = host.trim();
        if host.is_empty() {
            return None;
        }
        Some(Self {
            host: host.to_string(),
            port: port.trim().parse().ok()?,
        })
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Rotating pool of HTTP proxies read from a `host:port` per line file
///
/// Each proxy is handed out once per load; when the pool runs dry it is
/// reloaded from disk. Proxies that failed too often are skipped. A pool
/// is meant to serve a single check.
pub struct ProxyPool {
    path: PathBuf,
    available: Vec<Proxy>,
    failures: HashMap<Proxy, u32>,
}

impl ProxyPool {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            available: Vec::new(),
            failures: HashMap::new(),
        }
    }

    async fn load(&self) -> Vec<Proxy> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                let proxies: Vec<Proxy> = content.lines().filter_map(Proxy::parse).collect();
                tracing::info!(count = proxies.len(), "Loaded proxies");
                proxies
            }
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "Could not read proxies file");
                Vec::new()
            }
        }
    }

    /// Picks a random healthy proxy, or `None` to go without one
    pub async fn next(&mut self) -> Option<Proxy> {
        if self.available.is_empty() {
            self.available = self.load().await;
            if self.available.is_empty() {
                tracing::warn!("No proxies available, proceeding without proxy");
                return None;
            }
        }

        let healthy: Vec<&Proxy> = self
            .available
            .iter()
            .filter(|p| self.failure_count(p) < MAX_PROXY_FAILURES)
            .collect();
        let Some(proxy) = healthy.choose(&mut rand::thread_rng()).map(|p| (*p).clone()) else {
            tracing::warn!("All proxies have excessive failures, no more proxies available");
            return None;
        };

        self.available.retain(|p| *p != proxy);
        Some(proxy)
    }

    /// Records a failed attempt through `proxy`
    pub fn mark_failed(&mut self, proxy: &Proxy) {
        let count = self.failures.entry(proxy.clone()).or_insert(0);
        *count += 1;
        tracing::info!(proxy = %proxy, count = *count, "Marked proxy as failed");
    }

    pub fn failure_count(&self, proxy: &Proxy) -> u32 {
        self.failures.get(proxy).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn pool_with(lines: &str) -> (tempfile::NamedTempFile, ProxyPool) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", lines).unwrap();
        let pool = ProxyPool::new(file.path());
        (file, pool)
    }

    #[test]
    fn parses_host_port_lines() {
        assert_eq!(
            Proxy::parse(" 10.0.0.1:8080 "),
            Some(Proxy { host: "10.0.0.1".into(), port: 8080 })
        );
        assert_eq!(Proxy::parse("no-port"), None);
        assert_eq!(Proxy::parse(":80"), None);
        assert_eq!(Proxy::parse("host:notaport"), None);
    }

    #[tokio::test]
    async fn missing_file_means_no_proxy() {
        let mut pool = ProxyPool::new("/nonexistent/proxies.txt");
        assert_eq!(pool.next().await, None);
    }

    #[tokio::test]
    async fn hands_out_each_proxy_once_per_load() {
        let (_file, mut pool) = pool_with("a:1\nb:2\n\ninvalid\n");
        let first = pool.next().await.unwrap();
        let second = pool.next().await.unwrap();
        assert_ne!(first, second);

        // Pool ran dry and is reloaded from disk
        assert!(pool.next().await.is_some());
    }

    #[tokio::test]
    async fn failing_proxies_are_skipped() {
        let (_file, mut pool) = pool_with("a:1\n");
        let proxy = Proxy::parse("a:1").unwrap();
        for _ in 0..MAX_PROXY_FAILURES {
            pool.mark_failed(&proxy);
        }
        assert_eq!(pool.failure_count(&proxy), MAX_PROXY_FAILURES);
        assert_eq!(pool.next().await, None);
    }

    #[tokio::test]
    async fn fresh_pool_forgets_failures() {
        let (file, mut pool) = pool_with("a:1\n");
        let proxy = Proxy::parse("a:1").unwrap();
        for _ in 0..MAX_PROXY_FAILURES {
            pool.mark_failed(&proxy);
        }
        assert_eq!(pool.next().await, None);

        let mut next_check = ProxyPool::new(file.path());
        assert_eq!(next_check.next().await, Some(proxy));
    }
}
