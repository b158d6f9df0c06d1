//! Client configuration resolved from arguments, environment and defaults

use std::env;

/// Default Riak host when neither an argument nor `SZ_RIAK_HOST` is given
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default Riak HTTP port
pub const DEFAULT_PORT: u16 = 8098;
/// Default number of in-flight requests per batch
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 20;

/// Connection settings for a [`Client`](crate::Client).
///
/// Each field resolves as: explicit `with_*` argument, then environment
/// (`SZ_RIAK_HOST`, `SZ_RIAK_PORT`, `SZ_RIAK_CONCURRENCY`), then the
/// built-in default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Riak node host
    pub host: String,
    /// Riak node HTTP port
    pub port: u16,
    /// Bucket every key belongs to
    pub bucket: String,
    /// Maximum simultaneous requests issued by one batch
    pub concurrency_limit: usize,
}

impl ClientConfig {
    /// Build a config for `bucket`, reading the rest from the environment.
    pub fn new(bucket: impl Into<String>) -> Self {
        let host = env::var("SZ_RIAK_HOST")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = env::var("SZ_RIAK_PORT")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let concurrency_limit = env::var("SZ_RIAK_CONCURRENCY")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .filter(|limit: &usize| *limit > 0)
            .unwrap_or(DEFAULT_CONCURRENCY_LIMIT);

        Self {
            host,
            port,
            bucket: bucket.into(),
            concurrency_limit,
        }
    }

    /// Override the host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Override the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Override the per-batch in-flight limit
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit;
        self
    }

    /// Base URL of the node, without a trailing slash
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}
