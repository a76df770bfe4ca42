use crate::core::{CrudError, Result};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_BIND_ADDR: &str = "CRUDBASE_BIND_ADDR";
pub const ENV_DEFAULT_PAGE_SIZE: &str = "CRUDBASE_DEFAULT_PAGE_SIZE";
pub const ENV_LIST_PAGE_SIZE: &str = "CRUDBASE_LIST_PAGE_SIZE";
pub const ENV_RETRY_BACKOFF_MS: &str = "CRUDBASE_RETRY_BACKOFF_MS";
pub const ENV_RETRY_MAX_BACKOFF_MS: &str = "CRUDBASE_RETRY_MAX_BACKOFF_MS";
pub const ENV_RETRY_JITTER: &str = "CRUDBASE_RETRY_JITTER";
pub const ENV_RETRY_MAX_RETRIES: &str = "CRUDBASE_RETRY_MAX_RETRIES";

/// Conflict retry settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Delay before the first retry; doubles on every further retry.
    pub backoff: Duration,

    /// Upper bound for the doubled delay (before jitter).
    pub max_backoff: Duration,

    /// Fraction in `[0, 1]` by which each delay is randomly stretched or shrunk.
    pub jitter: f64,

    /// Retries allowed after the first attempt; `None` retries forever.
    pub max_retries: Option<u32>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(3),
            max_backoff: Duration::from_secs(30),
            jitter: 0.2,
            max_retries: Some(5),
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    pub fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn max_retries(mut self, max_retries: Option<u32>) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Reads overrides from `CRUDBASE_RETRY_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(ms) = parse_var::<u64>(&lookup, ENV_RETRY_BACKOFF_MS)? {
            config.backoff = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, ENV_RETRY_MAX_BACKOFF_MS)? {
            config.max_backoff = Duration::from_millis(ms);
        }
        if let Some(jitter) = parse_var::<f64>(&lookup, ENV_RETRY_JITTER)? {
            if !(0.0..=1.0).contains(&jitter) {
                return Err(CrudError::Precondition(format!(
                    "{ENV_RETRY_JITTER} must be within [0, 1], got {jitter}"
                )));
            }
            config.jitter = jitter;
        }
        if let Some(raw) = lookup(ENV_RETRY_MAX_RETRIES) {
            config.max_retries = match raw.trim().to_ascii_lowercase().as_str() {
                "indefinite" | "unbounded" | "none" => None,
                other => Some(
                    other
                        .parse::<u32>()
                        .map_err(|_| invalid(ENV_RETRY_MAX_RETRIES, &raw))?,
                ),
            };
        }

        Ok(config)
    }
}

/// Process-wide settings for services and the bundled HTTP server.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameworkConfig {
    pub bind_addr: SocketAddr,

    /// Page size used by `GET /page` when the client omits `size`.
    pub default_page_size: usize,

    /// Page size used while streaming full listings.
    pub list_page_size: usize,

    pub retry: RetryConfig,
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            default_page_size: 50,
            list_page_size: 100,
            retry: RetryConfig::default(),
        }
    }
}

impl FrameworkConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(addr) = parse_var::<SocketAddr>(&lookup, ENV_BIND_ADDR)? {
            config.bind_addr = addr;
        }
        if let Some(size) = parse_var::<usize>(&lookup, ENV_DEFAULT_PAGE_SIZE)? {
            config.default_page_size = positive(ENV_DEFAULT_PAGE_SIZE, size)?;
        }
        if let Some(size) = parse_var::<usize>(&lookup, ENV_LIST_PAGE_SIZE)? {
            config.list_page_size = positive(ENV_LIST_PAGE_SIZE, size)?;
        }
        config.retry = RetryConfig::from_lookup(&lookup)?;

        Ok(config)
    }

    pub fn bind_addr(mut self, bind_addr: SocketAddr) -> Self {
        self.bind_addr = bind_addr;
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| invalid(key, &raw)),
        None => Ok(None),
    }
}

fn positive(key: &str, value: usize) -> Result<usize> {
    if value == 0 {
        return Err(CrudError::Precondition(format!("{key} must be greater than zero")));
    }
    Ok(value)
}

fn invalid(key: &str, raw: &str) -> CrudError {
    CrudError::Precondition(format!("invalid value '{raw}' for {key}"))
}
