//! Environment-driven configuration with safe defaults.

use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_BIND: &str = "127.0.0.1:8080";
const DEFAULT_HISTORY_CAPACITY: usize = 10_000;
const DEFAULT_QUEUE_CAPACITY: usize = 100;
const DEFAULT_KEEPALIVE_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to (`EVENTSTREAM_BIND`).
    pub bind_addr: SocketAddr,
    /// Capacity of the recent-event history (`EVENTSTREAM_HISTORY_CAPACITY`).
    pub history_capacity: usize,
    /// Per-subscription queue capacity (`EVENTSTREAM_QUEUE_CAPACITY`).
    pub queue_capacity: usize,
    /// Idle interval between keepalives (`EVENTSTREAM_KEEPALIVE_SECS`).
    pub keepalive: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND.parse().expect("valid default bind address"),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            keepalive: Duration::from_secs(DEFAULT_KEEPALIVE_SECS),
        }
    }
}

impl Config {
    /// Read configuration from the environment. Unset variables use the
    /// defaults above; unparsable values are logged and fall back.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: env_parsed("EVENTSTREAM_BIND", defaults.bind_addr),
            history_capacity: env_parsed("EVENTSTREAM_HISTORY_CAPACITY", defaults.history_capacity),
            queue_capacity: env_parsed("EVENTSTREAM_QUEUE_CAPACITY", defaults.queue_capacity),
            keepalive: Duration::from_secs(env_parsed(
                "EVENTSTREAM_KEEPALIVE_SECS",
                DEFAULT_KEEPALIVE_SECS,
            )),
        }
    }
}

fn env_parsed<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(%name, value = %raw, "unparsable value, using default");
            default
        }),
        Err(_) => default,
    }
}
