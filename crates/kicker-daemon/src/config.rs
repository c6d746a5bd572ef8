//! Daemon configuration from `KICKER_*` environment variables.
//!
//! `main.rs` loads `.env.local` (if present) before calling
//! [`DaemonConfig::from_env`]. The database URL is read separately by
//! `kicker_db::connect_from_env`.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

pub const ENV_DAEMON_ADDR: &str = "KICKER_DAEMON_ADDR";
pub const ENV_RECONCILE_INTERVAL_MS: &str = "KICKER_RECONCILE_INTERVAL_MS";
pub const ENV_HEARTBEAT_SECS: &str = "KICKER_HEARTBEAT_SECS";
pub const ENV_BUS_CAPACITY: &str = "KICKER_BUS_CAPACITY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    pub addr: SocketAddr,
    pub reconcile_interval: Duration,
    pub heartbeat_interval: Duration,
    pub bus_capacity: usize,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8899)),
            reconcile_interval: Duration::from_millis(500),
            heartbeat_interval: Duration::from_secs(1),
            bus_capacity: 1024,
        }
    }
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(addr) = parse_var::<SocketAddr, _>(&lookup, ENV_DAEMON_ADDR)? {
            cfg.addr = addr;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, ENV_RECONCILE_INTERVAL_MS)? {
            if ms == 0 {
                bail!("{ENV_RECONCILE_INTERVAL_MS} must be > 0");
            }
            cfg.reconcile_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, ENV_HEARTBEAT_SECS)? {
            if secs == 0 {
                bail!("{ENV_HEARTBEAT_SECS} must be > 0");
            }
            cfg.heartbeat_interval = Duration::from_secs(secs);
        }
        if let Some(cap) = parse_var::<usize, _>(&lookup, ENV_BUS_CAPACITY)? {
            if cap == 0 {
                bail!("{ENV_BUS_CAPACITY} must be > 0");
            }
            cfg.bus_capacity = cap;
        }

        Ok(cfg)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("invalid {key}={raw:?}")),
    }
}
