use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::application::cart_sessions::{GuestMergePolicy, DEFAULT_IDLE_TTL};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server_port: String,
    pub database_url: Option<String>,
    #[serde(skip)]
    pub persistence_timeout: Duration,
    pub guest_cart_dir: Option<String>,
    #[serde(skip)]
    pub guest_merge: GuestMergePolicy,
    #[serde(skip)]
    pub payment_delay: Duration,
    #[serde(skip)]
    pub cart_idle_ttl: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let server_port = get("SERVER_PORT").unwrap_or_else(|| "3000".into());
        let database_url = get("DATABASE_URL");
        let persistence_timeout = Duration::from_millis(millis(
            "PERSISTENCE_TIMEOUT_MS",
            get("PERSISTENCE_TIMEOUT_MS"),
            5000,
        )?);
        let guest_cart_dir = get("GUEST_CART_DIR");
        let guest_merge = match get("GUEST_CART_MERGE") {
            Some(v) => v.parse()?,
            None => GuestMergePolicy::default(),
        };
        let payment_delay =
            Duration::from_millis(millis("PAYMENT_DELAY_MS", get("PAYMENT_DELAY_MS"), 0)?);
        let cart_idle_ttl = Duration::from_millis(millis(
            "CART_IDLE_TTL_MS",
            get("CART_IDLE_TTL_MS"),
            DEFAULT_IDLE_TTL.as_millis() as u64,
        )?);

        Ok(Self {
            server_port,
            database_url,
            persistence_timeout,
            guest_cart_dir,
            guest_merge,
            payment_delay,
            cart_idle_ttl,
        })
    }
}

fn millis(key: &str, raw: Option<String>, default: u64) -> anyhow::Result<u64> {
    match raw {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} must be a whole number of milliseconds: {e}")),
        None => Ok(default),
    }
}
