use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use scribe_db::deadline::MAX_TIMEOUT;
use tracing::warn;

const PLACEHOLDER_SECRETS: &[&str] = &["", "secret", "changeme", "change-me", "dev-secret-change-me"];

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = lookup("SCRIBE_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = lookup("SCRIBE_PORT")
            .unwrap_or_else(|| "8080".into())
            .parse()
            .context("SCRIBE_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .context("SCRIBE_HOST must be an IP address")?;

        let db_path = PathBuf::from(lookup("SCRIBE_DB_PATH").unwrap_or_else(|| "scribe.db".into()));

        let jwt_secret = lookup("SCRIBE_JWT_SECRET").context("SCRIBE_JWT_SECRET is not set")?;
        if PLACEHOLDER_SECRETS.contains(&jwt_secret.trim()) {
            bail!("SCRIBE_JWT_SECRET is a placeholder, set a real secret");
        }

        let timeout_secs: u64 = lookup("SCRIBE_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|| "5".into())
            .parse()
            .context("SCRIBE_REQUEST_TIMEOUT_SECS must be a whole number of seconds")?;
        if timeout_secs == 0 {
            bail!("SCRIBE_REQUEST_TIMEOUT_SECS must be at least 1");
        }
        let mut request_timeout = Duration::from_secs(timeout_secs);
        if request_timeout > MAX_TIMEOUT {
            warn!(
                "SCRIBE_REQUEST_TIMEOUT_SECS={} is above the {}s ceiling, clamping",
                timeout_secs,
                MAX_TIMEOUT.as_secs()
            );
            request_timeout = MAX_TIMEOUT;
        }

        Ok(Self {
            addr,
            db_path,
            jwt_secret,
            request_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = config(&[("SCRIBE_JWT_SECRET", "a-real-secret")]).unwrap();
        assert_eq!(config.addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.db_path, PathBuf::from("scribe.db"));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn secret_is_required_and_not_a_placeholder() {
        assert!(config(&[]).is_err());
        assert!(config(&[("SCRIBE_JWT_SECRET", "dev-secret-change-me")]).is_err());
        assert!(config(&[("SCRIBE_JWT_SECRET", "  ")]).is_err());
    }

    #[test]
    fn timeout_is_clamped() {
        let config = config(&[
            ("SCRIBE_JWT_SECRET", "a-real-secret"),
            ("SCRIBE_REQUEST_TIMEOUT_SECS", "300"),
        ])
        .unwrap();
        assert_eq!(config.request_timeout, MAX_TIMEOUT);
    }

    #[test]
    fn bad_port_is_rejected() {
        assert!(config(&[("SCRIBE_JWT_SECRET", "a-real-secret"), ("SCRIBE_PORT", "http")]).is_err());
    }
}
