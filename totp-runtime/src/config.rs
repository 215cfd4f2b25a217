//! Environment-driven runtime configuration.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use once_cell::sync::OnceCell;

use crate::error::{Result, TotpError};

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_SEED_PATH: &str = "/data/seed.txt";
pub const DEFAULT_PRIVATE_KEY: &str = "student_private.pem";
pub const DEFAULT_PUBLIC_KEY: &str = "student_public.pem";
pub const DEFAULT_ISSUER_PUBLIC_KEY: &str = "instructor_public.pem";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_CODE_LOG_INTERVAL_SECS: u64 = 60;

#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub bind: String,
    pub seed_path: PathBuf,
    pub private_key_path: PathBuf,
    pub public_key_path: PathBuf,
    pub issuer_public_key_path: PathBuf,
    pub issuer_url: Option<String>,
    pub timeout: Duration,
    /// Zero disables the periodic code logger.
    pub code_log_interval: u64,
    pub code_log_path: Option<PathBuf>,
}

static RUNTIME_CONFIG: OnceCell<RuntimeConfig> = OnceCell::new();

impl RuntimeConfig {
    /// Load configuration from environment variables.
    /// Cached after the first call.
    pub fn load() -> &'static RuntimeConfig {
        RUNTIME_CONFIG.get_or_init(|| Self::from_lookup(|key| env::var(key).ok()))
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> RuntimeConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let number = |key: &str, default: u64| {
            lookup(key)
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(default)
        };

        RuntimeConfig {
            bind: string("PKI2FA_BIND", DEFAULT_BIND),
            seed_path: PathBuf::from(string("PKI2FA_SEED_PATH", DEFAULT_SEED_PATH)),
            private_key_path: PathBuf::from(string("PKI2FA_PRIVATE_KEY", DEFAULT_PRIVATE_KEY)),
            public_key_path: PathBuf::from(string("PKI2FA_PUBLIC_KEY", DEFAULT_PUBLIC_KEY)),
            issuer_public_key_path: PathBuf::from(string(
                "PKI2FA_ISSUER_PUBLIC_KEY",
                DEFAULT_ISSUER_PUBLIC_KEY,
            )),
            issuer_url: lookup("PKI2FA_ISSUER_URL").filter(|v| !v.trim().is_empty()),
            timeout: Duration::from_secs(number("REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)),
            code_log_interval: number("PKI2FA_CODE_LOG_INTERVAL", DEFAULT_CODE_LOG_INTERVAL_SECS),
            code_log_path: lookup("PKI2FA_CODE_LOG_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.bind
            .parse()
            .map_err(|e| TotpError::Config(format!("invalid bind address '{}': {e}", self.bind)))
    }

    pub fn issuer_url(&self) -> Result<&str> {
        self.issuer_url
            .as_deref()
            .ok_or_else(|| TotpError::Config("PKI2FA_ISSUER_URL is not set".into()))
    }
}
