//! Periodic 2FA code logger.
//!
//! Once per interval, reads the stored seed and emits
//! `YYYY-MM-DD HH:MM:SS - 2FA Code: XXXXXX` (UTC). Problems become an
//! `Error: ...` line; the loop itself never stops on them.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::io::AsyncWriteExt;

use crate::error::TotpError;
use crate::store::SecretStore;
use crate::totp::derive_code;

/// The log line for `now`.
pub fn log_line(store: &dyn SecretStore, now: DateTime<Utc>) -> String {
    let secret = match store.get() {
        Ok(Some(secret)) => secret,
        Ok(None) => return format!("Error: {}", TotpError::SecretNotProvisioned),
        Err(e) => return format!("Error: {e}"),
    };
    let unix = u64::try_from(now.timestamp()).unwrap_or(0);
    format!(
        "{} - 2FA Code: {}",
        now.format("%Y-%m-%d %H:%M:%S"),
        derive_code(&secret, unix)
    )
}

async fn append(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(format!("{line}\n").as_bytes()).await?;
    // tokio::fs hands writes to a blocking task; wait for it before the file drops.
    file.flush().await
}

/// Write one line to `sink`, or to the tracing log when there is none.
pub async fn tick(store: &dyn SecretStore, sink: Option<&Path>) {
    let line = log_line(store, Utc::now());
    match sink {
        Some(path) => {
            if let Err(e) = append(path, &line).await {
                tracing::error!(path = %path.display(), error = %e, "Failed to append code log");
            }
        }
        None => tracing::info!(target: "code_log", "{line}"),
    }
}

/// Run [`tick`] every `interval` forever. Meant to be spawned.
pub async fn run(store: Arc<dyn SecretStore>, interval: Duration, sink: Option<PathBuf>) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        tick(store.as_ref(), sink.as_deref()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::Secret;
    use crate::store::{FileSecretStore, MemorySecretStore};

    const SEED: &str = "3f1c9a7e52b84d06c1e3a9f27b5d8e4062a1c9f03b7e5d2148a6c0f9e3b1d7a5";

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn formats_code_line() {
        let store = MemorySecretStore::new();
        store.put(Secret::from_hex(SEED).unwrap()).unwrap();
        assert_eq!(
            log_line(&store, at(1_700_000_010)),
            "2023-11-14 22:13:30 - 2FA Code: 767305"
        );
    }

    #[test]
    fn unprovisioned_is_error_line() {
        let store = MemorySecretStore::new();
        assert_eq!(log_line(&store, at(0)), "Error: seed not decrypted yet");
    }

    #[test]
    fn corrupt_store_is_error_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.txt");
        std::fs::write(&path, "garbage").unwrap();
        let line = log_line(&FileSecretStore::new(&path), at(0));
        assert!(line.starts_with("Error: storage error"));
    }

    #[tokio::test]
    async fn tick_appends_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = dir.path().join("cron.log");
        let store = MemorySecretStore::new();
        store.put(Secret::from_hex(SEED).unwrap()).unwrap();

        for _ in 0..25 {
            tick(&store, Some(sink.as_path())).await;
        }

        let contents = std::fs::read_to_string(&sink).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 25);
        for line in lines {
            assert!(line.contains(" - 2FA Code: "));
            assert_eq!(line.len(), "2023-11-14 22:13:30 - 2FA Code: 767305".len());
        }
    }
}
