//! Client for requesting an encrypted seed from the issuer.
//!
//! The holder posts its identity and PEM public key; the issuer answers with
//! `{ "encrypted_seed": "<base64>" }`, which is later fed to
//! [`crate::seed_channel::provision`].

use std::path::Path;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TotpError};

#[derive(Debug, Serialize)]
pub struct SeedRequest<'a> {
    pub student_id: &'a str,
    pub github_repo_url: &'a str,
    /// PEM text including the BEGIN/END lines.
    pub public_key: &'a str,
}

#[derive(Debug, Deserialize)]
struct SeedResponse {
    encrypted_seed: String,
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

pub fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|err| TotpError::Http(format!("Invalid issuer URL: {err}")))
}

/// Send a seed request and return the base64 envelope.
pub async fn request_seed(url: &str, request: &SeedRequest<'_>, timeout: Duration) -> Result<String> {
    let url = parse_url(url)?;
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| TotpError::Http(format!("Failed to build HTTP client: {err}")))?;

    tracing::info!(issuer = %url, student_id = request.student_id, "Requesting encrypted seed");

    let response = client
        .post(url)
        .headers(json_headers())
        .json(request)
        .send()
        .await
        .map_err(|err| TotpError::Http(format!("HTTP request failed: {err}")))?;
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|err| TotpError::Http(format!("Failed to read response body: {err}")))?;

    if !status.is_success() {
        return Err(TotpError::Http(format!("HTTP {status}: {text}")));
    }

    parse_seed_response(status, &text)
}

fn parse_seed_response(status: StatusCode, body: &str) -> Result<String> {
    let parsed: SeedResponse = serde_json::from_str(body)
        .map_err(|err| TotpError::Http(format!("Invalid issuer response ({status}): {err}")))?;
    if parsed.encrypted_seed.trim().is_empty() {
        return Err(TotpError::Http("Issuer returned an empty encrypted_seed".into()));
    }
    Ok(parsed.encrypted_seed)
}

/// Save an envelope as plain text (`encrypted_seed.txt`).
pub async fn save_envelope(path: &Path, envelope: &str) -> Result<()> {
    tokio::fs::write(path, envelope)
        .await
        .map_err(|err| TotpError::Storage(format!("writing {}: {err}", path.display())))
}
