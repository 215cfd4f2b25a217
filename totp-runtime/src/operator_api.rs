//! Axum HTTP API for the 2FA service.
//!
//! - `POST /decrypt-seed`: provision the seed from an RSA-OAEP envelope
//! - `GET  /generate-2fa`: current code and seconds it stays valid
//! - `POST /verify-2fa`: check a code with a +/-1 step window
//! - `GET  /health`: liveness and provisioning state
//!
//! Failures are reported with three fixed messages only, so a client cannot
//! tell which stage of seed decryption rejected its envelope.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::rate_limit::{read_rate_limit, write_rate_limit};
use crate::secret::Secret;
use crate::seed_channel;
use crate::store::SecretStore;
use crate::totp::{self, current_code};
use crate::verify::{DEFAULT_WINDOW_STEPS, verify};

pub const DECRYPTION_FAILED: &str = "Decryption failed";
pub const NOT_PROVISIONED: &str = "Seed not decrypted yet";
pub const MISSING_CODE: &str = "Missing code";

/// Shared handler state: the holder's private key and the seed slot.
#[derive(Clone)]
pub struct AppState {
    pub private_key: Arc<RsaPrivateKey>,
    pub store: Arc<dyn SecretStore>,
}

impl AppState {
    pub fn new(private_key: RsaPrivateKey, store: Arc<dyn SecretStore>) -> Self {
        Self {
            private_key: Arc::new(private_key),
            store,
        }
    }

    /// The stored seed. Read failures are logged and reported as absent.
    fn secret(&self) -> Option<Secret> {
        match self.store.get() {
            Ok(secret) => secret,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored seed");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ApiError {
    error: String,
}

pub(crate) fn api_error(status: StatusCode, msg: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (status, Json(ApiError { error: msg.into() }))
}

// ---------------------------------------------------------------------------
// Seed provisioning
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct DecryptSeedRequest {
    encrypted_seed: String,
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
}

async fn decrypt_seed(
    State(state): State<AppState>,
    Json(req): Json<DecryptSeedRequest>,
) -> impl IntoResponse {
    match seed_channel::provision(&req.encrypted_seed, &state.private_key, state.store.as_ref()) {
        Ok(()) => (StatusCode::OK, Json(StatusResponse { status: "ok" })).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Seed provisioning failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, DECRYPTION_FAILED).into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Code generation and verification
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct CodeResponse {
    code: String,
    valid_for: u64,
}

async fn generate_2fa(State(state): State<AppState>) -> impl IntoResponse {
    let Some(secret) = state.secret() else {
        return api_error(StatusCode::INTERNAL_SERVER_ERROR, NOT_PROVISIONED).into_response();
    };
    let (code, valid_for) = current_code(&secret);
    (
        StatusCode::OK,
        Json(CodeResponse {
            code: code.to_string(),
            valid_for,
        }),
    )
        .into_response()
}

#[derive(Deserialize)]
struct VerifyRequest {
    #[serde(default)]
    code: Option<String>,
}

#[derive(Serialize)]
struct VerifyResponse {
    valid: bool,
}

/// The body is parsed by hand: an absent body, unparsable JSON, a missing
/// field and an empty string all mean the same thing to the caller.
async fn verify_2fa(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let candidate = serde_json::from_slice::<VerifyRequest>(&body)
        .ok()
        .and_then(|req| req.code)
        .filter(|code| !code.is_empty());
    let Some(candidate) = candidate else {
        return api_error(StatusCode::BAD_REQUEST, MISSING_CODE).into_response();
    };

    let Some(secret) = state.secret() else {
        return api_error(StatusCode::INTERNAL_SERVER_ERROR, NOT_PROVISIONED).into_response();
    };

    let valid = verify(&secret, &candidate, DEFAULT_WINDOW_STEPS);
    tracing::debug!(valid, "Verified 2FA code");
    (StatusCode::OK, Json(VerifyResponse { valid })).into_response()
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    provisioned: bool,
    period: u64,
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        provisioned: state.secret().is_some(),
        period: totp::PERIOD_SECS,
    })
}

// ---------------------------------------------------------------------------
// Router builder
// ---------------------------------------------------------------------------

/// Build the API router with rate limiting, tracing and CORS.
pub fn operator_api_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/decrypt-seed",
            post(decrypt_seed).layer(middleware::from_fn(write_rate_limit)),
        )
        .route(
            "/verify-2fa",
            post(verify_2fa).layer(middleware::from_fn(write_rate_limit)),
        )
        .route(
            "/generate-2fa",
            get(generate_2fa).layer(middleware::from_fn(read_rate_limit)),
        )
        .route(
            "/health",
            get(health).layer(middleware::from_fn(read_rate_limit)),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
