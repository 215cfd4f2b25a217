//! End-to-end provisioning flows through the public API.
//!
//! Issuer-side encryption, the HTTP router and the file-backed store are
//! wired together the way the binary wires them.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use http_body_util::BodyExt;
use tower::util::ServiceExt;

use totp_runtime::keys::{parse_private_key_pem, parse_public_key_pem};
use totp_runtime::seed_channel::{decrypt_seed, encrypt_seed, provision};
use totp_runtime::{
    AppState, FileSecretStore, MemorySecretStore, Secret, SecretStore, TotpError,
    operator_api_router,
};

const HOLDER_PRIVATE: &str = include_str!("fixtures/holder_private.pem");
const HOLDER_PUBLIC: &str = include_str!("fixtures/holder_public.pem");

const SEED_A: &str = "3f1c9a7e52b84d06c1e3a9f27b5d8e4062a1c9f03b7e5d2148a6c0f9e3b1d7a5";
const SEED_B: &str = "A1B2C3D4E5F60718293A4B5C6D7E8F90A1B2C3D4E5F60718293A4B5C6D7E8F90";

fn envelope_for(seed: &str) -> String {
    let public = parse_public_key_pem(HOLDER_PUBLIC).unwrap();
    encrypt_seed(&Secret::from_hex(seed).unwrap(), &public).unwrap()
}

async fn body_json(body: Body) -> serde_json::Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn happy_path_provision_generate_verify() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn SecretStore> = Arc::new(FileSecretStore::new(dir.path().join("seed.txt")));
    let key = parse_private_key_pem(HOLDER_PRIVATE).unwrap();
    let app = operator_api_router(AppState::new(key, store.clone()));

    let response = app
        .clone()
        .oneshot(post(
            "/decrypt-seed",
            serde_json::json!({ "encrypted_seed": envelope_for(SEED_A) }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response.into_body()).await, serde_json::json!({ "status": "ok" }));
    assert_eq!(
        std::fs::read_to_string(dir.path().join("seed.txt")).unwrap(),
        SEED_A
    );

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/generate-2fa").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let generated = body_json(response.into_body()).await;
    let code = generated["code"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 6);
    let valid_for = generated["valid_for"].as_u64().unwrap();
    assert!((1..=30).contains(&valid_for));

    let response = app
        .oneshot(post("/verify-2fa", serde_json::json!({ "code": code })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response.into_body()).await, serde_json::json!({ "valid": true }));
}

#[tokio::test]
async fn tampered_envelope_keeps_previous_seed() {
    let store: Arc<dyn SecretStore> = Arc::new(MemorySecretStore::new());
    let key = parse_private_key_pem(HOLDER_PRIVATE).unwrap();
    let app = operator_api_router(AppState::new(key.clone(), store.clone()));

    provision(&envelope_for(SEED_A), &key, store.as_ref()).unwrap();

    let mut ciphertext = BASE64.decode(envelope_for(SEED_B)).unwrap();
    ciphertext[100] ^= 0x80;
    let tampered = BASE64.encode(&ciphertext);

    assert!(matches!(
        decrypt_seed(&tampered, &key),
        Err(totp_runtime::error::SeedError::Decryption)
    ));

    let response = app
        .oneshot(post("/decrypt-seed", serde_json::json!({ "encrypted_seed": tampered })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response.into_body()).await,
        serde_json::json!({ "error": "Decryption failed" })
    );

    assert_eq!(store.get().unwrap().unwrap().expose_hex(), SEED_A);
}

#[tokio::test]
async fn reprovisioning_replaces_seed() {
    let store = MemorySecretStore::new();
    let key = parse_private_key_pem(HOLDER_PRIVATE).unwrap();

    provision(&envelope_for(SEED_A), &key, &store).unwrap();
    provision(&envelope_for(SEED_B), &key, &store).unwrap();

    let stored = store.get().unwrap().unwrap();
    assert_eq!(stored.expose_hex(), SEED_B);
}

#[tokio::test]
async fn unprovisioned_verify_is_not_a_false_result() {
    let store: Arc<dyn SecretStore> = Arc::new(MemorySecretStore::new());
    let key = parse_private_key_pem(HOLDER_PRIVATE).unwrap();
    let app = operator_api_router(AppState::new(key, store));

    let response = app
        .oneshot(post("/verify-2fa", serde_json::json!({ "code": "123456" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response.into_body()).await,
        serde_json::json!({ "error": "Seed not decrypted yet" })
    );
}

#[test]
fn provisioning_with_wrong_key_reports_seed_error() {
    let store = MemorySecretStore::new();
    let other_key = parse_private_key_pem(include_str!("fixtures/issuer_private.pem")).unwrap();

    let err = provision(&envelope_for(SEED_A), &other_key, &store).unwrap_err();
    assert!(matches!(err, TotpError::Seed(_)));
    assert!(store.get().unwrap().is_none());
}
