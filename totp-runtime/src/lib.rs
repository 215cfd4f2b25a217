//! Runtime for a PKI-provisioned TOTP two-factor service.
//!
//! This crate provides the seed channel (RSA-OAEP delivery of a hex seed), the
//! TOTP engine and windowed verifier, the sign-and-wrap attestation primitive,
//! single-slot seed storage and the HTTP API that exposes them.

pub mod attestation;
pub mod code_log;
pub mod codec;
pub mod config;
pub mod error;
pub mod keys;
pub mod operator_api;
pub mod rate_limit;
pub mod secret;
pub mod seed_channel;
pub mod seed_client;
pub mod store;
pub mod totp;
pub mod verify;

pub use config::RuntimeConfig;
pub use error::{Result, TotpError};
pub use operator_api::{AppState, operator_api_router};
pub use secret::Secret;
pub use store::{FileSecretStore, MemorySecretStore, SecretStore};
pub use totp::{Code, DIGITS, PERIOD_SECS};
