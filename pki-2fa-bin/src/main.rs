//! `pki-2fa`: seed provisioning CLI and TOTP HTTP service.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use totp_runtime::keys::{load_private_key, load_public_key, read_pem};
use totp_runtime::seed_client::{SeedRequest, request_seed, save_envelope};
use totp_runtime::store::{FileSecretStore, SecretStore};
use totp_runtime::{
    AppState, Result, RuntimeConfig, TotpError, attestation, code_log, operator_api_router,
    seed_channel, totp,
};

#[derive(Debug, Parser)]
#[command(name = "pki-2fa", version, about = "PKI-provisioned TOTP two-factor service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Serve the HTTP API.
    Serve {
        /// Overrides PKI2FA_BIND.
        #[arg(long)]
        bind: Option<String>,
    },
    /// Ask the issuer for an encrypted seed and save the envelope.
    RequestSeed {
        #[arg(long)]
        student_id: String,
        #[arg(long)]
        repo_url: String,
        /// Overrides PKI2FA_ISSUER_URL.
        #[arg(long)]
        issuer_url: Option<String>,
        #[arg(long, default_value = "encrypted_seed.txt")]
        out: PathBuf,
    },
    /// Decrypt an envelope file into the seed store.
    DecryptSeed {
        #[arg(default_value = "encrypted_seed.txt")]
        envelope: PathBuf,
    },
    /// Print the current code from the stored seed.
    Code {
        /// Also print an otpauth:// URI with this account label.
        #[arg(long)]
        label: Option<String>,
        #[arg(long, default_value = "pki-2fa")]
        issuer: String,
    },
    /// Sign a commit hash and encrypt the signature for the issuer.
    CommitProof {
        /// Defaults to the HEAD commit of the current repository.
        commit: Option<String>,
        /// Print the bare base64 signature instead of the issuer-wrapped one.
        #[arg(long)]
        raw: bool,
    },
}

#[tokio::main]
async fn main() {
    setup_log();

    let cli = Cli::parse();
    let config = RuntimeConfig::load();

    if let Err(e) = execute(cli.command, config).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn execute(command: Commands, config: &RuntimeConfig) -> Result<()> {
    match command {
        Commands::Serve { bind } => serve(config, bind).await,
        Commands::RequestSeed {
            student_id,
            repo_url,
            issuer_url,
            out,
        } => {
            let url = match issuer_url {
                Some(url) => url,
                None => config.issuer_url()?.to_string(),
            };
            let public_key = read_pem(&config.public_key_path)?;
            let request = SeedRequest {
                student_id: &student_id,
                github_repo_url: &repo_url,
                public_key: &public_key,
            };
            let envelope = request_seed(&url, &request, config.timeout).await?;
            save_envelope(&out, &envelope).await?;
            println!("Encrypted seed saved to {}", out.display());
            Ok(())
        }
        Commands::DecryptSeed { envelope } => {
            let text = tokio::fs::read_to_string(&envelope)
                .await
                .map_err(|e| TotpError::Storage(format!("reading {}: {e}", envelope.display())))?;
            let key = load_private_key(&config.private_key_path)?;
            let store = FileSecretStore::new(&config.seed_path);
            seed_channel::provision(&text, &key, &store)?;
            println!("Seed stored at {}", config.seed_path.display());
            Ok(())
        }
        Commands::Code { label, issuer } => {
            let store = FileSecretStore::new(&config.seed_path);
            let secret = store.get()?.ok_or(TotpError::SecretNotProvisioned)?;
            let (code, valid_for) = totp::current_code(&secret);
            println!("{code} (valid for {valid_for}s)");
            if let Some(label) = label {
                println!("{}", totp::otpauth_uri(&secret, &label, &issuer));
            }
            Ok(())
        }
        Commands::CommitProof { commit, raw } => {
            let commit = match commit {
                Some(commit) => commit,
                None => head_commit()?,
            };
            let private_key = load_private_key(&config.private_key_path)?;
            if raw {
                let signature = attestation::sign_encoded(commit.as_bytes(), &private_key)?;
                println!("Commit Hash:\n{commit}\n");
                println!("Signature:\n{signature}");
                return Ok(());
            }
            let issuer_key = load_public_key(&config.issuer_public_key_path)?;
            let proof = attestation::attest(commit.as_bytes(), &private_key, &issuer_key)?;
            println!("Commit Hash:\n{commit}\n");
            println!("Encrypted Signature:\n{proof}");
            Ok(())
        }
    }
}

async fn serve(config: &RuntimeConfig, bind: Option<String>) -> Result<()> {
    let addr: SocketAddr = match bind {
        Some(bind) => bind
            .parse()
            .map_err(|e| TotpError::Config(format!("invalid bind address '{bind}': {e}")))?,
        None => config.bind_addr()?,
    };
    let private_key = load_private_key(&config.private_key_path)?;
    let store: Arc<dyn SecretStore> = Arc::new(FileSecretStore::new(&config.seed_path));

    if config.code_log_interval > 0 {
        spawn_code_log(
            store.clone(),
            config.code_log_interval,
            config.code_log_path.clone(),
        );
    }

    let router = operator_api_router(AppState::new(private_key, store));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| TotpError::Config(format!("binding {addr}: {e}")))?;
    info!(%addr, seed_path = %config.seed_path.display(), "Starting 2FA API");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| TotpError::Http(format!("server error: {e}")))?;

    info!("2FA API stopped");
    Ok(())
}

fn spawn_code_log(store: Arc<dyn SecretStore>, interval_secs: u64, sink: Option<PathBuf>) {
    info!(interval_secs, sink = ?sink, "Starting code logger");
    tokio::spawn(code_log::run(store, Duration::from_secs(interval_secs), sink));
}

fn head_commit() -> Result<String> {
    let output = Command::new("git")
        .args(["log", "-1", "--format=%H"])
        .output()
        .map_err(|e| TotpError::Config(format!("running git: {e}")))?;
    if !output.status.success() {
        return Err(TotpError::Config(format!(
            "git log failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if hash.is_empty() {
        return Err(TotpError::Config("no commits found".into()));
    }
    Ok(hash)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

fn setup_log() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pki_2fa=info,totp_runtime=info"));
    if tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .try_init()
        .is_err()
    {}
}
