use anyhow::{bail, Context, Result};
use backend_lib::{
    auth::PasswordHasherConfig,
    bootstrap,
    config::Settings,
    push::{VapidKeys, WebPushDispatcher},
    router,
    storage::FlatFileStorage,
    AppState,
};
use clap::{Parser, Subcommand};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Account and Web Push relay server
#[derive(Debug, Parser)]
#[command(name = "pushrelay", version, about)]
struct Cli {
    /// TOML config file (defaults to ./pushrelay.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Re-hash the administrator's password in place
    ResetAdminPassword {
        #[arg(long)]
        password: String,
    },
    /// Generate a VAPID key pair
    GenerateVapidKeys {
        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn load_settings(path: Option<&PathBuf>) -> Result<Settings> {
    match path {
        Some(path) => {
            if !path.exists() {
                bail!("config file {} not found", path.display());
            }
            Settings::load_from(path)
        },
        None => Settings::load(),
    }
}

/// `RUST_LOG` takes precedence over the configured level
fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_ref()).context("failed to load configuration")?;
    init_tracing(&settings.log_level, settings.log_format == "json");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(settings).await,
        Command::ResetAdminPassword { password } => reset_admin_password(settings, &password).await,
        Command::GenerateVapidKeys { output } => generate_vapid_keys(output),
    }
}

async fn serve(settings: Settings) -> Result<()> {
    if settings.uses_default_secret() {
        warn!("auth.jwt_secret is the built-in default; set JWT_SECRET or PUSHRELAY_AUTH__JWT_SECRET");
    }

    let storage = FlatFileStorage::new(&settings.storage.path).with_context(|| {
        format!("failed to open user store at {}", settings.storage.path.display())
    })?;
    let hasher = PasswordHasherConfig::new(settings.auth.hash_cost)?;
    bootstrap::run(&storage, &settings.auth, hasher).await?;

    let keys = match VapidKeys::from_settings(&settings.push) {
        Ok(Some(keys)) => {
            info!(public_key = keys.public_key_base64url(), "VAPID keys loaded");
            Some(keys)
        },
        Ok(None) => {
            warn!(
                keys_file = %settings.push.keys_file.display(),
                "no VAPID keys configured, push delivery will fail"
            );
            None
        },
        Err(e) => {
            warn!(error = %e, "VAPID keys unusable, push delivery will fail");
            None
        },
    };
    let dispatcher = WebPushDispatcher::with_default_client(keys, settings.push.subject.clone())?;

    let addr = settings.bind_addr()?;
    let state = Arc::new(AppState::new(storage, settings, Arc::new(dispatcher))?);
    let app = router::create_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShutdownReason {
    Interrupt,
    Terminate,
}

/// First of the two signals wins
async fn wait_for_shutdown(
    interrupt: impl Future<Output = ()>,
    terminate: impl Future<Output = ()>,
) -> ShutdownReason {
    tokio::select! {
        () = interrupt => ShutdownReason::Interrupt,
        () = terminate => ShutdownReason::Terminate,
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            },
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let reason = wait_for_shutdown(interrupt, terminate).await;
    info!(?reason, "shutdown signal received");
}

async fn reset_admin_password(settings: Settings, password: &str) -> Result<()> {
    let storage = FlatFileStorage::new(&settings.storage.path).with_context(|| {
        format!("failed to open user store at {}", settings.storage.path.display())
    })?;
    let hasher = PasswordHasherConfig::new(settings.auth.hash_cost)?;
    let id = bootstrap::reset_admin_password(
        &storage,
        &settings.auth.admin_username,
        password,
        hasher,
    )
    .await?;
    info!(%id, username = %settings.auth.admin_username, "password updated");
    Ok(())
}

fn generate_vapid_keys(output: Option<PathBuf>) -> Result<()> {
    let keys = VapidKeys::generate();
    match output {
        Some(path) => {
            keys.write_file(&path)?;
            info!(path = %path.display(), "VAPID keys written");
        },
        None => print!("{}", keys.to_json_pretty()),
    }
    Ok(())
}
