//! hey.fyi server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) plus `HEYFYI_*`
//! environment variables, opens the SQLite store, starts vote replenishment
//! and serves the JSON API until ctrl-c.
//!
//! # First admin
//!
//! A fresh deployment has nobody who can clear facts from moderation. Create
//! (or promote) one with:
//!
//! ```
//! cargo run -p heyfyi-server -- --create-admin root@example.com
//! ```

use std::{
  fs::OpenOptions,
  path::{Path, PathBuf},
  sync::{Arc, Mutex},
};

use anyhow::Context as _;
use clap::Parser;
use heyfyi_api::{AppState, api_router};
use heyfyi_core::notify::Notifier;
use heyfyi_server::{AdminBootstrap, ServerConfig, ServerMailer, ensure_admin, replenish};
use heyfyi_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _};

#[derive(Parser)]
#[command(author, version, about = "hey.fyi server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Make the account with this email an admin, creating it if needed, and
  /// exit. A new account's password is read from stdin.
  #[arg(long, value_name = "EMAIL")]
  create_admin: Option<String>,

  /// Nickname for an admin account created by `--create-admin`.
  #[arg(long, default_value = "admin", requires = "create_admin")]
  nickname: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();
  let cfg = ServerConfig::load(&cli.config).context("failed to load configuration")?;
  init_tracing(cfg.log_file.as_deref())?;

  let store_path = cfg.expanded_store_path();
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  if let Some(email) = &cli.create_admin {
    let outcome = ensure_admin(&store, email, &cli.nickname, read_password).await?;
    let account = outcome.account();
    match &outcome {
      AdminBootstrap::Created(_) => println!("created admin account {}", account.id),
      AdminBootstrap::Promoted(_) => println!("promoted account {} to admin", account.id),
      AdminBootstrap::AlreadyAdmin(_) => println!("account {} is already an admin", account.id),
    }
    return Ok(());
  }

  let store = Arc::new(store);

  let mailer =
    ServerMailer::from_config(cfg.smtp.as_ref()).context("invalid [smtp] configuration")?;
  let notifier = Notifier::new(mailer, cfg.base_url.clone());

  let cancel = CancellationToken::new();
  let replenisher = tokio::spawn(replenish::run(
    store.clone(),
    cfg.vote_grant_interval(),
    cancel.clone(),
  ));

  let app = api_router(AppState::new(store, notifier)).layer(TraceLayer::new_for_http());
  let address = cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal(cancel.clone()))
    .await
    .context("server error")?;

  cancel.cancel();
  replenisher.await.context("vote replenishment task panicked")?;
  Ok(())
}

/// Log to stdout and, when configured, append plain-text lines to a file.
fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<()> {
  let file_layer = match log_file {
    Some(path) => {
      let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {path:?}"))?;
      Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
    }
    None => None,
  };

  tracing_subscriber::registry()
    .with(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with(fmt::layer())
    .with(file_layer)
    .init();
  Ok(())
}

async fn shutdown_signal(cancel: CancellationToken) {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for ctrl-c; running until killed");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutting down");
  cancel.cancel();
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}
