//! Inktank server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens an
//! in-process SQLite store, and serves the catalog API over HTTP.
//!
//! # Granting admin
//!
//! ```
//! cargo run -p inktank-server -- --grant-admin alice
//! ```

mod settings;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use inktank_api::{
  AppState, AuthContext,
  auth::{
    TokenIssuer,
    provider::{FacebookVerifier, GoogleVerifier},
  },
};
use inktank_core::store::CatalogStore;
use inktank_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::ServerConfig;

#[derive(Parser)]
#[command(author, version, about = "Inktank book catalog server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Give an existing user admin rights and exit.
  #[arg(long, value_name = "USERNAME")]
  grant_admin: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let server_cfg: ServerConfig = settings::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Helper mode: promote a user and exit.
  if let Some(username) = cli.grant_admin {
    let user = store
      .set_admin(username.clone(), true)
      .await
      .context("failed to update user")?
      .with_context(|| format!("no user named {username:?}"))?;
    println!("{} is now an admin", user.username);
    return Ok(());
  }

  if server_cfg.jwt_secret.trim().is_empty() {
    anyhow::bail!("jwt_secret must be set (config.toml or INKTANK_JWT_SECRET)");
  }

  let state = AppState {
    store: Arc::new(store),
    auth:  Arc::new(auth_context(&server_cfg)?),
  };

  let app = inktank_api::router(state)
    .layer(inktank_api::cors_layer(&server_cfg.cors_origins))
    .layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Token issuer plus whichever provider sign-ins are configured.
fn auth_context(cfg: &ServerConfig) -> anyhow::Result<AuthContext> {
  let mut auth =
    AuthContext::new(TokenIssuer::new(cfg.jwt_secret.as_bytes(), cfg.token_ttl_secs));

  if let Some(fb) = &cfg.facebook {
    let verifier = FacebookVerifier::new(fb.client_id.clone(), fb.client_secret.clone())
      .context("failed to build Facebook client")?;
    auth = auth.with_verifier(verifier);
    tracing::info!("Facebook sign-in enabled");
  }
  if let Some(google) = &cfg.google {
    let verifier = GoogleVerifier::new(google.client_id.clone())
      .context("failed to build Google client")?;
    auth = auth.with_verifier(verifier);
    tracing::info!("Google sign-in enabled");
  }

  Ok(auth)
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
