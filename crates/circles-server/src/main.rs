//! circles server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), loads the
//! allow-list, opens the SQLite store, and serves the board over HTTP.
//!
//! Any setting can be overridden from the environment, nesting with `__`:
//!
//! ```text
//! CIRCLES_PORT=9000 CIRCLES_OAUTH__CLIENT_SECRET=... circles
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use circles_core::gate::{AllowList, IdentityGate};
use circles_server::{AppState, ServerConfig, oauth::OAuthClient};
use circles_store_sqlite::SqliteStore;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Circles discussion board server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
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

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("CIRCLES")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // The allow-list is read once; edits take effect on restart.
  let allow_path = expand_tilde(&server_cfg.allow_list_path);
  let allow_json = std::fs::read_to_string(&allow_path)
    .with_context(|| format!("failed to read allow-list at {allow_path:?}"))?;
  let allow_list = AllowList::from_json(&allow_json)
    .with_context(|| format!("failed to parse allow-list at {allow_path:?}"))?;
  tracing::info!(entries = allow_list.len(), "loaded allow-list");

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = Arc::new(
    SqliteStore::open(&store_path)
      .await
      .with_context(|| format!("failed to open store at {store_path:?}"))?,
  );

  let provider = OAuthClient::new(server_cfg.oauth.clone(), &server_cfg.base_url)?;
  let state = AppState {
    gate:   Arc::new(IdentityGate::new(provider, store.clone(), Arc::new(allow_list))),
    store,
    config: Arc::new(server_cfg.clone()),
  };

  let app = circles_server::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
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
