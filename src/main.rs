mod app;
mod commands;
mod config;
mod event;
mod store;
mod ui;
mod users;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;

use crate::store::persist::{MemoryStateStore, SqliteStateStore};

#[derive(Parser, Debug)]
#[command(name = "udash")]
#[command(about = "A terminal dashboard for managing users")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/udash/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Rows per page in the user table
  #[arg(long)]
  page_size: Option<u32>,

  /// Keep all state in memory; nothing is persisted
  #[arg(long)]
  ephemeral: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let config = config::Config::load(args.config.as_deref())?;
  let config = if let Some(page_size) = args.page_size {
    config::Config {
      page_size: Some(page_size),
      ..config
    }
  } else {
    config
  };

  // Logs go to a file; the terminal belongs to the UI.
  let state_path = match &config.state_path {
    Some(path) => path.clone(),
    None => SqliteStateStore::default_path()?,
  };
  let log_dir = state_path.parent().map(PathBuf::from).unwrap_or_default();
  let (file_writer, _log_guard) = tracing_appender::non_blocking(
    tracing_appender::rolling::never(log_dir, "udash.log"),
  );
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("udash=info")),
    )
    .with_writer(file_writer)
    .with_ansi(false)
    .init();

  if args.ephemeral {
    let state = Arc::new(MemoryStateStore::new());
    let mut app = app::App::new(&config, state);
    app.run().await
  } else {
    let state = Arc::new(SqliteStateStore::open_at(&state_path)?);
    let mut app = app::App::new(&config, state);
    app.run().await
  }
}
