mod app;
mod cli;
mod collection;
mod commands;
mod config;
mod csv;
mod error;
mod event;
mod format;
mod logging;
mod remote;
mod shell;
mod snapshot;
mod store;
mod sync;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;

use cli::Cmd;
use store::{KeyValueStore, MemoryStore, SqliteStore};

#[derive(Parser, Debug)]
#[command(name = "cardkeep")]
#[command(about = "Track a trading-card collection and keep it in sync with a GitHub repository")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/cardkeep/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Keep the collection in memory only; nothing is written to disk
  #[arg(long, global = true)]
  ephemeral: bool,

  /// Also log to stderr
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Command to run (default: list)
  #[command(subcommand)]
  command: Option<Cmd>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let _log_guard = logging::init(&store::data_dir()?.join("logs"), args.verbose)?;

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  let store: Arc<dyn KeyValueStore> = if args.ephemeral {
    tracing::info!("Ephemeral session, using in-memory store");
    Arc::new(MemoryStore::new())
  } else {
    Arc::new(SqliteStore::open(config.storage.path.as_deref())?)
  };

  let mut app = app::App::open(config, store).await?;

  match args.command {
    Some(Cmd::Shell) => shell::run(&mut app).await?,
    command => {
      let command = command.unwrap_or(Cmd::List {
        view: Default::default(),
        search: None,
        set: None,
      });
      cli::run(&mut app, command).await?;
      // One-shot commands wait for their push before the process exits
      app.settle().await;
    }
  }

  Ok(())
}
