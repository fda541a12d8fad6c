//! reactions-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the
//! configured vote store, and serves the reaction API over HTTP.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for `admin_password_hash`:
//!
//! ```text
//! cargo run -p reactions-server -- --hash-password
//! ```

use std::path::PathBuf;

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::{Parser, Subcommand};
use rand_core::OsRng;
use reactions_api::{AppState, admin::EraseBody};
use reactions_core::{memory::MemoryStore, service::ReactionService, settings::ModeCell, store::VoteStore};
use reactions_server::ServerConfig;
use reactions_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Reaction voting server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,
  /// Remove stored votes and tallies, then exit.
  Erase {
    /// Only votes on these item ids. Repeatable.
    #[arg(long = "item")]
    items:  Vec<i64>,
    /// Only votes cast by these voter ids. Repeatable.
    #[arg(long = "voter")]
    voters: Vec<String>,
    /// Remove every vote. Required when no item or voter is given.
    #[arg(long)]
    all:    bool,
  },
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

  if cli.hash_password {
    let password = read_password()?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    println!("{hash}");
    return Ok(());
  }

  let server_cfg = ServerConfig::load(&cli.config)?;
  let command = cli.command.unwrap_or(Command::Serve);

  if server_cfg.uses_memory_store() {
    tracing::warn!("using the in-memory store; votes are lost on exit");
    run(command, server_cfg, MemoryStore::new()).await
  } else {
    let store_path = server_cfg.resolved_store_path();
    let store = SqliteStore::open(&store_path)
      .await
      .with_context(|| format!("failed to open store at {store_path:?}"))?;
    run(command, server_cfg, store).await
  }
}

async fn run<S>(command: Command, server_cfg: ServerConfig, store: S) -> anyhow::Result<()>
where
  S: VoteStore + 'static,
{
  match command {
    Command::Serve => serve(server_cfg, store).await,
    Command::Erase { items, voters, all } => {
      let filter = EraseBody {
        item_ids: (!items.is_empty()).then_some(items),
        voter_ids: (!voters.is_empty()).then_some(voters),
        all,
      }
      .into_filter()
      .context("invalid erase selection; pass --item, --voter or --all")?;

      let removed = ReactionService::new(store)
        .erase(filter)
        .await
        .context("erase failed")?;
      println!("removed {removed} votes");
      Ok(())
    }
  }
}

async fn serve<S>(server_cfg: ServerConfig, store: S) -> anyhow::Result<()>
where
  S: VoteStore + 'static,
{
  let mut state = AppState::new(store, ModeCell::new(server_cfg.mode))
    .with_identity(server_cfg.identity()?);
  match server_cfg.admin()? {
    Some(admin) => state = state.with_admin(admin),
    None => tracing::info!("admin credentials not configured; /admin routes disabled"),
  }

  let app = reactions_api::router(state);
  let address = server_cfg.address();

  tracing::info!(mode = %server_cfg.mode, "Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutting down");
}

/// Read a password line from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_owned())
}
