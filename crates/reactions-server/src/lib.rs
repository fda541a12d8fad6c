//! Server configuration and wiring for the reaction service binary.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use axum::http::HeaderName;
use reactions_api::{AuthConfig, IdentityConfig, voter};
use reactions_core::reaction::Mode;
use serde::Deserialize;

/// `store_path` value selecting the process-local store.
pub const MEMORY_STORE: &str = ":memory:";

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` layered with
/// `REACTIONS_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                String,
  pub port:                u16,
  /// Initial reaction mode; admins may change it at runtime.
  pub mode:                Mode,
  pub store_path:          PathBuf,
  pub voter_header:        String,
  pub voter_cookie:        String,
  pub admin_username:      Option<String>,
  pub admin_password_hash: Option<String>,
}

impl ServerConfig {
  /// Read `path` (optional) and the environment on top of built-in defaults.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .set_default("host", "127.0.0.1")?
      .set_default("port", 8080)?
      .set_default("mode", Mode::default().as_str())?
      .set_default("store_path", "reactions.db")?
      .set_default("voter_header", voter::DEFAULT_VOTER_HEADER)?
      .set_default("voter_cookie", voter::DEFAULT_VOTER_COOKIE)?
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("REACTIONS"))
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn uses_memory_store(&self) -> bool { self.store_path.as_os_str() == MEMORY_STORE }

  /// The store path with a leading `~` expanded.
  pub fn resolved_store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }

  pub fn identity(&self) -> anyhow::Result<IdentityConfig> {
    let header = HeaderName::from_bytes(self.voter_header.to_ascii_lowercase().as_bytes())
      .with_context(|| format!("invalid voter_header {:?}", self.voter_header))?;
    anyhow::ensure!(!self.voter_cookie.is_empty(), "voter_cookie must not be empty");
    Ok(IdentityConfig { header, cookie: self.voter_cookie.clone() })
  }

  /// Admin credentials, if configured. Setting only one of the two is an error.
  pub fn admin(&self) -> anyhow::Result<Option<AuthConfig>> {
    match (&self.admin_username, &self.admin_password_hash) {
      (Some(username), Some(password_hash)) => Ok(Some(AuthConfig {
        username:      username.clone(),
        password_hash: password_hash.clone(),
      })),
      (None, None) => Ok(None),
      _ => anyhow::bail!("admin_username and admin_password_hash must be set together"),
    }
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn write_config(contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("reactions-{}.toml", uuid::Uuid::new_v4()));
    std::fs::write(&path, contents).unwrap();
    path
  }

  #[test]
  fn missing_file_falls_back_to_defaults() {
    let cfg = ServerConfig::load(Path::new("/nonexistent/reactions.toml")).unwrap();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.mode, Mode::LikeDislike);
    assert_eq!(cfg.identity().unwrap().header.as_str(), "x-voter-id");
    assert!(cfg.admin().unwrap().is_none());
  }

  #[test]
  fn file_values_override_defaults() {
    let path = write_config(
      r#"
      port = 9000
      mode = "like_only"
      store_path = ":memory:"
      voter_header = "X-Session-Id"
      admin_username = "admin"
      admin_password_hash = "$argon2id$stub"
      "#,
    );
    let cfg = ServerConfig::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(cfg.address(), "127.0.0.1:9000");
    assert_eq!(cfg.mode, Mode::LikeOnly);
    assert!(cfg.uses_memory_store());
    assert_eq!(cfg.identity().unwrap().header.as_str(), "x-session-id");
    assert_eq!(cfg.admin().unwrap().unwrap().username, "admin");
  }

  #[test]
  fn half_configured_admin_is_an_error() {
    let path = write_config("admin_username = \"admin\"\n");
    let cfg = ServerConfig::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert!(cfg.admin().is_err());
  }

  #[test]
  fn unknown_mode_fails_to_load() {
    let path = write_config("mode = \"dislike_only\"\n");
    let res = ServerConfig::load(&path);
    std::fs::remove_file(&path).unwrap();
    assert!(res.is_err());
  }

  #[test]
  fn tilde_expands_to_home() {
    if let Ok(home) = std::env::var("HOME") {
      assert_eq!(expand_tilde(Path::new("~/r.db")), PathBuf::from(home).join("r.db"));
    }
    assert_eq!(expand_tilde(Path::new("/tmp/r.db")), PathBuf::from("/tmp/r.db"));
  }
}
