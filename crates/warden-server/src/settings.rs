//! Runtime configuration, layered from an optional TOML file and `WARDEN_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;
use warden_core::ingest::DEFAULT_NAMESPACE;

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:        String,
  #[serde(default = "default_port")]
  pub port:        u16,
  #[serde(default = "default_store_path")]
  pub store_path:  PathBuf,
  /// Topic namespace; readers publish on `<namespace>/reader/<reader_id>`.
  #[serde(default = "default_namespace")]
  pub namespace:   String,
  /// Capacity of the reader-event queue.
  #[serde(default = "default_event_queue")]
  pub event_queue: usize,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8123 }

fn default_store_path() -> PathBuf { PathBuf::from("warden.sqlite") }

fn default_namespace() -> String { DEFAULT_NAMESPACE.to_string() }

fn default_event_queue() -> usize { 64 }

impl ServerConfig {
  /// Read `path` (if it exists) and overlay `WARDEN_*` variables.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("WARDEN"))
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  /// `store_path` with a leading `~` expanded.
  pub fn resolved_store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
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

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_file_yields_defaults() {
    let cfg = ServerConfig::load(Path::new("/nonexistent/warden.toml")).unwrap();
    assert_eq!(cfg.port, default_port());
    assert_eq!(cfg.namespace, "access_control");
    assert_eq!(cfg.event_queue, 64);
  }

  #[test]
  fn file_values_override_defaults() {
    let path = std::env::temp_dir().join(format!(
      "warden-config-test-{}.toml",
      std::process::id()
    ));
    std::fs::write(&path, "port = 9000\nnamespace = \"site-a\"\n").unwrap();

    let cfg = ServerConfig::load(&path).unwrap();
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.namespace, "site-a");
    assert_eq!(cfg.address(), "127.0.0.1:9000");

    std::fs::remove_file(&path).unwrap();
  }

  #[test]
  fn plain_paths_are_not_expanded() {
    assert_eq!(
      expand_tilde(Path::new("/var/lib/warden.sqlite")),
      PathBuf::from("/var/lib/warden.sqlite")
    );
  }
}
