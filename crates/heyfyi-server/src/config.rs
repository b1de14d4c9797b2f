//! Server configuration.
//!
//! Values come from an optional TOML file layered under `HEYFYI_*`
//! environment variables. Nested keys use a double underscore, e.g.
//! `HEYFYI_SMTP__HOST`.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use config::{Config, ConfigBuilder, ConfigError, Environment, File, builder::DefaultState};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                     String,
  pub port:                     u16,
  /// Public site root used in emailed links.
  pub base_url:                 String,
  pub store_path:               PathBuf,
  pub vote_grant_interval_secs: u64,
  /// Also append log output to this file.
  pub log_file:                 Option<PathBuf>,
  /// Without this section, emails are logged instead of sent.
  pub smtp:                     Option<SmtpConfig>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                     "127.0.0.1".to_owned(),
      port:                     3000,
      base_url:                 "http://localhost:3000".to_owned(),
      store_path:               PathBuf::from("heyfyi.sqlite3"),
      vote_grant_interval_secs: 3600,
      log_file:                 None,
      smtp:                     None,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
  pub host:         String,
  #[serde(default = "default_smtp_port")]
  pub port:         u16,
  #[serde(default = "default_from_address")]
  pub from_address: String,
  pub username:     Option<String>,
  pub password:     Option<String>,
  /// Upgrade the connection with STARTTLS. Plain SMTP otherwise.
  #[serde(default)]
  pub starttls:     bool,
}

fn default_smtp_port() -> u16 { 25 }

fn default_from_address() -> String { "noreply@hey.fyi".to_owned() }

impl ServerConfig {
  /// Read `path` (if it exists) and the environment.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    Self::from_builder(Config::builder().add_source(File::from(path).required(false)))
  }

  fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
    builder
      .add_source(
        Environment::with_prefix("HEYFYI")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn vote_grant_interval(&self) -> Duration {
    Duration::from_secs(self.vote_grant_interval_secs.max(1))
  }

  /// `store_path` with a leading `~` expanded to the home directory.
  pub fn expanded_store_path(&self) -> PathBuf {
    let s = self.store_path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/")
      && let Ok(home) = std::env::var("HOME")
    {
      return PathBuf::from(home).join(rest);
    }
    self.store_path.clone()
  }
}
