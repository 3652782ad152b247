//! Runtime configuration, read from `config.toml` and `INKTANK_*` environment
//! variables (the environment wins).

use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:           String,
  #[serde(default = "default_port")]
  pub port:           u16,
  #[serde(default = "default_store_path")]
  pub store_path:     PathBuf,
  /// HS256 signing secret for bearer tokens. Required to serve, not to run
  /// `--grant-admin`.
  #[serde(default)]
  pub jwt_secret:     String,
  #[serde(default = "default_token_ttl")]
  pub token_ttl_secs: u64,
  /// Allowed CORS origins; empty allows any origin.
  #[serde(default)]
  pub cors_origins:   Vec<String>,
  pub facebook:       Option<FacebookConfig>,
  pub google:         Option<GoogleConfig>,
}

/// App credentials used to check Facebook user tokens against `debug_token`.
#[derive(Debug, Clone, Deserialize)]
pub struct FacebookConfig {
  pub client_id:     String,
  pub client_secret: String,
}

/// Google tokens are checked by audience alone, so only the client id is read.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
  pub client_id: String,
}

fn default_host() -> String { "127.0.0.1".into() }

fn default_port() -> u16 { 3000 }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/inktank/inktank.db") }

fn default_token_ttl() -> u64 { inktank_api::auth::token::DEFAULT_TTL_SECS }

fn environment() -> config::Environment {
  config::Environment::with_prefix("INKTANK")
    .try_parsing(true)
    .list_separator(",")
    .with_list_parse_key("cors_origins")
}

/// Read `path` (if it exists) and overlay the environment.
pub fn load(path: &Path) -> Result<ServerConfig, config::ConfigError> {
  config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(environment())
    .build()?
    .try_deserialize()
}

#[cfg(test)]
mod tests {
  use config::{File, FileFormat};

  use super::*;

  fn parse(toml: &str) -> ServerConfig {
    config::Config::builder()
      .add_source(File::from_str(toml, FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn defaults_fill_in_missing_keys() {
    let cfg = parse(r#"jwt_secret = "s""#);
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.port, 3000);
    assert_eq!(cfg.token_ttl_secs, 3600);
    assert!(cfg.cors_origins.is_empty());
    assert!(cfg.facebook.is_none());
  }

  #[test]
  fn provider_tables() {
    let cfg = parse(
      r#"
      jwt_secret = "s"
      cors_origins = ["https://inktank.example"]

      [facebook]
      client_id = "fb-app"
      client_secret = "fb-secret"
      "#,
    );
    assert_eq!(cfg.cors_origins, ["https://inktank.example"]);
    let fb = cfg.facebook.unwrap();
    assert_eq!(fb.client_id, "fb-app");
    assert!(cfg.google.is_none());
  }

  #[test]
  fn google_table_needs_only_a_client_id() {
    let cfg = parse(
      r#"
      [google]
      client_id = "g-client"
      "#,
    );
    assert_eq!(cfg.google.unwrap().client_id, "g-client");
    assert!(cfg.facebook.is_none());
  }

  #[test]
  fn wrong_type_is_an_error() {
    let result = config::Config::builder()
      .add_source(File::from_str(r#"port = "high""#, FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize::<ServerConfig>();
    assert!(result.is_err());
  }
}
