/* src/server/core/rust/src/config.rs */

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::errors::Error;
use crate::page::Page;
use crate::ttl;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub pages: Vec<Page>,
  /// Template name -> path of the template source
  #[serde(default)]
  pub templates: HashMap<String, PathBuf>,
  /// Layout name -> path of the layout source
  #[serde(default)]
  pub layouts: HashMap<String, PathBuf>,
  /// Data shared by every page; page-level keys take precedence
  #[serde(default)]
  pub extra: Map<String, Value>,
  /// Directory searched for `{{> partial}}` includes
  #[serde(default)]
  pub partials_dir: Option<PathBuf>,
  #[serde(default)]
  pub backend: BackendConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
  /// Reuse backend responses according to their HTTP caching headers
  #[serde(default = "default_cache")]
  pub cache: bool,
  /// Per-request timeout, e.g. "5s". No timeout when absent.
  #[serde(default)]
  pub timeout: Option<String>,
}

fn default_cache() -> bool {
  true
}

impl Default for BackendConfig {
  fn default() -> Self {
    Self { cache: true, timeout: None }
  }
}

impl BackendConfig {
  pub fn timeout(&self) -> Option<Duration> {
    self.timeout.as_deref().and_then(ttl::parse_duration)
  }
}

impl Config {
  pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
      .map_err(|e| Error::config(format!("read {}: {e}", path.display())))?;
    Self::parse(&content)
  }

  /// Parse JSON (when the document starts with `{`) or YAML.
  pub fn parse(content: &str) -> Result<Self, Error> {
    let mut cfg: Config = if content.trim_start().starts_with('{') {
      serde_json::from_str(content).map_err(|e| Error::config(format!("parse json: {e}")))?
    } else {
      serde_yaml::from_str(content).map_err(|e| Error::config(format!("parse yaml: {e}")))?
    };

    for page in &mut cfg.pages {
      page.normalize();
      page.inherit_extra(&cfg.extra);
    }
    Ok(cfg)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_json() {
    let cfg = Config::parse(
      r#"{
  "templates": {"home": "templates/home.mustache"},
  "layouts": {"main": "layouts/main.mustache"},
  "extra": {"site": "example"},
  "pages": [
    {"name": "home", "URLPattern": "/", "Template": "home", "Layout": "main", "CacheTTL": "60s"}
  ]
}"#,
    )
    .unwrap();
    assert_eq!(cfg.pages.len(), 1);
    assert_eq!(cfg.templates["home"], PathBuf::from("templates/home.mustache"));
    assert_eq!(cfg.pages[0].extra["site"], "example");
    assert!(cfg.backend.cache);
  }

  #[test]
  fn parse_yaml() {
    let cfg = Config::parse(
      r#"
templates:
  post: post.mustache
backend:
  cache: false
  timeout: 2s
pages:
  - name: post
    url_pattern: /posts/:id
    backend_url_pattern: https://api.example.com/posts/:id
    template: post
    is_array: false
"#,
    )
    .unwrap();
    assert_eq!(cfg.pages[0].backend_url_pattern.as_deref(), Some("https://api.example.com/posts/:id"));
    assert!(!cfg.backend.cache);
    assert_eq!(cfg.backend.timeout(), Some(Duration::from_secs(2)));
  }

  #[test]
  fn malformed_json_is_config_error() {
    let err = Config::parse("{\n\"templates\":{\n}").unwrap_err();
    assert!(matches!(err, Error::Config(_)));
  }

  #[test]
  fn missing_file_is_config_error() {
    let err = Config::from_path("/definitely/not/here.json").unwrap_err();
    assert!(matches!(err, Error::Config(_)));
  }

  #[test]
  fn from_path_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"pages": [{"URLPattern": "/a", "Template": "a", "BackendURLPattern": ""}]}"#)
      .unwrap();
    let cfg = Config::from_path(&path).unwrap();
    assert!(!cfg.pages[0].has_backend());
  }
}
