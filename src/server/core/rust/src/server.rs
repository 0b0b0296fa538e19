/* src/server/core/rust/src/server.rs */

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;

use crate::backend::BackendClients;
use crate::config::Config;
use crate::errors::Error;
use crate::factory::PageFactory;
use crate::handler::PageHandler;
use crate::store::TemplateStore;

/// Static bodies served instead of bare error statuses.
#[derive(Debug, Clone, Default)]
pub struct ErrorPages {
  pub not_found: Option<Bytes>,
  pub server_error: Option<Bytes>,
}

impl ErrorPages {
  /// Read `<dir>/404` and `<dir>/500`; missing files leave that page unset.
  pub fn load(dir: impl AsRef<Path>) -> Self {
    let dir = dir.as_ref();
    let read = |name: &str| {
      let path = dir.join(name);
      match std::fs::read(&path) {
        Ok(content) => {
          tracing::info!(path = %path.display(), "custom error page registered");
          Some(Bytes::from(content))
        }
        Err(_) => {
          tracing::info!(status = name, "using the default error response");
          None
        }
      }
    };
    Self { not_found: read("404"), server_error: read("500") }
  }
}

/// Framework-agnostic parts extracted from `PagewireServer`.
/// Adapter crates consume this to build framework-specific routers.
pub struct ServerParts {
  pub handlers: Vec<Arc<PageHandler>>,
  pub factory: Arc<PageFactory>,
  pub error_pages: ErrorPages,
  /// Enables the template upload endpoint
  pub devel: bool,
}

pub struct PagewireServer {
  handlers: Vec<Arc<PageHandler>>,
  factory: Arc<PageFactory>,
  error_pages: ErrorPages,
  devel: bool,
}

impl PagewireServer {
  /// Compile templates and spawn page handlers for `cfg`. Must be called from
  /// within a tokio runtime.
  pub fn from_config(cfg: &Config) -> Result<Self, Error> {
    let store = TemplateStore::new();
    let clients = BackendClients::new(&cfg.backend)?;
    let factory = Arc::new(PageFactory::new(store, cfg.partials_dir.clone()));
    let handlers = factory.build(cfg, &clients)?;
    Ok(Self { handlers, factory, error_pages: ErrorPages::default(), devel: false })
  }

  pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
    Self::from_config(&Config::from_path(path)?)
  }

  pub fn devel(mut self, devel: bool) -> Self {
    self.devel = devel;
    self
  }

  pub fn error_pages(mut self, pages: ErrorPages) -> Self {
    self.error_pages = pages;
    self
  }

  pub fn handlers(&self) -> &[Arc<PageHandler>] {
    &self.handlers
  }

  pub fn factory(&self) -> &Arc<PageFactory> {
    &self.factory
  }

  /// Consume the builder, returning framework-agnostic parts for an adapter.
  pub fn into_parts(self) -> ServerParts {
    ServerParts {
      handlers: self.handlers,
      factory: self.factory,
      error_pages: self.error_pages,
      devel: self.devel,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn error_pages_from_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("500"), "oops").unwrap();
    let pages = ErrorPages::load(dir.path());
    assert_eq!(pages.server_error.as_deref(), Some(&b"oops"[..]));
    assert!(pages.not_found.is_none());
  }

  #[tokio::test]
  async fn from_config_builds_handlers() {
    let cfg = Config::parse(r#"{"pages": [{"URLPattern": "/", "Template": "home"}]}"#).unwrap();
    let server = PagewireServer::from_config(&cfg).unwrap().devel(true);
    assert_eq!(server.handlers().len(), 1);
    let parts = server.into_parts();
    assert!(parts.devel);
    assert_eq!(parts.handlers[0].template_key().as_str(), "home");
  }

  #[tokio::test]
  async fn from_path_reports_missing_config() {
    assert!(matches!(PagewireServer::from_path("/nope/config.json"), Err(Error::Config(_))));
  }
}
