/* src/server/core/rust/src/page.rs */

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::store::TemplateKey;
use crate::ttl;

/// One routable page. Field names accept both the legacy config spelling
/// (`URLPattern`, `CacheTTL`, ...) and snake_case.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Page {
  #[serde(default, alias = "Name")]
  pub name: String,
  /// Route pattern with `:param` placeholders, e.g. "/users/:id"
  #[serde(rename = "URLPattern", alias = "url_pattern")]
  pub url_pattern: String,
  /// Backend URL with `:param` placeholders. Pages without one are static.
  #[serde(default, rename = "BackendURLPattern", alias = "backend_url_pattern")]
  pub backend_url_pattern: Option<String>,
  #[serde(default, rename = "Template", alias = "template")]
  pub template: String,
  #[serde(default, rename = "Layout", alias = "layout")]
  pub layout: Option<String>,
  /// Duration string such as "3600s" or "1h"
  #[serde(default, rename = "CacheTTL", alias = "cache_ttl")]
  pub cache_ttl: Option<String>,
  /// Inbound header forwarded to the backend
  #[serde(default, rename = "Header", alias = "header", alias = "pass_header")]
  pub pass_header: Option<String>,
  #[serde(default, rename = "IsArray", alias = "is_array")]
  pub is_array: bool,
  #[serde(default, rename = "Extra", alias = "extra")]
  pub extra: Map<String, Value>,
}

impl Page {
  pub fn template_key(&self) -> TemplateKey {
    TemplateKey::for_page(&self.template, self.layout.as_deref())
  }

  pub fn has_backend(&self) -> bool {
    self.backend_url_pattern.is_some()
  }

  pub fn cache_control(&self) -> String {
    ttl::cache_control(self.cache_ttl.as_deref())
  }

  /// Treat empty optional strings as absent.
  pub(crate) fn normalize(&mut self) {
    let fields =
      [&mut self.backend_url_pattern, &mut self.layout, &mut self.cache_ttl, &mut self.pass_header];
    for field in fields {
      if field.as_deref().is_some_and(|s| s.trim().is_empty()) {
        *field = None;
      }
    }
  }

  /// Fill in global extra keys the page does not define itself.
  pub(crate) fn inherit_extra(&mut self, global: &Map<String, Value>) {
    for (k, v) in global {
      self.extra.entry(k.clone()).or_insert_with(|| v.clone());
    }
  }
}
