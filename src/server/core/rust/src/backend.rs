/* src/server/core/rust/src/backend.rs */

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use http_cache_reqwest::{Cache, CacheMode, HttpCache, HttpCacheOptions, MokaManager};
use regex::{Captures, Regex};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};

use crate::config::BackendConfig;
use crate::errors::Error;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Source of the raw payload for dynamic pages.
pub trait Backend: Send + Sync {
  fn fetch<'a>(
    &'a self,
    params: &'a HashMap<String, String>,
    headers: &'a HashMap<String, String>,
  ) -> BoxFuture<'a, Result<Bytes, Error>>;
}

/// Substitute `:name` placeholders with matching params. Names may contain
/// any character a route segment can; the longest name wins, so `:idx` is
/// never read as `:id`. Placeholders without a param are kept verbatim.
pub fn replace_params(pattern: &str, params: &HashMap<String, String>) -> String {
  let mut names: Vec<&str> =
    params.keys().map(String::as_str).filter(|k| !k.is_empty()).collect();
  if names.is_empty() {
    return pattern.to_string();
  }
  names.sort_unstable_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

  let alternation = names.iter().map(|name| regex::escape(name)).collect::<Vec<_>>().join("|");
  let Ok(placeholder) = Regex::new(&format!(":({alternation})")) else {
    return pattern.to_string();
  };
  placeholder
    .replace_all(pattern, |caps: &Captures<'_>| {
      params.get(&caps[1]).cloned().unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}

/// HTTP clients shared by every dynamic page: one plain, one honouring HTTP
/// caching headers with an in-memory store.
#[derive(Clone)]
pub struct BackendClients {
  direct: ClientWithMiddleware,
  cached: ClientWithMiddleware,
  use_cache: bool,
}

impl BackendClients {
  pub fn new(cfg: &BackendConfig) -> Result<Self, Error> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = cfg.timeout() {
      builder = builder.timeout(timeout);
    }
    let client = builder.build().map_err(|e| Error::backend(e.to_string()))?;

    let direct = ClientBuilder::new(client.clone()).build();
    let cached = ClientBuilder::new(client)
      .with(Cache(HttpCache {
        mode: CacheMode::Default,
        manager: MokaManager::default(),
        options: HttpCacheOptions::default(),
      }))
      .build();
    Ok(Self { direct, cached, use_cache: cfg.cache })
  }

  /// Backend for `url_pattern` using the configured client policy.
  pub fn backend(&self, url_pattern: &str) -> HttpBackend {
    if self.use_cache { self.cached_backend(url_pattern) } else { self.direct_backend(url_pattern) }
  }

  pub fn direct_backend(&self, url_pattern: &str) -> HttpBackend {
    HttpBackend::new(url_pattern, self.direct.clone())
  }

  pub fn cached_backend(&self, url_pattern: &str) -> HttpBackend {
    HttpBackend::new(url_pattern, self.cached.clone())
  }
}

/// GETs a parametrized URL. The response status is not inspected.
pub struct HttpBackend {
  url_pattern: String,
  client: ClientWithMiddleware,
}

impl HttpBackend {
  pub fn new(url_pattern: impl Into<String>, client: ClientWithMiddleware) -> Self {
    Self { url_pattern: url_pattern.into(), client }
  }

  async fn get(
    &self,
    params: &HashMap<String, String>,
    headers: &HashMap<String, String>,
  ) -> Result<Bytes, Error> {
    let url = replace_params(&self.url_pattern, params);
    tracing::debug!(%url, "backend request");

    let mut req = self.client.get(&url);
    for (name, value) in headers {
      req = req.header(name.as_str(), value.as_str());
    }
    let resp = req.send().await.map_err(|e| Error::backend(format!("GET {url}: {e}")))?;
    tracing::debug!(%url, status = resp.status().as_u16(), "backend response");
    resp.bytes().await.map_err(|e| Error::backend(format!("read body from {url}: {e}")))
  }
}

impl Backend for HttpBackend {
  fn fetch<'a>(
    &'a self,
    params: &'a HashMap<String, String>,
    headers: &'a HashMap<String, String>,
  ) -> BoxFuture<'a, Result<Bytes, Error>> {
    Box::pin(self.get(params, headers))
  }
}
