/* src/server/core/rust/src/response.rs */

use std::collections::HashMap;
use std::sync::Arc;

use http::{HeaderMap, HeaderName};
use serde_json::{Map, Value, json};

use crate::backend::{Backend, BackendClients};
use crate::decode::Decoder;
use crate::errors::Error;
use crate::page::Page;

/// Framework-agnostic view of an inbound page request.
#[derive(Debug, Clone, Default)]
pub struct PageRequest {
  pub path: String,
  pub query: HashMap<String, String>,
  /// Route parameters extracted by the router
  pub params: HashMap<String, String>,
  pub headers: HeaderMap,
}

/// Request details exposed to templates as `context`.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
  pub path: String,
  pub query: HashMap<String, String>,
}

impl From<&PageRequest> for RequestContext {
  fn from(req: &PageRequest) -> Self {
    Self { path: req.path.clone(), query: req.query.clone() }
  }
}

/// Helpers available to templates as `helper`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateHelper;

impl TemplateHelper {
  pub fn now(self) -> String {
    chrono::Utc::now().to_rfc3339()
  }
}

/// Per-request data handed to a renderer.
#[derive(Debug, Clone, Default)]
pub struct ResponseContext {
  /// Backend payload decoded as an object
  pub data: Option<Map<String, Value>>,
  /// Backend payload decoded as an array
  pub array: Option<Vec<Map<String, Value>>>,
  pub extra: Map<String, Value>,
  pub params: HashMap<String, String>,
  pub helper: TemplateHelper,
  pub request: RequestContext,
}

impl ResponseContext {
  fn for_request(page_extra: &Map<String, Value>, req: &PageRequest) -> Self {
    Self {
      data: None,
      array: None,
      extra: page_extra.clone(),
      params: req.params.clone(),
      helper: TemplateHelper,
      request: RequestContext::from(req),
    }
  }

  /// The value templates are rendered against.
  pub fn to_value(&self) -> Value {
    json!({
      "data": self.data.clone().unwrap_or_default(),
      "array": self.array.clone().unwrap_or_default(),
      "extra": self.extra,
      "params": self.params,
      "helper": { "now": self.helper.now() },
      "context": {
        "path": self.request.path,
        "query": self.request.query,
      },
    })
  }
}

/// Copies route params and page extra data; never calls out.
pub struct StaticGenerator {
  extra: Map<String, Value>,
}

impl StaticGenerator {
  pub fn new(page: &Page) -> Self {
    Self { extra: page.extra.clone() }
  }

  pub fn generate(&self, req: &PageRequest) -> ResponseContext {
    ResponseContext::for_request(&self.extra, req)
  }
}

/// Fetches the page payload from a backend and decodes it into the context.
pub struct DynamicGenerator {
  extra: Map<String, Value>,
  pass_header: Option<HeaderName>,
  backend: Arc<dyn Backend>,
  decoder: Decoder,
}

impl DynamicGenerator {
  pub fn new(page: &Page, backend: Arc<dyn Backend>) -> Result<Self, Error> {
    let pass_header = match page.pass_header.as_deref() {
      Some(name) => Some(
        HeaderName::try_from(name)
          .map_err(|e| Error::config(format!("page '{}': header '{name}': {e}", page.name)))?,
      ),
      None => None,
    };
    Ok(Self { extra: page.extra.clone(), pass_header, backend, decoder: Decoder::for_page(page) })
  }

  pub async fn generate(&self, req: &PageRequest) -> Result<ResponseContext, Error> {
    let mut ctx = ResponseContext::for_request(&self.extra, req);

    let mut headers = HashMap::new();
    if let Some(ref name) = self.pass_header
      && let Some(value) = req.headers.get(name).and_then(|v| v.to_str().ok())
      && !value.is_empty()
    {
      headers.insert(name.as_str().to_string(), value.to_string());
    }

    let body = self.backend.fetch(&ctx.params, &headers).await?;
    self.decoder.decode(&body, &mut ctx)?;
    Ok(ctx)
  }
}

pub enum ResponseGenerator {
  Static(StaticGenerator),
  Dynamic(DynamicGenerator),
}

impl ResponseGenerator {
  /// Static generator for pages without a backend, dynamic otherwise.
  pub fn for_page(page: &Page, clients: &BackendClients) -> Result<Self, Error> {
    match page.backend_url_pattern.as_deref() {
      None => Ok(Self::Static(StaticGenerator::new(page))),
      Some(pattern) => {
        let backend: Arc<dyn Backend> = Arc::new(clients.backend(pattern));
        Ok(Self::Dynamic(DynamicGenerator::new(page, backend)?))
      }
    }
  }

  pub async fn generate(&self, req: &PageRequest) -> Result<ResponseContext, Error> {
    match self {
      Self::Static(g) => Ok(g.generate(req)),
      Self::Dynamic(g) => g.generate(req).await,
    }
  }
}
