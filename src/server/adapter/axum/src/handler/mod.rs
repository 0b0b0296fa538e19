/* src/server/adapter/axum/src/handler/mod.rs */

mod admin;
mod page;

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use pagewire_server::{Error, ErrorPages, PageFactory, PageHandler, ServerParts, convert_route_path};
use tower_http::trace::TraceLayer;

use crate::error::{Aborted, AxumError};

pub(crate) struct AppState {
  /// Axum route pattern -> page handler
  pub pages: HashMap<String, Arc<PageHandler>>,
  pub factory: Arc<PageFactory>,
  pub error_pages: ErrorPages,
}

pub(crate) fn build_router(parts: ServerParts) -> Router {
  let mut page_map = HashMap::new();
  let mut router = Router::new();

  for handler in parts.handlers {
    let pattern = &handler.page().url_pattern;
    if !pattern.starts_with('/') {
      tracing::error!(
        page = %handler.page().name,
        pattern = %pattern,
        "route must start with '/', page skipped"
      );
      continue;
    }
    let route = convert_route_path(pattern);
    if page_map.contains_key(&route) {
      tracing::error!(page = %handler.page().name, route = %route, "duplicate route, page skipped");
      continue;
    }
    tracing::debug!(page = %handler.page().name, route = %route, "page registered");
    router = router.route(&route, get(page::handle_page));
    page_map.insert(route, handler);
  }

  // Template uploads trigger hot reloads; only exposed in devel mode
  if parts.devel {
    router = router.route("/template/{name}", put(admin::handle_upload));
  }

  let state =
    Arc::new(AppState { pages: page_map, factory: parts.factory, error_pages: parts.error_pages });

  router
    .fallback(handle_not_found)
    .layer(middleware::from_fn_with_state(state.clone(), apply_error_pages))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

async fn handle_not_found() -> AxumError {
  AxumError(Error::not_found("no route"))
}

/// Replace the body of aborted responses with the configured error page.
async fn apply_error_pages(
  State(state): State<Arc<AppState>>,
  req: Request,
  next: Next,
) -> Response {
  let resp = next.run(req).await;
  if resp.extensions().get::<Aborted>().is_none() {
    return resp;
  }

  let status = resp.status();
  let content = if status == StatusCode::NOT_FOUND {
    state.error_pages.not_found.clone()
  } else {
    state.error_pages.server_error.clone()
  };
  match content {
    Some(body) => {
      (status, [(header::CONTENT_TYPE, "text/html; charset=utf-8")], body).into_response()
    }
    None => resp,
  }
}
