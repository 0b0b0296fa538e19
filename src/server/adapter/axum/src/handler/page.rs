/* src/server/adapter/axum/src/handler/page.rs */

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{MatchedPath, Path, Query, State};
use axum::http::{HeaderMap, Uri, header};
use axum::response::{IntoResponse, Response};
use pagewire_server::{Error, PageRequest};

use super::AppState;
use crate::error::AxumError;

pub(super) async fn handle_page(
  State(state): State<Arc<AppState>>,
  matched: MatchedPath,
  uri: Uri,
  headers: HeaderMap,
  Path(params): Path<HashMap<String, String>>,
  Query(query): Query<HashMap<String, String>>,
) -> Result<Response, AxumError> {
  let handler =
    state.pages.get(matched.as_str()).ok_or_else(|| Error::not_found("page not found"))?;

  let req = PageRequest { path: uri.path().to_string(), query, params, headers };
  let rendered = handler.serve(&req).await?;

  Ok(
    (
      [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
      [(header::CACHE_CONTROL, rendered.cache_control)],
      rendered.body,
    )
      .into_response(),
  )
}
