/* src/server/adapter/axum/src/handler/admin.rs */

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use pagewire_server::Error;

use super::AppState;
use crate::error::AxumError;

/// `PUT /template/{name}` with a multipart `file` field: compile the upload
/// and publish it under `name`.
pub(super) async fn handle_upload(
  State(state): State<Arc<AppState>>,
  Path(name): Path<String>,
  mut multipart: Multipart,
) -> Result<String, AxumError> {
  while let Some(field) =
    multipart.next_field().await.map_err(|e| Error::store(format!("read upload: {e}")))?
  {
    if field.name() != Some("file") {
      continue;
    }
    let filename = field.file_name().unwrap_or_default().to_string();
    let bytes = field.bytes().await.map_err(|e| Error::store(format!("read upload: {e}")))?;
    let source = String::from_utf8(bytes.to_vec())
      .map_err(|_| Error::store(format!("template '{name}' is not valid UTF-8")))?;

    if let Err(err) = state.factory.upload(&name, &source) {
      tracing::warn!(template = %name, error = %err, "template upload rejected");
      return Err(err.into());
    }
    return Ok(format!("'{name}' uploaded and stored as [{filename}]!"));
  }
  Err(Error::store("missing 'file' field").into())
}
