/* src/server/adapter/axum/src/error.rs */

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pagewire_server::Error;

/// Marks a response produced by an aborted request so the error page layer
/// can swap in the configured body.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Aborted;

/// Newtype wrapper to implement `IntoResponse` for the core error.
/// Only the status reaches the client; the detail stays in the logs.
pub(crate) struct AxumError(pub Error);

impl IntoResponse for AxumError {
  fn into_response(self) -> Response {
    let status =
      StatusCode::from_u16(self.0.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut resp = status.into_response();
    resp.extensions_mut().insert(Aborted);
    resp
  }
}

impl From<Error> for AxumError {
  fn from(err: Error) -> Self {
    Self(err)
  }
}
