/* src/server/core/rust/src/errors.rs */

use pagewire_engine::RenderError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("config error: {0}")]
  Config(String),
  #[error("backend request failed: {0}")]
  Backend(String),
  #[error("backend payload could not be decoded: {0}")]
  Decode(#[from] serde_json::Error),
  #[error(transparent)]
  Render(#[from] RenderError),
  #[error("template store error: {0}")]
  Store(String),
  #[error("not found: {0}")]
  NotFound(String),
}

impl Error {
  pub fn config(msg: impl Into<String>) -> Self {
    Self::Config(msg.into())
  }

  pub fn backend(msg: impl Into<String>) -> Self {
    Self::Backend(msg.into())
  }

  pub fn store(msg: impl Into<String>) -> Self {
    Self::Store(msg.into())
  }

  pub fn not_found(msg: impl Into<String>) -> Self {
    Self::NotFound(msg.into())
  }

  pub fn code(&self) -> &'static str {
    match self {
      Self::Config(_) => "CONFIG_ERROR",
      Self::Backend(_) => "BACKEND_ERROR",
      Self::Decode(_) => "DECODE_ERROR",
      Self::Render(_) => "RENDER_ERROR",
      Self::Store(_) => "STORE_ERROR",
      Self::NotFound(_) => "NOT_FOUND",
    }
  }

  pub fn status(&self) -> u16 {
    match self {
      Self::NotFound(_) => 404,
      _ => 500,
    }
  }
}

impl From<std::io::Error> for Error {
  fn from(err: std::io::Error) -> Self {
    Self::Config(err.to_string())
  }
}
