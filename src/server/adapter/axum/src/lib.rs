/* src/server/adapter/axum/src/lib.rs */

mod error;
mod handler;

use std::future::Future;

use pagewire_server::PagewireServer;

/// Re-export pagewire-server core for convenience
pub use pagewire_server;

/// Extension trait that converts a `PagewireServer` into an Axum router.
pub trait IntoAxumRouter {
  fn into_axum_router(self) -> axum::Router;
  fn serve(
    self,
    addr: &str,
    shutdown: impl Future<Output = ()> + Send + 'static,
  ) -> impl Future<Output = Result<(), Box<dyn std::error::Error>>> + Send;
}

impl IntoAxumRouter for PagewireServer {
  fn into_axum_router(self) -> axum::Router {
    handler::build_router(self.into_parts())
  }

  async fn serve(
    self,
    addr: &str,
    shutdown: impl Future<Output = ()> + Send + 'static,
  ) -> Result<(), Box<dyn std::error::Error>> {
    let router = self.into_axum_router();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(addr = %local_addr, "pagewire listening");
    axum::serve(listener, router).with_graceful_shutdown(shutdown).await?;
    Ok(())
  }
}

#[cfg(test)]
mod tests;
