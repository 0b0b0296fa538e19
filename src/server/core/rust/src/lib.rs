/* src/server/core/rust/src/lib.rs */

pub mod backend;
pub mod config;
pub mod decode;
pub mod errors;
pub mod factory;
pub mod handler;
pub mod page;
pub mod response;
pub mod server;
pub mod store;
pub mod ttl;

// Re-exports for ergonomic use
pub use backend::{Backend, BackendClients, BoxFuture, HttpBackend, replace_params};
pub use config::{BackendConfig, Config};
pub use decode::Decoder;
pub use errors::Error;
pub use factory::PageFactory;
pub use handler::{PageHandler, RenderedPage};
pub use page::Page;
pub use response::{
  DynamicGenerator, PageRequest, RequestContext, ResponseContext, ResponseGenerator,
  StaticGenerator, TemplateHelper,
};
pub use server::{ErrorPages, PagewireServer, ServerParts};
pub use store::{Delivery, Subscription, TemplateKey, TemplateStore};

/// Convert a `/users/:id` route pattern into the `/users/{id}` syntax used by
/// the router.
pub fn convert_route_path(pattern: &str) -> String {
  pattern
    .split('/')
    .map(|seg| match seg.strip_prefix(':') {
      Some(param) => format!("{{{param}}}"),
      None => match seg.strip_prefix('*') {
        Some(rest) if !rest.is_empty() => format!("{{*{rest}}}"),
        _ => seg.to_string(),
      },
    })
    .collect::<Vec<_>>()
    .join("/")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn convert_route_simple() {
    assert_eq!(convert_route_path("/"), "/");
    assert_eq!(convert_route_path("/about"), "/about");
  }

  #[test]
  fn convert_route_with_params() {
    assert_eq!(convert_route_path("/user/:id"), "/user/{id}");
    assert_eq!(convert_route_path("/user/:id/post/:slug"), "/user/{id}/post/{slug}");
  }

  #[test]
  fn convert_route_wildcard() {
    assert_eq!(convert_route_path("/files/*path"), "/files/{*path}");
  }
}
