/* src/server/engine/rust/src/lib.rs */

pub mod data;
pub mod render;

// Public API re-exports
pub use data::{TagUsage, to_data, to_data_with};
pub use render::{
  CompiledTemplate, LayoutRenderer, MissingRenderer, RenderError, Renderer, SharedRenderer,
  TemplateRenderer,
};
