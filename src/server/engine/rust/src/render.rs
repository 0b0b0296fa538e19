/* src/server/engine/rust/src/render.rs */

use std::any::Any;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use mustache::Data;
use serde_json::Value;

use crate::data::{TagUsage, to_data_with};

/// Key under which a layout receives the rendered page.
pub const CONTENT_KEY: &str = "content";

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
  #[error("failed to compile template '{name}': {source}")]
  Compile {
    name: String,
    #[source]
    source: mustache::Error,
  },
  #[error("failed to render template '{name}': {source}")]
  Render {
    name: String,
    #[source]
    source: mustache::Error,
  },
  #[error("rendered page '{0}' is not valid UTF-8")]
  Utf8(String),
  #[error("failed to write rendered output: {0}")]
  Io(#[from] std::io::Error),
  #[error("template '{name}' cannot render a value: {message}")]
  Unrenderable { name: String, message: String },
  #[error("no renderer defined")]
  NoRenderer,
}

/// A compiled template bound to a context at render time.
///
/// Renderers are immutable once built and shared between page handlers.
pub trait Renderer: Send + Sync {
  fn render(&self, out: &mut dyn Write, ctx: &Value) -> Result<(), RenderError>;
}

pub type SharedRenderer = Arc<dyn Renderer>;

/// One mustache template, compiled once, with the tag usage that decides
/// how context values are converted for it.
pub struct CompiledTemplate {
  name: String,
  template: mustache::Template,
  usage: TagUsage,
}

impl CompiledTemplate {
  /// Compile `source`. Partials resolve relative to the working directory.
  pub fn compile(name: impl Into<String>, source: &str) -> Result<Self, RenderError> {
    Self::compile_in(name, source, Path::new("."))
  }

  /// Compile `source`, resolving `{{> partial}}` tags against `partials_dir`.
  pub fn compile_in(
    name: impl Into<String>,
    source: &str,
    partials_dir: &Path,
  ) -> Result<Self, RenderError> {
    let name = name.into();
    let ctx = mustache::Context::new(partials_dir.to_path_buf());
    match ctx.compile(source.chars()) {
      Ok(template) => {
        let usage = TagUsage::scan_with_partials(source, partials_dir);
        Ok(Self { name, template, usage })
      }
      Err(source) => Err(RenderError::Compile { name, source }),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// `ctx` converted for this template's tags.
  fn data_for(&self, ctx: &Value) -> Data {
    to_data_with(ctx, &self.usage)
  }

  fn render_data(&self, data: &Data) -> Result<Vec<u8>, RenderError> {
    let mut buf = Vec::new();
    // mustache panics on values it cannot interpolate
    let rendered =
      panic::catch_unwind(AssertUnwindSafe(|| self.template.render_data(&mut buf, data)));
    match rendered {
      Ok(Ok(())) => Ok(buf),
      Ok(Err(source)) => Err(RenderError::Render { name: self.name.clone(), source }),
      Err(payload) => Err(RenderError::Unrenderable {
        name: self.name.clone(),
        message: panic_message(&*payload),
      }),
    }
  }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(s) = payload.downcast_ref::<&str>() {
    (*s).to_string()
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.clone()
  } else {
    "unknown error".to_string()
  }
}

/// Renders a single template.
pub struct TemplateRenderer {
  template: Arc<CompiledTemplate>,
}

impl TemplateRenderer {
  pub fn new(template: Arc<CompiledTemplate>) -> Self {
    Self { template }
  }
}

impl Renderer for TemplateRenderer {
  fn render(&self, out: &mut dyn Write, ctx: &Value) -> Result<(), RenderError> {
    let buf = self.template.render_data(&self.template.data_for(ctx))?;
    out.write_all(&buf)?;
    Ok(())
  }
}

/// Renders the page template, then the layout with the page output in `{{{content}}}`.
pub struct LayoutRenderer {
  template: Arc<CompiledTemplate>,
  layout: Arc<CompiledTemplate>,
}

impl LayoutRenderer {
  pub fn new(template: Arc<CompiledTemplate>, layout: Arc<CompiledTemplate>) -> Self {
    Self { template, layout }
  }
}

impl Renderer for LayoutRenderer {
  fn render(&self, out: &mut dyn Write, ctx: &Value) -> Result<(), RenderError> {
    let page = self.template.render_data(&self.template.data_for(ctx))?;
    let page =
      String::from_utf8(page).map_err(|_| RenderError::Utf8(self.template.name.clone()))?;

    let layout_data = match self.layout.data_for(ctx) {
      Data::Map(mut map) => {
        map.insert(CONTENT_KEY.to_string(), Data::String(page));
        Data::Map(map)
      }
      _ => Data::Map(std::iter::once((CONTENT_KEY.to_string(), Data::String(page))).collect()),
    };
    let buf = self.layout.render_data(&layout_data)?;
    out.write_all(&buf)?;
    Ok(())
  }
}

/// Placeholder held by a page before its first template delivery.
pub struct MissingRenderer;

impl Renderer for MissingRenderer {
  fn render(&self, _out: &mut dyn Write, _ctx: &Value) -> Result<(), RenderError> {
    Err(RenderError::NoRenderer)
  }
}
