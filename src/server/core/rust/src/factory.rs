/* src/server/core/rust/src/factory.rs */

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use pagewire_engine::{CompiledTemplate, LayoutRenderer, TemplateRenderer};

use crate::backend::BackendClients;
use crate::config::Config;
use crate::errors::Error;
use crate::handler::PageHandler;
use crate::response::ResponseGenerator;
use crate::store::{TemplateKey, TemplateStore};

/// Compiles templates, wires page handlers to the template store and accepts
/// template uploads at runtime.
pub struct PageFactory {
  store: TemplateStore,
  partials_dir: Option<PathBuf>,
  templates: RwLock<HashMap<String, Arc<CompiledTemplate>>>,
  /// (layout, template) pairs used by at least one page
  compositions: RwLock<BTreeSet<(String, String)>>,
  /// Serializes uploads so a pairing is never recomposed from a stale half
  uploads: Mutex<()>,
}

impl PageFactory {
  pub fn new(store: TemplateStore, partials_dir: Option<PathBuf>) -> Self {
    Self {
      store,
      partials_dir,
      templates: RwLock::new(HashMap::new()),
      compositions: RwLock::new(BTreeSet::new()),
      uploads: Mutex::new(()),
    }
  }

  pub fn store(&self) -> &TemplateStore {
    &self.store
  }

  pub fn compile(&self, name: &str, source: &str) -> Result<Arc<CompiledTemplate>, Error> {
    let compiled = match self.partials_dir {
      Some(ref dir) => CompiledTemplate::compile_in(name, source, dir)?,
      None => CompiledTemplate::compile(name, source)?,
    };
    Ok(Arc::new(compiled))
  }

  fn compile_file(&self, name: &str, path: &Path) -> Result<Arc<CompiledTemplate>, Error> {
    let source = std::fs::read_to_string(path)
      .map_err(|e| Error::config(format!("read template '{name}' at {}: {e}", path.display())))?;
    self.compile(name, &source)
  }

  /// Compiled template or layout currently registered under `name`.
  pub fn template(&self, name: &str) -> Option<Arc<CompiledTemplate>> {
    self.templates.read().unwrap_or_else(PoisonError::into_inner).get(name).cloned()
  }

  /// Compile every template and layout named in `cfg` and publish each under
  /// its bare name. Unreadable or invalid sources are logged and skipped; the
  /// failures are returned so callers can decide whether they are fatal.
  pub fn load_templates(&self, cfg: &Config) -> Vec<Error> {
    let mut failures = Vec::new();
    for (name, path) in cfg.templates.iter().chain(&cfg.layouts) {
      if let Err(err) = self.load_file(name, path) {
        tracing::error!(template = %name, error = %err, "template skipped");
        failures.push(err);
      }
    }
    let loaded = cfg.templates.len() + cfg.layouts.len() - failures.len();
    tracing::info!(loaded, failed = failures.len(), "templates loaded");
    failures
  }

  fn load_file(&self, name: &str, path: &Path) -> Result<u64, Error> {
    let compiled = self.compile_file(name, path)?;
    self
      .templates
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(name.to_string(), compiled.clone());
    self.store.set(name, Arc::new(TemplateRenderer::new(compiled)))
  }

  /// Load templates and spawn one handler per page. Pages whose response
  /// generator cannot be built are skipped; pages whose template or layout is
  /// missing or failed to load are still served (with errors) until one is
  /// uploaded.
  pub fn build(
    &self,
    cfg: &Config,
    clients: &BackendClients,
  ) -> Result<Vec<Arc<PageHandler>>, Error> {
    let failed = self.load_templates(cfg).len();

    let mut handlers = Vec::with_capacity(cfg.pages.len());
    for page in &cfg.pages {
      let generator = match ResponseGenerator::for_page(page, clients) {
        Ok(g) => g,
        Err(err) => {
          tracing::error!(page = %page.name, error = %err, "page skipped");
          continue;
        }
      };

      // Pairings are remembered even when a half is missing so an upload can complete them
      if let Some(ref layout) = page.layout
        && !page.template.is_empty()
      {
        self
          .compositions
          .write()
          .unwrap_or_else(PoisonError::into_inner)
          .insert((layout.clone(), page.template.clone()));
      }

      if self.template(&page.template).is_none() {
        tracing::warn!(page = %page.name, template = %page.template, "page without template");
      } else if let Some(ref layout) = page.layout
        && self.template(layout).is_none()
      {
        tracing::warn!(page = %page.name, layout = %layout, "layout not defined");
      }

      handlers.push(PageHandler::spawn(page.clone(), generator, &self.store));
    }

    let compositions = self.compositions.read().unwrap_or_else(PoisonError::into_inner).clone();
    for (layout, template) in &compositions {
      self.compose(layout, template)?;
    }

    tracing::info!(pages = handlers.len(), failed_templates = failed, "pages built");
    Ok(handlers)
  }

  /// Publish the layout pairing when both halves are known. Returns whether
  /// anything was published.
  fn compose(&self, layout: &str, template: &str) -> Result<bool, Error> {
    let (Some(t), Some(l)) = (self.template(template), self.template(layout)) else {
      return Ok(false);
    };
    let key = TemplateKey::for_page(template, Some(layout));
    self.store.set(key, Arc::new(LayoutRenderer::new(t, l)))?;
    Ok(true)
  }

  /// Replace (or add) the template or layout `name` and refresh every layout
  /// pairing that uses it. Returns the new generation of `name`.
  pub fn upload(&self, name: &str, source: &str) -> Result<u64, Error> {
    let compiled = self.compile(name, source)?;
    let _guard = self.uploads.lock().unwrap_or_else(PoisonError::into_inner);
    self
      .templates
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(name.to_string(), compiled.clone());
    let generation = self.store.set(name, Arc::new(TemplateRenderer::new(compiled)))?;

    let affected: Vec<(String, String)> = self
      .compositions
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .iter()
      .filter(|(layout, template)| layout == name || template == name)
      .cloned()
      .collect();
    for (layout, template) in &affected {
      self.compose(layout, template)?;
    }

    tracing::info!(template = %name, generation, recomposed = affected.len(), "template uploaded");
    Ok(generation)
  }
}
