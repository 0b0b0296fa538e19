/* src/server/core/rust/src/handler.rs */

use std::sync::Arc;

use pagewire_engine::{MissingRenderer, SharedRenderer};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::errors::Error;
use crate::page::Page;
use crate::response::{PageRequest, ResponseGenerator};
use crate::store::{Subscription, TemplateKey, TemplateStore};

/// Successful page render.
#[derive(Debug)]
pub struct RenderedPage {
  pub body: Vec<u8>,
  pub cache_control: String,
}

/// Serves one page. A background task keeps the page subscribed to its
/// template key and publishes every delivered renderer; requests always use
/// the latest published one.
pub struct PageHandler {
  page: Page,
  key: TemplateKey,
  generator: ResponseGenerator,
  cache_control: String,
  renderer: watch::Receiver<SharedRenderer>,
  task: JoinHandle<()>,
}

impl PageHandler {
  /// Create the handler and start its resubscription loop. Until the first
  /// delivery every render fails with `RenderError::NoRenderer`.
  pub fn spawn(page: Page, generator: ResponseGenerator, store: &TemplateStore) -> Arc<Self> {
    let key = page.template_key();
    let initial: SharedRenderer = Arc::new(MissingRenderer);
    let (tx, rx) = watch::channel(initial);
    let task = tokio::spawn(resubscribe(page.name.clone(), key.clone(), store.clone(), tx));

    Arc::new(Self { cache_control: page.cache_control(), page, key, generator, renderer: rx, task })
  }

  pub fn page(&self) -> &Page {
    &self.page
  }

  pub fn template_key(&self) -> &TemplateKey {
    &self.key
  }

  pub fn cache_control(&self) -> &str {
    &self.cache_control
  }

  pub fn current_renderer(&self) -> SharedRenderer {
    self.renderer.borrow().clone()
  }

  /// Build the response context and render it with the current renderer.
  pub async fn serve(&self, req: &PageRequest) -> Result<RenderedPage, Error> {
    let ctx = match self.generator.generate(req).await {
      Ok(ctx) => ctx,
      Err(err) => {
        tracing::warn!(
          page = %self.page.name,
          path = %req.path,
          error = %err,
          "response context failed"
        );
        return Err(err);
      }
    };

    let renderer = self.current_renderer();
    let mut body = Vec::new();
    if let Err(err) = renderer.render(&mut body, &ctx.to_value()) {
      tracing::warn!(page = %self.page.name, key = %self.key, error = %err, "render failed");
      return Err(err.into());
    }
    Ok(RenderedPage { body, cache_control: self.cache_control.clone() })
  }
}

impl Drop for PageHandler {
  fn drop(&mut self) {
    self.task.abort();
  }
}

async fn resubscribe(
  page: String,
  key: TemplateKey,
  store: TemplateStore,
  tx: watch::Sender<SharedRenderer>,
) {
  let mut seen = 0;
  loop {
    let (sub, rx) = Subscription::new(key.clone(), seen);
    if store.subscribe(sub).is_err() {
      break;
    }
    let Ok(delivery) = rx.await else {
      break;
    };
    seen = delivery.generation;
    tx.send_replace(delivery.renderer);
    tracing::debug!(page = %page, key = %key, generation = seen, "renderer updated");
  }
  tracing::debug!(page = %page, key = %key, "resubscription loop stopped");
}
