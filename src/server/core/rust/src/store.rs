/* src/server/core/rust/src/store.rs */

//! Template registry with hot-reload notification.
//!
//! Every `set` publishes a new renderer under a key and bumps that key's
//! generation. Interested parties register a one-shot [`Subscription`]
//! carrying the last generation they saw; the store answers it with the
//! first newer renderer, either immediately or on the next `set`. A
//! subscription is consumed by its delivery, so listeners re-subscribe after
//! each one. A listener that is not waiting when several updates land only
//! observes the latest of them.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use pagewire_engine::SharedRenderer;
use tokio::sync::{mpsc, oneshot};

use crate::errors::Error;

/// Identifies a bare template (`"post"`) or a layout pairing (`"main:post"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateKey(String);

impl TemplateKey {
  pub fn new(key: impl Into<String>) -> Self {
    Self(key.into())
  }

  pub fn for_page(template: &str, layout: Option<&str>) -> Self {
    match layout {
      Some(layout) => Self(format!("{layout}:{template}")),
      None => Self(template.to_string()),
    }
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for TemplateKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for TemplateKey {
  fn from(s: &str) -> Self {
    Self(s.to_string())
  }
}

impl From<String> for TemplateKey {
  fn from(s: String) -> Self {
    Self(s)
  }
}

/// A renderer together with the generation it was published at.
#[derive(Clone)]
pub struct Delivery {
  pub generation: u64,
  pub renderer: SharedRenderer,
}

/// A request to be told about the next renderer bound to `key`.
pub struct Subscription {
  pub key: TemplateKey,
  /// Generation already observed by the subscriber (0 = none)
  pub seen: u64,
  pub deliver: oneshot::Sender<Delivery>,
}

impl Subscription {
  pub fn new(key: TemplateKey, seen: u64) -> (Self, oneshot::Receiver<Delivery>) {
    let (deliver, rx) = oneshot::channel();
    (Self { key, seen, deliver }, rx)
  }
}

struct Waiter {
  seen: u64,
  deliver: oneshot::Sender<Delivery>,
}

type Slot = Arc<RwLock<Option<Delivery>>>;

#[derive(Default)]
struct Inner {
  /// One lock per key; the outer lock only guards slot creation.
  data: RwLock<HashMap<TemplateKey, Slot>>,
  pending: Mutex<HashMap<TemplateKey, Vec<Waiter>>>,
}

impl Inner {
  fn slot(&self, key: &TemplateKey) -> Slot {
    if let Some(slot) = self.data.read().unwrap_or_else(PoisonError::into_inner).get(key) {
      return slot.clone();
    }
    let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
    data.entry(key.clone()).or_default().clone()
  }

  fn current(&self, key: &TemplateKey) -> Option<Delivery> {
    let slot = self.data.read().unwrap_or_else(PoisonError::into_inner).get(key).cloned()?;
    let guard = slot.read().unwrap_or_else(PoisonError::into_inner);
    guard.clone()
  }

  fn publish(&self, key: &TemplateKey, renderer: SharedRenderer) -> u64 {
    let slot = self.slot(key);
    let mut guard = slot.write().unwrap_or_else(PoisonError::into_inner);
    let generation = guard.as_ref().map_or(1, |d| d.generation + 1);
    *guard = Some(Delivery { generation, renderer });
    generation
  }

  /// Hand the current renderer to every waiter that has not seen it yet, in
  /// registration order. Waiters already up to date stay registered.
  fn notify(&self, key: &TemplateKey) -> usize {
    let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
    let Some(waiters) = pending.remove(key) else {
      return 0;
    };
    let Some(current) = self.current(key) else {
      pending.insert(key.clone(), waiters);
      return 0;
    };

    let mut delivered = 0;
    let mut remaining = Vec::new();
    for waiter in waiters {
      if waiter.seen >= current.generation {
        remaining.push(waiter);
      } else if waiter.deliver.send(current.clone()).is_ok() {
        delivered += 1;
      }
    }
    if !remaining.is_empty() {
      pending.insert(key.clone(), remaining);
    }
    delivered
  }

  fn register(&self, sub: Subscription) {
    let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(current) = self.current(&sub.key)
      && current.generation > sub.seen
    {
      let _ = sub.deliver.send(current);
      return;
    }
    let waiters = pending.entry(sub.key).or_default();
    waiters.retain(|w| !w.deliver.is_closed());
    waiters.push(Waiter { seen: sub.seen, deliver: sub.deliver });
  }
}

/// Process-wide registry of renderers. Cloning yields another handle to the
/// same store.
#[derive(Clone)]
pub struct TemplateStore {
  inner: Arc<Inner>,
  subscribe_tx: mpsc::UnboundedSender<Subscription>,
}

impl TemplateStore {
  /// Create a store and start its subscription loop. Must be called from
  /// within a tokio runtime.
  pub fn new() -> Self {
    let inner = Arc::new(Inner::default());
    let (subscribe_tx, mut subscribe_rx) = mpsc::unbounded_channel::<Subscription>();

    let loop_inner = inner.clone();
    tokio::spawn(async move {
      while let Some(sub) = subscribe_rx.recv().await {
        tracing::trace!(key = %sub.key, seen = sub.seen, "subscription registered");
        loop_inner.register(sub);
      }
      tracing::debug!("template store subscription loop stopped");
    });

    Self { inner, subscribe_tx }
  }

  pub fn get(&self, key: &TemplateKey) -> Option<SharedRenderer> {
    self.inner.current(key).map(|d| d.renderer)
  }

  /// Generation of the renderer currently stored under `key` (0 = none).
  pub fn generation(&self, key: &TemplateKey) -> u64 {
    self.inner.current(key).map_or(0, |d| d.generation)
  }

  /// Store `renderer` under `key` and deliver it to every pending subscriber.
  /// Returns the new generation for the key.
  pub fn set(&self, key: impl Into<TemplateKey>, renderer: SharedRenderer) -> Result<u64, Error> {
    let key = key.into();
    if key.as_str().is_empty() {
      return Err(Error::store("template key must not be empty"));
    }
    let generation = self.inner.publish(&key, renderer);
    let delivered = self.inner.notify(&key);
    tracing::debug!(key = %key, generation, delivered, "template updated");
    Ok(generation)
  }

  pub fn subscribe(&self, sub: Subscription) -> Result<(), Error> {
    self.subscribe_tx.send(sub).map_err(|_| Error::store("subscription loop is not running"))
  }
}

impl Default for TemplateStore {
  fn default() -> Self {
    Self::new()
  }
}
