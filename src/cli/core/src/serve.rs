/* src/cli/core/src/serve.rs */

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::Args;
use pagewire_server::{Config, ErrorPages, PagewireServer};
use pagewire_server_axum::IntoAxumRouter;

#[derive(Args, Debug)]
pub(crate) struct ServeArgs {
  /// Path to the JSON or YAML configuration file
  #[arg(short, long, default_value = "config.json")]
  pub config: PathBuf,
  /// Port to listen on
  #[arg(short, long, env = "PORT", default_value_t = 8080)]
  pub port: u16,
  /// Enable template uploads (`PUT /template/{name}`)
  #[arg(short, long)]
  pub devel: bool,
  /// Directory holding the optional `404` and `500` error pages
  #[arg(long, default_value = "static")]
  pub static_dir: PathBuf,
}

fn load(path: &Path) -> Result<Config> {
  Config::from_path(path).with_context(|| format!("failed to load {}", path.display()))
}

pub(crate) async fn run(args: &ServeArgs) -> Result<()> {
  let cfg = load(&args.config)?;
  tracing::info!(
    config = %args.config.display(),
    pages = cfg.pages.len(),
    devel = args.devel,
    "starting pagewire"
  );

  let server = PagewireServer::from_config(&cfg)
    .context("failed to build pages")?
    .devel(args.devel)
    .error_pages(ErrorPages::load(&args.static_dir));

  let addr = format!("0.0.0.0:{}", args.port);
  server.serve(&addr, shutdown_signal()).await.map_err(|e| anyhow!("server error: {e}"))?;
  tracing::info!("pagewire stopped");
  Ok(())
}

/// Compile everything the configuration references without binding a port.
pub(crate) fn check(path: &Path) -> Result<()> {
  let cfg = load(path)?;
  let factory = pagewire_server::PageFactory::new(
    pagewire_server::TemplateStore::new(),
    cfg.partials_dir.clone(),
  );
  let failures = factory.load_templates(&cfg);
  if let Some(first) = failures.into_iter().next() {
    return Err(anyhow!(first).context("template compilation failed"));
  }

  for page in &cfg.pages {
    if !page.url_pattern.starts_with('/') {
      tracing::warn!(page = %page.name, pattern = %page.url_pattern, "route must start with '/'");
    }
    if factory.template(&page.template).is_none() {
      tracing::warn!(page = %page.name, template = %page.template, "page without template");
    }
    if let Some(layout) = &page.layout
      && factory.template(layout).is_none()
    {
      tracing::warn!(page = %page.name, layout = %layout, "layout not defined");
    }
  }
  tracing::info!(
    pages = cfg.pages.len(),
    templates = cfg.templates.len(),
    layouts = cfg.layouts.len(),
    "configuration ok"
  );
  Ok(())
}

async fn shutdown_signal() {
  if let Err(err) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %err, "failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutdown requested");
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn check_accepts_valid_config() {
    let dir = tempfile::tempdir().unwrap();
    let tmpl = dir.path().join("index.mustache");
    std::fs::write(&tmpl, "hello {{extra.who}}").unwrap();
    let cfg = dir.path().join("config.yml");
    std::fs::write(
      &cfg,
      format!(
        "templates:\n  index: {}\nextra:\n  who: world\npages:\n  - URLPattern: /\n    Template: index\n",
        tmpl.display()
      ),
    )
    .unwrap();

    check(&cfg).unwrap();
  }

  #[tokio::test]
  async fn check_rejects_broken_template() {
    let dir = tempfile::tempdir().unwrap();
    let tmpl = dir.path().join("index.mustache");
    std::fs::write(&tmpl, "{{#open}}").unwrap();
    let cfg = dir.path().join("config.json");
    std::fs::write(
      &cfg,
      format!(r#"{{"templates": {{"index": "{}"}}, "pages": []}}"#, tmpl.display()),
    )
    .unwrap();

    assert!(check(&cfg).is_err());
  }

  #[test]
  fn check_reports_missing_file() {
    let err = check(Path::new("/nonexistent/pagewire.json")).unwrap_err();
    assert!(err.to_string().contains("failed to load"));
  }
}
