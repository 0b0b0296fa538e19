/* src/server/adapter/axum/src/tests.rs */

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use axum::routing::get;
use http_body_util::BodyExt;
use pagewire_server::{Config, ErrorPages, PagewireServer};
use tower::ServiceExt;

use super::*;

struct Site {
  dir: tempfile::TempDir,
}

impl Site {
  fn new() -> Self {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("test_tmpl"), "hi, {{extra.name}}!").unwrap();
    std::fs::write(dir.path().join("test_lyt"), "-{{{content}}}-").unwrap();
    std::fs::write(dir.path().join("user_tmpl"), "{{data.name}} #{{params.id}} ({{data.id}})").unwrap();
    std::fs::write(dir.path().join("list_tmpl"), "{{#array}}[{{title}}]{{/array}}").unwrap();
    Self { dir }
  }

  fn path(&self, name: &str) -> String {
    self.dir.path().join(name).display().to_string()
  }

  fn config(&self, backend: Option<SocketAddr>) -> Config {
    let backend = backend.map_or_else(|| "127.0.0.1:1".to_string(), |a| a.to_string());
    let json = serde_json::json!({
      "templates": {
        "a": self.path("test_tmpl"),
        "user": self.path("user_tmpl"),
        "list": self.path("list_tmpl"),
      },
      "layouts": {"b": self.path("test_lyt")},
      "extra": {"name": "stranger"},
      "pages": [
        {"name": "ok1", "URLPattern": "/ok/1", "Template": "a", "Layout": "b"},
        {"name": "ok2", "URLPattern": "/ok/2", "Template": "a", "CacheTTL": "90s"},
        {"name": "ko1", "URLPattern": "/ko/1"},
        {"name": "ko2", "URLPattern": "/ko/2", "Template": "a", "Layout": "unknown"},
        {
          "name": "user",
          "URLPattern": "/users/:id",
          "BackendURLPattern": format!("http://{backend}/users/:id"),
          "Template": "user",
        },
        {
          "name": "person",
          "URLPattern": "/people/:user-id",
          "BackendURLPattern": format!("http://{backend}/users/:user-id"),
          "Template": "user",
        },
        {
          "name": "list",
          "URLPattern": "/posts",
          "BackendURLPattern": format!("http://{backend}/posts"),
          "Template": "list",
          "IsArray": true,
        },
      ],
    });
    Config::parse(&json.to_string()).unwrap()
  }
}

fn router(cfg: &Config, devel: bool, error_pages: Option<&Path>) -> Router {
  let mut server = PagewireServer::from_config(cfg).unwrap().devel(devel);
  if let Some(dir) = error_pages {
    server = server.error_pages(ErrorPages::load(dir));
  }
  server.into_axum_router()
}

async fn send(router: &Router, req: Request<Body>) -> (StatusCode, HeaderMap, String) {
  let resp = router.clone().oneshot(req).await.unwrap();
  let status = resp.status();
  let headers = resp.headers().clone();
  let body = resp.into_body().collect().await.unwrap().to_bytes();
  (status, headers, String::from_utf8(body.to_vec()).unwrap())
}

async fn get_page(router: &Router, uri: &str) -> (StatusCode, HeaderMap, String) {
  send(router, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

/// Poll until `uri` renders `expected`; handlers pick templates up asynchronously.
async fn eventually(router: &Router, uri: &str, expected: &str) -> HeaderMap {
  for _ in 0..100 {
    let (status, headers, body) = get_page(router, uri).await;
    if status == StatusCode::OK && body == expected {
      return headers;
    }
    tokio::time::sleep(Duration::from_millis(10)).await;
  }
  panic!("{uri} never rendered {expected:?}");
}

async fn spawn_backend() -> SocketAddr {
  let app = Router::new()
    .route(
      "/users/{id}",
      get(|axum::extract::Path(id): axum::extract::Path<String>| async move {
        format!(r#"{{"id": 12345678901234567890, "name": "user-{id}"}}"#)
      }),
    )
    .route("/posts", get(|| async { r#"[{"title": "one"}, {"title": "two"}]"# }));
  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move {
    axum::serve(listener, app).await.unwrap();
  });
  addr
}

#[tokio::test]
async fn static_pages_render_with_and_without_layout() {
  let site = Site::new();
  let router = router(&site.config(None), false, None);

  let headers = eventually(&router, "/ok/1", "-hi, stranger!-").await;
  assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=3600");
  assert_eq!(headers[header::CONTENT_TYPE], "text/html; charset=utf-8");

  let headers = eventually(&router, "/ok/2", "hi, stranger!").await;
  assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=90");
}

#[tokio::test]
async fn pages_without_renderer_fail_with_empty_body() {
  let site = Site::new();
  let router = router(&site.config(None), false, None);
  eventually(&router, "/ok/1", "-hi, stranger!-").await;

  for uri in ["/ko/1", "/ko/2", "/ko/1"] {
    let (status, headers, body) = get_page(&router, uri).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.is_empty());
    assert!(headers.get(header::CACHE_CONTROL).is_none());
  }
}

#[tokio::test]
async fn custom_error_pages_replace_bare_statuses() {
  let site = Site::new();
  let static_dir = site.dir.path().join("static");
  std::fs::create_dir(&static_dir).unwrap();
  std::fs::write(static_dir.join("404"), "404").unwrap();
  std::fs::write(static_dir.join("500"), "500").unwrap();
  let router = router(&site.config(None), false, Some(&static_dir));

  let (status, _, body) = get_page(&router, "/ko/1").await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert_eq!(body, "500");

  let (status, _, body) = get_page(&router, "/nowhere").await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body, "404");
}

#[tokio::test]
async fn unknown_route_without_error_page() {
  let site = Site::new();
  let router = router(&site.config(None), false, None);
  let (status, _, body) = get_page(&router, "/b").await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body.is_empty());
}

#[tokio::test]
async fn dynamic_pages_render_backend_data() {
  let site = Site::new();
  let addr = spawn_backend().await;
  let router = router(&site.config(Some(addr)), false, None);

  eventually(&router, "/users/42", "user-42 #42 (12345678901234567890)").await;
  eventually(&router, "/posts", "[one][two]").await;
  eventually(&router, "/people/7", "user-7 # (12345678901234567890)").await;
}

#[tokio::test]
async fn unreachable_backend_is_server_error() {
  let site = Site::new();
  let router = router(&site.config(None), false, None);
  eventually(&router, "/ok/2", "hi, stranger!").await;

  let (status, _, body) = get_page(&router, "/users/1").await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert!(body.is_empty());
}

fn upload_request(name: &str, content: &str) -> Request<Body> {
  let body = format!(
    "--XBOUNDARY\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}.mustache\"\r\n\
     Content-Type: text/plain\r\n\r\n{content}\r\n--XBOUNDARY--\r\n"
  );
  Request::builder()
    .method("PUT")
    .uri(format!("/template/{name}"))
    .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XBOUNDARY")
    .body(Body::from(body))
    .unwrap()
}

#[tokio::test]
async fn devel_upload_hot_reloads_pages() {
  let site = Site::new();
  let router = router(&site.config(None), true, None);
  eventually(&router, "/ok/1", "-hi, stranger!-").await;

  let (status, _, body) = send(&router, upload_request("a", "bye, {{extra.name}}.")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, "'a' uploaded and stored as [a.mustache]!");

  eventually(&router, "/ok/2", "bye, stranger.").await;
  eventually(&router, "/ok/1", "-bye, stranger.-").await;
}

#[tokio::test]
async fn devel_upload_rejects_broken_templates() {
  let site = Site::new();
  let router = router(&site.config(None), true, None);
  eventually(&router, "/ok/2", "hi, stranger!").await;

  let (status, _, body) = send(&router, upload_request("a", "{{#never}}")).await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert!(body.is_empty());
  eventually(&router, "/ok/2", "hi, stranger!").await;
}

#[tokio::test]
async fn upload_route_requires_devel() {
  let site = Site::new();
  let router = router(&site.config(None), false, None);
  let (status, _, _) = send(&router, upload_request("a", "x")).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}
