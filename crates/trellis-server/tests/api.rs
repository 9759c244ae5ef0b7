//! Router-level tests for the admin API and the public site.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use axum::response::Response;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tower::ServiceExt;
use trellis_server::{ServerConfig, build_router, open_store};
use trellis_store::{Id, MemoryStore, Store};

const TOKEN: &str = "test-token";

fn config(seed_demo: bool) -> ServerConfig {
    ServerConfig {
        seed_demo,
        csrf_token: Some(TOKEN.to_owned()),
        version: "test".to_owned(),
        ..ServerConfig::default()
    }
}

fn seeded() -> (Arc<MemoryStore>, Router) {
    let config = config(true);
    let store = open_store(&config).unwrap();
    let router = build_router(Arc::clone(&store) as Arc<dyn Store>, &config);
    (store, router)
}

fn home_id(store: &MemoryStore) -> Id {
    store.page_by_slug("home").unwrap().unwrap().id
}

async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.unwrap()
}

async fn get(router: &Router, uri: &str) -> Response {
    send(router, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn mutate(router: &Router, method: Method, uri: &str, body: &Value) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-csrf-token", TOKEN)
        .body(Body::from(body.to_string()))
        .unwrap();
    send(router, request).await
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn text_body(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_root_serves_homepage_with_etag() {
    let (_, router) = seeded();

    let response = get(&router, "/").await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers().clone();
    assert!(
        headers[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/html")
    );
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert!(headers.contains_key("content-security-policy"));
    let html = text_body(response).await;
    assert!(html.contains("page-home"));

    let etag = headers[header::ETAG].clone();
    let request = Request::get("/")
        .header(header::IF_NONE_MATCH, etag)
        .body(Body::empty())
        .unwrap();
    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
}

#[tokio::test]
async fn test_draft_and_unknown_pages_are_not_found() {
    let (_, router) = seeded();

    for uri in ["/roadmap", "/no-such-page"] {
        let response = get(&router, uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        let html = text_body(response).await;
        assert!(html.contains("Page not found"), "{uri}");
    }
}

#[tokio::test]
async fn test_empty_site_renders_error_page() {
    let config = config(false);
    let router = build_router(Arc::new(MemoryStore::new()), &config);

    let response = get(&router, "/").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()["x-frame-options"], "DENY");
}

#[tokio::test]
async fn test_csrf_endpoint_returns_token() {
    let (_, router) = seeded();

    let body = json_body(get(&router, "/admin/api/csrf").await).await;

    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["token"], json!(TOKEN));
}

#[tokio::test]
async fn test_mutation_without_token_is_forbidden() {
    let (store, router) = seeded();
    let section = store.sections(home_id(&store)).unwrap()[0].clone();
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/admin/api/sections/{}", section.id))
        .header("x-csrf-token", "wrong")
        .body(Body::empty())
        .unwrap();

    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json_body(response).await;
    assert_eq!(body["success"], json!(false));
    assert!(store.section(section.id).is_ok());
}

#[tokio::test]
async fn test_list_sections_of_page() {
    let (store, router) = seeded();

    let response = get(&router, &format!("/admin/api/pages/{}/sections", home_id(&store))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_out_of_grid_position_is_rejected_per_field() {
    let (store, router) = seeded();
    let section = store.sections(home_id(&store)).unwrap()[0].clone();

    let response = mutate(
        &router,
        Method::PATCH,
        &format!("/admin/api/sections/{}/position", section.id),
        &json!({"x": 2, "y": 0, "w": 20, "h": 4}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["success"], json!(false));
    assert!(body["errors"]["w"].is_array());
    assert_eq!(store.section(section.id).unwrap(), section);
}

#[tokio::test]
async fn test_stale_version_is_a_conflict() {
    let (store, router) = seeded();
    let section = store.sections(home_id(&store)).unwrap()[0].clone();

    let response = mutate(
        &router,
        Method::PUT,
        &format!("/admin/api/sections/{}", section.id),
        &json!({"locked": true, "version": section.version + 5}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_malformed_body_is_reported_on_body() {
    let (store, router) = seeded();
    let section = store.sections(home_id(&store)).unwrap()[0].clone();
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/admin/api/sections/{}/widgets", section.id))
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-csrf-token", TOKEN)
        .body(Body::from("{not json"))
        .unwrap();

    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert!(body["errors"]["body"].is_array());
}

#[tokio::test]
async fn test_non_numeric_id_is_not_found() {
    let (_, router) = seeded();

    let response = get(&router, "/admin/api/sections/abc").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["success"], json!(false));
}

#[tokio::test]
async fn test_widget_lifecycle() {
    let (store, router) = seeded();
    let section = store.sections(home_id(&store)).unwrap()[0].clone();

    let response = mutate(
        &router,
        Method::POST,
        &format!("/admin/api/sections/{}/widgets", section.id),
        &json!({"widget_type": "text", "fields": {"body": "Hello **there**"}}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = json_body(response).await;
    let id = created["data"]["id"].as_u64().unwrap();
    assert_eq!(created["data"]["fields"]["body"], json!("Hello **there**"));

    let rendered = json_body(get(&router, &format!("/admin/api/widgets/{id}/render")).await).await;
    assert!(
        rendered["data"]["widget"]["html"]
            .as_str()
            .unwrap()
            .contains("<strong>there</strong>")
    );

    let response = mutate(
        &router,
        Method::DELETE,
        &format!("/admin/api/widgets/{id}"),
        &json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(&router, &format!("/admin/api/widgets/{id}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_widget_missing_required_field() {
    let (store, router) = seeded();
    let section = store.sections(home_id(&store)).unwrap()[0].clone();
    let before = store.widgets(section.id).unwrap();

    let response = mutate(
        &router,
        Method::POST,
        &format!("/admin/api/sections/{}/widgets", section.id),
        &json!({"widget_type": "text", "fields": {}}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["errors"]["fields.body"], json!(["is required"]));
    assert_eq!(store.widgets(section.id).unwrap(), before);
}

#[tokio::test]
async fn test_rendered_page_is_hybrid() {
    let (store, router) = seeded();

    let response = get(&router, &format!("/admin/api/pages/{}/render", home_id(&store))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["data"]["html"].as_str().unwrap().contains("<body"));
    assert!(body["data"]["sections"].is_array());
}

#[tokio::test]
async fn test_catalogs() {
    let (_, router) = seeded();

    let widgets = json_body(get(&router, "/admin/api/widgets/available").await).await;
    let text = widgets["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|entry| entry["slug"] == json!("text"))
        .unwrap();
    assert_eq!(text["has_renderer"], json!(true));

    let assets = json_body(get(&router, "/admin/api/theme/assets").await).await;
    assert_eq!(assets["data"]["theme"], json!("aurora"));

    let response = get(&router, "/admin/api/section-templates?template_id=999").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_processed_menu() {
    let (store, router) = seeded();
    let uri = format!("/admin/api/menus/header?page_id={}", home_id(&store));

    let body = json_body(get(&router, &uri).await).await;

    assert_eq!(body["data"]["location"], json!("header"));
    assert!(!body["data"]["items"].as_array().unwrap().is_empty());
    assert!(body["data"]["html"].as_str().unwrap().starts_with("<ul"));
}

#[tokio::test]
async fn test_unknown_admin_endpoint() {
    let (_, router) = seeded();

    let response = get(&router, "/admin/api/nope").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["success"], json!(false));
}
