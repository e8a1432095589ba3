use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use page_db_rust::logic::{PendingUriJobs, TemplateRegistry};
use page_db_rust::model::NewPage;
use page_db_rust::store::{MemoryStore, PageStore};
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    jobs: Arc<PendingUriJobs>,
}

impl TestApp {
    async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        page_db_rust::seed::load_seed_data(&*store).await.unwrap();
        let jobs = Arc::new(PendingUriJobs::new());
        let router = page_db_rust::build_app(
            store.clone(),
            TemplateRegistry::with_defaults(),
            jobs.clone(),
        );
        Self { router, store, jobs }
    }

    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create(&self, title: &str, parent_id: Option<i64>) -> Value {
        let (status, page) = self
            .send(
                Method::POST,
                "/api/pages",
                Some(json!({
                    "title": title,
                    "template_id": 1,
                    "parent_id": parent_id,
                    "is_stand_alone": false,
                    "is_published": false,
                    "content": "<p>Hello</p>"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {}", page);
        self.jobs.run_pending(&*self.store).await.unwrap();
        page
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new().await;
    let (status, body) = app.send(Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_create_and_fetch_page() {
    let app = TestApp::new().await;
    let about = app.create("About", None).await;
    assert_eq!(about["slug"], "about");
    assert_eq!(about["is_published"], false);
    assert_eq!(about["template"]["component_name"], "default-template");
    assert!(about["template"].get("handler").is_none());

    let id = about["id"].as_i64().unwrap();
    let team = app.create("Team", Some(id)).await;
    let team_id = team["id"].as_i64().unwrap();

    let (status, body) = app
        .send(Method::GET, &format!("/api/pages/{}", team_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["uri"], "about/team");
    assert_eq!(body["parent_id"], id);
    assert_eq!(body["contents"][0]["key"], "content");
}

#[tokio::test]
async fn test_validation_errors_are_422_with_field_messages() {
    let app = TestApp::new().await;
    let (status, body) = app
        .send(
            Method::POST,
            "/api/pages",
            Some(json!({ "template_id": 99, "is_stand_alone": true })),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["title"].is_array());
    assert!(body["errors"]["template_id"].is_array());
    assert!(body["errors"]["is_published"].is_array());
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_list_pages_with_parent_filter() {
    let app = TestApp::new().await;
    let about = app.create("About", None).await;
    let about_id = about["id"].as_i64().unwrap();
    app.create("Team", Some(about_id)).await;

    let (status, body) = app.send(Method::GET, "/api/pages", None).await;
    assert_eq!(status, StatusCode::OK);
    // seeded home page plus the two created here
    assert_eq!(body["total"], 3);

    let (_, roots) = app.send(Method::GET, "/api/pages?parent=root", None).await;
    assert_eq!(roots["total"], 2);

    let (_, children) = app
        .send(Method::GET, &format!("/api/pages?parent={}", about_id), None)
        .await;
    assert_eq!(children["total"], 1);
    assert_eq!(children["items"][0]["slug"], "team");

    let (status, _) = app.send(Method::GET, "/api/pages?parent=nope", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_update_page() {
    let app = TestApp::new().await;
    let about = app.create("About", None).await;
    let id = about["id"].as_i64().unwrap();

    let (status, body) = app
        .send(
            Method::PATCH,
            &format!("/api/pages/{}", id),
            Some(json!({
                "title": "About us",
                "template_id": 1,
                "is_stand_alone": true,
                "is_published": true,
                "content": "<p>Updated</p>"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slug"], "about-us");
    assert_eq!(body["is_stand_alone"], true);
    assert_eq!(body["is_published"], true);
    assert_eq!(body["contents"][0]["value"], "<p>Updated</p>");
}

#[tokio::test]
async fn test_reorder_returns_no_content() {
    let app = TestApp::new().await;
    let a = app.create("A", None).await["id"].as_i64().unwrap();
    let b = app.create("B", None).await["id"].as_i64().unwrap();

    let (status, body) = app
        .send(Method::PUT, "/api/pages/reorder", Some(json!({ "pages": [b, a] })))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    assert_eq!(app.store.get_page(b).await.unwrap().unwrap().order, 1);
    assert_eq!(app.store.get_page(a).await.unwrap().unwrap().order, 2);

    let (status, body) = app
        .send(Method::PUT, "/api/pages/reorder", Some(json!({ "pages": [a, 999] })))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["pages.1"].is_array());
}

#[tokio::test]
async fn test_delete_page() {
    let app = TestApp::new().await;
    let id = app.create("About", None).await["id"].as_i64().unwrap();

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/pages/{}", id), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .send(Method::GET, &format!("/api/pages/{}", id), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_protected_page_is_not_found() {
    let app = TestApp::new().await;
    let mut page = NewPage::new("Legal".into(), "legal".into(), None, 1);
    page.is_deletable = false;
    let page = app.store.insert_page(page).await.unwrap();

    let (status, body) = app
        .send(Method::DELETE, &format!("/api/pages/{}", page.id), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not found"));
    assert!(app.store.get_page(page.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_list_templates() {
    let app = TestApp::new().await;
    let (status, body) = app.send(Method::GET, "/api/page-templates", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["items"][0]["name"], "Default");
    assert_eq!(body["items"][1]["is_selectable"], false);
}

#[tokio::test]
async fn test_site_lookup_serves_published_pages_only() {
    let app = TestApp::new().await;

    let (status, body) = app.send(Method::GET, "/site/home", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["contents"]["content"], "<p>Welcome</p>");
    assert_eq!(body["component_name"], "default-template");

    app.create("Draft", None).await;
    let (status, _) = app.send(Method::GET, "/site/draft", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
