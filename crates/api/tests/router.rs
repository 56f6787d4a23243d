use std::collections::HashMap;
use std::sync::Arc;

use advisory_site_api::config::AppConfig;
use advisory_site_api::state::AppState;
use advisory_site_core::auth::session::SessionClaims;
use advisory_site_core::auth::{AuthError, AuthSession, Authenticator};
use advisory_site_core::content::fallback::fallback_text;
use advisory_site_core::events::bus::EventBus;
use advisory_site_core::store::memory::{MemoryContentRepository, MemoryObjectStorage};
use advisory_site_core::store::ContentRepository;
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use tower::ServiceExt;

const SECRET: &str = "test-secret";
const BOUNDARY: &str = "advisory-test-boundary";

struct StubAuthenticator;

#[async_trait]
impl Authenticator for StubAuthenticator {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        if password != "correct horse" {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(AuthSession {
            access_token: token(email),
            expires_in: 3600,
            email: Some(email.to_string()),
        })
    }
}

struct TestApp {
    router: Router,
    repo: Arc<MemoryContentRepository>,
    storage: Arc<MemoryObjectStorage>,
}

fn config() -> AppConfig {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("STORE_URL", "https://store.example.com"),
        ("STORE_ANON_KEY", "anon"),
        ("DATABASE_URL", "postgres://localhost/unused"),
        ("STORE_JWT_SECRET", SECRET),
        ("FETCH_RETRY", "0"),
        ("SITE_URL", "https://advisory.example.com"),
    ]);
    AppConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap()
}

fn app() -> TestApp {
    let repo = Arc::new(MemoryContentRepository::new());
    let storage = Arc::new(MemoryObjectStorage::new("https://files.example.com"));
    let state = AppState::new(
        config(),
        repo.clone(),
        storage.clone(),
        Arc::new(StubAuthenticator),
        EventBus::new(16),
    )
    .unwrap();
    TestApp {
        router: advisory_site_api::build_router(state),
        repo,
        storage,
    }
}

fn token(email: &str) -> String {
    token_signed_with(SECRET, email)
}

fn token_signed_with(secret: &str, email: &str) -> String {
    let claims = SessionClaims {
        sub: "operator-1".into(),
        email: Some(email.into()),
        aud: "authenticated".into(),
        exp: Utc::now().timestamp() + 3600,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

fn session_cookie() -> String {
    format!("advisory_session={}", token("ops@example.com"))
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn admin(method: Method, uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, session_cookie())
}

fn json_put(uri: &str, body: &str) -> Request<Body> {
    admin(Method::PUT, uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a str, &'a [u8]),
}

fn multipart(method: Method, uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            Part::File(name, filename, content_type, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    admin(method, uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: &TestApp, request: Request<Body>) -> Response {
    app.router.clone().oneshot(request).await.unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

#[tokio::test]
async fn pages_render_fallback_when_store_is_down() {
    let app = app();
    app.repo.set_unavailable(true);

    for path in ["/", "/about", "/services", "/insights", "/contact"] {
        let response = send(&app, get(path)).await;
        assert_eq!(response.status(), StatusCode::OK, "{path}");
    }
    let html = body_text(send(&app, get("/")).await).await;
    assert!(html.contains(fallback_text("hero_title").unwrap()));
}

#[tokio::test]
async fn service_pages_and_unknown_paths() {
    let app = app();
    let response = send(&app, get("/services/financial-advisory")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Financial Advisory"));

    assert_eq!(
        send(&app, get("/services/astrology")).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        send(&app, get("/no/such/page")).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn admin_requires_a_session() {
    let app = app();
    for path in ["/admin", "/admin/api/content", "/admin/api/documents"] {
        let response = send(&app, get(path)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{path}");
        assert_eq!(response.headers()[header::LOCATION], "/admin/login");
    }

    let forged = Request::get("/admin")
        .header(header::COOKIE, "advisory_session=not-a-token")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, forged).await.status(), StatusCode::SEE_OTHER);

    assert_eq!(send(&app, get("/admin/login")).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn tokens_signed_with_another_secret_are_refused() {
    let app = app();
    let cookie = format!(
        "advisory_session={}",
        token_signed_with("dev-secret-change-me-in-production", "intruder@example.com")
    );
    let request = Request::put("/admin/api/content/hero_title")
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"text":"Defaced"}"#))
        .unwrap();

    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/admin/login");
    assert!(app.repo.list_content_entries().await.unwrap().is_empty());
}

#[tokio::test]
async fn login_sets_session_cookie() {
    let app = app();
    let form = |password: &str| {
        Request::post("/admin/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!(
                "email=ops%40example.com&password={password}"
            )))
            .unwrap()
    };

    let response = send(&app, form("correct+horse")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/admin");
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("advisory_session="));
    assert!(cookie.contains("HttpOnly"));

    let response = send(&app, form("wrong")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(body_text(response).await.contains("Invalid email or password"));
}

#[tokio::test]
async fn dashboard_renders_for_signed_in_operator() {
    let app = app();
    let request = admin(Method::GET, "/admin").body(Body::empty()).unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("ops@example.com"));
    assert!(html.contains("hero_title"));
}

#[tokio::test]
async fn invalid_section_is_rejected_without_a_write() {
    let app = app();
    let response = send(
        &app,
        json_put("/admin/api/content/hero-title", r#"{"text":"Hello"}"#),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["error"]["fields"][0]["field"], "section");
    assert!(app.repo.list_content_entries().await.unwrap().is_empty());
}

#[tokio::test]
async fn saved_content_shows_on_next_page_load() {
    let app = app();
    let before = body_text(send(&app, get("/about")).await).await;
    assert!(before.contains(fallback_text("about_mission").unwrap()));

    let response = send(
        &app,
        json_put(
            "/admin/api/content/about_mission",
            r#"{"text":"Help owners decide with confidence<script>alert(1)</script>"}"#,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let saved = body_json(response).await;
    assert_eq!(saved["text"], "Help owners decide with confidence");

    let after = body_text(send(&app, get("/about")).await).await;
    assert!(after.contains("Help owners decide with confidence"));
    assert!(!after.contains("alert(1)"));
}

#[tokio::test]
async fn store_failure_on_write_is_reported_as_transient() {
    let app = app();
    app.repo.set_unavailable(true);
    let response = send(
        &app,
        json_put("/admin/api/content/hero_title", r#"{"text":"Hello"}"#),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn document_lifecycle_cascades_to_insights() {
    let app = app();

    let upload = multipart(
        Method::POST,
        "/admin/api/documents",
        &[Part::File("file", "playbook.pdf", "application/pdf", b"%PDF-1.7")],
    );
    assert_eq!(send(&app, upload).await.status(), StatusCode::CREATED);

    let create = multipart(
        Method::POST,
        "/admin/api/insights",
        &[
            Part::Text("title", "Growth playbook"),
            Part::Text("description", "A step-by-step plan"),
            Part::Text("document_filename", "playbook.pdf"),
            Part::Text("display_order", "1"),
            Part::Text("is_active", "on"),
            Part::File("image", "cover.png", "image/png", b"\x89PNG"),
        ],
    );
    let response = send(&app, create).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let insight = body_json(response).await;
    assert_eq!(
        insight["document_url"],
        "https://files.example.com/playbook.pdf"
    );

    let insights_page = body_text(send(&app, get("/insights")).await).await;
    assert!(insights_page.contains("Growth playbook"));

    let listing = admin(Method::GET, "/admin/api/documents")
        .body(Body::empty())
        .unwrap();
    let documents = body_json(send(&app, listing).await).await;
    assert_eq!(documents[0]["name"], "playbook.pdf");
    assert_eq!(documents[0]["status"], "published");

    let delete = admin(Method::DELETE, "/admin/api/documents/playbook.pdf")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, delete).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["removed_insights"], 1);
    assert!(!app.storage.contains("playbook.pdf"));

    let insights_page = body_text(send(&app, get("/insights")).await).await;
    assert!(!insights_page.contains("Growth playbook"));
}

#[tokio::test]
async fn disallowed_upload_type_is_rejected() {
    let app = app();
    let upload = multipart(
        Method::POST,
        "/admin/api/documents",
        &[Part::File("file", "setup.exe", "application/x-msdownload", b"MZ")],
    );
    let response = send(&app, upload).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(app.storage.keys().is_empty());
}

#[tokio::test]
async fn insight_images_have_a_served_placeholder() {
    let app = app();
    let html = body_text(send(&app, get("/insights")).await).await;
    assert!(html.contains("onerror=\"this.onerror=null;this.src='/static/insight-placeholder.svg'\""));

    let response = send(&app, get("/static/insight-placeholder.svg")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/svg+xml");
    assert!(body_text(response).await.starts_with("<svg"));
}

#[tokio::test]
async fn sitemap_and_health() {
    let app = app();
    let response = send(&app, get("/sitemap.xml")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("application/xml"));
    let xml = body_text(response).await;
    assert!(xml.contains("<loc>https://advisory.example.com/services/change-management</loc>"));

    assert_eq!(send(&app, get("/health")).await.status(), StatusCode::OK);
    app.repo.set_unavailable(true);
    assert_eq!(
        send(&app, get("/health")).await.status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(send(&app, get("/v1/ping")).await.status(), StatusCode::OK);
}
