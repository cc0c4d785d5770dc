//! End-to-end portal tests: sign-in, identity card, admin portal, logout
//!
//! The portal router runs in-process via `oneshot`; Asgardeo and the
//! create-user proxy are wiremock servers.

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use common::{id_token_claims, mount_jwks, sign, tenant, CLIENT_ID};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use student_id::{config::Config, web, AppState};
use tower::ServiceExt;
use url::Url;
use wiremock::matchers::{body_json, header as header_matches, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Portal {
    app: Router,
    server: MockServer,
}

/// Portal wired to a mock tenant whose token endpoint returns `claims` signed
async fn portal(claims: impl FnOnce(&MockServer) -> Value) -> Portal {
    portal_with_token_delay(claims, Duration::ZERO).await
}

async fn portal_with_token_delay(
    claims: impl FnOnce(&MockServer) -> Value,
    token_delay: Duration,
) -> Portal {
    let server = MockServer::start().await;
    mount_jwks(&server).await;

    let id_token = sign(&claims(&server));
    Mock::given(method("POST"))
        .and(path("/t/uni/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "admin-at",
            "token_type": "Bearer",
            "expires_in": 3600,
            "id_token": id_token
        })).set_delay(token_delay))
        .mount(&server)
        .await;

    let base = tenant(&server);
    let proxy_url = format!("{}/api/create-user", server.uri());
    let config = Config::from_lookup(move |key| match key {
        "CLIENT_ID" => Some(CLIENT_ID.to_string()),
        "REDIRECT_URI" => Some("http://localhost:5173/auth/callback".to_string()),
        "ASGARDEO_BASE_URL" => Some(base.clone()),
        "PROXY_CREATE_USER_URL" => Some(proxy_url.clone()),
        _ => None,
    })
    .unwrap();

    let app = web::create_router(Arc::new(AppState::new(config).unwrap()));
    Portal { app, server }
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_form(uri: &str, cookie: Option<&str>, form: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(form.to_string())).unwrap()
}

fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

fn set_cookie(response: &Response) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

impl Portal {
    async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    async fn page(&self, cookie: Option<&str>) -> String {
        let response = self.send(get("/", cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);
        body_text(response).await
    }

    /// Start sign-in; returns the `sid=...` cookie pair and the CSRF state
    async fn start_sign_in(&self) -> (String, String) {
        let response = self.send(get("/auth/login", None)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let cookie = set_cookie(&response)
            .split(';')
            .next()
            .unwrap()
            .to_string();
        let authorize = Url::parse(&location(&response)).unwrap();
        assert!(authorize
            .as_str()
            .starts_with(&format!("{}/oauth2/authorize", tenant(&self.server))));
        let state = authorize
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.to_string())
            .unwrap();

        (cookie, state)
    }

    /// Complete sign-in; returns the rotated `sid=...` cookie pair
    async fn sign_in(&self) -> String {
        let (cookie, state) = self.start_sign_in().await;
        let response = self
            .send(get(
                &format!("/auth/callback?code=auth-code-1&state={}", state),
                Some(&cookie),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
        set_cookie(&response)
            .split(';')
            .next()
            .unwrap()
            .to_string()
    }

    /// Signed-in administrator with the admin portal open
    async fn admin_session(&self) -> String {
        let cookie = self.sign_in().await;
        let response = self
            .send(post_form("/admin/enter", Some(&cookie), ""))
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        cookie
    }
}

#[tokio::test]
async fn test_signed_out_visitor_sees_login() {
    let portal = portal(|s| id_token_claims(s, json!([]))).await;

    let html = portal.page(None).await;
    assert!(html.contains("action=\"/auth/login\""));
    assert!(!html.contains("STUDENT ID"));
}

#[tokio::test]
async fn test_login_sets_http_only_session_cookie() {
    let portal = portal(|s| id_token_claims(s, json!([]))).await;

    let response = portal.send(get("/auth/login", None)).await;
    let cookie = set_cookie(&response);
    assert!(cookie.starts_with("sid="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(!cookie.contains("Secure"));

    let authorize = location(&response);
    assert!(authorize.contains("code_challenge_method=S256"));
    assert!(authorize.contains("client_id=portal-client"));
}

#[tokio::test]
async fn test_callback_rejects_state_mismatch() {
    let portal = portal(|s| id_token_claims(s, json!([]))).await;
    let (cookie, _) = portal.start_sign_in().await;

    let response = portal
        .send(get("/auth/callback?code=c&state=forged", Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Still signed out
    let html = portal.page(Some(&cookie)).await;
    assert!(html.contains("action=\"/auth/login\""));
}

#[tokio::test]
async fn test_callback_with_provider_error() {
    let portal = portal(|s| id_token_claims(s, json!([]))).await;

    let response = portal
        .send(get("/auth/callback?error=access_denied", None))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_member_sees_student_card_without_admin_access() {
    let portal = portal(|s| id_token_claims(s, json!(["Student"]))).await;
    let cookie = portal.sign_in().await;

    let html = portal.page(Some(&cookie)).await;
    assert!(html.contains("STUDENT ID"));
    assert!(html.contains("Grace Hopper"));
    assert!(html.contains("grace@uni.edu"));
    assert!(html.contains("2024001"));
    assert!(html.contains("Postgraduate"));
    assert!(html.contains("2028-06-30"));
    assert!(!html.contains("action=\"/admin/enter\""));

    let response = portal
        .send(post_form("/admin/enter", Some(&cookie), ""))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_undecodable_id_token_keeps_placeholders() {
    let portal = portal(|s| {
        let mut claims = id_token_claims(s, json!(["UniversityAdmin"]));
        claims["aud"] = json!("another-client");
        claims
    })
    .await;
    let cookie = portal.sign_in().await;

    let html = portal.page(Some(&cookie)).await;
    assert!(html.contains("STUDENT ID"));
    assert!(html.contains("Loading..."));
    assert!(html.contains("could not be loaded"));
    assert!(!html.contains("action=\"/admin/enter\""));
}

#[tokio::test]
async fn test_readiness_follows_jwks_cache() {
    let portal = portal(|s| id_token_claims(s, json!([]))).await;

    let response = portal.send(get("/readyz", None)).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    portal.sign_in().await;
    let response = portal.send(get("/readyz", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = portal.send(get("/healthz", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_admin_posts_require_session() {
    let portal = portal(|s| id_token_claims(s, json!([]))).await;

    let response = portal
        .send(post_form("/admin/invite", None, "email=a%40uni.edu"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = portal
        .send(post_form("/admin/enter", Some("sid=unknown"), ""))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_invites_and_creates_students() {
    let portal = portal(|s| id_token_claims(s, json!(["Student", "UniversityAdmin"]))).await;
    let cookie = portal.sign_in().await;

    let html = portal.page(Some(&cookie)).await;
    assert!(html.contains("ADMINISTRATOR ID"));
    assert!(html.contains("Administrator ID"));
    assert!(html.contains("action=\"/admin/enter\""));

    // Invite tab is the default
    portal
        .send(post_form("/admin/enter", Some(&cookie), ""))
        .await;
    let html = portal.page(Some(&cookie)).await;
    assert!(html.contains("Send Invitation"));

    Mock::given(method("POST"))
        .and(path("/t/uni/api/asgardeo-guest/v1/users/invite"))
        .and(header_matches("authorization", "Bearer admin-at"))
        .and(body_json(json!({ "email": "dean@uni.edu" })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&portal.server)
        .await;

    let response = portal
        .send(post_form("/admin/invite", Some(&cookie), "email=dean%40uni.edu"))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let html = portal.page(Some(&cookie)).await;
    assert!(html.contains("✅ Success! Invitation sent to dean@uni.edu."));

    // Manual creation through the proxy
    portal
        .send(post_form("/admin/tab", Some(&cookie), "tab=add"))
        .await;
    Mock::given(method("POST"))
        .and(path("/api/create-user"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "8f2c" })))
        .expect(1)
        .mount(&portal.server)
        .await;

    let response = portal
        .send(post_form(
            "/admin/users",
            Some(&cookie),
            "email=new.student%40uni.edu&first_name=Katherine&last_name=Johnson\
             &student_id=2024001&involvement=Postgraduate&valid_thru=2028-06-30",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let html = portal.page(Some(&cookie)).await;
    assert!(html.contains("✅ User created! Temporary password: PStu2024001"));

    // Back to the card
    portal
        .send(post_form("/admin/leave", Some(&cookie), ""))
        .await;
    let html = portal.page(Some(&cookie)).await;
    assert!(html.contains("ADMINISTRATOR ID"));
}

#[tokio::test]
async fn test_logout_ends_session_at_asgardeo() {
    let portal = portal(|s| id_token_claims(s, json!(["Student"]))).await;
    let cookie = portal.sign_in().await;

    let response = portal
        .send(post_form("/auth/logout", Some(&cookie), ""))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(set_cookie(&response).contains("Max-Age=0"));

    let end_session = Url::parse(&location(&response)).unwrap();
    assert!(end_session
        .as_str()
        .starts_with(&format!("{}/oidc/logout?", tenant(&portal.server))));
    assert!(end_session.query_pairs().any(|(k, _)| k == "id_token_hint"));
    assert!(end_session.query_pairs().any(|(k, v)| {
        k == "post_logout_redirect_uri" && v == "http://localhost:5173/auth/logout/complete"
    }));

    let html = portal.page(Some(&cookie)).await;
    assert!(html.contains("action=\"/auth/login\""));

    let response = portal.send(get("/auth/logout/complete", None)).await;
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_callback_replaces_pre_login_session_id() {
    let portal = portal(|s| id_token_claims(s, json!(["Student"]))).await;
    let (pre_login, state) = portal.start_sign_in().await;

    let response = portal
        .send(get(
            &format!("/auth/callback?code=auth-code-1&state={}", state),
            Some(&pre_login),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let signed_in = set_cookie(&response);
    assert!(signed_in.contains("HttpOnly"));
    let signed_in = signed_in.split(';').next().unwrap().to_string();
    assert_ne!(signed_in, pre_login);

    // The id handed out before login no longer resolves
    let html = portal.page(Some(&pre_login)).await;
    assert!(html.contains("action=\"/auth/login\""));
    assert!(!html.contains("STUDENT ID"));

    let html = portal.page(Some(&signed_in)).await;
    assert!(html.contains("Grace Hopper"));
}

#[tokio::test]
async fn test_dropped_callback_still_settles_session() {
    let portal = portal_with_token_delay(
        |s| id_token_claims(s, json!(["Student"])),
        Duration::from_millis(500),
    )
    .await;
    let (cookie, state) = portal.start_sign_in().await;

    let dropped = tokio::time::timeout(
        Duration::from_millis(100),
        portal.send(get(
            &format!("/auth/callback?code=auth-code-1&state={}", state),
            Some(&cookie),
        )),
    )
    .await;
    assert!(dropped.is_err());

    tokio::time::sleep(Duration::from_millis(1000)).await;

    // Sign-in finished under a new id, so the old cookie is simply signed out
    let html = portal.page(Some(&cookie)).await;
    assert!(html.contains("action=\"/auth/login\""));
    assert!(!html.contains("Loading..."));

    // And a fresh sign-in works
    let cookie = portal.sign_in().await;
    let html = portal.page(Some(&cookie)).await;
    assert!(html.contains("STUDENT ID"));
}

#[tokio::test]
async fn test_dropped_invite_request_still_finishes() {
    let portal = portal(|s| id_token_claims(s, json!(["UniversityAdmin"]))).await;
    let cookie = portal.admin_session().await;

    Mock::given(method("POST"))
        .and(path("/t/uni/api/asgardeo-guest/v1/users/invite"))
        .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_millis(500)))
        .expect(2)
        .mount(&portal.server)
        .await;

    let dropped = tokio::time::timeout(
        Duration::from_millis(100),
        portal.send(post_form("/admin/invite", Some(&cookie), "email=dean%40uni.edu")),
    )
    .await;
    assert!(dropped.is_err());

    tokio::time::sleep(Duration::from_millis(1000)).await;

    let html = portal.page(Some(&cookie)).await;
    assert!(!html.contains("Sending..."));
    assert!(html.contains("✅ Success! Invitation sent to dean@uni.edu."));

    // The form is usable again
    let response = portal
        .send(post_form("/admin/invite", Some(&cookie), "email=provost%40uni.edu"))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let html = portal.page(Some(&cookie)).await;
    assert!(html.contains("✅ Success! Invitation sent to provost@uni.edu."));
}

#[tokio::test]
async fn test_dropped_create_user_request_still_finishes() {
    let portal = portal(|s| id_token_claims(s, json!(["UniversityAdmin"]))).await;
    let cookie = portal.admin_session().await;
    portal
        .send(post_form("/admin/tab", Some(&cookie), "tab=add"))
        .await;

    Mock::given(method("POST"))
        .and(path("/api/create-user"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({ "id": "8f2c" }))
                .set_delay(Duration::from_millis(500)),
        )
        .expect(1)
        .mount(&portal.server)
        .await;

    let dropped = tokio::time::timeout(
        Duration::from_millis(100),
        portal.send(post_form(
            "/admin/users",
            Some(&cookie),
            "email=new.student%40uni.edu&first_name=Katherine&last_name=Johnson\
             &student_id=2024001&involvement=Postgraduate&valid_thru=2028-06-30",
        )),
    )
    .await;
    assert!(dropped.is_err());

    tokio::time::sleep(Duration::from_millis(1000)).await;

    let html = portal.page(Some(&cookie)).await;
    assert!(!html.contains("Creating..."));
    assert!(html.contains("✅ User created! Temporary password: PStu2024001"));
}
