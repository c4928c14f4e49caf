//! Router tests for the user routes against the in-memory backend

use std::sync::Arc;

use auth::{
    AppState,
    cookies::RefreshCookiePolicy,
    create_router,
    rate_limiter::{RateLimiter, RateLimiterConfig},
};
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use common::{
    jwt::{JwtConfig, JwtService},
    models::{AttachmentKind, NewNote, NoteKind},
    repositories::{MemoryRepository, NoteRepository, UserRepository},
    storage::AttachmentStorage,
};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

struct TestApp {
    router: Router,
    repo: MemoryRepository,
    storage: AttachmentStorage,
    jwt: JwtService,
    _dir: TempDir,
}

async fn test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let storage = AttachmentStorage::new(dir.path().join("uploads"))
        .await
        .unwrap();
    let repo = MemoryRepository::new();
    let jwt = JwtService::new(JwtConfig {
        access_token_secret: "access".to_string(),
        refresh_token_secret: "refresh".to_string(),
        access_token_expiry: 900,
        refresh_token_expiry: 604_800,
    })
    .unwrap();

    let state = AppState {
        users: Arc::new(repo.clone()),
        notes: Arc::new(repo.clone()),
        storage: storage.clone(),
        jwt_service: jwt.clone(),
        cookie_policy: RefreshCookiePolicy::for_backend(true),
        rate_limiter: RateLimiter::new(RateLimiterConfig {
            max_attempts: 3,
            window_seconds: 300,
            ban_duration_seconds: 900,
        }),
    };

    TestApp {
        router: create_router(state),
        repo,
        storage,
        jwt,
        _dir: dir,
    }
}

struct Reply {
    status: StatusCode,
    set_cookie: Option<String>,
    body: Value,
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> Reply {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        Reply {
            status,
            set_cookie,
            body,
        }
    }

    async fn json(&self, method: Method, uri: &str, body: Value, token: Option<&str>) -> Reply {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(request.body(Body::from(body.to_string())).unwrap())
            .await
    }

    async fn bare(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        cookie: Option<&str>,
    ) -> Reply {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.send(request.body(Body::empty()).unwrap()).await
    }

    async fn signup(&self, email: &str) -> Reply {
        self.json(
            Method::POST,
            "/new",
            json!({
                "name": "Jane Doe",
                "emailAddress": email,
                "password": "Aa1!aaaa",
                "confirmPassword": "Aa1!aaaa",
            }),
            None,
        )
        .await
    }

    async fn login(&self, email: &str, password: &str) -> Reply {
        self.json(
            Method::POST,
            "/authenticate",
            json!({ "emailAddress": email, "password": password }),
            None,
        )
        .await
    }
}

fn cookie_pair(set_cookie: &str) -> String {
    set_cookie.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn test_signup_then_conflict() {
    let app = test_app().await;

    let first = app.signup("a@b.com").await;
    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(first.body["message"], "Sign up successful");
    assert!(first.set_cookie.is_none(), "signup must not log in");

    let second = app.signup("a@b.com").await;
    assert_eq!(second.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_signup_validation() {
    let app = test_app().await;

    let reply = app
        .json(Method::POST, "/new", json!({ "name": "Jane" }), None)
        .await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(reply.body["message"], "Missing credentials");

    let reply = app
        .json(
            Method::POST,
            "/new",
            json!({
                "name": "Jane",
                "emailAddress": "a@b.com",
                "password": "Aa1!aaaa",
                "confirmPassword": "Bb2@bbbb",
            }),
            None,
        )
        .await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        reply.body["message"],
        "Confirm password does not match with password"
    );

    let reply = app
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/new")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body["message"].is_string());
}

#[tokio::test]
async fn test_login_outcomes() {
    let app = test_app().await;
    app.signup("a@b.com").await;

    let unknown = app.login("nobody@b.com", "Aa1!aaaa").await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let wrong = app.login("a@b.com", "Aa1!aaab").await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["message"], "Email address or password is incorrect.");

    let ok = app.login("a@b.com", "Aa1!aaaa").await;
    assert_eq!(ok.status, StatusCode::OK);
    assert_eq!(ok.body["user"]["name"], "Jane Doe");
    let token = ok.body["token"].as_str().unwrap();
    let claims = app.jwt.validate_access_token(token).unwrap();
    assert_eq!(ok.body["user"]["id"], claims.sub.to_string());

    let cookie = ok.set_cookie.unwrap();
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Path=/"));
    assert!(cookie.contains("Max-Age=604800"));
    assert!(!cookie.contains("Secure"));
}

#[tokio::test]
async fn test_login_is_rate_limited() {
    let app = test_app().await;
    app.signup("a@b.com").await;

    for _ in 0..3 {
        let reply = app.login("a@b.com", "Zz9!zzzz").await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    }
    let banned = app.login("a@b.com", "Aa1!aaaa").await;
    assert_eq!(banned.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_refresh_and_logout() {
    let app = test_app().await;
    app.signup("a@b.com").await;

    let missing = app.bare(Method::GET, "/refresh", None, None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);

    let invalid = app
        .bare(Method::GET, "/refresh", None, Some("token=garbage"))
        .await;
    assert_eq!(invalid.status, StatusCode::FORBIDDEN);
    assert!(invalid.set_cookie.unwrap().contains("token="));

    let login = app.login("a@b.com", "Aa1!aaaa").await;
    let cookie = cookie_pair(&login.set_cookie.unwrap());

    let refreshed = app.bare(Method::GET, "/refresh", None, Some(&cookie)).await;
    assert_eq!(refreshed.status, StatusCode::OK);
    assert!(refreshed.body["token"].is_string());
    assert_eq!(refreshed.body["user"]["name"], "Jane Doe");

    let logout = app.bare(Method::POST, "/logout", None, Some(&cookie)).await;
    assert_eq!(logout.status, StatusCode::OK);
    assert!(logout.set_cookie.unwrap().contains("Max-Age=0"));

    let again = app.bare(Method::POST, "/logout", None, None).await;
    assert_eq!(again.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_for_deleted_user() {
    let app = test_app().await;
    let token = app.jwt.generate_refresh_token(Uuid::new_v4()).unwrap();

    let reply = app
        .bare(Method::GET, "/refresh", None, Some(&format!("token={}", token)))
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_reset_password() {
    let app = test_app().await;
    app.signup("a@b.com").await;
    let before = app.repo.find_by_email("a@b.com").await.unwrap().unwrap();

    let noop = app
        .json(
            Method::PATCH,
            "/reset-password",
            json!({ "emailAddress": "a@b.com", "password": "", "confirmPassword": "" }),
            None,
        )
        .await;
    assert_eq!(noop.status, StatusCode::CREATED);
    let after = app.repo.find_by_email("a@b.com").await.unwrap().unwrap();
    assert_eq!(before.password_hash, after.password_hash);

    let unknown = app
        .json(
            Method::PATCH,
            "/reset-password",
            json!({ "emailAddress": "x@b.com", "password": "", "confirmPassword": "" }),
            None,
        )
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let changed = app
        .json(
            Method::PATCH,
            "/reset-password",
            json!({
                "emailAddress": "a@b.com",
                "password": "Bb2@bbbb",
                "confirmPassword": "Bb2@bbbb",
            }),
            None,
        )
        .await;
    assert_eq!(changed.status, StatusCode::CREATED);
    assert_eq!(app.login("a@b.com", "Aa1!aaaa").await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.login("a@b.com", "Bb2@bbbb").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_profile_routes_require_authorization() {
    let app = test_app().await;

    let reply = app.bare(Method::GET, "/get", None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = app.bare(Method::GET, "/get", Some("garbage"), None).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_get_and_update_user() {
    let app = test_app().await;
    app.signup("a@b.com").await;
    app.signup("c@d.com").await;
    let login = app.login("a@b.com", "Aa1!aaaa").await;
    let token = login.body["token"].as_str().unwrap().to_string();
    let id = login.body["user"]["id"].as_str().unwrap().to_string();

    let me = app
        .bare(Method::GET, &format!("/get?id={}", id), Some(&token), None)
        .await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["user"]["emailAddress"], "a@b.com");

    let other = app
        .bare(
            Method::GET,
            &format!("/get?id={}", Uuid::new_v4()),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(other.status, StatusCode::FORBIDDEN);

    let updated = app
        .json(
            Method::PATCH,
            "/update",
            json!({ "name": "Jane Roe", "emailAddress": "", "password": "" }),
            Some(&token),
        )
        .await;
    assert_eq!(updated.status, StatusCode::CREATED);
    assert_eq!(updated.body["user"]["name"], "Jane Roe");
    assert_eq!(updated.body["user"]["emailAddress"], "a@b.com");

    let taken = app
        .json(
            Method::PATCH,
            "/update",
            json!({ "emailAddress": "c@d.com" }),
            Some(&token),
        )
        .await;
    assert_eq!(taken.status, StatusCode::CONFLICT);

    let invalid = app
        .json(Method::PATCH, "/update", json!({ "name": "J4ne" }), Some(&token))
        .await;
    assert_eq!(invalid.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_delete_user_removes_notes_and_files() {
    let app = test_app().await;
    app.signup("a@b.com").await;
    let login = app.login("a@b.com", "Aa1!aaaa").await;
    let token = login.body["token"].as_str().unwrap().to_string();
    let user = app.repo.find_by_email("a@b.com").await.unwrap().unwrap();

    let stored = app
        .storage
        .store(user.id, AttachmentKind::Image, "a.png", "image/png", b"png")
        .await
        .unwrap();
    NoteRepository::create(
        &app.repo,
        NewNote {
            user_id: user.id,
            kind: NoteKind::Text,
            heading: "H".to_string(),
            content: "C".to_string(),
            audio_duration: None,
            created_at: None,
            attachments: vec![common::models::NewAttachment {
                id: stored.id,
                kind: AttachmentKind::Image,
                key: stored.key.clone(),
                file_name: "a.png".to_string(),
                content_type: "image/png".to_string(),
            }],
        },
    )
    .await
    .unwrap();

    let reply = app.bare(Method::DELETE, "/delete", Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["message"], "User successfully deleted");

    assert!(app.repo.list(user.id).await.unwrap().is_empty());
    assert!(!app.storage.path_for(&stored.key).unwrap().exists());
    assert!(app.repo.find_by_id(user.id).await.unwrap().is_none());

    let again = app.bare(Method::DELETE, "/delete", Some(&token), None).await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}
