//! The composed Noter HTTP server
//!
//! Wires the user and note routers together with static upload serving,
//! CORS, request tracing and the upload body limit.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    routing::get,
};
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};

use auth::{
    cookies::RefreshCookiePolicy,
    rate_limiter::{RateLimiter, RateLimiterConfig},
};
use common::{
    database::{health_check, init_pool, migrate},
    jwt::JwtService,
    repositories::{
        MemoryRepository, NoteRepository, PgNoteRepository, PgUserRepository, UserRepository,
    },
    settings::{Settings, StorageBackend},
    storage::{AttachmentStorage, UPLOADS_URL_PREFIX},
};

/// The repositories backing both routers
#[derive(Clone)]
pub struct Backend {
    pub users: Arc<dyn UserRepository>,
    pub notes: Arc<dyn NoteRepository>,
}

impl Backend {
    /// A fresh in-process backend
    pub fn memory() -> Self {
        let repo = MemoryRepository::new();
        Self {
            users: Arc::new(repo.clone()),
            notes: Arc::new(repo),
        }
    }
}

/// Connect the backend selected by `storage_backend`
///
/// For PostgreSQL this checks connectivity and bootstraps the schema.
pub async fn connect_backend(settings: &Settings) -> Result<Backend> {
    match settings.storage_backend {
        StorageBackend::Postgres => {
            let pool = init_pool(&settings.database_config()).await?;

            if health_check(&pool).await? {
                info!("Database connection successful");
            } else {
                bail!("Failed to connect to database");
            }
            migrate(&pool).await?;

            Ok(Backend {
                users: Arc::new(PgUserRepository::new(pool.clone())),
                notes: Arc::new(PgNoteRepository::new(pool)),
            })
        }
        StorageBackend::Memory => {
            warn!("Using the in-memory backend; data is lost on shutdown");
            Ok(Backend::memory())
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Build the full application router
pub async fn create_app(settings: &Settings, backend: Backend) -> Result<Router> {
    let storage = AttachmentStorage::new(settings.uploads_dir()).await?;
    let jwt_service = JwtService::new(settings.jwt_config())?;

    let rate_limiter = RateLimiter::new(RateLimiterConfig {
        max_attempts: settings.login_max_attempts,
        window_seconds: settings.login_window_seconds,
        ban_duration_seconds: settings.login_ban_seconds,
    });

    let user_state = auth::AppState {
        users: backend.users.clone(),
        notes: backend.notes.clone(),
        storage: storage.clone(),
        jwt_service: jwt_service.clone(),
        cookie_policy: RefreshCookiePolicy::for_backend(settings.is_local_backend()),
        rate_limiter,
    };
    let note_state = api::AppState {
        notes: backend.notes,
        storage: storage.clone(),
        jwt_service,
    };

    let origin = HeaderValue::from_str(&settings.frontend_host_url)
        .with_context(|| format!("Invalid frontend URL {}", settings.frontend_host_url))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let app = Router::new()
        .route("/health", get(health))
        .nest("/api/user", auth::create_router(user_state))
        .nest("/api/note", api::create_router(note_state))
        .nest_service(UPLOADS_URL_PREFIX, ServeDir::new(storage.root()))
        .layer(DefaultBodyLimit::max(settings.max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

/// Resolves on Ctrl+C
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => warn!("Failed to listen for shutdown signal: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use std::path::PathBuf;
    use tower::ServiceExt;

    fn settings(data_dir: PathBuf) -> Settings {
        Settings {
            database_url: None,
            db_uri_scheme: "postgres".into(),
            db_user: "noter".into(),
            db_password: "noter".into(),
            db_host: "localhost:5432".into(),
            db_database: "noter".into(),
            db_max_connections: 1,
            storage_backend: StorageBackend::Memory,
            access_token_secret: "access".into(),
            access_token_expiry_time: 900,
            refresh_token_secret: "refresh".into(),
            refresh_token_expiry_time: 604_800,
            frontend_host_url: "http://localhost:5173".into(),
            backend_host_url: "http://localhost:5000".into(),
            port: None,
            alternative_port: None,
            data_dir,
            max_upload_bytes: 1024 * 1024,
            login_max_attempts: 5,
            login_window_seconds: 300,
            login_ban_seconds: 900,
        }
    }

    #[tokio::test]
    async fn test_health_and_static_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path().to_path_buf());
        let backend = connect_backend(&settings).await.unwrap();
        let app = create_app(&settings, backend).await.unwrap();

        let response = app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let file = dir.path().join("uploads").join("u").join("images");
        std::fs::create_dir_all(&file).unwrap();
        std::fs::write(file.join("a.png"), b"png").unwrap();

        let response = app
            .clone()
            .oneshot(
                Request::get("/data/uploads/u/images/a.png")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"png");
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_frontend() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path().to_path_buf());
        let app = create_app(&settings, Backend::memory()).await.unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/note/get-all")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:5173"
        );
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
            "true"
        );
    }
}
