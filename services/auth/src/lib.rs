//! User accounts and authentication for Noter
//!
//! Exposes the `/api/user` router: signup, login, refresh-cookie handling,
//! password reset and the authorized profile routes.

pub mod cookies;
pub mod models;
pub mod password;
pub mod rate_limiter;
pub mod routes;
pub mod validation;

use std::sync::Arc;

use common::{
    jwt::JwtService,
    repositories::{NoteRepository, UserRepository},
    storage::AttachmentStorage,
};

use crate::{cookies::RefreshCookiePolicy, rate_limiter::RateLimiter};

pub use routes::create_router;

/// Application state shared across handlers
///
/// Notes and storage are here because deleting an account removes the
/// user's notes and files as well.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub notes: Arc<dyn NoteRepository>,
    pub storage: AttachmentStorage,
    pub jwt_service: JwtService,
    pub cookie_policy: RefreshCookiePolicy,
    pub rate_limiter: RateLimiter,
}
