//! Application state shared across handlers

use std::sync::Arc;

use common::{jwt::JwtService, repositories::NoteRepository, storage::AttachmentStorage};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub notes: Arc<dyn NoteRepository>,
    pub storage: AttachmentStorage,
    pub jwt_service: JwtService,
}
