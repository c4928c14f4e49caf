//! Wire models of the Noter REST API, as seen from the client

use chrono::{DateTime, Utc};
use common::models::NoteKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub name: String,
    pub email_address: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email_address: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email_address: String,
    pub password: String,
    pub confirm_password: String,
}

/// Profile changes; `None` fields are left out of the request
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirm_password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email_address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub user: UserSummary,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub token: String,
    pub user: UserSummary,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ProfileResponse {
    pub user: UserProfile,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateUserResponse {
    pub message: String,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MessageResponse {
    pub message: String,
}

/// A note as returned by the server, with attachment URLs
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    #[serde(rename = "userID")]
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: NoteKind,
    pub heading: String,
    pub content: String,
    pub audio_recording: Option<String>,
    pub audio_duration: Option<f64>,
    #[serde(default)]
    pub images: Vec<String>,
    pub image_count: usize,
    pub is_favourite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct NoteResponse {
    pub note: Note,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct NoteMessageResponse {
    pub note: Note,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct NotesResponse {
    pub notes: Vec<Note>,
}

/// A file to upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Everything needed to create a note
#[derive(Debug, Clone, Default)]
pub struct NewNoteForm {
    pub kind: NoteKind,
    pub heading: String,
    pub content: String,
    pub audio_duration: Option<f64>,
    /// Sent so that a double submission is recognised as a duplicate
    pub created_at: Option<DateTime<Utc>>,
    pub audio: Option<FileUpload>,
    pub images: Vec<FileUpload>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNoteRequest {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_favourite: Option<bool>,
}

/// A downloaded audio recording
#[derive(Debug, Clone)]
pub struct AudioDownload {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}
