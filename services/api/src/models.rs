//! API models for request and response payloads

use chrono::{DateTime, Utc};
use common::{models::Note, storage::public_url};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Note as sent to clients, with attachment keys rendered as URLs
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteView {
    pub id: Uuid,
    #[serde(rename = "userID")]
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub heading: String,
    pub content: String,
    pub audio_recording: Option<String>,
    pub audio_duration: Option<f64>,
    pub images: Vec<String>,
    pub image_count: usize,
    pub is_favourite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NoteView {
    pub fn render(note: &Note, base_url: &str) -> Self {
        Self {
            id: note.id,
            user_id: note.user_id,
            kind: note.kind.to_string(),
            heading: note.heading.clone(),
            content: note.content.clone(),
            audio_recording: note.audio().map(|a| public_url(base_url, &a.key)),
            audio_duration: note.audio_duration,
            images: note.images().map(|a| public_url(base_url, &a.key)).collect(),
            image_count: note.image_count(),
            is_favourite: note.is_favourite,
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }
}

/// `?id=&image=&userID=` on the note routes
#[derive(Debug, Default, Deserialize)]
pub struct NoteQuery {
    pub id: Option<String>,
    pub image: Option<String>,
    #[serde(rename = "userID")]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNoteRequest {
    pub id: Option<String>,
    pub heading: Option<String>,
    pub content: Option<String>,
    pub is_favourite: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct NoteResponse {
    pub note: NoteView,
}

#[derive(Debug, Serialize)]
pub struct NoteMessageResponse {
    pub message: String,
    pub note: NoteView,
}

#[derive(Debug, Serialize)]
pub struct NotesResponse {
    pub notes: Vec<NoteView>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::{Attachment, AttachmentKind, NoteKind};

    #[test]
    fn test_render_uses_wire_names_and_urls() {
        let owner = Uuid::new_v4();
        let image = Uuid::new_v4();
        let now = Utc::now();
        let note = Note {
            id: Uuid::new_v4(),
            user_id: owner,
            kind: NoteKind::Text,
            heading: "H".into(),
            content: "C".into(),
            audio_duration: None,
            is_favourite: true,
            attachments: vec![Attachment {
                id: image,
                note_id: Uuid::nil(),
                kind: AttachmentKind::Image,
                key: format!("{}/images/{}.png", owner, image),
                file_name: "a.png".into(),
                content_type: "image/png".into(),
                created_at: now,
            }],
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(NoteView::render(&note, "http://localhost:5000")).unwrap();
        assert_eq!(json["userID"], owner.to_string());
        assert_eq!(json["type"], "text");
        assert_eq!(json["imageCount"], 1);
        assert_eq!(json["isFavourite"], true);
        assert!(json["audioRecording"].is_null());
        assert_eq!(
            json["images"][0],
            format!("http://localhost:5000/data/uploads/{}/images/{}.png", owner, image)
        );
    }
}
