//! Note and attachment models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Kind of note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
    #[default]
    Text,
    Audio,
}

impl NoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteKind::Text => "text",
            NoteKind::Audio => "audio",
        }
    }
}

impl fmt::Display for NoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoteKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(NoteKind::Text),
            "audio" => Ok(NoteKind::Audio),
            other => Err(format!("unknown note type: {}", other)),
        }
    }
}

/// Kind of stored file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Audio,
    Image,
}

impl AttachmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentKind::Audio => "audio",
            AttachmentKind::Image => "image",
        }
    }

    /// Directory the files of this kind are stored under
    pub fn directory(&self) -> &'static str {
        match self {
            AttachmentKind::Audio => "audio",
            AttachmentKind::Image => "images",
        }
    }
}

impl FromStr for AttachmentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(AttachmentKind::Audio),
            "image" => Ok(AttachmentKind::Image),
            other => Err(format!("unknown attachment kind: {}", other)),
        }
    }
}

/// A file attached to a note
///
/// `key` is the storage key relative to the uploads root; it never changes
/// once written and is the only thing used to locate the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Uuid,
    pub note_id: Uuid,
    pub kind: AttachmentKind,
    pub key: String,
    pub file_name: String,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
}

/// Note entity, with its attachments in upload order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NoteKind,
    pub heading: String,
    pub content: String,
    pub audio_duration: Option<f64>,
    pub is_favourite: bool,
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// The audio recording, if one was uploaded
    pub fn audio(&self) -> Option<&Attachment> {
        self.attachments
            .iter()
            .find(|a| a.kind == AttachmentKind::Audio)
    }

    pub fn images(&self) -> impl Iterator<Item = &Attachment> {
        self.attachments
            .iter()
            .filter(|a| a.kind == AttachmentKind::Image)
    }

    /// Number of images; always derived from the attachment list
    pub fn image_count(&self) -> usize {
        self.images().count()
    }

    pub fn attachment(&self, id: Uuid) -> Option<&Attachment> {
        self.attachments.iter().find(|a| a.id == id)
    }

    pub fn attachment_keys(&self) -> Vec<String> {
        self.attachments.iter().map(|a| a.key.clone()).collect()
    }
}

/// Attachment creation payload; the file is already on disk under `key`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAttachment {
    pub id: Uuid,
    pub kind: AttachmentKind,
    pub key: String,
    pub file_name: String,
    pub content_type: String,
}

/// New note creation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNote {
    pub user_id: Uuid,
    pub kind: NoteKind,
    pub heading: String,
    pub content: String,
    pub audio_duration: Option<f64>,
    /// Creation time reported by the client; the server clock when absent
    pub created_at: Option<DateTime<Utc>>,
    pub attachments: Vec<NewAttachment>,
}

impl NewNote {
    /// Whether `note` is a resubmission of this payload
    ///
    /// Only payloads that carry a client creation time can be recognised as
    /// duplicates.
    pub fn duplicates(&self, note: &Note) -> bool {
        match self.created_at {
            Some(created_at) => {
                note.user_id == self.user_id
                    && note.kind == self.kind
                    && note.heading == self.heading
                    && note.content == self.content
                    && note.created_at == created_at
            }
            None => false,
        }
    }
}

/// Partial note update; `None` leaves the field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoteChanges {
    pub heading: Option<String>,
    pub content: Option<String>,
    pub is_favourite: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(kind: AttachmentKind, key: &str) -> Attachment {
        Attachment {
            id: Uuid::new_v4(),
            note_id: Uuid::nil(),
            kind,
            key: key.to_string(),
            file_name: key.to_string(),
            content_type: "application/octet-stream".to_string(),
            created_at: Utc::now(),
        }
    }

    fn note(attachments: Vec<Attachment>) -> Note {
        let now = Utc::now();
        Note {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            kind: NoteKind::Audio,
            heading: "H".into(),
            content: "C".into(),
            audio_duration: Some(3.5),
            is_favourite: false,
            attachments,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_image_count_is_derived() {
        let note = note(vec![
            attachment(AttachmentKind::Audio, "u/audio/a.webm"),
            attachment(AttachmentKind::Image, "u/images/1.png"),
            attachment(AttachmentKind::Image, "u/images/2.png"),
        ]);

        assert_eq!(note.image_count(), 2);
        assert_eq!(note.audio().map(|a| a.key.as_str()), Some("u/audio/a.webm"));
        let keys: Vec<_> = note.images().map(|a| a.key.as_str()).collect();
        assert_eq!(keys, ["u/images/1.png", "u/images/2.png"]);
    }

    #[test]
    fn test_duplicates_requires_client_timestamp() {
        let existing = note(vec![]);
        let mut candidate = NewNote {
            user_id: existing.user_id,
            kind: existing.kind,
            heading: existing.heading.clone(),
            content: existing.content.clone(),
            audio_duration: None,
            created_at: None,
            attachments: vec![],
        };
        assert!(!candidate.duplicates(&existing));

        candidate.created_at = Some(existing.created_at);
        assert!(candidate.duplicates(&existing));

        candidate.heading = "Other".into();
        assert!(!candidate.duplicates(&existing));
    }

    #[test]
    fn test_note_kind_round_trips_through_str() {
        assert_eq!("audio".parse::<NoteKind>(), Ok(NoteKind::Audio));
        assert_eq!(NoteKind::Text.to_string(), "text");
        assert!("video".parse::<NoteKind>().is_err());
        assert_eq!(AttachmentKind::Image.directory(), "images");
    }
}
