//! In-memory repository used by tests and the `memory` storage backend

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{EMAIL_TAKEN, NoteRepository, UserRepository};
use crate::error::{RepositoryError, RepositoryResult};
use crate::models::{Attachment, NewAttachment, NewNote, NewUser, Note, NoteChanges, UpdateUser, User};

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    notes: HashMap<Uuid, Note>,
}

/// Users and notes kept in process memory
///
/// Clones share the same store, so one instance can back both traits.
#[derive(Clone, Default)]
pub struct MemoryRepository {
    state: Arc<RwLock<State>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn attachment_for(note_id: Uuid, attachment: NewAttachment) -> Attachment {
    Attachment {
        id: attachment.id,
        note_id,
        kind: attachment.kind,
        key: attachment.key,
        file_name: attachment.file_name,
        content_type: attachment.content_type,
        created_at: Utc::now(),
    }
}

#[async_trait]
impl UserRepository for MemoryRepository {
    async fn create(&self, new_user: NewUser) -> RepositoryResult<User> {
        let mut state = self.state.write().await;
        if state
            .users
            .values()
            .any(|u| u.email_address == new_user.email_address)
        {
            return Err(RepositoryError::Conflict(EMAIL_TAKEN.to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: new_user.name,
            email_address: new_user.email_address,
            password_hash: new_user.password_hash,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email_address: &str) -> RepositoryResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.email_address == email_address)
            .cloned())
    }

    async fn update(&self, id: Uuid, changes: UpdateUser) -> RepositoryResult<Option<User>> {
        let mut state = self.state.write().await;
        if let Some(email) = &changes.email_address {
            if state
                .users
                .values()
                .any(|u| u.id != id && &u.email_address == email)
            {
                return Err(RepositoryError::Conflict(EMAIL_TAKEN.to_string()));
            }
        }

        let Some(user) = state.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(email) = changes.email_address {
            user.email_address = email;
        }
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<bool> {
        let mut state = self.state.write().await;
        let removed = state.users.remove(&id).is_some();
        if removed {
            state.notes.retain(|_, note| note.user_id != id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl NoteRepository for MemoryRepository {
    async fn create(&self, new_note: NewNote) -> RepositoryResult<Note> {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let created_at = new_note.created_at.unwrap_or(now);
        let note = Note {
            id,
            user_id: new_note.user_id,
            kind: new_note.kind,
            heading: new_note.heading,
            content: new_note.content,
            audio_duration: new_note.audio_duration,
            is_favourite: false,
            attachments: new_note
                .attachments
                .into_iter()
                .map(|a| attachment_for(id, a))
                .collect(),
            created_at,
            updated_at: created_at,
        };

        self.state.write().await.notes.insert(id, note.clone());
        Ok(note)
    }

    async fn is_duplicate(&self, new_note: &NewNote) -> RepositoryResult<bool> {
        let state = self.state.read().await;
        Ok(state.notes.values().any(|note| new_note.duplicates(note)))
    }

    async fn find(&self, owner: Uuid, id: Uuid) -> RepositoryResult<Option<Note>> {
        let state = self.state.read().await;
        Ok(state
            .notes
            .get(&id)
            .filter(|note| note.user_id == owner)
            .cloned())
    }

    async fn list(&self, owner: Uuid) -> RepositoryResult<Vec<Note>> {
        let state = self.state.read().await;
        let mut notes: Vec<Note> = state
            .notes
            .values()
            .filter(|note| note.user_id == owner)
            .cloned()
            .collect();
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(notes)
    }

    async fn update(
        &self,
        owner: Uuid,
        id: Uuid,
        changes: NoteChanges,
    ) -> RepositoryResult<Option<Note>> {
        let mut state = self.state.write().await;
        let Some(note) = state.notes.get_mut(&id).filter(|n| n.user_id == owner) else {
            return Ok(None);
        };

        if let Some(heading) = changes.heading {
            note.heading = heading;
        }
        if let Some(content) = changes.content {
            note.content = content;
        }
        if let Some(is_favourite) = changes.is_favourite {
            note.is_favourite = is_favourite;
        }
        note.updated_at = Utc::now();
        Ok(Some(note.clone()))
    }

    async fn add_attachment(
        &self,
        owner: Uuid,
        note_id: Uuid,
        attachment: NewAttachment,
    ) -> RepositoryResult<Option<Note>> {
        let mut state = self.state.write().await;
        let Some(note) = state
            .notes
            .get_mut(&note_id)
            .filter(|n| n.user_id == owner)
        else {
            return Ok(None);
        };

        note.attachments.push(attachment_for(note_id, attachment));
        note.updated_at = Utc::now();
        Ok(Some(note.clone()))
    }

    async fn remove_attachment(
        &self,
        owner: Uuid,
        note_id: Uuid,
        attachment_id: Uuid,
    ) -> RepositoryResult<bool> {
        let mut state = self.state.write().await;
        let Some(note) = state
            .notes
            .get_mut(&note_id)
            .filter(|n| n.user_id == owner)
        else {
            return Ok(false);
        };

        let before = note.attachments.len();
        note.attachments.retain(|a| a.id != attachment_id);
        let removed = note.attachments.len() != before;
        if removed {
            note.updated_at = Utc::now();
        }
        Ok(removed)
    }

    async fn delete(&self, owner: Uuid, id: Uuid) -> RepositoryResult<bool> {
        let mut state = self.state.write().await;
        let owned = state.notes.get(&id).is_some_and(|n| n.user_id == owner);
        if owned {
            state.notes.remove(&id);
        }
        Ok(owned)
    }

    async fn delete_all(&self, owner: Uuid) -> RepositoryResult<u64> {
        let mut state = self.state.write().await;
        let before = state.notes.len();
        state.notes.retain(|_, note| note.user_id != owner);
        Ok((before - state.notes.len()) as u64)
    }
}
