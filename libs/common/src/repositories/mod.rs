//! Repository traits and their implementations
//!
//! Handlers only ever see the traits, so the services run the same way on
//! PostgreSQL and on the in-memory store used for tests and demos.

mod memory;
mod note;
mod user;

pub use memory::MemoryRepository;
pub use note::PgNoteRepository;
pub use user::PgUserRepository;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::RepositoryResult;
use crate::models::{NewAttachment, NewNote, NewUser, Note, NoteChanges, UpdateUser, User};

/// Message used when an email address is already registered
pub const EMAIL_TAKEN: &str = "Email address already in use";

/// User persistence
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a user; fails with a conflict when the email is taken
    async fn create(&self, new_user: NewUser) -> RepositoryResult<User>;

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<User>>;

    async fn find_by_email(&self, email_address: &str) -> RepositoryResult<Option<User>>;

    /// Apply `changes`; `None` when the user does not exist
    async fn update(&self, id: Uuid, changes: UpdateUser) -> RepositoryResult<Option<User>>;

    /// Delete the user and everything they own
    async fn delete(&self, id: Uuid) -> RepositoryResult<bool>;
}

/// Note persistence; every lookup is scoped to the owning user
#[async_trait]
pub trait NoteRepository: Send + Sync {
    async fn create(&self, new_note: NewNote) -> RepositoryResult<Note>;

    /// Whether the owner already has a note matching this payload
    async fn is_duplicate(&self, new_note: &NewNote) -> RepositoryResult<bool>;

    async fn find(&self, owner: Uuid, id: Uuid) -> RepositoryResult<Option<Note>>;

    /// All notes of `owner`, newest first
    async fn list(&self, owner: Uuid) -> RepositoryResult<Vec<Note>>;

    async fn update(
        &self,
        owner: Uuid,
        id: Uuid,
        changes: NoteChanges,
    ) -> RepositoryResult<Option<Note>>;

    /// Append an attachment; `None` when the note does not exist
    async fn add_attachment(
        &self,
        owner: Uuid,
        note_id: Uuid,
        attachment: NewAttachment,
    ) -> RepositoryResult<Option<Note>>;

    async fn remove_attachment(
        &self,
        owner: Uuid,
        note_id: Uuid,
        attachment_id: Uuid,
    ) -> RepositoryResult<bool>;

    async fn delete(&self, owner: Uuid, id: Uuid) -> RepositoryResult<bool>;

    /// Delete every note of `owner`, returning how many were removed
    async fn delete_all(&self, owner: Uuid) -> RepositoryResult<u64>;
}
