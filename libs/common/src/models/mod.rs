//! Domain models shared by the Noter services

pub mod note;
pub mod user;

// Re-export for convenience
pub use note::{Attachment, AttachmentKind, NewAttachment, NewNote, Note, NoteChanges, NoteKind};
pub use user::{NewUser, UpdateUser, User};
