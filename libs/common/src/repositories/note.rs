//! PostgreSQL note repository

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

use super::NoteRepository;
use crate::error::{DatabaseError, RepositoryError, RepositoryResult};
use crate::models::{Attachment, NewAttachment, NewNote, Note, NoteChanges};

const NOTE_COLUMNS: &str = "id, user_id, kind, heading, content, audio_duration, is_favourite, created_at, updated_at";

/// Note repository backed by PostgreSQL
#[derive(Clone)]
pub struct PgNoteRepository {
    pool: PgPool,
}

impl PgNoteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Load the attachments of `notes` and attach them in upload order
    async fn hydrate(&self, rows: Vec<PgRow>) -> RepositoryResult<Vec<Note>> {
        let mut notes = rows
            .iter()
            .map(note_from_row)
            .collect::<RepositoryResult<Vec<_>>>()?;
        if notes.is_empty() {
            return Ok(notes);
        }

        let ids: Vec<Uuid> = notes.iter().map(|n| n.id).collect();
        let rows = sqlx::query(
            r#"
            SELECT id, note_id, kind, storage_key, file_name, content_type, created_at
            FROM attachments
            WHERE note_id = ANY($1)
            ORDER BY seq
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(query_error)?;

        let mut by_note: HashMap<Uuid, Vec<Attachment>> = HashMap::new();
        for row in &rows {
            let attachment = attachment_from_row(row)?;
            by_note
                .entry(attachment.note_id)
                .or_default()
                .push(attachment);
        }

        for note in &mut notes {
            note.attachments = by_note.remove(&note.id).unwrap_or_default();
        }
        Ok(notes)
    }

    async fn fetch_one(&self, owner: Uuid, id: Uuid) -> RepositoryResult<Option<Note>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM notes WHERE id = $1 AND user_id = $2",
            NOTE_COLUMNS
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

fn query_error(e: sqlx::Error) -> RepositoryError {
    DatabaseError::Query(e).into()
}

fn note_from_row(row: &PgRow) -> RepositoryResult<Note> {
    let kind: String = row.get("kind");
    Ok(Note {
        id: row.get("id"),
        user_id: row.get("user_id"),
        kind: kind.parse().map_err(DatabaseError::Decode)?,
        heading: row.get("heading"),
        content: row.get("content"),
        audio_duration: row.get("audio_duration"),
        is_favourite: row.get("is_favourite"),
        attachments: Vec::new(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn attachment_from_row(row: &PgRow) -> RepositoryResult<Attachment> {
    let kind: String = row.get("kind");
    Ok(Attachment {
        id: row.get("id"),
        note_id: row.get("note_id"),
        kind: kind.parse().map_err(DatabaseError::Decode)?,
        key: row.get("storage_key"),
        file_name: row.get("file_name"),
        content_type: row.get("content_type"),
        created_at: row.get("created_at"),
    })
}

async fn insert_attachment(
    tx: &mut Transaction<'_, Postgres>,
    note_id: Uuid,
    attachment: &NewAttachment,
) -> RepositoryResult<()> {
    sqlx::query(
        r#"
        INSERT INTO attachments (id, note_id, kind, storage_key, file_name, content_type)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(attachment.id)
    .bind(note_id)
    .bind(attachment.kind.as_str())
    .bind(&attachment.key)
    .bind(&attachment.file_name)
    .bind(&attachment.content_type)
    .execute(&mut **tx)
    .await
    .map_err(query_error)?;
    Ok(())
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn create(&self, new_note: NewNote) -> RepositoryResult<Note> {
        info!("Creating {} note for user {}", new_note.kind, new_note.user_id);

        let id = Uuid::new_v4();
        let mut tx = self.pool.begin().await.map_err(query_error)?;

        sqlx::query(
            r#"
            INSERT INTO notes (id, user_id, kind, heading, content, audio_duration, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, NOW()), COALESCE($7, NOW()))
            "#,
        )
        .bind(id)
        .bind(new_note.user_id)
        .bind(new_note.kind.as_str())
        .bind(&new_note.heading)
        .bind(&new_note.content)
        .bind(new_note.audio_duration)
        .bind(new_note.created_at)
        .execute(&mut *tx)
        .await
        .map_err(query_error)?;

        for attachment in &new_note.attachments {
            insert_attachment(&mut tx, id, attachment).await?;
        }

        tx.commit().await.map_err(query_error)?;

        self.fetch_one(new_note.user_id, id).await?.ok_or_else(|| {
            DatabaseError::Decode(format!("note {} vanished after insert", id)).into()
        })
    }

    async fn is_duplicate(&self, new_note: &NewNote) -> RepositoryResult<bool> {
        let Some(created_at) = new_note.created_at else {
            return Ok(false);
        };

        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM notes
                WHERE user_id = $1 AND kind = $2 AND heading = $3
                  AND content = $4 AND created_at = $5
            ) AS found
            "#,
        )
        .bind(new_note.user_id)
        .bind(new_note.kind.as_str())
        .bind(&new_note.heading)
        .bind(&new_note.content)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(query_error)?;

        Ok(row.get("found"))
    }

    async fn find(&self, owner: Uuid, id: Uuid) -> RepositoryResult<Option<Note>> {
        self.fetch_one(owner, id).await
    }

    async fn list(&self, owner: Uuid) -> RepositoryResult<Vec<Note>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM notes WHERE user_id = $1 ORDER BY created_at DESC, id",
            NOTE_COLUMNS
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(query_error)?;

        self.hydrate(rows).await
    }

    async fn update(
        &self,
        owner: Uuid,
        id: Uuid,
        changes: NoteChanges,
    ) -> RepositoryResult<Option<Note>> {
        info!("Updating note {}", id);

        let result = sqlx::query(
            r#"
            UPDATE notes
            SET heading = COALESCE($3, heading),
                content = COALESCE($4, content),
                is_favourite = COALESCE($5, is_favourite),
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(changes.heading)
        .bind(changes.content)
        .bind(changes.is_favourite)
        .execute(&self.pool)
        .await
        .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.fetch_one(owner, id).await
    }

    async fn add_attachment(
        &self,
        owner: Uuid,
        note_id: Uuid,
        attachment: NewAttachment,
    ) -> RepositoryResult<Option<Note>> {
        let mut tx = self.pool.begin().await.map_err(query_error)?;

        let touched = sqlx::query(
            "UPDATE notes SET updated_at = NOW() WHERE id = $1 AND user_id = $2",
        )
        .bind(note_id)
        .bind(owner)
        .execute(&mut *tx)
        .await
        .map_err(query_error)?;

        if touched.rows_affected() == 0 {
            warn!("Attachment for unknown note {}", note_id);
            return Ok(None);
        }

        insert_attachment(&mut tx, note_id, &attachment).await?;
        tx.commit().await.map_err(query_error)?;

        self.fetch_one(owner, note_id).await
    }

    async fn remove_attachment(
        &self,
        owner: Uuid,
        note_id: Uuid,
        attachment_id: Uuid,
    ) -> RepositoryResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM attachments a
            USING notes n
            WHERE a.id = $1 AND a.note_id = $2 AND n.id = a.note_id AND n.user_id = $3
            "#,
        )
        .bind(attachment_id)
        .bind(note_id)
        .bind(owner)
        .execute(&self.pool)
        .await
        .map_err(query_error)?;

        if result.rows_affected() > 0 {
            sqlx::query("UPDATE notes SET updated_at = NOW() WHERE id = $1")
                .bind(note_id)
                .execute(&self.pool)
                .await
                .map_err(query_error)?;
        }
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, owner: Uuid, id: Uuid) -> RepositoryResult<bool> {
        info!("Deleting note {}", id);

        let result = sqlx::query("DELETE FROM notes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(query_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self, owner: Uuid) -> RepositoryResult<u64> {
        info!("Deleting all notes of user {}", owner);

        let result = sqlx::query("DELETE FROM notes WHERE user_id = $1")
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(query_error)?;

        Ok(result.rows_affected())
    }
}
