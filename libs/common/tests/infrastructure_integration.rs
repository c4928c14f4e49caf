//! Integration tests for the PostgreSQL repositories
//!
//! These tests need a running PostgreSQL instance. They read its URL from
//! `TEST_DATABASE_URL` and return early when it is not set.

use chrono::{Duration, Utc};
use common::{
    database::{DatabaseConfig, health_check, init_pool, migrate},
    error::RepositoryError,
    models::{AttachmentKind, NewAttachment, NewNote, NewUser, NoteChanges, NoteKind, UpdateUser},
    repositories::{NoteRepository, PgNoteRepository, PgUserRepository, UserRepository},
};
use sqlx::PgPool;
use uuid::Uuid;

async fn test_pool() -> Option<PgPool> {
    let database_url = std::env::var("TEST_DATABASE_URL").ok()?;
    let pool = init_pool(&DatabaseConfig {
        database_url,
        max_connections: 2,
    })
    .await
    .expect("Failed to connect to the test database");
    migrate(&pool).await.expect("Failed to apply schema");
    Some(pool)
}

fn unique_email() -> String {
    format!("{}@example.com", Uuid::new_v4().simple())
}

#[tokio::test]
async fn test_user_repository_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let Some(pool) = test_pool().await else {
        return Ok(());
    };
    assert!(health_check(&pool).await?, "Database health check failed");

    let users = PgUserRepository::new(pool.clone());
    let email = unique_email();
    let user = users
        .create(NewUser {
            name: "Jane Doe".to_string(),
            email_address: email.clone(),
            password_hash: "hash".to_string(),
        })
        .await?;

    let conflict = users
        .create(NewUser {
            name: "Other".to_string(),
            email_address: email.clone(),
            password_hash: "hash".to_string(),
        })
        .await;
    assert!(matches!(conflict, Err(RepositoryError::Conflict(_))));

    let found = users.find_by_email(&email).await?.expect("user by email");
    assert_eq!(found.id, user.id);

    let updated = users
        .update(
            user.id,
            UpdateUser {
                name: Some("Jane Roe".to_string()),
                ..Default::default()
            },
        )
        .await?
        .expect("updated user");
    assert_eq!(updated.name, "Jane Roe");
    assert_eq!(updated.email_address, email);

    assert!(users.delete(user.id).await?);
    assert!(users.find_by_id(user.id).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_note_repository_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let Some(pool) = test_pool().await else {
        return Ok(());
    };

    let users = PgUserRepository::new(pool.clone());
    let notes = PgNoteRepository::new(pool.clone());
    let owner = users
        .create(NewUser {
            name: "Note Owner".to_string(),
            email_address: unique_email(),
            password_hash: "hash".to_string(),
        })
        .await?;

    let audio_id = Uuid::new_v4();
    let payload = NewNote {
        user_id: owner.id,
        kind: NoteKind::Audio,
        heading: "Standup".to_string(),
        content: "transcript".to_string(),
        audio_duration: Some(12.5),
        created_at: Some(Utc::now() - Duration::minutes(5)),
        attachments: vec![NewAttachment {
            id: audio_id,
            kind: AttachmentKind::Audio,
            key: format!("{}/audio/{}.webm", owner.id, audio_id),
            file_name: "standup.webm".to_string(),
            content_type: "audio/webm".to_string(),
        }],
    };

    assert!(!notes.is_duplicate(&payload).await?);
    let note = notes.create(payload.clone()).await?;
    assert!(notes.is_duplicate(&payload).await?);
    assert_eq!(note.audio().map(|a| a.id), Some(audio_id));

    let image_id = Uuid::new_v4();
    let note = notes
        .add_attachment(
            owner.id,
            note.id,
            NewAttachment {
                id: image_id,
                kind: AttachmentKind::Image,
                key: format!("{}/images/{}.png", owner.id, image_id),
                file_name: "board.png".to_string(),
                content_type: "image/png".to_string(),
            },
        )
        .await?
        .expect("note with image");
    assert_eq!(note.image_count(), 1);

    let stranger = Uuid::new_v4();
    assert!(notes.find(stranger, note.id).await?.is_none());
    assert!(!notes.remove_attachment(stranger, note.id, image_id).await?);
    assert!(notes.remove_attachment(owner.id, note.id, image_id).await?);

    let note = notes
        .update(
            owner.id,
            note.id,
            NoteChanges {
                is_favourite: Some(true),
                ..Default::default()
            },
        )
        .await?
        .expect("updated note");
    assert!(note.is_favourite);
    assert_eq!(note.image_count(), 0);

    assert_eq!(notes.list(owner.id).await?.len(), 1);
    assert_eq!(notes.delete_all(owner.id).await?, 1);
    assert!(notes.list(owner.id).await?.is_empty());

    users.delete(owner.id).await?;
    Ok(())
}
