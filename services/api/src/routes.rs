//! Note routes

use axum::{
    Json, Router,
    body::Body,
    extract::{
        Multipart, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderValue, StatusCode, header},
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
};
use chrono::{DateTime, SubsecRound, Utc};
use tokio_util::io::ReaderStream;
use tracing::{info, warn};
use uuid::Uuid;

use common::{
    error::{ApiError, ApiResult},
    middleware::{AuthUser, authorize},
    models::{AttachmentKind, NewAttachment, NewNote, Note, NoteChanges, NoteKind},
    storage::{StorageError, attachment_id_from_reference},
};

use crate::{
    AppState,
    extract::BaseUrl,
    models::{
        MessageResponse, NoteMessageResponse, NoteQuery, NoteResponse, NoteView, NotesResponse,
        UpdateNoteRequest,
    },
    upload::{UploadForm, UploadedFile},
};

const NOTE_NOT_FOUND: &str = "Note not found";
const IMAGE_NOT_FOUND: &str = "Image not found";
const AUDIO_NOT_FOUND: &str = "Audio recording not found";
const DUPLICATE_NOTE: &str = "Note with the given details already exists";

/// Create the router for the note routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/new", post(create_note))
        .route("/get", get(get_note))
        .route("/get-all", get(get_all_notes))
        .route("/get-audio-recording", get(get_audio_recording))
        .route("/update", patch(update_note))
        .route("/upload-image", patch(upload_image))
        .route("/delete-image", delete(delete_image))
        .route("/delete", delete(delete_note))
        .route("/delete-all", delete(delete_all_notes))
        .route_layer(from_fn_with_state(state.jwt_service.clone(), authorize))
        .with_state(state)
}

fn parse_note_id(value: Option<&str>) -> ApiResult<Uuid> {
    let value = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing note id".to_string()))?;
    Uuid::parse_str(value).map_err(|_| ApiError::BadRequest("Invalid note id".to_string()))
}

/// User ids sent by the client may only name the caller
fn ensure_caller(id: Option<&str>, caller: Uuid) -> ApiResult<()> {
    let Some(id) = id.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(());
    };
    match Uuid::parse_str(id) {
        Ok(id) if id == caller => Ok(()),
        Ok(id) => {
            warn!("User {} tried to act on notes of {}", caller, id);
            Err(ApiError::Forbidden)
        }
        Err(_) => Err(ApiError::BadRequest("Invalid user id".to_string())),
    }
}

/// Client creation time, as RFC 3339 or epoch milliseconds
fn parse_created_at(value: &str) -> ApiResult<DateTime<Utc>> {
    let value = value.trim();
    let parsed = DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            value
                .parse::<i64>()
                .ok()
                .and_then(DateTime::from_timestamp_millis)
        })
        .ok_or_else(|| ApiError::Validation("Invalid creation time".to_string()))?;

    // the database keeps microseconds
    Ok(parsed.trunc_subsecs(6))
}

/// Recording length in seconds; non-finite values count as unknown
fn parse_audio_duration(value: &str) -> ApiResult<Option<f64>> {
    let duration: f64 = value
        .trim()
        .parse()
        .map_err(|_| ApiError::Validation("Invalid audio duration".to_string()))?;
    if !duration.is_finite() {
        return Ok(None);
    }
    if duration < 0.0 {
        return Err(ApiError::Validation("Invalid audio duration".to_string()));
    }
    Ok(Some(duration))
}

fn content_disposition(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| {
            if c == ' ' || (c.is_ascii_graphic() && c != '"' && c != '\\') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let safe = match safe.trim() {
        "" => "recording",
        trimmed => trimmed,
    };
    format!("attachment; filename=\"{}\"", safe)
}

/// Write uploaded files to storage, undoing the writes if one fails
async fn store_files(
    state: &AppState,
    owner: Uuid,
    files: impl IntoIterator<Item = (AttachmentKind, UploadedFile)>,
) -> ApiResult<Vec<NewAttachment>> {
    let mut attachments: Vec<NewAttachment> = Vec::new();
    for (kind, file) in files {
        let stored = state
            .storage
            .store(owner, kind, &file.file_name, &file.content_type, &file.bytes)
            .await;
        match stored {
            Ok(stored) => attachments.push(NewAttachment {
                id: stored.id,
                kind,
                key: stored.key,
                file_name: file.file_name,
                content_type: file.content_type,
            }),
            Err(e) => {
                discard(state, &attachments).await;
                return Err(e.into());
            }
        }
    }
    Ok(attachments)
}

async fn discard(state: &AppState, attachments: &[NewAttachment]) {
    state
        .storage
        .remove_all(attachments.iter().map(|a| a.key.as_str()).collect::<Vec<_>>())
        .await;
}

async fn insert_note(state: &AppState, new_note: NewNote) -> ApiResult<Note> {
    if state.notes.is_duplicate(&new_note).await? {
        return Err(ApiError::Conflict(DUPLICATE_NOTE.to_string()));
    }
    Ok(state.notes.create(new_note).await?)
}

async fn owned_note(state: &AppState, owner: Uuid, id: Uuid) -> ApiResult<Note> {
    state
        .notes
        .find(owner, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(NOTE_NOT_FOUND.to_string()))
}

/// Create a note from a multipart form
pub async fn create_note(
    State(state): State<AppState>,
    caller: AuthUser,
    BaseUrl(base_url): BaseUrl,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut form = UploadForm::read(multipart).await?;
    ensure_caller(form.provided("userID"), caller.id)?;

    let kind = match form.provided("type") {
        Some(kind) => kind
            .trim()
            .parse::<NoteKind>()
            .map_err(|_| ApiError::Validation("Invalid note type".to_string()))?,
        None => NoteKind::Text,
    };
    let heading = form
        .provided("heading")
        .map(|h| h.trim().to_string())
        .ok_or_else(|| ApiError::Validation("Heading is required".to_string()))?;
    let content = form
        .field("content")
        .map(str::to_string)
        .ok_or_else(|| ApiError::Validation("Content is required".to_string()))?;
    let audio_duration = match form.provided("audioDuration") {
        Some(value) => parse_audio_duration(value)?,
        None => None,
    };
    let created_at = form.provided("createdAt").map(parse_created_at).transpose()?;

    let audio = form.take_files("audioRecording");
    if audio.len() > 1 {
        return Err(ApiError::Validation(
            "Only one audio recording can be attached".to_string(),
        ));
    }
    let images = form.take_files("images");

    let files = audio
        .into_iter()
        .map(|f| (AttachmentKind::Audio, f))
        .chain(images.into_iter().map(|f| (AttachmentKind::Image, f)));
    let attachments = store_files(&state, caller.id, files).await?;
    let written = attachments.clone();

    let new_note = NewNote {
        user_id: caller.id,
        kind,
        heading,
        content,
        audio_duration,
        created_at,
        attachments,
    };

    let note = match insert_note(&state, new_note).await {
        Ok(note) => note,
        Err(e) => {
            discard(&state, &written).await;
            return Err(e);
        }
    };
    info!("Created note {} for user {}", note.id, caller.id);

    Ok((
        StatusCode::CREATED,
        Json(NoteMessageResponse {
            message: "Note created successfully".to_string(),
            note: NoteView::render(&note, &base_url),
        }),
    ))
}

/// One note of the caller
pub async fn get_note(
    State(state): State<AppState>,
    caller: AuthUser,
    BaseUrl(base_url): BaseUrl,
    query: Result<Query<NoteQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query?;
    let id = parse_note_id(query.id.as_deref())?;
    let note = owned_note(&state, caller.id, id).await?;

    Ok(Json(NoteResponse {
        note: NoteView::render(&note, &base_url),
    }))
}

/// Every note of the caller, newest first; 204 when there are none
pub async fn get_all_notes(
    State(state): State<AppState>,
    caller: AuthUser,
    BaseUrl(base_url): BaseUrl,
    query: Result<Query<NoteQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(query) = query?;
    ensure_caller(query.id.as_deref(), caller.id)?;

    let notes = state.notes.list(caller.id).await?;
    if notes.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let notes = notes
        .iter()
        .map(|note| NoteView::render(note, &base_url))
        .collect();
    Ok(Json(NotesResponse { notes }).into_response())
}

/// Stream the audio recording of a note as a download
pub async fn get_audio_recording(
    State(state): State<AppState>,
    caller: AuthUser,
    query: Result<Query<NoteQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query?;
    let id = parse_note_id(query.id.as_deref())?;

    let note = state
        .notes
        .find(caller.id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(AUDIO_NOT_FOUND.to_string()))?;
    let audio = note
        .audio()
        .ok_or_else(|| ApiError::NotFound(AUDIO_NOT_FOUND.to_string()))?;

    let file = match state.storage.open(&audio.key).await {
        Ok(file) => file,
        Err(StorageError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Audio file {} of note {} is missing", audio.key, note.id);
            return Err(ApiError::NotFound(AUDIO_NOT_FOUND.to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    let content_type = HeaderValue::from_str(&audio.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&content_disposition(&audio.file_name))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    let headers = [
        (header::CONTENT_TYPE, content_type),
        (header::CONTENT_DISPOSITION, disposition),
    ];
    Ok((headers, Body::from_stream(ReaderStream::new(file))))
}

/// Update heading, content or favourite flag
pub async fn update_note(
    State(state): State<AppState>,
    caller: AuthUser,
    BaseUrl(base_url): BaseUrl,
    payload: Result<Json<UpdateNoteRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let id = parse_note_id(payload.id.as_deref())?;

    let changes = NoteChanges {
        heading: payload
            .heading
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty()),
        content: payload.content.filter(|c| !c.is_empty()),
        is_favourite: payload.is_favourite,
    };

    let note = state
        .notes
        .update(caller.id, id, changes)
        .await?
        .ok_or_else(|| ApiError::NotFound(NOTE_NOT_FOUND.to_string()))?;
    info!("Updated note {}", note.id);

    Ok((
        StatusCode::CREATED,
        Json(NoteMessageResponse {
            message: "Note details updated successfully".to_string(),
            note: NoteView::render(&note, &base_url),
        }),
    ))
}

/// Attach one image to a note
pub async fn upload_image(
    State(state): State<AppState>,
    caller: AuthUser,
    BaseUrl(base_url): BaseUrl,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut form = UploadForm::read(multipart).await?;
    let id = parse_note_id(form.field("id"))?;

    let mut images = form.take_files("image");
    if images.is_empty() {
        return Err(ApiError::Validation("No image was uploaded".to_string()));
    }
    if images.len() > 1 {
        return Err(ApiError::Validation(
            "Only one image can be uploaded at a time".to_string(),
        ));
    }
    let image = images.remove(0);

    let mut stored = store_files(&state, caller.id, [(AttachmentKind::Image, image)]).await?;
    let attachment = stored.remove(0);
    let key = attachment.key.clone();

    let note = match state.notes.add_attachment(caller.id, id, attachment).await {
        Ok(Some(note)) => note,
        Ok(None) => {
            state.storage.remove_all([key.as_str()]).await;
            return Err(ApiError::NotFound(NOTE_NOT_FOUND.to_string()));
        }
        Err(e) => {
            state.storage.remove_all([key.as_str()]).await;
            return Err(e.into());
        }
    };
    info!("Added image {} to note {}", key, note.id);

    Ok((
        StatusCode::CREATED,
        Json(NoteMessageResponse {
            message: "Image uploaded successfully".to_string(),
            note: NoteView::render(&note, &base_url),
        }),
    ))
}

/// Remove one image from a note
///
/// `image` may be the image URL, its storage key or the bare attachment id.
pub async fn delete_image(
    State(state): State<AppState>,
    caller: AuthUser,
    BaseUrl(base_url): BaseUrl,
    query: Result<Query<NoteQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query?;
    let id = parse_note_id(query.id.as_deref())?;
    let note = owned_note(&state, caller.id, id).await?;

    let attachment = query
        .image
        .as_deref()
        .and_then(attachment_id_from_reference)
        .and_then(|image_id| note.attachment(image_id))
        .filter(|a| a.kind == AttachmentKind::Image)
        .ok_or_else(|| ApiError::NotFound(IMAGE_NOT_FOUND.to_string()))?;

    if let Err(e) = state.storage.remove(&attachment.key).await {
        warn!("Failed to delete image {}: {}", attachment.key, e);
    }
    if !state
        .notes
        .remove_attachment(caller.id, note.id, attachment.id)
        .await?
    {
        return Err(ApiError::NotFound(IMAGE_NOT_FOUND.to_string()));
    }
    info!("Removed image {} from note {}", attachment.id, note.id);

    let note = owned_note(&state, caller.id, id).await?;
    Ok(Json(NoteMessageResponse {
        message: "Image deleted successfully".to_string(),
        note: NoteView::render(&note, &base_url),
    }))
}

/// Delete a note and its files
pub async fn delete_note(
    State(state): State<AppState>,
    caller: AuthUser,
    query: Result<Query<NoteQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query?;
    let id = parse_note_id(query.id.as_deref())?;
    let note = owned_note(&state, caller.id, id).await?;

    state.storage.remove_all(note.attachment_keys()).await;
    if !state.notes.delete(caller.id, note.id).await? {
        return Err(ApiError::NotFound(NOTE_NOT_FOUND.to_string()));
    }
    info!("Deleted note {}", note.id);

    Ok(Json(MessageResponse {
        message: "Note deleted successfully".to_string(),
    }))
}

/// Delete every note of the caller and their files
pub async fn delete_all_notes(
    State(state): State<AppState>,
    caller: AuthUser,
    query: Result<Query<NoteQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query?;
    ensure_caller(query.user_id.as_deref(), caller.id)?;

    let notes = state.notes.list(caller.id).await?;
    if notes.is_empty() {
        return Err(ApiError::NotFound(NOTE_NOT_FOUND.to_string()));
    }

    state
        .storage
        .remove_all(notes.iter().flat_map(|n| n.attachment_keys()).collect::<Vec<_>>())
        .await;
    let deleted = state.notes.delete_all(caller.id).await?;
    info!("Deleted {} notes of user {}", deleted, caller.id);

    Ok(Json(MessageResponse {
        message: "All notes deleted successfully".to_string(),
    }))
}
