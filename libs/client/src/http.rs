//! HTTP client for the Noter REST API

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::{
    RequestBuilder, Response, StatusCode, header,
    multipart::{Form, Part},
};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::{
    error::{ClientError, ClientResult},
    models::{
        AudioDownload, FileUpload, LoginRequest, LoginResponse, MessageResponse, NewNoteForm,
        Note, NoteMessageResponse, NoteResponse, NotesResponse, ProfileResponse, RefreshResponse,
        ResetPasswordRequest, SignupRequest, UpdateNoteRequest, UpdateUserRequest,
        UpdateUserResponse, UserProfile,
    },
    session::AuthApi,
};

/// Client for one Noter backend
///
/// Keeps the refresh cookie in its own cookie store and the access token
/// in memory, so clones share one session.
#[derive(Clone)]
pub struct NoterClient {
    http: reqwest::Client,
    api_url: String,
    token: Arc<RwLock<Option<String>>>,
}

impl NoterClient {
    /// `api_url` is the API root, e.g. `http://localhost:5000/api`
    pub fn new(api_url: impl Into<String>) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: Arc::new(RwLock::new(None)),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    pub async fn access_token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    pub async fn set_access_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }

    async fn authorized(&self, request: RequestBuilder) -> ClientResult<RequestBuilder> {
        let token = self.access_token().await.ok_or(ClientError::NotLoggedIn)?;
        Ok(request.bearer_auth(token))
    }

    async fn send(&self, request: RequestBuilder) -> ClientResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        debug!("{} {}", response.url().path(), status);
        if status.is_success() {
            return Ok(response);
        }

        let message = match response.json::<MessageResponse>().await {
            Ok(body) => body.message,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string(),
        };
        Err(ClientError::Api { status, message })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn message(&self, request: RequestBuilder) -> ClientResult<String> {
        let response = self.send(request).await?;
        Ok(Self::decode::<MessageResponse>(response).await?.message)
    }

    // Users

    pub async fn signup(&self, request: &SignupRequest) -> ClientResult<String> {
        self.message(self.http.post(self.url("/user/new")).json(request))
            .await
    }

    pub async fn login(&self, request: &LoginRequest) -> ClientResult<LoginResponse> {
        let response = self
            .send(self.http.post(self.url("/user/authenticate")).json(request))
            .await?;
        let body: LoginResponse = Self::decode(response).await?;
        self.set_access_token(Some(body.token.clone())).await;
        Ok(body)
    }

    /// Exchange the refresh cookie for a new access token
    pub async fn refresh(&self) -> ClientResult<RefreshResponse> {
        let response = self.send(self.http.get(self.url("/user/refresh"))).await?;
        let body: RefreshResponse = Self::decode(response).await?;
        self.set_access_token(Some(body.token.clone())).await;
        Ok(body)
    }

    pub async fn logout(&self) -> ClientResult<String> {
        let message = self
            .message(self.http.post(self.url("/user/logout")))
            .await?;
        self.set_access_token(None).await;
        Ok(message)
    }

    pub async fn reset_password(&self, request: &ResetPasswordRequest) -> ClientResult<String> {
        self.message(
            self.http
                .patch(self.url("/user/reset-password"))
                .json(request),
        )
        .await
    }

    pub async fn get_user(&self) -> ClientResult<UserProfile> {
        let request = self.authorized(self.http.get(self.url("/user/get"))).await?;
        let response = self.send(request).await?;
        Ok(Self::decode::<ProfileResponse>(response).await?.user)
    }

    pub async fn update_user(&self, request: &UpdateUserRequest) -> ClientResult<UpdateUserResponse> {
        let request = self
            .authorized(self.http.patch(self.url("/user/update")).json(request))
            .await?;
        Self::decode(self.send(request).await?).await
    }

    /// Delete the account with all its notes and files
    pub async fn delete_user(&self) -> ClientResult<String> {
        let request = self
            .authorized(self.http.delete(self.url("/user/delete")))
            .await?;
        let message = self.message(request).await?;
        self.set_access_token(None).await;
        Ok(message)
    }

    // Notes

    pub async fn create_note(&self, form: &NewNoteForm) -> ClientResult<Note> {
        let mut multipart = Form::new()
            .text("type", form.kind.to_string())
            .text("heading", form.heading.clone())
            .text("content", form.content.clone());
        if let Some(duration) = form.audio_duration {
            multipart = multipart.text("audioDuration", duration.to_string());
        }
        if let Some(created_at) = form.created_at {
            multipart = multipart.text(
                "createdAt",
                created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            );
        }
        if let Some(audio) = &form.audio {
            multipart = multipart.part("audioRecording", file_part(audio)?);
        }
        for image in &form.images {
            multipart = multipart.part("images", file_part(image)?);
        }

        let request = self
            .authorized(self.http.post(self.url("/note/new")).multipart(multipart))
            .await?;
        let response = self.send(request).await?;
        Ok(Self::decode::<NoteMessageResponse>(response).await?.note)
    }

    pub async fn get_note(&self, id: Uuid) -> ClientResult<Note> {
        let request = self
            .authorized(self.http.get(self.url("/note/get")).query(&[("id", id)]))
            .await?;
        let response = self.send(request).await?;
        Ok(Self::decode::<NoteResponse>(response).await?.note)
    }

    /// Every note of the logged in user, newest first
    pub async fn get_all_notes(&self) -> ClientResult<Vec<Note>> {
        let request = self
            .authorized(self.http.get(self.url("/note/get-all")))
            .await?;
        let response = self.send(request).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        Ok(Self::decode::<NotesResponse>(response).await?.notes)
    }

    pub async fn get_audio_recording(&self, id: Uuid) -> ClientResult<AudioDownload> {
        let request = self
            .authorized(
                self.http
                    .get(self.url("/note/get-audio-recording"))
                    .query(&[("id", id)]),
            )
            .await?;
        let response = self.send(request).await?;

        let headers = response.headers();
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let file_name = headers
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(disposition_file_name);
        let bytes = response.bytes().await?.to_vec();

        Ok(AudioDownload {
            file_name,
            content_type,
            bytes,
        })
    }

    pub async fn update_note(&self, request: &UpdateNoteRequest) -> ClientResult<Note> {
        let request = self
            .authorized(self.http.patch(self.url("/note/update")).json(request))
            .await?;
        let response = self.send(request).await?;
        Ok(Self::decode::<NoteMessageResponse>(response).await?.note)
    }

    pub async fn upload_image(&self, note_id: Uuid, image: &FileUpload) -> ClientResult<Note> {
        let multipart = Form::new()
            .text("id", note_id.to_string())
            .part("image", file_part(image)?);
        let request = self
            .authorized(
                self.http
                    .patch(self.url("/note/upload-image"))
                    .multipart(multipart),
            )
            .await?;
        let response = self.send(request).await?;
        Ok(Self::decode::<NoteMessageResponse>(response).await?.note)
    }

    /// Remove one image; `image` is its URL as found in [`Note::images`]
    pub async fn delete_image(&self, note_id: Uuid, image: &str) -> ClientResult<Note> {
        let request = self
            .authorized(
                self.http
                    .delete(self.url("/note/delete-image"))
                    .query(&[("id", note_id.to_string().as_str()), ("image", image)]),
            )
            .await?;
        let response = self.send(request).await?;
        Ok(Self::decode::<NoteMessageResponse>(response).await?.note)
    }

    pub async fn delete_note(&self, id: Uuid) -> ClientResult<String> {
        let request = self
            .authorized(self.http.delete(self.url("/note/delete")).query(&[("id", id)]))
            .await?;
        self.message(request).await
    }

    pub async fn delete_all_notes(&self) -> ClientResult<String> {
        let request = self
            .authorized(self.http.delete(self.url("/note/delete-all")))
            .await?;
        self.message(request).await
    }
}

#[async_trait]
impl AuthApi for NoterClient {
    async fn signup(&self, request: &SignupRequest) -> ClientResult<String> {
        NoterClient::signup(self, request).await
    }

    async fn login(&self, request: &LoginRequest) -> ClientResult<LoginResponse> {
        NoterClient::login(self, request).await
    }

    async fn refresh(&self) -> ClientResult<RefreshResponse> {
        NoterClient::refresh(self).await
    }

    async fn reset_password(&self, request: &ResetPasswordRequest) -> ClientResult<String> {
        NoterClient::reset_password(self, request).await
    }

    async fn logout(&self) -> ClientResult<String> {
        NoterClient::logout(self).await
    }
}

fn file_part(file: &FileUpload) -> ClientResult<Part> {
    Ok(Part::bytes(file.bytes.clone())
        .file_name(file.file_name.clone())
        .mime_str(&file.content_type)?)
}

/// `filename` parameter of a `Content-Disposition` header
fn disposition_file_name(value: &str) -> Option<String> {
    value
        .split(';')
        .map(str::trim)
        .find_map(|param| param.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
}
