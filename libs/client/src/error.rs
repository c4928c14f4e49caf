//! Client error types

use reqwest::StatusCode;
use thiserror::Error;

/// Errors returned by [`crate::NoterClient`] and the state helpers built on it
#[derive(Error, Debug)]
pub enum ClientError {
    /// The server answered with a non-success status
    #[error("{message}")]
    Api { status: StatusCode, message: String },

    /// The request never got an answer
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The answer could not be understood
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// An authorized call was made without an access token
    #[error("You should be logged in to perform this action.")]
    NotLoggedIn,
}

impl ClientError {
    /// HTTP status of an [`ClientError::Api`] error
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
