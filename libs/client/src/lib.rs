//! Client library for Noter
//!
//! The HTTP client for the REST API plus the view state a frontend keeps
//! around it: the authentication context with its silent refresh, the
//! notes listing, form validation and the audio recorder.

pub mod error;
pub mod form;
pub mod format;
pub mod http;
pub mod listing;
pub mod models;
pub mod recorder;
pub mod session;

pub use error::{ClientError, ClientResult};
pub use http::NoterClient;
pub use session::{AuthApi, AuthContext};
