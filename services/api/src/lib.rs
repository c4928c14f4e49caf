//! Note routes for Noter
//!
//! Every route sits behind the access token middleware and only ever sees
//! the caller's own notes.

pub mod extract;
pub mod models;
pub mod routes;
pub mod state;
pub mod upload;

pub use routes::create_router;
pub use state::AppState;
