//! Client side of the notes API: an HTTP client, the in-memory note
//! collection it feeds, and the per-session state kept between CLI runs.

pub mod api;
pub mod collection;
pub mod session;

use thiserror::Error;

pub use api::{NotesClient, RetryPolicy, StaticToken, TokenSource};
pub use collection::{NoteCollection, SortDirection, SortKey};
pub use session::SessionStore;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Not signed in")]
    NotSignedIn,

    #[error("Invalid server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an error body.
    #[error("{message} ({status})")]
    Api { status: u16, message: String },

    #[error("Session storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session file is corrupt: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
