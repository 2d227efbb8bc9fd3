use serde::Deserialize;
use thiserror::Error;

use crate::config::NotesConfig;
use crate::database::models::{NewNote, NoteChanges};

/// A rejected note field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid field '{field}': {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn required(field: &'static str) -> Self {
        Self {
            field,
            reason: "This field is required".to_string(),
        }
    }

    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Body of `POST /api/notes`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateNoteRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

/// Body of `PUT /api/notes/:id`. Omitted fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateNoteRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

/// Field rules for note titles and content.
///
/// Values are checked but never rewritten: what passes is stored byte for
/// byte, markup included.
pub struct NoteRules<'a> {
    limits: &'a NotesConfig,
}

impl<'a> NoteRules<'a> {
    pub fn new(limits: &'a NotesConfig) -> Self {
        Self { limits }
    }

    pub fn validate_create(&self, request: CreateNoteRequest) -> Result<NewNote, ValidationError> {
        let title = request.title.ok_or_else(|| ValidationError::required("title"))?;
        let content = request
            .content
            .ok_or_else(|| ValidationError::required("content"))?;

        self.check_title(&title)?;
        self.check_content(&content)?;

        Ok(NewNote { title, content })
    }

    pub fn validate_update(&self, request: UpdateNoteRequest) -> Result<NoteChanges, ValidationError> {
        if let Some(title) = &request.title {
            self.check_title(title)?;
        }
        if let Some(content) = &request.content {
            self.check_content(content)?;
        }

        Ok(NoteChanges {
            title: request.title,
            content: request.content,
        })
    }

    fn check_title(&self, title: &str) -> Result<(), ValidationError> {
        check_text("title", title)?;
        if title.chars().count() > self.limits.max_title_length {
            return Err(ValidationError::new(
                "title",
                format!("Must be at most {} characters", self.limits.max_title_length),
            ));
        }
        Ok(())
    }

    fn check_content(&self, content: &str) -> Result<(), ValidationError> {
        check_text("content", content)?;
        if content.len() > self.limits.max_content_bytes {
            return Err(ValidationError::new(
                "content",
                format!("Must be at most {} bytes", self.limits.max_content_bytes),
            ));
        }
        Ok(())
    }
}

fn check_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::required(field));
    }
    // PostgreSQL text columns cannot hold NUL
    if value.contains('\0') {
        return Err(ValidationError::new(field, "Must not contain NUL characters"));
    }
    Ok(())
}
