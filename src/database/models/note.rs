use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    /// Rich text markup, stored verbatim.
    pub content: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated note ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNote {
    pub title: String,
    pub content: String,
}

/// A validated partial update. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteChanges {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl Note {
    pub fn new(user_id: &str, note: NewNote, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: note.title,
            content: note.content,
            user_id: user_id.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, changes: NoteChanges, now: DateTime<Utc>) {
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(content) = changes.content {
            self.content = content;
        }
        self.updated_at = now;
    }
}
