use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use thiserror::Error;
use uuid::Uuid;

use super::models::{NewNote, Note, NoteChanges, UpsertUser, User, UserProfile};

/// Errors from the storage layer
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    /// The email is already held by a different user id.
    #[error("Email address is registered to another user")]
    EmailConflict,

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert the user if absent, else refresh `last_signed_in` and any
    /// profile field present in `user`. Must be a single atomic operation.
    async fn upsert_user(&self, user: UpsertUser) -> Result<User, StoreError>;

    async fn user_profile(&self, id: &str) -> Result<Option<UserProfile>, StoreError>;
}

/// Note persistence. Every method is scoped to an owner; a note owned by
/// someone else behaves exactly like a missing one.
#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn create_note(&self, owner: &str, note: NewNote) -> Result<Note, StoreError>;

    /// Owner's notes, newest `created_at` first, ties broken by id descending.
    async fn list_notes(&self, owner: &str) -> Result<Vec<Note>, StoreError>;

    async fn update_note(
        &self,
        owner: &str,
        id: Uuid,
        changes: NoteChanges,
    ) -> Result<Option<Note>, StoreError>;

    /// Returns `false` when nothing owned by `owner` had that id.
    async fn delete_note(&self, owner: &str, id: Uuid) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait Store: UserStore + NoteStore {
    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Current time at the precision PostgreSQL keeps (microseconds).
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Sort order shared by every store implementation.
pub fn newest_first(a: &Note, b: &Note) -> std::cmp::Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}
