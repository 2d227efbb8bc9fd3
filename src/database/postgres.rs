use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::manager::DatabaseManager;
use super::models::{NewNote, Note, NoteChanges, UpsertUser, User, UserProfile};
use super::store::{now, NoteStore, Store, StoreError, UserStore};

const USER_COLUMNS: &str = "id, email, name, first_name, last_name, image_url, provider, \
                            provider_id, last_signed_in, created_at, updated_at";
const NOTE_COLUMNS: &str = "id, title, content, user_id, created_at, updated_at";

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Unique violations on `users.email` mean another identity owns the address.
fn map_user_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() && db_err.constraint() == Some("users_email_key") {
            return StoreError::EmailConflict;
        }
    }
    StoreError::Sqlx(err)
}

#[async_trait]
impl UserStore for PgStore {
    async fn upsert_user(&self, user: UpsertUser) -> Result<User, StoreError> {
        // Single statement: concurrent first sign-ins resolve on the primary key.
        let sql = format!(
            r#"
            INSERT INTO users (id, email, name, first_name, last_name, image_url,
                               provider, provider_id, last_signed_in, created_at, updated_at)
            VALUES ($1, COALESCE($2, $3), $4, $5, $6, $7, $8, COALESCE($9, $1), $10, $10, $10)
            ON CONFLICT (id) DO UPDATE SET
                email = COALESCE($2, users.email),
                name = COALESCE($4, users.name),
                first_name = COALESCE($5, users.first_name),
                last_name = COALESCE($6, users.last_name),
                image_url = COALESCE($7, users.image_url),
                provider = COALESCE($8, users.provider),
                provider_id = COALESCE($9, users.provider_id),
                last_signed_in = $10,
                updated_at = $10
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(&user.id)
            .bind(&user.email)
            .bind(&user.placeholder_email)
            .bind(&user.name)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.image_url)
            .bind(&user.provider)
            .bind(&user.provider_id)
            .bind(user.signed_in_at)
            .fetch_one(&self.pool)
            .await
            .map_err(map_user_write_error)
    }

    async fn user_profile(&self, id: &str) -> Result<Option<UserProfile>, StoreError> {
        let profile = sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT u.id, u.email, u.name, u.first_name, u.last_name, u.image_url,
                   u.provider, u.last_signed_in,
                   (SELECT COUNT(*) FROM notes n WHERE n.user_id = u.id) AS notes_count
            FROM users u
            WHERE u.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }
}

#[async_trait]
impl NoteStore for PgStore {
    async fn create_note(&self, owner: &str, note: NewNote) -> Result<Note, StoreError> {
        let note = Note::new(owner, note, now());
        let sql = format!(
            "INSERT INTO notes ({NOTE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {NOTE_COLUMNS}"
        );
        let created = sqlx::query_as::<_, Note>(&sql)
            .bind(note.id)
            .bind(&note.title)
            .bind(&note.content)
            .bind(&note.user_id)
            .bind(note.created_at)
            .bind(note.updated_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn list_notes(&self, owner: &str) -> Result<Vec<Note>, StoreError> {
        let sql = format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        );
        let notes = sqlx::query_as::<_, Note>(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;
        Ok(notes)
    }

    async fn update_note(
        &self,
        owner: &str,
        id: Uuid,
        changes: NoteChanges,
    ) -> Result<Option<Note>, StoreError> {
        let sql = format!(
            r#"
            UPDATE notes
            SET title = COALESCE($3, title),
                content = COALESCE($4, content),
                updated_at = $5
            WHERE id = $1 AND user_id = $2
            RETURNING {NOTE_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, Note>(&sql)
            .bind(id)
            .bind(owner)
            .bind(&changes.title)
            .bind(&changes.content)
            .bind(now())
            .fetch_optional(&self.pool)
            .await?;
        Ok(updated)
    }

    async fn delete_note(&self, owner: &str, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        DatabaseManager::health_check(&self.pool).await
    }
}
