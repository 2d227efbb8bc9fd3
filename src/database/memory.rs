use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{NewNote, Note, NoteChanges, UpsertUser, User, UserProfile};
use super::store::{newest_first, now, NoteStore, Store, StoreError, UserStore};

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    notes: HashMap<Uuid, Note>,
}

/// In-process store used for local development (`NOTES_STORE=memory`) and
/// tests. Each operation holds the lock for its whole read-modify-write, which
/// gives the same per-statement atomicity as the PostgreSQL store.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn upsert_user(&self, upsert: UpsertUser) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;

        let email = match (&upsert.email, tables.users.get(&upsert.id)) {
            (Some(email), _) => email.clone(),
            (None, Some(existing)) => existing.email.clone(),
            (None, None) => upsert.placeholder_email.clone(),
        };
        let taken = tables
            .users
            .values()
            .any(|other| other.id != upsert.id && other.email == email);
        if taken {
            return Err(StoreError::EmailConflict);
        }

        let at = upsert.signed_in_at;
        let user = match tables.users.get(&upsert.id) {
            Some(existing) => User {
                id: existing.id.clone(),
                email,
                name: upsert.name.or_else(|| existing.name.clone()),
                first_name: upsert.first_name.or_else(|| existing.first_name.clone()),
                last_name: upsert.last_name.or_else(|| existing.last_name.clone()),
                image_url: upsert.image_url.or_else(|| existing.image_url.clone()),
                provider: upsert.provider.or_else(|| existing.provider.clone()),
                provider_id: upsert.provider_id.or_else(|| existing.provider_id.clone()),
                last_signed_in: at,
                created_at: existing.created_at,
                updated_at: at,
            },
            None => User {
                id: upsert.id.clone(),
                email,
                name: upsert.name,
                first_name: upsert.first_name,
                last_name: upsert.last_name,
                image_url: upsert.image_url,
                provider: upsert.provider,
                provider_id: upsert.provider_id.or_else(|| Some(upsert.id.clone())),
                last_signed_in: at,
                created_at: at,
                updated_at: at,
            },
        };

        tables.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn user_profile(&self, id: &str) -> Result<Option<UserProfile>, StoreError> {
        let tables = self.tables.read().await;
        let Some(user) = tables.users.get(id) else {
            return Ok(None);
        };
        let count = tables.notes.values().filter(|n| n.user_id == id).count() as i64;
        Ok(Some(UserProfile::from_user(user.clone(), count)))
    }
}

#[async_trait]
impl NoteStore for MemoryStore {
    async fn create_note(&self, owner: &str, note: NewNote) -> Result<Note, StoreError> {
        let note = Note::new(owner, note, now());
        self.tables
            .write()
            .await
            .notes
            .insert(note.id, note.clone());
        Ok(note)
    }

    async fn list_notes(&self, owner: &str) -> Result<Vec<Note>, StoreError> {
        let tables = self.tables.read().await;
        let mut notes: Vec<Note> = tables
            .notes
            .values()
            .filter(|n| n.user_id == owner)
            .cloned()
            .collect();
        notes.sort_by(newest_first);
        Ok(notes)
    }

    async fn update_note(
        &self,
        owner: &str,
        id: Uuid,
        changes: NoteChanges,
    ) -> Result<Option<Note>, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.notes.get_mut(&id) {
            Some(note) if note.user_id == owner => {
                note.apply(changes, now());
                Ok(Some(note.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_note(&self, owner: &str, id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .notes
            .get(&id)
            .map(|n| n.user_id == owner)
            .unwrap_or(false);
        if owned {
            tables.notes.remove(&id);
        }
        Ok(owned)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upsert(id: &str, email: Option<&str>) -> UpsertUser {
        UpsertUser {
            id: id.to_string(),
            email: email.map(str::to_string),
            placeholder_email: format!("{id}@no-email.local"),
            name: None,
            first_name: None,
            last_name: None,
            image_url: None,
            provider: None,
            provider_id: None,
            signed_in_at: now(),
        }
    }

    fn note(title: &str) -> NewNote {
        NewNote {
            title: title.to_string(),
            content: format!("<p>{title}</p>"),
        }
    }

    #[tokio::test]
    async fn upsert_creates_then_touches() {
        let store = MemoryStore::new();
        let first = store.upsert_user(upsert("user_a", Some("a@example.com"))).await.unwrap();

        let mut again = upsert("user_a", None);
        again.name = Some("Ada".into());
        again.signed_in_at = first.last_signed_in + chrono::Duration::seconds(1);
        let second = store.upsert_user(again).await.unwrap();

        assert_eq!(store.user_count().await, 1);
        assert_eq!(second.email, "a@example.com");
        assert_eq!(second.name.as_deref(), Some("Ada"));
        assert_eq!(second.created_at, first.created_at);
        assert!(second.last_signed_in > first.last_signed_in);
    }

    #[tokio::test]
    async fn upsert_uses_placeholder_only_on_insert() {
        let store = MemoryStore::new();
        let user = store.upsert_user(upsert("user_b", None)).await.unwrap();
        assert_eq!(user.email, "user_b@no-email.local");

        let user = store.upsert_user(upsert("user_b", Some("b@example.com"))).await.unwrap();
        assert_eq!(user.email, "b@example.com");
    }

    #[tokio::test]
    async fn upsert_rejects_email_held_by_other_user() {
        let store = MemoryStore::new();
        store.upsert_user(upsert("user_a", Some("same@example.com"))).await.unwrap();
        let err = store
            .upsert_user(upsert("user_b", Some("same@example.com")))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::EmailConflict));
        assert_eq!(store.user_count().await, 1);
    }

    #[tokio::test]
    async fn concurrent_first_sign_ins_create_one_row() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.upsert_user(upsert("user_c", Some("c@example.com"))).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(store.user_count().await, 1);
    }

    #[tokio::test]
    async fn notes_are_scoped_to_owner() {
        let store = MemoryStore::new();
        let mine = store.create_note("owner", note("mine")).await.unwrap();

        assert!(store.list_notes("intruder").await.unwrap().is_empty());
        assert!(store
            .update_note("intruder", mine.id, NoteChanges { title: Some("x".into()), content: None })
            .await
            .unwrap()
            .is_none());
        assert!(!store.delete_note("intruder", mine.id).await.unwrap());

        let listed = store.list_notes("owner").await.unwrap();
        assert_eq!(listed, vec![mine]);
    }

    #[tokio::test]
    async fn delete_twice_reports_missing() {
        let store = MemoryStore::new();
        let created = store.create_note("owner", note("gone")).await.unwrap();
        assert!(store.delete_note("owner", created.id).await.unwrap());
        assert!(!store.delete_note("owner", created.id).await.unwrap());
    }

    #[tokio::test]
    async fn profile_counts_notes() {
        let store = MemoryStore::new();
        store.upsert_user(upsert("owner", Some("o@example.com"))).await.unwrap();
        store.create_note("owner", note("one")).await.unwrap();
        store.create_note("owner", note("two")).await.unwrap();
        store.create_note("someone", note("three")).await.unwrap();

        let profile = store.user_profile("owner").await.unwrap().unwrap();
        assert_eq!(profile.notes_count, 2);
        assert!(store.user_profile("nobody").await.unwrap().is_none());
    }
}
