//! PgStore against a real database. Run with
//! `DATABASE_URL=postgres://... cargo test --test 60_postgres_store -- --ignored`.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use notes_api::config::{AppConfig, StoreBackend};
use notes_api::database::models::{NewNote, NoteChanges, UpsertUser};
use notes_api::database::store::now;
use notes_api::database::{DatabaseManager, NoteStore, PgStore, Store, StoreError, UserStore};

async fn store() -> Result<(PgStore, PgPool)> {
    let url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must point at a scratch PostgreSQL database")?;
    let mut config = AppConfig::development().database;
    config.backend = StoreBackend::Postgres;
    config.url = Some(url);
    config.run_migrations = true;

    let pool = DatabaseManager::connect(&config).await?;
    Ok((PgStore::new(pool.clone()), pool))
}

/// Ids and emails are unique per test so runs can share one database.
fn unique(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

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

async fn user_rows(pool: &PgPool, id: &str) -> Result<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await?)
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn pg_health_check() -> Result<()> {
    let (store, _) = store().await?;
    store.health_check().await?;
    Ok(())
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn pg_upsert_creates_then_touches() -> Result<()> {
    let (store, pool) = store().await?;
    let id = unique("user");
    let email = format!("{id}@example.com");

    let first = store.upsert_user(upsert(&id, Some(&email))).await?;
    assert_eq!(first.provider_id.as_deref(), Some(id.as_str()));

    let mut again = upsert(&id, None);
    again.name = Some("Ada".into());
    again.signed_in_at = first.last_signed_in + chrono::Duration::seconds(1);
    let second = store.upsert_user(again).await?;

    assert_eq!(user_rows(&pool, &id).await?, 1);
    assert_eq!(second.email, email);
    assert_eq!(second.name.as_deref(), Some("Ada"));
    assert_eq!(second.created_at, first.created_at);
    assert!(second.last_signed_in > first.last_signed_in);
    Ok(())
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn pg_placeholder_and_provider_fallback_only_on_insert() -> Result<()> {
    let (store, _) = store().await?;
    let id = unique("user");

    let user = store.upsert_user(upsert(&id, None)).await?;
    assert_eq!(user.email, format!("{id}@no-email.local"));
    assert_eq!(user.provider_id.as_deref(), Some(id.as_str()));

    let real = format!("{id}@example.com");
    let mut linked = upsert(&id, Some(&real));
    linked.provider_id = Some("google-123".into());
    let user = store.upsert_user(linked).await?;
    assert_eq!(user.email, real);
    assert_eq!(user.provider_id.as_deref(), Some("google-123"));

    // a later sign-in without either keeps the stored values
    let user = store.upsert_user(upsert(&id, None)).await?;
    assert_eq!(user.email, real);
    assert_eq!(user.provider_id.as_deref(), Some("google-123"));
    Ok(())
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn pg_email_held_by_other_user_is_conflict() -> Result<()> {
    let (store, pool) = store().await?;
    let owner = unique("user");
    let other = unique("user");
    let email = format!("{owner}@example.com");

    store.upsert_user(upsert(&owner, Some(&email))).await?;
    let err = store
        .upsert_user(upsert(&other, Some(&email)))
        .await
        .expect_err("second subject must not take the address");

    assert!(matches!(err, StoreError::EmailConflict));
    assert_eq!(user_rows(&pool, &other).await?, 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "needs DATABASE_URL"]
async fn pg_concurrent_first_sign_ins_create_one_row() -> Result<()> {
    let (store, pool) = store().await?;
    let id = unique("user");
    let email = format!("{id}@example.com");

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            let request = upsert(&id, Some(&email));
            tokio::spawn(async move { store.upsert_user(request).await })
        })
        .collect();
    for handle in handles {
        handle.await??;
    }

    assert_eq!(user_rows(&pool, &id).await?, 1);
    Ok(())
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn pg_notes_are_scoped_to_owner() -> Result<()> {
    let (store, _) = store().await?;
    let owner = unique("owner");
    let intruder = unique("intruder");
    store.upsert_user(upsert(&owner, None)).await?;
    store.upsert_user(upsert(&intruder, None)).await?;

    let mine = store.create_note(&owner, note("mine")).await?;

    assert!(store.list_notes(&intruder).await?.is_empty());
    let changes = NoteChanges {
        title: Some("x".into()),
        content: None,
    };
    assert!(store.update_note(&intruder, mine.id, changes).await?.is_none());
    assert!(!store.delete_note(&intruder, mine.id).await?);

    assert_eq!(store.list_notes(&owner).await?, vec![mine.clone()]);

    let updated = store
        .update_note(
            &owner,
            mine.id,
            NoteChanges {
                title: Some("mine v2".into()),
                content: None,
            },
        )
        .await?
        .context("owner update must find the note")?;
    assert_eq!(updated.title, "mine v2");
    assert_eq!(updated.content, mine.content);
    assert!(updated.updated_at >= mine.updated_at);
    Ok(())
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn pg_delete_twice_reports_missing() -> Result<()> {
    let (store, _) = store().await?;
    let owner = unique("owner");
    store.upsert_user(upsert(&owner, None)).await?;

    let created = store.create_note(&owner, note("gone")).await?;
    assert!(store.delete_note(&owner, created.id).await?);
    assert!(!store.delete_note(&owner, created.id).await?);
    Ok(())
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn pg_list_order_and_profile_count() -> Result<()> {
    let (store, _) = store().await?;
    let owner = unique("owner");
    let someone = unique("someone");
    store.upsert_user(upsert(&owner, None)).await?;
    store.upsert_user(upsert(&someone, None)).await?;

    let first = store.create_note(&owner, note("one")).await?;
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    let second = store.create_note(&owner, note("two")).await?;
    store.create_note(&someone, note("three")).await?;

    let listed: Vec<Uuid> = store.list_notes(&owner).await?.iter().map(|n| n.id).collect();
    assert_eq!(listed, vec![second.id, first.id]);

    let profile = store
        .user_profile(&owner)
        .await?
        .context("profile for provisioned user")?;
    assert_eq!(profile.notes_count, 2);
    assert!(store.user_profile(&unique("nobody")).await?.is_none());
    Ok(())
}
