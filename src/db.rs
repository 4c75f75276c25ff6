use serde::{de::DeserializeOwned, Serialize};
use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePoolOptions, Sqlite, SqlitePool};
use thiserror::Error;

pub const DARK_MODE_KEY: &str = "darkMode";
pub const MESSAGES_KEY: &str = "messages";
pub const CHATS_KEY: &str = "chats";
pub const DRAFT_KEY: &str = "draft";
pub const ACTIVE_CHAT_KEY: &str = "activeChat";
pub const ACTIVE_MODE_KEY: &str = "activeMode";
pub const OPTIONS_KEY: &str = "generationOptions";
pub const USER_KEY: &str = "user";

pub const CHAT_KEY_PREFIX: &str = "chat_";

pub fn chat_key(chat_id: &str) -> String {
    format!("{}{}", CHAT_KEY_PREFIX, chat_id)
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("failed to encode value for key '{key}': {source}")]
    Encode { key: String, source: serde_json::Error },
}

pub async fn init_db(db_url: &str) -> Result<SqlitePool, StoreError> {
    if !db_url.contains(":memory:") {
        if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            log::info!("Creating database: {}", db_url);
            Sqlite::create_database(db_url).await?;
        } else {
            log::info!("Database already exists: {}", db_url);
        }
    }

    // One connection: an in-memory database lives and dies with its connection.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect(db_url)
        .await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

async fn run_migrations(pool: &SqlitePool) -> Result<(), StoreError> {
    log::info!("Running database migrations...");
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS kv (
            key TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL
        );",
    )
    .execute(pool)
    .await?;
    log::info!("Database migrations completed.");
    Ok(())
}

pub async fn get_item(pool: &SqlitePool, key: &str) -> Result<Option<String>, StoreError> {
    let value = sqlx::query_scalar::<_, String>("SELECT value FROM kv WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(value)
}

pub async fn set_item(pool: &SqlitePool, key: &str, value: &str) -> Result<(), StoreError> {
    log::debug!("Writing key '{}' ({} bytes)", key, value.len());
    sqlx::query("INSERT OR REPLACE INTO kv (key, value) VALUES (?, ?)")
        .bind(key)
        .bind(value)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn remove_item(pool: &SqlitePool, key: &str) -> Result<(), StoreError> {
    log::debug!("Removing key '{}'", key);
    sqlx::query("DELETE FROM kv WHERE key = ?").bind(key).execute(pool).await?;
    Ok(())
}

pub async fn clear_items(pool: &SqlitePool) -> Result<(), StoreError> {
    log::info!("Clearing all stored keys");
    sqlx::query("DELETE FROM kv").execute(pool).await?;
    Ok(())
}

pub async fn list_keys(pool: &SqlitePool) -> Result<Vec<String>, StoreError> {
    let keys = sqlx::query_scalar::<_, String>("SELECT key FROM kv ORDER BY key ASC")
        .fetch_all(pool)
        .await?;
    Ok(keys)
}

/// Reads and decodes a JSON value. A value that no longer parses is reported
/// and treated as missing.
pub async fn load_json<T: DeserializeOwned>(pool: &SqlitePool, key: &str) -> Result<Option<T>, StoreError> {
    let Some(raw) = get_item(pool, key).await? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            log::warn!("Ignoring unreadable value under '{}': {}", key, e);
            Ok(None)
        }
    }
}

pub async fn save_json<T: Serialize + ?Sized>(pool: &SqlitePool, key: &str, value: &T) -> Result<(), StoreError> {
    let raw = serde_json::to_string(value).map_err(|source| StoreError::Encode { key: key.to_string(), source })?;
    set_item(pool, key, &raw).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{demo_chats, ChatSummary};

    async fn memory_pool() -> SqlitePool {
        init_db("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn set_get_remove() {
        let pool = memory_pool().await;
        assert_eq!(get_item(&pool, DRAFT_KEY).await.unwrap(), None);
        set_item(&pool, DRAFT_KEY, "\"hello\"").await.unwrap();
        set_item(&pool, DRAFT_KEY, "\"hello again\"").await.unwrap();
        assert_eq!(get_item(&pool, DRAFT_KEY).await.unwrap().as_deref(), Some("\"hello again\""));
        remove_item(&pool, DRAFT_KEY).await.unwrap();
        assert_eq!(get_item(&pool, DRAFT_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn json_values_survive_storage() {
        let pool = memory_pool().await;
        save_json(&pool, CHATS_KEY, &demo_chats()).await.unwrap();
        let chats: Vec<ChatSummary> = load_json(&pool, CHATS_KEY).await.unwrap().unwrap();
        assert_eq!(chats, demo_chats());
    }

    #[tokio::test]
    async fn corrupt_values_read_as_missing() {
        let pool = memory_pool().await;
        set_item(&pool, DARK_MODE_KEY, "{not json").await.unwrap();
        let value: Option<bool> = load_json(&pool, DARK_MODE_KEY).await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn clear_removes_every_key() {
        let pool = memory_pool().await;
        save_json(&pool, DARK_MODE_KEY, &false).await.unwrap();
        save_json(&pool, &chat_key("42"), &Vec::<String>::new()).await.unwrap();
        assert_eq!(list_keys(&pool).await.unwrap(), vec!["chat_42".to_string(), "darkMode".to_string()]);
        clear_items(&pool).await.unwrap();
        assert!(list_keys(&pool).await.unwrap().is_empty());
    }
}
