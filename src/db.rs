// Handles SQLite storage: config values, prompt history and the last result

use crate::blog_api::GeneratedPost;
use crate::error::{BlogError, Result};
use crate::history::{self, HistoryEntry};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

pub type DbConn = Arc<Mutex<Connection>>;

/// Storage slot holding the serialized prompt history.
pub const HISTORY_KEY: &str = "blog_history";
/// Storage slot holding the most recent finished post.
pub const LAST_RESULT_KEY: &str = "last_result";

pub fn default_db_path() -> Result<PathBuf> {
    let base_dir = dirs::data_dir()
        .ok_or_else(|| BlogError::Config("could not locate a data directory".into()))?
        .join("blog-writer");
    Ok(base_dir.join("blog-writer.db"))
}

// Open (or create) the database file and make sure the schema exists
pub fn init_db(db_path: &Path) -> Result<DbConn> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    tracing::debug!("opened database at {}", db_path.display());

    Ok(Arc::new(Mutex::new(conn)))
}

pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS app_config (
            key TEXT PRIMARY KEY,
            value TEXT
        )",
        [],
    )?;
    Ok(())
}

/// Inserts or updates a configuration key-value pair.
pub fn update_config_value(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO app_config (key, value) VALUES (?1, ?2)",
        [key, value],
    )?;
    Ok(())
}

/// Retrieves a configuration value by key. Returns `None` if the key doesn't exist.
pub fn get_config_value(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM app_config WHERE key = ?1",
        [key],
        |row| row.get(0),
    )
    .optional()
}

pub fn delete_config_value(conn: &Connection, key: &str) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM app_config WHERE key = ?1", [key])?;
    Ok(())
}

/// Loads the prompt history. A corrupted slot reads as empty.
pub fn load_history(conn: &Connection) -> Result<Vec<HistoryEntry>> {
    let Some(raw) = get_config_value(conn, HISTORY_KEY)? else {
        return Ok(Vec::new());
    };

    match serde_json::from_str(&raw) {
        Ok(entries) => Ok(entries),
        Err(e) => {
            tracing::warn!("discarding unreadable history: {}", e);
            Ok(Vec::new())
        }
    }
}

/// Promotes `prompt` to the front of the stored history and returns the new list.
pub fn record_history(
    conn: &Connection,
    prompt: &str,
    at: DateTime<Utc>,
) -> Result<Vec<HistoryEntry>> {
    let entries = history::promote(load_history(conn)?, HistoryEntry::new(prompt, at));
    update_config_value(conn, HISTORY_KEY, &serde_json::to_string(&entries)?)?;
    Ok(entries)
}

pub fn save_last_result(conn: &Connection, post: &GeneratedPost) -> Result<()> {
    update_config_value(conn, LAST_RESULT_KEY, &serde_json::to_string(post)?)?;
    Ok(())
}

/// Loads the last finished post. A corrupted slot reads as no result.
pub fn load_last_result(conn: &Connection) -> Result<Option<GeneratedPost>> {
    let Some(raw) = get_config_value(conn, LAST_RESULT_KEY)? else {
        return Ok(None);
    };

    match serde_json::from_str(&raw) {
        Ok(post) => Ok(Some(post)),
        Err(e) => {
            tracing::warn!("discarding unreadable last result: {}", e);
            Ok(None)
        }
    }
}

#[cfg(test)]
pub(crate) fn open_in_memory() -> DbConn {
    let conn = Connection::open_in_memory().expect("in-memory database");
    init_schema(&conn).expect("schema");
    Arc::new(Mutex::new(conn))
}
