//! SQLite-backed changeset and user directory.
//!
//! Reads the `changesets` and `users` tables maintained by the editing
//! application. The tables are created if missing so a fresh database is
//! usable, but this type never decides who owns what.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::config::HistoryConfig;
use crate::error::{VellumError, VellumResult};
use crate::traits::{ChangesetDirectory, UserDirectory, UserProfile};
use crate::types::{ChangesetId, UserId};

/// Directory reading changesets and users from SQLite.
pub struct SqliteDirectory {
    conn: Mutex<Connection>,
}

impl SqliteDirectory {
    /// Open the directory tables in the database at `path`.
    pub fn new(path: impl AsRef<Path>) -> VellumResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let directory = Self {
            conn: Mutex::new(conn),
        };
        directory.init_schema()?;
        Ok(directory)
    }

    /// Create an in-memory directory (for testing)
    pub fn in_memory() -> VellumResult<Self> {
        let conn = Connection::open_in_memory()?;
        let directory = Self {
            conn: Mutex::new(conn),
        };
        directory.init_schema()?;
        Ok(directory)
    }

    /// Open the directory alongside the history store described by `config`.
    pub fn from_config(config: &HistoryConfig) -> VellumResult<Self> {
        if config.in_memory {
            Self::in_memory()
        } else {
            Self::new(&config.database_path)
        }
    }

    fn conn(&self) -> VellumResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| VellumError::Internal("directory connection lock poisoned".to_string()))
    }

    fn init_schema(&self) -> VellumResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                display_name TEXT NOT NULL,
                data_public INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS changesets (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id)
            );
        "#,
        )?;
        Ok(())
    }

    /// Insert or replace a user account.
    pub fn add_user(&self, profile: &UserProfile) -> VellumResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO users (id, display_name, data_public) VALUES (?1, ?2, ?3)",
            params![profile.id, profile.display_name, profile.data_public],
        )?;
        Ok(())
    }

    /// Insert or replace a changeset.
    pub fn add_changeset(&self, changeset_id: ChangesetId, user_id: UserId) -> VellumResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO changesets (id, user_id) VALUES (?1, ?2)",
            params![changeset_id, user_id],
        )?;
        Ok(())
    }
}

impl ChangesetDirectory for SqliteDirectory {
    fn changeset_owner(&self, changeset_id: ChangesetId) -> VellumResult<Option<UserId>> {
        let conn = self.conn()?;
        let owner = conn
            .query_row(
                "SELECT user_id FROM changesets WHERE id = ?1",
                params![changeset_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(owner)
    }
}

impl UserDirectory for SqliteDirectory {
    fn user(&self, user_id: UserId) -> VellumResult<Option<UserProfile>> {
        let conn = self.conn()?;
        let profile = conn
            .query_row(
                "SELECT id, display_name, data_public FROM users WHERE id = ?1",
                params![user_id],
                |row| {
                    Ok(UserProfile {
                        id: row.get(0)?,
                        display_name: row.get(1)?,
                        data_public: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(profile)
    }
}
