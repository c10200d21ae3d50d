use crate::models::UserRow;
use crate::Database;
use anyhow::Result;
use rusqlite::{Connection, ErrorCode, OptionalExtension};

impl Database {
    // -- Users --

    /// Insert a user and return its new id, or `None` when the username is
    /// already taken.
    pub fn create_user(&self, username: &str, hashed_password: &str) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (username, hashed_password) VALUES (?1, ?2)",
                (username, hashed_password),
            );

            match inserted {
                Ok(_) => Ok(Some(conn.last_insert_rowid())),
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == ErrorCode::ConstraintViolation =>
                {
                    Ok(None)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, username, hashed_password, created_at FROM users WHERE username = ?1",
    )?;

    let row = stmt.query_row([username], map_user_row).optional()?;
    Ok(row)
}

fn query_user_by_id(conn: &Connection, id: i64) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, username, hashed_password, created_at FROM users WHERE id = ?1",
    )?;

    let row = stmt.query_row([id], map_user_row).optional()?;
    Ok(row)
}

fn map_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        hashed_password: row.get(2)?,
        created_at: row.get(3)?,
    })
}
