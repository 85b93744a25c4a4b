use rusqlite::params;

use crate::db::models::User;
use crate::error::AppResult;
use crate::state::DbPool;

/// Look up a user by username.
pub fn find_by_username(pool: &DbPool, username: &str) -> AppResult<Option<User>> {
    let conn = pool.get()?;
    let result = conn.query_row(
        "SELECT id, username, email, password_hash, created_at \
         FROM users WHERE username = ?1",
        params![username],
        map_user,
    );
    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Create a new user. Returns `Ok(None)` when the username is already taken.
pub fn create(
    pool: &DbPool,
    username: &str,
    email: &str,
    password_hash: &str,
) -> AppResult<Option<User>> {
    let conn = pool.get()?;
    let id = uuid::Uuid::now_v7().to_string();

    let result = conn.execute(
        "INSERT INTO users (id, username, email, password_hash) VALUES (?1, ?2, ?3, ?4)",
        params![id, username, email, password_hash],
    );
    match result {
        Ok(_) => {}
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    }

    let user = conn.query_row(
        "SELECT id, username, email, password_hash, created_at FROM users WHERE id = ?1",
        params![id],
        map_user,
    )?;
    Ok(Some(user))
}

/// Delete a user. Posts, likes, follow edges and sessions cascade.
pub fn delete(pool: &DbPool, user_id: &str) -> AppResult<bool> {
    let conn = pool.get()?;
    let rows = conn.execute("DELETE FROM users WHERE id = ?1", params![user_id])?;
    Ok(rows > 0)
}

fn map_user(row: &rusqlite::Row<'_>) -> Result<User, rusqlite::Error> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: row.get(4)?,
    })
}
