use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{format_timestamp, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::User;

const USER_COLUMNS: &str = "id, email, name, password_hash, created_at, updated_at";

/// Insert a user. A duplicate email maps to `ConstraintViolation`.
pub fn insert_user(conn: &Connection, user: &User) -> Result<(), DatabaseError> {
    let result = conn.execute(
        "INSERT INTO users (id, email, name, password_hash, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            user.id.to_string(),
            user.email,
            user.name,
            user.password_hash,
            format_timestamp(&user.created_at),
            format_timestamp(&user.updated_at),
        ],
    );

    match result {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(DatabaseError::ConstraintViolation(format!(
                "email already registered: {}",
                user.email
            )))
        }
        Err(e) => Err(e.into()),
    }
}

pub fn get_user(conn: &Connection, id: &Uuid) -> Result<Option<User>, DatabaseError> {
    query_one(
        conn,
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        &id.to_string(),
    )
}

/// Look up by email. Callers pass the normalized (trimmed, lower-cased) form.
pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>, DatabaseError> {
    query_one(
        conn,
        &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
        email,
    )
}

fn query_one(conn: &Connection, sql: &str, key: &str) -> Result<Option<User>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let result = stmt.query_row(params![key], |row| {
        Ok(UserRow {
            id: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
            password_hash: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    });

    match result {
        Ok(row) => Ok(Some(user_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

struct UserRow {
    id: String,
    email: String,
    name: String,
    password_hash: String,
    created_at: String,
    updated_at: String,
}

fn user_from_row(row: UserRow) -> Result<User, DatabaseError> {
    let created_at: DateTime<Utc> = parse_timestamp(&row.created_at)?;
    Ok(User {
        id: parse_uuid(&row.id)?,
        email: row.email,
        name: row.name,
        password_hash: row.password_hash,
        created_at,
        updated_at: parse_timestamp(&row.updated_at)?,
    })
}
