//! SQLite-backed user and profile store
//!
//! Every user owns exactly one [`UserProfile`] row. The profile is inserted in
//! the same transaction as the user, so lookups never observe a user without
//! one. Deleting a user cascades to the profile.

mod schema;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::debug;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("A user with that username already exists.")]
    DuplicateUsername(String),
    #[error("User {0} not found")]
    UserNotFound(i64),
    #[error("Database connection lock poisoned")]
    LockPoisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Registered account
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub date_joined: DateTime<Utc>,
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.username)
    }
}

/// Fields required to create an account
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Address and geocoordinates attached to a user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub user_id: i64,
    #[serde(skip)]
    pub username: String,
    pub timestamp: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub address: Option<String>,
    pub town: Option<String>,
    pub county: Option<String>,
    pub post_code: Option<String>,
    pub country: Option<String>,
    pub longitude: Option<String>,
    pub latitude: Option<String>,
    pub captcha_score: f64,
    pub has_profile: bool,
    pub is_active: bool,
}

impl fmt::Display for UserProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.username)
    }
}

/// The seven editable address fields of a profile
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileFields {
    pub address: String,
    pub town: String,
    pub county: String,
    pub post_code: String,
    pub country: String,
    pub longitude: String,
    pub latitude: String,
}

/// User and profile persistence
pub struct ProfileStore {
    conn: Mutex<Connection>,
}

impl ProfileStore {
    /// Open a store backed by a file on disk
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::initialize(conn)
    }

    /// Open an in-memory store (for testing)
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(conn)
    }

    fn initialize(conn: Connection) -> StoreResult<Self> {
        schema::apply(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Cheap round-trip used by the health endpoint
    pub fn ping(&self) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    /// Insert a user together with its empty profile
    pub fn create_user(&self, new_user: &NewUser) -> StoreResult<User> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
            params![new_user.username],
            |row| row.get(0),
        )?;
        if exists {
            return Err(StoreError::DuplicateUsername(new_user.username.clone()));
        }

        let now = Utc::now();
        tx.execute(
            "INSERT INTO users (first_name, last_name, username, email, password_hash, date_joined)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                new_user.first_name,
                new_user.last_name,
                new_user.username,
                new_user.email,
                new_user.password_hash,
                now.to_rfc3339(),
            ],
        )?;
        let id = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO user_profiles (user_id, timestamp, updated) VALUES (?1, ?2, ?2)",
            params![id, now.to_rfc3339()],
        )?;
        tx.commit()?;

        debug!(user_id = id, username = %new_user.username, "created user");

        Ok(User {
            id,
            first_name: new_user.first_name.clone(),
            last_name: new_user.last_name.clone(),
            username: new_user.username.clone(),
            email: new_user.email.clone(),
            password_hash: new_user.password_hash.clone(),
            date_joined: now,
        })
    }

    pub fn get_user(&self, id: i64) -> StoreResult<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                &format!("{USER_COLUMNS} WHERE id = ?1"),
                params![id],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                &format!("{USER_COLUMNS} WHERE username = ?1"),
                params![username],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    /// Remove a user; the profile goes with it
    pub fn delete_user(&self, id: i64) -> StoreResult<()> {
        let conn = self.conn()?;
        let affected = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(StoreError::UserNotFound(id));
        }
        Ok(())
    }

    pub fn get_profile(&self, user_id: i64) -> StoreResult<Option<UserProfile>> {
        let conn = self.conn()?;
        let profile = conn
            .query_row(
                "SELECT p.user_id, u.username, p.timestamp, p.updated, p.address, p.town,
                        p.county, p.post_code, p.country, p.longitude, p.latitude,
                        p.captcha_score, p.has_profile, p.is_active
                 FROM user_profiles p JOIN users u ON u.id = p.user_id
                 WHERE p.user_id = ?1",
                params![user_id],
                profile_from_row,
            )
            .optional()?;
        Ok(profile)
    }

    /// Overwrite the address fields and mark the profile as filled in
    pub fn update_profile(&self, user_id: i64, fields: &ProfileFields) -> StoreResult<()> {
        let conn = self.conn()?;
        let affected = conn.execute(
            "UPDATE user_profiles
             SET address = ?2, town = ?3, county = ?4, post_code = ?5, country = ?6,
                 longitude = ?7, latitude = ?8, has_profile = 1, updated = ?9
             WHERE user_id = ?1",
            params![
                user_id,
                fields.address,
                fields.town,
                fields.county,
                fields.post_code,
                fields.country,
                fields.longitude,
                fields.latitude,
                Utc::now().to_rfc3339(),
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::UserNotFound(user_id));
        }
        Ok(())
    }

    pub fn set_captcha_score(&self, user_id: i64, score: f64) -> StoreResult<()> {
        let conn = self.conn()?;
        let affected = conn.execute(
            "UPDATE user_profiles SET captcha_score = ?2, updated = ?3 WHERE user_id = ?1",
            params![user_id, score, Utc::now().to_rfc3339()],
        )?;
        if affected == 0 {
            return Err(StoreError::UserNotFound(user_id));
        }
        Ok(())
    }
}

const USER_COLUMNS: &str =
    "SELECT id, first_name, last_name, username, email, password_hash, date_joined FROM users";

fn parse_timestamp(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        username: row.get(3)?,
        email: row.get(4)?,
        password_hash: row.get(5)?,
        date_joined: parse_timestamp(6, row.get(6)?)?,
    })
}

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<UserProfile> {
    Ok(UserProfile {
        user_id: row.get(0)?,
        username: row.get(1)?,
        timestamp: parse_timestamp(2, row.get(2)?)?,
        updated: parse_timestamp(3, row.get(3)?)?,
        address: row.get(4)?,
        town: row.get(5)?,
        county: row.get(6)?,
        post_code: row.get(7)?,
        country: row.get(8)?,
        longitude: row.get(9)?,
        latitude: row.get(10)?,
        captcha_score: row.get(11)?,
        has_profile: row.get(12)?,
        is_active: row.get(13)?,
    })
}
