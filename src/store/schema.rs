//! Table definitions, applied idempotently on open.

use rusqlite::Connection;

const SCHEMA: &str = "
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name    TEXT NOT NULL,
    last_name     TEXT NOT NULL,
    username      TEXT NOT NULL UNIQUE,
    email         TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    date_joined   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user_profiles (
    user_id       INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
    timestamp     TEXT NOT NULL,
    updated       TEXT NOT NULL,
    address       TEXT CHECK (address IS NULL OR length(address) <= 100),
    town          TEXT CHECK (town IS NULL OR length(town) <= 50),
    county        TEXT CHECK (county IS NULL OR length(county) <= 50),
    post_code     TEXT CHECK (post_code IS NULL OR length(post_code) <= 8),
    country       TEXT CHECK (country IS NULL OR length(country) <= 50),
    longitude     TEXT CHECK (longitude IS NULL OR length(longitude) <= 50),
    latitude      TEXT CHECK (latitude IS NULL OR length(latitude) <= 50),
    captcha_score REAL NOT NULL DEFAULT 0.0,
    has_profile   INTEGER NOT NULL DEFAULT 0,
    is_active     INTEGER NOT NULL DEFAULT 1
);
";

pub(super) fn apply(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}
