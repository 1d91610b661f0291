//! Credential hashing and cookie sessions
//!
//! Passwords are stored as Argon2id PHC strings. Sessions are opaque
//! random ids held in memory and carried in the `sessionid` cookie.

pub mod password;
pub mod session;

pub use password::{hash_password, verify_password};
pub use session::{SessionStore, SESSION_COOKIE};
