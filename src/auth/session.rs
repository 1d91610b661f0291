use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "sessionid";

/// In-memory session id → user id map
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, i64>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session for `user_id` and return its id
    pub async fn login(&self, user_id: i64) -> String {
        let session_id = Uuid::new_v4().simple().to_string();
        self.sessions
            .write()
            .await
            .insert(session_id.clone(), user_id);
        session_id
    }

    pub async fn user_id(&self, session_id: &str) -> Option<i64> {
        self.sessions.read().await.get(session_id).copied()
    }

    pub async fn logout(&self, session_id: &str) {
        self.sessions.write().await.remove(session_id);
    }

    /// Cookie header value for a freshly started session
    pub fn cookie(session_id: &str) -> String {
        format!("{SESSION_COOKIE}={session_id}; Path=/; HttpOnly; SameSite=Lax")
    }

    /// Cookie header value that clears the session cookie
    pub fn expired_cookie() -> String {
        format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_login_lookup_logout() {
        let sessions = SessionStore::new();
        let sid = sessions.login(7).await;

        assert_eq!(sessions.user_id(&sid).await, Some(7));
        assert_eq!(sessions.user_id("unknown").await, None);

        sessions.logout(&sid).await;
        assert_eq!(sessions.user_id(&sid).await, None);
    }

    #[test]
    fn test_cookie_format() {
        assert_eq!(
            SessionStore::cookie("abc"),
            "sessionid=abc; Path=/; HttpOnly; SameSite=Lax"
        );
        assert!(SessionStore::expired_cookie().contains("Max-Age=0"));
    }
}
