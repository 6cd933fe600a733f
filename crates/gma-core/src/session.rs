//! Session state owned by one client instance.

use crate::ids::deserialize_id;
use serde::{Deserialize, Serialize};

/// The logged-in GMA user (`gma_user&type=current`, `data[0]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "renId", deserialize_with = "deserialize_id")]
    pub ren_id: String,
    #[serde(rename = "preferredName", default)]
    pub preferred_name: String,
    #[serde(rename = "GUID", default)]
    pub guid: String,
}

/// Login flag, CSRF token and identity for the current session.
///
/// The cookie store is not held here; it belongs to the transport. Every
/// transition bumps `generation`, which lets concurrent callers tell whether
/// a relogin already happened while they were waiting.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    csrf_token: Option<String>,
    logged_in: bool,
    user: Option<User>,
    generation: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf_token.as_deref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Stores the raw token body; blank bodies clear the token.
    pub fn set_csrf_token(&mut self, token: &str) {
        let token = token.trim();
        self.csrf_token = (!token.is_empty()).then(|| token.to_string());
    }

    pub fn establish(&mut self, user: User) {
        self.logged_in = true;
        self.user = Some(user);
        self.generation += 1;
    }

    pub fn clear(&mut self) {
        self.csrf_token = None;
        self.logged_in = false;
        self.user = None;
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_from_service_json() {
        let user: User = serde_json::from_value(json!({
            "renId": 1234,
            "preferredName": "Jo",
            "GUID": "ABC-123"
        }))
        .unwrap();
        assert_eq!(user.ren_id, "1234");
        assert_eq!(user.guid, "ABC-123");
    }

    #[test]
    fn test_session_transitions() {
        let mut session = SessionState::new();
        assert!(!session.is_logged_in());

        session.set_csrf_token("  tok123\n");
        session.establish(User {
            ren_id: "1".into(),
            preferred_name: "Jo".into(),
            guid: "G".into(),
        });
        assert!(session.is_logged_in());
        assert_eq!(session.csrf_token(), Some("tok123"));
        let generation = session.generation();

        session.clear();
        assert!(!session.is_logged_in());
        assert!(session.csrf_token().is_none());
        assert!(session.user().is_none());
        assert!(session.generation() > generation);
    }

    #[test]
    fn test_blank_token_is_none() {
        let mut session = SessionState::new();
        session.set_csrf_token("   ");
        assert!(session.csrf_token().is_none());
    }
}
