//! Authenticated viewer identity.
//!
//! Set once at login and passed explicitly into every component, so the
//! core stays testable without ambient global state. Read-only after
//! construction.

use crate::models::{ConversationKey, Role};

/// The logged-in viewer: id, role, and the bearer token backing every
/// REST call made on their behalf.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_id: String,
    pub role: Role,
    pub token: String,
}

impl AuthSession {
    pub fn new(user_id: impl Into<String>, role: Role, token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            token: token.into(),
        }
    }

    /// Whether `sender_id` refers to the logged-in viewer. Decides which
    /// side of the transcript a message renders on and whether it counts
    /// toward unread badges.
    pub fn is_own_message(&self, sender_id: &str) -> bool {
        self.user_id == sender_id
    }

    /// Conversation key with a counterpart contact, oriented by the
    /// viewer's role. `None` for roles without a messaging dashboard.
    pub fn conversation_with(&self, contact_id: &str) -> Option<ConversationKey> {
        match self.role {
            Role::Doctor => Some(ConversationKey::new(&self.user_id, contact_id)),
            Role::Patient => Some(ConversationKey::new(contact_id, &self.user_id)),
            Role::Admin => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_message_check() {
        let session = AuthSession::new("p1", Role::Patient, "tok");
        assert!(session.is_own_message("p1"));
        assert!(!session.is_own_message("d1"));
    }

    #[test]
    fn conversation_key_oriented_by_role() {
        let patient = AuthSession::new("p1", Role::Patient, "tok");
        let doctor = AuthSession::new("d1", Role::Doctor, "tok");

        // Both sides of the same conversation derive the same key.
        assert_eq!(
            patient.conversation_with("d1"),
            doctor.conversation_with("p1")
        );
    }

    #[test]
    fn admin_has_no_conversations() {
        let admin = AuthSession::new("a1", Role::Admin, "tok");
        assert_eq!(admin.conversation_with("d1"), None);
    }
}
