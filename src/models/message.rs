//! Conversation messages and the symmetric conversation key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies the single history shared by one doctor and one patient.
///
/// A conversation is symmetric: it has exactly one history regardless of
/// which side queries it, so the key is the participant pair oriented by
/// role rather than by who is asking.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationKey {
    pub doctor_id: String,
    pub patient_id: String,
}

impl ConversationKey {
    pub fn new(doctor_id: impl Into<String>, patient_id: impl Into<String>) -> Self {
        Self {
            doctor_id: doctor_id.into(),
            patient_id: patient_id.into(),
        }
    }

    /// Whether `id` is one of the two participants.
    pub fn involves(&self, id: &str) -> bool {
        self.doctor_id == id || self.patient_id == id
    }

    /// The participant that is not `id`.
    pub fn other_than(&self, id: &str) -> Option<&str> {
        if self.doctor_id == id {
            Some(&self.patient_id)
        } else if self.patient_id == id {
            Some(&self.doctor_id)
        } else {
            None
        }
    }
}

/// A single transcript entry.
///
/// Server-confirmed entries carry `id`; optimistic entries carry only a
/// `local_key` until the send resolves. The key is echoed through the send
/// call so the receipt can be matched back, after which the entry flips to
/// confirmed. The next poll's full-history overwrite remains the fallback
/// authority either way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Server-assigned identifier, absent while the send is in flight.
    pub id: Option<String>,
    pub sender_id: String,
    pub recipient_id: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    /// True from optimistic insertion until confirmation or rollback.
    #[serde(default)]
    pub pending: bool,
    /// Client-generated correlation key for optimistic entries.
    #[serde(default)]
    pub local_key: Option<Uuid>,
}

impl ChatMessage {
    /// Stage an optimistic entry: client-stamped timestamp, pending until
    /// the send resolves.
    pub fn staged(
        sender_id: impl Into<String>,
        recipient_id: impl Into<String>,
        body: impl Into<String>,
        local_key: Uuid,
    ) -> Self {
        Self {
            id: None,
            sender_id: sender_id.into(),
            recipient_id: recipient_id.into(),
            body: body.into(),
            timestamp: Utc::now(),
            pending: true,
            local_key: Some(local_key),
        }
    }
}

/// Sort a transcript by timestamp ascending. The sort is stable, so
/// entries with equal timestamps keep their fetch/insertion order.
pub fn sort_transcript(messages: &mut [ChatMessage]) {
    messages.sort_by_key(|m| m.timestamp);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64, sender: &str, body: &str) -> ChatMessage {
        ChatMessage {
            id: Some(format!("m{secs}-{body}")),
            sender_id: sender.into(),
            recipient_id: "other".into(),
            body: body.into(),
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
            pending: false,
            local_key: None,
        }
    }

    #[test]
    fn key_is_role_oriented() {
        let key = ConversationKey::new("d1", "p1");
        assert!(key.involves("d1"));
        assert!(key.involves("p1"));
        assert!(!key.involves("p2"));
        assert_eq!(key.other_than("d1"), Some("p1"));
        assert_eq!(key.other_than("p1"), Some("d1"));
        assert_eq!(key.other_than("p2"), None);
    }

    #[test]
    fn same_pair_same_key_from_either_side() {
        // A doctor viewer and a patient viewer of the same conversation
        // must derive an identical key.
        let from_doctor_side = ConversationKey::new("d1", "p1");
        let from_patient_side = ConversationKey::new("d1", "p1");
        assert_eq!(from_doctor_side, from_patient_side);
    }

    #[test]
    fn staged_message_is_pending_with_key() {
        let key = Uuid::new_v4();
        let msg = ChatMessage::staged("p1", "d1", "hello", key);
        assert!(msg.pending);
        assert!(msg.id.is_none());
        assert_eq!(msg.local_key, Some(key));
        assert_eq!(msg.sender_id, "p1");
    }

    #[test]
    fn sort_is_by_timestamp_ascending() {
        let mut transcript = vec![at(30, "d1", "c"), at(10, "p1", "a"), at(20, "d1", "b")];
        sort_transcript(&mut transcript);
        let bodies: Vec<&str> = transcript.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, ["a", "b", "c"]);
    }

    #[test]
    fn sort_preserves_fetch_order_on_ties() {
        let mut transcript = vec![
            at(10, "d1", "first"),
            at(10, "p1", "second"),
            at(10, "d1", "third"),
        ];
        sort_transcript(&mut transcript);
        let bodies: Vec<&str> = transcript.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, ["first", "second", "third"]);
    }

    #[test]
    fn pending_defaults_false_on_wire() {
        let msg: ChatMessage = serde_json::from_str(
            r#"{"id":"7","sender_id":"d1","recipient_id":"p1","body":"hi",
                "timestamp":"2026-03-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert!(!msg.pending);
        assert!(msg.local_key.is_none());
    }
}
