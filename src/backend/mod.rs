//! Backend seam for the messaging core.
//!
//! The core depends on exactly three backend operations: role-appropriate
//! contact roster, full conversation history, and message send. They are
//! expressed as one trait so the chat components can run against the real
//! REST backend ([`HttpBackend`]) or an in-memory double ([`MockBackend`])
//! without caring which.

mod http;
mod mock;

pub use http::{HttpBackend, RestClient};
pub use mock::{Gate, MockBackend};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FetchError;
use crate::models::{ChatMessage, Contact, ConversationKey};

/// Outbound message payload.
///
/// `local_key` is the client-generated correlation key of the optimistic
/// transcript entry; backends echo it in the receipt where supported.
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingMessage {
    pub sender_id: String,
    pub recipient_id: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub local_key: Uuid,
}

/// Acknowledgment that a message was stored.
#[derive(Debug, Clone, Deserialize)]
pub struct SendReceipt {
    /// Server-assigned id of the stored message.
    pub id: String,
    /// Echo of the client correlation key, when the backend returns one.
    #[serde(default)]
    pub local_key: Option<Uuid>,
}

/// The backend operations the messaging core consumes. Wire format is the
/// implementation's concern; only this contract matters.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Counterpart roster for the viewer: doctors for a patient, assigned
    /// patients for a doctor. Fetched fresh each call, no caching here.
    async fn list_contacts(&self) -> Result<Vec<Contact>, FetchError>;

    /// Full history for one conversation. There is no delta mode; every
    /// call returns the complete transcript.
    async fn conversation_history(
        &self,
        key: &ConversationKey,
    ) -> Result<Vec<ChatMessage>, FetchError>;

    /// Store one message and return its receipt.
    async fn send_message(&self, message: &OutgoingMessage) -> Result<SendReceipt, FetchError>;
}
